pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

mod m20250101_000001_catalog;
mod m20250101_000002_ledger;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_catalog::Migration),
            Box::new(m20250101_000002_ledger::Migration),
        ]
    }
}

/// Auto-increment primary key. SQLite only accepts AUTOINCREMENT on `integer`
/// (which is 64-bit there), Postgres gets `bigserial`.
pub(crate) fn id_column<T: IntoIden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut def = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => def.integer(),
        _ => def.big_integer(),
    };
    def.not_null().auto_increment().primary_key();
    def
}

pub(crate) fn created_at_column<T: IntoIden>(col: T) -> ColumnDef {
    let mut def = ColumnDef::new(col);
    def.timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp());
    def
}
