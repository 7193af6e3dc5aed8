use super::wallets::{OwnerKind, WalletOwner};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Only the provider's recipient token and display metadata are kept, never
/// the raw account number.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "banking_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_kind: OwnerKind,
    pub owner_id: i64,
    pub recipient_code: String,
    pub bank_name: String,
    pub display_number: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn owner(&self) -> WalletOwner {
        WalletOwner::from_parts(self.owner_kind, self.owner_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
