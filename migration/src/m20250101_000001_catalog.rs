use crate::{created_at_column, id_column};
use sea_orm_migration::prelude::*;

/// Tables owned by the catalogue and checkout side of the marketplace. The
/// ledger only reads them (plus the one-way `orders.is_distributed` flag).
#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    IsStaff,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    Slug,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OrgMemberships {
    Table,
    Id,
    OrganizationId,
    UserId,
    Role,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    Title,
    CreatorId,
    OrganizationId,
    Price,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    Title,
    OrganizerId,
    CourseId,
    Price,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Books {
    Table,
    Id,
    Title,
    CreatedBy,
    Price,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderNumber,
    UserId,
    TotalAmount,
    Status,
    PaymentStatus,
    IsDistributed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    CourseId,
    EventId,
    BookId,
    OrganizationId,
    Price,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    OrderId,
    UserId,
    Amount,
    Currency,
    Status,
    Reference,
    TransactionId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, Users::Id))
                    .col(ColumnDef::new(Users::Username).string_len(150).not_null())
                    .col(ColumnDef::new(Users::Email).string_len(255).null())
                    .col(
                        ColumnDef::new(Users::IsStaff)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(&mut created_at_column(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, Organizations::Id))
                    .col(ColumnDef::new(Organizations::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Organizations::Slug)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Organizations::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(&mut created_at_column(Organizations::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrgMemberships::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, OrgMemberships::Id))
                    .col(
                        ColumnDef::new(OrgMemberships::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrgMemberships::UserId).big_integer().not_null())
                    .col(ColumnDef::new(OrgMemberships::Role).string_len(20).not_null())
                    .col(
                        ColumnDef::new(OrgMemberships::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(&mut created_at_column(OrgMemberships::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_org_memberships_org_user")
                    .table(OrgMemberships::Table)
                    .col(OrgMemberships::OrganizationId)
                    .col(OrgMemberships::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, Courses::Id))
                    .col(ColumnDef::new(Courses::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Courses::CreatorId).big_integer().not_null())
                    .col(ColumnDef::new(Courses::OrganizationId).big_integer().null())
                    .col(
                        ColumnDef::new(Courses::Price)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(&mut created_at_column(Courses::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, Events::Id))
                    .col(ColumnDef::new(Events::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Events::OrganizerId).big_integer().null())
                    .col(ColumnDef::new(Events::CourseId).big_integer().null())
                    .col(
                        ColumnDef::new(Events::Price)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(&mut created_at_column(Events::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Books::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, Books::Id))
                    .col(ColumnDef::new(Books::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Books::CreatedBy).big_integer().null())
                    .col(
                        ColumnDef::new(Books::Price)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(&mut created_at_column(Books::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, Orders::Id))
                    .col(
                        ColumnDef::new(Orders::OrderNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Orders::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Orders::TotalAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string_len(20)
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(
                        ColumnDef::new(Orders::IsDistributed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(&mut created_at_column(Orders::CreatedAt))
                    .col(&mut created_at_column(Orders::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, OrderItems::Id))
                    .col(ColumnDef::new(OrderItems::OrderId).big_integer().not_null())
                    .col(ColumnDef::new(OrderItems::CourseId).big_integer().null())
                    .col(ColumnDef::new(OrderItems::EventId).big_integer().null())
                    .col(ColumnDef::new(OrderItems::BookId).big_integer().null())
                    .col(ColumnDef::new(OrderItems::OrganizationId).big_integer().null())
                    .col(ColumnDef::new(OrderItems::Price).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, Payments::Id))
                    .col(ColumnDef::new(Payments::OrderId).big_integer().not_null())
                    .col(ColumnDef::new(Payments::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payments::Currency)
                            .string_len(10)
                            .not_null()
                            .default("KES"),
                    )
                    .col(
                        ColumnDef::new(Payments::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Payments::Reference)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payments::TransactionId).string_len(255).null())
                    .col(&mut created_at_column(Payments::CreatedAt))
                    .col(&mut created_at_column(Payments::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_order")
                            .from(Payments::Table, Payments::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Books::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrgMemberships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
