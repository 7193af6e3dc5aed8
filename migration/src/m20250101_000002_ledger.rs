use crate::{created_at_column, id_column};
use sea_orm_migration::prelude::*;

/// Wallets: one per owner, `owner_kind` is `user` | `organization`
#[derive(DeriveIden)]
enum Wallets {
    Table,
    Id,
    OwnerKind,
    OwnerId,
    Balance,
    Currency,
    CreatedAt,
    UpdatedAt,
}

/// Append-only ledger, amounts are signed minor units
#[derive(DeriveIden)]
enum WalletTransactions {
    Table,
    Id,
    WalletId,
    TxType,
    Amount,
    Description,
    Reference,
    BalanceAfter,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Payouts {
    Table,
    Id,
    WalletId,
    Amount,
    Status,
    Reference,
    FailureReason,
    TransferCode,
    CreatedAt,
    ProcessedAt,
    UpdatedAt,
}

/// Tokenized payee bank / mobile-money accounts
#[derive(DeriveIden)]
enum BankingDetails {
    Table,
    Id,
    OwnerKind,
    OwnerId,
    RecipientCode,
    BankName,
    DisplayNumber,
    IsVerified,
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
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, Wallets::Id))
                    .col(ColumnDef::new(Wallets::OwnerKind).string_len(16).not_null())
                    .col(ColumnDef::new(Wallets::OwnerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Wallets::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::Currency)
                            .string_len(10)
                            .not_null()
                            .default("KES"),
                    )
                    .col(&mut created_at_column(Wallets::CreatedAt))
                    .col(&mut created_at_column(Wallets::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_wallets_owner")
                    .table(Wallets::Table)
                    .col(Wallets::OwnerKind)
                    .col(Wallets::OwnerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalletTransactions::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, WalletTransactions::Id))
                    .col(
                        ColumnDef::new(WalletTransactions::WalletId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::TxType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::Reference)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(&mut created_at_column(WalletTransactions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallet_transactions_wallet")
                            .from(WalletTransactions::Table, WalletTransactions::WalletId)
                            .to(Wallets::Table, Wallets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_wallet_transactions_wallet_id")
                    .table(WalletTransactions::Table)
                    .col(WalletTransactions::WalletId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payouts::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, Payouts::Id))
                    .col(ColumnDef::new(Payouts::WalletId).big_integer().not_null())
                    .col(ColumnDef::new(Payouts::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payouts::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Payouts::Reference)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payouts::FailureReason).text().null())
                    .col(ColumnDef::new(Payouts::TransferCode).string_len(100).null())
                    .col(&mut created_at_column(Payouts::CreatedAt))
                    .col(
                        ColumnDef::new(Payouts::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(&mut created_at_column(Payouts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payouts_wallet")
                            .from(Payouts::Table, Payouts::WalletId)
                            .to(Wallets::Table, Wallets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // worker scans pending payouts oldest first
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payouts_status_created_at")
                    .table(Payouts::Table)
                    .col(Payouts::Status)
                    .col(Payouts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BankingDetails::Table)
                    .if_not_exists()
                    .col(&mut id_column(manager, BankingDetails::Id))
                    .col(
                        ColumnDef::new(BankingDetails::OwnerKind)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankingDetails::OwnerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(BankingDetails::RecipientCode)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankingDetails::BankName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankingDetails::DisplayNumber)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BankingDetails::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(&mut created_at_column(BankingDetails::CreatedAt))
                    .col(&mut created_at_column(BankingDetails::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_banking_details_owner")
                    .table(BankingDetails::Table)
                    .col(BankingDetails::OwnerKind)
                    .col(BankingDetails::OwnerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BankingDetails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payouts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalletTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        Ok(())
    }
}
