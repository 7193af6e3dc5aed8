use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "organization")]
    Organization,
}

/// Who a wallet (or a set of banking details) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletOwner {
    User(i64),
    Organization(i64),
}

impl WalletOwner {
    pub fn kind(&self) -> OwnerKind {
        match self {
            WalletOwner::User(_) => OwnerKind::User,
            WalletOwner::Organization(_) => OwnerKind::Organization,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            WalletOwner::User(id) | WalletOwner::Organization(id) => *id,
        }
    }

    pub fn from_parts(kind: OwnerKind, id: i64) -> Self {
        match kind {
            OwnerKind::User => WalletOwner::User(id),
            OwnerKind::Organization => WalletOwner::Organization(id),
        }
    }
}

impl std::fmt::Display for WalletOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletOwner::User(id) => write!(f, "user:{id}"),
            WalletOwner::Organization(id) => write!(f, "organization:{id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_kind: OwnerKind,
    pub owner_id: i64,
    /// minor units
    pub balance: i64,
    pub currency: String,
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
