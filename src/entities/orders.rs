use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub order_number: String,
    pub user_id: i64,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    /// set once by settlement, never cleared
    pub is_distributed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Marker embedded in every ledger description produced for this order.
    pub fn ledger_marker(&self) -> String {
        format!("Order #{}", self.order_number)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
