use crate::entities::{order_entity as orders, payment_entity as payments};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct PaymentService {
    pool: DatabaseConnection,
}

impl PaymentService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Records a confirmed charge and marks its order paid. Returns the order
    /// id; a repeated confirmation changes nothing and returns the same id.
    pub async fn confirm_charge(
        &self,
        reference: &str,
        provider_transaction_id: Option<String>,
    ) -> AppResult<i64> {
        let txn = self.pool.begin().await?;

        let payment = payments::Entity::find()
            .filter(payments::Column::Reference.eq(reference))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment {reference} not found")))?;

        let order_id = payment.order_id;
        if payment.is_successful() {
            return Ok(order_id);
        }

        let now = Utc::now();
        let mut am = payment.into_active_model();
        am.status = Set("successful".to_string());
        if provider_transaction_id.is_some() {
            am.transaction_id = Set(provider_transaction_id);
        }
        am.updated_at = Set(now);
        am.update(&txn).await?;

        let order = orders::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;
        let mut am = order.into_active_model();
        am.payment_status = Set("paid".to_string());
        am.status = Set("completed".to_string());
        am.updated_at = Set(now);
        am.update(&txn).await?;

        txn.commit().await?;

        log::info!("Payment {reference} confirmed for order {order_id}");
        Ok(order_id)
    }

    /// Records a charge Paystack did not complete. A payment already marked
    /// successful is never downgraded. Returns the order id.
    pub async fn record_failed_charge(&self, reference: &str) -> AppResult<i64> {
        let txn = self.pool.begin().await?;

        let payment = payments::Entity::find()
            .filter(payments::Column::Reference.eq(reference))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment {reference} not found")))?;

        let order_id = payment.order_id;
        if payment.is_successful() {
            log::warn!("Payment {reference} already successful, ignoring failed verification");
            return Ok(order_id);
        }

        let mut am = payment.into_active_model();
        am.status = Set("failed".to_string());
        am.updated_at = Set(Utc::now());
        am.update(&txn).await?;

        txn.commit().await?;

        log::info!("Payment {reference} for order {order_id} marked failed");
        Ok(order_id)
    }
}
