use crate::config::LedgerConfig;
use crate::entities::{
    TransactionType, WalletOwner, order_entity as orders, order_item_entity as order_items,
    organization_entity as organizations, wallet_entity as wallets,
    wallet_transaction_entity as wallet_transactions,
};
use crate::error::{AppError, AppResult};
use crate::models::SettlementOutcome;
use crate::services::ownership::{load_purchased_item, resolve_seller_wallet};
use crate::services::wallet_service::{deposit, ensure_wallet};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

/// Splits a line price into `(seller_net, commission)`. The commission is
/// rounded half away from zero to a whole minor unit and the seller gets the
/// remainder, so the two always add up to `price`.
pub fn split_price(price: i64, fee_rate: Decimal) -> AppResult<(i64, i64)> {
    if price < 0 {
        return Err(AppError::InvalidAmount(price));
    }
    let commission = (Decimal::from(price) * fee_rate)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| AppError::InternalError(format!("Commission overflow on {price}")))?;
    Ok((price - commission, commission))
}

#[derive(Clone)]
pub struct SettlementService {
    pool: DatabaseConnection,
    ledger: LedgerConfig,
}

impl SettlementService {
    pub fn new(pool: DatabaseConnection, ledger: LedgerConfig) -> Self {
        Self { pool, ledger }
    }

    /// Credits every seller of a paid order and books the platform commission.
    /// Safe to call any number of times per order: only the first call posts.
    /// Orders whose payment is not confirmed are left alone.
    pub async fn distribute_order_revenue(&self, order_id: i64) -> AppResult<SettlementOutcome> {
        let order = orders::Entity::find_by_id(order_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

        if self.already_distributed(&order).await? {
            log::info!("Order #{} already distributed, skipping", order.order_number);
            return Ok(SettlementOutcome::AlreadyDistributed);
        }
        if !order.is_paid() {
            log::warn!(
                "Order #{} is {}, not settling",
                order.order_number,
                order.payment_status
            );
            return Ok(SettlementOutcome::NotPaid);
        }

        let platform = self.platform_wallet().await?;

        let txn = self.pool.begin().await?;

        // a duplicate webhook may have won the race since the check above
        let order = orders::Entity::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;
        if order.is_distributed {
            return Ok(SettlementOutcome::AlreadyDistributed);
        }
        if !order.is_paid() {
            return Ok(SettlementOutcome::NotPaid);
        }

        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order_id))
            .order_by_asc(order_items::Column::Id)
            .all(&txn)
            .await?;

        let marker = order.ledger_marker();
        let mut items_settled = 0;
        let mut items_skipped = 0;
        let mut seller_total = 0i64;
        let mut commission_total = 0i64;

        for item in &items {
            let resolved = load_purchased_item(&txn, item)
                .await?
                .and_then(|purchased| resolve_seller_wallet(&purchased).map(|o| (purchased, o)));
            let Some((purchased, owner)) = resolved else {
                log::warn!(
                    "No seller wallet for item {} of order #{}, skipping",
                    item.id,
                    order.order_number
                );
                items_skipped += 1;
                continue;
            };

            let (net, commission) = split_price(item.price, self.ledger.platform_fee_rate)?;
            let label = purchased.label();

            if net > 0 {
                let seller = ensure_wallet(&txn, owner, &self.ledger.currency).await?;
                deposit(
                    &txn,
                    seller.id,
                    net,
                    &format!("Earnings from {label} ({marker})"),
                    TransactionType::Credit,
                )
                .await?;
            }
            if commission > 0 {
                deposit(
                    &txn,
                    platform.id,
                    commission,
                    &format!("Commission from {label} ({marker})"),
                    TransactionType::Fee,
                )
                .await?;
            }

            items_settled += 1;
            seller_total += net;
            commission_total += commission;
        }

        let order_number = order.order_number.clone();
        let mut am = order.into_active_model();
        am.is_distributed = Set(true);
        am.updated_at = Set(Utc::now());
        am.update(&txn).await?;

        txn.commit().await?;

        log::info!(
            "Order #{order_number} distributed: {items_settled} settled, {items_skipped} skipped, sellers {seller_total}, commission {commission_total}"
        );

        Ok(SettlementOutcome::Distributed {
            items_settled,
            items_skipped,
            seller_total,
            commission_total,
        })
    }

    async fn already_distributed(&self, order: &orders::Model) -> AppResult<bool> {
        if order.is_distributed {
            return Ok(true);
        }
        let posted = wallet_transactions::Entity::find()
            .filter(
                wallet_transactions::Column::Description
                    .contains(format!("({})", order.ledger_marker())),
            )
            .count(&self.pool)
            .await?;
        Ok(posted > 0)
    }

    /// The platform organization's wallet, created with the organization on
    /// first use.
    pub async fn platform_wallet(&self) -> AppResult<wallets::Model> {
        let org = ensure_platform_organization(&self.pool, &self.ledger).await?;
        ensure_wallet(
            &self.pool,
            WalletOwner::Organization(org.id),
            &self.ledger.currency,
        )
        .await
    }
}

async fn find_organization_by_slug<C>(conn: &C, slug: &str) -> AppResult<Option<organizations::Model>>
where
    C: ConnectionTrait,
{
    Ok(organizations::Entity::find()
        .filter(organizations::Column::Slug.eq(slug))
        .one(conn)
        .await?)
}

pub async fn ensure_platform_organization<C>(
    conn: &C,
    ledger: &LedgerConfig,
) -> AppResult<organizations::Model>
where
    C: ConnectionTrait,
{
    if let Some(org) = find_organization_by_slug(conn, &ledger.platform_org_slug).await? {
        return Ok(org);
    }

    log::info!("Creating platform organization '{}'", ledger.platform_org_slug);
    let am = organizations::ActiveModel {
        name: Set(ledger.platform_org_name.clone()),
        slug: Set(ledger.platform_org_slug.clone()),
        status: Set("active".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    organizations::Entity::insert(am)
        .on_conflict(
            OnConflict::column(organizations::Column::Slug)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    find_organization_by_slug(conn, &ledger.platform_org_slug)
        .await?
        .ok_or_else(|| AppError::InternalError("Platform organization missing".to_string()))
}
