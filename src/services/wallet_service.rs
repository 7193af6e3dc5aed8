use crate::entities::{
    MembershipRole, TransactionType, WalletOwner, org_membership_entity as memberships,
    payout_entity as payouts, wallet_entity as wallets,
    wallet_transaction_entity as wallet_transactions,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    PaginatedResponse, PaginationParams, PayoutResponse, TransactionResponse, WalletOverviewResponse,
    WalletQuery, WalletView,
};
use crate::utils::generate_transaction_reference;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

const RECENT_LIMIT: u64 = 10;

/// Credits `amount` to the wallet and appends the matching ledger entry.
///
/// Runs in its own transaction, or in a savepoint when `conn` already is one,
/// so callers can group several postings into a single unit of work.
pub async fn deposit<C>(
    conn: &C,
    wallet_id: i64,
    amount: i64,
    description: &str,
    tx_type: TransactionType,
) -> AppResult<wallet_transactions::Model>
where
    C: TransactionTrait,
{
    if amount <= 0 {
        return Err(AppError::InvalidAmount(amount));
    }
    post_entry(conn, wallet_id, amount, description, tx_type).await
}

/// Debits `amount`. The balance check happens on the row read under the lock,
/// never on a value the caller fetched earlier.
pub async fn withdraw<C>(
    conn: &C,
    wallet_id: i64,
    amount: i64,
    description: &str,
    tx_type: TransactionType,
) -> AppResult<wallet_transactions::Model>
where
    C: TransactionTrait,
{
    if amount <= 0 {
        return Err(AppError::InvalidAmount(amount));
    }
    post_entry(conn, wallet_id, -amount, description, tx_type).await
}

async fn post_entry<C>(
    conn: &C,
    wallet_id: i64,
    delta: i64,
    description: &str,
    tx_type: TransactionType,
) -> AppResult<wallet_transactions::Model>
where
    C: TransactionTrait,
{
    let txn = conn.begin().await?;

    let wallet = wallets::Entity::find_by_id(wallet_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Wallet {wallet_id} not found")))?;

    if delta < 0 && wallet.balance < -delta {
        return Err(AppError::InsufficientFunds {
            requested: -delta,
            available: wallet.balance,
        });
    }

    let new_balance = wallet.balance.checked_add(delta).ok_or_else(|| {
        AppError::InternalError(format!("Balance overflow on wallet {wallet_id}"))
    })?;

    let now = Utc::now();
    let mut am = wallet.into_active_model();
    am.balance = Set(new_balance);
    am.updated_at = Set(now);
    am.update(&txn).await?;

    let entry = wallet_transactions::ActiveModel {
        wallet_id: Set(wallet_id),
        tx_type: Set(tx_type),
        amount: Set(delta),
        description: Set(description.to_string()),
        reference: Set(generate_transaction_reference()),
        balance_after: Set(new_balance),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    log::info!(
        "Wallet {wallet_id} {tx_type} {delta:+} -> {new_balance} ({})",
        entry.reference
    );

    Ok(entry)
}

pub async fn find_wallet<C>(conn: &C, owner: WalletOwner) -> AppResult<Option<wallets::Model>>
where
    C: ConnectionTrait,
{
    Ok(wallets::Entity::find()
        .filter(wallets::Column::OwnerKind.eq(owner.kind()))
        .filter(wallets::Column::OwnerId.eq(owner.id()))
        .one(conn)
        .await?)
}

/// Returns the owner's wallet, creating an empty one on first use. Two
/// concurrent callers both end up with the same row.
pub async fn ensure_wallet<C>(
    conn: &C,
    owner: WalletOwner,
    currency: &str,
) -> AppResult<wallets::Model>
where
    C: ConnectionTrait,
{
    if let Some(wallet) = find_wallet(conn, owner).await? {
        return Ok(wallet);
    }

    let now = Utc::now();
    let am = wallets::ActiveModel {
        owner_kind: Set(owner.kind()),
        owner_id: Set(owner.id()),
        balance: Set(0),
        currency: Set(currency.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    wallets::Entity::insert(am)
        .on_conflict(
            OnConflict::columns([wallets::Column::OwnerKind, wallets::Column::OwnerId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    find_wallet(conn, owner)
        .await?
        .ok_or_else(|| AppError::InternalError(format!("Wallet for {owner} vanished after insert")))
}

pub async fn find_active_membership<C>(
    conn: &C,
    organization_id: i64,
    user_id: i64,
) -> AppResult<Option<memberships::Model>>
where
    C: ConnectionTrait,
{
    Ok(memberships::Entity::find()
        .filter(memberships::Column::OrganizationId.eq(organization_id))
        .filter(memberships::Column::UserId.eq(user_id))
        .filter(memberships::Column::IsActive.eq(true))
        .one(conn)
        .await?)
}

#[derive(Clone)]
pub struct WalletService {
    pool: DatabaseConnection,
    currency: String,
}

impl WalletService {
    pub fn new(pool: DatabaseConnection, currency: String) -> Self {
        Self { pool, currency }
    }

    pub async fn ensure_wallet(&self, owner: WalletOwner) -> AppResult<wallets::Model> {
        ensure_wallet(&self.pool, owner, &self.currency).await
    }

    pub async fn deposit(
        &self,
        wallet_id: i64,
        amount: i64,
        description: &str,
        tx_type: TransactionType,
    ) -> AppResult<wallet_transactions::Model> {
        deposit(&self.pool, wallet_id, amount, description, tx_type).await
    }

    pub async fn withdraw(
        &self,
        wallet_id: i64,
        amount: i64,
        description: &str,
        tx_type: TransactionType,
    ) -> AppResult<wallet_transactions::Model> {
        withdraw(&self.pool, wallet_id, amount, description, tx_type).await
    }

    /// Dashboard summary. With an organization id the caller must be an active
    /// member; owners and admins get the organization's wallet, everyone else
    /// only sees their personal earnings.
    pub async fn overview(
        &self,
        user_id: i64,
        organization_id: Option<i64>,
    ) -> AppResult<WalletOverviewResponse> {
        let personal = self.ensure_wallet(WalletOwner::User(user_id)).await?;

        let (view, organization_wallet) = match organization_id {
            None => (WalletView::Personal, None),
            Some(org_id) => {
                let role = self.member_role(org_id, user_id).await?;
                if role.manages_finances() {
                    let org_wallet = self.ensure_wallet(WalletOwner::Organization(org_id)).await?;
                    (WalletView::OrganizationAdmin, Some(org_wallet))
                } else {
                    (WalletView::OrganizationMember, None)
                }
            }
        };

        let focus_id = organization_wallet.as_ref().map_or(personal.id, |w| w.id);

        let recent_transactions = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(focus_id))
            .order_by_desc(wallet_transactions::Column::CreatedAt)
            .order_by_desc(wallet_transactions::Column::Id)
            .limit(RECENT_LIMIT)
            .all(&self.pool)
            .await?;

        let recent_payouts = payouts::Entity::find()
            .filter(payouts::Column::WalletId.eq(focus_id))
            .order_by_desc(payouts::Column::CreatedAt)
            .order_by_desc(payouts::Column::Id)
            .limit(RECENT_LIMIT)
            .all(&self.pool)
            .await?;

        Ok(WalletOverviewResponse {
            view,
            personal_wallet: personal.into(),
            organization_wallet: organization_wallet.map(Into::into),
            recent_transactions: recent_transactions.into_iter().map(Into::into).collect(),
            recent_payouts: recent_payouts.into_iter().map(Into::into).collect(),
        })
    }

    /// Ledger entries, newest first.
    pub async fn list_transactions(
        &self,
        user_id: i64,
        query: &WalletQuery,
    ) -> AppResult<PaginatedResponse<TransactionResponse>> {
        let wallet = self.readable_wallet(user_id, query.organization_id).await?;
        let params = PaginationParams::new(query.page, query.page_size);

        let base = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::WalletId.eq(wallet.id));
        let total = base.clone().count(&self.pool).await? as i64;

        let rows = base
            .order_by_desc(wallet_transactions::Column::CreatedAt)
            .order_by_desc(wallet_transactions::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(Into::into).collect(),
            &params,
            total,
        ))
    }

    /// Withdrawal history, newest first.
    pub async fn list_payouts(
        &self,
        user_id: i64,
        query: &WalletQuery,
    ) -> AppResult<PaginatedResponse<PayoutResponse>> {
        let wallet = self.readable_wallet(user_id, query.organization_id).await?;
        let params = PaginationParams::new(query.page, query.page_size);

        let base = payouts::Entity::find().filter(payouts::Column::WalletId.eq(wallet.id));
        let total = base.clone().count(&self.pool).await? as i64;

        let rows = base
            .order_by_desc(payouts::Column::CreatedAt)
            .order_by_desc(payouts::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(Into::into).collect(),
            &params,
            total,
        ))
    }

    async fn member_role(&self, organization_id: i64, user_id: i64) -> AppResult<MembershipRole> {
        find_active_membership(&self.pool, organization_id, user_id)
            .await?
            .map(|m| m.role)
            .ok_or(AppError::Forbidden)
    }

    async fn readable_wallet(
        &self,
        user_id: i64,
        organization_id: Option<i64>,
    ) -> AppResult<wallets::Model> {
        if let Some(org_id) = organization_id {
            let role = self.member_role(org_id, user_id).await?;
            if role.manages_finances() {
                return self.ensure_wallet(WalletOwner::Organization(org_id)).await;
            }
        }
        self.ensure_wallet(WalletOwner::User(user_id)).await
    }
}
