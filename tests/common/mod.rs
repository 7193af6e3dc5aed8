#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use evuka_backend::config::{LedgerConfig, PayoutConfig};
use evuka_backend::entities::{
    ItemTarget, MembershipRole, WalletOwner, banking_detail_entity as banking_details,
    book_entity as books, course_entity as courses, event_entity as events,
    order_entity as orders, order_item_entity as order_items,
    org_membership_entity as memberships, organization_entity as organizations,
    payment_entity as payments, user_entity as users, wallet_entity as wallets,
    wallet_transaction_entity as wallet_transactions,
};
use evuka_backend::error::{AppError, AppResult};
use evuka_backend::external::{TransferGateway, TransferOutcome, TransferRecipient};
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Mutex;

/// Fresh in-memory database with the full schema. A single connection keeps
/// the database alive for the whole test.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("failed to open sqlite");
    Migrator::up(&db, None).await.expect("migrations failed");
    db
}

pub fn ledger_config() -> LedgerConfig {
    LedgerConfig::default()
}

pub fn payout_config() -> PayoutConfig {
    PayoutConfig {
        min_amount: 50,
        batch_size: 20,
        interval_secs: 60,
    }
}

pub async fn seed_user(db: &DatabaseConnection, username: &str) -> i64 {
    users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(Some(format!("{username}@example.com"))),
        is_staff: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn seed_organization(db: &DatabaseConnection, name: &str, slug: &str) -> i64 {
    organizations::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        status: Set("approved".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn seed_membership(
    db: &DatabaseConnection,
    organization_id: i64,
    user_id: i64,
    role: MembershipRole,
) {
    memberships::ActiveModel {
        organization_id: Set(organization_id),
        user_id: Set(user_id),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_course(
    db: &DatabaseConnection,
    title: &str,
    creator_id: i64,
    organization_id: Option<i64>,
    price: i64,
) -> i64 {
    courses::ActiveModel {
        title: Set(title.to_string()),
        creator_id: Set(creator_id),
        organization_id: Set(organization_id),
        price: Set(price),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn seed_event(
    db: &DatabaseConnection,
    title: &str,
    organizer_id: Option<i64>,
    course_id: Option<i64>,
    price: i64,
) -> i64 {
    events::ActiveModel {
        title: Set(title.to_string()),
        organizer_id: Set(organizer_id),
        course_id: Set(course_id),
        price: Set(price),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn seed_book(
    db: &DatabaseConnection,
    title: &str,
    created_by: Option<i64>,
    price: i64,
) -> i64 {
    books::ActiveModel {
        title: Set(title.to_string()),
        created_by: Set(created_by),
        price: Set(price),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

/// Paid order with one line per `(target, price)`.
pub async fn seed_order(
    db: &DatabaseConnection,
    order_number: &str,
    buyer_id: i64,
    lines: &[(ItemTarget, i64)],
) -> i64 {
    let now = Utc::now();
    let order = orders::ActiveModel {
        order_number: Set(order_number.to_string()),
        user_id: Set(buyer_id),
        total_amount: Set(lines.iter().map(|(_, price)| price).sum()),
        status: Set("paid".to_string()),
        payment_status: Set("paid".to_string()),
        is_distributed: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    for (target, price) in lines {
        let (course_id, event_id, book_id, organization_id) = match *target {
            ItemTarget::Course(id) => (Some(id), None, None, None),
            ItemTarget::Event(id) => (None, Some(id), None, None),
            ItemTarget::Book(id) => (None, None, Some(id), None),
            ItemTarget::Membership(id) => (None, None, None, Some(id)),
        };
        order_items::ActiveModel {
            order_id: Set(order.id),
            course_id: Set(course_id),
            event_id: Set(event_id),
            book_id: Set(book_id),
            organization_id: Set(organization_id),
            price: Set(*price),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }
    order.id
}

/// Unpaid order plus a pending payment, as checkout leaves them.
pub async fn seed_pending_checkout(
    db: &DatabaseConnection,
    order_number: &str,
    buyer_id: i64,
    lines: &[(ItemTarget, i64)],
    reference: &str,
) -> i64 {
    let order_id = seed_order(db, order_number, buyer_id, lines).await;
    let order = orders::Entity::find_by_id(order_id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    let mut am: orders::ActiveModel = order.clone().into();
    am.status = Set("pending".to_string());
    am.payment_status = Set("unpaid".to_string());
    am.update(db).await.unwrap();

    let now = Utc::now();
    payments::ActiveModel {
        order_id: Set(order_id),
        user_id: Set(buyer_id),
        amount: Set(order.total_amount),
        currency: Set("KES".to_string()),
        status: Set("pending".to_string()),
        reference: Set(reference.to_string()),
        transaction_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    order_id
}

pub async fn link_bank(db: &DatabaseConnection, owner: WalletOwner) {
    let now = Utc::now();
    banking_details::ActiveModel {
        owner_kind: Set(owner.kind()),
        owner_id: Set(owner.id()),
        recipient_code: Set(format!("RCP_{}", owner.id())),
        bank_name: Set("M-Pesa".to_string()),
        display_number: Set("071****89".to_string()),
        is_verified: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn unlink_bank(db: &DatabaseConnection, owner: WalletOwner) {
    banking_details::Entity::delete_many()
        .filter(banking_details::Column::OwnerKind.eq(owner.kind()))
        .filter(banking_details::Column::OwnerId.eq(owner.id()))
        .exec(db)
        .await
        .unwrap();
}

pub async fn wallet_of(db: &DatabaseConnection, owner: WalletOwner) -> Option<wallets::Model> {
    wallets::Entity::find()
        .filter(wallets::Column::OwnerKind.eq(owner.kind()))
        .filter(wallets::Column::OwnerId.eq(owner.id()))
        .one(db)
        .await
        .unwrap()
}

pub async fn balance_of(db: &DatabaseConnection, owner: WalletOwner) -> i64 {
    wallet_of(db, owner).await.map_or(0, |w| w.balance)
}

/// Ledger entries of a wallet in posting order.
pub async fn ledger_of(db: &DatabaseConnection, wallet_id: i64) -> Vec<wallet_transactions::Model> {
    wallet_transactions::Entity::find()
        .filter(wallet_transactions::Column::WalletId.eq(wallet_id))
        .order_by_asc(wallet_transactions::Column::Id)
        .all(db)
        .await
        .unwrap()
}

pub async fn platform_owner(db: &DatabaseConnection) -> WalletOwner {
    let org = organizations::Entity::find()
        .filter(organizations::Column::Slug.eq(ledger_config().platform_org_slug))
        .one(db)
        .await
        .unwrap()
        .expect("platform organization not created");
    WalletOwner::Organization(org.id)
}

#[derive(Debug, Clone)]
pub enum GatewayMode {
    Accept,
    Reject(String),
    Transport,
}

/// Scripted transfer provider that records every call.
pub struct FakeGateway {
    mode: Mutex<GatewayMode>,
    pub transfers: Mutex<Vec<(i64, String, String)>>,
    pub recipients: Mutex<Vec<(String, String)>>,
}

impl FakeGateway {
    pub fn new(mode: GatewayMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            transfers: Mutex::new(Vec::new()),
            recipients: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: GatewayMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }
}

#[async_trait]
impl TransferGateway for FakeGateway {
    async fn create_recipient(
        &self,
        _name: &str,
        account_number: &str,
        bank_code: &str,
        _currency: &str,
    ) -> AppResult<TransferRecipient> {
        self.recipients
            .lock()
            .unwrap()
            .push((account_number.to_string(), bank_code.to_string()));
        Ok(TransferRecipient {
            recipient_code: format!("RCP_{account_number}"),
            bank_name: Some("M-Pesa".to_string()),
        })
    }

    async fn initiate_transfer(
        &self,
        amount: i64,
        recipient_code: &str,
        reference: &str,
        _reason: &str,
    ) -> AppResult<TransferOutcome> {
        self.transfers.lock().unwrap().push((
            amount,
            recipient_code.to_string(),
            reference.to_string(),
        ));
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            GatewayMode::Accept => Ok(TransferOutcome::Accepted {
                transfer_code: format!("TRF_{reference}"),
            }),
            GatewayMode::Reject(message) => Ok(TransferOutcome::Rejected { message }),
            GatewayMode::Transport => Err(AppError::ExternalApiError(
                "connection reset by peer".to_string(),
            )),
        }
    }
}
