mod common;

use common::*;
use evuka_backend::entities::{
    ItemTarget, TransactionType, WalletOwner, order_entity as orders,
    wallet_transaction_entity as wallet_transactions,
};
use evuka_backend::models::SettlementOutcome;
use evuka_backend::services::{PaymentService, SettlementService};
use evuka_backend::services::wallet_service::{deposit, ensure_wallet};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

async fn is_distributed(db: &DatabaseConnection, order_id: i64) -> bool {
    orders::Entity::find_by_id(order_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .is_distributed
}

#[tokio::test]
async fn independent_course_splits_ninety_ten() {
    let db = setup_db().await;
    let tutor = seed_user(&db, "tutor").await;
    let buyer = seed_user(&db, "buyer").await;
    let course = seed_course(&db, "Algebra", tutor, None, 1_000).await;
    let order = seed_order(&db, "1001", buyer, &[(ItemTarget::Course(course), 1_000)]).await;

    let service = SettlementService::new(db.clone(), ledger_config());
    let outcome = service.distribute_order_revenue(order).await.unwrap();
    assert_eq!(
        outcome,
        SettlementOutcome::Distributed {
            items_settled: 1,
            items_skipped: 0,
            seller_total: 900,
            commission_total: 100,
        }
    );

    let seller = wallet_of(&db, WalletOwner::User(tutor)).await.unwrap();
    assert_eq!(seller.balance, 900);
    let entries = ledger_of(&db, seller.id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].tx_type, TransactionType::Credit);
    assert_eq!(entries[0].balance_after, 900);
    assert_eq!(entries[0].description, "Earnings from Course: Algebra (Order #1001)");

    let platform = wallet_of(&db, platform_owner(&db).await).await.unwrap();
    assert_eq!(platform.balance, 100);
    let entries = ledger_of(&db, platform.id).await;
    assert_eq!(entries[0].tx_type, TransactionType::Fee);
    assert_eq!(entries[0].balance_after, 100);

    assert!(is_distributed(&db, order).await);
}

#[tokio::test]
async fn second_settlement_is_a_no_op() {
    let db = setup_db().await;
    let tutor = seed_user(&db, "tutor").await;
    let course = seed_course(&db, "Algebra", tutor, None, 1_000).await;
    let order = seed_order(&db, "1002", tutor, &[(ItemTarget::Course(course), 1_000)]).await;

    let service = SettlementService::new(db.clone(), ledger_config());
    service.distribute_order_revenue(order).await.unwrap();
    let ledger_rows = wallet_transactions::Entity::find().count(&db).await.unwrap();

    let again = service.distribute_order_revenue(order).await.unwrap();
    assert_eq!(again, SettlementOutcome::AlreadyDistributed);
    assert_eq!(
        wallet_transactions::Entity::find().count(&db).await.unwrap(),
        ledger_rows
    );
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 900);
}

#[tokio::test]
async fn unpaid_order_is_not_settled_until_payment_confirms() {
    let db = setup_db().await;
    let tutor = seed_user(&db, "tutor").await;
    let buyer = seed_user(&db, "buyer").await;
    let course = seed_course(&db, "Algebra", tutor, None, 1_000).await;
    let order = seed_pending_checkout(
        &db,
        "2001",
        buyer,
        &[(ItemTarget::Course(course), 1_000)],
        "REF-2001",
    )
    .await;

    let service = SettlementService::new(db.clone(), ledger_config());
    let outcome = service.distribute_order_revenue(order).await.unwrap();
    assert_eq!(outcome, SettlementOutcome::NotPaid);
    assert_eq!(wallet_transactions::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 0);
    assert!(!is_distributed(&db, order).await);

    PaymentService::new(db.clone())
        .confirm_charge("REF-2001", Some("555".to_string()))
        .await
        .unwrap();
    let outcome = service.distribute_order_revenue(order).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::Distributed { seller_total: 900, .. }));
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 900);
}

#[tokio::test]
async fn ledger_marker_blocks_resettlement_of_unflagged_order() {
    let db = setup_db().await;
    let tutor = seed_user(&db, "tutor").await;
    let course = seed_course(&db, "Algebra", tutor, None, 1_000).await;
    let order = seed_order(&db, "1003", tutor, &[(ItemTarget::Course(course), 1_000)]).await;

    // posted by an earlier run that never got to set the flag
    let wallet = ensure_wallet(&db, WalletOwner::User(tutor), "KES").await.unwrap();
    deposit(
        &db,
        wallet.id,
        900,
        "Earnings from Course: Algebra (Order #1003)",
        TransactionType::Credit,
    )
    .await
    .unwrap();

    let service = SettlementService::new(db.clone(), ledger_config());
    let outcome = service.distribute_order_revenue(order).await.unwrap();
    assert_eq!(outcome, SettlementOutcome::AlreadyDistributed);
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 900);
}

#[tokio::test]
async fn marker_match_is_exact_on_order_number() {
    let db = setup_db().await;
    let tutor = seed_user(&db, "tutor").await;
    let course = seed_course(&db, "Algebra", tutor, None, 1_000).await;
    let first = seed_order(&db, "10", tutor, &[(ItemTarget::Course(course), 1_000)]).await;
    let second = seed_order(&db, "100", tutor, &[(ItemTarget::Course(course), 1_000)]).await;

    let service = SettlementService::new(db.clone(), ledger_config());
    service.distribute_order_revenue(second).await.unwrap();
    let outcome = service.distribute_order_revenue(first).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::Distributed { .. }));
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 1_800);
}

#[tokio::test]
async fn organization_items_credit_the_organization() {
    let db = setup_db().await;
    let tutor = seed_user(&db, "tutor").await;
    let org = seed_organization(&db, "Academy", "academy").await;
    let course = seed_course(&db, "Physics", tutor, Some(org), 2_000).await;
    let event = seed_event(&db, "Physics Live", Some(tutor), Some(course), 500).await;
    let order = seed_order(
        &db,
        "2001",
        tutor,
        &[
            (ItemTarget::Course(course), 2_000),
            (ItemTarget::Event(event), 500),
            (ItemTarget::Membership(org), 300),
        ],
    )
    .await;

    let service = SettlementService::new(db.clone(), ledger_config());
    service.distribute_order_revenue(order).await.unwrap();

    assert_eq!(balance_of(&db, WalletOwner::Organization(org)).await, 1_800 + 450 + 270);
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 0);
    assert_eq!(balance_of(&db, platform_owner(&db).await).await, 200 + 50 + 30);
}

#[tokio::test]
async fn unresolvable_items_are_skipped_without_aborting() {
    let db = setup_db().await;
    let author = seed_user(&db, "author").await;
    let orphan_event = seed_event(&db, "Orphan", None, None, 700).await;
    let book = seed_book(&db, "Notes", Some(author), 400).await;
    let order = seed_order(
        &db,
        "3001",
        author,
        &[
            (ItemTarget::Event(orphan_event), 700),
            (ItemTarget::Book(book), 400),
            // dangling reference
            (ItemTarget::Course(9_999), 100),
        ],
    )
    .await;

    let service = SettlementService::new(db.clone(), ledger_config());
    let outcome = service.distribute_order_revenue(order).await.unwrap();
    assert_eq!(
        outcome,
        SettlementOutcome::Distributed {
            items_settled: 1,
            items_skipped: 2,
            seller_total: 360,
            commission_total: 40,
        }
    );
    assert_eq!(balance_of(&db, WalletOwner::User(author)).await, 360);
    assert!(is_distributed(&db, order).await);
}

#[tokio::test]
async fn settlement_conserves_money_and_skips_zero_legs() {
    let db = setup_db().await;
    let tutor = seed_user(&db, "tutor").await;
    let paid = seed_course(&db, "Paid", tutor, None, 15).await;
    let free = seed_course(&db, "Free", tutor, None, 0).await;
    let order = seed_order(
        &db,
        "4001",
        tutor,
        &[(ItemTarget::Course(paid), 15), (ItemTarget::Course(free), 0)],
    )
    .await;

    let service = SettlementService::new(db.clone(), ledger_config());
    let outcome = service.distribute_order_revenue(order).await.unwrap();
    let SettlementOutcome::Distributed {
        seller_total,
        commission_total,
        items_settled,
        ..
    } = outcome
    else {
        panic!("expected a distribution");
    };
    // 1.5 rounds away from zero
    assert_eq!((seller_total, commission_total), (13, 2));
    assert_eq!(seller_total + commission_total, 15);
    assert_eq!(items_settled, 2);

    // free item posts nothing
    let seller = wallet_of(&db, WalletOwner::User(tutor)).await.unwrap();
    assert_eq!(ledger_of(&db, seller.id).await.len(), 1);
}

#[tokio::test]
async fn platform_wallet_is_created_once() {
    let db = setup_db().await;
    let service = SettlementService::new(db.clone(), ledger_config());
    let a = service.platform_wallet().await.unwrap();
    let b = service.platform_wallet().await.unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.owner(), platform_owner(&db).await);
}
