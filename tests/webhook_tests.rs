mod common;

use actix_web::{App, test, web};
use common::*;
use evuka_backend::config::PaystackConfig;
use evuka_backend::entities::{
    ItemTarget, PayoutStatus, TransactionType, WalletOwner, order_entity as orders,
    payment_entity as payments, payout_entity as payouts,
};
use evuka_backend::external::{PaystackClient, sign_payload};
use evuka_backend::handlers::webhook_config;
use evuka_backend::models::{PayoutResponse, RequestPayoutRequest};
use evuka_backend::services::wallet_service::{deposit, ensure_wallet};
use evuka_backend::services::{PaymentService, PayoutService, SettlementService};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::json;
use std::sync::Arc;

const SECRET: &str = "sk_test_webhook_secret";

fn paystack() -> PaystackClient {
    PaystackClient::new(PaystackConfig {
        secret_key: SECRET.to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 1,
    })
}

fn payout_service(db: &DatabaseConnection) -> PayoutService {
    PayoutService::new(
        db.clone(),
        Arc::new(FakeGateway::new(GatewayMode::Accept)),
        payout_config(),
        "KES".to_string(),
    )
}

macro_rules! webhook_app {
    ($db:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(paystack()))
                .app_data(web::Data::new(PaymentService::new($db.clone())))
                .app_data(web::Data::new(SettlementService::new(
                    $db.clone(),
                    ledger_config(),
                )))
                .app_data(web::Data::new(payout_service(&$db)))
                .configure(webhook_config),
        )
        .await
    };
}

fn signed_request(body: &serde_json::Value) -> test::TestRequest {
    let raw = body.to_string();
    let signature = sign_payload(SECRET, raw.as_bytes()).unwrap();
    test::TestRequest::post()
        .uri("/webhook/paystack")
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-paystack-signature", signature))
        .set_payload(raw)
}

/// Pending payout that the worker already handed to the provider.
async fn in_flight_payout(db: &DatabaseConnection) -> (i64, PayoutResponse) {
    let user = seed_user(db, "seller").await;
    let wallet = ensure_wallet(db, WalletOwner::User(user), "KES").await.unwrap();
    deposit(db, wallet.id, 150, "Earnings", TransactionType::Credit)
        .await
        .unwrap();
    link_bank(db, WalletOwner::User(user)).await;

    let service = payout_service(db);
    let payout = service
        .request_payout(
            user,
            RequestPayoutRequest {
                amount: 100,
                organization_id: None,
            },
        )
        .await
        .unwrap();
    service.process_single_payout(payout.id).await.unwrap();
    (user, payout)
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let db = setup_db().await;
    let app = webhook_app!(db);

    let req = test::TestRequest::post()
        .uri("/webhook/paystack")
        .set_payload(r#"{"event":"charge.success","data":{}}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn forged_signature_is_rejected() {
    let db = setup_db().await;
    let app = webhook_app!(db);

    let raw = r#"{"event":"charge.success","data":{"reference":"REF-1","id":1}}"#;
    let forged = sign_payload("sk_test_attacker", raw.as_bytes()).unwrap();
    let req = test::TestRequest::post()
        .uri("/webhook/paystack")
        .insert_header(("x-paystack-signature", forged))
        .set_payload(raw)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn charge_success_marks_order_paid_and_settles_once() {
    let db = setup_db().await;
    let tutor = seed_user(&db, "tutor").await;
    let buyer = seed_user(&db, "buyer").await;
    let course = seed_course(&db, "Algebra", tutor, None, 1_000).await;
    let order_id = seed_pending_checkout(
        &db,
        "5001",
        buyer,
        &[(ItemTarget::Course(course), 1_000)],
        "PSK-REF-5001",
    )
    .await;
    let app = webhook_app!(db);

    let body = json!({
        "event": "charge.success",
        "data": { "reference": "PSK-REF-5001", "id": 302961 }
    });
    let resp = test::call_service(&app, signed_request(&body).to_request()).await;
    assert_eq!(resp.status(), 200);

    let payment = payments::Entity::find()
        .filter(payments::Column::Reference.eq("PSK-REF-5001"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(payment.is_successful());
    assert_eq!(payment.transaction_id.as_deref(), Some("302961"));

    let order = orders::Entity::find_by_id(order_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.payment_status, "paid");
    assert!(order.is_distributed);
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 900);

    // Paystack redelivers
    let resp = test::call_service(&app, signed_request(&body).to_request()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 900);
    assert_eq!(balance_of(&db, platform_owner(&db).await).await, 100);
}

#[actix_web::test]
async fn unknown_charge_reference_is_acknowledged() {
    let db = setup_db().await;
    let app = webhook_app!(db);

    let body = json!({
        "event": "charge.success",
        "data": { "reference": "NOT-OURS", "id": 1 }
    });
    let resp = test::call_service(&app, signed_request(&body).to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["received"], true);
}

#[actix_web::test]
async fn transfer_success_completes_processing_payout() {
    let db = setup_db().await;
    let (user, payout) = in_flight_payout(&db).await;
    let app = webhook_app!(db);

    let body = json!({
        "event": "transfer.success",
        "data": { "reference": payout.reference, "transfer_code": "TRF_x" }
    });
    let resp = test::call_service(&app, signed_request(&body).to_request()).await;
    assert_eq!(resp.status(), 200);

    let row = payouts::Entity::find_by_id(payout.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, PayoutStatus::Completed);
    assert_eq!(balance_of(&db, WalletOwner::User(user)).await, 50);
}

#[actix_web::test]
async fn transfer_reversal_refunds_the_wallet() {
    let db = setup_db().await;
    let (user, payout) = in_flight_payout(&db).await;
    let app = webhook_app!(db);

    let body = json!({
        "event": "transfer.reversed",
        "data": { "reference": payout.reference }
    });
    let resp = test::call_service(&app, signed_request(&body).to_request()).await;
    assert_eq!(resp.status(), 200);

    let row = payouts::Entity::find_by_id(payout.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, PayoutStatus::Failed);
    assert_eq!(row.failure_reason.as_deref(), Some("Transfer reversed by provider"));
    assert_eq!(balance_of(&db, WalletOwner::User(user)).await, 150);
}

#[actix_web::test]
async fn transfer_failure_keeps_provider_text() {
    let db = setup_db().await;
    let (user, payout) = in_flight_payout(&db).await;
    let app = webhook_app!(db);

    let body = json!({
        "event": "transfer.failed",
        "data": {
            "reference": payout.reference,
            "reason": format!("Payout {}", payout.reference),
            "gateway_response": "Recipient account is closed"
        }
    });
    let resp = test::call_service(&app, signed_request(&body).to_request()).await;
    assert_eq!(resp.status(), 200);

    let row = payouts::Entity::find_by_id(payout.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, PayoutStatus::Failed);
    assert_eq!(row.failure_reason.as_deref(), Some("Recipient account is closed"));
    assert_eq!(balance_of(&db, WalletOwner::User(user)).await, 150);
}
