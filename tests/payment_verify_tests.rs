mod common;

use actix_web::{App, test, web};
use common::*;
use evuka_backend::config::PaystackConfig;
use evuka_backend::entities::{
    ItemTarget, WalletOwner, order_entity as orders, payment_entity as payments,
};
use evuka_backend::external::PaystackClient;
use evuka_backend::handlers::payment_config;
use evuka_backend::middlewares::AuthMiddleware;
use evuka_backend::services::{PaymentService, SettlementService};
use evuka_backend::utils::JwtService;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWT_SECRET: &str = "test-secret";

macro_rules! verify_app {
    ($db:expr, $server:expr) => {
        test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(JwtService::new(JWT_SECRET, 600)))
                .app_data(web::Data::new(PaystackClient::new(PaystackConfig {
                    secret_key: "sk_test_123".to_string(),
                    base_url: $server.uri(),
                    timeout_secs: 5,
                })))
                .app_data(web::Data::new(PaymentService::new($db.clone())))
                .app_data(web::Data::new(SettlementService::new(
                    $db.clone(),
                    ledger_config(),
                )))
                .service(web::scope("/api/v1").configure(payment_config)),
        )
        .await
    };
}

fn bearer(user_id: i64) -> (String, String) {
    let token = JwtService::new(JWT_SECRET, 600)
        .generate_access_token(user_id, false)
        .unwrap();
    ("Authorization".to_string(), format!("Bearer {token}"))
}

async fn mock_verify(server: &MockServer, reference: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/transaction/verify/{reference}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Verification successful",
            "data": { "id": 4099260516u64, "status": status, "reference": reference }
        })))
        .mount(server)
        .await;
}

async fn payment(db: &DatabaseConnection, reference: &str) -> payments::Model {
    payments::Entity::find()
        .filter(payments::Column::Reference.eq(reference))
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

#[actix_web::test]
async fn verified_payment_marks_order_paid_and_settles_once() {
    let db = setup_db().await;
    let server = MockServer::start().await;
    let tutor = seed_user(&db, "tutor").await;
    let buyer = seed_user(&db, "buyer").await;
    let course = seed_course(&db, "Algebra", tutor, None, 1_000).await;
    let order = seed_pending_checkout(
        &db,
        "3001",
        buyer,
        &[(ItemTarget::Course(course), 1_000)],
        "EVK-3001",
    )
    .await;
    mock_verify(&server, "EVK-3001", "success").await;
    let app = verify_app!(db, server);

    let req = test::TestRequest::get()
        .uri("/api/v1/payments/verify/EVK-3001")
        .insert_header(bearer(buyer))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["order_id"], order);
    assert_eq!(body["data"]["settlement"]["outcome"], "distributed");

    let row = payment(&db, "EVK-3001").await;
    assert_eq!(row.status, "successful");
    assert_eq!(row.transaction_id.as_deref(), Some("4099260516"));
    let order_row = orders::Entity::find_by_id(order).one(&db).await.unwrap().unwrap();
    assert_eq!(order_row.payment_status, "paid");
    assert!(order_row.is_distributed);
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 900);

    // the browser refreshing the callback page
    let req = test::TestRequest::get()
        .uri("/api/v1/payments/verify/EVK-3001")
        .insert_header(bearer(buyer))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["settlement"]["outcome"], "already_distributed");
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 900);
}

#[actix_web::test]
async fn failed_verification_records_failure_without_settling() {
    let db = setup_db().await;
    let server = MockServer::start().await;
    let tutor = seed_user(&db, "tutor").await;
    let buyer = seed_user(&db, "buyer").await;
    let course = seed_course(&db, "Algebra", tutor, None, 1_000).await;
    let order = seed_pending_checkout(
        &db,
        "3002",
        buyer,
        &[(ItemTarget::Course(course), 1_000)],
        "EVK-3002",
    )
    .await;
    mock_verify(&server, "EVK-3002", "failed").await;
    let app = verify_app!(db, server);

    let req = test::TestRequest::get()
        .uri("/api/v1/payments/verify/EVK-3002")
        .insert_header(bearer(buyer))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    assert_eq!(payment(&db, "EVK-3002").await.status, "failed");
    let order_row = orders::Entity::find_by_id(order).one(&db).await.unwrap().unwrap();
    assert_eq!(order_row.payment_status, "unpaid");
    assert!(!order_row.is_distributed);
    assert_eq!(balance_of(&db, WalletOwner::User(tutor)).await, 0);
}

#[actix_web::test]
async fn unknown_reference_is_not_found() {
    let db = setup_db().await;
    let server = MockServer::start().await;
    let buyer = seed_user(&db, "buyer").await;
    mock_verify(&server, "EVK-NOPE", "success").await;
    let app = verify_app!(db, server);

    let req = test::TestRequest::get()
        .uri("/api/v1/payments/verify/EVK-NOPE")
        .insert_header(bearer(buyer))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
