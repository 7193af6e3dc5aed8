use crate::middlewares::require_staff;
use crate::models::*;
use crate::services::{PayoutService, SettlementService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/admin/payouts/{id}/retry",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Failed payout id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payout requeued, funds reserved again", body = PayoutResponse),
        (status = 400, description = "Payout is not failed, or the wallet no longer covers it", body = ApiError),
        (status = 403, description = "Staff only")
    )
)]
pub async fn retry_payout(
    payout_service: web::Data<PayoutService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let operator = match require_staff(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    let payout_id = path.into_inner();
    log::info!("Operator {} retries payout {payout_id}", operator.user_id);

    match payout_service.retry_failed_payout(payout_id).await {
        Ok(payout) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": payout
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/payouts/{id}/resolve",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Payout stuck in processing")
    ),
    request_body = ResolvePayoutRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payout requeued, or failed and refunded", body = PayoutResponse),
        (status = 400, description = "Payout is not processing, or the provider already accepted it", body = ApiError),
        (status = 403, description = "Staff only")
    )
)]
pub async fn resolve_payout(
    payout_service: web::Data<PayoutService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<ResolvePayoutRequest>,
) -> Result<HttpResponse> {
    let operator = match require_staff(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    let payout_id = path.into_inner();
    let request = request.into_inner();
    log::info!(
        "Operator {} resolves payout {payout_id}: {:?}",
        operator.user_id,
        request.action
    );

    match payout_service
        .resolve_unconfirmed_payout(payout_id, request.action, request.reason)
        .await
    {
        Ok(payout) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": payout
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/payouts/process",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "One worker pass over pending payouts", body = PayoutBatchReport),
        (status = 403, description = "Staff only")
    )
)]
pub async fn process_payouts(
    payout_service: web::Data<PayoutService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_staff(&req) {
        return Ok(e.error_response());
    }

    match payout_service.process_pending_batch().await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/orders/{id}/settle",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Paid order id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Settlement outcome"),
        (status = 404, description = "Order not found"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn settle_order(
    settlement_service: web::Data<SettlementService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_staff(&req) {
        return Ok(e.error_response());
    }

    match settlement_service
        .distribute_order_revenue(path.into_inner())
        .await
    {
        Ok(outcome) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": outcome
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/payouts/process", web::post().to(process_payouts))
            .route("/payouts/{id}/retry", web::post().to(retry_payout))
            .route("/payouts/{id}/resolve", web::post().to(resolve_payout))
            .route("/orders/{id}/settle", web::post().to(settle_order)),
    );
}
