use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{PayoutService, WalletService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrganizationScope {
    /// Act on this organization instead of the personal account
    pub organization_id: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/wallet/overview",
    tag = "wallet",
    params(OrganizationScope),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Wallet dashboard", body = WalletOverviewResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a member of the organization")
    )
)]
pub async fn get_overview(
    wallet_service: web::Data<WalletService>,
    req: HttpRequest,
    query: web::Query<OrganizationScope>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match wallet_service
        .overview(user.user_id, query.organization_id)
        .await
    {
        Ok(overview) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": overview
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/wallet/transactions",
    tag = "wallet",
    params(
        ("organization_id" = Option<i64>, Query, description = "Organization wallet"),
        ("page" = Option<i64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<i64>, Query, description = "Items per page, max 100")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = [TransactionResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a member of the organization")
    )
)]
pub async fn get_transactions(
    wallet_service: web::Data<WalletService>,
    req: HttpRequest,
    query: web::Query<WalletQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match wallet_service.list_transactions(user.user_id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/wallet/payouts",
    tag = "wallet",
    params(
        ("organization_id" = Option<i64>, Query, description = "Organization wallet"),
        ("page" = Option<i64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<i64>, Query, description = "Items per page, max 100")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Withdrawal history, newest first", body = [PayoutResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_payouts(
    wallet_service: web::Data<WalletService>,
    req: HttpRequest,
    query: web::Query<WalletQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match wallet_service.list_payouts(user.user_id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/wallet/payouts",
    tag = "wallet",
    request_body = RequestPayoutRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payout queued, funds reserved", body = PayoutResponse),
        (status = 400, description = "Below minimum, insufficient funds or no payout method", body = ApiError),
        (status = 403, description = "Only owners and admins may withdraw organization funds")
    )
)]
pub async fn request_payout(
    payout_service: web::Data<PayoutService>,
    req: HttpRequest,
    request: web::Json<RequestPayoutRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match payout_service
        .request_payout(user.user_id, request.into_inner())
        .await
    {
        Ok(payout) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": payout,
            "message": "Withdrawal request submitted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/wallet/payout-method",
    tag = "wallet",
    params(OrganizationScope),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Linked payout method, or null", body = PayoutMethodResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_payout_method(
    payout_service: web::Data<PayoutService>,
    req: HttpRequest,
    query: web::Query<OrganizationScope>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match payout_service
        .get_payout_method(user.user_id, query.organization_id)
        .await
    {
        Ok(method) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": method
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/wallet/payout-method",
    tag = "wallet",
    request_body = LinkPayoutMethodRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payout method linked", body = PayoutMethodResponse),
        (status = 400, description = "Missing account details", body = ApiError),
        (status = 502, description = "Provider rejected the account", body = ApiError)
    )
)]
pub async fn link_payout_method(
    payout_service: web::Data<PayoutService>,
    req: HttpRequest,
    request: web::Json<LinkPayoutMethodRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match payout_service
        .link_payout_method(user.user_id, request.into_inner())
        .await
    {
        Ok(method) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": method,
            "message": "Payout method linked"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn wallet_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/wallet")
            .route("/overview", web::get().to(get_overview))
            .route("/transactions", web::get().to(get_transactions))
            .route("/payouts", web::get().to(get_payouts))
            .route("/payouts", web::post().to(request_payout))
            .route("/payout-method", web::get().to(get_payout_method))
            .route("/payout-method", web::post().to(link_payout_method)),
    );
}
