use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{OwnerKind, PayoutStatus, TransactionType};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::wallet::get_overview,
        handlers::wallet::get_transactions,
        handlers::wallet::get_payouts,
        handlers::wallet::request_payout,
        handlers::wallet::get_payout_method,
        handlers::wallet::link_payout_method,
        handlers::payment::verify_payment,
        handlers::admin::retry_payout,
        handlers::admin::resolve_payout,
        handlers::admin::process_payouts,
        handlers::admin::settle_order,
    ),
    components(
        schemas(
            OwnerKind,
            TransactionType,
            PayoutStatus,
            WalletResponse,
            TransactionResponse,
            PayoutResponse,
            WalletView,
            WalletOverviewResponse,
            WalletQuery,
            PaginationParams,
            RequestPayoutRequest,
            LinkPayoutMethodRequest,
            PayoutMethodResponse,
            PayoutStep,
            PayoutResolution,
            ResolvePayoutRequest,
            PayoutBatchReport,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "wallet", description = "Wallets, ledger and withdrawals"),
        (name = "payments", description = "Checkout verification"),
        (name = "admin", description = "Operator tools for payouts and settlement"),
    ),
    info(
        title = "Evuka Ledger API",
        version = "1.0.0",
        description = "Wallet, settlement and payout REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
