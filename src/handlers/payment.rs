use crate::error::AppError;
use crate::external::{ChargeVerification, PaystackClient};
use crate::middlewares::current_user;
use crate::models::ApiError;
use crate::services::{PaymentService, SettlementService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/payments/verify/{reference}",
    tag = "payments",
    params(
        ("reference" = String, Path, description = "Checkout reference")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payment confirmed, order settled"),
        (status = 400, description = "Paystack did not complete the charge", body = ApiError),
        (status = 404, description = "Unknown reference", body = ApiError),
        (status = 502, description = "Paystack unreachable", body = ApiError)
    )
)]
pub async fn verify_payment(
    paystack: web::Data<PaystackClient>,
    payment_service: web::Data<PaymentService>,
    settlement_service: web::Data<SettlementService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    let reference = path.into_inner();

    let verification = match paystack.verify_transaction(&reference).await {
        Ok(verification) => verification,
        Err(e) => return Ok(e.error_response()),
    };

    match verification {
        ChargeVerification::Succeeded { transaction_id } => {
            let order_id = match payment_service
                .confirm_charge(&reference, transaction_id)
                .await
            {
                Ok(order_id) => order_id,
                Err(e) => return Ok(e.error_response()),
            };

            match settlement_service.distribute_order_revenue(order_id).await {
                Ok(outcome) => {
                    log::info!(
                        "Payment {reference} verified by user {}, order {order_id}: {outcome:?}",
                        user.user_id
                    );
                    Ok(HttpResponse::Ok().json(json!({
                        "success": true,
                        "data": {
                            "order_id": order_id,
                            "settlement": outcome
                        }
                    })))
                }
                Err(e) => Ok(e.error_response()),
            }
        }
        ChargeVerification::NotSucceeded { status } => {
            if let Err(e) = payment_service.record_failed_charge(&reference).await {
                return Ok(e.error_response());
            }
            Ok(AppError::ValidationError(format!("Payment verification failed: {status}"))
                .error_response())
        }
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments").route("/verify/{reference}", web::get().to(verify_payment)),
    );
}
