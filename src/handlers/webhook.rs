use crate::error::{AppError, AppResult};
use crate::external::{ChargeEventData, PaystackClient, TransferEventData, WebhookEvent};
use crate::models::TransferConfirmation;
use crate::services::{PaymentService, PayoutService, SettlementService};
use actix_web::{HttpRequest, HttpResponse, Result, web};
use log::{error, info, warn};

/// Paystack webhook.
///
/// Every delivery that passes the signature check is answered with 200, even
/// when processing fails; the handlers are idempotent and Paystack would
/// otherwise keep redelivering.
pub async fn paystack_webhook(
    req: HttpRequest,
    body: web::Bytes,
    paystack: web::Data<PaystackClient>,
    payment_service: web::Data<PaymentService>,
    settlement_service: web::Data<SettlementService>,
    payout_service: web::Data<PayoutService>,
) -> Result<HttpResponse> {
    let signature = match req
        .headers()
        .get("x-paystack-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(sig) => sig,
        None => {
            warn!("Missing x-paystack-signature header");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Missing x-paystack-signature header"
            })));
        }
    };

    if let Err(e) = paystack.verify_webhook_signature(&body, signature) {
        error!("Webhook signature verification failed: {e}");
        return Ok(HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "Invalid signature"
        })));
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            error!("Unreadable webhook payload: {e}");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Invalid payload"
            })));
        }
    };

    info!("Received Paystack webhook event: {}", event.event);

    if let Err(e) = handle_paystack_event(
        event,
        &payment_service,
        &settlement_service,
        &payout_service,
    )
    .await
    {
        error!("Failed to process webhook event: {e}");
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "received": true,
            "error": format!("Processing failed: {e}")
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "received": true
    })))
}

async fn handle_paystack_event(
    event: WebhookEvent,
    payment_service: &PaymentService,
    settlement_service: &SettlementService,
    payout_service: &PayoutService,
) -> AppResult<()> {
    match event.event.as_str() {
        "charge.success" => {
            let data: ChargeEventData = serde_json::from_value(event.data)?;
            let provider_id = match data.id {
                serde_json::Value::Null => None,
                serde_json::Value::String(id) => Some(id),
                other => Some(other.to_string()),
            };

            let order_id = match payment_service
                .confirm_charge(&data.reference, provider_id)
                .await
            {
                Ok(order_id) => order_id,
                Err(AppError::NotFound(msg)) => {
                    // nothing to retry for a reference we never issued
                    warn!("charge.success ignored: {msg}");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            let outcome = settlement_service.distribute_order_revenue(order_id).await?;
            info!("Order {order_id} settlement: {outcome:?}");
        }
        "transfer.success" | "transfer.failed" | "transfer.reversed" => {
            let data: TransferEventData = serde_json::from_value(event.data)?;
            let confirmation = match event.event.as_str() {
                "transfer.success" => TransferConfirmation::Succeeded,
                "transfer.failed" => {
                    TransferConfirmation::Failed(data.failure_text("Transfer failed at provider"))
                }
                _ => TransferConfirmation::Reversed(
                    data.failure_text("Transfer reversed by provider"),
                ),
            };

            match payout_service
                .confirm_transfer(&data.reference, confirmation)
                .await
            {
                Ok(status) => info!(
                    "Payout {} ({}) now {status}",
                    data.reference,
                    data.transfer_code.as_deref().unwrap_or("-")
                ),
                Err(AppError::NotFound(msg)) => warn!("{} ignored: {msg}", event.event),
                Err(e) => return Err(e),
            }
        }
        other => {
            info!("Unhandled Paystack event type: {other}");
        }
    }
    Ok(())
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhook").route("/paystack", web::post().to(paystack_webhook)));
}
