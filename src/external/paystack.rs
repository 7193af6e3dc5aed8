use crate::config::PaystackConfig;
use crate::error::{AppError, AppResult};
use crate::utils::recipient_type_for_bank;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use std::time::Duration;

type HmacSha512 = Hmac<Sha512>;

/// What the provider said about a transfer initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Accepted { transfer_code: String },
    /// Provider refused; `message` is kept verbatim for support
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecipient {
    pub recipient_code: String,
    pub bank_name: Option<String>,
}

/// Outbound money movement. Implemented by [`PaystackClient`]; the payout
/// worker only sees this trait.
#[async_trait]
pub trait TransferGateway: Send + Sync {
    /// Tokenizes a payee account into a reusable recipient code.
    async fn create_recipient(
        &self,
        name: &str,
        account_number: &str,
        bank_code: &str,
        currency: &str,
    ) -> AppResult<TransferRecipient>;

    /// `Err` means the outcome is unknown (transport failure, unreadable
    /// response); a definite refusal is `Ok(TransferOutcome::Rejected)`.
    async fn initiate_transfer(
        &self,
        amount: i64,
        recipient_code: &str,
        reference: &str,
        reason: &str,
    ) -> AppResult<TransferOutcome>;
}

/// Every Paystack response uses this envelope, including error responses.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct CreateRecipientBody<'a> {
    #[serde(rename = "type")]
    recipient_type: &'a str,
    name: &'a str,
    account_number: &'a str,
    bank_code: &'a str,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct RecipientData {
    recipient_code: String,
    #[serde(default)]
    details: Option<RecipientDetails>,
}

#[derive(Debug, Deserialize)]
struct RecipientDetails {
    bank_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitiateTransferBody<'a> {
    source: &'a str,
    amount: i64,
    recipient: &'a str,
    reason: &'a str,
    reference: &'a str,
}

#[derive(Debug, Deserialize)]
struct TransferData {
    transfer_code: String,
}

/// What Paystack reports for a checkout reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeVerification {
    Succeeded { transaction_id: Option<String> },
    /// Anything but `success`, including unknown references
    NotSucceeded { status: String },
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    #[serde(default)]
    id: serde_json::Value,
    status: String,
}

/// Incoming webhook body: `{"event": "...", "data": {...}}`
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ChargeEventData {
    pub reference: String,
    /// provider transaction id
    #[serde(default)]
    pub id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct TransferEventData {
    pub reference: String,
    #[serde(default)]
    pub transfer_code: Option<String>,
    /// Provider's explanation on failed or reversed transfers. `reason` in
    /// the same payload is our own narration, not a failure cause.
    #[serde(default)]
    pub gateway_response: Option<String>,
}

impl TransferEventData {
    /// Provider text, or `fallback` when the event carries none.
    pub fn failure_text(&self, fallback: &str) -> String {
        self.gateway_response
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

#[derive(Clone)]
pub struct PaystackClient {
    client: Client,
    config: PaystackConfig,
}

impl PaystackClient {
    pub fn new(config: PaystackConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Asks Paystack for the final state of a charge, for clients coming back
    /// from checkout before (or instead of) the `charge.success` webhook.
    pub async fn verify_transaction(&self, reference: &str) -> AppResult<ChargeVerification> {
        let response = self
            .client
            .get(self.url(&format!("/transaction/verify/{reference}")))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        let http_status = response.status();
        let envelope: Envelope<VerifyData> = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!(
                "Unreadable verify response ({http_status}): {e}"
            ))
        })?;

        match envelope.data {
            Some(data) if envelope.status && data.status == "success" => {
                let transaction_id = match data.id {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(id) => Some(id),
                    other => Some(other.to_string()),
                };
                Ok(ChargeVerification::Succeeded { transaction_id })
            }
            Some(data) if envelope.status => {
                Ok(ChargeVerification::NotSucceeded { status: data.status })
            }
            _ => Ok(ChargeVerification::NotSucceeded {
                status: if envelope.message.is_empty() {
                    "unknown".to_string()
                } else {
                    envelope.message
                },
            }),
        }
    }

    /// Checks `x-paystack-signature`: hex HMAC-SHA512 of the raw body keyed
    /// with the secret key.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AppResult<()> {
        verify_signature(&self.config.secret_key, payload, signature)
    }
}

pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> AppResult<()> {
    let expected = hex::decode(signature.trim())
        .map_err(|_| AppError::AuthError("Malformed webhook signature".to_string()))?;
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::InternalError(format!("HMAC key rejected: {e}")))?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| AppError::AuthError("Invalid webhook signature".to_string()))
}

/// Hex signature for a payload, as Paystack would send it.
pub fn sign_payload(secret: &str, payload: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::InternalError(format!("HMAC key rejected: {e}")))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl TransferGateway for PaystackClient {
    async fn create_recipient(
        &self,
        name: &str,
        account_number: &str,
        bank_code: &str,
        currency: &str,
    ) -> AppResult<TransferRecipient> {
        let body = CreateRecipientBody {
            recipient_type: recipient_type_for_bank(bank_code),
            name,
            account_number,
            bank_code,
            currency,
        };

        let response = self
            .client
            .post(self.url("/transferrecipient"))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await?;

        let http_status = response.status();
        let envelope: Envelope<RecipientData> = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!(
                "Unreadable transferrecipient response ({http_status}): {e}"
            ))
        })?;

        match envelope.data {
            Some(data) if envelope.status => Ok(TransferRecipient {
                recipient_code: data.recipient_code,
                bank_name: data.details.and_then(|d| d.bank_name),
            }),
            _ => Err(AppError::ExternalApiError(if envelope.message.is_empty() {
                "Recipient creation failed".to_string()
            } else {
                envelope.message
            })),
        }
    }

    async fn initiate_transfer(
        &self,
        amount: i64,
        recipient_code: &str,
        reference: &str,
        reason: &str,
    ) -> AppResult<TransferOutcome> {
        // amount is already in the smallest currency unit, as Paystack expects
        let body = InitiateTransferBody {
            source: "balance",
            amount,
            recipient: recipient_code,
            reason,
            reference,
        };

        let response = self
            .client
            .post(self.url("/transfer"))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await?;

        let http_status = response.status();
        let envelope: Envelope<TransferData> = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!(
                "Unreadable transfer response ({http_status}): {e}"
            ))
        })?;

        if !envelope.status {
            let message = if envelope.message.is_empty() {
                "Paystack Error".to_string()
            } else {
                envelope.message
            };
            return Ok(TransferOutcome::Rejected { message });
        }

        match envelope.data {
            Some(data) => Ok(TransferOutcome::Accepted {
                transfer_code: data.transfer_code,
            }),
            None => Err(AppError::ExternalApiError(
                "Transfer accepted without transfer_code".to_string(),
            )),
        }
    }
}
