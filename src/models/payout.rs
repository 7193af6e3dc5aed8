use crate::entities::banking_detail_entity as banking_details;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which wallet a withdrawal is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayoutContext {
    #[default]
    Personal,
    Organization(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestPayoutRequest {
    /// minor units (cents)
    pub amount: i64,
    /// Withdraw from this organization's wallet instead of the personal one
    #[serde(default)]
    pub organization_id: Option<i64>,
}

impl RequestPayoutRequest {
    pub fn context(&self) -> PayoutContext {
        match self.organization_id {
            Some(id) => PayoutContext::Organization(id),
            None => PayoutContext::Personal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkPayoutMethodRequest {
    pub account_name: String,
    pub account_number: String,
    /// `MPESA` or a bank code such as `063`
    pub bank_code: String,
    /// Link the method to an organization the caller manages
    #[serde(default)]
    pub organization_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayoutMethodResponse {
    pub bank_name: String,
    pub display_number: String,
    pub is_verified: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<banking_details::Model> for PayoutMethodResponse {
    fn from(details: banking_details::Model) -> Self {
        Self {
            bank_name: details.bank_name,
            display_number: details.display_number,
            is_verified: details.is_verified,
            updated_at: details.updated_at,
        }
    }
}

/// How an operator settles a payout whose transfer outcome never came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PayoutResolution {
    /// The provider never received the transfer: queue it again
    Requeue,
    /// The provider refused or lost it: fail and refund
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolvePayoutRequest {
    pub action: PayoutResolution,
    /// Stored as the failure reason when failing
    #[serde(default)]
    pub reason: Option<String>,
}

/// Result of one worker pass over a single payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStep {
    /// No longer pending when the lock was taken
    Skipped,
    /// Transfer accepted by the provider, waiting for its confirmation
    Initiated,
    /// Transfer call failed in transport; state unknown, left processing
    Unconfirmed,
    /// Marked failed and refunded
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PayoutBatchReport {
    pub examined: usize,
    pub initiated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unconfirmed: usize,
    pub errors: usize,
}

/// Final word from the provider about an initiated transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferConfirmation {
    Succeeded,
    Failed(String),
    Reversed(String),
}
