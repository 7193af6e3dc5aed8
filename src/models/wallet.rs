use crate::entities::{
    OwnerKind, PayoutStatus, TransactionType, payout_entity as payouts,
    wallet_entity as wallets, wallet_transaction_entity as wallet_transactions,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub id: i64,
    pub owner_kind: OwnerKind,
    pub owner_id: i64,
    /// minor units (cents)
    pub balance: i64,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

impl From<wallets::Model> for WalletResponse {
    fn from(wallet: wallets::Model) -> Self {
        Self {
            id: wallet.id,
            owner_kind: wallet.owner_kind,
            owner_id: wallet.owner_id,
            balance: wallet.balance,
            currency: wallet.currency,
            updated_at: wallet.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i64,
    pub tx_type: TransactionType,
    /// signed, minor units
    pub amount: i64,
    pub balance_after: i64,
    pub description: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl From<wallet_transactions::Model> for TransactionResponse {
    fn from(tx: wallet_transactions::Model) -> Self {
        Self {
            id: tx.id,
            tx_type: tx.tx_type,
            amount: tx.amount,
            balance_after: tx.balance_after,
            description: tx.description,
            reference: tx.reference,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayoutResponse {
    pub id: i64,
    pub wallet_id: i64,
    pub amount: i64,
    pub status: PayoutStatus,
    pub reference: String,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<payouts::Model> for PayoutResponse {
    fn from(payout: payouts::Model) -> Self {
        Self {
            id: payout.id,
            wallet_id: payout.wallet_id,
            amount: payout.amount,
            status: payout.status,
            reference: payout.reference,
            failure_reason: payout.failure_reason,
            created_at: payout.created_at,
            processed_at: payout.processed_at,
        }
    }
}

/// Whose money a dashboard request is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WalletView {
    Personal,
    OrganizationAdmin,
    OrganizationMember,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletOverviewResponse {
    pub view: WalletView,
    pub personal_wallet: WalletResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_wallet: Option<WalletResponse>,
    pub recent_transactions: Vec<TransactionResponse>,
    pub recent_payouts: Vec<PayoutResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WalletQuery {
    /// Read the organization's wallet instead of the personal one
    pub organization_id: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}
