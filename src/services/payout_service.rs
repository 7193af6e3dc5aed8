use crate::config::PayoutConfig;
use crate::entities::{
    PayoutStatus, TransactionType, WalletOwner,
    banking_detail_entity as banking_details, payout_entity as payouts, wallet_entity as wallets,
};
use crate::error::{AppError, AppResult};
use crate::external::{TransferGateway, TransferOutcome};
use crate::models::{
    LinkPayoutMethodRequest, PayoutBatchReport, PayoutContext, PayoutMethodResponse,
    PayoutResolution, PayoutResponse, PayoutStep, RequestPayoutRequest, TransferConfirmation,
};
use crate::services::wallet_service::{deposit, ensure_wallet, find_active_membership, withdraw};
use crate::utils::{generate_payout_reference, mask_account_number};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;

const NO_BANK_DETAILS_REASON: &str = "No linked banking details found.";
const OPERATOR_FAIL_REASON: &str = "Transfer not received by provider";

pub async fn find_banking_details<C>(
    conn: &C,
    owner: WalletOwner,
) -> AppResult<Option<banking_details::Model>>
where
    C: ConnectionTrait,
{
    Ok(banking_details::Entity::find()
        .filter(banking_details::Column::OwnerKind.eq(owner.kind()))
        .filter(banking_details::Column::OwnerId.eq(owner.id()))
        .one(conn)
        .await?)
}

/// Marks a payout failed and returns its amount to the wallet, in the
/// caller's unit of work.
async fn fail_and_refund(
    txn: &DatabaseTransaction,
    payout: payouts::Model,
    reason: &str,
    refund_description: &str,
) -> AppResult<()> {
    let wallet_id = payout.wallet_id;
    let amount = payout.amount;
    let reference = payout.reference.clone();

    let now = Utc::now();
    let mut am = payout.into_active_model();
    am.status = Set(PayoutStatus::Failed);
    am.failure_reason = Set(Some(reason.to_string()));
    am.processed_at = Set(Some(now));
    am.updated_at = Set(now);
    am.update(txn).await?;

    deposit(txn, wallet_id, amount, refund_description, TransactionType::Refund).await?;

    log::warn!("Payout {reference} failed and refunded: {reason}");
    Ok(())
}

#[derive(Clone)]
pub struct PayoutService {
    pool: DatabaseConnection,
    gateway: Arc<dyn TransferGateway>,
    config: PayoutConfig,
    currency: String,
}

impl PayoutService {
    pub fn new(
        pool: DatabaseConnection,
        gateway: Arc<dyn TransferGateway>,
        config: PayoutConfig,
        currency: String,
    ) -> Self {
        Self {
            pool,
            gateway,
            config,
            currency,
        }
    }

    /// Whose wallet the caller acts on. Organization money is only reachable
    /// by active owners and admins.
    async fn acting_owner(&self, user_id: i64, context: PayoutContext) -> AppResult<WalletOwner> {
        match context {
            PayoutContext::Personal => Ok(WalletOwner::User(user_id)),
            PayoutContext::Organization(org_id) => {
                match find_active_membership(&self.pool, org_id, user_id).await? {
                    Some(m) if m.role.manages_finances() => Ok(WalletOwner::Organization(org_id)),
                    _ => Err(AppError::Forbidden),
                }
            }
        }
    }

    /// Reserves the funds and queues a pending payout for the worker.
    pub async fn request_payout(
        &self,
        user_id: i64,
        request: RequestPayoutRequest,
    ) -> AppResult<PayoutResponse> {
        let amount = request.amount;
        if amount <= 0 {
            return Err(AppError::ValidationError(
                "Withdrawal amount must be positive".to_string(),
            ));
        }
        if amount < self.config.min_amount {
            return Err(AppError::ValidationError(format!(
                "Minimum withdrawal is {} {}",
                self.config.min_amount, self.currency
            )));
        }

        let owner = self.acting_owner(user_id, request.context()).await?;

        if find_banking_details(&self.pool, owner).await?.is_none() {
            return Err(AppError::ValidationError(
                "Link a payout method before requesting a withdrawal".to_string(),
            ));
        }

        let wallet = ensure_wallet(&self.pool, owner, &self.currency).await?;
        let reference = generate_payout_reference();

        let txn = self.pool.begin().await?;

        withdraw(
            &txn,
            wallet.id,
            amount,
            &format!("Withdrawal request {reference}"),
            TransactionType::Debit,
        )
        .await?;

        let now = Utc::now();
        let payout = payouts::ActiveModel {
            wallet_id: Set(wallet.id),
            amount: Set(amount),
            status: Set(PayoutStatus::Pending),
            reference: Set(reference),
            failure_reason: Set(None),
            transfer_code: Set(None),
            created_at: Set(now),
            processed_at: Set(None),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        log::info!(
            "Payout {} requested by user {user_id} for {owner}: {amount}",
            payout.reference
        );

        Ok(payout.into())
    }

    /// One worker pass: the oldest pending payouts, each in isolation.
    pub async fn process_pending_batch(&self) -> AppResult<PayoutBatchReport> {
        let ids: Vec<i64> = payouts::Entity::find()
            .filter(payouts::Column::Status.eq(PayoutStatus::Pending))
            .order_by_asc(payouts::Column::CreatedAt)
            .order_by_asc(payouts::Column::Id)
            .limit(self.config.batch_size)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let mut report = PayoutBatchReport::default();
        for id in ids {
            report.examined += 1;
            match self.process_single_payout(id).await {
                Ok(PayoutStep::Initiated) => report.initiated += 1,
                Ok(PayoutStep::Failed) => report.failed += 1,
                Ok(PayoutStep::Skipped) => report.skipped += 1,
                Ok(PayoutStep::Unconfirmed) => report.unconfirmed += 1,
                Err(e) => {
                    log::error!("Payout {id} processing error: {e}");
                    report.errors += 1;
                }
            }
        }

        if report.examined > 0 {
            log::info!(
                "Payout batch: {} examined, {} initiated, {} failed, {} unconfirmed, {} errors",
                report.examined,
                report.initiated,
                report.failed,
                report.unconfirmed,
                report.errors
            );
        }
        Ok(report)
    }

    pub async fn process_single_payout(&self, payout_id: i64) -> AppResult<PayoutStep> {
        let txn = self.pool.begin().await?;

        let payout = payouts::Entity::find_by_id(payout_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payout {payout_id} not found")))?;

        if payout.status != PayoutStatus::Pending {
            return Ok(PayoutStep::Skipped);
        }

        let wallet = wallets::Entity::find_by_id(payout.wallet_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Wallet {} not found", payout.wallet_id)))?;

        let Some(banking) = find_banking_details(&txn, wallet.owner()).await? else {
            fail_and_refund(
                &txn,
                payout,
                NO_BANK_DETAILS_REASON,
                "Refund: Payout Failed (No Bank Details)",
            )
            .await?;
            txn.commit().await?;
            return Ok(PayoutStep::Failed);
        };

        let mut am = payout.into_active_model();
        am.status = Set(PayoutStatus::Processing);
        am.updated_at = Set(Utc::now());
        let payout = am.update(&txn).await?;
        txn.commit().await?;

        // no lock held from here on while the provider is called
        let reason = format!("Payout {}", payout.reference);
        let outcome = self
            .gateway
            .initiate_transfer(
                payout.amount,
                &banking.recipient_code,
                &payout.reference,
                &reason,
            )
            .await;

        match outcome {
            Ok(TransferOutcome::Accepted { transfer_code }) => {
                payouts::Entity::update_many()
                    .col_expr(payouts::Column::TransferCode, Expr::value(transfer_code))
                    .col_expr(payouts::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(payouts::Column::Id.eq(payout_id))
                    .exec(&self.pool)
                    .await?;
                log::info!("Payout {} accepted by provider", payout.reference);
                Ok(PayoutStep::Initiated)
            }
            Ok(TransferOutcome::Rejected { message }) => {
                let txn = self.pool.begin().await?;
                let current = payouts::Entity::find_by_id(payout_id)
                    .lock_exclusive()
                    .one(&txn)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Payout {payout_id} not found")))?;
                if current.status != PayoutStatus::Processing {
                    return Ok(PayoutStep::Skipped);
                }
                fail_and_refund(&txn, current, &message, "Refund: Payout Gateway Error").await?;
                txn.commit().await?;
                Ok(PayoutStep::Failed)
            }
            Err(e) => {
                // funds may already have left; an operator has to reconcile
                log::error!(
                    "Transfer for payout {} has unknown outcome, left processing: {e}",
                    payout.reference
                );
                Ok(PayoutStep::Unconfirmed)
            }
        }
    }

    /// Applies the provider's final verdict. Payouts that are not in flight
    /// are returned untouched, so repeated deliveries are harmless.
    pub async fn confirm_transfer(
        &self,
        reference: &str,
        confirmation: TransferConfirmation,
    ) -> AppResult<PayoutStatus> {
        let txn = self.pool.begin().await?;

        let payout = payouts::Entity::find()
            .filter(payouts::Column::Reference.eq(reference))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payout {reference} not found")))?;

        if payout.status != PayoutStatus::Processing {
            log::info!(
                "Transfer confirmation for payout {reference} ignored, status is {}",
                payout.status
            );
            return Ok(payout.status);
        }

        let status = match confirmation {
            TransferConfirmation::Succeeded => {
                let now = Utc::now();
                let mut am = payout.into_active_model();
                am.status = Set(PayoutStatus::Completed);
                am.processed_at = Set(Some(now));
                am.updated_at = Set(now);
                am.update(&txn).await?;
                log::info!("Payout {reference} completed");
                PayoutStatus::Completed
            }
            TransferConfirmation::Failed(reason) => {
                fail_and_refund(&txn, payout, &reason, "Refund: Payout Transfer Failed").await?;
                PayoutStatus::Failed
            }
            TransferConfirmation::Reversed(reason) => {
                fail_and_refund(&txn, payout, &reason, "Refund: Payout Transfer Reversed").await?;
                PayoutStatus::Failed
            }
        };

        txn.commit().await?;
        Ok(status)
    }

    /// Puts a failed payout back in the queue. The failure refunded the
    /// wallet, so the amount is withdrawn again; a fresh reference is issued
    /// because the provider treats references as single-use.
    pub async fn retry_failed_payout(&self, payout_id: i64) -> AppResult<PayoutResponse> {
        let txn = self.pool.begin().await?;

        let payout = payouts::Entity::find_by_id(payout_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payout {payout_id} not found")))?;

        if payout.status != PayoutStatus::Failed {
            return Err(AppError::ValidationError(format!(
                "Only failed payouts can be retried, payout {payout_id} is {}",
                payout.status
            )));
        }

        let old_reference = payout.reference.clone();
        let reference = generate_payout_reference();

        withdraw(
            &txn,
            payout.wallet_id,
            payout.amount,
            &format!("Withdrawal retry {reference} (was {old_reference})"),
            TransactionType::Debit,
        )
        .await?;

        let mut am = payout.into_active_model();
        am.status = Set(PayoutStatus::Pending);
        am.reference = Set(reference);
        am.failure_reason = Set(None);
        am.transfer_code = Set(None);
        am.processed_at = Set(None);
        am.updated_at = Set(Utc::now());
        let payout = am.update(&txn).await?;

        txn.commit().await?;

        log::info!("Payout {old_reference} requeued as {}", payout.reference);
        Ok(payout.into())
    }

    /// Settles a payout left `processing` after a transfer call with unknown
    /// outcome, once an operator has checked with the provider.
    ///
    /// `Requeue` keeps the reservation and sends the payout back to the worker
    /// under a fresh reference. It is refused when the provider already
    /// acknowledged the transfer, since only its webhook may finish those.
    /// `Fail` marks the payout failed and refunds the wallet.
    pub async fn resolve_unconfirmed_payout(
        &self,
        payout_id: i64,
        resolution: PayoutResolution,
        reason: Option<String>,
    ) -> AppResult<PayoutResponse> {
        let txn = self.pool.begin().await?;

        let payout = payouts::Entity::find_by_id(payout_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payout {payout_id} not found")))?;

        if payout.status != PayoutStatus::Processing {
            return Err(AppError::ValidationError(format!(
                "Only processing payouts can be resolved, payout {payout_id} is {}",
                payout.status
            )));
        }

        let old_reference = payout.reference.clone();

        match resolution {
            PayoutResolution::Requeue => {
                if let Some(code) = payout.transfer_code.as_deref() {
                    return Err(AppError::ValidationError(format!(
                        "Payout {old_reference} was accepted by the provider as {code}, wait for its confirmation"
                    )));
                }

                let mut am = payout.into_active_model();
                am.status = Set(PayoutStatus::Pending);
                am.reference = Set(generate_payout_reference());
                am.updated_at = Set(Utc::now());
                am.update(&txn).await?;

                log::warn!("Unconfirmed payout {old_reference} requeued by operator");
            }
            PayoutResolution::Fail => {
                let reason = reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| OPERATOR_FAIL_REASON.to_string());
                fail_and_refund(&txn, payout, &reason, "Refund: Payout Cancelled").await?;
            }
        }

        let payout = payouts::Entity::find_by_id(payout_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payout {payout_id} not found")))?;
        txn.commit().await?;

        Ok(payout.into())
    }

    /// Registers the payee account with the provider and stores only the
    /// returned recipient token plus a masked number.
    pub async fn link_payout_method(
        &self,
        user_id: i64,
        request: LinkPayoutMethodRequest,
    ) -> AppResult<PayoutMethodResponse> {
        let account_name = request.account_name.trim();
        let account_number = request.account_number.trim();
        let bank_code = request.bank_code.trim();
        if account_name.is_empty() || account_number.is_empty() || bank_code.is_empty() {
            return Err(AppError::ValidationError(
                "account_name, account_number and bank_code are required".to_string(),
            ));
        }

        let context = match request.organization_id {
            Some(org_id) => PayoutContext::Organization(org_id),
            None => PayoutContext::Personal,
        };
        let owner = self.acting_owner(user_id, context).await?;

        let recipient = self
            .gateway
            .create_recipient(account_name, account_number, bank_code, &self.currency)
            .await?;

        let now = Utc::now();
        let bank_name = recipient.bank_name.unwrap_or_else(|| bank_code.to_string());
        let display_number = mask_account_number(account_number);

        let saved = match find_banking_details(&self.pool, owner).await? {
            Some(existing) => {
                let mut am = existing.into_active_model();
                am.recipient_code = Set(recipient.recipient_code);
                am.bank_name = Set(bank_name);
                am.display_number = Set(display_number);
                am.is_verified = Set(true);
                am.updated_at = Set(now);
                am.update(&self.pool).await?
            }
            None => {
                banking_details::ActiveModel {
                    owner_kind: Set(owner.kind()),
                    owner_id: Set(owner.id()),
                    recipient_code: Set(recipient.recipient_code),
                    bank_name: Set(bank_name),
                    display_number: Set(display_number),
                    is_verified: Set(true),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?
            }
        };

        log::info!("Payout method linked for {owner}");
        Ok(saved.into())
    }

    pub async fn get_payout_method(
        &self,
        user_id: i64,
        organization_id: Option<i64>,
    ) -> AppResult<Option<PayoutMethodResponse>> {
        let context = match organization_id {
            Some(org_id) => PayoutContext::Organization(org_id),
            None => PayoutContext::Personal,
        };
        let owner = self.acting_owner(user_id, context).await?;
        Ok(find_banking_details(&self.pool, owner).await?.map(Into::into))
    }
}
