//! HandleFailedPaymentHandler - Cancels the subscription behind a failed
//! invoice payment.
//!
//! Redeliveries are absorbed by inspecting the record: an account that is
//! already inactive or already marked failed is left alone.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::AccountId;
use crate::ports::{BillingRecordStore, PaymentGateway};

use super::account_locks::AccountLocks;
use super::record_writes::{cancel_at_processor, save_after_gateway};

/// Command to react to `invoice.payment_failed`.
#[derive(Debug, Clone)]
pub struct HandleFailedPaymentCommand {
    pub subscription_id: String,
    /// Processor event id, for logs.
    pub event_id: Option<String>,
}

/// What the handler did with the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedPaymentOutcome {
    /// Subscription canceled and the account marked as failed.
    Canceled { account_id: AccountId },
    /// Subscription already inactive.
    AlreadyInactive,
    /// Failure already recorded.
    AlreadyFailed,
    /// No account carries this subscription.
    UnknownSubscription,
}

pub struct HandleFailedPaymentHandler {
    store: Arc<dyn BillingRecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    locks: AccountLocks,
}

impl HandleFailedPaymentHandler {
    pub fn new(
        store: Arc<dyn BillingRecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        locks: AccountLocks,
    ) -> Self {
        Self {
            store,
            gateway,
            locks,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleFailedPaymentCommand,
    ) -> Result<FailedPaymentOutcome, BillingError> {
        let event_id = cmd.event_id.as_deref().unwrap_or("-");

        let Some(found) = self.store.find_by_subscription_id(&cmd.subscription_id).await? else {
            tracing::info!(
                subscription_id = %cmd.subscription_id,
                event_id,
                "Payment failure for unknown subscription ignored"
            );
            return Ok(FailedPaymentOutcome::UnknownSubscription);
        };

        let account_id = found.account_id().clone();
        let _guard = self.locks.acquire(&account_id).await;

        // Re-read under the lock; the subscription may have been replaced meanwhile
        let record = match self.store.find_by_account_id(&account_id).await? {
            Some(record) if record.subscription_id() == Some(cmd.subscription_id.as_str()) => {
                record
            }
            _ => {
                tracing::info!(
                    account_id = %account_id,
                    subscription_id = %cmd.subscription_id,
                    event_id,
                    "Subscription no longer on record, payment failure ignored"
                );
                return Ok(FailedPaymentOutcome::UnknownSubscription);
            }
        };

        if record.is_payment_failed() {
            tracing::debug!(account_id = %account_id, event_id, "Payment failure already recorded");
            return Ok(FailedPaymentOutcome::AlreadyFailed);
        }
        if !record.is_subscription_active() {
            tracing::debug!(account_id = %account_id, event_id, "Subscription already inactive");
            return Ok(FailedPaymentOutcome::AlreadyInactive);
        }

        let canceled = cancel_at_processor(self.gateway.as_ref(), &record, &cmd.subscription_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    account_id = %account_id,
                    subscription_id = %cmd.subscription_id,
                    event_id,
                    error = %e,
                    "Failed to cancel subscription after payment failure"
                );
                BillingError::from(e)
            })?;

        let mut record = record;
        record.cancel_after_failed_payment(canceled)?;
        save_after_gateway(self.store.as_ref(), &record, "failed_payment_cancellation").await?;

        tracing::info!(
            account_id = %account_id,
            subscription_id = %cmd.subscription_id,
            event_id,
            "Subscription canceled after failed payment"
        );

        Ok(FailedPaymentOutcome::Canceled { account_id })
    }
}
