//! CancelSubscriptionHandler - Cancels the account's subscription at the
//! account holder's request.

use std::sync::Arc;

use crate::domain::billing::{BillingError, BillingRecord};
use crate::domain::foundation::AccountId;
use crate::ports::{BillingRecordStore, PaymentGateway};

use super::account_locks::AccountLocks;
use super::record_writes::{cancel_at_processor, load_record, save_after_gateway};

/// Command to cancel the current subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub account_id: AccountId,
}

/// Result of a user cancellation.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub record: BillingRecord,
}

/// Handler for user-initiated cancellation.
///
/// `is_payment_failed` is not touched.
pub struct CancelSubscriptionHandler {
    store: Arc<dyn BillingRecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    locks: AccountLocks,
}

impl CancelSubscriptionHandler {
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
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        let _guard = self.locks.acquire(&cmd.account_id).await;
        let mut record = load_record(self.store.as_ref(), &cmd.account_id).await?;

        if !record.is_subscription_active() {
            return Err(BillingError::AlreadyUnsubscribed);
        }
        let subscription_id = record
            .subscription_id()
            .ok_or(BillingError::AlreadyUnsubscribed)?
            .to_string();

        let canceled = cancel_at_processor(self.gateway.as_ref(), &record, &subscription_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    account_id = %cmd.account_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Failed to cancel subscription"
                );
                BillingError::from(e)
            })?;

        record.cancel_by_user(canceled)?;
        let record = save_after_gateway(self.store.as_ref(), &record, "user_cancellation").await?;

        tracing::info!(
            account_id = %cmd.account_id,
            subscription_id = %subscription_id,
            "Subscription canceled by user"
        );

        Ok(CancelSubscriptionResult { record })
    }
}
