//! Record loading, processor cancellation and conditional write-back shared
//! by the billing handlers.

use crate::domain::billing::{BillingError, BillingRecord, SubscriptionSnapshot};
use crate::domain::foundation::{AccountId, ErrorCode, Timestamp};
use crate::ports::{BillingRecordStore, PaymentError, PaymentGateway};

/// Loads the account's record or fails with `AccountNotFound`.
pub(super) async fn load_record(
    store: &dyn BillingRecordStore,
    account_id: &AccountId,
) -> Result<BillingRecord, BillingError> {
    store
        .find_by_account_id(account_id)
        .await?
        .ok_or_else(|| BillingError::account_not_found(account_id.clone()))
}

/// Loads the account's record, creating an empty one for a first-seen account.
pub(super) async fn load_or_provision(
    store: &dyn BillingRecordStore,
    account_id: &AccountId,
    email: Option<String>,
) -> Result<BillingRecord, BillingError> {
    if let Some(record) = store.find_by_account_id(account_id).await? {
        return Ok(record);
    }

    let record = BillingRecord::new(account_id.clone(), email);
    match store.insert(&record).await {
        Ok(()) => {
            tracing::info!(account_id = %account_id, "Provisioned billing record");
            Ok(record)
        }
        // Another request provisioned it first
        Err(e) if e.code == ErrorCode::AccountExists => load_record(store, account_id).await,
        Err(e) => Err(e.into()),
    }
}

/// Cancels the record's subscription at the processor.
///
/// A subscription the processor reports as already canceled (or gone) is
/// taken as canceled, built from the snapshot on record. This is the retry
/// path after a `ReconciliationGap`: the processor side already happened and
/// only the local write is still owed.
pub(super) async fn cancel_at_processor(
    gateway: &dyn PaymentGateway,
    record: &BillingRecord,
    subscription_id: &str,
) -> Result<SubscriptionSnapshot, PaymentError> {
    match gateway.cancel_subscription(subscription_id).await {
        Ok(canceled) => Ok(canceled),
        Err(e) if e.is_already_canceled() => match record.subscription() {
            Some(current) if current.id == subscription_id => {
                tracing::warn!(
                    account_id = %record.account_id(),
                    subscription_id,
                    error = %e,
                    "Subscription already canceled at processor, completing local cancellation"
                );
                Ok(current.clone().into_canceled(Timestamp::now()))
            }
            _ => Err(e),
        },
        Err(e) => Err(e),
    }
}

/// Writes the record back, conditional on the version it was read at.
pub(super) async fn save(
    store: &dyn BillingRecordStore,
    record: &BillingRecord,
) -> Result<BillingRecord, BillingError> {
    store
        .update(record, record.version())
        .await
        .map_err(BillingError::from)
}

/// Writes the record back after the processor was already mutated.
///
/// Any failure here leaves the processor ahead of the local record and is
/// reported as a `ReconciliationGap`.
pub(super) async fn save_after_gateway(
    store: &dyn BillingRecordStore,
    record: &BillingRecord,
    operation: &str,
) -> Result<BillingRecord, BillingError> {
    save(store, record).await.map_err(|e| {
        tracing::error!(
            account_id = %record.account_id(),
            operation,
            error = %e,
            "Processor updated but local billing record write failed"
        );
        BillingError::reconciliation_gap(record.account_id().clone(), operation, e.to_string())
    })
}
