//! GetBillingHandler - Query handler for the account's billing screen.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{
    BillingError, BillingRecord, CancellationCause, CardSnapshot, InvoiceList,
    SubscriptionSnapshot,
};
use crate::domain::foundation::AccountId;
use crate::ports::BillingRecordStore;

/// Query to get an account's billing state.
#[derive(Debug, Clone)]
pub struct GetBillingQuery {
    pub account_id: AccountId,
}

/// Billing fields shown to the account holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingView {
    pub account_id: AccountId,
    pub customer_id: Option<String>,
    pub card: Option<CardSnapshot>,
    pub has_card_information: bool,
    pub subscription: Option<SubscriptionSnapshot>,
    pub is_subscription_active: bool,
    pub is_payment_failed: bool,
    pub cancellation_cause: Option<CancellationCause>,
    pub invoice_list: Option<InvoiceList>,
}

impl From<&BillingRecord> for BillingView {
    fn from(record: &BillingRecord) -> Self {
        Self {
            account_id: record.account_id().clone(),
            customer_id: record.customer_id().map(str::to_string),
            card: record.card().cloned(),
            has_card_information: record.has_card_information(),
            subscription: record.subscription().cloned(),
            is_subscription_active: record.is_subscription_active(),
            is_payment_failed: record.is_payment_failed(),
            cancellation_cause: record.cancellation_cause(),
            invoice_list: record.invoice_list().cloned(),
        }
    }
}

/// Handler for reading billing state. Makes no processor calls.
pub struct GetBillingHandler {
    store: Arc<dyn BillingRecordStore>,
}

impl GetBillingHandler {
    pub fn new(store: Arc<dyn BillingRecordStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, query: GetBillingQuery) -> Result<BillingView, BillingError> {
        let record = self
            .store
            .find_by_account_id(&query.account_id)
            .await?
            .ok_or_else(|| BillingError::account_not_found(query.account_id.clone()))?;

        Ok(BillingView::from(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryBillingStore;
    use crate::domain::billing::test_support::{account, active_record};
    use crate::domain::foundation::{DomainError, ErrorCode};
    use async_trait::async_trait;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementation
    // ════════════════════════════════════════════════════════════════════════════

    struct FailingStore;

    #[async_trait]
    impl BillingRecordStore for FailingStore {
        async fn insert(&self, _record: &BillingRecord) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "down"))
        }

        async fn find_by_account_id(
            &self,
            _account_id: &AccountId,
        ) -> Result<Option<BillingRecord>, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "down"))
        }

        async fn find_by_subscription_id(
            &self,
            _subscription_id: &str,
        ) -> Result<Option<BillingRecord>, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "down"))
        }

        async fn update(
            &self,
            _record: &BillingRecord,
            _expected_version: u64,
        ) -> Result<BillingRecord, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "down"))
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn returns_view_of_active_account() {
        let store = Arc::new(InMemoryBillingStore::new());
        store.insert(&active_record()).await.unwrap();

        let view = GetBillingHandler::new(store)
            .handle(GetBillingQuery {
                account_id: account(),
            })
            .await
            .unwrap();

        assert!(view.is_subscription_active);
        assert!(view.has_card_information);
        assert_eq!(view.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(view.card.unwrap().last4, "4242");
        assert_eq!(view.cancellation_cause, None);
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let handler = GetBillingHandler::new(Arc::new(InMemoryBillingStore::new()));

        let err = handler
            .handle(GetBillingQuery {
                account_id: account(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn store_failure_is_storage_error() {
        let handler = GetBillingHandler::new(Arc::new(FailingStore));

        let err = handler
            .handle(GetBillingQuery {
                account_id: account(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Storage(_)));
    }
}
