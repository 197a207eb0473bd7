//! In-Memory Billing Record Store
//!
//! Stores billing records in memory with the same versioned-write semantics
//! as the PostgreSQL store. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::billing::BillingRecord;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::BillingRecordStore;

/// In-memory storage for billing records
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    records: Arc<RwLock<HashMap<AccountId, BillingRecord>>>,
    next_update_failure: Arc<Mutex<Option<DomainError>>>,
    updates: Arc<Mutex<usize>>,
}

impl InMemoryBillingStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `update` call fail with the given error.
    pub async fn fail_next_update(&self, error: DomainError) {
        *self.next_update_failure.lock().await = Some(error);
    }

    /// Read a record without going through the port.
    pub async fn get(&self, account_id: &AccountId) -> Option<BillingRecord> {
        self.records.read().await.get(account_id).cloned()
    }

    /// Number of successful updates since creation.
    pub async fn update_count(&self) -> usize {
        *self.updates.lock().await
    }

    /// Get the number of stored records
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl BillingRecordStore for InMemoryBillingStore {
    async fn insert(&self, record: &BillingRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(record.account_id()) {
            return Err(DomainError::new(
                ErrorCode::AccountExists,
                "Account already has a billing record",
            )
            .with_detail("account_id", record.account_id().as_str()));
        }
        records.insert(record.account_id().clone(), record.clone());
        Ok(())
    }

    async fn find_by_account_id(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<BillingRecord>, DomainError> {
        Ok(self.records.read().await.get(account_id).cloned())
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<BillingRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.subscription_id() == Some(subscription_id))
            .cloned())
    }

    async fn update(
        &self,
        record: &BillingRecord,
        expected_version: u64,
    ) -> Result<BillingRecord, DomainError> {
        if let Some(error) = self.next_update_failure.lock().await.take() {
            return Err(error);
        }

        let mut records = self.records.write().await;
        let stored = records.get(record.account_id()).ok_or_else(|| {
            DomainError::new(ErrorCode::AccountNotFound, "Billing record not found")
                .with_detail("account_id", record.account_id().as_str())
        })?;

        if stored.version() != expected_version {
            return Err(DomainError::new(
                ErrorCode::VersionConflict,
                "Billing record was modified concurrently",
            )
            .with_detail("expected", expected_version.to_string())
            .with_detail("actual", stored.version().to_string()));
        }

        let updated = record.clone().with_version(expected_version + 1);
        records.insert(record.account_id().clone(), updated.clone());
        *self.updates.lock().await += 1;
        Ok(updated)
    }
}
