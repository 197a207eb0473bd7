//! Billing record store port.
//!
//! Persistence contract for `BillingRecord`. Writes are conditional on the
//! version the caller read, so concurrent writers from any process cannot
//! silently overwrite each other.

use async_trait::async_trait;

use crate::domain::billing::BillingRecord;
use crate::domain::foundation::{AccountId, DomainError};

/// Repository port for account billing records.
#[async_trait]
pub trait BillingRecordStore: Send + Sync {
    /// Persist a record for a newly seen account.
    ///
    /// # Errors
    ///
    /// - `AccountExists` if a record already exists for the account
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, record: &BillingRecord) -> Result<(), DomainError>;

    /// Find the record for an account.
    async fn find_by_account_id(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<BillingRecord>, DomainError>;

    /// Find the record holding the given processor subscription.
    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<BillingRecord>, DomainError>;

    /// Atomically replace every billing field of the record.
    ///
    /// Succeeds only if the stored version equals `expected_version`; the
    /// returned record carries the incremented version.
    ///
    /// # Errors
    ///
    /// - `VersionConflict` if the stored version differs
    /// - `AccountNotFound` if no record exists
    /// - `DatabaseError` on persistence failure
    async fn update(
        &self,
        record: &BillingRecord,
        expected_version: u64,
    ) -> Result<BillingRecord, DomainError>;
}
