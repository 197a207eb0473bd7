//! Per-account serialization of reconciliation work.
//!
//! Every reconciliation entry point holds the account's lock from its first
//! read to its last write. The version check in the store covers writers in
//! other processes; this registry keeps tasks in one process from racing
//! each other into version conflicts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::AccountId;

/// Registry of async mutexes keyed by account.
#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    locks: Arc<Mutex<HashMap<AccountId, Arc<Mutex<()>>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the account.
    ///
    /// The guard releases the lock when dropped.
    pub async fn acquire(&self, account_id: &AccountId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(account_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of accounts currently held or awaited.
    pub async fn tracked(&self) -> usize {
        self.locks
            .lock()
            .await
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
