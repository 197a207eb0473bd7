//! Storage Adapters
//!
//! In-process implementations of the `BillingRecordStore` port.
//!
//! ## Available Adapters
//!
//! - **InMemoryBillingStore** - Stores records in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::InMemoryBillingStore;
//!
//! let store = Arc::new(InMemoryBillingStore::new());
//! ```

mod in_memory_billing_store;

pub use in_memory_billing_store::InMemoryBillingStore;
