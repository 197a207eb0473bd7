//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresBillingRecordStore` - Versioned billing record persistence

mod billing_record_store;

pub use billing_record_store::PostgresBillingRecordStore;
