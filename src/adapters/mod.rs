//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `http` - axum routes for the billing API, checkout redirect and webhooks
//! - `postgres` - PostgreSQL billing record store
//! - `storage` - In-memory billing record store
//! - `stripe` - Stripe REST gateway and its test double

pub mod http;
pub mod postgres;
pub mod storage;
pub mod stripe;

pub use postgres::PostgresBillingRecordStore;
pub use storage::InMemoryBillingStore;
pub use stripe::{MockPaymentGateway, StripeConfig, StripePaymentGateway};
