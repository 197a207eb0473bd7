//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentGateway` - Operations against the payment processor
//! - `BillingRecordStore` - Versioned persistence of billing records

mod billing_record_store;
mod payment_gateway;

pub use billing_record_store::BillingRecordStore;
pub use payment_gateway::{
    CheckoutSessionHandle, CompletedCheckoutSession, CreateCheckoutSessionRequest, LineItem,
    PaymentError, PaymentErrorCode, PaymentGateway, SetupIntentDetails,
};
