//! Billing domain - account billing state mirrored from the payment processor.
//!
//! # Module Organization
//!
//! - `record` - The `BillingRecord` entity and its transitions
//! - `card`, `customer`, `subscription`, `invoice` - Processor snapshots
//! - `checkout_mode` - Subscription vs setup checkout
//! - `errors` - `BillingError` taxonomy
//! - `webhook_verifier`, `webhook_errors`, `stripe_event` - Authenticated webhook intake

mod card;
mod checkout_mode;
mod customer;
mod errors;
mod invoice;
mod record;
mod stripe_event;
mod subscription;
mod webhook_errors;
mod webhook_verifier;

pub use card::CardSnapshot;
pub use checkout_mode::CheckoutMode;
pub use customer::CustomerSnapshot;
pub use errors::{BillingError, ErrorCategory};
pub use invoice::{Invoice, InvoiceList, INVOICE_PAGE_LIMIT};
pub use record::{
    BillingRecord, BillingRecordParts, CancellationCause, SubscriptionCheckout,
};
pub use stripe_event::{StripeEvent, StripeEventData, StripeEventType};
pub use subscription::{SubscriptionSnapshot, SubscriptionStatus};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{
    BillingEvent, SignatureHeader, StripeWebhookVerifier, VerifiedEvent, DEFAULT_TOLERANCE_SECS,
};

#[cfg(test)]
pub(crate) use record::test_support;
#[cfg(test)]
pub(crate) use webhook_verifier::compute_test_signature;
