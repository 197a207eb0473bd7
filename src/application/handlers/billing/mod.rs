//! Billing handlers.
//!
//! Command and query handlers that keep the account's billing record in step
//! with the payment processor:
//!
//! ## Commands
//! - Starting hosted checkout (subscribe or replace card)
//! - Reconciling a completed checkout
//! - Cancelling at the account holder's request
//! - Cancelling after a failed invoice payment (webhook)
//! - Refreshing the cached invoice history
//!
//! ## Queries
//! - Get the billing view
//!
//! Every reconciliation runs under the account's lock and writes back with a
//! version check.

mod account_locks;
mod cancel_subscription;
mod complete_checkout;
mod create_checkout_session;
mod get_billing;
mod handle_failed_payment;
mod handle_stripe_webhook;
mod record_writes;
mod refresh_invoices;

#[cfg(test)]
mod test_fixtures;

pub use account_locks::AccountLocks;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use complete_checkout::{
    CompleteCheckoutCommand, CompleteCheckoutHandler, CompleteCheckoutResult,
};
pub use create_checkout_session::{
    build_checkout_request, CheckoutSessionParams, CheckoutUrls, CreateCheckoutSessionCommand,
    CreateCheckoutSessionHandler, CreateCheckoutSessionResult,
};
pub use handle_failed_payment::{
    FailedPaymentOutcome, HandleFailedPaymentCommand, HandleFailedPaymentHandler,
};
pub use handle_stripe_webhook::{
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, WebhookOutcome,
};
pub use refresh_invoices::{RefreshInvoicesCommand, RefreshInvoicesHandler, RefreshInvoicesResult};

// Queries
pub use get_billing::{BillingView, GetBillingHandler, GetBillingQuery};
