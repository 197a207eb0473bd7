//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers reconcile processor state into billing records; the query
//! handler reads them.

pub mod handlers;

pub use handlers::billing::{
    AccountLocks, BillingView, CancelSubscriptionCommand, CancelSubscriptionHandler,
    CheckoutUrls, CompleteCheckoutCommand, CompleteCheckoutHandler,
    CreateCheckoutSessionCommand, CreateCheckoutSessionHandler, GetBillingHandler,
    GetBillingQuery, HandleFailedPaymentHandler, HandleStripeWebhookCommand,
    HandleStripeWebhookHandler, RefreshInvoicesCommand, RefreshInvoicesHandler, WebhookOutcome,
};
