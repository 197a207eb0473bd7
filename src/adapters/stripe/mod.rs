//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Stripe integration:
//! - Hosted checkout sessions (subscription and setup modes)
//! - Default payment method updates
//! - Immediate subscription cancellation
//! - Invoice history
//!
//! Webhook signature verification lives in the billing domain; this adapter
//! only talks to the Stripe REST API.
//!
//! # Configuration
//!
//! Required settings:
//! - `BILLING__PAYMENT__STRIPE_API_KEY`: Stripe secret API key

mod mock_payment_gateway;
mod stripe_adapter;
mod stripe_types;

pub use mock_payment_gateway::{MethodCall, MockPaymentGateway};
pub use stripe_adapter::{StripeConfig, StripePaymentGateway};
pub use stripe_types::{
    Expandable, StripeCheckoutSession, StripeCustomer, StripeInvoice, StripeList,
    StripePaymentMethod, StripeSetupIntent, StripeSubscription,
};
