//! HTTP adapter for billing endpoints.
//!
//! - `GET /billing` - Current billing view
//! - `GET /billing/invoices` - Refresh and return invoice history
//! - `POST /billing/checkout-session` - Start hosted checkout
//! - `POST /billing/cancel-subscription` - Cancel subscription
//! - `GET /stripe/checkout-completed/:session_id` - Checkout success redirect
//! - `POST /webhooks/stripe` - Handle Stripe webhooks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{AuthenticatedUser, BillingApiError, BillingAppState, WebhookApiError};
pub use routes::billing_router;
