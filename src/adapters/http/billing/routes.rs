//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, checkout_completed, create_checkout_session, get_billing, get_invoices,
    handle_stripe_webhook, BillingAppState,
};

/// Account holder endpoints (require `X-User-Id`).
///
/// # Routes
/// - `GET /` - Current billing view
/// - `GET /invoices` - Refresh and return invoice history
/// - `POST /checkout-session` - Start hosted checkout
/// - `POST /cancel-subscription` - Cancel the subscription
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/", get(get_billing))
        .route("/invoices", get(get_invoices))
        .route("/checkout-session", post(create_checkout_session))
        .route("/cancel-subscription", post(cancel_subscription))
}

/// Processor-facing endpoints.
///
/// The redirect is unauthenticated because the account is taken from the
/// session metadata; webhooks are verified by signature.
pub fn stripe_routes() -> Router<BillingAppState> {
    Router::new().route("/checkout-completed/:session_id", get(checkout_completed))
}

pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Create the complete billing router.
///
/// # Example
///
/// ```ignore
/// let app = billing_router().with_state(app_state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/billing", billing_routes())
        .nest("/stripe", stripe_routes())
        .nest("/webhooks", webhook_routes())
}
