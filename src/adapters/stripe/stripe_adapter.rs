//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the Stripe REST API using
//! form-encoded requests. Every request is bounded by the configured gateway
//! timeout; a call that exceeds it is reported as a retryable failure.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key).with_timeout(Duration::from_secs(30));
//! let gateway = StripePaymentGateway::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::billing::{InvoiceList, SubscriptionSnapshot};
use crate::ports::{
    CheckoutSessionHandle, CompletedCheckoutSession, CreateCheckoutSessionRequest, PaymentError,
    PaymentErrorCode, PaymentGateway,
};

use super::stripe_types::{
    Expandable, StripeCheckoutSession, StripeErrorResponse, StripeInvoice, StripeList,
    StripeSubscription,
};

/// Default Stripe API base URL.
const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Connection establishment bound, independent of the overall timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Relations expanded when retrieving a completed checkout session.
const SESSION_EXPANSIONS: [&str; 5] = [
    "setup_intent",
    "setup_intent.payment_method",
    "customer",
    "subscription",
    "subscription.default_payment_method",
];

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Upper bound on a single API call.
    timeout: Duration,
}

impl StripeConfig {
    /// Create a new Stripe configuration with a 30 second timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-call gateway timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stripe payment gateway adapter.
pub struct StripePaymentGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentGateway {
    /// Create a new Stripe gateway with the given configuration.
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Send an authenticated request and fail on non-success statuses.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<reqwest::Response, PaymentError> {
        let response = request
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = status_error(status.as_u16(), &body);
        tracing::warn!(
            operation,
            status = status.as_u16(),
            code = %error.code,
            provider_code = error.provider_code.as_deref().unwrap_or(""),
            "Stripe request failed"
        );
        Err(error)
    }

    async fn parse<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<T, PaymentError> {
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                return transport_error(operation, e);
            }
            PaymentError::invalid_response(format!(
                "Failed to parse Stripe {} response: {}",
                operation, e
            ))
        })
    }
}

/// Map a transport-level failure; timeouts stay distinguishable.
fn transport_error(operation: &str, err: reqwest::Error) -> PaymentError {
    if err.is_timeout() {
        tracing::warn!(operation, error = %err, "Stripe request timed out");
        PaymentError::timeout(format!("Stripe {} timed out", operation))
    } else {
        tracing::warn!(operation, error = %err, "Stripe request failed to send");
        PaymentError::network(err.to_string())
    }
}

/// Map an HTTP error status and body to a payment error.
fn status_error(status: u16, body: &str) -> PaymentError {
    let api_error = serde_json::from_str::<StripeErrorResponse>(body)
        .ok()
        .map(|r| r.error);
    let message = api_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("Stripe API error (HTTP {})", status));

    let code = match status {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        400..=499 if is_canceled_subscription_message(&message) => {
            PaymentErrorCode::AlreadyCanceled
        }
        400..=499 => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let mut error = PaymentError::new(code, message);
    if status >= 500 {
        error = error.with_retryable(true);
    }
    match api_error.and_then(|e| e.code.or(e.error_type)) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

/// Stripe rejects mutations of ended subscriptions with a 400 whose message
/// starts "A canceled subscription can only update ...".
fn is_canceled_subscription_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("canceled subscription")
}

/// Form parameters for creating a checkout session.
fn checkout_session_params(request: &CreateCheckoutSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), request.mode.as_str().to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    match (&request.customer_id, &request.customer_email) {
        (Some(customer_id), _) => params.push(("customer".to_string(), customer_id.clone())),
        (None, Some(email)) => params.push(("customer_email".to_string(), email.clone())),
        (None, None) => {}
    }

    for (i, item) in request.line_items.iter().enumerate() {
        params.push((format!("line_items[{}][price]", i), item.price_id.clone()));
        params.push((format!("line_items[{}][quantity]", i), item.quantity.to_string()));
    }
    for (key, value) in &request.metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
    }
    for (key, value) in &request.setup_intent_metadata {
        params.push((format!("setup_intent_data[metadata][{}]", key), value.clone()));
    }
    params
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, PaymentError> {
        let params = checkout_session_params(&request);
        let response = self
            .send(
                self.http_client
                    .post(self.url("/v1/checkout/sessions"))
                    .form(&params),
                "create_checkout_session",
            )
            .await?;

        let session: StripeCheckoutSession =
            Self::parse(response, "create_checkout_session").await?;

        tracing::info!(
            session_id = %session.id,
            mode = %request.mode,
            "Stripe checkout session created"
        );

        Ok(CheckoutSessionHandle {
            id: session.id,
            url: session.url,
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CompletedCheckoutSession, PaymentError> {
        let query: Vec<(&str, &str)> = SESSION_EXPANSIONS
            .iter()
            .map(|relation| ("expand[]", *relation))
            .collect();

        let response = self
            .send(
                self.http_client
                    .get(self.url(&format!("/v1/checkout/sessions/{}", session_id)))
                    .query(&query),
                "retrieve_checkout_session",
            )
            .await?;

        let session: StripeCheckoutSession =
            Self::parse(response, "retrieve_checkout_session").await?;

        let customer = session
            .customer
            .and_then(Expandable::into_object)
            .filter(|c| !c.deleted)
            .map(|c| c.into_snapshot())
            .transpose()?;

        let (subscription, subscription_card) =
            match session.subscription.and_then(Expandable::into_object) {
                Some(sub) => {
                    let (snapshot, card) = sub.into_parts()?;
                    (Some(snapshot), card)
                }
                None => (None, None),
            };

        let setup_intent = session
            .setup_intent
            .and_then(Expandable::into_object)
            .map(|intent| intent.into_details())
            .transpose()?;

        Ok(CompletedCheckoutSession {
            id: session.id,
            mode: session.mode,
            metadata: session.metadata,
            customer,
            subscription,
            subscription_card,
            setup_intent,
        })
    }

    async fn update_customer_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError> {
        tracing::debug!(customer_id, "Updating customer default payment method");
        self.send(
            self.http_client
                .post(self.url(&format!("/v1/customers/{}", customer_id)))
                .form(&[(
                    "invoice_settings[default_payment_method]",
                    payment_method_id,
                )]),
            "update_customer",
        )
        .await?;
        Ok(())
    }

    async fn update_subscription_default_payment_method(
        &self,
        subscription_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError> {
        tracing::debug!(subscription_id, "Updating subscription default payment method");
        self.send(
            self.http_client
                .post(self.url(&format!("/v1/subscriptions/{}", subscription_id)))
                .form(&[("default_payment_method", payment_method_id)]),
            "update_subscription",
        )
        .await?;
        Ok(())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        tracing::debug!(subscription_id, "Cancelling subscription");
        let response = self
            .send(
                self.http_client
                    .delete(self.url(&format!("/v1/subscriptions/{}", subscription_id))),
                "cancel_subscription",
            )
            .await?;

        let subscription: StripeSubscription = Self::parse(response, "cancel_subscription").await?;
        subscription.into_snapshot()
    }

    async fn list_invoices(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<InvoiceList, PaymentError> {
        tracing::debug!(customer_id, limit, "Listing invoices");
        let limit = limit.to_string();
        let response = self
            .send(
                self.http_client
                    .get(self.url("/v1/invoices"))
                    .query(&[("customer", customer_id), ("limit", limit.as_str())]),
                "list_invoices",
            )
            .await?;

        let list: StripeList<StripeInvoice> = Self::parse(response, "list_invoices").await?;
        list.into_invoice_list()
    }
}
