//! Payment gateway port for the external payment processor.
//!
//! Defines the contract for the processor operations billing reconciliation
//! depends on. Every call is a network round trip that can fail or time out;
//! implementations report both as `PaymentError`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{
    BillingError, CardSnapshot, CheckoutMode, CustomerSnapshot, InvoiceList, SubscriptionSnapshot,
};

/// Port for payment processor integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, PaymentError>;

    /// Retrieve a checkout session with customer, subscription, default
    /// payment method and setup intent expanded.
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CompletedCheckoutSession, PaymentError>;

    /// Make a payment method the customer's default for invoices.
    async fn update_customer_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError>;

    /// Make a payment method the subscription's default.
    async fn update_subscription_default_payment_method(
        &self,
        subscription_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError>;

    /// Cancel a subscription immediately.
    ///
    /// Returns the canceled subscription as reported by the processor.
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError>;

    /// List the customer's most recent invoices.
    async fn list_invoices(&self, customer_id: &str, limit: u32)
        -> Result<InvoiceList, PaymentError>;
}

/// One priced line item on a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub price_id: String,
    pub quantity: u32,
}

/// Request to create a checkout session.
///
/// Built by the session initiator, which guarantees that setup-mode
/// requests carry a customer id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    pub mode: CheckoutMode,

    /// Existing processor customer, if any.
    pub customer_id: Option<String>,

    /// Pre-fill email; only sent when no customer id is known.
    pub customer_email: Option<String>,

    pub line_items: Vec<LineItem>,

    /// URL the processor redirects to after completion.
    pub success_url: String,

    /// URL the processor redirects to when the user backs out.
    pub cancel_url: String,

    /// Session metadata (always carries `account_id`).
    pub metadata: BTreeMap<String, String>,

    /// Setup-intent metadata (setup mode only).
    pub setup_intent_metadata: BTreeMap<String, String>,
}

/// Newly created checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionHandle {
    /// Processor session id (cs_...).
    pub id: String,

    /// Hosted checkout URL, when the processor returns one.
    pub url: Option<String>,
}

/// Setup intent attached to a setup-mode session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupIntentDetails {
    pub id: String,

    /// `customer_id` from the setup intent metadata.
    pub customer_id: Option<String>,

    /// `subscription_id` from the setup intent metadata.
    pub subscription_id: Option<String>,

    /// Card of the collected payment method; `None` when the method is not a card.
    pub card: Option<CardSnapshot>,
}

/// Checkout session retrieved after the user returns from hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckoutSession {
    pub id: String,

    /// Raw processor mode so unsupported modes can be reported.
    pub mode: String,

    pub metadata: BTreeMap<String, String>,

    pub customer: Option<CustomerSnapshot>,

    pub subscription: Option<SubscriptionSnapshot>,

    /// Card behind the subscription's default payment method.
    pub subscription_card: Option<CardSnapshot>,

    pub setup_intent: Option<SetupIntentDetails>,
}

impl CompletedCheckoutSession {
    /// Metadata value by key, ignoring empty strings.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Override retryability (e.g. provider 5xx responses).
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Create an error for a cancel of a subscription the processor already ended.
    pub fn already_canceled(subscription_id: &str) -> Self {
        Self::new(
            PaymentErrorCode::AlreadyCanceled,
            format!("Subscription {} is already canceled", subscription_id),
        )
    }

    /// True when a cancel failed only because the subscription is already gone.
    pub fn is_already_canceled(&self) -> bool {
        matches!(
            self.code,
            PaymentErrorCode::AlreadyCanceled | PaymentErrorCode::NotFound
        )
    }

    /// Create an error for a response that could not be interpreted.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for BillingError {
    fn from(err: PaymentError) -> Self {
        BillingError::Gateway {
            code: err.code.to_string(),
            message: err.message,
            retryable: err.retryable,
        }
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Call exceeded the gateway timeout.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Request rejected as invalid.
    InvalidRequest,

    /// Cancel requested for a subscription that is already canceled.
    AlreadyCanceled,

    /// Response body did not match the expected shape.
    InvalidResponse,

    /// Provider API error.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::AlreadyCanceled => "already_canceled",
            PaymentErrorCode::InvalidResponse => "invalid_response",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
