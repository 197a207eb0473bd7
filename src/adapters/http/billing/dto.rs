//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::WebhookOutcome;
use crate::domain::billing::{CheckoutMode, InvoiceList};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a hosted checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    /// `subscription` or `setup`.
    pub mode: CheckoutMode,
    /// Team to tag the session with.
    #[serde(default)]
    pub team_id: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelSubscriptionResponse {
    pub is_subscription_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoicesResponse {
    pub invoice_list: InvoiceList,
}

/// Acknowledgement sent to the processor.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    /// reconciled, no_op or ignored.
    pub outcome: &'static str,
}

impl From<&WebhookOutcome> for WebhookAckResponse {
    fn from(outcome: &WebhookOutcome) -> Self {
        let outcome = match outcome {
            WebhookOutcome::Reconciled => "reconciled",
            WebhookOutcome::NoOp { .. } => "no_op",
            WebhookOutcome::Ignored { .. } => "ignored",
        };
        Self {
            received: true,
            outcome,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
