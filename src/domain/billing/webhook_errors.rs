//! Webhook error types for Stripe webhook handling.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics.

use http::StatusCode;
use thiserror::Error;

use super::errors::{BillingError, ErrorCategory};

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the tolerance window (5 minutes).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Test mode event delivered to a service that requires live mode.
    #[error("Test mode events are not accepted")]
    TestModeRejected,

    /// Verified event could not be reconciled.
    #[error("Reconciliation failed: {0}")]
    Reconciliation(#[from] BillingError),
}

impl WebhookError {
    /// True for failures of authenticity checks; the reconciler never ran.
    pub fn is_signature_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Returns true if Stripe should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Status codes determine Stripe's retry behavior:
    /// - 2xx: Event acknowledged, no retry
    /// - 4xx: Client error, no retry
    /// - 5xx: Server error, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::TestModeRejected => StatusCode::BAD_REQUEST,

            WebhookError::Reconciliation(err) => match err.category() {
                ErrorCategory::Gateway => StatusCode::BAD_GATEWAY,
                _ if err.is_retryable() => StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCategory::Validation => StatusCode::BAD_REQUEST,
                // State-based no-ops are acknowledged
                ErrorCategory::NotFound | ErrorCategory::Conflict => StatusCode::OK,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}
