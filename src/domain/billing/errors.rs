//! Billing-specific error types.
//!
//! Every reconciliation entry point returns `BillingError`. The category
//! decides how transport adapters react:
//!
//! | Category | Synchronous flows | Webhook flow |
//! |----------|-------------------|--------------|
//! | Validation | 400 / redirect message | 400, not retried |
//! | NotFound | 404 / redirect message | acknowledged |
//! | Conflict | 409 / redirect message | no-op or retried |
//! | Gateway | 502 | 5xx, processor retries |
//! | Gap | 500, logged at error | 5xx, processor retries |
//! | Storage | 500 | 5xx, processor retries |

use thiserror::Error;

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, ValidationError};

/// How a billing error should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Gateway,
    Gap,
    Storage,
}

/// Errors raised while creating sessions or reconciling processor state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BillingError {
    /// Requested checkout mode is missing required identifiers or unknown.
    #[error("Invalid checkout mode: {0}")]
    InvalidMode(String),

    /// Retrieved session lacks data needed to reconcile it.
    #[error("Malformed checkout session: {0}")]
    MalformedSession(String),

    /// Session completed in a mode this service does not reconcile.
    #[error("Unsupported checkout mode: {0}")]
    UnsupportedMode(String),

    /// Setup session finished without a card payment method.
    #[error("No card found.")]
    NoCard,

    /// Processor data failed value-object validation.
    #[error("Invalid processor data: {0}")]
    InvalidData(#[from] ValidationError),

    /// No billing record exists for the account.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Invoice refresh requested for an account without a processor customer.
    #[error("You are not a customer and you have no payment history.")]
    NotACustomer,

    /// Processor customer exists but has no invoices.
    #[error("You are a customer. But there is no payment history.")]
    NoInvoiceHistory,

    /// Subscription checkout completed for an already active account.
    #[error("Account is already subscribed.")]
    AlreadySubscribed,

    /// Cancellation requested for an inactive subscription.
    #[error("User is already unsubscribed.")]
    AlreadyUnsubscribed,

    /// Retrieved subscription was canceled before it could be activated.
    #[error("Subscription was canceled before activation.")]
    ImmediatelyCanceled,

    /// Processor reported a customer different from the one on record.
    #[error("Processor customer {actual} does not match customer {expected} on record")]
    CustomerMismatch { expected: String, actual: String },

    /// Billing record changed between read and conditional write.
    #[error("Billing record was modified concurrently")]
    Conflict,

    /// Payment processor call failed or timed out.
    #[error("Payment gateway error ({code}): {message}")]
    Gateway {
        code: String,
        message: String,
        retryable: bool,
    },

    /// Processor was mutated but the local write failed.
    #[error("Reconciliation gap for account {account_id} during {operation}: {reason}")]
    ReconciliationGap {
        account_id: AccountId,
        operation: String,
        reason: String,
    },

    /// Billing record store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BillingError {
    pub fn invalid_mode(reason: impl Into<String>) -> Self {
        BillingError::InvalidMode(reason.into())
    }

    pub fn malformed_session(reason: impl Into<String>) -> Self {
        BillingError::MalformedSession(reason.into())
    }

    pub fn unsupported_mode(mode: impl Into<String>) -> Self {
        BillingError::UnsupportedMode(mode.into())
    }

    pub fn account_not_found(account_id: AccountId) -> Self {
        BillingError::AccountNotFound(account_id)
    }

    pub fn reconciliation_gap(
        account_id: AccountId,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        BillingError::ReconciliationGap {
            account_id,
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        BillingError::Storage(message.into())
    }

    /// Returns the category used for transport mapping.
    pub fn category(&self) -> ErrorCategory {
        match self {
            BillingError::InvalidMode(_)
            | BillingError::MalformedSession(_)
            | BillingError::UnsupportedMode(_)
            | BillingError::NoCard
            | BillingError::InvalidData(_) => ErrorCategory::Validation,
            BillingError::AccountNotFound(_)
            | BillingError::NotACustomer
            | BillingError::NoInvoiceHistory => ErrorCategory::NotFound,
            BillingError::AlreadySubscribed
            | BillingError::AlreadyUnsubscribed
            | BillingError::ImmediatelyCanceled
            | BillingError::CustomerMismatch { .. }
            | BillingError::Conflict => ErrorCategory::Conflict,
            BillingError::Gateway { .. } => ErrorCategory::Gateway,
            BillingError::ReconciliationGap { .. } => ErrorCategory::Gap,
            BillingError::Storage(_) => ErrorCategory::Storage,
        }
    }

    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::InvalidMode(_) => "INVALID_MODE",
            BillingError::MalformedSession(_) => "MALFORMED_SESSION",
            BillingError::UnsupportedMode(_) => "UNSUPPORTED_MODE",
            BillingError::NoCard => "NO_CARD",
            BillingError::InvalidData(_) => "INVALID_PROCESSOR_DATA",
            BillingError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            BillingError::NotACustomer => "NOT_A_CUSTOMER",
            BillingError::NoInvoiceHistory => "NO_INVOICE_HISTORY",
            BillingError::AlreadySubscribed => "ALREADY_SUBSCRIBED",
            BillingError::AlreadyUnsubscribed => "ALREADY_UNSUBSCRIBED",
            BillingError::ImmediatelyCanceled => "IMMEDIATELY_CANCELED",
            BillingError::CustomerMismatch { .. } => "CUSTOMER_MISMATCH",
            BillingError::Conflict => "VERSION_CONFLICT",
            BillingError::Gateway { .. } => "GATEWAY_ERROR",
            BillingError::ReconciliationGap { .. } => "RECONCILIATION_GAP",
            BillingError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Human-readable message, suitable for a redirect notice.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if repeating the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::Gateway { retryable, .. } => *retryable,
            BillingError::Conflict
            | BillingError::ReconciliationGap { .. }
            | BillingError::Storage(_) => true,
            _ => false,
        }
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::VersionConflict => BillingError::Conflict,
            _ => BillingError::Storage(err.to_string()),
        }
    }
}
