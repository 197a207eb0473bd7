//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use crate::application::handlers::billing::{
    AccountLocks, CancelSubscriptionCommand, CancelSubscriptionHandler, CheckoutUrls,
    CompleteCheckoutCommand, CompleteCheckoutHandler, CreateCheckoutSessionCommand,
    CreateCheckoutSessionHandler, GetBillingHandler, GetBillingQuery, HandleFailedPaymentHandler,
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, RefreshInvoicesCommand,
    RefreshInvoicesHandler,
};
use crate::domain::billing::{BillingError, ErrorCategory, StripeWebhookVerifier, WebhookError};
use crate::domain::foundation::{AccountId, TeamId};
use crate::ports::{BillingRecordStore, PaymentGateway};

use super::dto::{
    CancelSubscriptionResponse, CheckoutSessionResponse, CreateCheckoutSessionRequest,
    ErrorResponse, InvoicesResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub store: Arc<dyn BillingRecordStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub verifier: Arc<StripeWebhookVerifier>,
    pub locks: AccountLocks,
    pub urls: CheckoutUrls,
    pub price_id: String,
}

impl BillingAppState {
    pub fn create_checkout_session_handler(&self) -> CreateCheckoutSessionHandler {
        CreateCheckoutSessionHandler::new(
            self.store.clone(),
            self.gateway.clone(),
            self.urls.clone(),
            self.price_id.clone(),
        )
    }

    pub fn complete_checkout_handler(&self) -> CompleteCheckoutHandler {
        CompleteCheckoutHandler::new(self.store.clone(), self.gateway.clone(), self.locks.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.store.clone(), self.gateway.clone(), self.locks.clone())
    }

    pub fn refresh_invoices_handler(&self) -> RefreshInvoicesHandler {
        RefreshInvoicesHandler::new(self.store.clone(), self.gateway.clone(), self.locks.clone())
    }

    pub fn get_billing_handler(&self) -> GetBillingHandler {
        GetBillingHandler::new(self.store.clone())
    }

    pub fn webhook_handler(&self) -> HandleStripeWebhookHandler {
        HandleStripeWebhookHandler::new(
            self.verifier.clone(),
            HandleFailedPaymentHandler::new(
                self.store.clone(),
                self.gateway.clone(),
                self.locks.clone(),
            ),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Account Context
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated account extracted from request headers.
///
/// The upstream gateway authenticates the caller and forwards `X-User-Id`
/// (and optionally `X-User-Email`).
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub account_id: AccountId,
    pub email: Option<String>,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let account_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| AccountId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        let email = parts
            .headers
            .get("X-User-Email")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(AuthenticatedUser { account_id, email })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /billing - Current billing view
pub async fn get_billing(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let view = state
        .get_billing_handler()
        .handle(GetBillingQuery {
            account_id: user.account_id,
        })
        .await?;

    Ok(Json(view))
}

/// GET /billing/invoices - Refresh and return the invoice history
pub async fn get_invoices(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .refresh_invoices_handler()
        .handle(RefreshInvoicesCommand {
            account_id: user.account_id,
        })
        .await?;

    Ok(Json(InvoicesResponse {
        invoice_list: result.invoice_list,
    }))
}

/// GET /stripe/checkout-completed/:session_id - Processor success redirect
///
/// Always answers with a redirect back to the billing page; failures are
/// surfaced through `redirectMessage`.
pub async fn checkout_completed(
    State(state): State<BillingAppState>,
    Path(session_id): Path<String>,
) -> Redirect {
    let result = state
        .complete_checkout_handler()
        .handle(CompleteCheckoutCommand {
            session_id: session_id.clone(),
        })
        .await;

    match result {
        Ok(_) => Redirect::to(&state.urls.billing_page()),
        Err(e) => {
            tracing::warn!(
                session_id = %session_id,
                error_code = e.code(),
                error = %e,
                "Checkout completion failed"
            );
            Redirect::to(&state.urls.billing_page_with_message(&redirect_message(&e)))
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /billing/checkout-session - Start hosted checkout
pub async fn create_checkout_session(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCheckoutSessionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let team_id = request
        .team_id
        .map(TeamId::new)
        .transpose()
        .map_err(BillingError::from)?;

    let result = state
        .create_checkout_session_handler()
        .handle(CreateCheckoutSessionCommand {
            account_id: user.account_id,
            email: user.email,
            mode: request.mode,
            team_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutSessionResponse {
            session_id: result.session.id,
            url: result.session.url,
        }),
    ))
}

/// POST /billing/cancel-subscription - Cancel at the account holder's request
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand {
            account_id: user.account_id,
        })
        .await?;

    Ok(Json(CancelSubscriptionResponse {
        is_subscription_active: result.record.is_subscription_active(),
    }))
}

/// POST /webhooks/stripe - Handle processor webhook deliveries
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebhookError::ParseError("missing Stripe-Signature header".to_string()))?;

    let outcome = state
        .webhook_handler()
        .handle(HandleStripeWebhookCommand {
            payload: body.to_vec(),
            signature: signature.to_string(),
        })
        .await?;

    Ok((StatusCode::OK, Json(WebhookAckResponse::from(&outcome))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Message shown on the billing page after a failed completion.
fn redirect_message(err: &BillingError) -> String {
    match err.category() {
        ErrorCategory::Gap | ErrorCategory::Storage => {
            "Something went wrong while updating your billing details.".to_string()
        }
        _ => err.message(),
    }
}

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = match self.0.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::Gateway => StatusCode::BAD_GATEWAY,
            ErrorCategory::Gap | ErrorCategory::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self.0, "Billing request failed");
                ErrorResponse::new(self.0.code(), "Internal server error")
            }
            StatusCode::BAD_GATEWAY => ErrorResponse::with_details(
                self.0.code(),
                self.0.message(),
                serde_json::json!({ "retryable": self.0.is_retryable() }),
            ),
            _ => ErrorResponse::new(self.0.code(), self.0.message()),
        };
        (status, Json(body)).into_response()
    }
}

/// API error type for webhook deliveries; the status code drives processor retries.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();

        if status.is_success() {
            // State-based no-op: acknowledge so the processor stops retrying
            tracing::info!(error = %self.0, "Webhook acknowledged without changes");
            let ack = WebhookAckResponse {
                received: true,
                outcome: "no_op",
            };
            return (status, Json(ack)).into_response();
        }

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Webhook reconciliation failed");
        }

        let code = match &self.0 {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::TestModeRejected => "TEST_MODE_REJECTED",
            WebhookError::Reconciliation(err) => err.code(),
        };
        (status, Json(ErrorResponse::new(code, self.0.to_string()))).into_response()
    }
}
