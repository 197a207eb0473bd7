//! HandleStripeWebhookHandler - Verifies a webhook delivery and dispatches it
//! to the reconciler.

use std::sync::Arc;

use crate::domain::billing::{BillingEvent, StripeWebhookVerifier, WebhookError};

use super::handle_failed_payment::{
    FailedPaymentOutcome, HandleFailedPaymentCommand, HandleFailedPaymentHandler,
};

/// Command to handle a raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleStripeWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value.
    pub signature: String,
}

/// Result of webhook processing. Every variant is acknowledged with 2xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event changed billing state.
    Reconciled,
    /// The event was relevant but required no change.
    NoOp { reason: String },
    /// The event type is not handled.
    Ignored { event_type: String },
}

/// Handler for processor webhook deliveries.
///
/// The reconciler only runs after signature verification succeeds.
pub struct HandleStripeWebhookHandler {
    verifier: Arc<StripeWebhookVerifier>,
    failed_payments: HandleFailedPaymentHandler,
}

impl HandleStripeWebhookHandler {
    pub fn new(
        verifier: Arc<StripeWebhookVerifier>,
        failed_payments: HandleFailedPaymentHandler,
    ) -> Self {
        Self {
            verifier,
            failed_payments,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleStripeWebhookCommand,
    ) -> Result<WebhookOutcome, WebhookError> {
        // 1. Verify signature and classify
        let verified = self.verifier.verify(&cmd.payload, &cmd.signature)?;

        // 2. Dispatch
        match verified.event {
            BillingEvent::InvoicePaymentFailed {
                invoice_id,
                subscription_id,
            } => {
                let Some(subscription_id) = subscription_id else {
                    tracing::info!(
                        event_id = %verified.id,
                        invoice_id = invoice_id.as_deref().unwrap_or("-"),
                        "Failed invoice is not tied to a subscription"
                    );
                    return Ok(WebhookOutcome::NoOp {
                        reason: "invoice has no subscription".to_string(),
                    });
                };

                let outcome = self
                    .failed_payments
                    .handle(HandleFailedPaymentCommand {
                        subscription_id,
                        event_id: Some(verified.id.clone()),
                    })
                    .await?;

                Ok(match outcome {
                    FailedPaymentOutcome::Canceled { .. } => WebhookOutcome::Reconciled,
                    FailedPaymentOutcome::AlreadyInactive => WebhookOutcome::NoOp {
                        reason: "subscription already inactive".to_string(),
                    },
                    FailedPaymentOutcome::AlreadyFailed => WebhookOutcome::NoOp {
                        reason: "payment failure already recorded".to_string(),
                    },
                    FailedPaymentOutcome::UnknownSubscription => WebhookOutcome::NoOp {
                        reason: "unknown subscription".to_string(),
                    },
                })
            }
            BillingEvent::Ignored { event_type } => {
                tracing::debug!(event_id = %verified.id, event_type = %event_type, "Webhook event ignored");
                Ok(WebhookOutcome::Ignored { event_type })
            }
        }
    }
}
