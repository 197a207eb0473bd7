//! Stripe webhook event types.
//!
//! Only fields relevant to billing reconciliation are captured; the rest of
//! Stripe's event schema is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "invoice.payment_failed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    /// API version used to render this event.
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: Value,
}

impl StripeEvent {
    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::from_str(&self.event_type)
    }

    /// Id of the data object, when present.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(Value::as_str)
    }

    /// Subscription referenced by an invoice object.
    ///
    /// Accepts the id as a plain string or as an expanded object, and also
    /// looks under `parent.subscription_details` where newer API versions
    /// place it.
    pub fn invoice_subscription_id(&self) -> Option<String> {
        let object = &self.data.object;
        id_of(object.get("subscription")).or_else(|| {
            id_of(
                object
                    .get("parent")
                    .and_then(|p| p.get("subscription_details"))
                    .and_then(|d| d.get("subscription")),
            )
        })
    }
}

fn id_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Stripe event types the reconciler distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    /// Invoice payment failed; the subscription must be canceled locally.
    InvoicePaymentFailed,
    /// Any other event; acknowledged without action.
    Unhandled,
}

impl StripeEventType {
    /// Parse event type from string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unhandled,
        }
    }
}
