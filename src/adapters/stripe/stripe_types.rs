//! Stripe API objects as returned by the REST API.
//!
//! These types parse Stripe JSON and convert into domain snapshots. Fields
//! that Stripe can expand arrive either as an id string or as the full
//! object, which `Expandable` captures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::billing::{
    CardSnapshot, CustomerSnapshot, Invoice, InvoiceList, SubscriptionSnapshot, SubscriptionStatus,
};
use crate::domain::foundation::Timestamp;
use crate::ports::{PaymentError, SetupIntentDetails};

// ════════════════════════════════════════════════════════════════════════════════
// Expandable Fields
// ════════════════════════════════════════════════════════════════════════════════

/// A Stripe field that is an id unless requested with `expand[]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl<T> Expandable<T> {
    /// The expanded object, if Stripe returned one.
    pub fn into_object(self) -> Option<T> {
        match self {
            Expandable::Id(_) => None,
            Expandable::Object(obj) => Some(*obj),
        }
    }
}

/// Generic Stripe list envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Stripe error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeApiError,
}

/// Error details from the Stripe API.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Object Types
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Checkout Session object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Payment mode (payment, setup, subscription).
    pub mode: String,

    /// Hosted checkout URL (only while the session is open).
    pub url: Option<String>,

    pub customer: Option<Expandable<StripeCustomer>>,

    pub subscription: Option<Expandable<StripeSubscription>>,

    pub setup_intent: Option<Expandable<StripeSetupIntent>>,

    /// Custom metadata attached to the session.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Stripe Customer object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    /// Unix timestamp of creation.
    #[serde(default)]
    pub created: i64,

    pub currency: Option<String>,

    pub description: Option<String>,

    /// Whether the customer has been deleted.
    #[serde(default)]
    pub deleted: bool,
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    pub created: i64,

    /// Subscription status.
    pub status: String,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    pub billing_cycle_anchor: i64,

    /// When cancellation was requested (Unix timestamp).
    pub canceled_at: Option<i64>,

    pub default_payment_method: Option<Expandable<StripePaymentMethod>>,
}

/// Stripe SetupIntent object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSetupIntent {
    /// Unique setup intent identifier (seti_...).
    pub id: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    pub payment_method: Option<Expandable<StripePaymentMethod>>,
}

/// Stripe PaymentMethod object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentMethod {
    /// Unique payment method identifier (pm_...).
    pub id: String,

    /// Card details; absent for non-card methods.
    pub card: Option<StripeCard>,
}

/// Card details of a payment method.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCard {
    pub brand: String,
    pub funding: String,
    pub last4: String,
    pub exp_month: u32,
    pub exp_year: i32,
    pub country: Option<String>,
}

/// Stripe Invoice object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoice {
    /// Unique invoice identifier (in_...).
    pub id: String,

    /// Amount paid in cents.
    #[serde(default)]
    pub amount_paid: i64,

    pub created: i64,

    pub hosted_invoice_url: Option<String>,

    /// Removed in newer API versions in favour of `status`.
    pub paid: Option<bool>,

    /// Invoice status (draft, open, paid, void, uncollectible).
    pub status: Option<String>,

    pub number: Option<String>,

    /// Subscription id, or the expanded subscription object.
    pub subscription: Option<serde_json::Value>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Domain Conversion
// ════════════════════════════════════════════════════════════════════════════════

fn timestamp(field: &str, secs: i64) -> Result<Timestamp, PaymentError> {
    Timestamp::from_unix_secs(secs)
        .map_err(|e| PaymentError::invalid_response(format!("{}: {}", field, e)))
}

impl StripeCustomer {
    pub fn into_snapshot(self) -> Result<CustomerSnapshot, PaymentError> {
        let created_at = timestamp("customer.created", self.created)?;
        CustomerSnapshot::new(self.id, created_at, self.currency, self.description)
            .map_err(|e| PaymentError::invalid_response(e.to_string()))
    }
}

impl StripeSubscription {
    /// Splits into the subscription snapshot and the card behind its
    /// default payment method.
    pub fn into_parts(
        self,
    ) -> Result<(SubscriptionSnapshot, Option<CardSnapshot>), PaymentError> {
        let card = match self.default_payment_method.and_then(Expandable::into_object) {
            Some(pm) => pm.into_card()?,
            None => None,
        };
        let snapshot = SubscriptionSnapshot::new(
            self.id,
            timestamp("subscription.created", self.created)?,
            self.cancel_at_period_end,
            timestamp("subscription.billing_cycle_anchor", self.billing_cycle_anchor)?,
            self.canceled_at
                .map(|secs| timestamp("subscription.canceled_at", secs))
                .transpose()?,
            SubscriptionStatus::from_processor(&self.status),
        )
        .map_err(|e| PaymentError::invalid_response(e.to_string()))?;
        Ok((snapshot, card))
    }

    pub fn into_snapshot(self) -> Result<SubscriptionSnapshot, PaymentError> {
        self.into_parts().map(|(snapshot, _)| snapshot)
    }
}

impl StripePaymentMethod {
    /// Card snapshot for card payment methods; `None` otherwise.
    pub fn into_card(self) -> Result<Option<CardSnapshot>, PaymentError> {
        let Some(card) = self.card else {
            return Ok(None);
        };
        CardSnapshot::new(
            self.id,
            card.brand,
            card.funding,
            card.last4,
            card.exp_month,
            card.exp_year,
            card.country,
        )
        .map(Some)
        .map_err(|e| PaymentError::invalid_response(e.to_string()))
    }
}

impl StripeSetupIntent {
    pub fn into_details(self) -> Result<SetupIntentDetails, PaymentError> {
        let card = match self.payment_method.and_then(Expandable::into_object) {
            Some(pm) => pm.into_card()?,
            None => None,
        };
        Ok(SetupIntentDetails {
            id: self.id,
            customer_id: self.metadata.get("customer_id").cloned(),
            subscription_id: self.metadata.get("subscription_id").cloned(),
            card,
        })
    }
}

impl StripeInvoice {
    pub fn into_invoice(self) -> Result<Invoice, PaymentError> {
        let paid = self
            .paid
            .unwrap_or_else(|| self.status.as_deref() == Some("paid"));
        let subscription_id = match self.subscription {
            Some(serde_json::Value::String(id)) => Some(id),
            Some(serde_json::Value::Object(obj)) => obj
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        };
        Ok(Invoice {
            id: self.id,
            amount_paid: self.amount_paid,
            created_at: timestamp("invoice.created", self.created)?,
            hosted_url: self.hosted_invoice_url,
            paid,
            number: self.number,
            subscription_id,
        })
    }
}

impl StripeList<StripeInvoice> {
    pub fn into_invoice_list(self) -> Result<InvoiceList, PaymentError> {
        let items = self
            .data
            .into_iter()
            .map(StripeInvoice::into_invoice)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(InvoiceList::new(self.has_more, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout Session Parsing
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parses_unexpanded_session() {
        let session: StripeCheckoutSession = serde_json::from_value(json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "mode": "subscription",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1",
            "customer": "cus_1",
            "subscription": "sub_1",
            "setup_intent": null,
            "metadata": {"account_id": "acct-1"}
        }))
        .unwrap();

        assert!(matches!(session.customer, Some(Expandable::Id(ref id)) if id == "cus_1"));
        assert!(session.setup_intent.is_none());
        assert_eq!(session.metadata.get("account_id").unwrap(), "acct-1");
    }

    #[test]
    fn parses_expanded_subscription_with_card() {
        let session: StripeCheckoutSession = serde_json::from_value(json!({
            "id": "cs_test_1",
            "mode": "subscription",
            "customer": {"id": "cus_1", "created": 1704067200, "currency": "usd"},
            "subscription": {
                "id": "sub_1",
                "created": 1704067200,
                "status": "active",
                "cancel_at_period_end": false,
                "billing_cycle_anchor": 1704067200,
                "canceled_at": null,
                "default_payment_method": {
                    "id": "pm_1",
                    "card": {
                        "brand": "visa",
                        "funding": "credit",
                        "last4": "4242",
                        "exp_month": 12,
                        "exp_year": 2030,
                        "country": "US"
                    }
                }
            },
            "metadata": {}
        }))
        .unwrap();

        let customer = session.customer.unwrap().into_object().unwrap();
        assert_eq!(customer.into_snapshot().unwrap().id, "cus_1");

        let sub = session.subscription.unwrap().into_object().unwrap();
        let (snapshot, card) = sub.into_parts().unwrap();
        assert_eq!(snapshot.status, SubscriptionStatus::Active);
        assert!(!snapshot.is_canceled());
        let card = card.unwrap();
        assert_eq!(card.payment_method_id, "pm_1");
        assert_eq!(card.last4, "4242");
    }

    #[test]
    fn non_card_payment_method_has_no_card() {
        let pm: StripePaymentMethod =
            serde_json::from_value(json!({"id": "pm_sepa", "card": null})).unwrap();

        assert_eq!(pm.into_card().unwrap(), None);
    }

    #[test]
    fn setup_intent_reads_metadata() {
        let intent: StripeSetupIntent = serde_json::from_value(json!({
            "id": "seti_1",
            "metadata": {"customer_id": "cus_1", "subscription_id": "sub_1"},
            "payment_method": "pm_unexpanded"
        }))
        .unwrap();

        let details = intent.into_details().unwrap();
        assert_eq!(details.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(details.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(details.card, None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Invoice Parsing
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn invoice_paid_falls_back_to_status() {
        let list: StripeList<StripeInvoice> = serde_json::from_value(json!({
            "object": "list",
            "has_more": true,
            "data": [
                {"id": "in_1", "amount_paid": 1999, "created": 1704067200, "status": "paid",
                 "hosted_invoice_url": "https://invoice.stripe.com/i/1", "number": "A-1",
                 "subscription": "sub_1"},
                {"id": "in_2", "amount_paid": 0, "created": 1704067200, "paid": false,
                 "status": "open", "subscription": {"id": "sub_2"}}
            ]
        }))
        .unwrap();

        let invoices = list.into_invoice_list().unwrap();
        assert!(invoices.has_more);
        assert_eq!(invoices.len(), 2);
        assert!(invoices.items[0].paid);
        assert_eq!(invoices.items[0].subscription_id.as_deref(), Some("sub_1"));
        assert!(!invoices.items[1].paid);
        assert_eq!(invoices.items[1].subscription_id.as_deref(), Some("sub_2"));
    }

    #[test]
    fn error_response_parses() {
        let err: StripeErrorResponse = serde_json::from_value(json!({
            "error": {"type": "invalid_request_error", "code": "resource_missing",
                      "message": "No such subscription: 'sub_x'"}
        }))
        .unwrap();

        assert_eq!(err.error.code.as_deref(), Some("resource_missing"));
    }
}
