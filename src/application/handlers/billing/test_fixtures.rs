//! Checkout session fixtures shared by the handler tests.

use std::collections::BTreeMap;

use crate::domain::billing::test_support::{card, customer, subscription};
use crate::domain::billing::{Invoice, InvoiceList};
use crate::domain::foundation::Timestamp;
use crate::ports::{CompletedCheckoutSession, SetupIntentDetails};

fn metadata(account_id: &str) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("account_id".to_string(), account_id.to_string());
    metadata
}

pub fn subscription_session(id: &str, account_id: &str) -> CompletedCheckoutSession {
    CompletedCheckoutSession {
        id: id.to_string(),
        mode: "subscription".to_string(),
        metadata: metadata(account_id),
        customer: Some(customer("cus_1")),
        subscription: Some(subscription("sub_1")),
        subscription_card: Some(card("4242")),
        setup_intent: None,
    }
}

pub fn setup_session(id: &str, account_id: &str, last4: &str) -> CompletedCheckoutSession {
    let mut new_card = card(last4);
    new_card.payment_method_id = "pm_new".to_string();

    CompletedCheckoutSession {
        id: id.to_string(),
        mode: "setup".to_string(),
        metadata: metadata(account_id),
        customer: None,
        subscription: None,
        subscription_card: None,
        setup_intent: Some(SetupIntentDetails {
            id: "seti_1".to_string(),
            customer_id: Some("cus_1".to_string()),
            subscription_id: Some("sub_1".to_string()),
            card: Some(new_card),
        }),
    }
}

pub fn invoices(count: usize) -> InvoiceList {
    let items = (0..count)
        .map(|i| Invoice {
            id: format!("in_{}", i + 1),
            amount_paid: 1500,
            created_at: Timestamp::now(),
            hosted_url: None,
            paid: true,
            number: Some(format!("INV-{:04}", i + 1)),
            subscription_id: Some("sub_1".to_string()),
        })
        .collect();
    InvoiceList::new(false, items)
}
