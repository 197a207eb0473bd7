//! Property tests for billing record transitions and webhook signatures.
//!
//! Random transition sequences must never leave a record that storage
//! would refuse to restore, and a signature only verifies the exact
//! bytes it was computed over.

use hmac::{Hmac, Mac};
use proptest::prelude::*;
use sha2::Sha256;

use billing_coordinator::domain::billing::{
    BillingError, BillingRecord, BillingRecordParts, CardSnapshot, CustomerSnapshot, Invoice,
    InvoiceList, StripeWebhookVerifier, SubscriptionCheckout, SubscriptionSnapshot,
    SubscriptionStatus, WebhookError,
};
use billing_coordinator::domain::foundation::{AccountId, Timestamp};

// ============================================================================
// STRATEGIES
// ============================================================================

#[derive(Debug, Clone)]
enum Transition {
    Subscribe { customer: u8, canceled: bool },
    ReplaceCard { last4: u16 },
    FailedPayment,
    UserCancel,
    ReplaceInvoices { count: usize },
}

fn arb_transition() -> impl Strategy<Value = Transition> {
    prop_oneof![
        (0u8..3, any::<bool>())
            .prop_map(|(customer, canceled)| Transition::Subscribe { customer, canceled }),
        (0u16..10000).prop_map(|last4| Transition::ReplaceCard { last4 }),
        Just(Transition::FailedPayment),
        Just(Transition::UserCancel),
        (0usize..5).prop_map(|count| Transition::ReplaceInvoices { count }),
    ]
}

fn subscription(id: &str, canceled: bool) -> SubscriptionSnapshot {
    let now = Timestamp::now();
    SubscriptionSnapshot::new(
        id,
        now,
        false,
        now,
        canceled.then_some(now),
        if canceled {
            SubscriptionStatus::Canceled
        } else {
            SubscriptionStatus::Active
        },
    )
    .unwrap()
}

fn card(last4: u16) -> CardSnapshot {
    CardSnapshot::new("pm_prop", "visa", "credit", format!("{:04}", last4), 6, 2031, None).unwrap()
}

fn invoices(count: usize) -> InvoiceList {
    InvoiceList::new(
        false,
        (0..count)
            .map(|n| Invoice {
                id: format!("in_{}", n),
                amount_paid: 1500,
                created_at: Timestamp::now(),
                hosted_url: None,
                paid: true,
                number: None,
                subscription_id: None,
            })
            .collect(),
    )
}

fn apply(record: &mut BillingRecord, transition: &Transition) -> Result<(), BillingError> {
    match transition {
        Transition::Subscribe { customer, canceled } => {
            record.complete_subscription_checkout(SubscriptionCheckout {
                customer: CustomerSnapshot::new(
                    format!("cus_{}", customer),
                    Timestamp::now(),
                    None,
                    None,
                )
                .unwrap(),
                subscription: subscription("sub_prop", *canceled),
                card: Some(card(4242)),
                invoices: None,
            })
        }
        Transition::ReplaceCard { last4 } => {
            record.replace_card(card(*last4));
            Ok(())
        }
        Transition::FailedPayment => {
            record.cancel_after_failed_payment(subscription("sub_prop", false))
        }
        Transition::UserCancel => record.cancel_by_user(subscription("sub_prop", false)),
        Transition::ReplaceInvoices { count } => {
            record.replace_invoices(invoices(*count));
            Ok(())
        }
    }
}

fn parts_of(record: &BillingRecord) -> BillingRecordParts {
    BillingRecordParts {
        account_id: record.account_id().clone(),
        email: record.email().map(str::to_string),
        customer: record.customer().cloned(),
        card: record.card().cloned(),
        subscription: record.subscription().cloned(),
        is_subscription_active: record.is_subscription_active(),
        is_payment_failed: record.is_payment_failed(),
        invoice_list: record.invoice_list().cloned(),
        version: record.version(),
        created_at: record.created_at(),
        updated_at: record.updated_at(),
    }
}

fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

// ============================================================================
// RECORD INVARIANTS
// ============================================================================

proptest! {
    #[test]
    fn transitions_keep_record_restorable(
        transitions in prop::collection::vec(arb_transition(), 0..20)
    ) {
        let mut record = BillingRecord::new(AccountId::new("acct-prop").unwrap(), None);

        for transition in &transitions {
            let before = record.clone();
            if apply(&mut record, transition).is_err() {
                prop_assert_eq!(&record, &before);
            }

            if record.is_subscription_active() {
                let sub = record.subscription().unwrap();
                prop_assert!(!sub.is_canceled());
                prop_assert!(!record.is_payment_failed());
            }
            prop_assert!(BillingRecord::restore(parts_of(&record)).is_ok());
        }
    }

    #[test]
    fn customer_never_changes_once_recorded(
        transitions in prop::collection::vec(arb_transition(), 1..20)
    ) {
        let mut record = BillingRecord::new(AccountId::new("acct-prop").unwrap(), None);
        let mut first_customer: Option<String> = None;

        for transition in &transitions {
            let _ = apply(&mut record, transition);
            if let Some(id) = record.customer_id() {
                let expected = first_customer.get_or_insert_with(|| id.to_string());
                prop_assert_eq!(id, expected.as_str());
            }
        }
    }

    #[test]
    fn cancellation_cause_matches_flags(
        transitions in prop::collection::vec(arb_transition(), 0..20)
    ) {
        let mut record = BillingRecord::new(AccountId::new("acct-prop").unwrap(), None);

        for transition in &transitions {
            let _ = apply(&mut record, transition);
            let cause = record.cancellation_cause();
            prop_assert_eq!(cause.is_some() && record.is_subscription_active(), false);
            if record.is_payment_failed() {
                prop_assert!(cause.is_some());
            }
        }
    }
}

// ============================================================================
// WEBHOOK SIGNATURES
// ============================================================================

proptest! {
    #[test]
    fn tampered_payload_never_verifies(
        subscription in "sub_[a-zA-Z0-9]{1,24}",
        flip in 0usize..64,
    ) {
        let payload = serde_json::json!({
            "id": "evt_prop",
            "type": "invoice.payment_failed",
            "created": 1700000000,
            "data": { "object": { "id": "in_prop", "subscription": subscription } }
        })
        .to_string()
        .into_bytes();
        let header = sign("whsec_prop", chrono::Utc::now().timestamp(), &payload);
        let verifier = StripeWebhookVerifier::new("whsec_prop");

        prop_assert!(verifier.verify(&payload, &header).is_ok());

        let mut tampered = payload.clone();
        let index = flip % tampered.len();
        tampered[index] ^= 0x01;
        prop_assert!(matches!(
            verifier.verify(&tampered, &header),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_headers_are_rejected(header in ".{0,80}") {
        let verifier = StripeWebhookVerifier::new("whsec_prop");
        let body: &[u8] = b"{}";
        prop_assert!(verifier.verify(body, &header).is_err());
    }
}
