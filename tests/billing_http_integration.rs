//! Integration tests for billing HTTP endpoints.
//!
//! Drives the assembled router with `tower::ServiceExt::oneshot`:
//! 1. Authenticated account endpoints map handler results and errors
//! 2. The checkout redirect always lands on the billing page
//! 3. Webhook status codes follow the processor's retry contract

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

use billing_coordinator::adapters::http::billing::{billing_router, BillingAppState};
use billing_coordinator::adapters::storage::InMemoryBillingStore;
use billing_coordinator::adapters::stripe::MockPaymentGateway;
use billing_coordinator::application::handlers::billing::{AccountLocks, CheckoutUrls};
use billing_coordinator::domain::billing::{
    BillingRecord, CardSnapshot, CustomerSnapshot, StripeWebhookVerifier, SubscriptionCheckout,
    SubscriptionSnapshot, SubscriptionStatus,
};
use billing_coordinator::domain::foundation::{AccountId, Timestamp};
use billing_coordinator::ports::{BillingRecordStore, CompletedCheckoutSession, PaymentError};

const WEBHOOK_SECRET: &str = "whsec_http";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    store: Arc<InMemoryBillingStore>,
    gateway: Arc<MockPaymentGateway>,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryBillingStore::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let state = BillingAppState {
            store: store.clone(),
            gateway: gateway.clone(),
            verifier: Arc::new(StripeWebhookVerifier::new(WEBHOOK_SECRET)),
            locks: AccountLocks::new(),
            urls: CheckoutUrls::new("https://app.example.com", "https://api.example.com"),
            price_id: "price_basic".to_string(),
        };
        Self {
            store,
            gateway,
            router: billing_router().with_state(state),
        }
    }

    async fn with_active_account() -> Self {
        let app = Self::new();
        app.store.insert(&active_record()).await.unwrap();
        app
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

fn account() -> AccountId {
    AccountId::new("acct-http").unwrap()
}

fn active_record() -> BillingRecord {
    let mut record = BillingRecord::new(account(), Some("http@example.com".to_string()));
    record
        .complete_subscription_checkout(SubscriptionCheckout {
            customer: CustomerSnapshot::new("cus_http", Timestamp::now(), None, None).unwrap(),
            subscription: SubscriptionSnapshot::new(
                "sub_http",
                Timestamp::now(),
                false,
                Timestamp::now(),
                None,
                SubscriptionStatus::Active,
            )
            .unwrap(),
            card: Some(
                CardSnapshot::new("pm_http", "mastercard", "debit", "4444", 1, 2030, None)
                    .unwrap(),
            ),
            invoices: None,
        })
        .unwrap();
    record
}

fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-User-Id", "acct-http")
        .header("X-User-Email", "http@example.com");
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn webhook_request(secret: &str, event: Value) -> Request<Body> {
    let payload = event.to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload.as_bytes());
    let signature = format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()));

    Request::builder()
        .method("POST")
        .uri("/webhooks/stripe")
        .header("Stripe-Signature", signature)
        .body(Body::from(payload))
        .unwrap()
}

fn payment_failed_event() -> Value {
    json!({
        "id": "evt_http",
        "type": "invoice.payment_failed",
        "created": 1700000000,
        "data": { "object": { "id": "in_http", "subscription": "sub_http" } }
    })
}

// =============================================================================
// Account Endpoints
// =============================================================================

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Request::builder().uri("/billing").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn get_billing_returns_view() {
    let app = TestApp::with_active_account().await;

    let (status, body) = app.send(authed("GET", "/billing", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_subscription_active"], true);
    assert_eq!(body["has_card_information"], true);
    assert_eq!(body["card"]["last4"], "4444");
}

#[tokio::test]
async fn get_billing_for_unknown_account_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app.send(authed("GET", "/billing", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "ACCOUNT_NOT_FOUND");
}

#[tokio::test]
async fn checkout_session_is_created_for_new_account() {
    let app = TestApp::new();

    let (status, body) = app
        .send(authed(
            "POST",
            "/billing/checkout-session",
            Some(json!({"mode": "subscription", "team_id": "team-1"})),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["session_id"], "cs_mock_1");
    let sent = &app.gateway.created_sessions()[0];
    assert_eq!(sent.customer_email.as_deref(), Some("http@example.com"));
    assert_eq!(sent.metadata.get("team_id").map(String::as_str), Some("team-1"));
}

#[tokio::test]
async fn second_subscription_checkout_conflicts() {
    let app = TestApp::with_active_account().await;

    let (status, body) = app
        .send(authed(
            "POST",
            "/billing/checkout-session",
            Some(json!({"mode": "subscription"})),
        ))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "ALREADY_SUBSCRIBED");
}

#[tokio::test]
async fn cancel_subscription_reports_inactive() {
    let app = TestApp::with_active_account().await;

    let (status, body) = app
        .send(authed("POST", "/billing/cancel-subscription", None))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_subscription_active"], false);
}

#[tokio::test]
async fn gateway_failure_is_bad_gateway() {
    let app = TestApp::with_active_account().await;
    app.gateway
        .set_method_error("cancel_subscription", PaymentError::timeout("slow"));

    let (status, body) = app
        .send(authed("POST", "/billing/cancel-subscription", None))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["details"]["retryable"], true);
}

#[tokio::test]
async fn empty_invoice_history_is_not_found() {
    let app = TestApp::with_active_account().await;

    let (status, body) = app.send(authed("GET", "/billing/invoices", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "NO_INVOICE_HISTORY");
}

// =============================================================================
// Checkout Redirect
// =============================================================================

#[tokio::test]
async fn completed_checkout_redirects_to_billing_page() {
    let app = TestApp::new();
    app.store
        .insert(&BillingRecord::new(account(), None))
        .await
        .unwrap();
    let mut metadata = BTreeMap::new();
    metadata.insert("account_id".to_string(), "acct-http".to_string());
    app.gateway.add_session(CompletedCheckoutSession {
        id: "cs_done".to_string(),
        mode: "subscription".to_string(),
        metadata,
        customer: active_record().customer().cloned(),
        subscription: active_record().subscription().cloned(),
        subscription_card: active_record().card().cloned(),
        setup_intent: None,
    });

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/stripe/checkout-completed/cs_done")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://app.example.com/billing"
    );
    assert!(app.store.get(&account()).await.unwrap().is_subscription_active());
}

#[tokio::test]
async fn failed_checkout_redirects_with_message() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/stripe/checkout-completed/cs_unknown")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://app.example.com/billing?redirectMessage="));
}

// =============================================================================
// Webhooks
// =============================================================================

#[tokio::test]
async fn verified_payment_failure_is_acknowledged() {
    let app = TestApp::with_active_account().await;

    let (status, body) = app
        .send(webhook_request(WEBHOOK_SECRET, payment_failed_event()))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "reconciled");
    assert!(app.store.get(&account()).await.unwrap().is_payment_failed());
}

#[tokio::test]
async fn forged_webhook_is_unauthorized() {
    let app = TestApp::with_active_account().await;

    let (status, body) = app
        .send(webhook_request("whsec_forged", payment_failed_event()))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "INVALID_SIGNATURE");
    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn missing_signature_header_is_bad_request() {
    let app = TestApp::with_active_account().await;

    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/webhooks/stripe")
                .body(Body::from(payment_failed_event().to_string()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unrelated_event_is_acknowledged() {
    let app = TestApp::new();

    let (status, body) = app
        .send(webhook_request(
            WEBHOOK_SECRET,
            json!({
                "id": "evt_other",
                "type": "charge.refunded",
                "created": 1700000000,
                "data": { "object": { "id": "ch_1" } }
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "ignored");
}

#[tokio::test]
async fn gateway_outage_asks_processor_to_retry() {
    let app = TestApp::with_active_account().await;
    app.gateway
        .set_next_error("cancel_subscription", PaymentError::network("reset"));

    let (status, _) = app
        .send(webhook_request(WEBHOOK_SECRET, payment_failed_event()))
        .await;

    assert!(status.is_server_error());
    assert!(app.store.get(&account()).await.unwrap().is_subscription_active());
}
