//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `PaymentGateway` for unit and
//! integration tests. Supports:
//! - Pre-configured checkout sessions and invoice lists
//! - Persistent and one-shot error injection per method
//! - Artificial latency for concurrency tests
//! - Call tracking

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::billing::{InvoiceList, SubscriptionSnapshot, SubscriptionStatus};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    CheckoutSessionHandle, CompletedCheckoutSession, CreateCheckoutSessionRequest, PaymentError,
    PaymentGateway,
};

/// Mock payment gateway for testing.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.add_session(completed_session);
/// gateway.set_method_error("cancel_subscription", PaymentError::timeout("slow"));
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Sessions returned by `retrieve_checkout_session`.
    sessions: HashMap<String, CompletedCheckoutSession>,

    /// Requests passed to `create_checkout_session`.
    created_sessions: Vec<CreateCheckoutSessionRequest>,

    /// Invoice lists by customer id.
    invoices: HashMap<String, InvoiceList>,

    /// Subscriptions known to the processor by id.
    subscriptions: HashMap<String, SubscriptionSnapshot>,

    /// Subscriptions canceled through this gateway.
    canceled: HashSet<String>,

    /// Errors returned on every call to a method.
    method_errors: HashMap<String, PaymentError>,

    /// Errors returned once, on the next call to a method.
    next_errors: HashMap<String, PaymentError>,

    /// Latency added to every call.
    delay: Option<Duration>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    /// Create a new mock gateway with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Register a session for `retrieve_checkout_session`.
    pub fn add_session(&self, session: CompletedCheckoutSession) {
        let mut state = self.state();
        if let Some(sub) = &session.subscription {
            state.subscriptions.insert(sub.id.clone(), sub.clone());
        }
        state.sessions.insert(session.id.clone(), session);
    }

    /// Register a processor subscription for `cancel_subscription`.
    pub fn add_subscription(&self, subscription: SubscriptionSnapshot) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Set the invoices returned for a customer.
    pub fn set_invoices(&self, customer_id: &str, invoices: InvoiceList) {
        self.state()
            .invoices
            .insert(customer_id.to_string(), invoices);
    }

    /// Set an error for every call to a method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Set an error for the next call to a method only.
    pub fn set_next_error(&self, method: &str, error: PaymentError) {
        self.state().next_errors.insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.method_errors.clear();
        state.next_errors.clear();
    }

    /// Add latency to every call.
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    /// Requests passed to `create_checkout_session`, in call order.
    pub fn created_sessions(&self) -> Vec<CreateCheckoutSessionRequest> {
        self.state().created_sessions.clone()
    }

    /// Whether a subscription was canceled through this gateway.
    pub fn is_canceled(&self, subscription_id: &str) -> bool {
        self.state().canceled.contains(subscription_id)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, wait out any configured delay, then apply injected errors.
    async fn enter(&self, method: &str, args: Vec<String>) -> Result<(), PaymentError> {
        let delay = {
            let mut state = self.state();
            state.call_log.push(MethodCall {
                method: method.to_string(),
                args,
            });
            state.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if let Some(error) = state.next_errors.remove(method) {
            return Err(error);
        }
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, PaymentError> {
        self.enter(
            "create_checkout_session",
            vec![request.mode.to_string()],
        )
        .await?;

        let mut state = self.state();
        state.created_sessions.push(request);
        let id = format!("cs_mock_{}", state.created_sessions.len());

        Ok(CheckoutSessionHandle {
            url: Some(format!("https://checkout.stripe.com/c/pay/{}", id)),
            id,
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CompletedCheckoutSession, PaymentError> {
        self.enter("retrieve_checkout_session", vec![session_id.to_string()])
            .await?;

        self.state()
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("Checkout session"))
    }

    async fn update_customer_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError> {
        self.enter(
            "update_customer_default_payment_method",
            vec![customer_id.to_string(), payment_method_id.to_string()],
        )
        .await
    }

    async fn update_subscription_default_payment_method(
        &self,
        subscription_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError> {
        self.enter(
            "update_subscription_default_payment_method",
            vec![subscription_id.to_string(), payment_method_id.to_string()],
        )
        .await
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionSnapshot, PaymentError> {
        self.enter("cancel_subscription", vec![subscription_id.to_string()])
            .await?;

        let now = Timestamp::now();
        let mut state = self.state();
        let already_ended = state.canceled.contains(subscription_id)
            || state
                .subscriptions
                .get(subscription_id)
                .is_some_and(SubscriptionSnapshot::is_canceled);
        if already_ended {
            return Err(PaymentError::already_canceled(subscription_id));
        }
        let subscription = match state.subscriptions.get(subscription_id) {
            Some(existing) => existing.clone(),
            None => SubscriptionSnapshot::new(
                subscription_id,
                now,
                false,
                now,
                None,
                SubscriptionStatus::Active,
            )
            .map_err(|e| PaymentError::invalid_response(e.to_string()))?,
        };
        let canceled = subscription.into_canceled(now);

        state
            .subscriptions
            .insert(subscription_id.to_string(), canceled.clone());
        state.canceled.insert(subscription_id.to_string());
        Ok(canceled)
    }

    async fn list_invoices(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<InvoiceList, PaymentError> {
        self.enter(
            "list_invoices",
            vec![customer_id.to_string(), limit.to_string()],
        )
        .await?;

        Ok(self
            .state()
            .invoices
            .get(customer_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::billing::CheckoutMode;

    fn request() -> CreateCheckoutSessionRequest {
        CreateCheckoutSessionRequest {
            mode: CheckoutMode::Subscription,
            customer_id: None,
            customer_email: None,
            line_items: vec![],
            success_url: "https://api.example.com/done".to_string(),
            cancel_url: "https://app.example.com/billing".to_string(),
            metadata: BTreeMap::new(),
            setup_intent_metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn create_checkout_session_returns_sequential_ids() {
        let gateway = MockPaymentGateway::new();

        let first = gateway.create_checkout_session(request()).await.unwrap();
        let second = gateway.create_checkout_session(request()).await.unwrap();

        assert_eq!(first.id, "cs_mock_1");
        assert_eq!(second.id, "cs_mock_2");
        assert_eq!(gateway.created_sessions().len(), 2);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let gateway = MockPaymentGateway::new();

        let err = gateway.retrieve_checkout_session("cs_missing").await.unwrap_err();

        assert_eq!(err.code, crate::ports::PaymentErrorCode::NotFound);
    }

    #[tokio::test]
    async fn cancel_marks_subscription_canceled() {
        let gateway = MockPaymentGateway::new();

        let sub = gateway.cancel_subscription("sub_1").await.unwrap();

        assert!(sub.is_canceled());
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert!(gateway.is_canceled("sub_1"));
    }

    #[tokio::test]
    async fn second_cancel_is_rejected_like_the_processor() {
        let gateway = MockPaymentGateway::new();
        gateway.cancel_subscription("sub_1").await.unwrap();

        let err = gateway.cancel_subscription("sub_1").await.unwrap_err();

        assert_eq!(err.code, crate::ports::PaymentErrorCode::AlreadyCanceled);
        assert!(gateway.is_canceled("sub_1"));
    }

    #[tokio::test]
    async fn next_error_is_consumed() {
        let gateway = MockPaymentGateway::new();
        gateway.set_next_error("cancel_subscription", PaymentError::timeout("slow"));

        assert!(gateway.cancel_subscription("sub_1").await.is_err());
        assert!(gateway.cancel_subscription("sub_1").await.is_ok());
        assert_eq!(gateway.call_count("cancel_subscription"), 2);
    }

    #[tokio::test]
    async fn method_error_only_affects_method() {
        let gateway = MockPaymentGateway::new();
        gateway.set_method_error("list_invoices", PaymentError::network("down"));

        assert!(gateway.list_invoices("cus_1", 100).await.is_err());
        assert!(gateway.list_invoices("cus_1", 100).await.is_err());
        assert!(gateway.cancel_subscription("sub_1").await.is_ok());

        gateway.clear_errors();
        assert!(gateway.list_invoices("cus_1", 100).await.is_ok());
    }

    #[tokio::test]
    async fn tracks_method_calls_with_arguments() {
        let gateway = MockPaymentGateway::new();

        gateway
            .update_customer_default_payment_method("cus_1", "pm_1")
            .await
            .unwrap();

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "update_customer_default_payment_method");
        assert_eq!(calls[0].args, vec!["cus_1", "pm_1"]);
        assert!(!gateway.was_called("cancel_subscription"));

        gateway.clear_calls();
        assert!(gateway.calls().is_empty());
    }
}
