//! CompleteCheckoutHandler - Reconciles a finished hosted checkout into the
//! account's billing record.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, BillingRecord, CheckoutMode, SubscriptionCheckout, INVOICE_PAGE_LIMIT,
};
use crate::domain::foundation::AccountId;
use crate::ports::{BillingRecordStore, CompletedCheckoutSession, PaymentGateway};

use super::account_locks::AccountLocks;
use super::record_writes::{load_record, save, save_after_gateway};

/// Command to reconcile a completed checkout session.
#[derive(Debug, Clone)]
pub struct CompleteCheckoutCommand {
    pub session_id: String,
}

/// Result of a reconciled checkout.
#[derive(Debug, Clone)]
pub struct CompleteCheckoutResult {
    pub account_id: AccountId,
    pub mode: CheckoutMode,
    pub record: BillingRecord,
}

/// Handler for the checkout-completed redirect.
///
/// Each branch issues a single conditional write covering every field it
/// changes.
pub struct CompleteCheckoutHandler {
    store: Arc<dyn BillingRecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    locks: AccountLocks,
}

impl CompleteCheckoutHandler {
    pub fn new(
        store: Arc<dyn BillingRecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        locks: AccountLocks,
    ) -> Self {
        Self {
            store,
            gateway,
            locks,
        }
    }

    pub async fn handle(
        &self,
        cmd: CompleteCheckoutCommand,
    ) -> Result<CompleteCheckoutResult, BillingError> {
        let session = self
            .gateway
            .retrieve_checkout_session(&cmd.session_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    session_id = %cmd.session_id,
                    error = %e,
                    "Failed to retrieve checkout session"
                );
                BillingError::from(e)
            })?;

        let account_id = session_account(&session)?;
        let _guard = self.locks.acquire(&account_id).await;
        let mut record = load_record(self.store.as_ref(), &account_id).await?;

        let mode: CheckoutMode = session
            .mode
            .parse()
            .map_err(|_| BillingError::unsupported_mode(session.mode.clone()))?;

        let record = match mode {
            CheckoutMode::Setup => self.complete_setup(&session, &mut record).await?,
            CheckoutMode::Subscription => {
                self.complete_subscription(&session, &mut record).await?
            }
        };

        tracing::info!(
            account_id = %account_id,
            session_id = %session.id,
            mode = %mode,
            "Checkout reconciled"
        );

        Ok(CompleteCheckoutResult {
            account_id,
            mode,
            record,
        })
    }

    async fn complete_setup(
        &self,
        session: &CompletedCheckoutSession,
        record: &mut BillingRecord,
    ) -> Result<BillingRecord, BillingError> {
        let intent = session
            .setup_intent
            .as_ref()
            .ok_or_else(|| BillingError::malformed_session("setup session has no setup intent"))?;
        let card = intent.card.clone().ok_or(BillingError::NoCard)?;

        let customer_id = intent
            .customer_id
            .as_deref()
            .or(record.customer_id())
            .ok_or_else(|| BillingError::malformed_session("setup intent has no customer"))?
            .to_string();
        let subscription_id = intent
            .subscription_id
            .as_deref()
            .or(record.subscription_id())
            .ok_or_else(|| BillingError::malformed_session("setup intent has no subscription"))?
            .to_string();

        if let Some(existing) = record.customer_id() {
            if existing != customer_id {
                return Err(BillingError::CustomerMismatch {
                    expected: existing.to_string(),
                    actual: customer_id,
                });
            }
        }

        self.gateway
            .update_customer_default_payment_method(&customer_id, &card.payment_method_id)
            .await?;
        self.gateway
            .update_subscription_default_payment_method(&subscription_id, &card.payment_method_id)
            .await?;

        record.replace_card(card);
        save_after_gateway(self.store.as_ref(), record, "setup_checkout").await
    }

    async fn complete_subscription(
        &self,
        session: &CompletedCheckoutSession,
        record: &mut BillingRecord,
    ) -> Result<BillingRecord, BillingError> {
        if record.is_subscription_active() {
            return Err(BillingError::AlreadySubscribed);
        }

        let customer = session
            .customer
            .clone()
            .ok_or_else(|| BillingError::malformed_session("session has no customer"))?;
        let subscription = session
            .subscription
            .clone()
            .ok_or_else(|| BillingError::malformed_session("session has no subscription"))?;
        if subscription.is_canceled() {
            return Err(BillingError::ImmediatelyCanceled);
        }

        // Missing history does not block activation
        let invoices = match self
            .gateway
            .list_invoices(&customer.id, INVOICE_PAGE_LIMIT)
            .await
        {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!(
                    account_id = %record.account_id(),
                    customer_id = %customer.id,
                    error = %e,
                    "Invoice fetch failed during checkout completion"
                );
                None
            }
        };

        record.complete_subscription_checkout(SubscriptionCheckout {
            customer,
            subscription,
            card: session.subscription_card.clone(),
            invoices,
        })?;
        save(self.store.as_ref(), record).await
    }
}

/// Account id from the session metadata.
fn session_account(session: &CompletedCheckoutSession) -> Result<AccountId, BillingError> {
    let raw = session.metadata_value("account_id").ok_or_else(|| {
        tracing::warn!(session_id = %session.id, "Checkout session without account_id");
        BillingError::malformed_session("session metadata has no account_id")
    })?;
    AccountId::new(raw)
        .map_err(|e| BillingError::malformed_session(format!("invalid account_id: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::super::test_fixtures::{invoices, setup_session, subscription_session};
    use super::*;
    use crate::adapters::storage::InMemoryBillingStore;
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::domain::billing::test_support::{account, active_record, customer};
    use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
    use crate::ports::PaymentError;

    struct Fixture {
        store: Arc<InMemoryBillingStore>,
        gateway: Arc<MockPaymentGateway>,
        handler: CompleteCheckoutHandler,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryBillingStore::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let handler = CompleteCheckoutHandler::new(
            store.clone(),
            gateway.clone(),
            AccountLocks::new(),
        );
        Fixture {
            store,
            gateway,
            handler,
        }
    }

    fn command(session_id: &str) -> CompleteCheckoutCommand {
        CompleteCheckoutCommand {
            session_id: session_id.to_string(),
        }
    }

    async fn with_fresh_account(f: &Fixture) {
        f.store
            .insert(&BillingRecord::new(account(), Some("a@example.com".to_string())))
            .await
            .unwrap();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription Mode
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_checkout_activates_account() {
        let f = fixture();
        with_fresh_account(&f).await;
        f.gateway.add_session(subscription_session("cs_1", "acct-1"));
        f.gateway.set_invoices("cus_1", invoices(1));

        let result = f.handler.handle(command("cs_1")).await.unwrap();

        assert_eq!(result.mode, CheckoutMode::Subscription);
        let record = f.store.get(&account()).await.unwrap();
        assert!(record.is_subscription_active());
        assert!(!record.is_payment_failed());
        assert_eq!(record.customer_id(), Some("cus_1"));
        assert_eq!(record.subscription_id(), Some("sub_1"));
        assert_eq!(record.card().unwrap().last4, "4242");
        assert_eq!(record.invoice_list().unwrap().len(), 1);
        assert_eq!(record.version(), 1);
        assert_eq!(f.store.update_count().await, 1);
    }

    #[tokio::test]
    async fn invoice_failure_does_not_block_activation() {
        let f = fixture();
        with_fresh_account(&f).await;
        f.gateway.add_session(subscription_session("cs_1", "acct-1"));
        f.gateway
            .set_method_error("list_invoices", PaymentError::network("down"));

        f.handler.handle(command("cs_1")).await.unwrap();

        let record = f.store.get(&account()).await.unwrap();
        assert!(record.is_subscription_active());
        assert!(record.invoice_list().is_none());
    }

    #[tokio::test]
    async fn already_active_account_is_rejected() {
        let f = fixture();
        f.store.insert(&active_record()).await.unwrap();
        f.gateway.add_session(subscription_session("cs_1", "acct-1"));

        let err = f.handler.handle(command("cs_1")).await.unwrap_err();

        assert_eq!(err, BillingError::AlreadySubscribed);
        assert_eq!(f.store.update_count().await, 0);
    }

    #[tokio::test]
    async fn immediately_canceled_subscription_is_rejected() {
        let f = fixture();
        with_fresh_account(&f).await;
        let mut session = subscription_session("cs_1", "acct-1");
        if let Some(sub) = session.subscription.as_mut() {
            sub.canceled_at = Some(Timestamp::now());
        }
        f.gateway.add_session(session);

        let err = f.handler.handle(command("cs_1")).await.unwrap_err();

        assert_eq!(err, BillingError::ImmediatelyCanceled);
        assert!(!f.store.get(&account()).await.unwrap().is_subscription_active());
    }

    #[tokio::test]
    async fn session_without_subscription_is_malformed() {
        let f = fixture();
        with_fresh_account(&f).await;
        let mut session = subscription_session("cs_1", "acct-1");
        session.subscription = None;
        f.gateway.add_session(session);

        let err = f.handler.handle(command("cs_1")).await.unwrap_err();

        assert!(matches!(err, BillingError::MalformedSession(_)));
    }

    #[tokio::test]
    async fn different_customer_is_rejected() {
        let f = fixture();
        let mut record = active_record();
        record
            .cancel_by_user(crate::domain::billing::test_support::subscription("sub_1"))
            .unwrap();
        f.store.insert(&record).await.unwrap();
        let mut session = subscription_session("cs_1", "acct-1");
        session.customer = Some(customer("cus_other"));
        f.gateway.add_session(session);

        let err = f.handler.handle(command("cs_1")).await.unwrap_err();

        assert!(matches!(err, BillingError::CustomerMismatch { .. }));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Session Validation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_account_metadata_is_malformed() {
        let f = fixture();
        with_fresh_account(&f).await;
        let mut session = subscription_session("cs_1", "acct-1");
        session.metadata.clear();
        f.gateway.add_session(session);

        let err = f.handler.handle(command("cs_1")).await.unwrap_err();

        assert!(matches!(err, BillingError::MalformedSession(_)));
        assert_eq!(f.store.update_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let f = fixture();
        f.gateway.add_session(subscription_session("cs_1", "acct-gone"));

        let err = f.handler.handle(command("cs_1")).await.unwrap_err();

        assert!(matches!(err, BillingError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn payment_mode_is_unsupported() {
        let f = fixture();
        with_fresh_account(&f).await;
        let mut session = subscription_session("cs_1", "acct-1");
        session.mode = "payment".to_string();
        f.gateway.add_session(session);

        let err = f.handler.handle(command("cs_1")).await.unwrap_err();

        assert_eq!(err, BillingError::UnsupportedMode("payment".to_string()));
    }

    #[tokio::test]
    async fn retrieve_failure_is_gateway_error() {
        let f = fixture();

        let err = f.handler.handle(command("cs_missing")).await.unwrap_err();

        assert!(matches!(err, BillingError::Gateway { .. }));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Setup Mode
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn setup_checkout_replaces_card_everywhere() {
        let f = fixture();
        f.store.insert(&active_record()).await.unwrap();
        f.gateway.add_session(setup_session("cs_2", "acct-1", "1111"));

        let result = f.handler.handle(command("cs_2")).await.unwrap();

        assert_eq!(result.mode, CheckoutMode::Setup);
        assert_eq!(result.record.card().unwrap().last4, "1111");
        assert!(result.record.has_card_information());
        assert!(result.record.is_subscription_active());

        let calls = f.gateway.calls();
        let customer_call = calls
            .iter()
            .find(|c| c.method == "update_customer_default_payment_method")
            .unwrap();
        assert_eq!(customer_call.args, vec!["cus_1", "pm_new"]);
        let sub_call = calls
            .iter()
            .find(|c| c.method == "update_subscription_default_payment_method")
            .unwrap();
        assert_eq!(sub_call.args, vec!["sub_1", "pm_new"]);
    }

    #[tokio::test]
    async fn setup_without_card_is_rejected() {
        let f = fixture();
        f.store.insert(&active_record()).await.unwrap();
        let mut session = setup_session("cs_2", "acct-1", "1111");
        if let Some(intent) = session.setup_intent.as_mut() {
            intent.card = None;
        }
        f.gateway.add_session(session);

        let err = f.handler.handle(command("cs_2")).await.unwrap_err();

        assert_eq!(err, BillingError::NoCard);
        assert!(!f.gateway.was_called("update_customer_default_payment_method"));
    }

    #[tokio::test]
    async fn setup_gateway_failure_leaves_card_untouched() {
        let f = fixture();
        f.store.insert(&active_record()).await.unwrap();
        f.gateway.add_session(setup_session("cs_2", "acct-1", "1111"));
        f.gateway.set_method_error(
            "update_subscription_default_payment_method",
            PaymentError::timeout("slow"),
        );

        let err = f.handler.handle(command("cs_2")).await.unwrap_err();

        assert!(matches!(err, BillingError::Gateway { .. }));
        assert_eq!(f.store.get(&account()).await.unwrap().card().unwrap().last4, "4242");
    }

    #[tokio::test]
    async fn setup_write_failure_is_reconciliation_gap() {
        let f = fixture();
        f.store.insert(&active_record()).await.unwrap();
        f.gateway.add_session(setup_session("cs_2", "acct-1", "1111"));
        f.store
            .fail_next_update(DomainError::new(ErrorCode::DatabaseError, "disk full"))
            .await;

        let err = f.handler.handle(command("cs_2")).await.unwrap_err();

        assert!(matches!(err, BillingError::ReconciliationGap { .. }));
        assert_eq!(f.store.get(&account()).await.unwrap().card().unwrap().last4, "4242");
    }

    #[tokio::test]
    async fn setup_falls_back_to_recorded_ids() {
        let f = fixture();
        f.store.insert(&active_record()).await.unwrap();
        let mut session = setup_session("cs_2", "acct-1", "1111");
        if let Some(intent) = session.setup_intent.as_mut() {
            intent.customer_id = None;
            intent.subscription_id = None;
        }
        f.gateway.add_session(session);

        f.handler.handle(command("cs_2")).await.unwrap();

        assert_eq!(
            f.gateway.call_count("update_subscription_default_payment_method"),
            1
        );
    }
}
