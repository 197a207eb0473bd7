//! Account billing record entity.
//!
//! The billing record is the local mirror of processor-side state for one
//! account. All transitions happen through methods on this type so that the
//! flag/snapshot invariants cannot be broken by callers.
//!
//! # Invariants
//!
//! - `is_subscription_active` implies a subscription snapshot without `canceled_at`
//! - `is_payment_failed` implies `!is_subscription_active`
//! - card information is present iff a card snapshot is held
//! - `customer.id` never changes once recorded
//! - inactive to active only through a completed subscription checkout

use serde::Serialize;

use crate::domain::foundation::{AccountId, Timestamp, ValidationError};

use super::{BillingError, CardSnapshot, CustomerSnapshot, InvoiceList, SubscriptionSnapshot};

/// Why an account's subscription stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationCause {
    UserInitiated,
    PaymentFailed,
}

/// Everything a completed subscription checkout writes, applied as one update.
#[derive(Debug, Clone)]
pub struct SubscriptionCheckout {
    pub customer: CustomerSnapshot,
    pub subscription: SubscriptionSnapshot,
    pub card: Option<CardSnapshot>,
    pub invoices: Option<InvoiceList>,
}

/// Raw stored fields, validated by [`BillingRecord::restore`].
#[derive(Debug, Clone)]
pub struct BillingRecordParts {
    pub account_id: AccountId,
    pub email: Option<String>,
    pub customer: Option<CustomerSnapshot>,
    pub card: Option<CardSnapshot>,
    pub subscription: Option<SubscriptionSnapshot>,
    pub is_subscription_active: bool,
    pub is_payment_failed: bool,
    pub invoice_list: Option<InvoiceList>,
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Billing state for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingRecord {
    account_id: AccountId,
    email: Option<String>,
    customer: Option<CustomerSnapshot>,
    card: Option<CardSnapshot>,
    subscription: Option<SubscriptionSnapshot>,
    is_subscription_active: bool,
    is_payment_failed: bool,
    invoice_list: Option<InvoiceList>,
    version: u64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl BillingRecord {
    /// Creates a record with no processor state for a newly seen account.
    pub fn new(account_id: AccountId, email: Option<String>) -> Self {
        let now = Timestamp::now();
        Self {
            account_id,
            email,
            customer: None,
            card: None,
            subscription: None,
            is_subscription_active: false,
            is_payment_failed: false,
            invoice_list: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a record from storage, rejecting inconsistent flag combinations.
    pub fn restore(parts: BillingRecordParts) -> Result<Self, ValidationError> {
        let record = Self {
            account_id: parts.account_id,
            email: parts.email,
            customer: parts.customer,
            card: parts.card,
            subscription: parts.subscription,
            is_subscription_active: parts.is_subscription_active,
            is_payment_failed: parts.is_payment_failed,
            invoice_list: parts.invoice_list,
            version: parts.version,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        };
        record.check_invariants()?;
        Ok(record)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Accessors
    // ════════════════════════════════════════════════════════════════════════════

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn customer(&self) -> Option<&CustomerSnapshot> {
        self.customer.as_ref()
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(|c| c.id.as_str())
    }

    pub fn card(&self) -> Option<&CardSnapshot> {
        self.card.as_ref()
    }

    pub fn has_card_information(&self) -> bool {
        self.card.is_some()
    }

    pub fn subscription(&self) -> Option<&SubscriptionSnapshot> {
        self.subscription.as_ref()
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.id.as_str())
    }

    pub fn is_subscription_active(&self) -> bool {
        self.is_subscription_active
    }

    pub fn is_payment_failed(&self) -> bool {
        self.is_payment_failed
    }

    pub fn invoice_list(&self) -> Option<&InvoiceList> {
        self.invoice_list.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns the record as stored with a new version. Used by stores after a write.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Why the subscription ended, if it ended through this service.
    pub fn cancellation_cause(&self) -> Option<CancellationCause> {
        if self.is_subscription_active {
            return None;
        }
        if self.is_payment_failed {
            return Some(CancellationCause::PaymentFailed);
        }
        match &self.subscription {
            Some(sub) if sub.is_canceled() => Some(CancellationCause::UserInitiated),
            _ => None,
        }
    }

    /// True when a processor payment failure still has to cancel this subscription.
    pub fn needs_failed_payment_cancellation(&self) -> bool {
        self.is_subscription_active && !self.is_payment_failed
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Transitions
    // ════════════════════════════════════════════════════════════════════════════

    /// Applies a completed subscription-mode checkout.
    ///
    /// # Errors
    ///
    /// - `AlreadySubscribed` if the account is already active
    /// - `ImmediatelyCanceled` if the processor subscription is already canceled
    /// - `CustomerMismatch` if a different customer is already on record
    pub fn complete_subscription_checkout(
        &mut self,
        checkout: SubscriptionCheckout,
    ) -> Result<(), BillingError> {
        if self.is_subscription_active {
            return Err(BillingError::AlreadySubscribed);
        }
        if checkout.subscription.is_canceled() {
            return Err(BillingError::ImmediatelyCanceled);
        }
        self.ensure_same_customer(&checkout.customer.id)?;

        self.customer = Some(checkout.customer);
        self.subscription = Some(checkout.subscription);
        if let Some(card) = checkout.card {
            self.card = Some(card);
        }
        if let Some(invoices) = checkout.invoices {
            self.invoice_list = Some(invoices);
        }
        self.is_subscription_active = true;
        self.is_payment_failed = false;
        self.touch();
        Ok(())
    }

    /// Replaces the card snapshot after a setup-mode checkout.
    pub fn replace_card(&mut self, card: CardSnapshot) {
        self.card = Some(card);
        self.touch();
    }

    /// Records a processor-side cancellation caused by a failed payment.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyUnsubscribed` if the subscription is not active.
    pub fn cancel_after_failed_payment(
        &mut self,
        canceled: SubscriptionSnapshot,
    ) -> Result<(), BillingError> {
        if !self.is_subscription_active {
            return Err(BillingError::AlreadyUnsubscribed);
        }
        self.subscription = Some(canceled.into_canceled(Timestamp::now()));
        self.is_subscription_active = false;
        self.is_payment_failed = true;
        self.touch();
        Ok(())
    }

    /// Records a cancellation requested by the account holder.
    ///
    /// `is_payment_failed` is left as is.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyUnsubscribed` if the subscription is not active.
    pub fn cancel_by_user(&mut self, canceled: SubscriptionSnapshot) -> Result<(), BillingError> {
        if !self.is_subscription_active {
            return Err(BillingError::AlreadyUnsubscribed);
        }
        self.subscription = Some(canceled.into_canceled(Timestamp::now()));
        self.is_subscription_active = false;
        self.touch();
        Ok(())
    }

    /// Replaces the cached invoice list wholesale.
    pub fn replace_invoices(&mut self, invoices: InvoiceList) {
        self.invoice_list = Some(invoices);
        self.touch();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn ensure_same_customer(&self, incoming: &str) -> Result<(), BillingError> {
        match &self.customer {
            Some(existing) if existing.id != incoming => Err(BillingError::CustomerMismatch {
                expected: existing.id.clone(),
                actual: incoming.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn check_invariants(&self) -> Result<(), ValidationError> {
        if self.is_subscription_active {
            match &self.subscription {
                None => {
                    return Err(ValidationError::inconsistent(
                        "active subscription flag without a subscription",
                    ))
                }
                Some(sub) if sub.is_canceled() => {
                    return Err(ValidationError::inconsistent(
                        "active subscription flag on a canceled subscription",
                    ))
                }
                Some(_) => {}
            }
        }
        if self.is_payment_failed && self.is_subscription_active {
            return Err(ValidationError::inconsistent(
                "payment failed flag on an active subscription",
            ));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
