//! Processor subscription snapshot.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, ValidationError};

/// Subscription status as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Unpaid,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Paused,
    Unknown,
}

impl SubscriptionStatus {
    /// Maps the processor's status string.
    pub fn from_processor(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "unpaid" => Self::Unpaid,
            "canceled" => Self::Canceled,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "trialing" => Self::Trialing,
            "paused" => Self::Paused,
            _ => Self::Unknown,
        }
    }
}

/// Snapshot of the account's processor subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    /// Processor subscription id (sub_...).
    pub id: String,
    pub created_at: Timestamp,
    pub cancel_at_period_end: bool,
    pub billing_cycle_anchor: Timestamp,
    pub canceled_at: Option<Timestamp>,
    pub status: SubscriptionStatus,
}

impl SubscriptionSnapshot {
    pub fn new(
        id: impl Into<String>,
        created_at: Timestamp,
        cancel_at_period_end: bool,
        billing_cycle_anchor: Timestamp,
        canceled_at: Option<Timestamp>,
        status: SubscriptionStatus,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("subscription_id"));
        }
        Ok(Self {
            id,
            created_at,
            cancel_at_period_end,
            billing_cycle_anchor,
            canceled_at,
            status,
        })
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    /// Returns a copy guaranteed to carry a cancellation time.
    pub fn into_canceled(mut self, fallback: Timestamp) -> Self {
        if self.canceled_at.is_none() {
            self.canceled_at = Some(fallback);
        }
        self.status = SubscriptionStatus::Canceled;
        self
    }
}
