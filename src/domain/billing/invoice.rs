//! Cached invoice history.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Maximum invoices fetched per refresh.
pub const INVOICE_PAGE_LIMIT: u32 = 100;

/// One processor invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    /// Amount paid in the smallest currency unit.
    pub amount_paid: i64,
    pub created_at: Timestamp,
    pub hosted_url: Option<String>,
    pub paid: bool,
    pub number: Option<String>,
    pub subscription_id: Option<String>,
}

/// Ordered page of invoices as returned by the processor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceList {
    pub has_more: bool,
    pub items: Vec<Invoice>,
}

impl InvoiceList {
    pub fn new(has_more: bool, items: Vec<Invoice>) -> Self {
        Self { has_more, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
