//! RefreshInvoicesHandler - Replaces the cached invoice history with the
//! processor's current list.

use std::sync::Arc;

use crate::domain::billing::{BillingError, InvoiceList, INVOICE_PAGE_LIMIT};
use crate::domain::foundation::AccountId;
use crate::ports::{BillingRecordStore, PaymentGateway};

use super::account_locks::AccountLocks;
use super::record_writes::{load_record, save};

#[derive(Debug, Clone)]
pub struct RefreshInvoicesCommand {
    pub account_id: AccountId,
}

#[derive(Debug, Clone)]
pub struct RefreshInvoicesResult {
    pub invoice_list: InvoiceList,
}

pub struct RefreshInvoicesHandler {
    store: Arc<dyn BillingRecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    locks: AccountLocks,
}

impl RefreshInvoicesHandler {
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
        cmd: RefreshInvoicesCommand,
    ) -> Result<RefreshInvoicesResult, BillingError> {
        let _guard = self.locks.acquire(&cmd.account_id).await;
        let mut record = load_record(self.store.as_ref(), &cmd.account_id).await?;

        let customer_id = record
            .customer_id()
            .ok_or(BillingError::NotACustomer)?
            .to_string();

        let invoice_list = self
            .gateway
            .list_invoices(&customer_id, INVOICE_PAGE_LIMIT)
            .await
            .map_err(|e| {
                tracing::error!(
                    account_id = %cmd.account_id,
                    customer_id = %customer_id,
                    error = %e,
                    "Failed to list invoices"
                );
                BillingError::from(e)
            })?;

        if invoice_list.is_empty() {
            return Err(BillingError::NoInvoiceHistory);
        }

        record.replace_invoices(invoice_list.clone());
        save(self.store.as_ref(), &record).await?;

        tracing::debug!(
            account_id = %cmd.account_id,
            count = invoice_list.len(),
            "Invoice history refreshed"
        );

        Ok(RefreshInvoicesResult { invoice_list })
    }
}
