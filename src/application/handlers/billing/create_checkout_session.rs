//! CreateCheckoutSessionHandler - Starts a hosted checkout for subscribing or
//! replacing the card on file.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::billing::{BillingError, CheckoutMode};
use crate::domain::foundation::{AccountId, TeamId};
use crate::ports::{
    BillingRecordStore, CheckoutSessionHandle, CreateCheckoutSessionRequest, LineItem,
    PaymentGateway,
};

use super::record_writes::load_or_provision;

/// Redirect targets handed to the processor and used after completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    /// Public URL of the web app.
    pub app_url: String,
    /// Public URL of this service.
    pub api_url: String,
}

impl CheckoutUrls {
    pub fn new(app_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Processor substitutes `{CHECKOUT_SESSION_ID}` on redirect.
    pub fn success_url(&self) -> String {
        format!(
            "{}/stripe/checkout-completed/{{CHECKOUT_SESSION_ID}}",
            self.api_url
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/billing?redirectMessage=Checkout%20canceled", self.app_url)
    }

    pub fn billing_page(&self) -> String {
        format!("{}/billing", self.app_url)
    }

    /// Billing page with a user-visible notice.
    pub fn billing_page_with_message(&self, message: &str) -> String {
        format!(
            "{}/billing?redirectMessage={}",
            self.app_url,
            urlencoding::encode(message)
        )
    }
}

/// Inputs for a checkout session, taken from the account's current state.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub account_id: AccountId,
    pub mode: CheckoutMode,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub email: Option<String>,
    pub team_id: Option<TeamId>,
}

/// Builds the processor request for a checkout session.
///
/// # Errors
///
/// `InvalidMode` for setup mode without both a customer and a subscription.
pub fn build_checkout_request(
    params: &CheckoutSessionParams,
    price_id: &str,
    urls: &CheckoutUrls,
) -> Result<CreateCheckoutSessionRequest, BillingError> {
    let mut metadata = BTreeMap::new();
    metadata.insert("account_id".to_string(), params.account_id.to_string());
    if let Some(team_id) = &params.team_id {
        metadata.insert("team_id".to_string(), team_id.as_str().to_string());
    }

    let mut line_items = Vec::new();
    let mut setup_intent_metadata = BTreeMap::new();

    match params.mode {
        CheckoutMode::Subscription => {
            line_items.push(LineItem {
                price_id: price_id.to_string(),
                quantity: 1,
            });
        }
        CheckoutMode::Setup => {
            let (Some(customer_id), Some(subscription_id)) =
                (&params.customer_id, &params.subscription_id)
            else {
                return Err(BillingError::invalid_mode(
                    "setup mode requires an existing customer and subscription",
                ));
            };
            setup_intent_metadata.insert("customer_id".to_string(), customer_id.clone());
            setup_intent_metadata.insert("subscription_id".to_string(), subscription_id.clone());
        }
    }

    Ok(CreateCheckoutSessionRequest {
        mode: params.mode,
        customer_id: params.customer_id.clone(),
        customer_email: if params.customer_id.is_some() {
            None
        } else {
            params.email.clone()
        },
        line_items,
        success_url: urls.success_url(),
        cancel_url: urls.cancel_url(),
        metadata,
        setup_intent_metadata,
    })
}

/// Command to start a checkout session.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionCommand {
    pub account_id: AccountId,
    /// Email used if the account has never been seen before.
    pub email: Option<String>,
    pub mode: CheckoutMode,
    pub team_id: Option<TeamId>,
}

/// Result of creating a checkout session.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionResult {
    pub session: CheckoutSessionHandle,
}

/// Handler for starting hosted checkout sessions.
///
/// Makes exactly one gateway call and does not change processor-mirrored
/// state; the record is only provisioned for first-seen accounts.
pub struct CreateCheckoutSessionHandler {
    store: Arc<dyn BillingRecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    urls: CheckoutUrls,
    price_id: String,
}

impl CreateCheckoutSessionHandler {
    pub fn new(
        store: Arc<dyn BillingRecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        urls: CheckoutUrls,
        price_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            urls,
            price_id: price_id.into(),
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutSessionCommand,
    ) -> Result<CreateCheckoutSessionResult, BillingError> {
        let record = load_or_provision(self.store.as_ref(), &cmd.account_id, cmd.email.clone())
            .await?;

        if cmd.mode == CheckoutMode::Subscription && record.is_subscription_active() {
            return Err(BillingError::AlreadySubscribed);
        }

        let params = CheckoutSessionParams {
            account_id: cmd.account_id.clone(),
            mode: cmd.mode,
            customer_id: record.customer_id().map(str::to_string),
            subscription_id: record.subscription_id().map(str::to_string),
            email: record.email().map(str::to_string).or(cmd.email),
            team_id: cmd.team_id,
        };
        let request = build_checkout_request(&params, &self.price_id, &self.urls)?;

        let session = self
            .gateway
            .create_checkout_session(request)
            .await
            .map_err(|e| {
                tracing::error!(
                    account_id = %cmd.account_id,
                    mode = %cmd.mode,
                    error = %e,
                    "Failed to create checkout session"
                );
                BillingError::from(e)
            })?;

        tracing::info!(
            account_id = %cmd.account_id,
            session_id = %session.id,
            mode = %cmd.mode,
            "Checkout session created"
        );

        Ok(CreateCheckoutSessionResult { session })
    }
}
