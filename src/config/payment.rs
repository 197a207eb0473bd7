//! Payment configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment configuration (Stripe and redirect targets)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Price of the subscription plan
    pub stripe_price_id: String,

    /// Public URL of the web app (redirect target)
    pub app_url: String,

    /// Public URL of this service (checkout success target)
    pub api_url: String,

    /// Stripe API base URL
    #[serde(default = "default_api_base_url")]
    pub stripe_api_base_url: String,

    /// Timeout for each Stripe call in seconds
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Reject test mode webhook events
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired(
                "BILLING__PAYMENT__STRIPE_API_KEY",
            ));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired(
                "BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET",
            ));
        }
        if self.stripe_price_id.is_empty() {
            return Err(ValidationError::MissingRequired(
                "BILLING__PAYMENT__STRIPE_PRICE_ID",
            ));
        }

        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !self.stripe_price_id.starts_with("price_") {
            return Err(ValidationError::InvalidStripePriceId);
        }

        if !is_http_url(&self.app_url) {
            return Err(ValidationError::InvalidUrl("APP_URL"));
        }
        if !is_http_url(&self.api_url) {
            return Err(ValidationError::InvalidUrl("API_URL"));
        }
        if !is_http_url(&self.stripe_api_base_url) {
            return Err(ValidationError::InvalidUrl("STRIPE_API_BASE_URL"));
        }

        if !(1..=120).contains(&self.gateway_timeout_secs) {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if self.require_livemode && !self.is_live_mode() {
            return Err(ValidationError::LivemodeRequiresLiveKey);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            stripe_price_id: String::new(),
            app_url: String::new(),
            api_url: String::new(),
            stripe_api_base_url: default_api_base_url(),
            gateway_timeout_secs: default_gateway_timeout(),
            require_livemode: false,
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_gateway_timeout() -> u64 {
    30
}
