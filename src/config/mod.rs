//! Service configuration.
//!
//! Loaded from the environment with `config` and `dotenvy`; see
//! [`AppConfig::load`] for the variable naming.
//!
//! # Example
//!
//! ```no_run
//! use billing_coordinator::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Everything the billing coordinator reads at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Stripe credentials, price and redirect targets.
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Reads `.env` when present, then `BILLING__<SECTION>__<KEY>` variables.
    ///
    /// `BILLING__PAYMENT__STRIPE_PRICE_ID=price_123` lands in
    /// `payment.stripe_price_id`. Values are parsed into numbers and booleans
    /// where the target field expects them.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let source = config::Environment::default()
            .prefix("BILLING")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true);

        Ok(config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?)
    }

    /// Fails on the first section with an unusable value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
