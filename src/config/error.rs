//! Startup configuration failures.

use thiserror::Error;

/// Failure to assemble `AppConfig` from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read billing configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("billing configuration rejected: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that the service refuses to start with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    #[error("server port must be non-zero")]
    InvalidPort,

    #[error("cannot bind to {0}")]
    InvalidSocketAddr(String),

    #[error("request timeout must be between 1 and 300 seconds")]
    InvalidTimeout,

    #[error("database URL must use the postgres:// or postgresql:// scheme")]
    InvalidDatabaseUrl,

    #[error("pool needs max_connections > 0 and min_connections <= max_connections")]
    InvalidPoolSize,

    #[error("pool max_connections is capped at 100")]
    PoolSizeTooLarge,

    #[error("Stripe API key must start with sk_")]
    InvalidStripeKey,

    #[error("Stripe webhook secret must start with whsec_")]
    InvalidStripeWebhookSecret,

    #[error("Stripe price id must start with price_")]
    InvalidStripePriceId,

    #[error("{0} must be an absolute http(s) URL")]
    InvalidUrl(&'static str),

    #[error("gateway timeout must be between 1 and 120 seconds")]
    InvalidGatewayTimeout,

    #[error("require_livemode needs an sk_live_ API key")]
    LivemodeRequiresLiveKey,
}
