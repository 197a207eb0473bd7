//! Billing record database settings.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use super::error::ValidationError;

const APPLICATION_NAME: &str = "billing-coordinator";
const POOL_CEILING: u32 = 100;

/// Postgres connection and pool settings for `billing_accounts`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` URL
    pub url: String,

    #[serde(default = "DatabaseConfig::default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,

    /// How long a request waits for a pooled connection
    #[serde(default = "DatabaseConfig::default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    #[serde(default = "DatabaseConfig::default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "DatabaseConfig::default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,

    /// Apply `migrations/` before serving
    #[serde(default)]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    fn default_min_connections() -> u32 {
        2
    }

    fn default_max_connections() -> u32 {
        10
    }

    fn default_acquire_timeout_secs() -> u64 {
        5
    }

    fn default_idle_timeout_secs() -> u64 {
        600
    }

    fn default_max_lifetime_secs() -> u64 {
        1800
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout())
            .idle_timeout(self.idle_timeout())
            .max_lifetime(self.max_lifetime())
    }

    /// Opens the pool used by the billing record store.
    ///
    /// Connections identify themselves as `billing-coordinator` in
    /// `pg_stat_activity`.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        let options = PgConnectOptions::from_str(&self.url)?.application_name(APPLICATION_NAME);
        self.pool_options().connect_with(options).await
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("BILLING__DATABASE__URL"));
        }
        let scheme_ok = ["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme));
        if !scheme_ok {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.max_connections > POOL_CEILING {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            min_connections: Self::default_min_connections(),
            max_connections: Self::default_max_connections(),
            acquire_timeout_secs: Self::default_acquire_timeout_secs(),
            idle_timeout_secs: Self::default_idle_timeout_secs(),
            max_lifetime_secs: Self::default_max_lifetime_secs(),
            run_migrations: false,
        }
    }
}
