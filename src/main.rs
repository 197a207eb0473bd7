//! Billing Coordinator server entry point.

use std::sync::Arc;

use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use billing_coordinator::adapters::http::billing::{billing_router, BillingAppState};
use billing_coordinator::adapters::postgres::PostgresBillingRecordStore;
use billing_coordinator::adapters::stripe::{StripeConfig, StripePaymentGateway};
use billing_coordinator::application::handlers::billing::{AccountLocks, CheckoutUrls};
use billing_coordinator::config::{AppConfig, ServerConfig};
use billing_coordinator::domain::billing::StripeWebhookVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let pool = config.database.connect().await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let gateway = StripePaymentGateway::new(
        StripeConfig::new(config.payment.stripe_api_key.clone())
            .with_base_url(config.payment.stripe_api_base_url.clone())
            .with_timeout(config.payment.gateway_timeout()),
    )?;
    let verifier = StripeWebhookVerifier::new(config.payment.stripe_webhook_secret.clone())
        .with_require_livemode(config.payment.require_livemode);

    let state = BillingAppState {
        store: Arc::new(PostgresBillingRecordStore::new(pool)),
        gateway: Arc::new(gateway),
        verifier: Arc::new(verifier),
        locks: AccountLocks::new(),
        urls: CheckoutUrls::new(
            config.payment.app_url.clone(),
            config.payment.api_url.clone(),
        ),
        price_id: config.payment.stripe_price_id.clone(),
    };

    let app: Router = billing_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "Billing coordinator listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// JSON logs in production, human-readable output elsewhere. `RUST_LOG` wins
/// over the configured filter.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if server.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
