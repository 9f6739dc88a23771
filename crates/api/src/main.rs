//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::config::{Config, LogFormat};
use domain::{Money, Product};
use fulfillment::{
    HttpRateProvider, InMemoryRateProvider, RateProvider, ShippingDefaults, SignatureVerifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use store::{InMemoryStore, PostgresStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn rate_provider(config: &Config) -> Arc<dyn RateProvider> {
    match &config.rate_provider_url {
        Some(url) => {
            tracing::info!(%url, "using HTTP rate provider");
            let provider = HttpRateProvider::new(
                url.as_str(),
                config.rate_provider_api_key.as_str(),
                Duration::from_secs(config.rate_provider_timeout_secs),
            )
            .expect("failed to build rate provider client");
            Arc::new(provider)
        }
        None => {
            tracing::warn!("RATE_PROVIDER_URL not set, serving canned shipping quotes");
            Arc::new(InMemoryRateProvider::sample())
        }
    }
}

/// Products for local runs without a database.
async fn seed_demo_catalog(store: &InMemoryStore) {
    let products = [
        Product::active("P1", "store-a", "Batik Shirt", Money::from_minor(15000), 5, 500),
        Product::active("P2", "store-a", "Rattan Bag", Money::from_minor(85000), 10, 800),
        Product::active("P3", "store-b", "Kopi Toraja 250g", Money::from_minor(60000), 20, 250),
    ];
    for product in products {
        store.upsert_product(product).await;
    }
    tracing::info!("seeded in-memory demo catalog");
}

async fn serve<S: api::AppStore>(store: S, config: &Config, metrics_handle: PrometheusHandle) {
    let shipping_defaults = ShippingDefaults {
        origin_postal_code: config.default_origin_postal_code.clone(),
        couriers: config.default_couriers.clone(),
    };
    let verifier = SignatureVerifier::new(config.payment_webhook_secret.clone());
    if !verifier.is_enabled() {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET not set, webhook signatures are not verified");
    }

    let state = api::create_state(store, rate_provider(config), shipping_defaults, verifier);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the store and serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = PostgresStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("connected to Postgres, migrations applied");
            serve(store, &config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            let store = InMemoryStore::new();
            seed_demo_catalog(&store).await;
            serve(store, &config, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
