//! HTTP API server with observability for the order fulfillment pipeline.
//!
//! Provides REST endpoints for shipping rates, checkout, payment webhooks
//! and seller order actions, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use fulfillment::{
    CheckoutService, PaymentReconciler, RateProvider, ShipmentTracker, ShippingDefaults,
    ShippingRateAggregator, SignatureVerifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{CatalogReader, OrderRepository};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Storage the API can run on.
pub trait AppStore: CatalogReader + OrderRepository + Clone + 'static {}

impl<T> AppStore for T where T: CatalogReader + OrderRepository + Clone + 'static {}

/// Shared application state accessible from all handlers.
pub struct AppState<S: AppStore> {
    pub store: S,
    pub checkout: CheckoutService<S>,
    pub rates: ShippingRateAggregator<S>,
    pub payments: PaymentReconciler<S>,
    pub tracker: ShipmentTracker<S>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: AppStore>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::health::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/shipping/rates", post(routes::shipping::rates::<S>))
        .route("/checkout", post(routes::checkout::place::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/history", get(routes::orders::history::<S>))
        .route("/orders/{id}/processing", post(routes::orders::processing::<S>))
        .route("/orders/{id}/tracking", put(routes::orders::tracking::<S>))
        .route("/orders/{id}/delivered", post(routes::orders::delivered::<S>))
        .route("/webhooks/payment", post(routes::webhooks::payment::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the fulfillment services around one store.
pub fn create_state<S: AppStore>(
    store: S,
    rate_provider: Arc<dyn RateProvider>,
    shipping_defaults: ShippingDefaults,
    verifier: SignatureVerifier,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        checkout: CheckoutService::new(store.clone()),
        rates: ShippingRateAggregator::new(store.clone(), rate_provider, shipping_defaults),
        payments: PaymentReconciler::new(store.clone(), verifier),
        tracker: ShipmentTracker::new(store.clone()),
        store,
    })
}
