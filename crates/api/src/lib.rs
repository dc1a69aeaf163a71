//! HTTP API server for travel bookings.
//!
//! Provides REST endpoints for holding, confirming and inspecting bookings
//! and for administering seat inventory, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use lifecycle::{BookingLifecycle, InMemoryPaymentService, LifecycleConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub lifecycle: Arc<BookingLifecycle<S, InMemoryPaymentService>>,
    pub payment: InMemoryPaymentService,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/users", post(routes::users::create::<S>))
        .route(
            "/travels",
            post(routes::travels::create::<S>).get(routes::travels::find_by_slug::<S>),
        )
        .route("/travels/{id}", get(routes::travels::get::<S>))
        .route(
            "/travels/{id}/seats/increase",
            post(routes::travels::increase_seats::<S>),
        )
        .route(
            "/travels/{id}/seats/decrease",
            post(routes::travels::decrease_seats::<S>),
        )
        .route(
            "/bookings",
            post(routes::bookings::create::<S>).get(routes::bookings::list::<S>),
        )
        .route("/bookings/{id}", get(routes::bookings::get::<S>))
        .route("/bookings/{id}/confirm", post(routes::bookings::confirm::<S>))
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

/// Creates the application state over `store` with an approving payment service.
pub fn create_state<S: Store>(store: S, config: LifecycleConfig) -> Arc<AppState<S>> {
    let payment = InMemoryPaymentService::new();
    let lifecycle = BookingLifecycle::new(store, payment.clone()).with_config(config);

    Arc::new(AppState {
        lifecycle: Arc::new(lifecycle),
        payment,
    })
}
