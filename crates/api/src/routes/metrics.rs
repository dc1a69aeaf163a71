//! Prometheus metrics endpoint and metric descriptions.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for the booking metrics.
///
/// Call once after the recorder is installed.
pub fn describe() {
    metrics::describe_counter!("bookings_created_total", "Pending bookings created");
    metrics::describe_counter!(
        "bookings_rejected_total",
        "Booking attempts rejected, by error code"
    );
    metrics::describe_counter!("bookings_confirmed_total", "Bookings confirmed after payment");
    metrics::describe_counter!(
        "bookings_expired_total",
        "Pending bookings expired by the sweep"
    );
    metrics::describe_counter!(
        "seat_adjustments_total",
        "Applied seat counter adjustments, by direction"
    );
    metrics::describe_counter!(
        "seat_adjustments_rejected_total",
        "Seat adjustments refused for crossing a bound"
    );
    metrics::describe_counter!(
        "expiry_sweep_failures_total",
        "Bookings or whole sweeps that failed to expire"
    );
    metrics::describe_histogram!(
        "expiry_sweep_duration_seconds",
        Unit::Seconds,
        "Duration of one expiry sweep"
    );
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
