//! Prometheus scrape endpoint
//!
//! `GET /metrics` renders the global recorder installed at startup.
//! Unauthenticated, like the health probe; both are meant for the
//! deployment's own monitoring, not for API clients.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

pub async fn prometheus_metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
