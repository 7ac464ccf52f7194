//! Liveness probe for deployments and load balancers

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct HealthState {
    pub db: DatabaseConnection,
    pub started_at: Arc<Instant>,
}

/// Service health response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: DependencyHealth,
}

/// Health of one backing dependency
#[derive(Debug, Serialize, ToSchema)]
pub struct DependencyHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

/// Round-trip a trivial query; anything else the service does needs the
/// database, so this is the one dependency the probe checks.
async fn ping_database(db: &DatabaseConnection) -> DependencyHealth {
    let started = Instant::now();
    let query = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());

    match db.execute(query).await {
        Ok(_) => DependencyHealth {
            status: "ok".to_string(),
            latency_ms: Some(started.elapsed().as_millis() as u64),
        },
        Err(_) => DependencyHealth {
            status: "error".to_string(),
            latency_ms: None,
        },
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is degraded", body = HealthResponse)
    )
)]
pub async fn health_check(
    State(state): State<HealthState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = ping_database(&state.db).await;
    let healthy = database.status == "ok";

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database,
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}
