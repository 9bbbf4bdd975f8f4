//! Health check endpoint handlers.

use std::collections::HashMap;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use jiff::Timestamp;

use crate::api::dto::{ComponentHealth, HealthResponse, HealthStatus};
use crate::state::AppState;

/// Creates health check routes.
///
/// # Routes
/// - `GET /health` - Scheduler status and version
/// - `GET /health/live` - Liveness probe
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
}

/// Reports `unhealthy` with 503 once the scheduler is shutting down.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let scheduler_check = check_scheduler(&state);
    let status = scheduler_check.status;

    let mut checks = HashMap::new();
    checks.insert("scheduler".to_string(), scheduler_check);

    let now = Timestamp::now();
    let response = HealthResponse {
        status,
        version: crate::pkg_version().to_string(),
        timestamp: now,
        uptime_seconds: now.duration_since(state.started_at).as_secs(),
        checks,
    };

    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    (code, Json(response))
}

pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

fn check_scheduler(state: &AppState) -> ComponentHealth {
    let scheduler = state.services.jobs.scheduler();

    if scheduler.is_shutting_down() {
        return ComponentHealth {
            status: HealthStatus::Unhealthy,
            message: Some("Scheduler is shutting down".to_string()),
        };
    }

    let jobs = scheduler.registry().len();
    let running = scheduler.running_jobs().len();
    ComponentHealth {
        status: HealthStatus::Healthy,
        message: Some(format!("{} jobs registered, {} running", jobs, running)),
    }
}
