//! Router configuration for the admin API.

use std::time::Duration;

use axum::{Router, middleware};

use crate::api::handlers;
use crate::api::middleware::{
    global_error_handler, logging_middleware, request_id_middleware, timeout_middleware,
};
use crate::state::AppState;

/// Creates the admin router with all routes and middleware.
///
/// # Middleware Order
/// Layers run outermost first in reverse order of declaration:
/// 1. Request ID - generates/propagates request IDs
/// 2. Logging - logs requests with request IDs
/// 3. Error handler - turns plain error bodies into JSON with the request ID
/// 4. Timeout - bounds handler time
///
/// # Routes
/// - `/health` - Health checks
/// - `/api/jobs` - Job administration
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let api_routes = Router::new().nest("/jobs", handlers::jobs::job_routes());

    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(request_timeout, timeout_middleware))
        .layer(middleware::from_fn(global_error_handler))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
