//! Application state for the axum admin API.

use std::sync::Arc;

use jiff::Timestamp;

use crate::jobs::JobScheduler;
use crate::services::Services;

/// Shared state handed to every request handler.
///
/// Cloning is cheap since the services share the scheduler through an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub started_at: Timestamp,
}

impl AppState {
    pub fn new(scheduler: Arc<JobScheduler>) -> Self {
        Self {
            services: Services::new(scheduler),
            started_at: Timestamp::now(),
        }
    }
}
