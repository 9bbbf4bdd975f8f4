//! Service layer between the admin API and the scheduling engine.

mod job_service;

pub use job_service::{JobOverview, JobService, TriggeredRun};

use std::sync::Arc;

use crate::jobs::JobScheduler;

/// Aggregates all services for convenient access.
///
/// Cloning is cheap since the scheduler is shared behind an `Arc`.
#[derive(Clone)]
pub struct Services {
    pub jobs: JobService,
}

impl Services {
    pub fn new(scheduler: Arc<JobScheduler>) -> Self {
        Self {
            jobs: JobService::new(scheduler),
        }
    }
}
