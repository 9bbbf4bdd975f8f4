//! Data Transfer Objects for API requests and responses.
//!
//! DTOs are organized by domain:
//! - `job` - Job and run request/response DTOs
//! - `health` - Health check DTOs
//! - `error` - Common error response DTOs
//! - `pagination` - Pagination-related DTOs

mod error;
mod health;
mod job;
mod pagination;

pub use error::ErrorResponse;
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use job::{
    CancelResponse, JobResponse, RunResponse, RunSummaryResponse, TriggerResponse,
    UpcomingParams, UpcomingResponse,
};
pub use pagination::{PagedResponse, PaginationMeta, PaginationParams};
