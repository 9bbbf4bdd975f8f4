use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the scheduling engine to its callers.
///
/// Failures inside a job body never surface here; the runner converts them
/// into a `Failed` outcome on the execution run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    #[error("Job already registered: {0}")]
    DuplicateJobId(Uuid),

    #[error("Job name already registered: {0}")]
    DuplicateJobName(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Job is already running: {0}")]
    AlreadyRunning(Uuid),

    #[error("Run {0} already has a terminal outcome")]
    AlreadyCompleted(Uuid),

    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Invalid payload for job type {job_type}: {reason}")]
    InvalidPayload { job_type: String, reason: String },

    #[error("Log sink error: {0}")]
    Sink(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl JobError {
    pub fn invalid_schedule(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink(message.into())
    }
}

pub type JobResult<T> = Result<T, JobError>;

/// Error returned by a job body.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The body observed a cancellation request and stopped early.
    #[error("Job run was cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

pub type TaskResult = Result<(), TaskError>;
