use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::jobs::JobError;

/// A single field that failed request validation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationFieldError {
    pub field: String,
    pub message: String,
}

/// Application-wide error type that represents all possible errors in the system.
///
/// Engine and configuration errors convert into it, and the admin API turns it
/// into an HTTP response.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// The request conflicts with the current state, e.g. a run already in flight
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Validation failed")]
    ValidationErrors { errors: Vec<ValidationFieldError> },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn job_not_found(value: impl Into<String>) -> Self {
        AppError::NotFound {
            entity: "job".to_string(),
            field: "id".to_string(),
            value: value.into(),
        }
    }

    pub fn run_not_found(run_id: Uuid) -> Self {
        AppError::NotFound {
            entity: "run".to_string(),
            field: "run_id".to_string(),
            value: run_id.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<JobError> for AppError {
    fn from(error: JobError) -> Self {
        let message = error.to_string();
        match error {
            JobError::UnknownJob(value) => AppError::job_not_found(value),
            JobError::AlreadyRunning(_)
            | JobError::AlreadyCompleted(_)
            | JobError::DuplicateJobId(_)
            | JobError::DuplicateJobName(_) => AppError::Conflict { message },
            JobError::InvalidSchedule { .. } => AppError::Validation {
                field: "schedule".to_string(),
                reason: message,
            },
            JobError::UnknownJobType(_) | JobError::InvalidPayload { .. } => {
                AppError::BadRequest { message }
            }
            JobError::Scheduler(reason) => AppError::ServiceUnavailable { message: reason },
            other => AppError::Internal {
                source: anyhow::Error::new(other),
            },
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = match &error {
            ConfigError::ValidationError { field, .. } => field.clone(),
            ConfigError::FileNotFound(_) => "file".to_string(),
            _ => "settings".to_string(),
        };
        AppError::Configuration {
            key,
            source: anyhow::Error::new(error),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<ValidationFieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationFieldError {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::ValidationErrors { errors: fields }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
