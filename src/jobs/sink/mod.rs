//! Persistence backends for run logs and statistics.
//!
//! Both backends use the same layout below their root:
//! `<job-name>/<run-id>.log` and `<job-name>/<run-id>.stats.json`.

mod file;
mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::models::LogEntry;
use crate::jobs::statistics::JobStatistics;
use crate::jobs::types::{JobDefinition, LogMode};

pub use file::FileLogSink;
pub use remote::{RemoteLogSink, RemoteStoreOptions};

/// Destination for the log lines and final statistics of one job's runs.
#[async_trait]
pub trait LogSink: Send + Sync + std::fmt::Debug {
    /// Appends one line to the run's log. The line is durable once this returns.
    async fn append(&self, run_id: Uuid, entry: &LogEntry) -> JobResult<()>;

    async fn persist_statistics(&self, run_id: Uuid, statistics: &JobStatistics) -> JobResult<()>;

    /// Called once after the run reached its terminal outcome.
    async fn finish(&self, _run_id: Uuid) -> JobResult<()> {
        Ok(())
    }
}

/// Directory name used for a job's artifacts.
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_` so a job name can never
/// escape the sink root.
pub fn job_dir_name(job_name: &str) -> String {
    let name: String = job_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match name.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => name,
    }
}

pub fn log_file_name(run_id: Uuid) -> String {
    format!("{run_id}.log")
}

pub fn stats_file_name(run_id: Uuid) -> String {
    format!("{run_id}.stats.json")
}

/// Builds the sink bound to a job's log mode and folder.
#[derive(Debug, Clone)]
pub struct LogSinkFactory {
    root: PathBuf,
    compress: bool,
    remote: Option<RemoteStoreOptions>,
}

impl LogSinkFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compress: false,
            remote: None,
        }
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_remote(mut self, remote: RemoteStoreOptions) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn for_job(&self, definition: &JobDefinition) -> JobResult<Arc<dyn LogSink>> {
        match definition.log_mode {
            LogMode::FileSystem => {
                let root = definition.log_folder.as_ref().unwrap_or(&self.root);
                let dir = root.join(job_dir_name(&definition.name));
                Ok(Arc::new(FileLogSink::new(dir, self.compress)))
            }
            LogMode::RemoteStore => {
                let mut options = self.remote.clone().ok_or_else(|| {
                    JobError::sink(format!(
                        "job '{}' logs to the remote store but none is configured",
                        definition.name
                    ))
                })?;
                // A job-level folder selects the container.
                if let Some(folder) = &definition.log_folder {
                    options.container = folder.to_string_lossy().trim_matches('/').to_string();
                }
                Ok(Arc::new(RemoteLogSink::new(options, &definition.name)?))
            }
        }
    }
}
