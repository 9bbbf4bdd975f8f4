use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::context::JobContext;
use crate::jobs::error::TaskResult;
use crate::jobs::models::LogEntry;

/// Whether the scheduler fires a job from its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupMode {
    #[default]
    Automatic,
    Manual,
}

/// Where a job's run logs and statistics are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    #[default]
    FileSystem,
    RemoteStore,
}

/// Static description of a scheduled job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Cron expression; `None` means the job only runs on manual trigger.
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub startup: StartupMode,
    #[serde(default)]
    pub log_mode: LogMode,
    /// Overrides the sink's root folder for this job.
    #[serde(default)]
    pub log_folder: Option<PathBuf>,
}

impl JobDefinition {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            schedule: None,
            startup: StartupMode::Automatic,
            log_mode: LogMode::FileSystem,
            log_folder: None,
        }
    }

    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    pub fn with_startup(mut self, startup: StartupMode) -> Self {
        self.startup = startup;
        self
    }

    pub fn manual(self) -> Self {
        self.with_startup(StartupMode::Manual)
    }

    pub fn with_log_mode(mut self, log_mode: LogMode) -> Self {
        self.log_mode = log_mode;
        self
    }

    pub fn with_log_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.log_folder = Some(folder.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Execution run outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunOutcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunOutcome::Running)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Running => write!(f, "running"),
            RunOutcome::Succeeded => write!(f, "succeeded"),
            RunOutcome::Failed => write!(f, "failed"),
            RunOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Scheduled,
    Manual,
}

/// Trait that all job bodies must implement
///
/// The lifecycle callbacks default to no-ops. The runner invokes exactly one
/// of `on_success` / `on_fail` per run (none for a cancelled run), and
/// `on_log` for every line the body logs through its context.
#[async_trait]
pub trait JobTask: Send + Sync + std::fmt::Debug {
    /// Identifier used by the job catalog to build this task from configuration.
    fn task_type() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Execute the job body
    async fn execute(&self, ctx: &JobContext) -> TaskResult;

    async fn on_success(&self, _ctx: &JobContext) {}

    async fn on_fail(&self, _ctx: &JobContext, _error: &anyhow::Error) {}

    fn on_log(&self, _entry: &LogEntry) {}

    /// Optional description
    fn description(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_builder() {
        let id = Uuid::new_v4();
        let def = JobDefinition::new(id, "nightly-report")
            .with_schedule("0 2 * * *")
            .with_log_mode(LogMode::RemoteStore)
            .with_log_folder("/var/log/jobs")
            .with_description("Builds the nightly report");

        assert_eq!(def.id, id);
        assert_eq!(def.schedule.as_deref(), Some("0 2 * * *"));
        assert_eq!(def.startup, StartupMode::Automatic);
        assert_eq!(def.log_mode, LogMode::RemoteStore);
        assert_eq!(def.log_folder, Some(PathBuf::from("/var/log/jobs")));

        let manual = JobDefinition::new(Uuid::new_v4(), "adhoc").manual();
        assert_eq!(manual.startup, StartupMode::Manual);
        assert!(manual.schedule.is_none());
    }

    #[test]
    fn test_enum_serde_names() {
        assert_eq!(
            serde_json::to_string(&LogMode::FileSystem).unwrap(),
            "\"file_system\""
        );
        assert_eq!(
            serde_json::to_string(&LogMode::RemoteStore).unwrap(),
            "\"remote_store\""
        );
        assert_eq!(
            serde_json::from_str::<StartupMode>("\"manual\"").unwrap(),
            StartupMode::Manual
        );
        assert_eq!(RunOutcome::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_terminal_outcomes() {
        assert!(!RunOutcome::Running.is_terminal());
        assert!(RunOutcome::Succeeded.is_terminal());
        assert!(RunOutcome::Failed.is_terminal());
        assert!(RunOutcome::Cancelled.is_terminal());
    }
}
