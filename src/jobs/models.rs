use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::statistics::JobStatistics;
use crate::jobs::types::{JobDefinition, RunOutcome, TriggerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a run's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Timestamp::now(),
            level,
            message: message.into(),
        }
    }

    /// Renders the entry as a single log file line (without the newline).
    pub fn to_line(&self) -> String {
        format!("{} [{}] {}", self.timestamp, self.level, self.message)
    }
}

/// Record of a single execution of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRun {
    pub run_id: Uuid,
    pub job_id: Uuid,
    pub job_name: String,
    pub trigger: TriggerKind,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub duration_ms: Option<i64>,
    pub outcome: RunOutcome,
    pub statistics: JobStatistics,
    pub log: Vec<LogEntry>,
    pub error_message: Option<String>,
}

impl ExecutionRun {
    pub fn start(definition: &JobDefinition, run_id: Uuid, trigger: TriggerKind) -> Self {
        Self {
            run_id,
            job_id: definition.id,
            job_name: definition.name.clone(),
            trigger,
            started_at: Timestamp::now(),
            ended_at: None,
            duration_ms: None,
            outcome: RunOutcome::Running,
            statistics: JobStatistics::new(),
            log: Vec::new(),
            error_message: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.outcome == RunOutcome::Running
    }

    /// Moves the run to a terminal outcome. A run completes at most once.
    pub fn complete(
        &mut self,
        outcome: RunOutcome,
        statistics: JobStatistics,
        error_message: Option<String>,
    ) -> JobResult<()> {
        if self.outcome.is_terminal() {
            return Err(JobError::AlreadyCompleted(self.run_id));
        }
        if !outcome.is_terminal() {
            return Err(JobError::Scheduler(format!(
                "run {} cannot complete as {}",
                self.run_id, outcome
            )));
        }

        let ended_at = Timestamp::now();
        self.duration_ms = Some(ended_at.duration_since(self.started_at).as_millis() as i64);
        self.ended_at = Some(ended_at);
        self.outcome = outcome;
        self.statistics = statistics;
        self.error_message = error_message;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> ExecutionRun {
        let def = JobDefinition::new(Uuid::new_v4(), "report");
        ExecutionRun::start(&def, Uuid::new_v4(), TriggerKind::Manual)
    }

    #[test]
    fn test_new_run_is_running() {
        let run = run();
        assert!(run.is_running());
        assert!(run.ended_at.is_none());
        assert_eq!(run.job_name, "report");
        assert_eq!(run.statistics.num_succeeded(), 0);
    }

    #[test]
    fn test_complete_sets_terminal_state() {
        let mut run = run();
        let mut stats = JobStatistics::new();
        stats.record_success();

        run.complete(RunOutcome::Succeeded, stats, None).unwrap();

        assert_eq!(run.outcome, RunOutcome::Succeeded);
        assert!(run.ended_at.is_some());
        assert!(run.duration_ms.unwrap() >= 0);
        assert_eq!(run.statistics.num_succeeded(), 1);
    }

    #[test]
    fn test_second_completion_is_rejected() {
        let mut run = run();
        run.complete(RunOutcome::Failed, JobStatistics::new(), Some("boom".into()))
            .unwrap();

        let err = run
            .complete(RunOutcome::Succeeded, JobStatistics::new(), None)
            .unwrap_err();

        assert!(matches!(err, JobError::AlreadyCompleted(id) if id == run.run_id));
        assert_eq!(run.outcome, RunOutcome::Failed);
        assert_eq!(run.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_cannot_complete_as_running() {
        let mut run = run();
        assert!(
            run.complete(RunOutcome::Running, JobStatistics::new(), None)
                .is_err()
        );
        assert!(run.is_running());
    }

    #[test]
    fn test_log_line_format() {
        let entry = LogEntry {
            timestamp: "2024-03-01T02:00:00Z".parse().unwrap(),
            level: LogLevel::Warn,
            message: "disk almost full".to_string(),
        };
        assert_eq!(entry.to_line(), "2024-03-01T02:00:00Z [WARN] disk almost full");
    }
}
