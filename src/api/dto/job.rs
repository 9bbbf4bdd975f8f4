//! Job-related DTOs for API requests and responses.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::jobs::{
    ActiveRun, ExecutionRun, JobStatistics, LogEntry, LogMode, RunOutcome, StartupMode,
    TriggerKind,
};
use crate::services::{JobOverview, TriggeredRun};

// ============================================================================
// Request DTOs
// ============================================================================

/// Query parameters for upcoming fire times.
#[derive(Debug, Deserialize, Validate)]
pub struct UpcomingParams {
    #[serde(default = "default_upcoming_count")]
    #[validate(range(min = 1, max = 100, message = "Count must be between 1 and 100"))]
    pub count: usize,
}

fn default_upcoming_count() -> usize {
    5
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub schedule: Option<String>,
    pub startup: StartupMode,
    pub log_mode: LogMode,
    pub enabled: bool,
    pub running: bool,
    pub next_fire: Option<Timestamp>,
    pub last_fired: Option<Timestamp>,
    pub last_outcome: Option<RunOutcome>,
    pub current_run_id: Option<Uuid>,
}

impl From<JobOverview> for JobResponse {
    fn from(job: JobOverview) -> Self {
        Self {
            running: job.is_running(),
            current_run_id: job.active_run.as_ref().map(|run: &ActiveRun| run.run_id),
            id: job.id,
            name: job.name,
            description: job.description,
            schedule: job.schedule,
            startup: job.startup,
            log_mode: job.log_mode,
            enabled: job.enabled,
            next_fire: job.next_fire,
            last_fired: job.last_fired,
            last_outcome: job.last_outcome,
        }
    }
}

/// A run without its log lines, for history listings.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummaryResponse {
    pub run_id: Uuid,
    pub job_id: Uuid,
    pub job_name: String,
    pub trigger: TriggerKind,
    pub outcome: RunOutcome,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub duration_ms: Option<i64>,
    pub statistics: JobStatistics,
    pub error_message: Option<String>,
}

impl From<ExecutionRun> for RunSummaryResponse {
    fn from(run: ExecutionRun) -> Self {
        Self {
            run_id: run.run_id,
            job_id: run.job_id,
            job_name: run.job_name,
            trigger: run.trigger,
            outcome: run.outcome,
            started_at: run.started_at,
            ended_at: run.ended_at,
            duration_ms: run.duration_ms,
            statistics: run.statistics,
            error_message: run.error_message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    #[serde(flatten)]
    pub summary: RunSummaryResponse,
    pub log: Vec<LogEntry>,
}

impl From<ExecutionRun> for RunResponse {
    fn from(mut run: ExecutionRun) -> Self {
        let log = std::mem::take(&mut run.log);
        Self {
            summary: RunSummaryResponse::from(run),
            log,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub job_id: Uuid,
    pub run_id: Uuid,
}

impl From<TriggeredRun> for TriggerResponse {
    fn from(run: TriggeredRun) -> Self {
        Self {
            job_id: run.job_id,
            run_id: run.run_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub job_id: Uuid,
    /// `false` when the job had no run in flight
    pub cancelled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpcomingResponse {
    pub job_id: Uuid,
    pub timezone: String,
    pub fire_times: Vec<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobDefinition, LogLevel};

    #[test]
    fn test_run_response_moves_log_out() {
        let def = JobDefinition::new(Uuid::new_v4(), "export");
        let mut run = ExecutionRun::start(&def, Uuid::new_v4(), TriggerKind::Manual);
        run.log.push(LogEntry::new(LogLevel::Info, "exported 3 rows"));
        run.complete(RunOutcome::Succeeded, JobStatistics::new(), None)
            .unwrap();

        let response = RunResponse::from(run);
        assert_eq!(response.log.len(), 1);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["outcome"], "succeeded");
        assert_eq!(json["trigger"], "manual");
        assert_eq!(json["job_name"], "export");
        assert_eq!(json["statistics"]["NumSucceeded"], 0);
        assert_eq!(json["log"][0]["message"], "exported 3 rows");
    }

    #[test]
    fn test_upcoming_count_bounds() {
        assert!(UpcomingParams { count: 0 }.validate().is_err());
        assert!(UpcomingParams { count: 5 }.validate().is_ok());
        assert!(UpcomingParams { count: 101 }.validate().is_err());
    }
}
