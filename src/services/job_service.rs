//! Job service for admin operations on registered jobs.

use std::sync::Arc;

use jiff::Timestamp;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::jobs::{
    ActiveRun, ExecutionRun, JobScheduler, LogMode, RegisteredJob, RunOutcome, StartupMode,
};

/// Snapshot of a registered job as seen by the admin surface.
#[derive(Debug, Clone)]
pub struct JobOverview {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub schedule: Option<String>,
    pub startup: StartupMode,
    pub log_mode: LogMode,
    pub enabled: bool,
    pub next_fire: Option<Timestamp>,
    pub last_fired: Option<Timestamp>,
    pub last_outcome: Option<RunOutcome>,
    pub active_run: Option<ActiveRun>,
}

/// A manual run that was just dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggeredRun {
    pub job_id: Uuid,
    pub run_id: Uuid,
}

impl JobOverview {
    pub fn is_running(&self) -> bool {
        self.active_run.is_some()
    }
}

/// Job service for handling job-related admin operations.
#[derive(Clone)]
pub struct JobService {
    scheduler: Arc<JobScheduler>,
}

impl JobService {
    pub fn new(scheduler: Arc<JobScheduler>) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Arc<JobScheduler> {
        &self.scheduler
    }

    /// All registered jobs, ordered by name.
    pub fn list_jobs(&self) -> Vec<JobOverview> {
        self.scheduler
            .registry()
            .list()
            .iter()
            .map(|job| self.overview(job))
            .collect()
    }

    pub fn get_job(&self, id: Uuid) -> AppResult<JobOverview> {
        let job = self.scheduler.registry().get(id)?;
        Ok(self.overview(&job))
    }

    /// Runs of a job, newest first, with the total number kept.
    pub fn list_runs(
        &self,
        job_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> AppResult<(Vec<ExecutionRun>, usize)> {
        self.scheduler.registry().get(job_id)?;
        Ok(self
            .scheduler
            .runner()
            .history()
            .list(job_id, offset, limit))
    }

    pub fn get_run(&self, job_id: Uuid, run_id: Uuid) -> AppResult<ExecutionRun> {
        self.scheduler.registry().get(job_id)?;
        self.scheduler
            .runner()
            .history()
            .get(run_id)
            .filter(|run| run.job_id == job_id)
            .ok_or_else(|| AppError::run_not_found(run_id))
    }

    /// Starts a manual run. Fails with a conflict if the job is already running.
    pub fn trigger(&self, job_id: Uuid) -> AppResult<TriggeredRun> {
        let handle = self.scheduler.trigger(job_id)?;
        tracing::info!(job_id = %job_id, run_id = %handle.run_id, "Manual run triggered");

        Ok(TriggeredRun {
            job_id: handle.job_id,
            run_id: handle.run_id,
        })
    }

    /// Requests cancellation of the current run. Returns `false` when idle.
    pub fn cancel(&self, job_id: Uuid) -> AppResult<bool> {
        Ok(self.scheduler.cancel(job_id)?)
    }

    pub fn enable(&self, job_id: Uuid) -> AppResult<JobOverview> {
        self.set_enabled(job_id, true)
    }

    pub fn disable(&self, job_id: Uuid) -> AppResult<JobOverview> {
        self.set_enabled(job_id, false)
    }

    /// Upcoming fire times of a job's schedule in the registry's time zone.
    pub fn upcoming(&self, job_id: Uuid, count: usize) -> AppResult<Vec<Timestamp>> {
        let registry = self.scheduler.registry();
        let job = registry.get(job_id)?;
        match job.schedule() {
            Some(schedule) => Ok(schedule.upcoming(registry.now(), registry.timezone(), count)?),
            None => Ok(Vec::new()),
        }
    }

    fn set_enabled(&self, job_id: Uuid, enabled: bool) -> AppResult<JobOverview> {
        let job = self.scheduler.registry().set_enabled(job_id, enabled)?;
        Ok(self.overview(&job))
    }

    fn overview(&self, job: &RegisteredJob) -> JobOverview {
        let definition = job.definition();
        let fire = job.fire_state();
        let last_outcome = self
            .scheduler
            .runner()
            .history()
            .latest(job.id())
            .map(|run| run.outcome);

        JobOverview {
            id: job.id(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            schedule: job.schedule().map(|s| s.as_str().to_string()),
            startup: definition.startup,
            log_mode: definition.log_mode,
            enabled: job.is_enabled(),
            next_fire: fire.next_fire,
            last_fired: fire.last_fired,
            last_outcome,
            active_run: self.scheduler.active_run(job.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use jiff::tz::TimeZone;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use super::*;
    use crate::jobs::{
        JobContext, JobDefinition, JobRegistry, JobRunner, JobTask, LogSinkFactory, RunHistory,
        SchedulerConfig, TaskError, TaskResult,
    };

    #[derive(Debug, Default)]
    struct WaitForCancel {
        started: Notify,
    }

    #[async_trait]
    impl JobTask for WaitForCancel {
        async fn execute(&self, ctx: &JobContext) -> TaskResult {
            self.started.notify_one();
            ctx.cancelled().await;
            Err(TaskError::Cancelled)
        }
    }

    fn service(dir: &TempDir, task: Arc<dyn JobTask>) -> (JobService, Uuid) {
        let id = Uuid::new_v4();
        let mut registry = JobRegistry::new(TimeZone::UTC);
        registry
            .register(
                JobDefinition::new(id, "reindex").with_schedule("0 4 * * *"),
                task,
            )
            .unwrap();

        let runner = JobRunner::new(
            LogSinkFactory::new(dir.path()),
            Arc::new(RunHistory::new()),
        );
        let scheduler = JobScheduler::new(
            Arc::new(registry),
            Arc::new(runner),
            SchedulerConfig::default(),
        );
        (JobService::new(Arc::new(scheduler)), id)
    }

    #[tokio::test]
    async fn test_list_and_toggle() {
        let dir = TempDir::new().unwrap();
        let (service, id) = service(&dir, Arc::new(WaitForCancel::default()));

        let jobs = service.list_jobs();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].enabled);
        assert!(jobs[0].next_fire.is_some());
        assert!(!jobs[0].is_running());

        let disabled = service.disable(id).unwrap();
        assert!(!disabled.enabled);
        assert!(service.enable(id).unwrap().enabled);

        assert_eq!(service.upcoming(id, 3).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir, Arc::new(WaitForCancel::default()));

        let missing = Uuid::new_v4();
        assert!(matches!(service.get_job(missing), Err(AppError::NotFound { .. })));
        assert!(matches!(service.trigger(missing), Err(AppError::NotFound { .. })));
        assert!(matches!(
            service.list_runs(missing, 0, 10),
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_trigger_conflict_and_cancel() {
        let dir = TempDir::new().unwrap();
        let task = Arc::new(WaitForCancel::default());
        let (service, id) = service(&dir, task.clone());

        let active = service.trigger(id).unwrap();
        task.started.notified().await;
        assert!(service.get_job(id).unwrap().is_running());
        assert!(matches!(service.trigger(id), Err(AppError::Conflict { .. })));

        assert!(service.cancel(id).unwrap());

        tokio::time::timeout(Duration::from_secs(5), async {
            while service.get_job(id).unwrap().is_running() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let run = service.get_run(id, active.run_id).unwrap();
        assert_eq!(run.outcome, RunOutcome::Cancelled);
        let (runs, total) = service.list_runs(id, 0, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(runs[0].run_id, active.run_id);
        assert_eq!(
            service.get_job(id).unwrap().last_outcome,
            Some(RunOutcome::Cancelled)
        );
        assert!(!service.cancel(id).unwrap());
    }
}
