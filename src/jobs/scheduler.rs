use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use jiff::Timestamp;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::models::ExecutionRun;
use crate::jobs::registry::{JobRegistry, RegisteredJob};
use crate::jobs::runner::JobRunner;
use crate::jobs::types::TriggerKind;

/// Configuration for the scheduler loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the registry is checked for due jobs.
    pub tick_interval: Duration,
    /// How long shutdown waits for in-flight runs.
    pub shutdown_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

/// A run currently in flight.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRun {
    pub job_id: Uuid,
    pub run_id: Uuid,
    pub started_at: Timestamp,
    pub trigger: TriggerKind,
    #[serde(skip)]
    cancellation: CancellationToken,
}

type ActiveRuns = Arc<DashMap<Uuid, ActiveRun>>;

/// Marks a job Running for as long as it lives.
struct RunGuard {
    active: ActiveRuns,
    job_id: Uuid,
}

impl RunGuard {
    fn acquire(active: &ActiveRuns, run: ActiveRun) -> JobResult<Self> {
        let job_id = run.job_id;
        match active.entry(job_id) {
            Entry::Occupied(_) => Err(JobError::AlreadyRunning(job_id)),
            Entry::Vacant(slot) => {
                slot.insert(run);
                Ok(Self {
                    active: Arc::clone(active),
                    job_id,
                })
            }
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.remove(&self.job_id);
    }
}

/// Handle to a dispatched run.
#[derive(Debug)]
pub struct RunHandle {
    pub run_id: Uuid,
    pub job_id: Uuid,
    handle: JoinHandle<ExecutionRun>,
}

impl RunHandle {
    /// Waits for the run to reach its terminal outcome.
    pub async fn wait(self) -> JobResult<ExecutionRun> {
        self.handle
            .await
            .map_err(|e| JobError::Scheduler(format!("run {} did not complete: {}", self.run_id, e)))
    }
}

/// Drives registered jobs from their schedules and manual triggers.
///
/// At most one run per job id is in flight. Each run executes on its own
/// tokio task; the tick loop never waits for a run.
#[derive(Debug)]
pub struct JobScheduler {
    registry: Arc<JobRegistry>,
    runner: Arc<JobRunner>,
    active: ActiveRuns,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    config: SchedulerConfig,
}

impl JobScheduler {
    pub fn new(registry: Arc<JobRegistry>, runner: Arc<JobRunner>, config: SchedulerConfig) -> Self {
        Self {
            registry,
            runner,
            active: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Spawns the tick loop. It stops when [`JobScheduler::shutdown`] is called.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.run_loop().await })
    }

    async fn run_loop(&self) {
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            jobs = self.registry.len(),
            tick_ms = self.config.tick_interval.as_millis() as u64,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let now = self.registry.now();
                    self.tick(now);
                }
            }
        }

        tracing::info!("Scheduler loop stopped");
    }

    /// Dispatches every job due at `now`.
    ///
    /// A due job whose previous run is still in flight loses this fire.
    pub fn tick(&self, now: Timestamp) -> Vec<RunHandle> {
        let mut dispatched = Vec::new();

        for job in self.registry.list_due(now) {
            match self.registry.claim_fire(job.id(), now) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::error!(job = %job.name(), error = %e, "Failed to claim fire");
                    continue;
                }
            }

            if self.is_running(job.id()) {
                tracing::warn!(job = %job.name(), job_id = %job.id(), "Job still running; skipping this fire");
                continue;
            }

            match self.dispatch(job.clone(), TriggerKind::Scheduled) {
                Ok(handle) => dispatched.push(handle),
                Err(JobError::AlreadyRunning(_)) => {
                    tracing::warn!(job = %job.name(), job_id = %job.id(), "Job still running; skipping this fire");
                }
                Err(e) => {
                    tracing::error!(job = %job.name(), error = %e, "Failed to dispatch job");
                }
            }
        }

        dispatched
    }

    /// Starts a run of the job now, regardless of its schedule.
    pub fn trigger(&self, job_id: Uuid) -> JobResult<RunHandle> {
        let job = self.registry.get(job_id)?;
        self.dispatch(job, TriggerKind::Manual)
    }

    /// Requests cancellation of the job's current run.
    ///
    /// Returns `false` if the job was idle.
    pub fn cancel(&self, job_id: Uuid) -> JobResult<bool> {
        let job = self.registry.get(job_id)?;
        match self.active.get(&job_id) {
            Some(run) => {
                tracing::info!(job = %job.name(), run_id = %run.run_id, "Cancellation requested");
                run.cancellation.cancel();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_running(&self, job_id: Uuid) -> bool {
        self.active.contains_key(&job_id)
    }

    pub fn active_run(&self, job_id: Uuid) -> Option<ActiveRun> {
        self.active.get(&job_id).map(|run| run.value().clone())
    }

    pub fn running_jobs(&self) -> Vec<ActiveRun> {
        let mut runs: Vec<ActiveRun> = self.active.iter().map(|run| run.value().clone()).collect();
        runs.sort_by_key(|run| run.started_at);
        runs
    }

    fn dispatch(&self, job: Arc<RegisteredJob>, trigger: TriggerKind) -> JobResult<RunHandle> {
        if self.is_shutting_down() {
            return Err(JobError::Scheduler("scheduler is shutting down".to_string()));
        }

        let run_id = Uuid::new_v4();
        let cancellation = self.shutdown.child_token();
        let guard = RunGuard::acquire(
            &self.active,
            ActiveRun {
                job_id: job.id(),
                run_id,
                started_at: Timestamp::now(),
                trigger,
                cancellation: cancellation.clone(),
            },
        )?;

        let runner = Arc::clone(&self.runner);
        let job_id = job.id();
        let handle = self.tracker.spawn(async move {
            let _guard = guard;
            runner.run_with(&job, run_id, trigger, cancellation).await
        });

        Ok(RunHandle {
            run_id,
            job_id,
            handle,
        })
    }

    /// Stops the tick loop, cancels in-flight runs and waits up to `grace`
    /// for them to finish. Returns `true` if every run finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.shutdown.cancel();
        self.tracker.close();

        let in_flight = self.active.len();
        if in_flight > 0 {
            tracing::info!(in_flight, grace_secs = grace.as_secs(), "Waiting for running jobs");
        }

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                tracing::info!("Scheduler shut down");
                true
            }
            Err(_) => {
                tracing::warn!(
                    still_running = self.active.len(),
                    "Shutdown grace period elapsed with runs still in flight"
                );
                false
            }
        }
    }
}
