use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use jiff::Timestamp;
use jiff::tz::TimeZone;
use uuid::Uuid;

use crate::jobs::cron::CronExpression;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::types::{JobDefinition, JobTask, StartupMode};

/// Source of the current instant.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FireState {
    pub last_fired: Option<Timestamp>,
    pub next_fire: Option<Timestamp>,
}

/// A job definition together with its task and mutable fire state.
#[derive(Debug)]
pub struct RegisteredJob {
    definition: JobDefinition,
    schedule: Option<CronExpression>,
    task: Arc<dyn JobTask>,
    enabled: AtomicBool,
    fire: Mutex<FireState>,
}

impl RegisteredJob {
    pub fn id(&self) -> Uuid {
        self.definition.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &JobDefinition {
        &self.definition
    }

    pub fn schedule(&self) -> Option<&CronExpression> {
        self.schedule.as_ref()
    }

    pub fn task(&self) -> Arc<dyn JobTask> {
        Arc::clone(&self.task)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_automatic(&self) -> bool {
        self.definition.startup == StartupMode::Automatic
    }

    pub fn fire_state(&self) -> FireState {
        *self.lock_fire()
    }

    fn lock_fire(&self) -> std::sync::MutexGuard<'_, FireState> {
        self.fire.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_due(&self, state: &FireState, now: Timestamp) -> bool {
        self.is_enabled()
            && self.is_automatic()
            && state.next_fire.is_some_and(|next| next <= now)
    }

    fn next_after(&self, after: Timestamp, tz: &TimeZone) -> Option<Timestamp> {
        if !self.is_automatic() {
            return None;
        }
        let schedule = self.schedule.as_ref()?;
        match schedule.next_fire_time(after, tz) {
            Ok(next) => Some(next),
            Err(e) => {
                tracing::warn!(job = %self.definition.name, error = %e, "Schedule has no further fire time");
                None
            }
        }
    }
}

/// Known jobs, keyed by id.
///
/// Registration happens once at startup; afterwards only the enabled flag
/// and fire state of individual jobs change.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: HashMap<Uuid, Arc<RegisteredJob>>,
    timezone: TimeZone,
    clock: Arc<dyn Clock>,
}

impl JobRegistry {
    pub fn new(timezone: TimeZone) -> Self {
        Self::with_clock(timezone, Arc::new(SystemClock))
    }

    pub fn with_clock(timezone: TimeZone, clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: HashMap::new(),
            timezone,
            clock,
        }
    }

    pub fn timezone(&self) -> &TimeZone {
        &self.timezone
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn register(
        &mut self,
        definition: JobDefinition,
        task: Arc<dyn JobTask>,
    ) -> JobResult<Arc<RegisteredJob>> {
        if self.jobs.contains_key(&definition.id) {
            return Err(JobError::DuplicateJobId(definition.id));
        }
        if self.jobs.values().any(|job| job.name() == definition.name) {
            return Err(JobError::DuplicateJobName(definition.name));
        }

        let schedule = definition
            .schedule
            .as_deref()
            .map(CronExpression::parse)
            .transpose()?;

        let next_fire = match (&schedule, definition.startup) {
            (None, StartupMode::Automatic) => {
                return Err(JobError::invalid_schedule(
                    "",
                    format!("automatic job '{}' has no schedule", definition.name),
                ));
            }
            (Some(cron), StartupMode::Automatic) => {
                Some(cron.next_fire_time(self.clock.now(), &self.timezone)?)
            }
            (_, StartupMode::Manual) => None,
        };

        tracing::debug!(
            job = %definition.name,
            job_id = %definition.id,
            next_fire = ?next_fire,
            "Registered job"
        );

        let job = Arc::new(RegisteredJob {
            definition,
            schedule,
            task,
            enabled: AtomicBool::new(true),
            fire: Mutex::new(FireState {
                last_fired: None,
                next_fire,
            }),
        });
        self.jobs.insert(job.id(), Arc::clone(&job));
        Ok(job)
    }

    pub fn get(&self, id: Uuid) -> JobResult<Arc<RegisteredJob>> {
        self.jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| JobError::UnknownJob(id.to_string()))
    }

    /// Resolves a job by id or by exact name.
    pub fn find(&self, name_or_id: &str) -> JobResult<Arc<RegisteredJob>> {
        if let Ok(id) = Uuid::parse_str(name_or_id) {
            if let Some(job) = self.jobs.get(&id) {
                return Ok(Arc::clone(job));
            }
        }
        self.jobs
            .values()
            .find(|job| job.name() == name_or_id)
            .cloned()
            .ok_or_else(|| JobError::UnknownJob(name_or_id.to_string()))
    }

    /// All jobs ordered by name.
    pub fn list(&self) -> Vec<Arc<RegisteredJob>> {
        let mut jobs: Vec<_> = self.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.name().cmp(b.name()));
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Enabled automatic jobs whose next fire time is at or before `now`,
    /// earliest first.
    pub fn list_due(&self, now: Timestamp) -> Vec<Arc<RegisteredJob>> {
        let mut due: Vec<(Timestamp, Arc<RegisteredJob>)> = self
            .jobs
            .values()
            .filter_map(|job| {
                let state = job.fire_state();
                if job.is_due(&state, now) {
                    state.next_fire.map(|next| (next, Arc::clone(job)))
                } else {
                    None
                }
            })
            .collect();
        due.sort_by(|(a_next, a), (b_next, b)| a_next.cmp(b_next).then_with(|| a.name().cmp(b.name())));
        due.into_iter().map(|(_, job)| job).collect()
    }

    /// Consumes the current fire of a due job.
    ///
    /// Returns `true` if this call moved the fire state forward, `false` if
    /// the job was no longer due. Fires missed before `now` are dropped.
    pub fn claim_fire(&self, id: Uuid, now: Timestamp) -> JobResult<bool> {
        let job = self.get(id)?;
        let mut state = job.lock_fire();
        if !job.is_due(&state, now) {
            return Ok(false);
        }

        state.last_fired = Some(now);
        state.next_fire = job.next_after(now, &self.timezone);
        Ok(true)
    }

    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> JobResult<Arc<RegisteredJob>> {
        let job = self.get(id)?;
        let was_enabled = job.enabled.swap(enabled, Ordering::SeqCst);

        if enabled && !was_enabled {
            let next = job.next_after(self.clock.now(), &self.timezone);
            job.lock_fire().next_fire = next;
        }

        tracing::info!(job = %job.name(), enabled, "Job enabled state changed");
        Ok(job)
    }
}
