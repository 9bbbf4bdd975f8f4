//! In-memory run history, bounded per job.

use std::collections::VecDeque;

use dashmap::DashMap;
use uuid::Uuid;

use crate::jobs::models::ExecutionRun;

/// Default number of runs kept per job.
pub const DEFAULT_RUNS_PER_JOB: usize = 50;

#[derive(Debug)]
pub struct RunHistory {
    runs: DashMap<Uuid, VecDeque<ExecutionRun>>,
    max_runs_per_job: usize,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RUNS_PER_JOB)
    }

    pub fn with_capacity(max_runs_per_job: usize) -> Self {
        Self {
            runs: DashMap::new(),
            max_runs_per_job: max_runs_per_job.max(1),
        }
    }

    /// Stores a run, replacing an earlier record with the same run id.
    pub fn record(&self, run: ExecutionRun) {
        let mut runs = self.runs.entry(run.job_id).or_default();
        if let Some(existing) = runs.iter_mut().find(|r| r.run_id == run.run_id) {
            *existing = run;
            return;
        }

        runs.push_back(run);
        while runs.len() > self.max_runs_per_job {
            runs.pop_front();
        }
    }

    /// Runs of a job, newest first, plus the total number kept.
    pub fn list(&self, job_id: Uuid, offset: usize, limit: usize) -> (Vec<ExecutionRun>, usize) {
        match self.runs.get(&job_id) {
            Some(runs) => {
                let page = runs.iter().rev().skip(offset).take(limit).cloned().collect();
                (page, runs.len())
            }
            None => (Vec::new(), 0),
        }
    }

    pub fn latest(&self, job_id: Uuid) -> Option<ExecutionRun> {
        self.runs.get(&job_id).and_then(|runs| runs.back().cloned())
    }

    pub fn get(&self, run_id: Uuid) -> Option<ExecutionRun> {
        self.runs.iter().find_map(|entry| {
            entry
                .value()
                .iter()
                .find(|run| run.run_id == run_id)
                .cloned()
        })
    }
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::statistics::JobStatistics;
    use crate::jobs::types::{JobDefinition, RunOutcome, TriggerKind};

    fn run_for(def: &JobDefinition) -> ExecutionRun {
        ExecutionRun::start(def, Uuid::new_v4(), TriggerKind::Scheduled)
    }

    #[test]
    fn test_list_newest_first_with_paging() {
        let history = RunHistory::new();
        let def = JobDefinition::new(Uuid::new_v4(), "report");
        let ids: Vec<Uuid> = (0..5)
            .map(|_| {
                let run = run_for(&def);
                let id = run.run_id;
                history.record(run);
                id
            })
            .collect();

        let (page, total) = history.list(def.id, 1, 2);
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].run_id, ids[3]);
        assert_eq!(page[1].run_id, ids[2]);
        assert_eq!(history.latest(def.id).unwrap().run_id, ids[4]);
    }

    #[test]
    fn test_bounded_per_job() {
        let history = RunHistory::with_capacity(3);
        let def = JobDefinition::new(Uuid::new_v4(), "report");
        let other = JobDefinition::new(Uuid::new_v4(), "other");
        for _ in 0..10 {
            history.record(run_for(&def));
        }
        history.record(run_for(&other));

        assert_eq!(history.list(def.id, 0, 100).1, 3);
        assert_eq!(history.list(other.id, 0, 100).1, 1);
    }

    #[test]
    fn test_record_replaces_same_run() {
        let history = RunHistory::new();
        let def = JobDefinition::new(Uuid::new_v4(), "report");
        let mut run = run_for(&def);
        history.record(run.clone());

        run.complete(RunOutcome::Succeeded, JobStatistics::new(), None)
            .unwrap();
        history.record(run.clone());

        assert_eq!(history.list(def.id, 0, 10).1, 1);
        assert_eq!(history.get(run.run_id).unwrap().outcome, RunOutcome::Succeeded);
        assert!(history.get(Uuid::new_v4()).is_none());
    }
}
