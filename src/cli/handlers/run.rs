//! Run command handler
//!
//! Runs a single job in the foreground and reports its outcome.

use tokio::signal;

use crate::config::Settings;
use crate::jobs::{ExecutionRun, RunOutcome};
use crate::server::build_scheduler;

/// Handler for the run command
pub struct RunCommandHandler {
    config: Settings,
}

impl RunCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Runs `job` and fails unless the run succeeded.
    pub async fn execute(&self, job: &str) -> anyhow::Result<()> {
        let run = self.run_job(job).await?;
        println!("{}", render_run(&run));

        if run.outcome != RunOutcome::Succeeded {
            anyhow::bail!("Job '{}' finished as {}", run.job_name, run.outcome);
        }
        Ok(())
    }

    /// Triggers the job by name or id and waits for it. Ctrl+C cancels the run.
    pub async fn run_job(&self, job: &str) -> anyhow::Result<ExecutionRun> {
        let scheduler = build_scheduler(&self.config)?;
        let job = scheduler.registry().find(job)?;
        let handle = scheduler.trigger(job.id())?;
        tracing::info!(job = %job.name(), run_id = %handle.run_id, "Job started");

        let wait = handle.wait();
        tokio::pin!(wait);
        let run = tokio::select! {
            run = &mut wait => run?,
            _ = signal::ctrl_c() => {
                tracing::warn!(job = %job.name(), "Interrupted, cancelling run");
                scheduler.cancel(job.id())?;
                wait.await?
            }
        };
        Ok(run)
    }
}

fn render_run(run: &ExecutionRun) -> String {
    let mut lines = vec![
        format!("Job:      {} ({})", run.job_name, run.job_id),
        format!("Run:      {}", run.run_id),
        format!("Outcome:  {}", run.outcome),
    ];
    if let Some(duration) = run.duration_ms {
        lines.push(format!("Duration: {} ms", duration));
    }

    let mut counters: Vec<(&str, u64)> = run.statistics.iter().collect();
    counters.sort();
    for (key, value) in counters {
        lines.push(format!("  {}: {}", key, value));
    }

    if let Some(error) = &run.error_message {
        lines.push(format!("Error:    {}", error));
    }
    lines.join("\n")
}
