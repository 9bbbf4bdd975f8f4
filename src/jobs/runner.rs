use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::jobs::context::JobContext;
use crate::jobs::error::TaskError;
use crate::jobs::history::RunHistory;
use crate::jobs::models::ExecutionRun;
use crate::jobs::registry::RegisteredJob;
use crate::jobs::sink::{LogSink, LogSinkFactory};
use crate::jobs::statistics::JobStatistics;
use crate::jobs::types::{RunOutcome, TriggerKind};

/// Executes single runs of a job and turns whatever the body does into an
/// `ExecutionRun` with a terminal outcome.
#[derive(Debug)]
pub struct JobRunner {
    sinks: LogSinkFactory,
    history: Arc<RunHistory>,
}

impl JobRunner {
    pub fn new(sinks: LogSinkFactory, history: Arc<RunHistory>) -> Self {
        Self { sinks, history }
    }

    pub fn history(&self) -> &Arc<RunHistory> {
        &self.history
    }

    pub fn sinks(&self) -> &LogSinkFactory {
        &self.sinks
    }

    /// Runs `job` once with its own cancellation token.
    pub async fn run(&self, job: &RegisteredJob, trigger: TriggerKind) -> ExecutionRun {
        self.run_with(job, Uuid::new_v4(), trigger, CancellationToken::new())
            .await
    }

    pub async fn run_with(
        &self,
        job: &RegisteredJob,
        run_id: Uuid,
        trigger: TriggerKind,
        cancellation: CancellationToken,
    ) -> ExecutionRun {
        let definition = job.definition();
        let mut run = ExecutionRun::start(definition, run_id, trigger);
        self.history.record(run.clone());

        tracing::info!(
            job = %definition.name,
            job_id = %definition.id,
            run_id = %run_id,
            trigger = ?trigger,
            "Job run started"
        );

        let sink = match self.sinks.for_job(definition) {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!(job = %definition.name, run_id = %run_id, error = %e, "No log sink for job run");
                let stats = run.statistics.clone();
                self.complete(&mut run, RunOutcome::Failed, stats, Some(e.to_string()));
                return run;
            }
        };

        let task = job.task();
        let ctx = JobContext::new(run_id, definition, cancellation, Arc::clone(&sink))
            .with_observer(Arc::clone(&task));

        let result = AssertUnwindSafe(task.execute(&ctx)).catch_unwind().await;

        let (outcome, error_message) = match result {
            Ok(Ok(())) => {
                if AssertUnwindSafe(task.on_success(&ctx)).catch_unwind().await.is_err() {
                    tracing::warn!(job = %definition.name, run_id = %run_id, "on_success callback panicked");
                }
                (RunOutcome::Succeeded, None)
            }
            Ok(Err(TaskError::Cancelled)) => {
                ctx.warn("Run cancelled before completion").await;
                (RunOutcome::Cancelled, None)
            }
            Ok(Err(TaskError::Failed(error))) => {
                let message = self.report_failure(&ctx, &error).await;
                if AssertUnwindSafe(task.on_fail(&ctx, &error)).catch_unwind().await.is_err() {
                    tracing::warn!(job = %definition.name, run_id = %run_id, "on_fail callback panicked");
                }
                (RunOutcome::Failed, Some(message))
            }
            Err(payload) => {
                let error = anyhow::anyhow!("job panicked: {}", panic_message(payload.as_ref()));
                let message = self.report_failure(&ctx, &error).await;
                if AssertUnwindSafe(task.on_fail(&ctx, &error)).catch_unwind().await.is_err() {
                    tracing::warn!(job = %definition.name, run_id = %run_id, "on_fail callback panicked");
                }
                (RunOutcome::Failed, Some(message))
            }
        };

        let stats = ctx.statistics_snapshot();
        if let Err(e) = sink.persist_statistics(run_id, &stats).await {
            tracing::warn!(job = %definition.name, run_id = %run_id, error = %e, "Failed to persist statistics");
        }

        run.log = ctx.log_lines();
        self.complete(&mut run, outcome, stats, error_message);
        self.finish_sink(sink.as_ref(), &run).await;
        run
    }

    async fn report_failure(&self, ctx: &JobContext, error: &anyhow::Error) -> String {
        let message = format!("{error:#}");
        tracing::error!(
            job = %ctx.job_name(),
            run_id = %ctx.run_id(),
            error = ?error,
            "Job run failed"
        );
        ctx.error(format!("Run failed: {error:?}")).await;
        message
    }

    fn complete(
        &self,
        run: &mut ExecutionRun,
        outcome: RunOutcome,
        stats: JobStatistics,
        error_message: Option<String>,
    ) {
        if let Err(e) = run.complete(outcome, stats, error_message) {
            tracing::warn!(run_id = %run.run_id, error = %e, "Run completion rejected");
        }

        tracing::info!(
            job = %run.job_name,
            run_id = %run.run_id,
            outcome = %run.outcome,
            duration_ms = run.duration_ms.unwrap_or_default(),
            succeeded = run.statistics.num_succeeded(),
            skipped = run.statistics.num_skipped(),
            errors = run.statistics.num_errors(),
            "Job run finished"
        );
        self.history.record(run.clone());
    }

    async fn finish_sink(&self, sink: &dyn LogSink, run: &ExecutionRun) {
        if let Err(e) = sink.finish(run.run_id).await {
            tracing::warn!(job = %run.job_name, run_id = %run.run_id, error = %e, "Failed to finish run log");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
