use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::jobs::error::{TaskError, TaskResult};
use crate::jobs::models::{LogEntry, LogLevel};
use crate::jobs::sink::LogSink;
use crate::jobs::statistics::JobStatistics;
use crate::jobs::types::{JobDefinition, JobTask};

/// Lines kept in memory per run. The sink receives every line.
pub const MAX_RETAINED_LOG_LINES: usize = 1_000;

/// Per-run handle given to a job body.
///
/// Cheap to clone; all clones share the run's cancellation token,
/// statistics and log.
#[derive(Debug, Clone)]
pub struct JobContext {
    run_id: Uuid,
    job_id: Uuid,
    job_name: String,
    cancellation: CancellationToken,
    statistics: Arc<Mutex<JobStatistics>>,
    log: Arc<Mutex<VecDeque<LogEntry>>>,
    sink: Arc<dyn LogSink>,
    observer: Option<Arc<dyn JobTask>>,
}

impl JobContext {
    pub fn new(
        run_id: Uuid,
        definition: &JobDefinition,
        cancellation: CancellationToken,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            run_id,
            job_id: definition.id,
            job_name: definition.name.clone(),
            cancellation,
            statistics: Arc::new(Mutex::new(JobStatistics::new())),
            log: Arc::new(Mutex::new(VecDeque::new())),
            sink,
            observer: None,
        }
    }

    /// Task whose `on_log` callback receives every logged line.
    pub fn with_observer(mut self, task: Arc<dyn JobTask>) -> Self {
        self.observer = Some(task);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once cancellation of this run has been requested.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Returns `Err(TaskError::Cancelled)` once cancellation was requested.
    /// Bodies call this between units of work and propagate it with `?`.
    pub fn checkpoint(&self) -> TaskResult {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn statistics<R>(&self, update: impl FnOnce(&mut JobStatistics) -> R) -> R {
        let mut stats = self
            .statistics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        update(&mut stats)
    }

    pub fn record_success(&self) {
        self.statistics(JobStatistics::record_success);
    }

    pub fn record_skip(&self) {
        self.statistics(JobStatistics::record_skip);
    }

    pub fn record_error(&self) {
        self.statistics(JobStatistics::record_error);
    }

    pub fn statistics_snapshot(&self) -> JobStatistics {
        self.statistics(|stats| stats.clone())
    }

    /// The most recent [`MAX_RETAINED_LOG_LINES`] lines, oldest first.
    pub fn log_lines(&self) -> Vec<LogEntry> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Records a line in the run log and writes it through the sink.
    ///
    /// A sink failure does not fail the run; the line stays in the
    /// in-memory log and the failure is reported via tracing.
    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::new(level, message);

        match level {
            LogLevel::Debug => {
                tracing::debug!(job = %self.job_name, run_id = %self.run_id, "{}", entry.message)
            }
            LogLevel::Info => {
                tracing::info!(job = %self.job_name, run_id = %self.run_id, "{}", entry.message)
            }
            LogLevel::Warn => {
                tracing::warn!(job = %self.job_name, run_id = %self.run_id, "{}", entry.message)
            }
            LogLevel::Error => {
                tracing::error!(job = %self.job_name, run_id = %self.run_id, "{}", entry.message)
            }
        }

        {
            let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
            if log.len() == MAX_RETAINED_LOG_LINES {
                log.pop_front();
            }
            log.push_back(entry.clone());
        }

        if let Err(e) = self.sink.append(self.run_id, &entry).await {
            tracing::warn!(
                job = %self.job_name,
                run_id = %self.run_id,
                error = %e,
                "Failed to persist log line"
            );
        }

        if let Some(task) = &self.observer {
            if catch_unwind(AssertUnwindSafe(|| task.on_log(&entry))).is_err() {
                tracing::warn!(job = %self.job_name, run_id = %self.run_id, "on_log callback panicked");
            }
        }
    }

    pub async fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message).await
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message).await
    }

    pub async fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message).await
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::tempdir;

    use super::*;
    use crate::jobs::sink::FileLogSink;

    #[derive(Debug, Default)]
    struct CountingTask {
        lines: AtomicUsize,
    }

    #[async_trait]
    impl JobTask for CountingTask {
        async fn execute(&self, _ctx: &JobContext) -> TaskResult {
            Ok(())
        }

        fn on_log(&self, _entry: &LogEntry) {
            self.lines.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Debug)]
    struct PanickingObserver;

    #[async_trait]
    impl JobTask for PanickingObserver {
        async fn execute(&self, _ctx: &JobContext) -> TaskResult {
            Ok(())
        }

        fn on_log(&self, _entry: &LogEntry) {
            panic!("observer exploded");
        }
    }

    fn context(dir: &std::path::Path) -> (JobContext, Arc<FileLogSink>) {
        let def = JobDefinition::new(Uuid::new_v4(), "ctx-test");
        let sink = Arc::new(FileLogSink::new(dir, false));
        let ctx = JobContext::new(Uuid::new_v4(), &def, CancellationToken::new(), sink.clone());
        (ctx, sink)
    }

    #[test]
    fn test_checkpoint_reports_cancellation() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(dir.path());

        assert!(ctx.checkpoint().is_ok());
        ctx.cancellation_token().cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.checkpoint(), Err(TaskError::Cancelled)));
    }

    #[test]
    fn test_statistics_shared_between_clones() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(dir.path());
        let clone = ctx.clone();

        ctx.record_success();
        clone.record_error();
        clone.statistics(|s| s.add("Bytes", 10));

        let snapshot = ctx.statistics_snapshot();
        assert_eq!(snapshot.num_succeeded(), 1);
        assert_eq!(snapshot.num_errors(), 1);
        assert_eq!(snapshot.get("Bytes"), 10);
    }

    #[tokio::test]
    async fn test_log_persists_and_notifies_observer() {
        let dir = tempdir().unwrap();
        let (ctx, sink) = context(dir.path());
        let observer = Arc::new(CountingTask::default());
        let ctx = ctx.with_observer(observer.clone());

        ctx.info("starting").await;
        ctx.warn("halfway").await;

        assert_eq!(observer.lines.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.log_lines().len(), 2);
        let persisted = std::fs::read_to_string(sink.log_path(ctx.run_id())).unwrap();
        assert!(persisted.contains("[WARN] halfway"));
    }

    #[tokio::test]
    async fn test_in_memory_log_keeps_latest_lines() {
        let dir = tempdir().unwrap();
        let (ctx, sink) = context(dir.path());

        for i in 0..MAX_RETAINED_LOG_LINES + 5 {
            ctx.debug(format!("line {i}")).await;
        }

        let lines = ctx.log_lines();
        assert_eq!(lines.len(), MAX_RETAINED_LOG_LINES);
        assert_eq!(lines[0].message, "line 5");
        assert_eq!(
            lines[MAX_RETAINED_LOG_LINES - 1].message,
            format!("line {}", MAX_RETAINED_LOG_LINES + 4)
        );

        let persisted = std::fs::read_to_string(sink.log_path(ctx.run_id())).unwrap();
        assert_eq!(persisted.lines().count(), MAX_RETAINED_LOG_LINES + 5);
        assert!(persisted.contains("line 0"));
    }

    #[tokio::test]
    async fn test_panicking_observer_is_contained() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(dir.path());
        let ctx = ctx.with_observer(Arc::new(PanickingObserver));

        ctx.error("still logged").await;

        assert_eq!(ctx.log_lines()[0].message, "still logged");
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(dir.path());
        let token = ctx.cancellation_token().clone();

        let waiter = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.cancelled().await }
        });
        token.cancel();
        waiter.await.unwrap();
    }
}
