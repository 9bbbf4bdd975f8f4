use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::fs;

use crate::jobs::context::JobContext;
use crate::jobs::error::{JobError, JobResult, TaskResult};
use crate::jobs::types::JobTask;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const PROGRESS_EVERY: u64 = 100;

pub const BYTES_DELETED: &str = "BytesDeleted";

/// Deletes run logs and statistics files older than the retention period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRetentionTask {
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Defaults to the file sink root.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

fn default_retention_days() -> u64 {
    30
}

impl LogRetentionTask {
    pub fn new(root: impl Into<PathBuf>, retention_days: u64) -> Self {
        Self {
            retention_days,
            root: Some(root.into()),
        }
    }

    pub fn from_payload(payload: JsonValue, default_root: &Path) -> JobResult<Self> {
        let payload = if payload.is_null() {
            JsonValue::Object(Default::default())
        } else {
            payload
        };
        let mut task: Self =
            serde_json::from_value(payload).map_err(|e| JobError::InvalidPayload {
                job_type: Self::task_type().to_string(),
                reason: e.to_string(),
            })?;
        if task.root.is_none() {
            task.root = Some(default_root.to_path_buf());
        }
        Ok(task)
    }

    fn cutoff(&self) -> SystemTime {
        self.retention_days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| SystemTime::now().checked_sub(Duration::from_secs(secs)))
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    /// Run artifacts below `root`, one level of job directories deep.
    async fn collect_artifacts(root: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut artifacts = Vec::new();
        let mut jobs = match fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(artifacts),
            Err(e) => return Err(e),
        };

        while let Some(job_dir) = jobs.next_entry().await? {
            if !job_dir.file_type().await?.is_dir() {
                continue;
            }
            let mut files = fs::read_dir(job_dir.path()).await?;
            while let Some(file) = files.next_entry().await? {
                if file.file_type().await?.is_file() && is_artifact(&file.path()) {
                    artifacts.push(file.path());
                }
            }
        }

        artifacts.sort();
        Ok(artifacts)
    }

    /// Deletes one artifact if it is older than `cutoff`.
    /// Returns the number of bytes removed, `None` if it was kept.
    async fn prune(path: &Path, cutoff: SystemTime) -> std::io::Result<Option<u64>> {
        let metadata = fs::metadata(path).await?;
        if metadata.modified()? >= cutoff {
            return Ok(None);
        }
        fs::remove_file(path).await?;
        Ok(Some(metadata.len()))
    }
}

fn is_artifact(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".log") || name.ends_with(".log.gz") || name.ends_with(".stats.json")
}

#[async_trait]
impl JobTask for LogRetentionTask {
    fn task_type() -> &'static str
    where
        Self: Sized,
    {
        "log_retention"
    }

    async fn execute(&self, ctx: &JobContext) -> TaskResult {
        let Some(root) = self.root.as_deref() else {
            return Err(anyhow::anyhow!("log retention has no root folder").into());
        };
        let cutoff = self.cutoff();

        let artifacts = Self::collect_artifacts(root).await.map_err(|e| {
            anyhow::Error::from(e).context(format!("cannot scan {}", root.display()))
        })?;
        ctx.info(format!(
            "Found {} run artifacts under {}",
            artifacts.len(),
            root.display()
        ))
        .await;

        for (index, path) in artifacts.iter().enumerate() {
            ctx.checkpoint()?;

            match Self::prune(path, cutoff).await {
                Ok(Some(bytes)) => ctx.statistics(|s| {
                    s.record_success();
                    s.add(BYTES_DELETED, bytes);
                }),
                Ok(None) => ctx.record_skip(),
                Err(e) => {
                    ctx.record_error();
                    ctx.warn(format!("Cannot prune {}: {}", path.display(), e))
                        .await;
                }
            }

            let processed = index as u64 + 1;
            if processed % PROGRESS_EVERY == 0 {
                ctx.info(format!("Processed {processed} of {}", artifacts.len()))
                    .await;
            }
        }

        let stats = ctx.statistics_snapshot();
        ctx.info(format!(
            "Deleted {} artifacts ({} bytes), kept {}, errors {}",
            stats.num_succeeded(),
            stats.get(BYTES_DELETED),
            stats.num_skipped(),
            stats.num_errors()
        ))
        .await;

        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "Delete job run logs older than {} days",
            self.retention_days
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use filetime::FileTime;
    use serde_json::json;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use super::*;
    use crate::jobs::error::TaskError;
    use crate::jobs::sink::FileLogSink;
    use crate::jobs::types::JobDefinition;

    fn write_aged(path: &Path, days_old: u64) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"0123456789").unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(days_old * SECONDS_PER_DAY);
        filetime::set_file_mtime(path, FileTime::from_system_time(mtime)).unwrap();
    }

    fn context(logs: &Path) -> JobContext {
        let def = JobDefinition::new(Uuid::new_v4(), "retention").manual();
        let sink = Arc::new(FileLogSink::new(logs, false));
        JobContext::new(Uuid::new_v4(), &def, CancellationToken::new(), sink)
    }

    #[tokio::test]
    async fn test_prunes_only_old_artifacts() {
        let root = tempdir().unwrap();
        let job = root.path().join("report");
        write_aged(&job.join("a.log"), 40);
        write_aged(&job.join("a.stats.json"), 40);
        write_aged(&job.join("b.log.gz"), 45);
        write_aged(&job.join("c.log"), 1);
        write_aged(&job.join("c.stats.json"), 1);
        write_aged(&job.join("notes.txt"), 90);

        let own_logs = tempdir().unwrap();
        let ctx = context(own_logs.path());
        LogRetentionTask::new(root.path(), 30)
            .execute(&ctx)
            .await
            .unwrap();

        let stats = ctx.statistics_snapshot();
        assert_eq!(stats.num_succeeded(), 3);
        assert_eq!(stats.num_skipped(), 2);
        assert_eq!(stats.num_errors(), 0);
        assert_eq!(stats.get(BYTES_DELETED), 30);

        assert!(!job.join("a.log").exists());
        assert!(!job.join("b.log.gz").exists());
        assert!(job.join("c.log").exists());
        assert!(job.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let root = tempdir().unwrap();
        let ctx = context(root.path());
        LogRetentionTask::new(root.path().join("absent"), 30)
            .execute(&ctx)
            .await
            .unwrap();
        assert_eq!(ctx.statistics_snapshot().processed(), 0);
    }

    #[tokio::test]
    async fn test_stops_when_cancelled() {
        let root = tempdir().unwrap();
        write_aged(&root.path().join("report").join("old.log"), 40);

        let own_logs = tempdir().unwrap();
        let ctx = context(own_logs.path());
        ctx.cancellation_token().cancel();

        let result = LogRetentionTask::new(root.path(), 30).execute(&ctx).await;

        assert!(matches!(result, Err(TaskError::Cancelled)));
        assert!(root.path().join("report").join("old.log").exists());
    }

    #[tokio::test]
    async fn test_logs_progress_every_hundred_units() {
        let root = tempdir().unwrap();
        for i in 0..150 {
            write_aged(&root.path().join("bulk").join(format!("{i}.log")), 1);
        }

        let own_logs = tempdir().unwrap();
        let ctx = context(own_logs.path());
        LogRetentionTask::new(root.path(), 30)
            .execute(&ctx)
            .await
            .unwrap();

        let progress = ctx
            .log_lines()
            .iter()
            .filter(|line| line.message.starts_with("Processed"))
            .count();
        assert_eq!(progress, 1);
        assert_eq!(ctx.statistics_snapshot().num_skipped(), 150);
    }

    #[test]
    fn test_payload_defaults() {
        let task = LogRetentionTask::from_payload(json!(null), Path::new("/srv/logs")).unwrap();
        assert_eq!(task.retention_days, 30);
        assert_eq!(task.root, Some(PathBuf::from("/srv/logs")));

        let task = LogRetentionTask::from_payload(
            json!({"retention_days": 3, "root": "/elsewhere"}),
            Path::new("/srv/logs"),
        )
        .unwrap();
        assert_eq!(task.retention_days, 3);
        assert_eq!(task.root, Some(PathBuf::from("/elsewhere")));

        assert!(LogRetentionTask::from_payload(json!({"retention_days": "x"}), Path::new("/")).is_err());
    }

    #[test]
    fn test_huge_retention_keeps_everything() {
        let task = LogRetentionTask::from_payload(
            json!({"retention_days": u64::MAX}),
            Path::new("/srv/logs"),
        )
        .unwrap();
        assert_eq!(task.cutoff(), SystemTime::UNIX_EPOCH);

        let task = LogRetentionTask::new("/srv/logs", u64::MAX / SECONDS_PER_DAY);
        assert_eq!(task.cutoff(), SystemTime::UNIX_EPOCH);
    }
}
