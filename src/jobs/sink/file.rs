use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{LogSink, log_file_name, stats_file_name};
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::models::LogEntry;
use crate::jobs::statistics::JobStatistics;

/// Writes run artifacts into one job's directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileLogSink {
    dir: PathBuf,
    compress: bool,
}

impl FileLogSink {
    pub fn new(dir: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            dir: dir.into(),
            compress,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self, run_id: Uuid) -> PathBuf {
        self.dir.join(log_file_name(run_id))
    }

    pub fn stats_path(&self, run_id: Uuid) -> PathBuf {
        self.dir.join(stats_file_name(run_id))
    }

    async fn ensure_dir(&self) -> JobResult<()> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            JobError::sink(format!("cannot create {}: {}", self.dir.display(), e))
        })
    }
}

#[async_trait]
impl LogSink for FileLogSink {
    async fn append(&self, run_id: Uuid, entry: &LogEntry) -> JobResult<()> {
        self.ensure_dir().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(run_id))
            .await?;

        let mut line = entry.to_line();
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn persist_statistics(&self, run_id: Uuid, statistics: &JobStatistics) -> JobResult<()> {
        self.ensure_dir().await?;

        let body = serde_json::to_vec_pretty(statistics)?;
        let path = self.stats_path(run_id);
        let staging = path.with_extension("json.tmp");
        let mut file = fs::File::create(&staging).await?;
        file.write_all(&body).await?;
        file.sync_data().await?;
        drop(file);
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn finish(&self, run_id: Uuid) -> JobResult<()> {
        if !self.compress {
            return Ok(());
        }

        let path = self.log_path(run_id);
        if !fs::try_exists(&path).await? {
            return Ok(());
        }

        tokio::task::spawn_blocking(move || compress_file(&path))
            .await
            .map_err(|e| JobError::sink(format!("compression task failed: {e}")))??;
        Ok(())
    }
}

/// Replaces `path` with a gzip-compressed `<path>.gz`.
fn compress_file(path: &Path) -> JobResult<()> {
    let input = std::fs::read(path)?;

    let mut compressed = path.as_os_str().to_owned();
    compressed.push(".gz");

    let output = File::create(PathBuf::from(compressed))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    encoder.write_all(&input)?;
    encoder.finish()?.sync_all()?;

    std::fs::remove_file(path)?;
    Ok(())
}
