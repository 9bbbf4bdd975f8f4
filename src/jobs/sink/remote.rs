use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{LogSink, job_dir_name, log_file_name, stats_file_name};
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::models::LogEntry;
use crate::jobs::statistics::JobStatistics;

/// Connection settings for the HTTP object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStoreOptions {
    /// Base URL, e.g. `https://blobs.internal:9000`
    pub endpoint: String,
    pub container: String,
    /// Sent as a bearer token when present.
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

/// Stores run artifacts as objects under
/// `<endpoint>/<container>/<job-name>/`.
///
/// Object stores do not append, so each append re-uploads the whole log
/// buffered for the run so far. Appends for one run are serialized so an
/// older upload can never overwrite a newer one.
#[derive(Debug)]
pub struct RemoteLogSink {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    buffers: DashMap<Uuid, Arc<Mutex<String>>>,
}

impl RemoteLogSink {
    pub fn new(options: RemoteStoreOptions, job_name: &str) -> JobResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| JobError::sink(format!("cannot build HTTP client: {e}")))?;

        let base_url = format!(
            "{}/{}/{}",
            options.endpoint.trim_end_matches('/'),
            options.container.trim_matches('/'),
            job_dir_name(job_name)
        );

        Ok(Self {
            client,
            base_url,
            token: options.token,
            buffers: DashMap::new(),
        })
    }

    pub fn object_url(&self, object: &str) -> String {
        format!("{}/{}", self.base_url, object)
    }

    async fn put(&self, object: &str, content_type: &str, body: Vec<u8>) -> JobResult<()> {
        let url = self.object_url(object);
        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| JobError::sink(format!("upload of {url} failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl LogSink for RemoteLogSink {
    async fn append(&self, run_id: Uuid, entry: &LogEntry) -> JobResult<()> {
        let buffer = Arc::clone(self.buffers.entry(run_id).or_default().value());

        // Held across the upload.
        let mut buffer = buffer.lock().await;
        buffer.push_str(&entry.to_line());
        buffer.push('\n');
        self.put(
            &log_file_name(run_id),
            "text/plain; charset=utf-8",
            buffer.clone().into_bytes(),
        )
        .await
    }

    async fn persist_statistics(&self, run_id: Uuid, statistics: &JobStatistics) -> JobResult<()> {
        let body = serde_json::to_vec_pretty(statistics)?;
        self.put(&stats_file_name(run_id), "application/json", body)
            .await
    }

    async fn finish(&self, run_id: Uuid) -> JobResult<()> {
        self.buffers.remove(&run_id);
        Ok(())
    }
}
