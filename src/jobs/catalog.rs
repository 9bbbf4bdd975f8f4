use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::tasks::LogRetentionTask;
use crate::jobs::types::JobTask;

/// Environment handed to task factories.
#[derive(Debug, Clone, Default)]
pub struct CatalogContext {
    /// Root folder of the file log sink.
    pub log_root: PathBuf,
}

type TaskFactory =
    Box<dyn Fn(JsonValue, &CatalogContext) -> JobResult<Arc<dyn JobTask>> + Send + Sync>;

/// Maps job type names from configuration to task implementations
pub struct JobCatalog {
    factories: HashMap<String, TaskFactory>,
    context: CatalogContext,
}

impl JobCatalog {
    pub fn new(context: CatalogContext) -> Self {
        Self {
            factories: HashMap::new(),
            context,
        }
    }

    /// Catalog with the engine's own job types registered.
    pub fn with_builtin(context: CatalogContext) -> Self {
        let mut catalog = Self::new(context);
        catalog.register_with(LogRetentionTask::task_type(), |payload, ctx| {
            let task = LogRetentionTask::from_payload(payload, &ctx.log_root)?;
            Ok(Arc::new(task) as Arc<dyn JobTask>)
        });
        catalog
    }

    /// Register a task type whose payload deserializes into the task itself
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: JobTask + DeserializeOwned + 'static,
    {
        let job_type = T::task_type();
        self.register_with(job_type, move |payload, _| {
            let task: T = serde_json::from_value(payload).map_err(|e| JobError::InvalidPayload {
                job_type: job_type.to_string(),
                reason: e.to_string(),
            })?;
            Ok(Arc::new(task) as Arc<dyn JobTask>)
        })
    }

    pub fn register_with<F>(&mut self, job_type: &str, factory: F) -> &mut Self
    where
        F: Fn(JsonValue, &CatalogContext) -> JobResult<Arc<dyn JobTask>> + Send + Sync + 'static,
    {
        self.factories.insert(job_type.to_string(), Box::new(factory));
        self
    }

    /// Create a task instance from job type and payload
    pub fn create_task(&self, job_type: &str, payload: JsonValue) -> JobResult<Arc<dyn JobTask>> {
        let factory = self
            .factories
            .get(job_type)
            .ok_or_else(|| JobError::UnknownJobType(job_type.to_string()))?;

        factory(payload, &self.context)
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.factories.contains_key(job_type)
    }

    pub fn job_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl std::fmt::Debug for JobCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobCatalog")
            .field("job_types", &self.job_types())
            .field("context", &self.context)
            .finish()
    }
}
