pub mod catalog;
pub mod context;
pub mod cron;
pub mod error;
pub mod history;
pub mod models;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod sink;
pub mod statistics;
pub mod tasks;
pub mod types;

pub use catalog::{CatalogContext, JobCatalog};
pub use context::JobContext;
pub use cron::{CronExpression, next_fire_time};
pub use error::{JobError, JobResult, TaskError, TaskResult};
pub use history::RunHistory;
pub use models::{ExecutionRun, LogEntry, LogLevel};
pub use registry::{Clock, FireState, JobRegistry, ManualClock, RegisteredJob, SystemClock};
pub use runner::JobRunner;
pub use scheduler::{ActiveRun, JobScheduler, RunHandle, SchedulerConfig};
pub use sink::{FileLogSink, LogSink, LogSinkFactory, RemoteLogSink, RemoteStoreOptions};
pub use statistics::JobStatistics;
pub use types::{JobDefinition, JobTask, LogMode, RunOutcome, StartupMode, TriggerKind};
