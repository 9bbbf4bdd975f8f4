//! Settings for the scheduler, job logs, admin API, logger and declared jobs
//!
//! Sources are merged lowest to highest: `default.toml`, `{environment}.toml`,
//! `local.toml`, then `TICKWORK_*` environment variables (`__` separates
//! nested keys, e.g. `TICKWORK_SCHEDULER__TIMEZONE`).

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{
    AdminConfig, JobDeclaration, JobLogSettings, LoggerSettings, RemoteStoreSettings,
    SchedulerSettings, Settings, resolve_time_zone,
};
