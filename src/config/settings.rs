//! Configuration settings structures for tickwork
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::config::error::ConfigError;
use crate::jobs::{
    JobDefinition, LogMode, LogSinkFactory, RemoteStoreOptions, SchedulerConfig, StartupMode,
};
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "tickwork".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_true() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_shutdown_grace_seconds() -> u64 {
    30
}

fn default_history_limit() -> usize {
    50
}

fn default_job_log_root() -> String {
    "job-logs".to_string()
}

fn default_remote_timeout() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_path() -> String {
    "logs/tickwork.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Scheduler Configuration
// ============================================================================

/// Scheduler loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// When false, `serve` only runs the admin API and manual triggers.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How often due jobs are checked, in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// IANA time zone schedules are evaluated in (`UTC`, `Europe/Berlin`, `local`)
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Seconds to wait for running jobs on shutdown
    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,

    /// Runs kept in memory per job
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            tick_interval_ms: default_tick_interval_ms(),
            timezone: default_timezone(),
            shutdown_grace_seconds: default_shutdown_grace_seconds(),
            history_limit: default_history_limit(),
        }
    }
}

impl SchedulerSettings {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }

    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            shutdown_grace: self.shutdown_grace(),
        }
    }

    /// Resolve the configured time zone
    pub fn time_zone(&self) -> Result<jiff::tz::TimeZone, ConfigError> {
        resolve_time_zone(&self.timezone).map_err(|message| ConfigError::ValidationError {
            field: "scheduler.timezone".to_string(),
            message,
        })
    }
}

/// Resolves `UTC`, `local` or an IANA zone name.
pub fn resolve_time_zone(name: &str) -> Result<jiff::tz::TimeZone, String> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("utc") {
        return Ok(jiff::tz::TimeZone::UTC);
    }
    if name.eq_ignore_ascii_case("local") {
        return Ok(jiff::tz::TimeZone::system());
    }
    jiff::tz::TimeZone::get(name).map_err(|e| format!("Unknown time zone '{}': {}", name, e))
}

// ============================================================================
// Job Log Configuration
// ============================================================================

/// HTTP object store used by jobs with `log_mode = "remote_store"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStoreSettings {
    pub endpoint: String,

    pub container: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_remote_timeout")]
    pub timeout_seconds: u64,
}

impl RemoteStoreSettings {
    pub fn into_options(self) -> RemoteStoreOptions {
        RemoteStoreOptions {
            endpoint: self.endpoint,
            container: self.container,
            token: self.token,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// Where job run logs and statistics are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogSettings {
    /// Root folder of the file sink
    #[serde(default = "default_job_log_root")]
    pub root: String,

    /// Gzip finished run logs
    #[serde(default)]
    pub compress: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteStoreSettings>,
}

impl Default for JobLogSettings {
    fn default() -> Self {
        Self {
            root: default_job_log_root(),
            compress: false,
            remote: None,
        }
    }
}

impl JobLogSettings {
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }

    pub fn sink_factory(&self) -> LogSinkFactory {
        let factory = LogSinkFactory::new(self.root_path()).with_compression(self.compress);
        match &self.remote {
            Some(remote) => factory.with_remote(remote.clone().into_options()),
            None => factory,
        }
    }
}

// ============================================================================
// Admin API Configuration
// ============================================================================

/// Axum admin API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl AdminConfig {
    /// Get the admin API bind address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert LoggerSettings to the runtime LoggerConfig
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file = self.file.into_file_config()?;

        LoggerConfig::new(console, file, self.level).map_err(|e| ConfigError::ValidationError {
            field: "logger".to_string(),
            message: e.to_string(),
        })
    }
}

impl FileSettings {
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self.parse_format()?;
        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format).map_err(|e| {
            ConfigError::ValidationError {
                field: "logger.file".to_string(),
                message: e.to_string(),
            }
        })
    }

    pub(crate) fn parse_format(&self) -> Result<LogFormat, ConfigError> {
        self.format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: e.to_string(),
            })
    }
}

// ============================================================================
// Job Declarations
// ============================================================================

/// A job as declared in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDeclaration {
    pub id: Uuid,

    pub name: String,

    /// Catalog type building the job body, e.g. `log_retention`
    pub job_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    #[serde(default)]
    pub startup: StartupMode,

    #[serde(default)]
    pub log_mode: LogMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_folder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Disabled jobs are registered but never fire from their schedule
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Handed to the job type's factory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<JsonValue>,
}

impl JobDeclaration {
    pub fn to_definition(&self) -> JobDefinition {
        JobDefinition {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            schedule: self.schedule.clone(),
            startup: self.startup,
            log_mode: self.log_mode,
            log_folder: self.log_folder.as_ref().map(PathBuf::from),
        }
    }

    pub fn payload(&self) -> JsonValue {
        self.payload
            .clone()
            .unwrap_or_else(|| JsonValue::Object(Default::default()))
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub job_logs: JobLogSettings,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub jobs: Vec<JobDeclaration>,
}

impl Settings {
    pub fn find_job(&self, name_or_id: &str) -> Option<&JobDeclaration> {
        self.jobs
            .iter()
            .find(|job| job.name == name_or_id || job.id.to_string() == name_or_id)
    }
}
