//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use std::collections::HashSet;

use crate::config::error::ConfigError;
use crate::config::settings::{
    AdminConfig, FileSettings, JobDeclaration, JobLogSettings, LoggerSettings, SchedulerSettings,
    Settings,
};
use crate::jobs::{CronExpression, LogMode, StartupMode};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl SchedulerSettings {
    /// Validate scheduler configuration
    ///
    /// # Validation Rules
    /// - Tick interval must be greater than 0
    /// - History limit must be greater than 0
    /// - Time zone must resolve
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::validation(
                "scheduler.tick_interval_ms",
                "Tick interval must be greater than 0 milliseconds.",
            ));
        }

        if self.history_limit == 0 {
            return Err(ConfigError::validation(
                "scheduler.history_limit",
                "History limit must keep at least one run per job.",
            ));
        }

        self.time_zone()?;
        Ok(())
    }
}

impl JobLogSettings {
    /// Validate job log configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.trim().is_empty() {
            return Err(ConfigError::validation(
                "job_logs.root",
                "Job log root folder is required.",
            ));
        }

        if let Some(remote) = &self.remote {
            if !(remote.endpoint.starts_with("http://") || remote.endpoint.starts_with("https://"))
            {
                return Err(ConfigError::validation(
                    "job_logs.remote.endpoint",
                    "Remote store endpoint must be an http:// or https:// URL.",
                ));
            }
            if remote.container.trim().is_empty() {
                return Err(ConfigError::validation(
                    "job_logs.remote.container",
                    "Remote store container is required.",
                ));
            }
            if remote.timeout_seconds == 0 {
                return Err(ConfigError::validation(
                    "job_logs.remote.timeout_seconds",
                    "Remote store timeout must be greater than 0 seconds.",
                ));
            }
        }

        Ok(())
    }
}

impl AdminConfig {
    /// Validate admin API configuration. Nothing is checked while disabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        if self.port == 0 {
            return Err(ConfigError::validation(
                "admin.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::validation(
                "admin.host",
                "Admin host is required when the admin API is enabled.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "admin.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "Log file path is required when file logging is enabled.",
            ));
        }

        self.parse_format()?;
        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// The level may be a plain level or a filter directive such as
    /// `tickwork=debug,info`; the plain part must be a known level.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let default_level = self
            .level
            .split(',')
            .map(str::trim)
            .find(|directive| !directive.contains('='))
            .unwrap_or("info")
            .to_lowercase();

        if !VALID_LOG_LEVELS.contains(&default_level.as_str()) {
            return Err(ConfigError::validation(
                "logger.level".to_string(),
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl JobDeclaration {
    /// Validate a single job declaration
    pub fn validate(&self, index: usize, job_logs: &JobLogSettings) -> Result<(), ConfigError> {
        let field = |name: &str| format!("jobs[{}].{}", index, name);

        if self.name.trim().is_empty() {
            return Err(ConfigError::validation(field("name"), "Job name is required.".to_string()));
        }

        if self.job_type.trim().is_empty() {
            return Err(ConfigError::validation(
                field("job_type"),
                format!("Job '{}' needs a job_type.", self.name),
            ));
        }

        match (&self.schedule, self.startup) {
            (Some(schedule), _) => {
                CronExpression::parse(schedule).map_err(|e| {
                    ConfigError::validation(field("schedule"), e.to_string())
                })?;
            }
            (None, StartupMode::Automatic) => {
                return Err(ConfigError::validation(
                    field("schedule"),
                    format!(
                        "Job '{}' starts automatically and needs a schedule. \
                         Use startup = \"manual\" for trigger-only jobs.",
                        self.name
                    ),
                ));
            }
            (None, StartupMode::Manual) => {}
        }

        if self.log_mode == LogMode::RemoteStore && job_logs.remote.is_none() {
            return Err(ConfigError::validation(
                field("log_mode"),
                format!(
                    "Job '{}' logs to the remote store but [job_logs.remote] is not configured.",
                    self.name
                ),
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Validate all settings
    ///
    /// Runs validation on all configuration sections and returns the first error
    /// encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.job_logs.validate()?;
        self.admin.validate()?;
        self.logger.validate()?;

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for (index, job) in self.jobs.iter().enumerate() {
            job.validate(index, &self.job_logs)?;

            if !ids.insert(job.id) {
                return Err(ConfigError::validation(
                    format!("jobs[{}].id", index),
                    format!("Job id {} is declared more than once.", job.id),
                ));
            }
            if !names.insert(job.name.as_str()) {
                return Err(ConfigError::validation(
                    format!("jobs[{}].name", index),
                    format!("Job name '{}' is declared more than once.", job.name),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::RemoteStoreSettings;
    use uuid::Uuid;

    fn job(name: &str) -> JobDeclaration {
        JobDeclaration {
            id: Uuid::new_v4(),
            name: name.to_string(),
            job_type: "log_retention".to_string(),
            schedule: Some("0 3 * * *".to_string()),
            startup: StartupMode::Automatic,
            log_mode: LogMode::FileSystem,
            log_folder: None,
            description: None,
            enabled: true,
            payload: None,
        }
    }

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_default_settings_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_scheduler_zero_tick_interval() {
        let scheduler = SchedulerSettings {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            field_of(scheduler.validate().unwrap_err()),
            "scheduler.tick_interval_ms"
        );
    }

    #[test]
    fn test_scheduler_unknown_timezone() {
        let scheduler = SchedulerSettings {
            timezone: "Nowhere/Atlantis".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(scheduler.validate().unwrap_err()), "scheduler.timezone");
    }

    #[test]
    fn test_admin_disabled_skips_checks() {
        let admin = AdminConfig {
            enabled: false,
            port: 0,
            ..Default::default()
        };
        assert!(admin.validate().is_ok());

        let admin = AdminConfig {
            enabled: true,
            port: 0,
            ..Default::default()
        };
        assert_eq!(field_of(admin.validate().unwrap_err()), "admin.port");
    }

    #[test]
    fn test_remote_endpoint_must_be_http() {
        let job_logs = JobLogSettings {
            remote: Some(RemoteStoreSettings {
                endpoint: "ftp://store".to_string(),
                container: "logs".to_string(),
                token: None,
                timeout_seconds: 10,
            }),
            ..Default::default()
        };
        assert_eq!(
            field_of(job_logs.validate().unwrap_err()),
            "job_logs.remote.endpoint"
        );
    }

    #[test]
    fn test_logger_levels() {
        for level in ["trace", "DEBUG", "info", "tickwork=debug,warn"] {
            let settings = LoggerSettings {
                level: level.to_string(),
                ..Default::default()
            };
            assert!(settings.validate().is_ok(), "level {} should be valid", level);
        }

        let settings = LoggerSettings {
            level: "verbose".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger.level");
    }

    #[test]
    fn test_logger_invalid_format() {
        let mut settings = LoggerSettings::default();
        settings.file.format = "xml".to_string();
        assert_eq!(
            field_of(settings.validate().unwrap_err()),
            "logger.file.format"
        );
    }

    #[test]
    fn test_job_invalid_schedule() {
        let mut settings = Settings::default();
        let mut bad = job("bad");
        bad.schedule = Some("61 * * * *".to_string());
        settings.jobs = vec![job("ok"), bad];
        assert_eq!(field_of(settings.validate().unwrap_err()), "jobs[1].schedule");
    }

    #[test]
    fn test_automatic_job_requires_schedule() {
        let mut settings = Settings::default();
        let mut unscheduled = job("unscheduled");
        unscheduled.schedule = None;
        settings.jobs = vec![unscheduled.clone()];
        assert!(settings.validate().is_err());

        unscheduled.startup = StartupMode::Manual;
        settings.jobs = vec![unscheduled];
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_remote_job_requires_remote_store() {
        let mut settings = Settings::default();
        let mut remote = job("remote");
        remote.log_mode = LogMode::RemoteStore;
        settings.jobs = vec![remote];
        assert_eq!(field_of(settings.validate().unwrap_err()), "jobs[0].log_mode");
    }

    #[test]
    fn test_duplicate_jobs_rejected() {
        let mut settings = Settings::default();
        settings.jobs = vec![job("same"), job("same")];
        assert_eq!(field_of(settings.validate().unwrap_err()), "jobs[1].name");

        let first = job("first");
        let mut second = job("second");
        second.id = first.id;
        settings.jobs = vec![first, second];
        assert_eq!(field_of(settings.validate().unwrap_err()), "jobs[1].id");
    }
}
