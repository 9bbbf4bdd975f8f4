//! CLI argument parsing with clap
//!
//! Defines the command-line interface: global options plus the `serve`,
//! `jobs`, `run` and `next` subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::build;

/// A fault-tolerant scheduled job engine
#[derive(Parser, Debug)]
#[command(name = "tickwork")]
#[command(about = "A fault-tolerant scheduled job engine")]
#[command(long_about = "
Tickwork runs configured jobs on cron schedules, records every run with its
log and statistics, and exposes an optional admin API for inspecting and
triggering jobs.

EXAMPLES:
    # Start the scheduler with default configuration
    tickwork serve

    # Expose the admin API on all interfaces
    tickwork serve --host 0.0.0.0 --port 8080

    # Use a custom configuration file
    tickwork --config /etc/tickwork/production.toml serve

    # Check configuration and job declarations without starting
    tickwork serve --dry-run

    # List configured jobs and their next fire times
    tickwork jobs

    # Run a single job in the foreground
    tickwork run log-retention

    # Preview when a cron expression fires
    tickwork next \"0 */15 9-17 * * MON-FRI\" --count 10 --timezone Europe/Berlin
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Load this TOML file instead of the layered files in the config
    /// directory. Environment variables still override it.
    ///
    /// Example: --config /etc/tickwork/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded, ignoring
    /// TICKWORK_APP_ENV.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Raises log output to debug level. Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Lowers log output to error level. Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the scheduler (default)
    ///
    /// Registers every configured job, fires them on their schedules and,
    /// when enabled, serves the admin API. Stops gracefully on Ctrl+C or
    /// SIGTERM.
    ///
    /// Examples:
    ///   tickwork serve                            # Start with defaults
    ///   tickwork serve --host 0.0.0.0 --port 80   # Admin API on all interfaces
    ///   tickwork serve --dry-run                  # Validate config without starting
    Serve {
        /// Admin API host address
        ///
        /// Providing --host or --port enables the admin API.
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// Admin API port
        ///
        /// Must be between 1 and 65535.
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Log level override
        ///
        /// Overrides both the configuration file and --verbose/--quiet.
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and job declarations, then exit
        #[arg(long)]
        dry_run: bool,
    },

    /// List configured jobs
    ///
    /// Prints each job's schedule, enabled state and next fire time in the
    /// scheduler's time zone.
    Jobs,

    /// Run one job immediately in the foreground
    ///
    /// Exits non-zero unless the run succeeds. Ctrl+C cancels the run.
    ///
    /// Example:
    ///   tickwork run log-retention
    Run {
        /// Job name or id
        #[arg(value_name = "JOB")]
        job: String,
    },

    /// Show the next fire times of a cron expression
    ///
    /// Accepts 5-field (minute first) or 6-field (second first) expressions.
    /// Does not read configuration.
    Next {
        /// Cron expression, quoted
        #[arg(value_name = "EXPR")]
        expression: String,

        /// Number of fire times to print (1-100)
        #[arg(short = 'n', long, default_value_t = 5, value_parser = super::validation::validate_count)]
        count: usize,

        /// Time zone to evaluate in: UTC, local or an IANA name
        #[arg(short, long, value_name = "TZ")]
        timezone: Option<String>,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl Cli {
    /// Checks argument combinations clap cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        if let Some(Commands::Run { job }) = &self.command
            && job.trim().is_empty()
        {
            return Err("Job name cannot be empty".to_string());
        }

        Ok(())
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => "error".to_string(),
            LogLevel::Warn => "warn".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Debug => "debug".to_string(),
            LogLevel::Trace => "trace".to_string(),
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["tickwork", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["tickwork", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_default_behavior() {
        let cli = Cli::try_parse_from(["tickwork"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
        assert!(cli.env.is_none());
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from([
            "tickwork", "serve", "--host", "0.0.0.0", "--port", "8080", "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                log_level,
                dry_run,
            }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
                assert!(log_level.is_none());
                assert!(dry_run);
            }
            other => panic!("Expected Serve command, got {:?}", other),
        }
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from(["tickwork", "run", "log-retention"]).unwrap();
        match cli.command {
            Some(Commands::Run { job }) => assert_eq!(job, "log-retention"),
            other => panic!("Expected Run command, got {:?}", other),
        }

        assert!(Cli::try_parse_from(["tickwork", "run"]).is_err());
    }

    #[test]
    fn test_next_command() {
        let cli = Cli::try_parse_from([
            "tickwork",
            "next",
            "*/5 * * * *",
            "--count",
            "3",
            "--timezone",
            "Europe/Berlin",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Next {
                expression,
                count,
                timezone,
            }) => {
                assert_eq!(expression, "*/5 * * * *");
                assert_eq!(count, 3);
                assert_eq!(timezone.as_deref(), Some("Europe/Berlin"));
            }
            other => panic!("Expected Next command, got {:?}", other),
        }
    }

    #[test]
    fn test_next_count_defaults_and_bounds() {
        let cli = Cli::try_parse_from(["tickwork", "next", "0 * * * *"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Next { count: 5, .. })));

        assert!(Cli::try_parse_from(["tickwork", "next", "0 * * * *", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["tickwork", "next", "0 * * * *", "-n", "101"]).is_err());
    }

    #[test]
    fn test_environment_aliases() {
        let cli = Cli::try_parse_from(["tickwork", "--env", "prod", "jobs"]).unwrap();
        assert_eq!(cli.env, Some(Environment::Production));
        assert_eq!(
            crate::config::Environment::from(Environment::Staging),
            crate::config::Environment::Staging
        );
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["tickwork", "--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_validate_rejects_blank_job() {
        let cli = Cli::try_parse_from(["tickwork", "run", "  "]).unwrap();
        assert!(cli.validate().is_err());
        assert!(Cli::try_parse_from(["tickwork", "jobs"]).unwrap().validate().is_ok());
    }

    #[test]
    fn test_log_level_into_string() {
        assert_eq!(String::from(LogLevel::Warn), "warn");
        assert_eq!(String::from(LogLevel::Trace), "trace");
    }
}
