//! Command-line interface
//!
//! Argument parsing, merging CLI overrides into the loaded configuration,
//! and dispatching to the command handlers.

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, LogLevel};

use anyhow::Context;

use crate::config::Settings;
use crate::logger::init_logger;
use handlers::NextCommandHandler;

/// Entry point for the binary: load configuration, set up logging and run the command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    cli.validate().map_err(anyhow::Error::msg)?;

    // Previewing an expression needs neither configuration nor logging.
    if let Some(Commands::Next {
        expression,
        count,
        timezone,
    }) = &cli.command
    {
        return NextCommandHandler::new(expression.clone(), *count, timezone.clone()).execute();
    }

    let settings = load_and_merge_config(&cli)?;
    init_logger_from_settings(&settings)?;
    execute_command(&cli, settings).await
}

/// Load the configuration files selected by the CLI and apply its overrides.
pub fn load_and_merge_config(cli: &Cli) -> anyhow::Result<Settings> {
    let merger = ConfigurationMerger::from_cli(cli).context("Failed to load configuration")?;
    merger
        .merge_cli_args(cli)
        .context("Invalid configuration")
}

/// Initialize the global logger from settings
pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<()> {
    let logger_config = settings
        .logger
        .clone()
        .into_logger_config()
        .context("Invalid logger configuration")?;
    init_logger(logger_config).context("Failed to initialize logger")
}
