//! Command executor for dispatching CLI commands

use super::handlers::{
    JobsCommandHandler, NextCommandHandler, RunCommandHandler, ServeCommandHandler,
};
use super::parser::{Cli, Commands};
use crate::config::Settings;

/// Execute a CLI command with merged and validated settings.
///
/// A missing subcommand means `serve`.
pub async fn execute_command(cli: &Cli, settings: Settings) -> anyhow::Result<()> {
    cli.validate().map_err(anyhow::Error::msg)?;

    match &cli.command {
        Some(Commands::Serve { dry_run, .. }) => {
            ServeCommandHandler::new(settings).execute(*dry_run).await
        }
        None => ServeCommandHandler::new(settings).execute(false).await,
        Some(Commands::Jobs) => JobsCommandHandler::new(settings).execute(),
        Some(Commands::Run { job }) => RunCommandHandler::new(settings).execute(job).await,
        Some(Commands::Next {
            expression,
            count,
            timezone,
        }) => NextCommandHandler::new(expression.clone(), *count, timezone.clone()).execute(),
    }
}
