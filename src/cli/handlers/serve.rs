//! Serve command handler
//!
//! Runs the scheduler, or validates the configuration and exits on `--dry-run`.

use crate::config::Settings;
use crate::server::{Server, build_scheduler};

/// Handler for the serve command
pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub async fn execute(self, dry_run: bool) -> anyhow::Result<()> {
        if dry_run {
            let summary = self.validate_only()?;
            println!("{}", summary);
            return Ok(());
        }
        Server::new(self.config).run().await
    }

    /// Builds every declared job without starting anything and returns a
    /// printable summary.
    pub fn validate_only(&self) -> anyhow::Result<String> {
        self.config.validate()?;
        let scheduler = build_scheduler(&self.config)?;
        let registry = scheduler.registry();

        let mut lines = vec![
            "✓ Configuration is valid".to_string(),
            format!(
                "✓ {} job(s) registered in time zone {}",
                registry.len(),
                self.config.scheduler.timezone
            ),
        ];
        for job in registry.list() {
            let schedule = job.definition().schedule.as_deref().unwrap_or("manual");
            lines.push(format!("    - {} ({})", job.name(), schedule));
        }
        lines.push(format!("✓ Job logs under {}", self.config.job_logs.root));
        if let Some(remote) = &self.config.job_logs.remote {
            lines.push(format!(
                "✓ Remote log store {} (container {})",
                remote.endpoint, remote.container
            ));
        }
        if self.config.admin.enabled {
            lines.push(format!("✓ Admin API would bind to {}", self.config.admin.address()));
        } else {
            lines.push("✓ Admin API disabled".to_string());
        }
        if !self.config.scheduler.enabled {
            lines.push("! Scheduler loop disabled, jobs only run on manual trigger".to_string());
        }
        lines.push("Dry run completed successfully".to_string());
        Ok(lines.join("\n"))
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
