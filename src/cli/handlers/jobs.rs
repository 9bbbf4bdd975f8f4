//! Jobs command handler

use crate::config::Settings;
use crate::jobs::JobRegistry;
use crate::server::build_scheduler;

/// Lists configured jobs with their next fire time
pub struct JobsCommandHandler {
    config: Settings,
}

impl JobsCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> anyhow::Result<()> {
        let scheduler = build_scheduler(&self.config)?;
        println!("{}", render_table(scheduler.registry()));
        Ok(())
    }
}

pub(crate) fn render_table(registry: &JobRegistry) -> String {
    let jobs = registry.list();
    if jobs.is_empty() {
        return "No jobs configured".to_string();
    }

    let tz = registry.timezone();
    let name_width = jobs
        .iter()
        .map(|job| job.name().len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut lines = vec![format!(
        "{:<name_width$}  {:<36}  {:<20}  {:<7}  NEXT FIRE",
        "NAME", "ID", "SCHEDULE", "ENABLED"
    )];
    for job in jobs {
        let schedule = job.definition().schedule.as_deref().unwrap_or("manual");
        let next_fire = match (job.is_enabled(), job.fire_state().next_fire) {
            (true, Some(next)) => next.to_zoned(tz.clone()).to_string(),
            _ => "-".to_string(),
        };
        lines.push(format!(
            "{:<name_width$}  {:<36}  {:<20}  {:<7}  {}",
            job.name(),
            job.id(),
            schedule,
            if job.is_enabled() { "yes" } else { "no" },
            next_fire
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobDeclaration;
    use crate::jobs::{LogMode, StartupMode};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn declaration(name: &str, schedule: Option<&str>, startup: StartupMode) -> JobDeclaration {
        JobDeclaration {
            id: Uuid::new_v4(),
            name: name.to_string(),
            job_type: "log_retention".to_string(),
            schedule: schedule.map(str::to_string),
            startup,
            log_mode: LogMode::FileSystem,
            log_folder: None,
            description: None,
            enabled: true,
            payload: None,
        }
    }

    #[test]
    fn test_render_table() {
        let dir = TempDir::new().unwrap();
        let mut config = Settings::default();
        config.job_logs.root = dir.path().display().to_string();
        config.scheduler.timezone = "Europe/Berlin".to_string();
        let mut paused = declaration("paused-prune", Some("0 4 * * *"), StartupMode::Automatic);
        paused.enabled = false;
        config.jobs = vec![
            declaration("prune", Some("0 3 * * *"), StartupMode::Automatic),
            declaration("adhoc", None, StartupMode::Manual),
            paused,
        ];

        let scheduler = build_scheduler(&config).unwrap();
        let table = render_table(scheduler.registry());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("NAME"));
        // Sorted by name
        assert!(lines[1].starts_with("adhoc"));
        assert!(lines[1].contains("manual"));
        assert!(lines[1].ends_with('-'));
        assert!(lines[2].starts_with("paused-prune"));
        assert!(lines[2].contains(" no "));
        assert!(lines[3].starts_with("prune"));
        assert!(lines[3].ends_with("[Europe/Berlin]"));
    }

    #[test]
    fn test_render_empty_registry() {
        let registry = JobRegistry::new(jiff::tz::TimeZone::UTC);
        assert_eq!(render_table(&registry), "No jobs configured");
    }
}
