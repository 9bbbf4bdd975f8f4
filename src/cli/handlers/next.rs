//! Next command handler
//!
//! Previews fire times of a cron expression without loading configuration.

use jiff::Timestamp;

use crate::config::resolve_time_zone;
use crate::jobs::CronExpression;

/// Prints upcoming fire times of an expression
pub struct NextCommandHandler {
    expression: String,
    count: usize,
    timezone: Option<String>,
}

impl NextCommandHandler {
    pub fn new(expression: impl Into<String>, count: usize, timezone: Option<String>) -> Self {
        Self {
            expression: expression.into(),
            count,
            timezone,
        }
    }

    pub fn execute(&self) -> anyhow::Result<()> {
        for line in self.upcoming(Timestamp::now())? {
            println!("{}", line);
        }
        Ok(())
    }

    /// Fire times strictly after `after`, one formatted line each.
    pub fn upcoming(&self, after: Timestamp) -> anyhow::Result<Vec<String>> {
        let expression = CronExpression::parse(&self.expression)?;
        let tz = resolve_time_zone(self.timezone.as_deref().unwrap_or("UTC"))
            .map_err(anyhow::Error::msg)?;

        let lines = expression
            .upcoming(after, &tz, self.count)?
            .into_iter()
            .map(|fire| fire.to_zoned(tz.clone()).strftime("%a %Y-%m-%d %H:%M:%S %:z").to_string())
            .collect();
        Ok(lines)
    }
}
