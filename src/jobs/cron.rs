//! Cron schedules evaluated with `croner`.
//!
//! Accepts the classic five-field form (`minute hour day-of-month month
//! day-of-week`) and a six-field form with a leading seconds field, plus the
//! `@hourly`-style macros. `croner` matches wall-clock times; this module maps
//! them onto instants in a time zone. When both day fields are restricted a
//! day matches if either one does, as in Vixie cron. A day field starting with
//! `*` or `?` counts as unrestricted.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Timelike, Utc};
use croner::Cron;
use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;

use crate::jobs::error::{JobError, JobResult};

/// A parsed cron schedule.
#[derive(Clone)]
pub struct CronExpression {
    source: String,
    /// One pattern, or one per day field when both are restricted.
    patterns: Arc<[Cron]>,
}

impl CronExpression {
    pub fn parse(expression: &str) -> JobResult<Self> {
        let trimmed = expression.trim();
        let expanded = if trimmed.starts_with('@') {
            expand_macro(trimmed)
                .ok_or_else(|| JobError::invalid_schedule(trimmed, "unknown macro"))?
        } else {
            trimmed
        };

        let fields: Vec<&str> = expanded.split_whitespace().collect();
        let (second, rest) = match fields.len() {
            5 => ("0", &fields[..]),
            6 => (fields[0], &fields[1..]),
            n => {
                return Err(JobError::invalid_schedule(
                    trimmed,
                    format!("expected 5 or 6 fields, found {}", n),
                ));
            }
        };
        if [second, rest[0], rest[1], rest[3]].iter().any(|f| f.contains('?')) {
            return Err(JobError::invalid_schedule(
                trimmed,
                "'?' is only allowed in the day fields",
            ));
        }

        let day_of_month = rest[2].replace('?', "*");
        let day_of_week = rest[4].replace('?', "*");
        let day_fields = if is_unrestricted(&day_of_month) || is_unrestricted(&day_of_week) {
            vec![(day_of_month.as_str(), day_of_week.as_str())]
        } else {
            vec![(day_of_month.as_str(), "*"), ("*", day_of_week.as_str())]
        };

        let patterns = day_fields
            .into_iter()
            .map(|(dom, dow)| {
                let pattern = format!("{} {} {} {} {} {}", second, rest[0], rest[1], dom, rest[3], dow);
                Cron::new(&pattern)
                    .with_seconds_optional()
                    .with_dom_and_dow()
                    .parse()
                    .map_err(|e| JobError::invalid_schedule(trimmed, e.to_string()))
            })
            .collect::<JobResult<Vec<_>>>()?;

        Ok(Self {
            source: trimmed.to_string(),
            patterns: patterns.into(),
        })
    }

    /// The expression as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether a wall-clock time satisfies the expression. Sub-second
    /// precision is ignored.
    pub fn matches(&self, datetime: DateTime) -> bool {
        let Some(civil) = to_chrono(datetime) else {
            return false;
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.is_time_matching(&civil).unwrap_or(false))
    }

    /// Earliest instant strictly after `after` that satisfies the expression
    /// when read as wall-clock time in `tz`.
    ///
    /// Wall-clock times skipped by a DST gap never fire; times repeated by a
    /// DST fold fire once, on their first occurrence.
    pub fn next_fire_time(&self, after: Timestamp, tz: &TimeZone) -> JobResult<Timestamp> {
        let mut cursor = after.to_zoned(tz.clone()).datetime();
        loop {
            let candidate = self.next_civil_after(cursor)?;
            let zoned = candidate
                .to_zoned(tz.clone())
                .map_err(|e| JobError::invalid_schedule(&self.source, e.to_string()))?;
            if zoned.datetime() == candidate && zoned.timestamp() > after {
                return Ok(zoned.timestamp());
            }
            cursor = candidate;
        }
    }

    /// The next `count` fire times after `after`.
    pub fn upcoming(
        &self,
        after: Timestamp,
        tz: &TimeZone,
        count: usize,
    ) -> JobResult<Vec<Timestamp>> {
        let mut times = Vec::with_capacity(count);
        let mut cursor = after;
        for _ in 0..count {
            cursor = self.next_fire_time(cursor, tz)?;
            times.push(cursor);
        }
        Ok(times)
    }

    /// Next matching wall-clock time strictly after `after`, evaluated in
    /// UTC so that `croner` never sees a DST transition.
    fn next_civil_after(&self, after: DateTime) -> JobResult<DateTime> {
        let start = to_chrono(after).ok_or_else(|| {
            JobError::invalid_schedule(&self.source, format!("{} is out of range", after))
        })?;

        let mut earliest = None;
        let mut last_error = None;
        for pattern in self.patterns.iter() {
            match pattern.find_next_occurrence(&start, false) {
                Ok(next) => {
                    earliest = Some(earliest.map_or(next, |e: chrono::DateTime<Utc>| e.min(next)));
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        earliest.and_then(from_chrono).ok_or_else(|| {
            let reason = last_error.unwrap_or_else(|| "expression never fires".to_string());
            JobError::invalid_schedule(&self.source, reason)
        })
    }
}

impl PartialEq for CronExpression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for CronExpression {}

impl fmt::Debug for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronExpression").field(&self.source).finish()
    }
}

impl FromStr for CronExpression {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Earliest timestamp strictly after `after` satisfying `schedule` in `tz`.
pub fn next_fire_time(
    schedule: &CronExpression,
    after: Timestamp,
    tz: &TimeZone,
) -> JobResult<Timestamp> {
    schedule.next_fire_time(after, tz)
}

fn expand_macro(text: &str) -> Option<&'static str> {
    match text.to_ascii_lowercase().as_str() {
        "@yearly" | "@annually" => Some("0 0 1 1 *"),
        "@monthly" => Some("0 0 1 * *"),
        "@weekly" => Some("0 0 * * 0"),
        "@daily" | "@midnight" => Some("0 0 * * *"),
        "@hourly" => Some("0 * * * *"),
        _ => None,
    }
}

fn is_unrestricted(field: &str) -> bool {
    field.starts_with('*')
}

fn to_chrono(datetime: DateTime) -> Option<chrono::DateTime<Utc>> {
    NaiveDate::from_ymd_opt(
        i32::from(datetime.year()),
        datetime.month() as u32,
        datetime.day() as u32,
    )?
    .and_hms_opt(
        datetime.hour() as u32,
        datetime.minute() as u32,
        datetime.second() as u32,
    )
    .map(|naive| naive.and_utc())
}

fn from_chrono(datetime: chrono::DateTime<Utc>) -> Option<DateTime> {
    DateTime::new(
        i16::try_from(datetime.year()).ok()?,
        datetime.month() as i8,
        datetime.day() as i8,
        datetime.hour() as i8,
        datetime.minute() as i8,
        datetime.second() as i8,
        0,
    )
    .ok()
}
