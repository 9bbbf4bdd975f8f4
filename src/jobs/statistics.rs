use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const NUM_SUCCEEDED: &str = "NumSucceeded";
pub const NUM_SKIPPED: &str = "NumSkipped";
pub const NUM_ERRORS: &str = "NumErrors";

/// Progress counters for one execution run.
///
/// The three well-known counters are always present. Jobs add their own
/// counters by name; they serialize alongside the well-known ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobStatistics {
    counters: BTreeMap<String, u64>,
}

impl JobStatistics {
    pub fn new() -> Self {
        let counters = [NUM_SUCCEEDED, NUM_SKIPPED, NUM_ERRORS]
            .into_iter()
            .map(|key| (key.to_string(), 0))
            .collect();
        Self { counters }
    }

    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: &str, amount: u64) {
        let counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter = counter.saturating_add(amount);
    }

    pub fn set(&mut self, key: &str, value: u64) {
        self.counters.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> u64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    pub fn record_success(&mut self) {
        self.increment(NUM_SUCCEEDED);
    }

    pub fn record_skip(&mut self) {
        self.increment(NUM_SKIPPED);
    }

    pub fn record_error(&mut self) {
        self.increment(NUM_ERRORS);
    }

    pub fn num_succeeded(&self) -> u64 {
        self.get(NUM_SUCCEEDED)
    }

    pub fn num_skipped(&self) -> u64 {
        self.get(NUM_SKIPPED)
    }

    pub fn num_errors(&self) -> u64 {
        self.get(NUM_ERRORS)
    }

    /// Units processed so far, whatever their result.
    pub fn processed(&self) -> u64 {
        self.num_succeeded() + self.num_skipped() + self.num_errors()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

impl Default for JobStatistics {
    fn default() -> Self {
        Self::new()
    }
}
