use crate::collectors::COLLECTOR_NAMES;
use std::collections::BTreeSet;

/// Names of the scrape-driven collectors to run, as resolved from the
/// `--collector.<name>` / `--no-collector.<name>` flags.
#[derive(Clone, Debug, Default)]
pub struct CollectorConfig {
    enabled: BTreeSet<String>,
}

impl CollectorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_enabled(mut self, collectors: &[String]) -> Self {
        self.enabled = collectors.iter().map(|c| c.trim().to_string()).collect();
        self
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    /// Enabled names that match no known collector.
    #[must_use]
    pub fn unknown(&self) -> Vec<&str> {
        self.enabled
            .iter()
            .map(String::as_str)
            .filter(|name| !COLLECTOR_NAMES.iter().any(|known| known == name))
            .collect()
    }
}
