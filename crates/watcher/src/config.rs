//! Monitor configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::ignore::IgnoreConfig;
use crate::registry::FailurePolicy;

/// Default delay between two passes
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Upper bound on the delay between two passes (one day)
pub const MAX_POLL_INTERVAL_MS: u64 = 24 * 60 * 60 * 1_000;

/// Configuration for a [`Monitor`](crate::Monitor)
///
/// Loadable from TOML:
///
/// ```toml
/// poll_interval_ms = 500
/// listener_failures = "abort"
///
/// [ignore]
/// patterns = ["*.swp", "target/"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Delay between the end of one pass and the start of the next.
    /// Zero rescans immediately.
    pub poll_interval_ms: u64,

    /// How listener failures are handled
    pub listener_failures: FailurePolicy,

    /// Files and directories to leave out of the scan
    pub ignore: IgnoreConfig,
}

impl MonitorConfig {
    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Set the delay between passes
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the listener failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.listener_failures = policy;
        self
    }

    /// Set the ignore configuration
    pub fn with_ignore(mut self, ignore: IgnoreConfig) -> Self {
        self.ignore = ignore;
        self
    }

    /// Delay between passes
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(MonitorError::Config(format!(
                "poll_interval_ms must be at most {} (got {})",
                MAX_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }
        if self.ignore.patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(MonitorError::Config("ignore patterns must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            listener_failures: FailurePolicy::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}
