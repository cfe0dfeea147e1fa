//! Runtime configuration
//!
//! TOML file plus CLI overrides. Every knob has a default matching the
//! classic task-manager cadence: a 2 second tick, a 3 second graceful
//! timeout, and 60 samples of memory history.

use crate::error::{Result, TaskmonError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interval between sampling ticks, in milliseconds
    pub tick_interval_ms: u64,
    /// Bound on the graceful-termination wait, in milliseconds
    pub graceful_timeout_ms: u64,
    /// Number of memory samples kept for the graph
    pub memory_history_capacity: usize,
    /// Proc filesystem root; only changed by tests and sandboxes
    pub proc_root: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
            graceful_timeout_ms: 3000,
            memory_history_capacity: 60,
            proc_root: "/proc".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML file
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TaskmonError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TaskmonError::Config(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(TaskmonError::Config(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        if self.memory_history_capacity == 0 {
            return Err(TaskmonError::Config(
                "memory_history_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn graceful_timeout(&self) -> Duration {
        Duration::from_millis(self.graceful_timeout_ms)
    }

    /// Generate a sample config file
    pub fn sample_toml() -> String {
        r#"# taskmon configuration
tick_interval_ms = 2000
graceful_timeout_ms = 3000
memory_history_capacity = 60
# proc_root = "/proc"
"#
        .into()
    }
}
