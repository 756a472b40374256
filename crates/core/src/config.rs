// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration: timeouts, caps, and loop intervals.
//!
//! Every field has a working default; a TOML file can override any subset.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunable parameters for one live run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seconds an onboarding flow may run before being abandoned.
    pub onboarding_timeout_secs: u64,
    /// Seconds a unit execution may run before timing out.
    pub unit_timeout_secs: u64,
    /// Seconds an assignment execution may run before timing out.
    pub assignment_timeout_secs: u64,
    /// Seconds to wait for an explicit submit after task logic returns.
    pub submission_timeout_secs: u64,
    /// Seconds of silence after which an unresponsive run is force-expired.
    pub no_submission_patience_secs: u64,

    /// Cap on simultaneously launched ordinary units; 0 = unlimited.
    pub max_num_concurrent_units: usize,
    /// Cap on screening units launched across the whole run.
    pub max_screening_units: usize,
    /// Whether first-time workers are routed through a screening unit.
    pub use_screening_units: bool,
    /// Whether gold units are injected to audit ongoing accuracy.
    pub use_gold_units: bool,
    /// Advisory cap on units one worker may complete; 0 = unlimited.
    pub max_units_per_worker: usize,

    /// Milliseconds between status-request broadcasts to all channels.
    pub status_poll_interval_ms: u64,
    /// Milliseconds the assignment generator sleeps between pulls.
    pub generator_poll_interval_ms: u64,
    /// Milliseconds between unit-launch passes.
    pub launch_pass_interval_ms: u64,
    /// Milliseconds between transport reconnect attempts.
    pub channel_backoff_ms: u64,
    /// Milliseconds a dead transport may retry before escalating.
    pub channel_death_timeout_ms: u64,
    /// Milliseconds allowed per shutdown phase before it is abandoned.
    pub shutdown_phase_timeout_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            onboarding_timeout_secs: 1800,
            unit_timeout_secs: 3600,
            assignment_timeout_secs: 3600,
            submission_timeout_secs: 600,
            no_submission_patience_secs: 86400,
            max_num_concurrent_units: 0,
            max_screening_units: 0,
            use_screening_units: false,
            use_gold_units: false,
            max_units_per_worker: 0,
            status_poll_interval_ms: 4000,
            generator_poll_interval_ms: 500,
            launch_pass_interval_ms: 10_000,
            channel_backoff_ms: 200,
            channel_death_timeout_ms: 10_000,
            shutdown_phase_timeout_ms: 5000,
        }
    }
}

impl RunConfig {
    /// Parse a TOML document; missing fields keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load and parse a TOML config file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn onboarding_timeout(&self) -> Duration {
        Duration::from_secs(self.onboarding_timeout_secs)
    }

    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }

    pub fn assignment_timeout(&self) -> Duration {
        Duration::from_secs(self.assignment_timeout_secs)
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }

    pub fn no_submission_patience(&self) -> Duration {
        Duration::from_secs(self.no_submission_patience_secs)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    pub fn generator_poll_interval(&self) -> Duration {
        Duration::from_millis(self.generator_poll_interval_ms)
    }

    pub fn launch_pass_interval(&self) -> Duration {
        Duration::from_millis(self.launch_pass_interval_ms)
    }

    pub fn channel_backoff(&self) -> Duration {
        Duration::from_millis(self.channel_backoff_ms)
    }

    pub fn channel_death_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_death_timeout_ms)
    }

    pub fn shutdown_phase_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_phase_timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
