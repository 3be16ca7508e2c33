// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration read from `relog.toml`
//!
//! Every field is optional; a missing file yields the defaults.
//!
//! ```toml
//! process_lock_wait = "30s"
//! retry_delay = "5m"
//! ```

use crate::coordination::DEFAULT_LOCK_WAIT;
use crate::pipeline::{PipelineConfig, DEFAULT_RETRY_DELAY, DEFAULT_RETRY_JOB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file inside the state directory
pub const CONFIG_FILE: &str = "relog.toml";

/// Identity used for the caller lock when none is configured
pub const DEFAULT_CALLER_ID: &str = "default";

/// How often the timer runner checks for due timers
pub const DEFAULT_TIMER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Errors that can occur loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML syntax error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Names the caller lock that guards pending rows and the job registry.
    ///
    /// That bookkeeping is shared by everything using the state directory,
    /// so every instance on one state directory must use the same id.
    /// Instances with different ids take different locks and can lose each
    /// other's pending rows or job records.
    pub caller_id: String,
    #[serde(with = "humantime_serde")]
    pub process_lock_wait: Duration,
    #[serde(with = "humantime_serde")]
    pub caller_lock_wait: Duration,
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Prefix of the per-log retry job names
    pub retry_job: String,
    #[serde(with = "humantime_serde")]
    pub timer_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            caller_id: DEFAULT_CALLER_ID.to_string(),
            process_lock_wait: DEFAULT_LOCK_WAIT,
            caller_lock_wait: DEFAULT_LOCK_WAIT,
            retry_delay: DEFAULT_RETRY_DELAY,
            retry_job: DEFAULT_RETRY_JOB.to_string(),
            timer_poll_interval: DEFAULT_TIMER_POLL_INTERVAL,
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `relog.toml` from `state_dir`, or the defaults if it is absent
    pub fn load(state_dir: &Path) -> Result<Self, ConfigError> {
        let path = state_dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            retry_job: self.retry_job.clone(),
            retry_delay: self.retry_delay,
            process_lock_wait: self.process_lock_wait,
            caller_lock_wait: self.caller_lock_wait,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // Both names end up in file names and property keys
        for (field, value) in [("caller_id", &self.caller_id), ("retry_job", &self.retry_job)] {
            if value.is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
            if let Some(c) = value
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
            {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("unexpected character {:?}", c),
                });
            }
        }

        if self.timer_poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "timer_poll_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
