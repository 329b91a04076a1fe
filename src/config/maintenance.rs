//! Maintenance scheduler configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Env var overriding `maintenance-threads-max`.
pub const ENV_THREADS_MAX: &str = "MAINTENANCE_THREADS_MAX";
/// Env var overriding `actions-block-seconds`.
pub const ENV_ACTIONS_BLOCK_SECONDS: &str = "MAINTENANCE_ACTIONS_BLOCK_SECONDS";
/// Env var overriding `actions-linger-seconds`.
pub const ENV_ACTIONS_LINGER_SECONDS: &str = "MAINTENANCE_ACTIONS_LINGER_SECONDS";
/// Env var overriding `wake-interval-ms`.
pub const ENV_WAKE_INTERVAL_MS: &str = "MAINTENANCE_WAKE_INTERVAL_MS";

const MIN_STACK_SIZE: usize = 64 * 1024;

/// Recognized maintenance options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MaintenanceConfig {
    /// Pool size.
    pub maintenance_threads_max: usize,
    /// Minimum seconds a finished action blocks an identical resubmission.
    pub actions_block_seconds: u64,
    /// Minimum seconds a finished action stays queryable before purge.
    pub actions_linger_seconds: u64,
    /// Upper bound in milliseconds on one idle worker wait.
    pub wake_interval_ms: u64,
    /// Stack size in bytes for pool threads.
    pub thread_stack_size: usize,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            maintenance_threads_max: num_cpus::get() / 4 + 1,
            actions_block_seconds: 30,
            actions_linger_seconds: 300,
            wake_interval_ms: 1000,
            thread_stack_size: 2 * 1024 * 1024,
        }
    }
}

impl MaintenanceConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.maintenance_threads_max == 0 {
            return Err("maintenance-threads-max must be greater than 0".into());
        }
        if self.wake_interval_ms == 0 {
            return Err("wake-interval-ms must be greater than 0".into());
        }
        if self.thread_stack_size < MIN_STACK_SIZE {
            return Err(format!("thread-stack-size must be at least {MIN_STACK_SIZE} bytes"));
        }
        if self.actions_block_seconds > self.actions_linger_seconds {
            return Err(format!(
                "actions-block-seconds ({}) must not exceed actions-linger-seconds ({})",
                self.actions_block_seconds, self.actions_linger_seconds
            ));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing keys take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overridden by `MAINTENANCE_*` environment variables, after
    /// loading a `.env` file if one exists.
    ///
    /// # Errors
    ///
    /// Returns a message for an unparsable variable or an invalid result.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `MAINTENANCE_*` keys.
    ///
    /// # Errors
    ///
    /// Returns a message for an unparsable value or an invalid result.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        override_from(&lookup, ENV_THREADS_MAX, &mut cfg.maintenance_threads_max)?;
        override_from(&lookup, ENV_ACTIONS_BLOCK_SECONDS, &mut cfg.actions_block_seconds)?;
        override_from(&lookup, ENV_ACTIONS_LINGER_SECONDS, &mut cfg.actions_linger_seconds)?;
        override_from(&lookup, ENV_WAKE_INTERVAL_MS, &mut cfg.wake_interval_ms)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn override_from<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| format!("{key}={raw:?} is invalid: {e}"))?;
    }
    Ok(())
}
