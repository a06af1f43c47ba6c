//! Config loading, validation, and policy derivation.

use super::model::Config;
use super::types::{LeasePolicy, PollPolicy, RetryPolicy, Verbosity, derived_refresh};
use crate::error::{LockError, Result};
use std::path::Path;
use std::time::Duration;

/// Largest accepted value, in seconds, for any time setting (one year).
pub const MAX_SECONDS: u64 = 365 * 24 * 60 * 60;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields are silently ignored. The result is validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LockError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `retries` is -1 (unbounded) or between 0 and `u32::MAX`
    /// - time settings are at most `MAX_SECONDS`
    /// - `max_age` and `refresh` are positive
    /// - `refresh < max_age`, otherwise live holders look stale
    /// - `min_sleep <= max_sleep`
    pub fn validate(&self) -> Result<()> {
        if self.retries < -1 {
            return Err(LockError::Config(format!(
                "retries must be -1 (forever) or >= 0, got {}",
                self.retries
            )));
        }
        if self.retries > i64::from(u32::MAX) {
            return Err(LockError::Config(format!(
                "retries must be at most {}, got {}",
                u32::MAX,
                self.retries
            )));
        }

        for (name, secs) in [
            ("max_age", self.max_age),
            ("refresh", self.refresh_secs()),
            ("sleep_inc", self.sleep_inc),
            ("min_sleep", self.min_sleep),
            ("max_sleep", self.max_sleep),
            ("suspend", self.suspend),
            ("timeout", self.timeout),
            ("poll_max_sleep", self.poll_max_sleep),
        ] {
            if secs > MAX_SECONDS {
                return Err(LockError::Config(format!(
                    "{} must be at most {}s, got {}s",
                    name, MAX_SECONDS, secs
                )));
            }
        }

        if self.max_age == 0 {
            return Err(LockError::Config("max_age must be greater than 0".to_string()));
        }

        let refresh = self.refresh_secs();
        if refresh == 0 {
            return Err(LockError::Config("refresh must be greater than 0".to_string()));
        }
        if refresh >= self.max_age {
            return Err(LockError::Config(format!(
                "refresh ({}s) must be less than max_age ({}s)",
                refresh, self.max_age
            )));
        }

        if self.min_sleep > self.max_sleep {
            return Err(LockError::Config(format!(
                "min_sleep ({}s) must not exceed max_sleep ({}s)",
                self.min_sleep, self.max_sleep
            )));
        }

        Ok(())
    }

    /// Effective refresh interval in seconds.
    pub fn refresh_secs(&self) -> u64 {
        self.refresh.unwrap_or_else(|| derived_refresh(self.max_age))
    }

    /// Effective log verbosity, honouring `debug`.
    pub fn effective_verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else {
            self.verbosity
        }
    }

    /// Retry policy for the acquisition engine.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: (self.retries >= 0)
                .then(|| u32::try_from(self.retries).unwrap_or(u32::MAX)),
            sleep_inc: Duration::from_secs(self.sleep_inc),
            min_sleep: Duration::from_secs(self.min_sleep),
            max_sleep: Duration::from_secs(self.max_sleep),
            suspend: Duration::from_secs(self.suspend),
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            poll: PollPolicy {
                retries: self.poll_retries,
                max_sleep: Duration::from_secs(self.poll_max_sleep),
            },
        }
    }

    /// Lease policy shared by the staleness detector and the refresher.
    pub fn lease_policy(&self) -> LeasePolicy {
        LeasePolicy {
            max_age: Duration::from_secs(self.max_age),
            refresh: Duration::from_secs(self.refresh_secs()),
        }
    }
}
