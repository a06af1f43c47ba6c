//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a single nfslock invocation.
///
/// Loaded from an optional YAML file and then overridden by command-line
/// flags. Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Acquisition
    // =========================================================================
    /// Waits allowed after contention; -1 retries forever.
    #[serde(default = "default_retries")]
    pub retries: i64,

    /// Backoff growth per attempt, in seconds.
    #[serde(default = "default_sleep_inc")]
    pub sleep_inc: u64,

    /// Backoff floor, in seconds.
    #[serde(default = "default_min_sleep")]
    pub min_sleep: u64,

    /// Backoff ceiling, in seconds.
    #[serde(default = "default_max_sleep")]
    pub max_sleep: u64,

    /// Forced wait after losing a reclamation race, in seconds.
    #[serde(default = "default_suspend")]
    pub suspend: u64,

    /// Wall-clock limit for acquisition in seconds; 0 waits forever.
    #[serde(default)]
    pub timeout: u64,

    /// Existence checks per wait between attempts.
    #[serde(default = "default_poll_retries")]
    pub poll_retries: u32,

    /// Ceiling for a single existence-check interval, in seconds.
    #[serde(default = "default_poll_max_sleep")]
    pub poll_max_sleep: u64,

    // =========================================================================
    // Lease
    // =========================================================================
    /// Seconds after which an unrefreshed lock is considered abandoned.
    #[serde(default = "default_max_age")]
    pub max_age: u64,

    /// Seconds between mtime renewals while held (default: max_age / 5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<u64>,

    // =========================================================================
    // Housekeeping and logging
    // =========================================================================
    /// Skip removing orphaned temporary files left by this host.
    #[serde(default)]
    pub dont_sweep: bool,

    /// Shorthand for `verbosity: debug`.
    #[serde(default)]
    pub debug: bool,

    /// Log verbosity.
    #[serde(default)]
    pub verbosity: Verbosity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            sleep_inc: default_sleep_inc(),
            min_sleep: default_min_sleep(),
            max_sleep: default_max_sleep(),
            suspend: default_suspend(),
            timeout: 0,
            poll_retries: default_poll_retries(),
            poll_max_sleep: default_poll_max_sleep(),
            max_age: default_max_age(),
            refresh: None,
            dont_sweep: false,
            debug: false,
            verbosity: Verbosity::default(),
        }
    }
}
