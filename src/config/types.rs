//! Configuration types and defaults for nfslock.
//!
//! The `Config` struct stores plain integers (seconds, counts) exactly as
//! they appear on the command line or in YAML. The policy structs below are
//! the typed, immutable views the lock engine consumes.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::level_filters::LevelFilter;

/// Log verbosity, ordered from quietest to loudest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Only fatal conditions, printed by the entry point.
    Fatal,
    Error,
    /// Warnings and errors (default).
    #[default]
    Warn,
    Info,
    Debug,
}

impl Verbosity {
    /// The tracing filter corresponding to this verbosity.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Fatal => LevelFilter::OFF,
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Info => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Retry and backoff parameters for a single acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of waits after contention (`None` = unbounded).
    pub retries: Option<u32>,
    /// Backoff growth per attempt.
    pub sleep_inc: Duration,
    /// Backoff floor.
    pub min_sleep: Duration,
    /// Backoff ceiling.
    pub max_sleep: Duration,
    /// Extra wait after losing a reclamation race.
    pub suspend: Duration,
    /// Wall-clock ceiling (`None` = unbounded).
    pub timeout: Option<Duration>,
    /// Existence polling used while waiting between attempts.
    pub poll: PollPolicy,
}

/// Tighter backoff for checking whether a contended lock has gone away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum existence checks per wait; 0 disables polling.
    pub retries: u32,
    /// Ceiling for a single poll interval.
    pub max_sleep: Duration,
}

/// Lease parameters shared by holders and contenders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeasePolicy {
    /// Age past which an unrefreshed descriptor is abandoned.
    pub max_age: Duration,
    /// Interval at which a holder renews its descriptor's mtime.
    pub refresh: Duration,
}

pub(crate) fn default_retries() -> i64 {
    -1
}

pub(crate) fn default_max_age() -> u64 {
    300
}

pub(crate) fn default_sleep_inc() -> u64 {
    5
}

pub(crate) fn default_min_sleep() -> u64 {
    5
}

pub(crate) fn default_max_sleep() -> u64 {
    60
}

pub(crate) fn default_suspend() -> u64 {
    15
}

pub(crate) fn default_poll_retries() -> u32 {
    10
}

pub(crate) fn default_poll_max_sleep() -> u64 {
    5
}

/// Refresh interval used when none is configured: a fifth of the lease.
pub(crate) fn derived_refresh(max_age: u64) -> u64 {
    (max_age / 5).max(1)
}
