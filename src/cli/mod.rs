//! CLI argument parsing for nfslock.
//!
//! Uses clap derive macros for declarative argument definitions. Every
//! configuration flag is optional here so that unset flags fall back to the
//! config file and then to the built-in defaults.

use crate::config::{Config, Verbosity};
use clap::Parser;
use std::path::PathBuf;

/// nfslock: hold an exclusive lock on a shared filesystem.
///
/// Acquires LOCKFILE (waiting for, or reclaiming, locks held by other
/// processes on any host), then runs COMMAND while holding it and releases
/// the lock when COMMAND exits. Without a COMMAND the lock is left in place
/// and nfslock exits immediately; remove LOCKFILE to release it.
#[derive(Parser, Debug)]
#[command(name = "nfslock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path of the lock file, agreed on by every contender.
    pub lockfile: PathBuf,

    /// Command (and arguments) to run while holding the lock.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// YAML file with base settings; flags override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Waits allowed while the lock is held elsewhere (-1 = forever).
    #[arg(short, long, allow_negative_numbers = true)]
    pub retries: Option<i64>,

    /// Seconds after which an unrefreshed lock is considered abandoned.
    #[arg(short = 'a', long, value_name = "SECS")]
    pub max_age: Option<u64>,

    /// Seconds added to the wait on every retry.
    #[arg(long, value_name = "SECS")]
    pub sleep_inc: Option<u64>,

    /// Shortest wait between retries, in seconds.
    #[arg(long, value_name = "SECS")]
    pub min_sleep: Option<u64>,

    /// Longest wait between retries, in seconds.
    #[arg(long, value_name = "SECS")]
    pub max_sleep: Option<u64>,

    /// Extra seconds to wait after losing a race to reclaim a stale lock.
    #[arg(short, long, value_name = "SECS")]
    pub suspend: Option<u64>,

    /// Give up acquiring after this many seconds (0 = never).
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds between lease renewals while the command runs.
    #[arg(long, value_name = "SECS")]
    pub refresh: Option<u64>,

    /// Existence checks per wait while the lock is held elsewhere.
    #[arg(long)]
    pub poll_retries: Option<u32>,

    /// Longest interval between existence checks, in seconds.
    #[arg(long, value_name = "SECS")]
    pub poll_max_sleep: Option<u64>,

    /// Do not remove orphaned temporary files left by this host.
    #[arg(long)]
    pub dont_sweep: bool,

    /// Log everything (same as --verbosity debug).
    #[arg(short, long)]
    pub debug: bool,

    /// Log verbosity.
    #[arg(long, value_enum)]
    pub verbosity: Option<Verbosity>,
}

impl Cli {
    /// Apply the flags that were given on top of `base`.
    pub fn apply_to(&self, base: Config) -> Config {
        let mut config = base;

        if let Some(v) = self.retries {
            config.retries = v;
        }
        if let Some(v) = self.max_age {
            config.max_age = v;
        }
        if let Some(v) = self.sleep_inc {
            config.sleep_inc = v;
        }
        if let Some(v) = self.min_sleep {
            config.min_sleep = v;
        }
        if let Some(v) = self.max_sleep {
            config.max_sleep = v;
        }
        if let Some(v) = self.suspend {
            config.suspend = v;
        }
        if let Some(v) = self.timeout {
            config.timeout = v;
        }
        if let Some(v) = self.refresh {
            config.refresh = Some(v);
        }
        if let Some(v) = self.poll_retries {
            config.poll_retries = v;
        }
        if let Some(v) = self.poll_max_sleep {
            config.poll_max_sleep = v;
        }
        if let Some(v) = self.verbosity {
            config.verbosity = v;
        }
        config.dont_sweep |= self.dont_sweep;
        config.debug |= self.debug;

        config
    }
}
