//! Top-level run for nfslock.
//!
//! Builds the configuration, sweeps leftovers, acquires the lock, and then
//! either supervises the requested command or leaves the lock held.

use crate::cli::Cli;
use crate::config::Config;
use crate::context::LockContext;
use crate::error::Result;
use crate::exit_codes;
use crate::locks;
use crate::supervisor::{self, CommandLine};
use std::path::Path;
use std::time::Duration;

/// Resolve the effective configuration: defaults, then file, then flags.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let config = cli.apply_to(base);
    config.validate()?;
    Ok(config)
}

/// Run one invocation and return the process exit status.
pub fn run(ctx: &LockContext, lockfile: &Path, argv: &[String]) -> Result<i32> {
    // Copied once; the child sees exactly what was given here.
    let command = CommandLine::from_argv(argv);
    let config = &ctx.config;
    let lease = config.lease_policy();

    if !config.dont_sweep {
        sweep_quietly(ctx, lockfile, lease.max_age);
    }

    let mut lock = locks::acquire(ctx, lockfile, &config.retry_policy(), &lease)?;

    match command {
        Some(command) => {
            lock.start_refresher(lease.refresh)?;
            let exit = supervisor::run_under_lock(ctx, lock, &command)?;
            Ok(exit.exit_status())
        }
        None => {
            let path = lock.hold();
            tracing::info!(lock = %path.display(), "lock left held");
            Ok(exit_codes::SUCCESS)
        }
    }
}

/// Sweeping is advisory: a failure is logged and acquisition proceeds.
fn sweep_quietly(ctx: &LockContext, lockfile: &Path, max_age: Duration) {
    let dir = match lockfile.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    match locks::sweep(dir, max_age, &ctx.host) {
        Ok(report) => tracing::debug!(
            removed = report.removed.len(),
            kept = report.kept.len(),
            "sweep finished"
        ),
        Err(e) => tracing::warn!(error = %e, "sweep failed"),
    }
}
