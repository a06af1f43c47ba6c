//! Logging setup for nfslock.
//!
//! Log lines go to stderr so they never mix with the supervised command's
//! stdout. `RUST_LOG`, when set, takes precedence over the configured
//! verbosity.

use crate::config::Verbosity;
use tracing_subscriber::EnvFilter;

/// Build the filter for `verbosity`, honouring `RUST_LOG`.
pub fn filter_for(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(verbosity.level_filter().into())
        .from_env_lossy()
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
