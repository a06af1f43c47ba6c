//! Lease-based staleness detection and reclamation.
//!
//! A lock is stale when its mtime is older than `max_age`. Holders renew the
//! mtime while they run, so a stale lock is one whose holder stopped
//! refreshing: it crashed, its host is gone, or it is far slower than the
//! lease allows. Process liveness is never probed since it cannot be checked
//! across hosts.

use crate::error::Result;
use crate::fs::adapter;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Outcome of looking at a contended lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inspection {
    /// The lock disappeared before we could look at it.
    Absent,
    /// The lease is still valid.
    Fresh { age: Duration },
    /// The lease expired; `modified` is the mtime we observed.
    Stale { modified: SystemTime, age: Duration },
}

/// Outcome of trying to remove a stale lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reclaim {
    /// We removed the stale descriptor.
    Removed,
    /// The descriptor changed since we judged it stale; left alone.
    Refreshed,
    /// Someone else removed it first.
    Vanished,
}

/// Whether a descriptor last modified at `modified` is stale at `now`.
///
/// An mtime in the future (clock skew) is never stale.
pub fn is_stale(modified: SystemTime, now: SystemTime, max_age: Duration) -> bool {
    lease_age(modified, now) > max_age
}

fn lease_age(modified: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(modified).unwrap_or(Duration::ZERO)
}

/// Stat the lock at `path` and classify it.
pub fn inspect(path: &Path, max_age: Duration) -> Result<Inspection> {
    let Some(modified) = adapter::modified(path)? else {
        return Ok(Inspection::Absent);
    };

    let now = adapter::now();
    let age = lease_age(modified, now);
    if is_stale(modified, now, max_age) {
        Ok(Inspection::Stale { modified, age })
    } else {
        Ok(Inspection::Fresh { age })
    }
}

/// Remove a lock previously observed stale with mtime `observed`.
///
/// The lock is re-stated first and only removed if its mtime is unchanged
/// and still stale. This narrows, but cannot close, the window in which the
/// holder refreshes (or another contender replaces the lock) between the
/// check and the unlink.
pub fn reclaim(path: &Path, observed: SystemTime, max_age: Duration) -> Result<Reclaim> {
    let Some(current) = adapter::modified(path)? else {
        return Ok(Reclaim::Vanished);
    };

    if current != observed || !is_stale(current, adapter::now(), max_age) {
        return Ok(Reclaim::Refreshed);
    }

    if adapter::remove_if_exists(path)? {
        Ok(Reclaim::Removed)
    } else {
        Ok(Reclaim::Vanished)
    }
}
