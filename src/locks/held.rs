//! RAII handle for an acquired lock.

use super::descriptor::LockDescriptor;
use super::refresher::LeaseRefresher;
use crate::error::{LockError, Result};
use crate::fs::adapter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A lock this process holds.
///
/// When dropped, the refresher is stopped and the lock file is deleted. If
/// deletion fails during drop, a warning is logged but no panic occurs. A
/// lock file that no longer contains our descriptor is never deleted.
#[derive(Debug)]
pub struct HeldLock {
    descriptor: LockDescriptor,
    refresher: Option<LeaseRefresher>,
    released: bool,
}

impl HeldLock {
    pub(super) fn new(descriptor: LockDescriptor) -> Self {
        Self {
            descriptor,
            refresher: None,
            released: false,
        }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.descriptor.path
    }

    pub fn descriptor(&self) -> &LockDescriptor {
        &self.descriptor
    }

    /// Start renewing the lease every `interval` until release.
    pub fn start_refresher(&mut self, interval: Duration) -> Result<()> {
        if self.refresher.is_none() {
            self.refresher = Some(LeaseRefresher::spawn(self.descriptor.clone(), interval)?);
            tracing::debug!(
                lock = %self.path().display(),
                interval_ms = interval.as_millis() as u64,
                "lease refresher started"
            );
        }
        Ok(())
    }

    /// Whether the refresher discovered that the lock is no longer ours.
    pub fn lease_lost(&self) -> bool {
        self.refresher.as_ref().is_some_and(LeaseRefresher::is_lost)
    }

    /// Release the lock: stop the refresher, then unlink the descriptor.
    ///
    /// Returns `LeaseLost` if the lock had already been taken from us.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.release_inner()
    }

    /// Leave the lock file in place and forget about it.
    ///
    /// No refresher keeps the lease alive afterwards; whoever removes the
    /// file later (or a contender once it goes stale) ends the lock.
    pub fn hold(mut self) -> PathBuf {
        self.released = true;
        if let Some(refresher) = self.refresher.take()
            && let Err(e) = refresher.stop()
        {
            tracing::warn!(error = %e, "lease refresher reported an error");
        }
        self.descriptor.path.clone()
    }

    fn release_inner(&mut self) -> Result<()> {
        // No touch may happen once the descriptor is unlinked.
        let refreshed = match self.refresher.take() {
            Some(refresher) => refresher.stop(),
            None => Ok(()),
        };

        let path = &self.descriptor.path;
        if !self.descriptor.is_current()? {
            tracing::warn!(lock = %path.display(), "lock was taken from us; not removing it");
            return Err(LockError::LeaseLost(path.clone()));
        }

        adapter::remove_if_exists(path)?;
        let held_for = adapter::now()
            .duration_since(self.descriptor.created_at)
            .unwrap_or_default();
        tracing::debug!(
            lock = %path.display(),
            held_ms = held_for.as_millis() as u64,
            "lock released"
        );
        refreshed
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.release_inner() {
                tracing::warn!(
                    lock = %self.descriptor.path.display(),
                    error = %e,
                    "failed to release lock"
                );
            }
        }
    }
}
