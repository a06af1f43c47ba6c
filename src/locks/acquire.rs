//! The acquisition engine.
//!
//! Each attempt writes a descriptor into a uniquely named temporary file and
//! hard-links it onto the lock path. The filesystem decides who wins; no
//! in-memory check is ever trusted. On contention the existing lock is
//! inspected: a stale lock is reclaimed and the attempt repeated at once, a
//! live one is waited out with backoff until the retry or time budget runs
//! out.

use super::backoff;
use super::descriptor::{DescriptorContent, ForeignLock, LockDescriptor};
use super::held::HeldLock;
use super::staleness::{self, Inspection, Reclaim};
use crate::config::{LeasePolicy, RetryPolicy};
use crate::context::LockContext;
use crate::error::{LockError, Result};
use crate::fs::{TempArtifact, TempName, adapter};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// Immediate re-attempts (after a reclaim or a vanished lock) allowed before
/// the engine backs off. Bounds reclamation storms between contenders.
pub const MAX_RECLAIMS_PER_ROUND: u32 = 3;

/// Removes a lock observed stale, as [`staleness::reclaim`] does.
pub(super) type Reclaimer = fn(&Path, SystemTime, Duration) -> Result<Reclaim>;

/// Acquire the lock at `path`.
///
/// # Returns
///
/// * `Ok(HeldLock)` - The descriptor is linked at `path` and owned by us
/// * `Err(LockError::Timeout)` - `retries` or `timeout` exhausted
/// * `Err(LockError::Io)` - Unexpected filesystem failure (not retried)
/// * `Err(LockError::Interrupted)` - Shutdown requested while waiting
pub fn acquire(
    ctx: &LockContext,
    path: &Path,
    retry: &RetryPolicy,
    lease: &LeasePolicy,
) -> Result<HeldLock> {
    acquire_with(ctx, path, retry, lease, staleness::reclaim)
}

/// [`acquire`] with the reclamation step supplied by the caller.
pub(super) fn acquire_with(
    ctx: &LockContext,
    path: &Path,
    retry: &RetryPolicy,
    lease: &LeasePolicy,
    reclaim: Reclaimer,
) -> Result<HeldLock> {
    Acquisition::new(ctx, path, retry, lease, reclaim)?.run()
}

/// Result of a single link attempt.
enum Attempt {
    Won(LockDescriptor),
    Contended,
}

struct Acquisition<'a> {
    ctx: &'a LockContext,
    target: PathBuf,
    lock_name: String,
    retry: &'a RetryPolicy,
    lease: &'a LeasePolicy,
    reclaim: Reclaimer,
    started: Instant,
    deadline: Option<Instant>,
    generation: u64,
    waits: u32,
}

impl<'a> Acquisition<'a> {
    fn new(
        ctx: &'a LockContext,
        path: &Path,
        retry: &'a RetryPolicy,
        lease: &'a LeasePolicy,
        reclaim: Reclaimer,
    ) -> Result<Self> {
        let lock_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                LockError::Config(format!("invalid lock path '{}'", path.display()))
            })?
            .to_string();

        let started = Instant::now();
        Ok(Self {
            ctx,
            target: path.to_path_buf(),
            lock_name,
            retry,
            lease,
            reclaim,
            started,
            // A timeout beyond the clock's range never expires.
            deadline: retry.timeout.and_then(|t| started.checked_add(t)),
            generation: 0,
            waits: 0,
        })
    }

    fn run(mut self) -> Result<HeldLock> {
        loop {
            let mut immediate = 0;
            let mut suspend = false;

            // Attempt, reclaiming stale locks, until we must wait.
            loop {
                self.ctx.check_interrupted()?;

                if let Attempt::Won(descriptor) = self.attempt()? {
                    tracing::info!(
                        lock = %self.target.display(),
                        generation = descriptor.content.generation,
                        elapsed_ms = self.started.elapsed().as_millis() as u64,
                        "lock acquired"
                    );
                    return Ok(HeldLock::new(descriptor));
                }

                if immediate >= MAX_RECLAIMS_PER_ROUND {
                    break;
                }

                match staleness::inspect(&self.target, self.lease.max_age)? {
                    Inspection::Absent => {
                        immediate += 1;
                    }
                    Inspection::Fresh { age } => {
                        tracing::debug!(
                            lock = %self.target.display(),
                            age_ms = age.as_millis() as u64,
                            "lock is held"
                        );
                        break;
                    }
                    Inspection::Stale { modified, age } => {
                        immediate += 1;
                        match (self.reclaim)(&self.target, modified, self.lease.max_age)? {
                            Reclaim::Removed => {
                                tracing::warn!(
                                    lock = %self.target.display(),
                                    age_secs = age.as_secs(),
                                    "removed stale lock"
                                );
                            }
                            Reclaim::Refreshed | Reclaim::Vanished => {
                                tracing::debug!(
                                    lock = %self.target.display(),
                                    "lost reclamation race"
                                );
                                suspend = true;
                                break;
                            }
                        }
                    }
                }
            }

            self.wait(suspend)?;
        }
    }

    /// Materialize a descriptor and try to link it into place.
    fn attempt(&mut self) -> Result<Attempt> {
        self.generation += 1;

        let host = &self.ctx.host;
        let name = TempName::new(&self.lock_name, &host.tag(), host.pid);
        let temp_path = self
            .target
            .parent()
            .map(|p| p.join(name.file_name()))
            .unwrap_or_else(|| PathBuf::from(name.file_name()));

        let content = DescriptorContent::new(host, &name.token, self.generation);
        let raw = content.to_json()?;

        adapter::create_exclusive(&temp_path, raw.as_bytes())?;
        let temp = TempArtifact::adopt(temp_path);

        if !adapter::link_exclusive(temp.path(), &self.target)? {
            return Ok(Attempt::Contended);
        }
        adapter::sync_parent(&self.target);

        let created_at = adapter::modified(temp.path())?.unwrap_or_else(adapter::now);
        Ok(Attempt::Won(LockDescriptor {
            path: self.target.clone(),
            content,
            raw,
            created_at,
        }))
    }

    /// Spend one retry waiting for the current holder.
    fn wait(&mut self, suspend: bool) -> Result<()> {
        self.waits += 1;
        if let Some(retries) = self.retry.retries
            && self.waits > retries
        {
            return Err(self.timeout());
        }

        let mut delay = backoff::with_jitter(backoff::retry_delay(self.retry, self.waits));
        if suspend {
            delay = delay.saturating_add(self.retry.suspend);
        }

        if let Some(deadline) = self.deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(self.timeout());
            }
            delay = delay.min(deadline - now);
        }

        tracing::debug!(
            lock = %self.target.display(),
            wait = self.waits,
            delay_ms = delay.as_millis() as u64,
            suspend,
            "waiting for lock"
        );
        self.wait_for_release(delay)
    }

    /// Sleep up to `delay`, returning early once the lock file is gone.
    fn wait_for_release(&self, delay: Duration) -> Result<()> {
        let waiting = Instant::now();
        let remaining = || delay.saturating_sub(waiting.elapsed());

        for poll in 0..self.retry.poll.retries {
            let left = remaining();
            if left.is_zero() {
                return Ok(());
            }
            self.ctx.sleep(backoff::poll_delay(&self.retry.poll, poll).min(left))?;
            if adapter::modified(&self.target)?.is_none() {
                tracing::debug!(lock = %self.target.display(), "lock released by holder");
                return Ok(());
            }
        }

        self.ctx.sleep(remaining())
    }

    fn timeout(&self) -> LockError {
        LockError::Timeout {
            path: self.target.clone(),
            attempts: u32::try_from(self.generation).unwrap_or(u32::MAX),
            elapsed: self.started.elapsed(),
            holder: ForeignLock::read(&self.target).map(|h| h.to_string()),
        }
    }
}
