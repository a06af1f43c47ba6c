//! Background lease renewal for a held lock.

use super::descriptor::LockDescriptor;
use crate::error::{LockError, Result};
use crate::fs::adapter;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Thread that touches a held descriptor every `interval`.
///
/// Before each touch it checks that the lock file still contains our
/// descriptor. If the file vanished or now belongs to someone else, the
/// shared `lost` flag is raised and the thread exits with `LeaseLost`; the
/// holder must stop relying on the lock.
#[derive(Debug)]
pub struct LeaseRefresher {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<Result<()>>>,
    lost: Arc<AtomicBool>,
}

impl LeaseRefresher {
    /// Start refreshing `descriptor` every `interval`.
    pub fn spawn(descriptor: LockDescriptor, interval: Duration) -> Result<Self> {
        let (stop, stop_rx) = mpsc::channel::<()>();
        let lost = Arc::new(AtomicBool::new(false));
        let thread_lost = Arc::clone(&lost);

        let handle = thread::Builder::new()
            .name("lease-refresher".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(e) = refresh_once(&descriptor) {
                                thread_lost.store(true, Ordering::SeqCst);
                                tracing::error!(
                                    lock = %descriptor.path.display(),
                                    error = %e,
                                    "lease lost"
                                );
                                return Err(e);
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
                    }
                }
            })
            .map_err(|e| LockError::io("failed to start lease refresher", e))?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
            lost,
        })
    }

    /// Whether the refresher has found the lock gone.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Stop the thread and wait for it to acknowledge.
    ///
    /// Returns `LeaseLost` if the lease was lost while running. After this
    /// returns no further touch can happen, so the descriptor may be unlinked.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        // Dropping the sender wakes the thread with `Disconnected`.
        drop(self.stop.take());

        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(LockError::io(
                    "lease refresher panicked",
                    std::io::Error::other("refresher thread panicked"),
                )),
            },
            None => Ok(()),
        }
    }
}

impl Drop for LeaseRefresher {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Verify ownership, then renew the mtime.
fn refresh_once(descriptor: &LockDescriptor) -> Result<()> {
    match descriptor.is_current() {
        Ok(true) => {}
        Ok(false) => return Err(LockError::LeaseLost(descriptor.path.clone())),
        Err(e) => {
            tracing::warn!(error = %e, "could not verify lock ownership");
            return Ok(());
        }
    }

    match adapter::touch(&descriptor.path) {
        Ok(()) => {
            tracing::trace!(lock = %descriptor.path.display(), "lease refreshed");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(LockError::LeaseLost(descriptor.path.clone()))
        }
        Err(e) => {
            // A transient NFS error; the next tick tries again.
            tracing::warn!(
                lock = %descriptor.path.display(),
                error = %e,
                "failed to refresh lease"
            );
            Ok(())
        }
    }
}
