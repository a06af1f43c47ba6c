//! Run context for nfslock.
//!
//! Every component receives a `LockContext` by reference instead of reaching
//! for process-wide state. It carries the validated configuration, the
//! identity of this host and process, and the shutdown flag raised by
//! SIGINT/SIGTERM.

use crate::config::Config;
use crate::error::{LockError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest uninterrupted slice of any sleep.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Who is contending for a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    /// Hostname as reported by the OS.
    pub hostname: String,

    /// Process ID of this invocation.
    pub pid: u32,
}

impl HostIdentity {
    /// Identity of the current process on the current host.
    pub fn current() -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            hostname,
            pid: std::process::id(),
        }
    }

    /// Owner string written into lock descriptors (`host:pid`).
    pub fn owner(&self) -> String {
        format!("{}:{}", self.hostname, self.pid)
    }

    /// Hostname reduced to characters that are safe inside a file name.
    pub fn tag(&self) -> String {
        sanitize_host(&self.hostname)
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_host(hostname: &str) -> String {
    let tag: String = hostname
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if tag.is_empty() {
        "unknown".to_string()
    } else {
        tag
    }
}

/// Cooperative shutdown flag shared with the signal handler.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag on SIGINT/SIGTERM.
    ///
    /// Can only be installed once per process; later calls are logged and
    /// ignored so tests can build several contexts.
    pub fn install_signal_handler(&self) {
        let flag = Arc::clone(&self.0);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::debug!(error = %e, "shutdown handler not installed");
        }
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a lock operation needs to know about its environment.
#[derive(Debug, Clone)]
pub struct LockContext {
    /// Validated configuration for this invocation.
    pub config: Config,

    /// This host and process.
    pub host: HostIdentity,

    /// Raised when the process is asked to stop.
    pub shutdown: ShutdownFlag,
}

impl LockContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            host: HostIdentity::current(),
            shutdown: ShutdownFlag::new(),
        }
    }

    /// Fail with `Interrupted` once shutdown has been requested.
    pub fn check_interrupted(&self) -> Result<()> {
        if self.shutdown.is_requested() {
            Err(LockError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early with `Interrupted` on shutdown.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            self.check_interrupted()?;
            let left = duration.saturating_sub(started.elapsed());
            if left.is_zero() {
                return Ok(());
            }
            std::thread::sleep(left.min(SLEEP_SLICE));
        }
    }
}
