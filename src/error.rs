//! Error types for nfslock.
//!
//! Uses thiserror for derive macros. Every variant is fatal to the current
//! invocation; expected contention never surfaces as an error.

use crate::exit_codes;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// An option value is missing, malformed, or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The retry or wall-clock budget ran out while another process held the lock.
    #[error(
        "timed out acquiring '{}' after {attempts} attempt(s) in {:.1}s{}",
        .path.display(),
        .elapsed.as_secs_f64(),
        .holder.as_deref().map(|h| format!(" (held by {h})")).unwrap_or_default()
    )]
    Timeout {
        path: PathBuf,
        attempts: u32,
        elapsed: Duration,
        holder: Option<String>,
    },

    /// A filesystem operation failed for a reason other than contention.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The held descriptor disappeared or was replaced while we held it.
    #[error("lease lost: '{}' no longer holds our lock", .0.display())]
    LeaseLost(PathBuf),

    /// The supervised command could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A shutdown signal arrived before the operation completed.
    #[error("interrupted")]
    Interrupted,
}

impl LockError {
    /// Wrap an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LockError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockError::Config(_)
            | LockError::Timeout { .. }
            | LockError::Io { .. }
            | LockError::LeaseLost(_)
            | LockError::Spawn { .. }
            | LockError::Interrupted => exit_codes::FAILURE,
        }
    }
}

/// Result type alias for nfslock operations.
pub type Result<T> = std::result::Result<T, LockError>;
