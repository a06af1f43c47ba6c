//! Temporary artifact naming.
//!
//! Each acquisition attempt materializes its descriptor in a hidden file next
//! to the lock:
//!
//! ```text
//! .<lockname>.<hosttag>.<pid>.<token>.nfslock-tmp
//! ```
//!
//! The host tag lets the sweeper restrict itself to files created on this
//! host; the random token keeps attempts from the same process apart.

use super::adapter;
use rand::Rng;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Suffix shared by every temporary artifact.
pub const TEMP_SUFFIX: &str = "nfslock-tmp";

static TEMP_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.(?P<lock>.+)\.(?P<host>[A-Za-z0-9_-]+)\.(?P<pid>\d+)\.(?P<token>[0-9a-f]{16})\.nfslock-tmp$")
        .expect("invalid temp name regex")
});

/// Components of a parsed temporary artifact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempName {
    /// File name of the lock this artifact was meant for.
    pub lock_name: String,
    /// Sanitized hostname of the creator.
    pub host_tag: String,
    /// Process ID of the creator.
    pub pid: u32,
    /// Per-attempt random token.
    pub token: String,
}

impl TempName {
    /// Build a fresh name for an attempt on `lock_name`.
    pub fn new(lock_name: &str, host_tag: &str, pid: u32) -> Self {
        Self {
            lock_name: lock_name.to_string(),
            host_tag: host_tag.to_string(),
            pid,
            token: random_token(),
        }
    }

    /// Render as a file name.
    pub fn file_name(&self) -> String {
        format!(
            ".{}.{}.{}.{}.{}",
            self.lock_name, self.host_tag, self.pid, self.token, TEMP_SUFFIX
        )
    }
}

/// Parse a directory entry name; `None` if it is not one of our artifacts.
pub fn parse_temp_name(file_name: &str) -> Option<TempName> {
    let caps = TEMP_NAME_REGEX.captures(file_name)?;
    Some(TempName {
        lock_name: caps["lock"].to_string(),
        host_tag: caps["host"].to_string(),
        pid: caps["pid"].parse().ok()?,
        token: caps["token"].to_string(),
    })
}

fn random_token() -> String {
    format!("{:016x}", rand::thread_rng().r#gen::<u64>())
}

/// A temporary artifact that is removed when dropped.
///
/// Removal happens on every exit path of an attempt: success (the lock
/// survives under its own name), contention, error, or timeout.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Take ownership of an artifact that has just been created.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if let Err(e) = adapter::remove_if_exists(&self.path) {
            tracing::warn!(error = %e, "failed to remove temporary file");
        }
    }
}
