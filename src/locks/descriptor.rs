//! Lock descriptor content and utilities.

use crate::context::HostIdentity;
use crate::error::{LockError, Result};
use crate::fs::adapter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Content written once into a lock file.
///
/// The content identifies the creator; it is never rewritten. Lease renewal
/// only moves the file's mtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorContent {
    /// Hostname of the creator.
    pub host: String,

    /// Process ID of the creator.
    pub pid: u32,

    /// Random token of the attempt that created this descriptor.
    pub token: String,

    /// Attempt number within the creating process (diagnostics only).
    pub generation: u64,

    /// Creator's wall clock at creation (informational; hosts may disagree).
    pub written_at: DateTime<Utc>,
}

impl DescriptorContent {
    pub fn new(host: &HostIdentity, token: &str, generation: u64) -> Self {
        Self {
            host: host.hostname.clone(),
            pid: host.pid,
            token: token.to_string(),
            generation,
            written_at: Utc::now(),
        }
    }

    /// `host:pid` of the creator.
    pub fn owner(&self) -> String {
        format!("{}:{}", self.host, self.pid)
    }

    /// Serialize to the on-disk form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| LockError::io("failed to serialize lock descriptor", e.into()))
    }

    /// Parse the on-disk form; `None` for partial or foreign content.
    pub fn parse(content: &str) -> Option<Self> {
        serde_json::from_str(content).ok()
    }
}

/// A lock descriptor that this process successfully linked into place.
#[derive(Debug, Clone)]
pub struct LockDescriptor {
    /// Logical lock identity.
    pub path: PathBuf,

    /// What we wrote into the file.
    pub content: DescriptorContent,

    /// Exact bytes on disk, used to recognise our own descriptor later.
    pub raw: String,

    /// Filesystem mtime of the linked artifact when it was created.
    pub created_at: SystemTime,
}

impl LockDescriptor {
    /// `host:pid` of the holder.
    pub fn owner(&self) -> String {
        self.content.owner()
    }

    /// Whether `path` still holds exactly our descriptor.
    pub fn is_current(&self) -> Result<bool> {
        Ok(adapter::read_to_string_opt(&self.path)?.as_deref() == Some(self.raw.as_str()))
    }
}

/// What a contender can learn about someone else's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignLock {
    /// Owner string, if the content could be parsed.
    pub owner: Option<String>,

    /// Time since the last refresh, per the local clock.
    pub age: Duration,
}

impl ForeignLock {
    /// Read the lock at `path` for diagnostics. Never fails: a missing or
    /// unreadable lock yields `None`.
    pub fn read(path: &Path) -> Option<Self> {
        let modified = adapter::modified(path).ok().flatten()?;
        let owner = adapter::read_to_string_opt(path)
            .ok()
            .flatten()
            .and_then(|c| DescriptorContent::parse(&c))
            .map(|c| c.owner());

        Some(Self {
            owner,
            age: adapter::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        })
    }
}

impl std::fmt::Display for ForeignLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, lease age {}s",
            self.owner.as_deref().unwrap_or("unknown owner"),
            self.age.as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn host() -> HostIdentity {
        HostIdentity {
            hostname: "node1".to_string(),
            pid: 99,
        }
    }

    #[test]
    fn content_roundtrips_through_json() {
        let content = DescriptorContent::new(&host(), "0123456789abcdef", 3);
        let json = content.to_json().unwrap();

        assert!(json.contains("\"host\":\"node1\""));
        assert_eq!(DescriptorContent::parse(&json), Some(content));
    }

    #[test]
    fn partial_content_does_not_parse() {
        assert!(DescriptorContent::parse("{\"host\":\"node1\",").is_none());
        assert!(DescriptorContent::parse("").is_none());
    }

    #[test]
    fn foreign_lock_reports_owner_and_age() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.lock");
        let content = DescriptorContent::new(&host(), "0123456789abcdef", 1);
        std::fs::write(&path, content.to_json().unwrap()).unwrap();

        let foreign = ForeignLock::read(&path).unwrap();
        assert_eq!(foreign.owner.as_deref(), Some("node1:99"));
        assert!(foreign.age < Duration::from_secs(60));
        assert!(foreign.to_string().starts_with("node1:99, lease age"));
    }

    #[test]
    fn foreign_lock_with_garbage_content_has_unknown_owner() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.lock");
        std::fs::write(&path, "").unwrap();

        let foreign = ForeignLock::read(&path).unwrap();
        assert!(foreign.owner.is_none());
        assert!(foreign.to_string().starts_with("unknown owner"));
    }

    #[test]
    fn foreign_lock_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ForeignLock::read(&dir.path().join("x.lock")).is_none());
    }
}
