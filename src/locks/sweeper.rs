//! Removal of orphaned temporary artifacts.
//!
//! An attempt always removes its temporary file, unless the process is
//! killed uncatchably between creating and removing it. Those leftovers are
//! only recognisable as garbage on the host that created them, so the sweep
//! is restricted to artifacts tagged with the local host. Distinct hostnames
//! can share a tag once sanitised, so an artifact whose content names another
//! host is kept as well.

use super::descriptor::DescriptorContent;
use crate::context::HostIdentity;
use crate::error::{LockError, Result};
use crate::fs::{adapter, parse_temp_name};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a sweep did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Artifacts that were deleted.
    pub removed: Vec<PathBuf>,

    /// Our artifacts left alone: too young or created on another host.
    pub kept: Vec<PathBuf>,
}

/// Remove artifacts in `dir` created on `host` more than `max_age` ago.
///
/// Files that do not follow the temporary naming convention, including the
/// lock files themselves, are never touched. An artifact with unreadable
/// content (torn by the crash that orphaned it) is judged by its tag alone.
pub fn sweep(dir: &Path, max_age: Duration, host: &HostIdentity) -> Result<SweepReport> {
    let mut report = SweepReport::default();
    let host_tag = host.tag();

    let entries = fs::read_dir(dir).map_err(|e| {
        LockError::io(format!("failed to read lock directory '{}'", dir.display()), e)
    })?;

    let now = adapter::now();
    for entry in entries {
        let entry = entry.map_err(|e| {
            LockError::io(format!("failed to read entry in '{}'", dir.display()), e)
        })?;

        let file_name = entry.file_name();
        let Some(name) = file_name.to_str().and_then(parse_temp_name) else {
            continue;
        };

        let path = entry.path();
        if name.host_tag != host_tag || created_elsewhere(&path, host)? {
            report.kept.push(path);
            continue;
        }

        let Some(modified) = adapter::modified(&path)? else {
            continue;
        };
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= max_age {
            report.kept.push(path);
            continue;
        }

        if adapter::remove_if_exists(&path)? {
            tracing::info!(
                file = %path.display(),
                pid = name.pid,
                age_secs = age.as_secs(),
                "removed orphaned temporary file"
            );
            report.removed.push(path);
        }
    }

    Ok(report)
}

/// Whether the artifact's content names a host other than `host`.
fn created_elsewhere(path: &Path, host: &HostIdentity) -> Result<bool> {
    let creator = adapter::read_to_string_opt(path)?
        .as_deref()
        .and_then(DescriptorContent::parse)
        .map(|content| content.host);

    Ok(creator.is_some_and(|creator| creator != host.hostname))
}
