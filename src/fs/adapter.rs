//! Filesystem and clock primitives used by the lock engine.
//!
//! The engine relies on exactly one atomicity assumption: creating a hard
//! link onto a shared path either succeeds for exactly one contender or
//! fails because the path exists. Plain exclusive create (`O_EXCL`) is not
//! trusted, since NFSv2 and some NFSv3 clients do not honour it.
//!
//! # Implementation Strategy
//!
//! Descriptors are materialized in three steps:
//! 1. Exclusively create a uniquely named temporary file in the lock's directory
//! 2. Write the descriptor content and fsync it
//! 3. Hard-link the temporary file onto the lock path
//!
//! On Unix the temporary file's link count decides whether step 3 won. A
//! retransmitted NFS `LINK` request can report `EEXIST` for a link that the
//! server actually created on the first transmission; the link count of 2 is
//! still correct in that case.
//!
//! All other errors are wrapped into `LockError::Io` with the path involved.

use crate::error::{LockError, Result};
use filetime::FileTime;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::SystemTime;

/// Current wall-clock time.
pub fn now() -> SystemTime {
    SystemTime::now()
}

/// Create `path` exclusively and write `content` to it, synced to disk.
///
/// The file is removed again if writing fails.
pub fn create_exclusive(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            LockError::io(
                format!("failed to create temporary file '{}'", path.display()),
                e,
            )
        })?;

    if let Err(e) = file.write_all(content).and_then(|()| file.sync_all()) {
        let _ = fs::remove_file(path);
        return Err(LockError::io(
            format!("failed to write temporary file '{}'", path.display()),
            e,
        ));
    }

    Ok(())
}

/// Link `temp` onto `target` if `target` does not exist.
///
/// # Returns
///
/// * `Ok(true)` - `target` is now another name for `temp`
/// * `Ok(false)` - `target` already existed
/// * `Err(LockError::Io)` - any other failure
pub fn link_exclusive(temp: &Path, target: &Path) -> Result<bool> {
    let linked = fs::hard_link(temp, target);

    match linked {
        Ok(()) => Ok(true),
        Err(e) => {
            if link_count(temp)? == Some(2) {
                tracing::debug!(
                    target = %target.display(),
                    error = %e,
                    "link reported failure but link count shows success"
                );
                return Ok(true);
            }

            if e.kind() == ErrorKind::AlreadyExists {
                Ok(false)
            } else {
                Err(LockError::io(
                    format!(
                        "failed to link '{}' to '{}'",
                        temp.display(),
                        target.display()
                    ),
                    e,
                ))
            }
        }
    }
}

#[cfg(unix)]
fn link_count(path: &Path) -> Result<Option<u64>> {
    use std::os::unix::fs::MetadataExt;

    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.nlink())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LockError::io(
            format!("failed to stat '{}'", path.display()),
            e,
        )),
    }
}

#[cfg(not(unix))]
fn link_count(_path: &Path) -> Result<Option<u64>> {
    Ok(None)
}

/// Modification time of `path`, or `None` if it does not exist.
pub fn modified(path: &Path) -> Result<Option<SystemTime>> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LockError::io(
                format!("failed to stat '{}'", path.display()),
                e,
            ));
        }
    };

    meta.modified().map(Some).map_err(|e| {
        LockError::io(
            format!("failed to read modification time of '{}'", path.display()),
            e,
        )
    })
}

/// Set the modification time of `path` to now, leaving content untouched.
///
/// Returns the raw I/O error so callers can tell a vanished file apart.
pub fn touch(path: &Path) -> std::io::Result<()> {
    filetime::set_file_mtime(path, FileTime::now())
}

/// Read `path` as text, or `None` if it does not exist.
pub fn read_to_string_opt(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LockError::io(
            format!("failed to read '{}'", path.display()),
            e,
        )),
    }
}

/// Remove `path`; returns `false` if it was already gone.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LockError::io(
            format!("failed to remove '{}'", path.display()),
            e,
        )),
    }
}

/// Sync the directory containing `path` so a new link is durable.
pub fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}
