//! Filesystem utilities for nfslock.
//!
//! `adapter` wraps the handful of primitives the lock engine is allowed to
//! rely on (exclusive create, hard link, stat, mtime update, unlink).
//! `naming` owns the temporary artifact naming convention shared by the
//! acquisition engine and the sweeper.

pub mod adapter;
pub mod naming;

pub use naming::{TempArtifact, TempName, parse_temp_name};
