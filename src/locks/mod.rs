//! Locking subsystem for nfslock.
//!
//! This module implements lease-based mutual exclusion over a shared
//! filesystem that may not support atomic exclusive create (NFS).
//!
//! # Lock Files
//!
//! A lock is a single file at a path all contenders agree on. It is created
//! by hard-linking a fully written temporary file onto that path; the link
//! either succeeds for exactly one contender or fails because the lock
//! exists.
//!
//! # Lock Content
//!
//! Each lock file contains JSON written once at creation:
//! - `host`, `pid`: who created it
//! - `token`: random per-attempt token, used to recognise our own lock
//! - `generation`: attempt number within the creating process
//! - `written_at`: the creator's clock at creation (informational)
//!
//! # Leases
//!
//! The file's mtime is the lease. Holders renew it every `refresh`;
//! contenders treat a lock whose mtime is older than `max_age` as abandoned
//! and remove it.
//!
//! # RAII Handles
//!
//! `HeldLock` stops its refresher and removes the lock file when dropped.

mod acquire;
pub mod backoff;
mod descriptor;
mod held;
mod refresher;
pub mod staleness;
mod sweeper;


// Re-export public API
pub use acquire::{MAX_RECLAIMS_PER_ROUND, acquire};
pub use descriptor::{DescriptorContent, ForeignLock, LockDescriptor};
pub use held::HeldLock;
pub use refresher::LeaseRefresher;
pub use sweeper::{SweepReport, sweep};
