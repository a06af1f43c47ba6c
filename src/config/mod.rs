//! Configuration for nfslock.
//!
//! A single `Config` struct with named, typed fields and defaults declared
//! once. It can be read from YAML and is then overridden by command-line
//! flags. The engine never reads `Config` directly; it consumes the derived
//! `RetryPolicy` and `LeasePolicy`.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Config;
pub use operations::MAX_SECONDS;
pub use types::{LeasePolicy, PollPolicy, RetryPolicy, Verbosity};
