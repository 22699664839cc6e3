//! Testing utilities for slurp pipelines.
//!
//! Provides in-memory capability implementations (producers emitting fixed timestamps,
//! slurpers collecting what they receive, loaders counting their calls, a fixed window
//! analyst) and notification helpers to wait on asynchronous runs without hanging forever.

use chrono::{DateTime, Utc};

pub mod analyst;
pub mod loader;
pub mod notify;
pub mod producer;
pub mod slurper;

/// Returns the instant `secs` seconds after the Unix epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("timestamp out of range")
}
