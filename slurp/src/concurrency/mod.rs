//! Concurrency building blocks of a slurp run.
//!
//! - [`pool`] is the completion barrier used wherever a run fans out to several tasks.
//! - [`rate`] observes channels without changing their delivery semantics.

pub mod pool;
pub mod rate;
