//! Logging setup shared by slurp binaries and tests.

pub mod tracing;
