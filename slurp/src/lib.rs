//! Time ordered item streaming with fan-out to concurrent analyses.
//!
//! Producers emit timestamped items for a time range, [`analysis::AnalysisRequestSlurper`]
//! enriches each relevant item once with the data loaders of every interested analysis and
//! forwards it to each analysis whose window contains it. [`service::SlurpService`] ties those
//! pieces to a [`registry::Registry`] of named capabilities.

pub mod analysis;
pub mod concurrency;
pub mod describe;
pub mod error;
pub mod loader;
mod macros;
pub mod metrics;
pub mod producer;
pub mod registry;
pub mod service;
pub mod slurper;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
