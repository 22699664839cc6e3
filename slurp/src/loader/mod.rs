//! Item enrichment.
//!
//! A [`DataLoader`] suggests one `(key, value)` pair for an item without touching it,
//! [`load_data`] runs a set of loaders concurrently and applies their suggestions in a
//! deterministic order.

mod base;
mod concurrent;
mod instrumented;

pub use base::{DataLoader, DataLoaderFn, LoadedData};
pub use concurrent::{dedup_loaders, load_data};
pub use instrumented::{DataLoaderStat, DataLoaderStatValue, InstrumentedDataLoader};
