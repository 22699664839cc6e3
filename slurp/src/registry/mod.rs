//! Catalogue of the analysts, producers and data loaders a service can use.
//!
//! A [`Registry`] is assembled once through a [`RegistryBuilder`] and is immutable afterwards.
//! Every capability gets an opaque identifier at registration time and every lookup, by key,
//! by identifier or by loader handle, goes through an index.

mod base;
mod id;

pub use base::{Registry, RegistryBuilder, RegistryEntry};
pub use id::{AnalystId, DataLoaderId, ProducerId};
