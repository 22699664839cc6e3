use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::debug;

use crate::analysis::Analyst;
use crate::bail;
use crate::describe::{Describe, Description};
use crate::error::{ErrorKind, SlurpResult};
use crate::loader::{DataLoader, InstrumentedDataLoader};
use crate::producer::Producer;
use crate::registry::id::{AnalystId, DataLoaderId, ProducerId};

/// A registered capability with its key and description.
pub struct RegistryEntry<T: ?Sized> {
    key: String,
    description: Description,
    capability: Arc<T>,
}

impl<T: ?Sized> RegistryEntry<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn capability(&self) -> &Arc<T> {
        &self.capability
    }
}

impl<T: ?Sized> std::fmt::Debug for RegistryEntry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("key", &self.key)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Entries of one kind of capability, indexed by key.
struct Catalogue<T: ?Sized> {
    kind: &'static str,
    entries: Vec<RegistryEntry<T>>,
    by_key: HashMap<String, usize>,
}

impl<T: ?Sized> Catalogue<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    fn insert(
        &mut self,
        key: String,
        description: Description,
        capability: Arc<T>,
    ) -> SlurpResult<usize> {
        if key.trim().is_empty() {
            bail!(
                ErrorKind::InvalidKey,
                "Registry keys cannot be empty",
                format!("an empty key was given for a {}", self.kind)
            );
        }

        let index = self.entries.len();
        match self.by_key.entry(key) {
            Entry::Occupied(occupied) => {
                bail!(
                    ErrorKind::DuplicateKey,
                    "Registry key already in use",
                    format!("{} key '{}' is registered twice", self.kind, occupied.key())
                );
            }
            Entry::Vacant(vacant) => {
                debug!(
                    kind = self.kind,
                    key = %vacant.key(),
                    name = %description.name,
                    "registering capability"
                );
                self.entries.push(RegistryEntry {
                    key: vacant.key().clone(),
                    description,
                    capability,
                });
                vacant.insert(index);
            }
        }

        Ok(index)
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }
}

/// Collects capabilities before freezing them into a [`Registry`].
///
/// Keys are scoped per kind: an analyst and a producer may share a key.
pub struct RegistryBuilder {
    analysts: Catalogue<dyn Analyst>,
    producers: Catalogue<dyn Producer>,
    data_loaders: Catalogue<InstrumentedDataLoader>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            analysts: Catalogue::new("analyst"),
            producers: Catalogue::new("producer"),
            data_loaders: Catalogue::new("data loader"),
        }
    }

    /// Registers an analyst under `key`.
    pub fn analyst<A>(mut self, key: impl Into<String>, analyst: A) -> SlurpResult<Self>
    where
        A: Analyst + Describe + 'static,
    {
        let description = Description::of(&analyst);
        self.analysts
            .insert(key.into(), description, Arc::new(analyst))?;

        Ok(self)
    }

    /// Registers a producer under `key`.
    pub fn producer<P>(mut self, key: impl Into<String>, producer: P) -> SlurpResult<Self>
    where
        P: Producer + Describe + 'static,
    {
        let description = Description::of(&producer);
        self.producers
            .insert(key.into(), description, Arc::new(producer))?;

        Ok(self)
    }

    /// Registers a data loader under `key`.
    ///
    /// The same handle must be given to the analysts using the loader, so that its statistics
    /// and its identity based lookup cover every call.
    pub fn data_loader(
        mut self,
        key: impl Into<String>,
        data_loader: Arc<InstrumentedDataLoader>,
    ) -> SlurpResult<Self> {
        let description = Description::of(data_loader.as_ref());
        self.data_loaders
            .insert(key.into(), description, data_loader)?;

        Ok(self)
    }

    pub fn build(self) -> Registry {
        let data_loaders_by_address = self
            .data_loaders
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (address_of(entry.capability.as_ref()), index))
            .collect();

        Registry {
            analysts: self.analysts,
            producers: self.producers,
            data_loaders: self.data_loaders,
            data_loaders_by_address,
        }
    }
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("analysts", &self.analysts.entries)
            .field("producers", &self.producers.entries)
            .field("data_loaders", &self.data_loaders.entries)
            .finish()
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable catalogue of registered capabilities.
pub struct Registry {
    analysts: Catalogue<dyn Analyst>,
    producers: Catalogue<dyn Producer>,
    data_loaders: Catalogue<InstrumentedDataLoader>,
    data_loaders_by_address: HashMap<usize, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn analyst_id(&self, key: &str) -> Option<AnalystId> {
        self.analysts.index_of(key).map(AnalystId::new)
    }

    pub fn analyst(&self, id: AnalystId) -> Option<&RegistryEntry<dyn Analyst>> {
        self.analysts.entries.get(id.index())
    }

    pub fn analyst_key(&self, id: AnalystId) -> Option<&str> {
        self.analyst(id).map(RegistryEntry::key)
    }

    /// Returns every analyst in registration order.
    pub fn analysts(&self) -> impl Iterator<Item = (AnalystId, &RegistryEntry<dyn Analyst>)> {
        self.analysts
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (AnalystId::new(index), entry))
    }

    pub fn producer_id(&self, key: &str) -> Option<ProducerId> {
        self.producers.index_of(key).map(ProducerId::new)
    }

    pub fn producer(&self, id: ProducerId) -> Option<&RegistryEntry<dyn Producer>> {
        self.producers.entries.get(id.index())
    }

    pub fn producer_key(&self, id: ProducerId) -> Option<&str> {
        self.producer(id).map(RegistryEntry::key)
    }

    /// Returns every producer in registration order.
    pub fn producers(&self) -> impl Iterator<Item = (ProducerId, &RegistryEntry<dyn Producer>)> {
        self.producers
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (ProducerId::new(index), entry))
    }

    pub fn data_loader_id(&self, key: &str) -> Option<DataLoaderId> {
        self.data_loaders.index_of(key).map(DataLoaderId::new)
    }

    pub fn data_loader(&self, id: DataLoaderId) -> Option<&RegistryEntry<InstrumentedDataLoader>> {
        self.data_loaders.entries.get(id.index())
    }

    pub fn data_loader_key(&self, id: DataLoaderId) -> Option<&str> {
        self.data_loader(id).map(RegistryEntry::key)
    }

    /// Returns the identifier of a registered loader from any handle on it.
    pub fn data_loader_id_of(&self, data_loader: &Arc<dyn DataLoader>) -> Option<DataLoaderId> {
        self.data_loaders_by_address
            .get(&address_of(data_loader.as_ref()))
            .copied()
            .map(DataLoaderId::new)
    }

    /// Returns every data loader in registration order.
    pub fn data_loaders(
        &self,
    ) -> impl Iterator<Item = (DataLoaderId, &RegistryEntry<InstrumentedDataLoader>)> {
        self.data_loaders
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (DataLoaderId::new(index), entry))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("analysts", &self.analysts.entries)
            .field("producers", &self.producers.entries)
            .field("data_loaders", &self.data_loaders.entries)
            .finish()
    }
}

/// Address of the value behind a reference, metadata of wide pointers excluded.
fn address_of<T: ?Sized>(value: &T) -> usize {
    (value as *const T).cast::<()>() as usize
}
