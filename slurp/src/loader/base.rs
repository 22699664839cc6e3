use async_trait::async_trait;
use serde_json::Value;

use crate::types::Item;

/// Data suggested by a [`DataLoader`] for an item.
///
/// An empty `key` means the loader has nothing to contribute. A non empty key with a
/// [`Value::Null`] value is written to the item as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedData {
    pub key: String,
    pub value: Value,
}

impl LoadedData {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the "nothing to contribute" suggestion.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.key.is_empty()
    }
}

/// Loads extra data for an item.
///
/// Loaders have no error channel: a loader that cannot produce data returns
/// [`LoadedData::none`].
#[async_trait]
pub trait DataLoader: Send + Sync {
    /// Returns a suggested key and value for `item`.
    async fn load_data(&self, item: &Item) -> LoadedData;
}

/// Adapter turning a plain function into a [`DataLoader`].
#[derive(Debug, Clone)]
pub struct DataLoaderFn<F> {
    f: F,
}

impl<F> DataLoaderFn<F>
where
    F: Fn(&Item) -> LoadedData + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> DataLoader for DataLoaderFn<F>
where
    F: Fn(&Item) -> LoadedData + Send + Sync,
{
    async fn load_data(&self, item: &Item) -> LoadedData {
        (self.f)(item)
    }
}
