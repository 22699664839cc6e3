use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::describe::Describe;
use crate::loader::{DataLoader, LoadedData};
use crate::types::Item;

/// Loader always suggesting the same key and value, counting its calls.
///
/// Clones share the call counter but are distinct loaders for identity based deduplication
/// once wrapped in their own [`Arc`].
#[derive(Debug, Clone)]
pub struct StaticLoader {
    loaded: LoadedData,
    calls: Arc<AtomicUsize>,
}

impl StaticLoader {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            loaded: LoadedData::new(key, value),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataLoader for StaticLoader {
    async fn load_data(&self, _item: &Item) -> LoadedData {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.loaded.clone()
    }
}

impl Describe for StaticLoader {
    fn name(&self) -> &str {
        "Static loader"
    }

    fn description(&self) -> &str {
        "Loads the same value for every item"
    }
}
