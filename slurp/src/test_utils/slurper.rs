use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Notify, watch};
use tokio::time::timeout;

use crate::slurper::Slurper;
use crate::test_utils::notify::{DEFAULT_NOTIFY_TIMEOUT, TimedNotify};
use crate::types::{Item, ItemReceiver};

#[derive(Debug, Default)]
struct Inner {
    items: Vec<Arc<Item>>,
    runs: usize,
}

/// Slurper keeping every item it receives.
///
/// Clones share the same storage, so a clone can be handed to a pipeline while the original is
/// used for assertions.
#[derive(Debug, Clone, Default)]
pub struct CollectingSlurper {
    inner: Arc<Mutex<Inner>>,
    finished: Arc<Notify>,
}

impl CollectingSlurper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<Arc<Item>> {
        self.inner.lock().unwrap().items.clone()
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.inner
            .lock()
            .unwrap()
            .items
            .iter()
            .map(|item| item.at)
            .collect()
    }

    /// Returns how many times a slurp ran to completion.
    pub fn runs(&self) -> usize {
        self.inner.lock().unwrap().runs
    }

    /// Returns a notification fired each time a slurp completes.
    pub fn finished(&self) -> TimedNotify {
        TimedNotify::new(self.finished.clone())
    }
}

#[async_trait]
impl Slurper for CollectingSlurper {
    async fn slurp(&self, mut items: ItemReceiver) {
        while let Some(item) = items.recv().await {
            self.inner.lock().unwrap().items.push(item);
        }

        self.inner.lock().unwrap().runs += 1;
        self.finished.notify_one();
    }
}

/// Slurper holding its items back until its gate is opened, then collecting them.
///
/// Clones share the gate, a single [`GatedSlurper::open`] releases every pending slurp.
#[derive(Debug, Clone)]
pub struct GatedSlurper {
    gate: Arc<watch::Sender<bool>>,
    inner: CollectingSlurper,
}

impl GatedSlurper {
    pub fn new(inner: CollectingSlurper) -> Self {
        let (gate, _) = watch::channel(false);

        Self {
            gate: Arc::new(gate),
            inner,
        }
    }

    /// Lets every slurp start reading.
    pub fn open(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl Slurper for GatedSlurper {
    async fn slurp(&self, items: ItemReceiver) {
        let mut gate = self.gate.subscribe();
        let opened = timeout(DEFAULT_NOTIFY_TIMEOUT, gate.wait_for(|open| *open))
            .await
            .map(|result| result.is_ok());
        assert!(matches!(opened, Ok(true)), "gate was never opened");

        self.inner.slurp(items).await;
    }
}
