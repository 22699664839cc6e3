use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slurp_config::shared::SlurpConfig;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::ErrorKind;
use crate::producer::base::{Producer, ProductionRun};
use crate::slurp_error;
use crate::types::{Item, ItemReceiver, ItemSender, item_channel};

/// Default capacity of the channel buffering each merged source.
pub const DEFAULT_SEND_ITEMS_BUFFER_SIZE: usize = 100;

/// Combines the runs of several producers into a single time ordered run.
///
/// Each source run feeds its own bounded channel, so memory stays bounded by
/// `send_items_buffer_size` per source whatever the size of the requested range.
#[derive(Clone)]
pub struct MergeProducer {
    send_items_buffer_size: usize,
    producers: Vec<Arc<dyn Producer>>,
}

impl MergeProducer {
    pub fn new(producers: Vec<Arc<dyn Producer>>) -> Self {
        Self {
            send_items_buffer_size: DEFAULT_SEND_ITEMS_BUFFER_SIZE,
            producers,
        }
    }

    /// Creates a merge whose per-source channels hold `config.merge_buffer` items.
    pub fn from_config(config: &SlurpConfig, producers: Vec<Arc<dyn Producer>>) -> Self {
        Self::new(producers).with_send_items_buffer_size(config.merge_buffer)
    }

    pub fn with_send_items_buffer_size(mut self, send_items_buffer_size: usize) -> Self {
        self.send_items_buffer_size = send_items_buffer_size;
        self
    }

    pub fn send_items_buffer_size(&self) -> usize {
        self.send_items_buffer_size
    }
}

impl Producer for MergeProducer {
    fn produce(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> Box<dyn ProductionRun> {
        Box::new(MergeRun {
            send_items_buffer_size: self.send_items_buffer_size,
            runs: self
                .producers
                .iter()
                .map(|producer| producer.produce(from, until))
                .collect(),
        })
    }
}

impl std::fmt::Debug for MergeProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeProducer")
            .field("send_items_buffer_size", &self.send_items_buffer_size)
            .field("producers", &self.producers.len())
            .finish()
    }
}

struct MergeRun {
    send_items_buffer_size: usize,
    runs: Vec<Box<dyn ProductionRun>>,
}

#[async_trait]
impl ProductionRun for MergeRun {
    async fn send_items(self: Box<Self>, items: &ItemSender) {
        let source_count = self.runs.len();
        let mut join_set = JoinSet::new();
        let mut sources: Vec<ItemReceiver> = Vec::with_capacity(source_count);

        for (index, run) in self.runs.into_iter().enumerate() {
            let (tx, rx) = item_channel(self.send_items_buffer_size);
            // The source channel closes when `tx` is dropped at the end of the task.
            join_set.spawn(async move {
                run.send_items(&tx).await;
                index
            });
            sources.push(rx);
        }

        let mut candidates: Vec<Option<Arc<Item>>> = Vec::with_capacity(source_count);
        for source in &mut sources {
            candidates.push(source.recv().await);
        }

        let mut merged = 0u64;
        while let Some(index) = earliest_candidate(&candidates) {
            let Some(item) = candidates[index].take() else {
                break;
            };

            if items.send(item).await.is_err() {
                debug!(merged, "merge receiver dropped, aborting source runs");
                // Dropping the join set aborts the remaining source tasks.
                return;
            }
            merged += 1;

            candidates[index] = sources[index].recv().await;
        }

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(index) => debug!(source = index, "merge source finished"),
                Err(join_err) => {
                    let err =
                        slurp_error!(ErrorKind::ProducerPanic, "Merge source failed", join_err);
                    error!(error = %err, "merge source items after the failure are lost");
                }
            }
        }

        debug!(merged, sources = source_count, "merge run finished");
    }
}

/// Returns the position of the earliest pending candidate, the lowest position on ties.
fn earliest_candidate(candidates: &[Option<Arc<Item>>]) -> Option<usize> {
    let mut earliest: Option<(usize, DateTime<Utc>)> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let Some(item) = candidate else {
            continue;
        };

        match earliest {
            Some((_, at)) if item.at >= at => {}
            _ => earliest = Some((index, item.at)),
        }
    }

    earliest.map(|(index, _)| index)
}
