use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::concurrency::pool::TaskPool;
use crate::error::ErrorKind;
use crate::slurper::base::Slurper;
use crate::types::{ItemReceiver, ItemSender, item_channel};

/// Presents several slurpers as a single one.
#[derive(Clone)]
pub struct CompositionSlurper {
    slurpers: Vec<Arc<dyn Slurper>>,
}

impl CompositionSlurper {
    /// Creates a slurper that broadcasts every item to all of `slurpers`.
    ///
    /// Each downstream slurper reads from its own channel sized like the inbound one, so the
    /// slowest downstream sets the pace for everybody.
    pub fn fan_out(slurpers: Vec<Arc<dyn Slurper>>) -> Self {
        Self { slurpers }
    }

    pub fn len(&self) -> usize {
        self.slurpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slurpers.is_empty()
    }
}

#[async_trait]
impl Slurper for CompositionSlurper {
    async fn slurp(&self, mut items: ItemReceiver) {
        let capacity = items.max_capacity();
        let mut pool = TaskPool::new(ErrorKind::SlurperPanic);

        let mut outbound: Vec<Option<ItemSender>> = Vec::with_capacity(self.slurpers.len());
        for (index, slurper) in self.slurpers.iter().enumerate() {
            let (tx, rx) = item_channel(capacity);
            let slurper = slurper.clone();

            pool.spawn(format!("fan_out_slurper_{index}"), async move {
                slurper.slurp(rx).await;
            });
            outbound.push(Some(tx));
        }

        pool.spawn("fan_out_distributor", async move {
            let mut distributed = 0u64;

            while let Some(item) = items.recv().await {
                for (index, slot) in outbound.iter_mut().enumerate() {
                    let Some(tx) = slot else {
                        continue;
                    };

                    if tx.send(item.clone()).await.is_err() {
                        warn!(slurper = index, "fan out slurper stopped reading, skipping it");
                        *slot = None;
                    }
                }
                distributed += 1;
            }

            debug!(distributed, "fan out inbound exhausted, closing downstream channels");
        });

        if let Err(err) = pool.wait_all().await {
            error!(error = %err, "fan out slurper finished with failed tasks");
        }
    }
}

impl std::fmt::Debug for CompositionSlurper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionSlurper")
            .field("slurpers", &self.slurpers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slurper::SlurperFn;
    use crate::test_utils::at;
    use crate::test_utils::slurper::CollectingSlurper;
    use crate::types::Item;

    async fn feed(slurper: &CompositionSlurper, seconds: impl IntoIterator<Item = i64>) {
        let (tx, rx) = item_channel(2);
        let seconds: Vec<i64> = seconds.into_iter().collect();

        let producer = tokio::spawn(async move {
            for secs in seconds {
                tx.send(Arc::new(Item::new(at(secs)))).await.unwrap();
            }
        });

        slurper.slurp(rx).await;
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn every_downstream_receives_every_item_in_order() {
        let downstream: Vec<CollectingSlurper> = (0..3).map(|_| CollectingSlurper::new()).collect();
        let slurper = CompositionSlurper::fan_out(
            downstream
                .iter()
                .map(|collector| Arc::new(collector.clone()) as Arc<dyn Slurper>)
                .collect(),
        );

        feed(&slurper, 0..20).await;

        let expected: Vec<_> = (0..20).map(at).collect();
        for collector in &downstream {
            assert_eq!(collector.times(), expected);
        }
    }

    #[tokio::test]
    async fn downstream_items_are_shared() {
        let first = CollectingSlurper::new();
        let second = CollectingSlurper::new();
        let slurper = CompositionSlurper::fan_out(vec![
            Arc::new(first.clone()),
            Arc::new(second.clone()),
        ]);

        feed(&slurper, [1]).await;

        assert!(Arc::ptr_eq(&first.items()[0], &second.items()[0]));
    }

    #[tokio::test]
    async fn failed_downstream_does_not_block_the_others() {
        fn fail() {
            panic!("slurper failure")
        }

        let healthy = CollectingSlurper::new();
        let slurper = CompositionSlurper::fan_out(vec![
            Arc::new(SlurperFn::new(|_items: ItemReceiver| async { fail() })),
            Arc::new(healthy.clone()),
        ]);

        feed(&slurper, 0..10).await;

        assert_eq!(healthy.items().len(), 10);
    }

    #[tokio::test]
    async fn no_downstream_still_drains_inbound() {
        let slurper = CompositionSlurper::fan_out(Vec::new());
        assert!(slurper.is_empty());

        feed(&slurper, 0..10).await;
    }
}
