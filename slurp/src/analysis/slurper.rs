use std::sync::{PoisonError, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use slurp_config::shared::RateConfig;
use tracing::{debug, error, info, warn};

use crate::analysis::request::AnalysisRequest;
use crate::concurrency::pool::TaskPool;
use crate::concurrency::rate::{ChannelStat, RateObserver, RateObserverHandle};
use crate::error::ErrorKind;
use crate::loader::{dedup_loaders, load_data};
use crate::metrics::{
    REASON_LABEL, SLURP_ENRICHMENT_DURATION_SECONDS, SLURP_ITEMS_DELIVERED_TOTAL,
    SLURP_ITEMS_DISCARDED_TOTAL, SLURP_ITEMS_ENRICHED_TOTAL,
};
use crate::slurper::Slurper;
use crate::types::{ItemReceiver, ItemSender, item_channel};

/// Observers of the channels of the current (or last) run.
#[derive(Debug)]
struct RunObservers {
    source: RateObserverHandle,
    requests: Vec<RateObserverHandle>,
}

/// Delivers one time ordered stream of items to several analysis requests.
///
/// Each request receives exactly the items inside its own window, in source order. Items are
/// enriched with the union of the requests' data loaders at most once, the first time they
/// match a request, and before any request sees them. Items outside every window are dropped
/// without enrichment.
///
/// A slow request slows the whole run down: every send blocks until the request's channel has
/// room.
#[derive(Debug)]
pub struct AnalysisRequestSlurper {
    requests: Vec<AnalysisRequest>,
    rate_config: RateConfig,
    observers: RwLock<Option<RunObservers>>,
}

impl AnalysisRequestSlurper {
    pub fn new(requests: Vec<AnalysisRequest>) -> Self {
        Self {
            requests,
            rate_config: RateConfig::default(),
            observers: RwLock::new(None),
        }
    }

    pub fn with_rate_config(mut self, rate_config: RateConfig) -> Self {
        self.rate_config = rate_config;
        self
    }

    pub fn requests(&self) -> &[AnalysisRequest] {
        &self.requests
    }

    /// Returns the throughput of the source channel, zero valued before the run starts.
    pub fn slurp_stat(&self) -> ChannelStat {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|observers| observers.source.stat())
            .unwrap_or_default()
    }

    /// Returns the throughput of each request channel, in request order.
    pub fn request_stat(&self) -> Vec<ChannelStat> {
        match self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(observers) => observers.requests.iter().map(|handle| handle.stat()).collect(),
            None => vec![ChannelStat::default(); self.requests.len()],
        }
    }

    fn publish_observers(&self, observers: RunObservers) {
        *self.observers.write().unwrap_or_else(PoisonError::into_inner) = Some(observers);
    }
}

#[async_trait]
impl Slurper for AnalysisRequestSlurper {
    async fn slurp(&self, items: ItemReceiver) {
        let capacity = items.max_capacity();
        let global_window = AnalysisRequest::covering_window(&self.requests);
        let loaders = dedup_loaders(
            self.requests
                .iter()
                .flat_map(|request| request.data_loaders()),
        );

        let (source_handle, mut source) = RateObserver::spawn(items, &self.rate_config);

        let mut pool = TaskPool::new(ErrorKind::SlurperPanic);
        let mut outbound: Vec<ItemSender> = Vec::with_capacity(self.requests.len());
        let mut request_handles = Vec::with_capacity(self.requests.len());
        for (index, request) in self.requests.iter().enumerate() {
            let (tx, rx) = item_channel(capacity);
            let (handle, observed) = RateObserver::spawn(rx, &self.rate_config);
            let slurper = request.slurper().clone();

            pool.spawn(format!("analysis_request_{index}"), async move {
                slurper.slurp(observed).await;
            });
            outbound.push(tx);
            request_handles.push(handle);
        }

        self.publish_observers(RunObservers {
            source: source_handle.clone(),
            requests: request_handles,
        });

        info!(
            requests = self.requests.len(),
            data_loaders = loaders.len(),
            from = ?global_window.map(|window| window.from),
            until = ?global_window.map(|window| window.until),
            "starting analysis request slurp"
        );

        while let Some(mut item) = source.recv().await {
            if !global_window.is_some_and(|window| window.contains(item.at)) {
                counter!(SLURP_ITEMS_DISCARDED_TOTAL, REASON_LABEL => "outside_range").increment(1);
                continue;
            }

            let mut loaded = loaders.is_empty();
            let mut delivered = 0u64;
            for (index, request) in self.requests.iter().enumerate() {
                if !request.wants(item.at) {
                    continue;
                }

                if !loaded {
                    let before_loading = Instant::now();
                    load_data(&mut item, &loaders).await;
                    loaded = true;

                    counter!(SLURP_ITEMS_ENRICHED_TOTAL).increment(1);
                    histogram!(SLURP_ENRICHMENT_DURATION_SECONDS)
                        .record(before_loading.elapsed().as_secs_f64());
                }

                if outbound[index].send(item.clone()).await.is_err() {
                    warn!(
                        request = index,
                        at = %item.at,
                        "analysis request channel closed, item not delivered"
                    );
                    continue;
                }
                delivered += 1;
            }

            if delivered == 0 {
                counter!(SLURP_ITEMS_DISCARDED_TOTAL, REASON_LABEL => "no_matching_request")
                    .increment(1);
            } else {
                counter!(SLURP_ITEMS_DELIVERED_TOTAL).increment(delivered);
            }
        }

        debug!("analysis request slurp source exhausted, closing request channels");
        // Request channels close once their last sender is gone.
        drop(outbound);

        if let Err(err) = pool.wait_all().await {
            error!(error = %err, "analysis request slurpers failed");
        }

        info!(
            count = source_handle.stat().count,
            "analysis request slurp finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DataLoader;
    use crate::slurper::SlurperFn;
    use crate::test_utils::at;
    use crate::test_utils::loader::StaticLoader;
    use crate::test_utils::slurper::CollectingSlurper;
    use crate::types::{Item, TimeWindow};
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use std::sync::Arc;

    fn request(from: i64, until: i64, slurper: &CollectingSlurper) -> AnalysisRequest {
        AnalysisRequest::new(TimeWindow::new(at(from), at(until)), Arc::new(slurper.clone()))
    }

    async fn run(slurper: &AnalysisRequestSlurper, seconds: &[i64]) {
        let (tx, rx) = item_channel(4);
        let seconds = seconds.to_vec();

        let producer = tokio::spawn(async move {
            for secs in seconds {
                tx.send(Arc::new(Item::new(at(secs)))).await.unwrap();
            }
        });

        slurper.slurp(rx).await;
        producer.await.unwrap();
    }

    fn times(seconds: &[i64]) -> Vec<DateTime<Utc>> {
        seconds.iter().copied().map(at).collect()
    }

    #[tokio::test]
    async fn each_request_receives_its_window_in_source_order() {
        let first = CollectingSlurper::new();
        let second = CollectingSlurper::new();
        let slurper = AnalysisRequestSlurper::new(vec![
            request(0, 10, &first),
            request(5, 15, &second),
        ]);

        run(&slurper, &[0, 4, 5, 9, 10, 14]).await;

        assert_eq!(first.times(), times(&[0, 4, 5, 9]));
        // Windows are half open: 10 ends the first window and belongs to the second.
        assert_eq!(second.times(), times(&[5, 9, 10, 14]));
        assert_eq!(slurper.slurp_stat().count, 6);
    }

    #[tokio::test]
    async fn items_outside_every_window_are_neither_loaded_nor_delivered() {
        let loader = StaticLoader::new("k", json!(1));
        let collector = CollectingSlurper::new();
        let slurper = AnalysisRequestSlurper::new(vec![
            request(10, 20, &collector).with_data_loader(Arc::new(loader.clone())),
        ]);

        run(&slurper, &[0, 5, 10, 15, 20, 25]).await;

        assert_eq!(collector.times(), times(&[10, 15]));
        assert_eq!(loader.calls(), 2);
    }

    #[tokio::test]
    async fn overlapping_requests_share_a_single_enrichment() {
        let shared = StaticLoader::new("shared", json!("s"));
        let only_second = StaticLoader::new("second", json!(2));
        let shared_loader: Arc<dyn DataLoader> = Arc::new(shared.clone());

        let first = CollectingSlurper::new();
        let second = CollectingSlurper::new();
        let slurper = AnalysisRequestSlurper::new(vec![
            request(0, 10, &first).with_data_loaders(vec![shared_loader.clone()]),
            request(0, 10, &second)
                .with_data_loaders(vec![shared_loader, Arc::new(only_second.clone())]),
        ]);

        run(&slurper, &[1, 2, 3]).await;

        assert_eq!(shared.calls(), 3);
        assert_eq!(only_second.calls(), 3);

        // Both requests see the same enriched item, loaders of the other request included.
        for (a, b) in first.items().iter().zip(second.items().iter()) {
            assert!(Arc::ptr_eq(a, b));
            assert_eq!(a.data.get("shared"), Some(&json!("s")));
            assert_eq!(a.data.get("second"), Some(&json!(2)));
        }
    }

    #[tokio::test]
    async fn stats_are_zero_before_and_kept_after_the_run() {
        let collector = CollectingSlurper::new();
        let slurper = AnalysisRequestSlurper::new(vec![
            request(0, 10, &collector),
            request(20, 30, &collector),
        ]);

        assert_eq!(slurper.slurp_stat(), ChannelStat::default());
        assert_eq!(slurper.request_stat(), vec![ChannelStat::default(); 2]);

        run(&slurper, &[1, 2, 21]).await;

        let request_stat = slurper.request_stat();
        assert_eq!(request_stat[0].count, 2);
        assert_eq!(request_stat[0].item_at, Some(at(2)));
        assert_eq!(request_stat[0].capacity, 4);
        assert_eq!(request_stat[1].count, 1);
        assert_eq!(slurper.slurp_stat().rate, 0.0);
    }

    #[tokio::test]
    async fn failed_request_slurper_does_not_stall_the_run() {
        fn fail() {
            panic!("analysis failure")
        }

        let healthy = CollectingSlurper::new();
        let slurper = AnalysisRequestSlurper::new(vec![
            AnalysisRequest::new(
                TimeWindow::new(at(0), at(100)),
                Arc::new(SlurperFn::new(|_items: ItemReceiver| async { fail() })),
            ),
            request(0, 100, &healthy),
        ]);

        let seconds: Vec<i64> = (0..50).collect();
        tokio::time::timeout(std::time::Duration::from_secs(5), run(&slurper, &seconds))
            .await
            .unwrap();

        assert_eq!(healthy.items().len(), 50);
    }

    #[tokio::test]
    async fn no_requests_drains_the_source() {
        let slurper = AnalysisRequestSlurper::new(Vec::new());

        run(&slurper, &[1, 2, 3]).await;

        assert_eq!(slurper.slurp_stat().count, 3);
        assert!(slurper.request_stat().is_empty());
    }
}
