//! Pass-through channel observation.
//!
//! A [`RateObserver`] sits between two channels and forwards every item unchanged while keeping
//! a live [`ChannelStat`] about the traffic: how many items went through, the timestamp of the
//! last one, the current throughput and how full the observed channel is.

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slurp_config::shared::RateConfig;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::types::{ItemReceiver, item_channel};

/// Snapshot of the traffic through an observed channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStat {
    /// Timestamp of the last item that went through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_at: Option<DateTime<Utc>>,
    /// Items per second over the most recent arrivals.
    pub rate: f64,
    pub count: i64,
    /// Items waiting in the observed channel.
    pub length: usize,
    pub capacity: usize,
}

/// Fixed size ring of the most recent arrival instants.
#[derive(Debug)]
struct ArrivalWindow {
    arrivals: VecDeque<Instant>,
    size: usize,
}

impl ArrivalWindow {
    fn new(size: usize) -> Self {
        let size = size.max(1);

        Self {
            arrivals: VecDeque::with_capacity(size),
            size,
        }
    }

    fn record(&mut self, at: Instant) {
        if self.arrivals.len() == self.size {
            self.arrivals.pop_front();
        }

        self.arrivals.push_back(at);
    }

    /// Returns `samples * 1e9 / nanos_since_oldest_sample`, or `0` without samples.
    fn rate(&self, now: Instant) -> f64 {
        let Some(oldest) = self.arrivals.front() else {
            return 0.0;
        };

        let elapsed_nanos = now.saturating_duration_since(*oldest).as_nanos();
        if elapsed_nanos == 0 {
            return 0.0;
        }

        self.arrivals.len() as f64 * 1_000_000_000.0 / elapsed_nanos as f64
    }
}

/// Read handle on the statistics of a running (or finished) [`RateObserver`].
#[derive(Debug, Clone)]
pub struct RateObserverHandle {
    stat: Arc<RwLock<ChannelStat>>,
}

impl RateObserverHandle {
    fn new(capacity: usize) -> Self {
        Self {
            stat: Arc::new(RwLock::new(ChannelStat {
                capacity,
                ..ChannelStat::default()
            })),
        }
    }

    /// Returns the latest snapshot.
    pub fn stat(&self) -> ChannelStat {
        self.stat
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut ChannelStat)) {
        let mut stat = self.stat.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut stat);
    }
}

/// Forwards items from an inbound channel to an outbound one while sampling throughput.
#[derive(Debug)]
pub struct RateObserver;

impl RateObserver {
    /// Spawns the observing task and returns its stat handle with the outbound receiver.
    ///
    /// The outbound channel holds a single item so the observer's send is where backpressure
    /// builds up. The task ends once `inbound` is closed and drained, after publishing a final
    /// snapshot with a zero rate and closing the outbound channel. If the outbound receiver is
    /// dropped early, the remaining inbound items are drained and discarded.
    pub fn spawn(
        mut inbound: ItemReceiver,
        config: &RateConfig,
    ) -> (RateObserverHandle, ItemReceiver) {
        let handle = RateObserverHandle::new(inbound.max_capacity());
        let (outbound_tx, outbound_rx) = item_channel(1);

        let task_handle = handle.clone();
        let tick_interval = config.tick_interval();
        let mut arrivals = ArrivalWindow::new(config.window_size);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut outbound_tx = Some(outbound_tx);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let rate = arrivals.rate(Instant::now());
                        let length = inbound.len();
                        trace!(rate, length, "rate observer tick");

                        task_handle.update(|stat| {
                            stat.rate = rate;
                            stat.length = length;
                        });
                    }

                    item = inbound.recv() => {
                        let Some(item) = item else {
                            task_handle.update(|stat| {
                                stat.rate = 0.0;
                                stat.length = 0;
                            });
                            // Dropping the sender closes the outbound channel.
                            drop(outbound_tx);
                            debug!(count = task_handle.stat().count, "rate observer finished");

                            return;
                        };

                        let at = item.at;
                        if let Some(tx) = outbound_tx.as_ref()
                            && tx.send(item).await.is_err()
                        {
                            debug!("outbound receiver dropped, discarding remaining items");
                            outbound_tx = None;
                        }

                        arrivals.record(Instant::now());
                        let length = inbound.len();
                        task_handle.update(|stat| {
                            stat.count += 1;
                            stat.item_at = Some(at);
                            stat.length = length;
                        });
                    }
                }
            }
        });

        (handle, outbound_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;
    use std::time::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn empty_window_has_zero_rate() {
        let window = ArrivalWindow::new(4);

        assert_eq!(window.rate(Instant::now()), 0.0);
    }

    #[test]
    fn rate_uses_only_the_most_recent_arrivals() {
        let start = Instant::now();
        let mut window = ArrivalWindow::new(2);

        window.record(start);
        window.record(start + Duration::from_millis(500));
        window.record(start + Duration::from_secs(1));

        // Two samples kept, the oldest being one second before `now`.
        let rate = window.rate(start + Duration::from_millis(1500));
        assert!((rate - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn forwards_items_in_order_and_publishes_final_snapshot() {
        let (tx, rx) = item_channel(8);
        let (handle, mut outbound) = RateObserver::spawn(rx, &RateConfig::default());
        assert_eq!(handle.stat().capacity, 8);

        for secs in [1, 2, 3] {
            tx.send(Arc::new(Item::new(at(secs)))).await.unwrap();
        }
        drop(tx);

        let mut received = Vec::new();
        while let Some(item) = outbound.recv().await {
            received.push(item.at);
        }
        assert_eq!(received, vec![at(1), at(2), at(3)]);

        let stat = handle.stat();
        assert_eq!(stat.count, 3);
        assert_eq!(stat.item_at, Some(at(3)));
        assert_eq!(stat.rate, 0.0);
    }

    #[tokio::test]
    async fn keeps_draining_when_outbound_is_dropped() {
        let (tx, rx) = item_channel(1);
        let (handle, outbound) = RateObserver::spawn(rx, &RateConfig::default());
        drop(outbound);

        // Would block forever if the observer stopped reading.
        for secs in 0..10 {
            tx.send(Arc::new(Item::new(at(secs)))).await.unwrap();
        }
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), async {
            while handle.stat().count < 10 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
