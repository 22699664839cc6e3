use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::ItemSender;

/// Generates production runs of items for a time range.
pub trait Producer: Send + Sync {
    /// Prepares a run over `[from, until)`. Nothing is sent until the run is started.
    fn produce(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> Box<dyn ProductionRun>;
}

/// A single pass of a [`Producer`] over a time range.
#[async_trait]
pub trait ProductionRun: Send {
    /// Sends the items of the run, oldest first. Items sharing a timestamp may come in any order.
    ///
    /// The run must not close `items`, the caller closes the channel by dropping its sender once
    /// this returns.
    async fn send_items(self: Box<Self>, items: &ItemSender);
}

/// Adapter turning an async closure over a sender into a [`ProductionRun`].
///
/// The closure receives its own clone of the sender, which is released when its future
/// completes.
pub struct ProductionRunFn<F> {
    f: F,
}

impl<F, Fut> ProductionRunFn<F>
where
    F: FnOnce(ItemSender) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ProductionRun for ProductionRunFn<F>
where
    F: FnOnce(ItemSender) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn send_items(self: Box<Self>, items: &ItemSender) {
        (self.f)(items.clone()).await
    }
}
