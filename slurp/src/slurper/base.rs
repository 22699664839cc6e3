use std::future::Future;

use async_trait::async_trait;

use crate::types::ItemReceiver;

/// Consumes a stream of items.
#[async_trait]
pub trait Slurper: Send + Sync {
    /// Drains `items` until the channel is closed, then returns.
    async fn slurp(&self, items: ItemReceiver);
}

/// Adapter turning an async closure over a receiver into a [`Slurper`].
#[derive(Debug, Clone)]
pub struct SlurperFn<F> {
    f: F,
}

impl<F, Fut> SlurperFn<F>
where
    F: Fn(ItemReceiver) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Slurper for SlurperFn<F>
where
    F: Fn(ItemReceiver) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn slurp(&self, items: ItemReceiver) {
        (self.f)(items).await
    }
}
