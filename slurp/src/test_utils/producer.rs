use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::describe::Describe;
use crate::producer::{Producer, ProductionRun};
use crate::types::{Item, ItemSender};

/// Producer emitting items at fixed timestamps.
///
/// Only the timestamps inside the produced range are sent, in the order they were given.
#[derive(Debug, Clone)]
pub struct VecProducer {
    times: Vec<DateTime<Utc>>,
    delay: Option<Duration>,
    value: Option<(String, Value)>,
}

impl VecProducer {
    pub fn new(times: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        Self {
            times: times.into_iter().collect(),
            delay: None,
            value: None,
        }
    }

    /// Sleeps for `delay` before sending each item.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets `key` to `value` in the data of every produced item.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.value = Some((key.into(), value.into()));
        self
    }
}

impl Producer for VecProducer {
    fn produce(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> Box<dyn ProductionRun> {
        Box::new(VecRun {
            times: self
                .times
                .iter()
                .copied()
                .filter(|at| from <= *at && *at < until)
                .collect(),
            delay: self.delay,
            value: self.value.clone(),
        })
    }
}

impl Describe for VecProducer {
    fn name(&self) -> &str {
        "Vec producer"
    }

    fn description(&self) -> &str {
        "Produces items at fixed timestamps"
    }
}

struct VecRun {
    times: Vec<DateTime<Utc>>,
    delay: Option<Duration>,
    value: Option<(String, Value)>,
}

#[async_trait]
impl ProductionRun for VecRun {
    async fn send_items(self: Box<Self>, items: &ItemSender) {
        for at in self.times {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let mut item = Item::new(at);
            if let Some((key, value)) = &self.value {
                item.data.insert(key.clone(), value.clone());
            }

            if items.send(Arc::new(item)).await.is_err() {
                return;
            }
        }
    }
}
