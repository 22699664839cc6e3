use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// A timestamped record flowing through a slurp pipeline.
///
/// `data` starts empty and is filled by enrichment, [`Value::Null`] is a legitimate value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub at: DateTime<Utc>,
    pub data: HashMap<String, Value>,
}

impl Item {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            data: HashMap::new(),
        }
    }
}

/// Sending half of an item channel.
///
/// Items are shared between every consumer interested in them, hence the [`Arc`].
pub type ItemSender = mpsc::Sender<Arc<Item>>;

/// Receiving half of an item channel.
pub type ItemReceiver = mpsc::Receiver<Arc<Item>>;

/// Creates a bounded item channel.
///
/// A zero capacity is raised to one since tokio channels always buffer at least one item.
pub fn item_channel(capacity: usize) -> (ItemSender, ItemReceiver) {
    mpsc::channel(capacity.max(1))
}
