use std::any::type_name;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::describe::{Describe, Description};
use crate::loader::base::{DataLoader, LoadedData};
use crate::types::Item;

/// Running aggregate over a set of loader calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataLoaderStatValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_call_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_call_at: Option<DateTime<Utc>>,
    pub count: i64,
    #[serde(with = "duration_nanos")]
    pub duration_total: Duration,
    #[serde(with = "duration_nanos")]
    pub duration_min: Duration,
    #[serde(with = "duration_nanos")]
    pub duration_avg: Duration,
    #[serde(with = "duration_nanos")]
    pub duration_max: Duration,
}

impl DataLoaderStatValue {
    fn record(&mut self, started_at: DateTime<Utc>, duration: Duration) {
        if self.first_call_at.is_none_or(|first| started_at < first) {
            self.first_call_at = Some(started_at);
        }
        if self.last_call_at.is_none_or(|last| started_at > last) {
            self.last_call_at = Some(started_at);
        }

        self.count += 1;
        self.duration_total += duration;

        if duration < self.duration_min || self.duration_min.is_zero() {
            self.duration_min = duration;
        }

        let avg_nanos = self.duration_total.as_nanos() / self.count as u128;
        self.duration_avg = Duration::from_nanos(avg_nanos as u64);

        if duration > self.duration_max {
            self.duration_max = duration;
        }
    }
}

/// Statistics of an [`InstrumentedDataLoader`].
///
/// Every call lands in `called` and in exactly one of the three outcome buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataLoaderStat {
    pub called: DataLoaderStatValue,
    pub return_empty_key: DataLoaderStatValue,
    pub return_nil_data: DataLoaderStatValue,
    pub return_data: DataLoaderStatValue,
}

/// Decorates a [`DataLoader`] with call statistics.
pub struct InstrumentedDataLoader {
    loader: Box<dyn DataLoader>,
    description: Description,
    stat: Mutex<DataLoaderStat>,
}

impl InstrumentedDataLoader {
    /// Wraps a loader that describes itself.
    pub fn new<L>(loader: L) -> Self
    where
        L: DataLoader + Describe + 'static,
    {
        let description = Description::of(&loader);
        Self::with_description(loader, description)
    }

    /// Wraps a loader without a description, it is reported as anonymous.
    pub fn anonymous<L>(loader: L) -> Self
    where
        L: DataLoader + 'static,
    {
        Self::with_description(loader, Description::anonymous(type_name::<L>()))
    }

    pub fn with_description<L>(loader: L, description: Description) -> Self
    where
        L: DataLoader + 'static,
    {
        Self {
            loader: Box::new(loader),
            description,
            stat: Mutex::new(DataLoaderStat::default()),
        }
    }

    /// Returns a copy of the current statistics.
    pub fn stat(&self) -> DataLoaderStat {
        *self.stat.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears all statistics at once.
    pub fn reset(&self) {
        *self.stat.lock().unwrap_or_else(PoisonError::into_inner) = DataLoaderStat::default();
    }
}

#[async_trait]
impl DataLoader for InstrumentedDataLoader {
    async fn load_data(&self, item: &Item) -> LoadedData {
        let started_at = Utc::now();
        let start = Instant::now();

        let loaded = self.loader.load_data(item).await;

        let duration = start.elapsed();
        let mut stat = self.stat.lock().unwrap_or_else(PoisonError::into_inner);
        stat.called.record(started_at, duration);
        if loaded.is_none() {
            stat.return_empty_key.record(started_at, duration);
        } else if loaded.value.is_null() {
            stat.return_nil_data.record(started_at, duration);
        } else {
            stat.return_data.record(started_at, duration);
        }

        loaded
    }
}

impl Describe for InstrumentedDataLoader {
    fn name(&self) -> &str {
        self.description.name()
    }

    fn description(&self) -> &str {
        self.description.description()
    }
}

impl std::fmt::Debug for InstrumentedDataLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedDataLoader")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Durations are reported as integer nanoseconds.
mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}
