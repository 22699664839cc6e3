use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Throughput sampling configuration for rate observed channels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateConfig {
    /// Interval, in milliseconds, between two rate recomputations.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Number of most recent arrival instants the rate is computed from.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl RateConfig {
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 200;

    pub const DEFAULT_WINDOW_SIZE: usize = 100;

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tick_interval_ms == 0 {
            return Err(ValidationError::must_be_positive("rate.tick_interval_ms"));
        }

        if self.window_size == 0 {
            return Err(ValidationError::must_be_positive("rate.window_size"));
        }

        Ok(())
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            window_size: default_window_size(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    RateConfig::DEFAULT_TICK_INTERVAL_MS
}

fn default_window_size() -> usize {
    RateConfig::DEFAULT_WINDOW_SIZE
}
