use serde::{Deserialize, Serialize};

use crate::load::Config;
use crate::shared::{RateConfig, ValidationError};

/// Configuration of a slurp service and of the runs it starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SlurpConfig {
    /// Capacity of the channel between a producer and the analysis request slurper.
    ///
    /// Every per-request channel inherits this capacity.
    #[serde(default = "default_slurp_buffer")]
    pub slurp_buffer: usize,
    /// Capacity of each per-source channel of a merge producer.
    #[serde(default = "default_merge_buffer")]
    pub merge_buffer: usize,
    #[serde(default)]
    pub rate: RateConfig,
}

impl SlurpConfig {
    pub const DEFAULT_SLURP_BUFFER: usize = 100;

    pub const DEFAULT_MERGE_BUFFER: usize = 100;

    /// Validates every field, tokio channels cannot have a zero capacity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.slurp_buffer == 0 {
            return Err(ValidationError::must_be_positive("slurp_buffer"));
        }

        if self.merge_buffer == 0 {
            return Err(ValidationError::must_be_positive("merge_buffer"));
        }

        self.rate.validate()
    }
}

impl Config for SlurpConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}

impl Default for SlurpConfig {
    fn default() -> Self {
        Self {
            slurp_buffer: default_slurp_buffer(),
            merge_buffer: default_merge_buffer(),
            rate: RateConfig::default(),
        }
    }
}

fn default_slurp_buffer() -> usize {
    SlurpConfig::DEFAULT_SLURP_BUFFER
}

fn default_merge_buffer() -> usize {
    SlurpConfig::DEFAULT_MERGE_BUFFER
}
