//! Per-run pipeline options.

use crate::error::{StitchError, StitchResult};
use crate::naming::NamingPolicy;
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: f64 = 0.75;
pub const DEFAULT_MAX_GROUP_SIZE: usize = 4;

/// Knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchOptions {
    /// Minimum similarity for a name to join a base's group (inclusive).
    pub threshold: f64,
    pub max_group_size: usize,
    pub naming: NamingPolicy,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            naming: NamingPolicy::default(),
        }
    }
}

impl StitchOptions {
    pub fn validate(&self) -> StitchResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(StitchError::invalid_options(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if self.max_group_size == 0 {
            return Err(StitchError::invalid_options("max group size must be at least 1"));
        }
        self.naming.validate()
    }
}
