use serde::{Deserialize, Serialize};

use crate::error::InputError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStrategy {
    #[default]
    Insertion,
    TspSlices,
}

/// Default number of tours kept per tour size by the insertion generator.
pub const DEFAULT_BEAM_WIDTH: usize = 256;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub strategy: GenerationStrategy,
    pub max_targets_per_tour: Option<usize>,
    /// Keep at most this many trajectories per drone after pruning, preferring
    /// the ones covering the most targets.
    pub max_pool_size: Option<usize>,
    /// Insertion only: cheapest tours kept per tour size of two or more
    /// targets. `None` enumerates every feasible target set.
    pub beam_width: Option<usize>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            strategy: GenerationStrategy::default(),
            max_targets_per_tour: None,
            max_pool_size: None,
            beam_width: Some(DEFAULT_BEAM_WIDTH),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExactConfig {
    pub time_limit_secs: Option<f64>,
    pub mip_gap: Option<f64>,
    /// Share of the area's targets that counts as covered for the
    /// time-to-cover objective.
    pub coverage_fraction: f64,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: None,
            mip_gap: None,
            coverage_fraction: 1.0,
        }
    }
}

impl ExactConfig {
    pub fn validate(&self) -> Result<(), InputError> {
        let f = self.coverage_fraction;
        if !(f > 0.0 && f <= 1.0) {
            return Err(InputError::InvalidCoverageFraction(f));
        }
        if let Some(secs) = self.time_limit_secs {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(InputError::InvalidTimeLimit(secs));
            }
        }
        if let Some(gap) = self.mip_gap {
            if !(gap.is_finite() && gap >= 0.0) {
                return Err(InputError::InvalidMipGap(gap));
            }
        }
        Ok(())
    }

    /// Number of targets out of `num_targets` that must be covered.
    pub fn coverage_quota(&self, num_targets: usize) -> usize {
        let quota = (self.coverage_fraction * num_targets as f64 - 1e-9).ceil();
        (quota.max(0.0) as usize).min(num_targets)
    }
}

/// Order in which drones pick their trajectory within a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DroneOrder {
    #[default]
    Fixed,
    Budget,
    /// Largest best available marginal gain first, re-evaluated every round.
    MarginalPotential,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedyConfig {
    pub drone_order: DroneOrder,
    /// Shortlist length per drone for the shortlist greedy. `None` uses the
    /// number of rounds.
    pub shortlist_len: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub generator: GeneratorConfig,
    pub exact: ExactConfig,
    pub greedy: GreedyConfig,
}
