//! Engine configuration
//!
//! Qualifying formats differ in how many cars advance between phases, and the
//! post-window grace period is a heuristic rather than a rule of the sport, so
//! both live here instead of in the engine.

use crate::error::SummaryError;
use crate::units::Seconds;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for phase assignment and sector rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worst classified position still eligible for each later phase.
    ///
    /// Entry `k` gates phase index `k + 1`; the default `[15, 10]` is the
    /// standard 20-car Q1/Q2/Q3 format.
    pub elimination_cutoffs: Vec<u32>,

    /// How long after a phase window closes a lap may still start and be
    /// counted in that phase (unverified domain policy, default 5 minutes)
    pub grace_period_secs: f64,

    /// Tolerance when comparing a sector time against a best
    pub sector_epsilon_secs: f64,

    /// Position assumed for drivers without a classification
    pub missing_position: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            elimination_cutoffs: vec![15, 10],
            grace_period_secs: 300.0,
            sector_epsilon_secs: 0.001,
            missing_position: 20,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self, SummaryError> {
        let invalid = |what: &str, e: &dyn std::fmt::Display| {
            SummaryError::InvalidParameter(format!("{} {}: {}", what, path.display(), e))
        };
        let data = std::fs::read_to_string(path)
            .map_err(|e| invalid("cannot read engine config", &e))?;
        let config: EngineConfig =
            serde_json::from_str(&data).map_err(|e| invalid("invalid engine config", &e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SummaryError> {
        if self.elimination_cutoffs.contains(&0) {
            return Err(SummaryError::InvalidParameter(
                "elimination cutoffs must be positive".to_string(),
            ));
        }
        if self.elimination_cutoffs.windows(2).any(|w| w[1] > w[0]) {
            return Err(SummaryError::InvalidParameter(
                "elimination cutoffs must not increase from one phase to the next".to_string(),
            ));
        }
        if self.grace_period_secs < 0.0 || self.sector_epsilon_secs < 0.0 {
            return Err(SummaryError::InvalidParameter(
                "grace period and sector epsilon must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of phases in a qualifying session under this format
    pub fn phase_count(&self) -> usize {
        self.elimination_cutoffs.len() + 1
    }

    pub fn grace_period(&self) -> Seconds {
        Seconds(self.grace_period_secs)
    }

    /// Highest phase index a driver classified at `position` may run in
    pub fn elimination_index(&self, position: Option<u32>) -> usize {
        let position = position.unwrap_or(self.missing_position);
        self.elimination_cutoffs
            .iter()
            .take_while(|&&cutoff| position <= cutoff)
            .count()
    }
}
