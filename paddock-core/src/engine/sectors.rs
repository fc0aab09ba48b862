//! Sector baselines and the purple/green/yellow rating

use super::phases::Phase;
use crate::model::Lap;
use crate::units::Seconds;
use serde::Serialize;
use std::collections::HashMap;

/// Best sector 1/2/3 times over some set of laps
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SectorBests {
    pub sectors: [Option<Seconds>; 3],
}

impl SectorBests {
    /// Minimum per sector, preferring accurate laps when there are any
    pub fn from_laps<'a>(laps: impl IntoIterator<Item = &'a Lap>) -> Self {
        let laps: Vec<&Lap> = laps.into_iter().collect();
        let accurate_only = laps.iter().any(|l| l.is_accurate);

        let mut sectors = [None; 3];
        for lap in laps.iter().filter(|l| !accurate_only || l.is_accurate) {
            for (best, time) in sectors.iter_mut().zip(lap.sector_times()) {
                *best = Seconds::min_opt(*best, time);
            }
        }
        Self { sectors }
    }
}

/// Phase-wide and per-driver-per-phase sector bests for one session
///
/// Built once per summary and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SectorBaselines {
    phase_bests: HashMap<Phase, SectorBests>,
    driver_bests: HashMap<(String, Phase), SectorBests>,
}

impl SectorBaselines {
    /// `phases` runs parallel to `laps`; unassigned laps contribute nothing
    pub fn compute(laps: &[Lap], phases: &[Option<Phase>]) -> Self {
        let mut by_phase: HashMap<Phase, Vec<&Lap>> = HashMap::new();
        let mut by_driver: HashMap<(String, Phase), Vec<&Lap>> = HashMap::new();
        for (lap, phase) in laps.iter().zip(phases) {
            let Some(phase) = *phase else { continue };
            by_phase.entry(phase).or_default().push(lap);
            by_driver
                .entry((lap.driver.clone(), phase))
                .or_default()
                .push(lap);
        }

        Self {
            phase_bests: by_phase
                .into_iter()
                .map(|(phase, laps)| (phase, SectorBests::from_laps(laps)))
                .collect(),
            driver_bests: by_driver
                .into_iter()
                .map(|(key, laps)| (key, SectorBests::from_laps(laps)))
                .collect(),
        }
    }

    /// Fastest sectors of anyone in the phase; all absent for an empty phase
    pub fn phase_best(&self, phase: Phase) -> SectorBests {
        self.phase_bests.get(&phase).copied().unwrap_or_default()
    }

    pub fn driver_best(&self, driver: &str, phase: Phase) -> SectorBests {
        self.driver_bests
            .get(&(driver.to_string(), phase))
            .copied()
            .unwrap_or_default()
    }
}

/// Colour rating of one sector time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectorRating {
    /// Fastest of the phase
    Purple,
    /// Driver's own best of the phase
    Green,
    Yellow,
    /// No sector time recorded
    None,
}

impl SectorRating {
    /// Higher is better
    pub fn rank(&self) -> u8 {
        match self {
            SectorRating::Purple => 3,
            SectorRating::Green => 2,
            SectorRating::Yellow => 1,
            SectorRating::None => 0,
        }
    }
}

/// Rate a sector time against the driver's and the phase's best
pub fn rate_sector(
    time: Option<Seconds>,
    driver_best: Option<Seconds>,
    phase_best: Option<Seconds>,
    epsilon: f64,
) -> SectorRating {
    let Some(time) = time else {
        return SectorRating::None;
    };
    if phase_best.is_some_and(|best| time.0 <= best.0 + epsilon) {
        SectorRating::Purple
    } else if driver_best.is_some_and(|best| time.0 <= best.0 + epsilon) {
        SectorRating::Green
    } else {
        SectorRating::Yellow
    }
}

/// Rate all three sectors of a lap
pub fn rate_lap(
    lap: &Lap,
    driver_best: &SectorBests,
    phase_best: &SectorBests,
    epsilon: f64,
) -> [SectorRating; 3] {
    let times = lap.sector_times();
    std::array::from_fn(|i| {
        rate_sector(
            times[i],
            driver_best.sectors[i],
            phase_best.sectors[i],
            epsilon,
        )
    })
}
