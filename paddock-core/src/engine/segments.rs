//! Stint and run segmentation
//!
//! A run is a stretch of consecutive lap numbers on one stint. Laps that could
//! not be placed in a phase are removed before contiguity is evaluated, so
//! they open a gap like any other missing lap.

use super::phases::Phase;
use crate::model::Lap;
use serde::Serialize;

/// What a lap was used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LapKind {
    /// Accurate representative timed lap
    Push,
    /// Left the pit lane on this lap
    Out,
    /// Entered the pit lane on this lap
    In,
    /// Anything else (cool-down, banker, installation)
    Prep,
}

impl LapKind {
    pub fn classify(lap: &Lap) -> Self {
        if lap.is_accurate {
            LapKind::Push
        } else if lap.pit_out_time.is_some() {
            LapKind::Out
        } else if lap.pit_in_time.is_some() {
            LapKind::In
        } else {
            LapKind::Prep
        }
    }
}

/// A lap together with the phase it was assigned to
#[derive(Debug, Clone, Copy)]
pub struct PhasedLap<'a> {
    pub lap: &'a Lap,
    pub phase: Phase,
}

/// Maximal run of contiguous laps on one stint
#[derive(Debug, Clone)]
pub struct Run<'a> {
    /// 1-based, in lap order
    pub run_number: u32,
    pub stint: Option<u32>,
    pub laps: Vec<PhasedLap<'a>>,
}

impl Run<'_> {
    pub fn compound(&self) -> Option<&str> {
        self.laps.first().and_then(|l| l.lap.compound.as_deref())
    }

    pub fn start_lap(&self) -> u32 {
        self.laps.first().map(|l| l.lap.lap_number).unwrap_or(0)
    }

    pub fn end_lap(&self) -> u32 {
        self.laps.last().map(|l| l.lap.lap_number).unwrap_or(0)
    }

    pub fn lap_count(&self) -> usize {
        self.laps.len()
    }
}

/// Split one driver's laps into runs
///
/// Unassigned laps (`phase == None`) are dropped first. The remaining laps are
/// ordered by lap number and a new run starts on a lap-number gap or a stint
/// change. Every assigned lap lands in exactly one run and no run is empty.
pub fn segment_runs<'a, I>(laps: I) -> Vec<Run<'a>>
where
    I: IntoIterator<Item = (&'a Lap, Option<Phase>)>,
{
    let mut assigned: Vec<PhasedLap<'a>> = laps
        .into_iter()
        .filter_map(|(lap, phase)| phase.map(|phase| PhasedLap { lap, phase }))
        .collect();
    assigned.sort_by_key(|l| l.lap.lap_number);

    let mut runs: Vec<Run<'a>> = Vec::new();
    for phased in assigned {
        let continues = runs.last().is_some_and(|run| {
            let prev = run.laps[run.laps.len() - 1].lap;
            run.stint == phased.lap.stint && phased.lap.lap_number - prev.lap_number <= 1
        });

        if continues {
            if let Some(run) = runs.last_mut() {
                run.laps.push(phased);
            }
        } else {
            runs.push(Run {
                run_number: runs.len() as u32 + 1,
                stint: phased.lap.stint,
                laps: vec![phased],
            });
        }
    }
    runs
}
