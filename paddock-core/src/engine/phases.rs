//! Qualifying phase reconstruction and lap-to-phase assignment
//!
//! The timing feed has no phase column. Phase windows are rebuilt from the
//! session status stream (`Started` .. `Finished` pairs), and every lap is
//! placed in the window containing its start time, capped at the last phase
//! its driver was classified into.

use crate::config::EngineConfig;
use crate::model::{DriverResult, Lap, SessionKind, SessionStatus, SessionStatusEvent};
use crate::units::Seconds;
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// A phase of a session, ordered by index
///
/// Sessions without phases use the single implicit `Session` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Phase {
    index: usize,
    prefix: Option<&'static str>,
}

impl Phase {
    /// The whole-session phase of non-qualifying sessions
    pub const SESSION: Phase = Phase {
        index: 0,
        prefix: None,
    };

    /// Qualifying phase by 0-based index; `Session` for other session kinds
    pub fn for_kind(kind: SessionKind, index: usize) -> Self {
        match kind.phase_prefix() {
            Some(prefix) => Phase {
                index,
                prefix: Some(prefix),
            },
            None => Phase::SESSION,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> String {
        match self.prefix {
            Some(prefix) => format!("{}{}", prefix, self.index + 1),
            None => "Session".to_string(),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.label())
    }
}

/// Half-open interval `[start, end)` of session time belonging to one phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseWindow {
    pub phase: Phase,
    pub start: Seconds,
    pub end: Seconds,
}

impl PhaseWindow {
    pub fn contains(&self, t: Seconds) -> bool {
        self.start.0 <= t.0 && t.0 < self.end.0
    }
}

/// Rebuild qualifying phase windows from the session status stream
///
/// Window 1 runs from the first `Started` to the first `Finished` after it.
/// Each later window opens at the first `Started` after the previous window
/// closed and ends at the first `Finished` after that. A missing event ends
/// the list early; non-qualifying sessions have no windows.
pub fn extract_phase_windows(
    events: &[SessionStatusEvent],
    kind: SessionKind,
    max_phases: usize,
) -> Vec<PhaseWindow> {
    if !kind.is_qualifying() {
        return Vec::new();
    }

    let times_of = |status: SessionStatus| -> Vec<Seconds> {
        events
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.time)
            .collect()
    };
    let started = times_of(SessionStatus::Started);
    let finished = times_of(SessionStatus::Finished);

    let mut windows: Vec<PhaseWindow> = Vec::new();
    for index in 0..max_phases {
        let start = match windows.last() {
            None => started.first().copied(),
            Some(prev) => started.iter().copied().find(|s| s.0 > prev.end.0),
        };
        let Some(start) = start else { break };
        let Some(end) = finished.iter().copied().find(|f| f.0 > start.0) else {
            break;
        };
        windows.push(PhaseWindow {
            phase: Phase::for_kind(kind, index),
            start,
            end,
        });
    }

    debug!(
        "Extracted {} phase windows from {} status events",
        windows.len(),
        events.len()
    );
    windows
}

/// Last phase index each driver was permitted to run in
#[derive(Debug, Clone, Default)]
pub struct EliminationTable {
    by_driver: HashMap<String, usize>,
}

impl EliminationTable {
    pub fn from_results(results: &[DriverResult], config: &EngineConfig) -> Self {
        let by_driver = results
            .iter()
            .map(|r| (r.abbreviation.clone(), config.elimination_index(r.position)))
            .collect();
        Self { by_driver }
    }

    /// Unknown drivers are treated as knocked out in the first phase
    pub fn index_for(&self, driver: &str) -> usize {
        self.by_driver.get(driver).copied().unwrap_or(0)
    }

    /// Furthest phase index any classified driver reached
    pub fn max_index(&self) -> usize {
        self.by_driver.values().copied().max().unwrap_or(0)
    }
}

/// Place one lap in a phase
///
/// A lap inside a window its driver was no longer eligible for counts toward
/// the driver's own last phase. A lap outside every window still counts
/// toward that last phase if it started within the grace period after the
/// phase closed. Everything else is unassigned.
pub fn assign_lap(
    lap: &Lap,
    windows: &[PhaseWindow],
    allowed: usize,
    grace: Seconds,
) -> Option<Phase> {
    let start = lap.lap_start_time?;

    if let Some((i, window)) = windows.iter().enumerate().find(|(_, w)| w.contains(start)) {
        return if i > allowed {
            windows.get(allowed).map(|w| w.phase)
        } else {
            Some(window.phase)
        };
    }

    windows
        .get(allowed)
        .filter(|w| w.end.0 <= start.0 && start.0 < (w.end + grace).0)
        .map(|w| w.phase)
}

/// Phase labels for a whole lap table
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseAssignment {
    /// One entry per input lap, in input order
    pub phases: Vec<Option<Phase>>,
    /// Every phase that was reachable or actually used, ordered by index
    pub available: Vec<Phase>,
}

impl PhaseAssignment {
    pub fn unassigned(&self) -> usize {
        self.phases.iter().filter(|p| p.is_none()).count()
    }
}

/// Assign every lap of the session to a phase
pub fn assign_phases(
    laps: &[Lap],
    kind: SessionKind,
    windows: &[PhaseWindow],
    eliminations: &EliminationTable,
    config: &EngineConfig,
) -> PhaseAssignment {
    if !kind.is_qualifying() {
        let available = if laps.is_empty() {
            Vec::new()
        } else {
            vec![Phase::SESSION]
        };
        return PhaseAssignment {
            phases: vec![Some(Phase::SESSION); laps.len()],
            available,
        };
    }

    let grace = config.grace_period();
    let phases: Vec<Option<Phase>> = laps
        .iter()
        .map(|lap| assign_lap(lap, windows, eliminations.index_for(&lap.driver), grace))
        .collect();

    let reachable = eliminations.max_index().min(config.phase_count() - 1);
    let available: BTreeSet<Phase> = (0..=reachable)
        .map(|i| Phase::for_kind(kind, i))
        .chain(phases.iter().flatten().copied())
        .collect();

    let assignment = PhaseAssignment {
        phases,
        available: available.into_iter().collect(),
    };
    debug!(
        "Assigned {} of {} laps to phases ({} unassigned)",
        laps.len() - assignment.unassigned(),
        laps.len(),
        assignment.unassigned()
    );
    assignment
}
