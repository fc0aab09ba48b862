//! Session data model
//!
//! Typed rows for the tables the upstream timing provider hands us: laps,
//! classification results and the two status streams. Columns that the feed
//! may leave empty are `Option<T>`; absent boolean markers default to false.

use crate::units::Seconds;
use serde::{Deserialize, Serialize};

/// One timed lap of one driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    /// Driver abbreviation (e.g. "VER")
    pub driver: String,

    /// Car number as printed on the entry list
    #[serde(default)]
    pub driver_number: Option<String>,

    pub lap_number: u32,

    /// Session-elapsed time at which the lap started
    #[serde(default)]
    pub lap_start_time: Option<Seconds>,

    /// Session-elapsed time at which the lap was completed
    #[serde(default)]
    pub time: Option<Seconds>,

    #[serde(default)]
    pub lap_time: Option<Seconds>,

    #[serde(default)]
    pub sector_1_time: Option<Seconds>,

    #[serde(default)]
    pub sector_2_time: Option<Seconds>,

    #[serde(default)]
    pub sector_3_time: Option<Seconds>,

    /// Tyre compound (SOFT, MEDIUM, HARD, INTERMEDIATE, WET)
    #[serde(default)]
    pub compound: Option<String>,

    #[serde(default)]
    pub tyre_life: Option<u32>,

    /// Stint counter, scoped to the driver
    #[serde(default)]
    pub stint: Option<u32>,

    #[serde(default)]
    pub pit_in_time: Option<Seconds>,

    #[serde(default)]
    pub pit_out_time: Option<Seconds>,

    /// Whether the lap is a genuine representative timed lap
    #[serde(default)]
    pub is_accurate: bool,

    #[serde(default)]
    pub is_personal_best: bool,

    #[serde(default)]
    pub deleted: bool,
}

impl Lap {
    /// Sector durations in track order
    pub fn sector_times(&self) -> [Option<Seconds>; 3] {
        [self.sector_1_time, self.sector_2_time, self.sector_3_time]
    }

    /// Whether this lap belongs to the given driver, matched by
    /// abbreviation or car number
    pub fn is_driver(&self, driver: &str) -> bool {
        self.driver.eq_ignore_ascii_case(driver) || self.driver_number.as_deref() == Some(driver)
    }
}

/// Final classification row for one driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverResult {
    pub driver_number: String,
    pub abbreviation: String,

    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub team_name: String,

    /// Hex colour without the leading '#'
    #[serde(default)]
    pub team_color: Option<String>,

    /// Classified position; absent for non-classified drivers
    #[serde(default)]
    pub position: Option<u32>,
}

/// Session status vocabulary
///
/// Only `Started` and `Finished` carry meaning for phase reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Started,
    Finished,
    Aborted,
    Inactive,
    Finalised,
    Ends,
    #[serde(other)]
    Other,
}

/// Timestamped session status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusEvent {
    pub time: Seconds,
    pub status: SessionStatus,
}

/// Timestamped track status transition
///
/// `status` is the raw feed code ("1" = green, "4" = safety car, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackStatusEvent {
    pub time: Seconds,
    pub status: String,
}

/// Session type as far as phase reconstruction cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    Qualifying,
    SprintQualifying,
    Other,
}

impl SessionKind {
    /// Derive the kind from the session name used in requests
    /// ("Qualifying", "Sprint Qualifying", "Sprint Shootout", "Race", ...)
    pub fn from_session_name(name: &str) -> Self {
        let name = name.to_lowercase();
        let sprint = name.contains("sprint");
        if name.contains("qualifying") || (sprint && name.contains("shootout")) {
            if sprint {
                SessionKind::SprintQualifying
            } else {
                SessionKind::Qualifying
            }
        } else {
            SessionKind::Other
        }
    }

    pub fn is_qualifying(&self) -> bool {
        !matches!(self, SessionKind::Other)
    }

    /// Phase label prefix ("Q" / "SQ"); None for sessions without phases
    pub fn phase_prefix(&self) -> Option<&'static str> {
        match self {
            SessionKind::Qualifying => Some("Q"),
            SessionKind::SprintQualifying => Some("SQ"),
            SessionKind::Other => None,
        }
    }
}

/// Everything the engine needs from one loaded session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub laps: Vec<Lap>,

    #[serde(default)]
    pub results: Vec<DriverResult>,

    #[serde(default)]
    pub session_status: Vec<SessionStatusEvent>,

    #[serde(default)]
    pub track_status: Vec<TrackStatusEvent>,
}

/// Valid lap numbers and fastest lap of one driver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapListing {
    pub laps: Vec<u32>,
    pub fastest_lap: Option<u32>,
}

impl SessionData {
    /// Highest lap number in the session, 0 when there are no laps
    pub fn total_laps(&self) -> u32 {
        self.laps.iter().map(|l| l.lap_number).max().unwrap_or(0)
    }

    /// Lap listing for one driver; None when the driver has no laps at all
    pub fn lap_listing(&self, driver: &str) -> Option<LapListing> {
        let mut driver_laps: Vec<&Lap> = self.laps.iter().filter(|l| l.is_driver(driver)).collect();
        if driver_laps.is_empty() {
            return None;
        }
        driver_laps.sort_by_key(|l| l.lap_number);

        let laps = driver_laps
            .iter()
            .filter(|l| l.lap_time.is_some())
            .map(|l| l.lap_number)
            .collect();

        // Personal bests first, any timed lap when none is flagged
        let fastest = |personal_best_only: bool| {
            driver_laps
                .iter()
                .filter(|l| !l.deleted && (l.is_personal_best || !personal_best_only))
                .filter_map(|l| l.lap_time.map(|t| (t, l.lap_number)))
                .min_by(|a, b| a.0 .0.total_cmp(&b.0 .0))
                .map(|(_, n)| n)
        };
        let fastest_lap = fastest(true).or_else(|| fastest(false));

        Some(LapListing { laps, fastest_lap })
    }
}
