//! Track incident extraction
//!
//! Turns the raw track status stream into Safety Car / VSC / Red Flag
//! intervals and expresses them as lap ranges.

use crate::model::{Lap, TrackStatusEvent};
use crate::units::Seconds;
use serde::Serialize;
use tracing::debug;

/// Status code of normal running at the start of a session
const GREEN_CODE: &str = "1";

/// Track status codes that denote an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IncidentKind {
    #[serde(rename = "SC")]
    SafetyCar,
    #[serde(rename = "Red Flag")]
    RedFlag,
    #[serde(rename = "VSC")]
    VirtualSafetyCar,
}

impl IncidentKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "4" => Some(IncidentKind::SafetyCar),
            "5" => Some(IncidentKind::RedFlag),
            "6" => Some(IncidentKind::VirtualSafetyCar),
            _ => None,
        }
    }
}

/// Incident interval in session time; `end` is None when the stream ended
/// with the incident still active
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncidentInterval {
    pub kind: IncidentKind,
    pub start: Seconds,
    pub end: Option<Seconds>,
}

/// Incident expressed as an inclusive lap range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackIncident {
    #[serde(rename = "type")]
    pub kind: IncidentKind,
    pub start_lap: u32,
    pub end_lap: u32,
}

/// Walk the status stream and cut it into incident intervals
pub fn extract_incident_intervals(events: &[TrackStatusEvent]) -> Vec<IncidentInterval> {
    let mut intervals = Vec::new();
    let mut current: &str = GREEN_CODE;
    let mut opened_at = Seconds::ZERO;

    for event in events {
        let status = event.status.trim();
        if status == current {
            continue;
        }
        if let Some(kind) = IncidentKind::from_code(current) {
            intervals.push(IncidentInterval {
                kind,
                start: opened_at,
                end: Some(event.time),
            });
        }
        if IncidentKind::from_code(status).is_some() {
            opened_at = event.time;
        }
        current = status;
    }

    if let Some(kind) = IncidentKind::from_code(current) {
        intervals.push(IncidentInterval {
            kind,
            start: opened_at,
            end: None,
        });
    }

    intervals
}

/// Lap completions sorted by session time
fn timeline<'a>(laps: impl Iterator<Item = &'a Lap>) -> Vec<(Seconds, u32)> {
    let mut completions: Vec<(Seconds, u32)> = laps
        .filter_map(|l| l.time.map(|t| (t, l.lap_number)))
        .collect();
    completions.sort_by(|a, b| a.0 .0.total_cmp(&b.0 .0).then(a.1.cmp(&b.1)));
    completions
}

/// Map incident intervals onto lap numbers
///
/// Laps are counted on the leader's timeline: the first driver in
/// `classification` with a lap completed after the incident began. When no
/// classified driver has one, the laps of every driver are used.
///
/// The start lap is the first lap completed after the incident began, the end
/// lap the first lap completed once it was over. Both are clamped to
/// `1..=total_laps` with `end_lap >= start_lap`.
pub fn map_to_laps(
    intervals: &[IncidentInterval],
    laps: &[Lap],
    classification: &[&str],
    total_laps: u32,
) -> Vec<TrackIncident> {
    if total_laps == 0 {
        return Vec::new();
    }

    let everyone = timeline(laps.iter());
    let by_driver: Vec<Vec<(Seconds, u32)>> = classification
        .iter()
        .map(|driver| timeline(laps.iter().filter(|l| l.driver == *driver)))
        .collect();

    intervals
        .iter()
        .map(|interval| {
            let completions = by_driver
                .iter()
                .find(|c| c.iter().any(|(t, _)| t.0 > interval.start.0))
                .unwrap_or(&everyone);

            let start_lap = completions
                .iter()
                .find(|(t, _)| t.0 > interval.start.0)
                .map(|&(_, n)| n)
                .unwrap_or(1);
            let end_lap = interval
                .end
                .and_then(|end| completions.iter().find(|(t, _)| t.0 >= end.0))
                .map(|&(_, n)| n)
                .unwrap_or(total_laps);

            let start_lap = start_lap.clamp(1, total_laps);
            let end_lap = end_lap.min(total_laps).max(start_lap);
            TrackIncident {
                kind: interval.kind,
                start_lap,
                end_lap,
            }
        })
        .collect()
}

/// Track status stream to lap-ranged incidents
///
/// `classification` lists driver abbreviations in finishing order.
pub fn extract_incidents(
    events: &[TrackStatusEvent],
    laps: &[Lap],
    classification: &[&str],
    total_laps: u32,
) -> Vec<TrackIncident> {
    let intervals = extract_incident_intervals(events);
    debug!("Found {} track incidents in {} status events", intervals.len(), events.len());
    map_to_laps(&intervals, laps, classification, total_laps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::lap;
    use proptest::prelude::*;

    fn event(time: f64, status: &str) -> TrackStatusEvent {
        TrackStatusEvent {
            time: Seconds(time),
            status: status.to_string(),
        }
    }

    fn completed(number: u32, time: f64) -> Lap {
        completed_by("AAA", number, time)
    }

    fn completed_by(driver: &str, number: u32, time: f64) -> Lap {
        let mut l = lap(driver, number);
        l.time = Some(Seconds(time));
        l
    }

    #[test]
    fn test_safety_car_maps_to_laps() {
        let events = vec![event(0.0, "1"), event(100.0, "4"), event(140.0, "1")];
        let laps = vec![completed(1, 90.0), completed(2, 130.0), completed(3, 150.0)];
        let incidents = extract_incidents(&events, &laps, &["AAA"], 3);
        assert_eq!(
            incidents,
            vec![TrackIncident {
                kind: IncidentKind::SafetyCar,
                start_lap: 2,
                end_lap: 3,
            }]
        );
    }

    #[test]
    fn test_lap_count_follows_leader_not_lapped_car() {
        let laps = vec![
            completed_by("LAP", 8, 860.0),
            completed_by("LEA", 9, 900.0),
            completed_by("LAP", 9, 960.0),
            completed_by("LEA", 10, 1000.0),
            completed_by("LAP", 10, 1060.0),
            completed_by("LEA", 11, 1100.0),
        ];
        let events = vec![event(950.0, "4"), event(1050.0, "1")];

        let incidents = extract_incidents(&events, &laps, &["LEA", "LAP"], 11);
        assert_eq!(incidents[0].start_lap, 10);
        assert_eq!(incidents[0].end_lap, 11);
    }

    #[test]
    fn test_leader_without_laps_falls_back_to_next_classified() {
        // Leader retired before the incident; the runner-up's laps count
        let laps = vec![
            completed_by("LEA", 1, 90.0),
            completed_by("TWO", 1, 92.0),
            completed_by("TWO", 2, 184.0),
            completed_by("TWO", 3, 276.0),
        ];
        let events = vec![event(150.0, "6"), event(200.0, "1")];

        let incidents = extract_incidents(&events, &laps, &["LEA", "TWO"], 3);
        assert_eq!(incidents[0].start_lap, 2);
        assert_eq!(incidents[0].end_lap, 3);
    }

    #[test]
    fn test_unclassified_laps_use_every_driver() {
        let laps = vec![completed_by("XXX", 1, 90.0), completed_by("YYY", 2, 130.0)];
        let events = vec![event(100.0, "4"), event(120.0, "1")];

        let incidents = extract_incidents(&events, &laps, &["ZZZ"], 2);
        assert_eq!(incidents[0].start_lap, 2);
        assert_eq!(incidents[0].end_lap, 2);
    }

    #[test]
    fn test_incident_to_incident_transition() {
        let events = vec![event(10.0, "6"), event(50.0, "4"), event(90.0, "2"), event(95.0, "1")];
        let intervals = extract_incident_intervals(&events);
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].kind, IncidentKind::VirtualSafetyCar);
        assert_eq!(intervals[0].start, Seconds(10.0));
        assert_eq!(intervals[0].end, Some(Seconds(50.0)));
        assert_eq!(intervals[1].kind, IncidentKind::SafetyCar);
        assert_eq!(intervals[1].end, Some(Seconds(90.0)));
    }

    #[test]
    fn test_repeated_status_does_not_reopen() {
        let events = vec![event(10.0, "5"), event(20.0, "5"), event(30.0, "1")];
        let intervals = extract_incident_intervals(&events);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start, Seconds(10.0));
    }

    #[test]
    fn test_open_incident_runs_to_last_lap() {
        let events = vec![event(100.0, "5")];
        let laps = vec![completed(1, 90.0), completed(2, 130.0), completed(3, 150.0)];
        let incidents = extract_incidents(&events, &laps, &["AAA"], 3);
        assert_eq!(incidents[0].kind, IncidentKind::RedFlag);
        assert_eq!(incidents[0].start_lap, 2);
        assert_eq!(incidents[0].end_lap, 3);
    }

    #[test]
    fn test_incident_after_last_completion_is_clamped() {
        let events = vec![event(500.0, "4"), event(600.0, "1")];
        let laps = vec![completed(1, 90.0), completed(2, 130.0)];
        let incidents = extract_incidents(&events, &laps, &["AAA"], 2);
        // No lap completed after 500s: start defaults to lap 1, end to the last lap
        assert_eq!(incidents[0].start_lap, 1);
        assert_eq!(incidents[0].end_lap, 2);
    }

    #[test]
    fn test_no_laps_means_no_ranges() {
        let events = vec![event(100.0, "4"), event(140.0, "1")];
        assert!(extract_incidents(&events, &[], &[], 0).is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let incident = TrackIncident {
            kind: IncidentKind::VirtualSafetyCar,
            start_lap: 4,
            end_lap: 6,
        };
        let json = serde_json::to_value(incident).unwrap();
        assert_eq!(json["type"], "VSC");
        assert_eq!(json["start_lap"], 4);
    }

    proptest! {
        #[test]
        fn prop_lap_ranges_within_bounds(
            codes in prop::collection::vec((0.0f64..5000.0, 1u8..=7), 0..30),
            completions in prop::collection::vec((1u32..70, 0.0f64..5000.0), 1..80)
        ) {
            let mut events: Vec<TrackStatusEvent> = codes
                .iter()
                .map(|(t, c)| event(*t, &c.to_string()))
                .collect();
            events.sort_by(|a, b| a.time.0.total_cmp(&b.time.0));
            let laps: Vec<Lap> = completions.iter().map(|(n, t)| completed(*n, *t)).collect();
            let total = laps.iter().map(|l| l.lap_number).max().unwrap_or(0);

            for incident in extract_incidents(&events, &laps, &[], total) {
                prop_assert!(1 <= incident.start_lap);
                prop_assert!(incident.start_lap <= incident.end_lap);
                prop_assert!(incident.end_lap <= total);
            }
        }
    }
}
