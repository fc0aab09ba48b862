//! Race/qualifying summary assembly
//!
//! Runs the whole pipeline for one session: phase windows, phase assignment,
//! sector baselines, run segmentation and track incidents, and shapes the
//! result into the per-driver structure returned by the API.

use super::incidents::{extract_incidents, TrackIncident};
use super::phases::{assign_phases, extract_phase_windows, EliminationTable, Phase};
use super::sectors::{rate_lap, SectorBaselines, SectorRating};
use super::segments::{segment_runs, LapKind, PhasedLap, Run};
use crate::config::EngineConfig;
use crate::error::{Result, SummaryError};
use crate::model::{DriverResult, SessionData, SessionKind};
use crate::units::Seconds;
use serde::Serialize;
use tracing::{debug, warn};

/// Team colour used when the feed has none
const DEFAULT_TEAM_COLOR: &str = "777777";

/// Complete summary of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceSummary {
    pub results: Vec<DriverSummary>,
    pub total_laps: u32,
    pub track_status_events: Vec<TrackIncident>,
    pub available_phases: Vec<Phase>,
}

impl RaceSummary {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            total_laps: 0,
            track_status_events: Vec::new(),
            available_phases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverSummary {
    pub position: u32,
    pub driver_number: String,
    pub abbreviation: String,
    pub full_name: String,
    pub team_name: String,
    pub team_color: String,
    pub stints: Vec<StintSummary>,
    /// Last phase the driver was classified into
    pub max_phase: Phase,
}

/// One run of a stint, as shown in the summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StintSummary {
    pub stint_number: Option<u32>,
    pub run_number: u32,
    pub compound: Option<String>,
    pub lap_count: usize,
    pub start_lap: u32,
    pub end_lap: u32,
    pub laps: Vec<LapSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapSummary {
    pub lap_number: u32,
    /// Formatted as `m:ss.mmm`
    pub lap_time: Option<String>,
    pub lap_time_seconds: Option<Seconds>,
    #[serde(rename = "type")]
    pub kind: LapKind,
    pub phase: Phase,
    pub is_pb: bool,
    pub compound: Option<String>,
    pub sectors: LapSectors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapSectors {
    pub s1: SectorSummary,
    pub s2: SectorSummary,
    pub s3: SectorSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectorSummary {
    pub time: Option<Seconds>,
    pub status: SectorRating,
}

/// Build the summary for one loaded session
///
/// A session without laps yields an empty summary. Laps without any
/// classification to attach them to are a structural error.
pub fn build_race_summary(
    data: &SessionData,
    kind: SessionKind,
    config: &EngineConfig,
) -> Result<RaceSummary> {
    if data.laps.is_empty() {
        return Ok(RaceSummary::empty());
    }
    if data.results.is_empty() {
        return Err(SummaryError::Computation(
            "session has laps but no classification results".to_string(),
        ));
    }

    let total_laps = data.total_laps();
    let windows = extract_phase_windows(&data.session_status, kind, config.phase_count());
    if kind.is_qualifying() && windows.is_empty() {
        warn!("No qualifying phase windows could be rebuilt; all laps stay unassigned");
    }

    let eliminations = EliminationTable::from_results(&data.results, config);
    let assignment = assign_phases(&data.laps, kind, &windows, &eliminations, config);
    let baselines = SectorBaselines::compute(&data.laps, &assignment.phases);
    let track_status_events = extract_incidents(
        &data.track_status,
        &data.laps,
        &classification_order(&data.results),
        total_laps,
    );

    let results = data
        .results
        .iter()
        .map(|result| {
            let laps = data
                .laps
                .iter()
                .zip(assignment.phases.iter().copied())
                .filter(|(lap, _)| lap.driver == result.abbreviation);
            let runs = segment_runs(laps);
            let stints = runs
                .iter()
                .map(|run| stint_summary(run, &result.abbreviation, &baselines, config))
                .collect();
            driver_summary(
                result,
                stints,
                Phase::for_kind(kind, eliminations.index_for(&result.abbreviation)),
                config,
            )
        })
        .collect();

    debug!(
        "Summarised {} drivers over {} laps ({} incidents)",
        data.results.len(),
        total_laps,
        track_status_events.len()
    );

    Ok(RaceSummary {
        results,
        total_laps,
        track_status_events,
        available_phases: assignment.available,
    })
}

/// Driver abbreviations by classified position, unclassified drivers last
fn classification_order(results: &[DriverResult]) -> Vec<&str> {
    let mut ordered: Vec<&DriverResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.position.unwrap_or(u32::MAX));
    ordered.iter().map(|r| r.abbreviation.as_str()).collect()
}

fn driver_summary(
    result: &DriverResult,
    stints: Vec<StintSummary>,
    max_phase: Phase,
    config: &EngineConfig,
) -> DriverSummary {
    DriverSummary {
        position: result.position.unwrap_or(config.missing_position),
        driver_number: result.driver_number.clone(),
        abbreviation: result.abbreviation.clone(),
        full_name: result.full_name.clone(),
        team_name: result.team_name.clone(),
        team_color: result
            .team_color
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_TEAM_COLOR.to_string()),
        stints,
        max_phase,
    }
}

fn stint_summary(
    run: &Run<'_>,
    driver: &str,
    baselines: &SectorBaselines,
    config: &EngineConfig,
) -> StintSummary {
    StintSummary {
        stint_number: run.stint,
        run_number: run.run_number,
        compound: run.compound().map(str::to_string),
        lap_count: run.lap_count(),
        start_lap: run.start_lap(),
        end_lap: run.end_lap(),
        laps: run
            .laps
            .iter()
            .map(|phased| lap_summary(phased, driver, baselines, config))
            .collect(),
    }
}

fn lap_summary(
    phased: &PhasedLap<'_>,
    driver: &str,
    baselines: &SectorBaselines,
    config: &EngineConfig,
) -> LapSummary {
    let lap = phased.lap;
    let ratings = rate_lap(
        lap,
        &baselines.driver_best(driver, phased.phase),
        &baselines.phase_best(phased.phase),
        config.sector_epsilon_secs,
    );
    let [t1, t2, t3] = lap.sector_times();

    LapSummary {
        lap_number: lap.lap_number,
        lap_time: lap.lap_time.map(|t| t.format_lap_time()),
        lap_time_seconds: lap.lap_time,
        kind: LapKind::classify(lap),
        phase: phased.phase,
        is_pb: lap.is_personal_best,
        compound: lap.compound.clone(),
        sectors: LapSectors {
            s1: SectorSummary {
                time: t1,
                status: ratings[0],
            },
            s2: SectorSummary {
                time: t2,
                status: ratings[1],
            },
            s3: SectorSummary {
                time: t3,
                status: ratings[2],
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{lap, result};
    use crate::model::{Lap, SessionStatus, SessionStatusEvent, TrackStatusEvent};
    use proptest::prelude::*;

    fn status(time: f64, status: SessionStatus) -> SessionStatusEvent {
        SessionStatusEvent {
            time: Seconds(time),
            status,
        }
    }

    fn quali_lap(driver: &str, number: u32, start: f64, sectors: [f64; 3]) -> Lap {
        let mut l = lap(driver, number);
        l.lap_start_time = Some(Seconds(start));
        l.time = Some(Seconds(start + sectors.iter().sum::<f64>()));
        l.lap_time = Some(Seconds(sectors.iter().sum()));
        l.sector_1_time = Some(Seconds(sectors[0]));
        l.sector_2_time = Some(Seconds(sectors[1]));
        l.sector_3_time = Some(Seconds(sectors[2]));
        l.stint = Some(1);
        l.compound = Some("SOFT".to_string());
        l.is_accurate = true;
        l
    }

    fn quali_session() -> SessionData {
        SessionData {
            laps: vec![
                quali_lap("AAA", 1, 100.0, [30.0, 40.0, 20.0]),
                quali_lap("AAA", 2, 700.0, [29.5, 40.2, 20.1]),
                quali_lap("AAA", 3, 1300.0, [29.0, 39.8, 19.9]),
                quali_lap("BBB", 1, 110.0, [29.8, 40.5, 20.3]),
                quali_lap("BBB", 2, 700.0, [29.9, 40.6, 20.4]),
            ],
            results: vec![result("AAA", Some(3)), result("BBB", Some(18))],
            session_status: vec![
                status(0.0, SessionStatus::Started),
                status(600.0, SessionStatus::Finished),
                status(650.0, SessionStatus::Started),
                status(1200.0, SessionStatus::Finished),
                status(1250.0, SessionStatus::Started),
                status(1800.0, SessionStatus::Finished),
            ],
            track_status: Vec::new(),
        }
    }

    fn phases_of(driver: &DriverSummary) -> Vec<String> {
        driver
            .stints
            .iter()
            .flat_map(|s| s.laps.iter().map(|l| l.phase.label()))
            .collect()
    }

    #[test]
    fn test_empty_laps_yield_empty_summary() {
        let config = EngineConfig::default();
        let summary = build_race_summary(&SessionData::default(), SessionKind::Other, &config);
        let summary = summary.unwrap();
        assert!(summary.results.is_empty());
        assert_eq!(summary.total_laps, 0);
    }

    #[test]
    fn test_laps_without_results_is_an_error() {
        let data = SessionData {
            laps: vec![lap("AAA", 1)],
            ..Default::default()
        };
        let err =
            build_race_summary(&data, SessionKind::Other, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, SummaryError::Computation(_)));
    }

    #[test]
    fn test_qualifying_phases_per_driver() {
        let summary =
            build_race_summary(&quali_session(), SessionKind::Qualifying, &EngineConfig::default())
                .unwrap();

        let a = &summary.results[0];
        assert_eq!(phases_of(a), vec!["Q1", "Q2", "Q3"]);
        assert_eq!(a.max_phase.label(), "Q3");

        let b = &summary.results[1];
        assert_eq!(phases_of(b), vec!["Q1", "Q1"]);
        assert_eq!(b.max_phase.label(), "Q1");

        let labels: Vec<String> = summary.available_phases.iter().map(|p| p.label()).collect();
        assert_eq!(labels, vec!["Q1", "Q2", "Q3"]);
        assert_eq!(summary.total_laps, 3);
    }

    #[test]
    fn test_sector_ratings_within_phase() {
        let summary =
            build_race_summary(&quali_session(), SessionKind::Qualifying, &EngineConfig::default())
                .unwrap();
        let b = &summary.results[1];
        // BBB's capped lap 2 competes in Q1 against AAA's lap 1 (30.0 / 40.0 / 20.0)
        let first = &b.stints[0].laps[0];
        assert_eq!(first.sectors.s1.status, SectorRating::Purple);
        assert_eq!(first.sectors.s2.status, SectorRating::Green);
        let second = &b.stints[0].laps[1];
        assert_eq!(second.sectors.s1.status, SectorRating::Yellow);

        let a = &summary.results[0];
        let q1_lap = &a.stints[0].laps[0];
        assert_eq!(q1_lap.sectors.s2.status, SectorRating::Purple);
        assert_eq!(q1_lap.sectors.s3.status, SectorRating::Purple);
        assert_eq!(q1_lap.lap_time.as_deref(), Some("1:30.000"));
        assert_eq!(q1_lap.kind, LapKind::Push);
    }

    #[test]
    fn test_unassigned_laps_split_runs() {
        let mut data = quali_session();
        // Lap starting long after Q1 closed (and outside the grace period) for a Q1 driver
        data.laps.push(quali_lap("BBB", 3, 1500.0, [30.0, 41.0, 21.0]));
        data.laps.push(quali_lap("BBB", 4, 150.0, [30.0, 41.0, 21.0]));
        let summary =
            build_race_summary(&data, SessionKind::Qualifying, &EngineConfig::default()).unwrap();
        let b = &summary.results[1];
        // BBB lap 3 started inside Q3 so it is capped to Q1, not dropped
        assert_eq!(b.stints.iter().map(|s| s.lap_count).sum::<usize>(), 4);

        let mut data = quali_session();
        data.laps.push(quali_lap("BBB", 3, 3000.0, [30.0, 41.0, 21.0]));
        data.laps.push(quali_lap("BBB", 4, 150.0, [30.0, 41.0, 21.0]));
        let summary =
            build_race_summary(&data, SessionKind::Qualifying, &EngineConfig::default()).unwrap();
        let b = &summary.results[1];
        assert_eq!(b.stints.len(), 2);
        assert_eq!((b.stints[0].start_lap, b.stints[0].end_lap), (1, 2));
        assert_eq!((b.stints[1].start_lap, b.stints[1].end_lap), (4, 4));
        assert_eq!(b.stints[1].run_number, 2);
    }

    #[test]
    fn test_race_session_uses_single_phase_and_incidents() {
        let mut data = quali_session();
        data.session_status.clear();
        data.track_status = vec![
            TrackStatusEvent {
                time: Seconds(95.0),
                status: "4".to_string(),
            },
            TrackStatusEvent {
                time: Seconds(780.0),
                status: "1".to_string(),
            },
        ];
        let summary =
            build_race_summary(&data, SessionKind::Other, &EngineConfig::default()).unwrap();
        assert_eq!(summary.available_phases, vec![Phase::SESSION]);
        assert!(summary.results.iter().all(|d| d.max_phase == Phase::SESSION));
        assert_eq!(summary.track_status_events.len(), 1);
        assert_eq!(summary.track_status_events[0].start_lap, 1);
        assert_eq!(summary.track_status_events[0].end_lap, 2);
    }

    #[test]
    fn test_missing_identity_fields_use_defaults() {
        let mut data = quali_session();
        data.results[1].position = None;
        data.results[1].team_color = None;
        let summary =
            build_race_summary(&data, SessionKind::Qualifying, &EngineConfig::default()).unwrap();
        assert_eq!(summary.results[1].position, 20);
        assert_eq!(summary.results[1].team_color, "777777");
    }

    #[test]
    fn test_summary_is_idempotent() {
        let data = quali_session();
        let config = EngineConfig::default();
        let first = build_race_summary(&data, SessionKind::Qualifying, &config).unwrap();
        let second = build_race_summary(&data, SessionKind::Qualifying, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_serialized_shape() {
        let summary =
            build_race_summary(&quali_session(), SessionKind::Qualifying, &EngineConfig::default())
                .unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["available_phases"], serde_json::json!(["Q1", "Q2", "Q3"]));
        let lap = &json["results"][0]["stints"][0]["laps"][0];
        assert_eq!(lap["type"], "push");
        assert_eq!(lap["phase"], "Q1");
        assert_eq!(lap["sectors"]["s1"]["time"], 30.0);
        assert!(json["track_status_events"].as_array().unwrap().is_empty());
    }

    const DRIVERS: [&str; 3] = ["AAA", "BBB", "CCC"];

    fn arb_lap() -> impl Strategy<Value = Lap> {
        (
            prop::sample::select(DRIVERS.to_vec()),
            1u32..40,
            prop::option::of(0.0f64..2000.0),
            prop::option::of(1u32..4),
            prop::array::uniform3(prop::option::of(20.0f64..40.0)),
            any::<bool>(),
        )
            .prop_map(|(driver, number, start, stint, sectors, accurate)| {
                let mut l = lap(driver, number);
                l.lap_start_time = start.map(Seconds);
                l.sector_1_time = sectors[0].map(Seconds);
                l.sector_2_time = sectors[1].map(Seconds);
                l.sector_3_time = sectors[2].map(Seconds);
                if let [Some(a), Some(b), Some(c)] = sectors {
                    l.lap_time = Some(Seconds(a + b + c));
                    l.time = start.map(|t| Seconds(t + a + b + c));
                }
                l.stint = stint;
                l.is_accurate = accurate;
                l
            })
    }

    fn arb_session() -> impl Strategy<Value = (SessionData, bool)> {
        (
            prop::collection::vec(arb_lap(), 1..60),
            prop::collection::vec(prop::option::of(1u32..=20), 3),
            prop::collection::vec(
                (0.0f64..2000.0, prop::sample::select(vec![
                    SessionStatus::Started,
                    SessionStatus::Finished,
                    SessionStatus::Aborted,
                ])),
                0..8,
            ),
            prop::collection::vec((0.0f64..2000.0, 1u8..=7), 0..6),
            any::<bool>(),
        )
            .prop_map(|(laps, positions, statuses, tracks, qualifying)| {
                let mut session_status: Vec<SessionStatusEvent> =
                    statuses.into_iter().map(|(t, s)| status(t, s)).collect();
                session_status.sort_by(|a, b| a.time.0.total_cmp(&b.time.0));
                let mut track_status: Vec<TrackStatusEvent> = tracks
                    .into_iter()
                    .map(|(t, c)| TrackStatusEvent {
                        time: Seconds(t),
                        status: c.to_string(),
                    })
                    .collect();
                track_status.sort_by(|a, b| a.time.0.total_cmp(&b.time.0));
                let results = DRIVERS
                    .iter()
                    .zip(positions)
                    .map(|(d, p)| result(d, p))
                    .collect();
                let data = SessionData {
                    laps,
                    results,
                    session_status,
                    track_status,
                };
                (data, qualifying)
            })
    }

    proptest! {
        #[test]
        fn prop_summary_is_idempotent_and_partitions_assigned_laps(
            (data, qualifying) in arb_session()
        ) {
            let kind = if qualifying { SessionKind::Qualifying } else { SessionKind::Other };
            let config = EngineConfig::default();

            let first = build_race_summary(&data, kind, &config).unwrap();
            let second = build_race_summary(&data, kind, &config).unwrap();
            prop_assert_eq!(&first, &second);

            let windows = extract_phase_windows(&data.session_status, kind, config.phase_count());
            let eliminations = EliminationTable::from_results(&data.results, &config);
            let assignment = assign_phases(&data.laps, kind, &windows, &eliminations, &config);

            for driver in &first.results {
                let mut expected: Vec<(u32, String)> = data
                    .laps
                    .iter()
                    .zip(assignment.phases.iter())
                    .filter(|(l, _)| l.driver == driver.abbreviation)
                    .filter_map(|(l, p)| p.map(|p| (l.lap_number, p.label())))
                    .collect();
                let mut actual: Vec<(u32, String)> = driver
                    .stints
                    .iter()
                    .flat_map(|s| s.laps.iter().map(|l| (l.lap_number, l.phase.label())))
                    .collect();
                expected.sort();
                actual.sort();
                prop_assert_eq!(actual, expected);

                let counted: usize = driver.stints.iter().map(|s| s.lap_count).sum();
                let listed: usize = driver.stints.iter().map(|s| s.laps.len()).sum();
                prop_assert_eq!(counted, listed);
            }
        }
    }
}
