//! Demo source that generates synthetic sessions for testing
//!
//! Simulates a 20-car field through a three-phase qualifying, a practice
//! session and a short race with a safety car, a VSC and one pit stop each.
//! Output is deterministic so summaries can be compared across runs.

use paddock_core::config::EngineConfig;
use paddock_core::model::*;
use paddock_core::source::{SessionKey, SessionSource, SourceError};
use paddock_core::units::Seconds;
use std::collections::HashMap;
use tracing::debug;

// =============================================================================
// Field definition
// =============================================================================

#[derive(Clone, Copy)]
struct DemoDriver {
    number: &'static str,
    abbreviation: &'static str,
    full_name: &'static str,
    team: &'static str,
    color: &'static str,
    pace: f64, // seconds off the reference lap
}

/// Grid in final classification order
#[rustfmt::skip]
fn demo_grid() -> Vec<DemoDriver> {
    vec![
        DemoDriver { number: "1",  abbreviation: "VER", full_name: "Max Verstappen",   team: "Red Bull Racing", color: "3671C6", pace: 0.00 },
        DemoDriver { number: "16", abbreviation: "LEC", full_name: "Charles Leclerc",  team: "Ferrari",         color: "E8002D", pace: 0.08 },
        DemoDriver { number: "4",  abbreviation: "NOR", full_name: "Lando Norris",     team: "McLaren",         color: "FF8000", pace: 0.12 },
        DemoDriver { number: "55", abbreviation: "SAI", full_name: "Carlos Sainz",     team: "Ferrari",         color: "E8002D", pace: 0.18 },
        DemoDriver { number: "81", abbreviation: "PIA", full_name: "Oscar Piastri",    team: "McLaren",         color: "FF8000", pace: 0.22 },
        DemoDriver { number: "63", abbreviation: "RUS", full_name: "George Russell",   team: "Mercedes",        color: "27F4D2", pace: 0.27 },
        DemoDriver { number: "44", abbreviation: "HAM", full_name: "Lewis Hamilton",   team: "Mercedes",        color: "27F4D2", pace: 0.31 },
        DemoDriver { number: "11", abbreviation: "PER", full_name: "Sergio Perez",     team: "Red Bull Racing", color: "3671C6", pace: 0.36 },
        DemoDriver { number: "14", abbreviation: "ALO", full_name: "Fernando Alonso",  team: "Aston Martin",    color: "229971", pace: 0.42 },
        DemoDriver { number: "27", abbreviation: "HUL", full_name: "Nico Hulkenberg",  team: "Haas F1 Team",    color: "B6BABD", pace: 0.47 },
        DemoDriver { number: "22", abbreviation: "TSU", full_name: "Yuki Tsunoda",     team: "RB",              color: "6692FF", pace: 0.53 },
        DemoDriver { number: "18", abbreviation: "STR", full_name: "Lance Stroll",     team: "Aston Martin",    color: "229971", pace: 0.58 },
        DemoDriver { number: "10", abbreviation: "GAS", full_name: "Pierre Gasly",     team: "Alpine",          color: "FF87BC", pace: 0.62 },
        DemoDriver { number: "31", abbreviation: "OCO", full_name: "Esteban Ocon",     team: "Alpine",          color: "FF87BC", pace: 0.66 },
        DemoDriver { number: "23", abbreviation: "ALB", full_name: "Alexander Albon",  team: "Williams",        color: "64C4FF", pace: 0.71 },
        DemoDriver { number: "20", abbreviation: "MAG", full_name: "Kevin Magnussen",  team: "Haas F1 Team",    color: "B6BABD", pace: 0.77 },
        DemoDriver { number: "3",  abbreviation: "RIC", full_name: "Daniel Ricciardo", team: "RB",              color: "6692FF", pace: 0.82 },
        DemoDriver { number: "77", abbreviation: "BOT", full_name: "Valtteri Bottas",  team: "Kick Sauber",     color: "52E252", pace: 0.90 },
        DemoDriver { number: "24", abbreviation: "ZHO", full_name: "Zhou Guanyu",      team: "Kick Sauber",     color: "52E252", pace: 0.97 },
        DemoDriver { number: "2",  abbreviation: "SAR", full_name: "Logan Sargeant",   team: "Williams",        color: "64C4FF", pace: 1.05 },
    ]
}

/// Reference sector times of a push lap (~90s)
const REFERENCE_SECTORS: [f64; 3] = [28.2, 38.4, 23.4];

/// Qualifying phase windows: Q1 18 min, Q2 15 min, Q3 12 min
const QUALIFYING_WINDOWS: [(f64, f64); 3] = [(0.0, 1080.0), (1500.0, 2400.0), (2880.0, 3600.0)];

/// Red flag during Q2
const QUALIFYING_RED_FLAG: (f64, f64) = (1900.0, 2000.0);

const PRACTICE_WINDOW: (f64, f64) = (0.0, 3600.0);

pub const RACE_LAPS: u32 = 24;

/// Laps run behind the safety car / under VSC in the demo race
const RACE_SAFETY_CAR_LAPS: std::ops::RangeInclusive<u32> = 6..=8;
const RACE_VSC_LAP: u32 = 16;

// =============================================================================
// Generation helpers
// =============================================================================

/// Deterministic noise in [-1, 1)
fn jitter(seed: u32) -> f64 {
    let x = (seed as f64 * 12.9898).sin() * 43758.5453;
    x.fract()
}

fn seed(driver_idx: usize, lap_number: u32, salt: u32) -> u32 {
    (driver_idx as u32 + 1) * 1009 + lap_number * 31 + salt
}

struct LapBuilder<'a> {
    driver: &'a DemoDriver,
    lap_number: u32,
    start: f64,
    sectors: [Option<f64>; 3],
    stint: u32,
    compound: &'static str,
}

impl LapBuilder<'_> {
    fn lap_time(&self) -> Option<f64> {
        match self.sectors {
            [Some(a), Some(b), Some(c)] => Some(a + b + c),
            _ => None,
        }
    }

    /// Elapsed duration regardless of missing sectors
    fn duration(&self) -> f64 {
        self.sectors.iter().flatten().sum::<f64>()
    }

    fn build(self) -> Lap {
        let lap_time = self.lap_time();
        Lap {
            driver: self.driver.abbreviation.to_string(),
            driver_number: Some(self.driver.number.to_string()),
            lap_number: self.lap_number,
            lap_start_time: Some(Seconds(self.start)),
            time: Some(Seconds(self.start + self.duration())),
            lap_time: lap_time.map(Seconds),
            sector_1_time: self.sectors[0].map(Seconds),
            sector_2_time: self.sectors[1].map(Seconds),
            sector_3_time: self.sectors[2].map(Seconds),
            compound: Some(self.compound.to_string()),
            tyre_life: None,
            stint: Some(self.stint),
            pit_in_time: None,
            pit_out_time: None,
            is_accurate: false,
            is_personal_best: false,
            deleted: false,
        }
    }
}

fn push_sectors(
    driver: &DemoDriver,
    idx: usize,
    lap_number: u32,
    improvement: f64,
) -> [Option<f64>; 3] {
    std::array::from_fn(|s| {
        let share = REFERENCE_SECTORS[s] / REFERENCE_SECTORS.iter().sum::<f64>();
        let noise = jitter(seed(idx, lap_number, s as u32)) * 0.12;
        Some(REFERENCE_SECTORS[s] + (driver.pace - improvement) * share + noise)
    })
}

fn scaled_sectors(factor: f64, idx: usize, lap_number: u32) -> [Option<f64>; 3] {
    std::array::from_fn(|s| {
        Some(REFERENCE_SECTORS[s] * factor + jitter(seed(idx, lap_number, 7 + s as u32)).abs())
    })
}

/// Flag each driver's fastest accurate lap
fn mark_personal_bests(laps: &mut [Lap]) {
    let mut best: HashMap<String, (f64, usize)> = HashMap::new();
    for (i, lap) in laps.iter().enumerate() {
        if let (true, Some(t)) = (lap.is_accurate, lap.lap_time) {
            let entry = best.entry(lap.driver.clone()).or_insert((t.0, i));
            if t.0 < entry.0 {
                *entry = (t.0, i);
            }
        }
    }
    for (_, i) in best.into_values() {
        laps[i].is_personal_best = true;
    }
}

fn results_for(grid: &[DemoDriver]) -> Vec<DriverResult> {
    grid.iter()
        .enumerate()
        .map(|(i, d)| DriverResult {
            driver_number: d.number.to_string(),
            abbreviation: d.abbreviation.to_string(),
            full_name: d.full_name.to_string(),
            team_name: d.team.to_string(),
            team_color: Some(d.color.to_string()),
            position: Some(i as u32 + 1),
        })
        .collect()
}

fn status(time: f64, status: SessionStatus) -> SessionStatusEvent {
    SessionStatusEvent {
        time: Seconds(time),
        status,
    }
}

fn track(time: f64, code: &str) -> TrackStatusEvent {
    TrackStatusEvent {
        time: Seconds(time),
        status: code.to_string(),
    }
}

// =============================================================================
// Source
// =============================================================================

pub struct DemoSource {
    grid: Vec<DemoDriver>,
    config: EngineConfig,
}

impl DemoSource {
    pub fn new() -> Self {
        Self {
            grid: demo_grid(),
            config: EngineConfig::default(),
        }
    }

    /// Out lap, push lap and in lap on a fresh set of tyres for each run
    fn runs_in_windows(
        &self,
        windows: &[(f64, f64)],
        runs_per_window: u32,
        phases_for: impl Fn(usize) -> usize,
    ) -> Vec<Lap> {
        let mut laps = Vec::new();
        for (idx, driver) in self.grid.iter().enumerate() {
            let mut lap_number = 1;
            let mut stint = 1;
            let reached = windows.iter().enumerate().take(phases_for(idx) + 1);
            for (phase, &(window_start, _)) in reached {
                for run in 0..runs_per_window {
                    let mut t = window_start + 90.0 + run as f64 * 360.0 + idx as f64 * 6.0;

                    let out = LapBuilder {
                        driver,
                        lap_number,
                        start: t,
                        sectors: scaled_sectors(1.25, idx, lap_number),
                        stint,
                        compound: "SOFT",
                    };
                    t += out.duration();
                    // Sector 1 of an out lap starts in the pit lane and is never timed
                    let mut out = out.build();
                    out.sector_1_time = None;
                    out.lap_time = None;
                    out.pit_out_time = out.lap_start_time;
                    laps.push(out);
                    lap_number += 1;

                    let improvement = phase as f64 * 0.25 + run as f64 * 0.1;
                    let push = LapBuilder {
                        driver,
                        lap_number,
                        start: t,
                        sectors: push_sectors(driver, idx, lap_number, improvement),
                        stint,
                        compound: "SOFT",
                    };
                    t += push.duration();
                    let mut push = push.build();
                    push.is_accurate = true;
                    laps.push(push);
                    lap_number += 1;

                    let mut cool_down = LapBuilder {
                        driver,
                        lap_number,
                        start: t,
                        sectors: scaled_sectors(1.3, idx, lap_number),
                        stint,
                        compound: "SOFT",
                    }
                    .build();
                    cool_down.pit_in_time = cool_down.time;
                    laps.push(cool_down);
                    lap_number += 1;
                    stint += 1;
                }
            }
        }
        mark_personal_bests(&mut laps);
        laps
    }

    /// Three-phase qualifying; drivers run until their classified phase
    pub fn qualifying(&self) -> SessionData {
        let laps = self.runs_in_windows(&QUALIFYING_WINDOWS, 2, |idx| {
            self.config.elimination_index(Some(idx as u32 + 1))
        });

        let (red_start, red_end) = QUALIFYING_RED_FLAG;
        let mut session_status = Vec::new();
        for (i, &(start, end)) in QUALIFYING_WINDOWS.iter().enumerate() {
            session_status.push(status(start, SessionStatus::Started));
            if i == 1 {
                session_status.push(status(red_start, SessionStatus::Aborted));
                session_status.push(status(red_end, SessionStatus::Started));
            }
            session_status.push(status(end, SessionStatus::Finished));
        }
        session_status.push(status(QUALIFYING_WINDOWS[2].1 + 600.0, SessionStatus::Finalised));

        let track_status = vec![
            track(0.0, "1"),
            track(400.0, "2"),
            track(430.0, "1"),
            track(red_start, "5"),
            track(red_end, "1"),
        ];

        SessionData {
            laps,
            results: results_for(&self.grid),
            session_status,
            track_status,
        }
    }

    /// One hour of practice: every driver does three runs
    pub fn practice(&self) -> SessionData {
        let laps = self.runs_in_windows(&[PRACTICE_WINDOW], 3, |_| 0);
        SessionData {
            laps,
            results: results_for(&self.grid),
            session_status: vec![
                status(PRACTICE_WINDOW.0, SessionStatus::Started),
                status(PRACTICE_WINDOW.1, SessionStatus::Finished),
            ],
            track_status: vec![track(0.0, "1")],
        }
    }

    /// Short race: safety car, VSC, and one stop per driver
    pub fn race(&self) -> SessionData {
        let mut laps = Vec::new();
        for (idx, driver) in self.grid.iter().enumerate() {
            let pit_lap = 11 + (idx as u32 % 3);
            let mut t = idx as f64 * 0.3;
            for lap_number in 1..=RACE_LAPS {
                let (stint, compound) = if lap_number <= pit_lap {
                    (1, "MEDIUM")
                } else {
                    (2, "HARD")
                };
                let factor = if RACE_SAFETY_CAR_LAPS.contains(&lap_number) {
                    1.35
                } else if lap_number == RACE_VSC_LAP {
                    1.15
                } else if lap_number == 1 {
                    1.08
                } else {
                    1.02
                };
                let mut sectors: [Option<f64>; 3] = std::array::from_fn(|s| {
                    let share = REFERENCE_SECTORS[s] / REFERENCE_SECTORS.iter().sum::<f64>();
                    let noise = jitter(seed(idx, lap_number, 13 + s as u32)) * 0.2;
                    Some(REFERENCE_SECTORS[s] * factor + driver.pace * share + noise)
                });
                let is_in_lap = lap_number == pit_lap;
                let is_out_lap = lap_number == pit_lap + 1;
                if is_in_lap {
                    sectors[2] = sectors[2].map(|s| s + 4.0);
                }
                if is_out_lap {
                    sectors[0] = sectors[0].map(|s| s + 18.0);
                }

                let builder = LapBuilder { driver, lap_number, start: t, sectors, stint, compound };
                t += builder.duration();
                let mut lap = builder.build();
                lap.tyre_life = Some(if stint == 1 { lap_number } else { lap_number - pit_lap });
                lap.is_accurate = factor < 1.05 && !is_in_lap && !is_out_lap;
                if is_in_lap {
                    lap.pit_in_time = lap.time;
                }
                if is_out_lap {
                    lap.pit_out_time = lap.lap_start_time;
                }
                laps.push(lap);
            }
        }
        mark_personal_bests(&mut laps);

        // Incident timing follows the leader
        let leader_end = |n: u32| -> f64 {
            laps.iter()
                .find(|l| l.driver == self.grid[0].abbreviation && l.lap_number == n)
                .and_then(|l| l.time)
                .map(|t| t.0)
                .unwrap_or(0.0)
        };
        let sc_start = leader_end(RACE_SAFETY_CAR_LAPS.start() - 1) - 20.0;
        let sc_end = leader_end(*RACE_SAFETY_CAR_LAPS.end()) - 5.0;
        let vsc_start = leader_end(RACE_VSC_LAP - 1) + 25.0;
        let vsc_end = leader_end(RACE_VSC_LAP) - 10.0;
        let finish = leader_end(RACE_LAPS);

        let track_status = vec![
            track(0.0, "1"),
            track(sc_start - 10.0, "2"),
            track(sc_start, "4"),
            track(sc_end, "1"),
            track(vsc_start, "6"),
            track(vsc_end, "1"),
        ];

        SessionData {
            laps,
            results: results_for(&self.grid),
            session_status: vec![
                status(0.0, SessionStatus::Started),
                status(finish, SessionStatus::Finished),
            ],
            track_status,
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSource for DemoSource {
    fn name(&self) -> &str {
        "Demo"
    }

    fn load(&self, key: &SessionKey) -> Result<SessionData, SourceError> {
        if key.event_key.eq_ignore_ascii_case("pending") {
            return Err(SourceError::NotLoaded(key.to_string()));
        }

        let name = key.session_name.trim().to_lowercase();
        let data = if SessionKind::from_session_name(&name).is_qualifying() {
            self.qualifying()
        } else if name == "race" || name == "sprint" {
            self.race()
        } else if name.starts_with("practice") || name.starts_with("fp") {
            self.practice()
        } else {
            return Err(SourceError::NotFound(key.to_string()));
        };

        debug!("Generated demo session {} ({} laps)", key, data.laps.len());
        Ok(data)
    }
}
