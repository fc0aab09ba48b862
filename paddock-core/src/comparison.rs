//! Side-by-side lap tables for two drivers of one session

use crate::error::{Result, SummaryError};
use crate::model::{DriverResult, Lap, SessionData};
use crate::units::Seconds;
use serde::Serialize;

/// One lap as listed in a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapEntry {
    pub lap_number: u32,
    /// Formatted as `m:ss.mmm`
    pub lap_time: Option<String>,
    pub lap_time_seconds: Option<Seconds>,
    pub sector_1_time: Option<Seconds>,
    pub sector_2_time: Option<Seconds>,
    pub sector_3_time: Option<Seconds>,
    pub is_personal_best: bool,
    pub compound: Option<String>,
    pub tyre_life: Option<u32>,
    pub stint: Option<u32>,
    pub pit_out_time: Option<Seconds>,
    pub pit_in_time: Option<Seconds>,
    pub deleted: bool,
    pub driver_number: String,
}

impl LapEntry {
    fn new(lap: &Lap, driver_number: &str) -> Self {
        Self {
            lap_number: lap.lap_number,
            lap_time: lap.lap_time.map(|t| t.format_lap_time()),
            lap_time_seconds: lap.lap_time,
            sector_1_time: lap.sector_1_time,
            sector_2_time: lap.sector_2_time,
            sector_3_time: lap.sector_3_time,
            is_personal_best: lap.is_personal_best,
            compound: lap.compound.clone(),
            tyre_life: lap.tyre_life,
            stint: lap.stint,
            pit_out_time: lap.pit_out_time,
            pit_in_time: lap.pit_in_time,
            deleted: lap.deleted,
            driver_number: driver_number.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverLaps {
    pub driver_number: String,
    pub abbreviation: String,
    pub full_name: String,
    pub team: String,
    pub team_color: Option<String>,
    pub laps: Vec<LapEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceComparison {
    pub driver1: DriverLaps,
    pub driver2: DriverLaps,
}

/// Every lap of two drivers, in lap order
///
/// Drivers are looked up in the classification by car number or
/// abbreviation. A driver who is not classified is `DataNotReady`.
pub fn compare_drivers(
    data: &SessionData,
    driver1: &str,
    driver2: &str,
) -> Result<RaceComparison> {
    Ok(RaceComparison {
        driver1: driver_laps(data, driver1)?,
        driver2: driver_laps(data, driver2)?,
    })
}

fn find_driver<'a>(results: &'a [DriverResult], driver: &str) -> Option<&'a DriverResult> {
    results
        .iter()
        .find(|r| r.driver_number == driver || r.abbreviation.eq_ignore_ascii_case(driver))
}

fn driver_laps(data: &SessionData, driver: &str) -> Result<DriverLaps> {
    let result = find_driver(&data.results, driver.trim()).ok_or_else(|| {
        SummaryError::DataNotReady(format!("Driver {} is not part of this session", driver))
    })?;

    let mut laps: Vec<&Lap> = data
        .laps
        .iter()
        .filter(|l| l.driver == result.abbreviation)
        .collect();
    laps.sort_by_key(|l| l.lap_number);

    Ok(DriverLaps {
        driver_number: result.driver_number.clone(),
        abbreviation: result.abbreviation.clone(),
        full_name: result.full_name.clone(),
        team: result.team_name.clone(),
        team_color: result.team_color.clone(),
        laps: laps
            .into_iter()
            .map(|l| LapEntry::new(l, &result.driver_number))
            .collect(),
    })
}
