//! Type-safe wrappers for timing units
//!
//! Session-elapsed offsets and lap/sector durations are both carried as
//! [`Seconds`]. Values serialize rounded to the millisecond, which is the
//! resolution of the timing feed.

use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Round f64 to 3 decimal places for compact JSON serialization
fn round3<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 1000.0).round() / 1000.0)
}

/// Seconds (session offsets, lap and sector durations)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Seconds(#[serde(serialize_with = "round3")] pub f64);

impl Seconds {
    pub const ZERO: Seconds = Seconds(0.0);

    pub fn from_minutes(minutes: f64) -> Self {
        Self(minutes * 60.0)
    }

    /// Render as a lap time, e.g. `1:27.456`
    pub fn format_lap_time(&self) -> String {
        let total_ms = (self.0 * 1000.0).round().max(0.0) as u64;
        let minutes = total_ms / 60_000;
        let seconds = (total_ms / 1000) % 60;
        let millis = total_ms % 1000;
        format!("{}:{:02}.{:03}", minutes, seconds, millis)
    }

    /// The smaller of two optional durations, ignoring absent values
    pub fn min_opt(a: Option<Seconds>, b: Option<Seconds>) -> Option<Seconds> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

impl Add for Seconds {
    type Output = Seconds;

    fn add(self, rhs: Seconds) -> Seconds {
        Seconds(self.0 + rhs.0)
    }
}
