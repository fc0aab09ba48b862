//! Session phase & lap segmentation engine
//!
//! Data flows one way: status streams become phase windows and incident
//! intervals, windows plus classification become per-lap phases, and phased
//! laps become runs and sector ratings. Every stage is a pure function of
//! its inputs.

pub mod incidents;
pub mod phases;
pub mod sectors;
pub mod segments;
pub mod summary;

pub use incidents::{IncidentKind, TrackIncident};
pub use phases::{Phase, PhaseWindow};
pub use sectors::SectorRating;
pub use segments::LapKind;
pub use summary::{build_race_summary, RaceSummary};
