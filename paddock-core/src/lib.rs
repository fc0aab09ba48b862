//! Paddock Core Library
//!
//! This crate provides the session data model, the source trait for
//! upstream timing data, and the engine that turns a session's laps,
//! results and status streams into a race/qualifying summary or a
//! two-driver lap comparison.

pub mod comparison;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod source;
pub mod units;

pub use comparison::{compare_drivers, RaceComparison};
pub use config::EngineConfig;
pub use engine::{build_race_summary, RaceSummary};
pub use error::SummaryError;
pub use model::{SessionData, SessionKind};
pub use source::{SessionKey, SessionSource, SourceError};
