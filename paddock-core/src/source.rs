//! Session source trait definition

use crate::error::SummaryError;
use crate::model::SessionData;
use chrono::{Datelike, Utc};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// First season with lap-level timing data
pub const FIRST_SUPPORTED_YEAR: i32 = 2018;

/// Identifies one session of one event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct SessionKey {
    pub year: i32,
    pub event_key: String,
    pub session_name: String,
}

impl SessionKey {
    pub fn new(year: i32, event_key: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            year,
            event_key: event_key.into(),
            session_name: session_name.into(),
        }
    }

    /// Check the key before any data is fetched
    pub fn validate(&self) -> Result<(), SummaryError> {
        let current_year = Utc::now().year();
        if !(FIRST_SUPPORTED_YEAR..=current_year).contains(&self.year) {
            return Err(SummaryError::InvalidParameter(format!(
                "Invalid year. Please select a season between {} and {}.",
                FIRST_SUPPORTED_YEAR, current_year
            )));
        }
        if self.event_key.trim().is_empty() || self.session_name.trim().is_empty() {
            return Err(SummaryError::InvalidParameter(
                "Missing parameters are required.".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.year, self.event_key, self.session_name)
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Session {0} was not found")]
    NotFound(String),

    #[error("Session data is not yet available: {0}")]
    NotLoaded(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Trait for providers of session timing data
///
/// Implementations own all I/O. A call may be slow and is made once per
/// request; callers that need timeouts or retries add them around it.
pub trait SessionSource: Send + Sync {
    /// Get the name of this source (e.g., "Demo", "Archive")
    fn name(&self) -> &str;

    /// Load laps, results and status streams for one session
    ///
    /// Returns:
    /// - `Err(SourceError::NotFound)` if the source has no such session
    /// - `Err(SourceError::NotLoaded)` if the session exists but has no data yet
    fn load(&self, key: &SessionKey) -> Result<SessionData, SourceError>;
}
