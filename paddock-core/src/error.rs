//! Error types surfaced by the summary engine

use crate::source::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummaryError {
    /// Bad request input, reported before any computation starts
    #[error("{0}")]
    InvalidParameter(String),

    /// Upstream session data is not available yet
    #[error("{0}")]
    DataNotReady(String),

    /// Upstream tables have a shape the engine cannot work with
    #[error("An unexpected error occurred: {0}")]
    Computation(String),
}

impl From<SourceError> for SummaryError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(_) | SourceError::NotLoaded(_) => {
                SummaryError::DataNotReady(err.to_string())
            }
            SourceError::Backend(e) => SummaryError::Computation(format!("{:#}", e)),
        }
    }
}

pub type Result<T> = std::result::Result<T, SummaryError>;
