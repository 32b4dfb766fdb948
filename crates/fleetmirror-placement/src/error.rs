//! Placement error types.

use thiserror::Error;

/// Errors that can occur during template resolution or placement queries.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The template reference exists neither locally nor upstream.
    #[error("task definition not found: {0}")]
    TemplateNotFound(String),

    #[error("source error: {0}")]
    Source(fleetmirror_source::SourceError),

    #[error("state store error: {0}")]
    State(#[from] fleetmirror_state::StateError),
}

pub type PlacementResult<T> = Result<T, PlacementError>;
