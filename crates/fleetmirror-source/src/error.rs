//! Error types for source adapters.

use thiserror::Error;

/// Result type alias for source adapter calls.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors surfaced by a [`SourceClient`](crate::SourceClient).
///
/// Adapters collapse their transport's failure modes into these two
/// signals. Retry policy belongs to the adapter or the caller, never to
/// the reconciler.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The named resource does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// The upstream service could not be reached or rejected the call.
    #[error("transport error: {0}")]
    Transport(String),
}
