//! Reconciler error types.

use thiserror::Error;

/// Errors that can occur during a refresh cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Container instances cannot be refreshed before their cluster is
    /// mirrored (normalized records carry the cluster's identifier).
    #[error("cluster not mirrored yet: {0}")]
    ClusterNotSynced(String),

    #[error("source error: {0}")]
    Source(#[from] fleetmirror_source::SourceError),

    #[error("state store error: {0}")]
    State(#[from] fleetmirror_state::StateError),
}

pub type SyncResult<T> = Result<T, SyncError>;
