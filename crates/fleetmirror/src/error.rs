//! Umbrella error for mirror operations.

use thiserror::Error;

/// Errors surfaced by the [`Mirror`](crate::Mirror) facade.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("sync error: {0}")]
    Sync(#[from] fleetmirror_sync::SyncError),

    #[error("placement error: {0}")]
    Placement(#[from] fleetmirror_placement::PlacementError),

    #[error("state store error: {0}")]
    State(#[from] fleetmirror_state::StateError),
}

pub type MirrorResult<T> = Result<T, MirrorError>;
