//! fleetmirror-sync — reconciliation engine for fleetmirror.
//!
//! Pulls upstream truth through a [`SourceClient`](fleetmirror_source::SourceClient),
//! normalizes wire records into store types, and garbage-collects records
//! that vanished upstream using refresh epochs: every cycle stamps what it
//! sees with a fresh epoch, and only a fully successful cycle sweeps
//! records left on an older epoch. A partial view never deletes anything.

pub mod error;
pub mod normalize;
pub mod reconciler;

pub use error::{SyncError, SyncResult};
pub use reconciler::{Reconciler, RefreshSummary};
