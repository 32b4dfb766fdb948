//! fleetmirror-source — upstream source adapter surface for fleetmirror.
//!
//! Defines the [`SourceClient`] trait: the narrow list/describe surface the
//! reconciler pulls upstream state through. List calls are paginated with
//! opaque continuation tokens; describe calls are batched and may report
//! per-item failures alongside successes.
//!
//! Ships with [`SnapshotSource`], a deterministic in-memory implementation
//! driven by a serializable [`Snapshot`]. It backs the test suites across
//! the workspace and the offline CLI.

pub mod client;
pub mod error;
pub mod records;
pub mod snapshot;

pub use client::SourceClient;
pub use error::{SourceError, SourceResult};
pub use records::*;
pub use snapshot::{Snapshot, SnapshotSource};
