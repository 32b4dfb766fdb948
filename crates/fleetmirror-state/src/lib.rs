//! fleetmirror-state — embedded mirror store for fleetmirror.
//!
//! Backed by [redb](https://docs.rs/redb), holds the locally mirrored view of
//! an upstream cluster orchestrator: clusters, container instances, tasks,
//! and task definitions.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns,
//! keyed by the upstream resource identifier. Task definitions get a second
//! alias table mapping the `family:revision` short reference back to the
//! identifier. A small metadata table carries the refresh-epoch counter used
//! by the reconciler to garbage-collect records that vanished upstream.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks. Reads run in point-in-time read
//! transactions and may overlap an in-flight refresh.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
