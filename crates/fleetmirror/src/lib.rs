//! fleetmirror — a locally queryable mirror of an upstream cluster
//! orchestrator.
//!
//! The upstream exposes its state only through paginated list/describe
//! calls, which is a poor fit for repeated ad-hoc filtering. Fleetmirror
//! pulls that state (clusters, worker nodes, work units, templates) into
//! an embedded store and answers placement queries locally: "which nodes
//! currently have enough spare capacity and free host ports to run an
//! instance of template T?"
//!
//! # Architecture
//!
//! - [`fleetmirror_state`] — redb-backed entity store
//! - [`fleetmirror_source`] — the `SourceClient` seam + `SnapshotSource`
//! - [`fleetmirror_sync`] — refresh cycles with epoch garbage collection
//! - [`fleetmirror_placement`] — template cache + placement queries
//!
//! [`Mirror`] binds all of it to one configured cluster. Refresh to pull
//! upstream truth, then query as often as needed; results are as fresh as
//! the last completed refresh.

pub mod config;
pub mod error;
pub mod mirror;

pub use config::MirrorConfig;
pub use error::{MirrorError, MirrorResult};
pub use mirror::Mirror;

pub use fleetmirror_placement::{
    PlacementEngine, PlacementError, TemplateRef, TemplateResolver, node_can_host,
};
pub use fleetmirror_source::{
    Snapshot, SnapshotSource, SourceClient, SourceError, SourceResult,
};
pub use fleetmirror_state::{
    Capacity, Cluster, ContainerInstance, StateStore, Task, TaskDefinition,
};
pub use fleetmirror_sync::{Reconciler, RefreshSummary, SyncError};
