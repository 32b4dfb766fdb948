//! Domain types for the fleetmirror state store.
//!
//! The mirrored view of upstream orchestrator state: clusters, container
//! instances (worker nodes), tasks (work units), and task definitions
//! (work-unit templates). Everything serializes to JSON for the store's
//! value columns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque resource identifier assigned by the upstream orchestrator.
pub type ResourceId = String;

// ── Cluster ───────────────────────────────────────────────────────

/// A mirrored cluster record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub id: ResourceId,
    /// Display name, unique upstream.
    pub name: String,
    /// Upstream lifecycle status (e.g. "ACTIVE").
    pub status: String,
}

// ── Container instance ────────────────────────────────────────────

/// Resource capacity of a worker node: schedulable units plus host ports.
///
/// Port sets are true sets of port numbers. In a `remaining` capacity they
/// hold the host ports still available on the node as of the last refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Capacity {
    pub cpu: i64,
    pub memory: i64,
    pub tcp_ports: BTreeSet<u16>,
    pub udp_ports: BTreeSet<u16>,
}

/// A mirrored worker node registered to a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerInstance {
    pub id: ResourceId,
    pub cluster_id: ResourceId,
    /// Whether the node's agent currently holds a connection upstream.
    /// Disconnected nodes cannot accept placements.
    pub agent_connected: bool,
    pub agent_version: String,
    pub agent_hash: String,
    pub runtime_version: String,
    pub agent_update_status: String,
    /// Identifier of the underlying machine (cloud instance id).
    pub host_instance_id: String,
    /// Total capacity registered when the node joined.
    pub registered: Capacity,
    /// Capacity still unclaimed as of the last refresh.
    pub remaining: Capacity,
    pub status: String,
    /// Epoch of the refresh cycle that last observed this record.
    pub refresh_epoch: u64,
}

// ── Task ──────────────────────────────────────────────────────────

/// A mirrored work unit running (or scheduled to run) in a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: ResourceId,
    pub cluster_id: ResourceId,
    /// Hosting node; absent while the work unit is unplaced.
    pub container_instance_id: Option<ResourceId>,
    pub task_definition_id: ResourceId,
    /// Status the orchestrator is driving toward.
    pub desired_status: String,
    /// Most recently observed status.
    pub last_status: String,
    /// Principal that started the work unit, when reported.
    pub started_by: Option<String>,
    /// Epoch of the refresh cycle that last observed this record.
    pub refresh_epoch: u64,
}

// ── Task definition ───────────────────────────────────────────────

/// Aggregated requirements of a work-unit template.
///
/// Immutable once stored: revisions of a family are distinct definitions,
/// and a resolved definition is never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDefinition {
    pub id: ResourceId,
    /// `{family}:{revision}` short reference, unique per definition.
    pub short_ref: String,
    /// Total CPU units across all containers.
    pub cpu: i64,
    /// Total memory across all containers.
    pub memory: i64,
    /// Host TCP ports the template reserves.
    pub tcp_ports: BTreeSet<u16>,
    /// Host UDP ports the template reserves.
    pub udp_ports: BTreeSet<u16>,
}
