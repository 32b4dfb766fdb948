//! Wire-shaped records returned by source adapters.
//!
//! These mirror the upstream orchestrator's API surface before any
//! normalization: node capacity arrives as a generic named-resource list
//! and templates as per-container definitions. `fleetmirror-sync` and
//! `fleetmirror-placement` translate them into store types.

use serde::{Deserialize, Serialize};

/// Resource name for schedulable CPU units.
pub const RESOURCE_CPU: &str = "CPU";
/// Resource name for schedulable memory.
pub const RESOURCE_MEMORY: &str = "MEMORY";
/// Resource name for the TCP host port set.
pub const RESOURCE_PORTS_TCP: &str = "PORTS";
/// Resource name for the UDP host port set.
pub const RESOURCE_PORTS_UDP: &str = "PORTS_UDP";

// ── Call envelopes ────────────────────────────────────────────────

/// One page of identifiers from a paginated list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque continuation token; `None` means this was the last page.
    pub next_token: Option<String>,
}

/// Result of a batch describe call: successes plus per-item failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub records: Vec<T>,
    pub failures: Vec<Failure>,
}

/// A single item the upstream listed but could not describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub id: String,
    pub reason: String,
}

// ── Records ───────────────────────────────────────────────────────

/// Wire shape of a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
    pub status: String,
}

/// A named resource dimension reported for a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub name: String,
    pub value: ResourceValue,
}

impl Resource {
    /// Integer-valued resource (CPU units, memory).
    pub fn integer(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            value: ResourceValue::Integer(value),
        }
    }

    /// String-set resource (port lists).
    pub fn string_set<I, S>(name: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            value: ResourceValue::StringSet(entries.into_iter().map(Into::into).collect()),
        }
    }
}

/// Value of a resource dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResourceValue {
    Integer(i64),
    StringSet(Vec<String>),
}

/// Wire shape of a container instance (worker node).
///
/// The owning cluster is implied by the describe call's cluster argument
/// and is not part of the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceRecord {
    pub id: String,
    pub agent_connected: bool,
    #[serde(default)]
    pub agent_version: Option<String>,
    #[serde(default)]
    pub agent_hash: Option<String>,
    #[serde(default)]
    pub runtime_version: Option<String>,
    #[serde(default)]
    pub agent_update_status: Option<String>,
    #[serde(default)]
    pub host_instance_id: Option<String>,
    pub registered_resources: Vec<Resource>,
    pub remaining_resources: Vec<Resource>,
    pub status: String,
}

/// Wire shape of a task (work unit).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub cluster_id: String,
    #[serde(default)]
    pub container_instance_id: Option<String>,
    pub task_definition_id: String,
    pub desired_status: String,
    pub last_status: String,
    #[serde(default)]
    pub started_by: Option<String>,
}

/// Transport protocol of a port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// Host/container port pair declared by a container definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortMapping {
    pub container_port: u16,
    /// Host port reserved by this mapping. `None` or 0 means the port is
    /// assigned dynamically and reserves nothing up front.
    #[serde(default)]
    pub host_port: Option<u16>,
    /// Transport protocol; TCP when unspecified.
    #[serde(default)]
    pub protocol: Option<Protocol>,
}

/// One container's requirements inside a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerDefinitionRecord {
    pub cpu: i64,
    pub memory: i64,
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
}

/// Wire shape of a work-unit template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateRecord {
    pub id: String,
    pub family: String,
    pub revision: u32,
    pub container_definitions: Vec<ContainerDefinitionRecord>,
}

impl TemplateRecord {
    /// The `{family}:{revision}` short reference of this template.
    pub fn short_ref(&self) -> String {
        format!("{}:{}", self.family, self.revision)
    }
}
