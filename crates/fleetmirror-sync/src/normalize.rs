//! Wire-record normalization into store types.
//!
//! Upstream reports node capacity as a generic named-resource list: `CPU`
//! and `MEMORY` as integers, `PORTS` and `PORTS_UDP` as string sets. The
//! functions here unpack that list into a [`Capacity`] and stamp records
//! with the refresh epoch they arrived under.

use std::collections::BTreeSet;

use tracing::warn;

use fleetmirror_source::{
    InstanceRecord, RESOURCE_CPU, RESOURCE_MEMORY, RESOURCE_PORTS_TCP, RESOURCE_PORTS_UDP,
    Resource, ResourceValue, TaskRecord,
};
use fleetmirror_state::{Capacity, ContainerInstance, Task};

/// Integer value of the named resource, or 0 when absent or mistyped.
fn resource_int(resources: &[Resource], name: &str) -> i64 {
    resources
        .iter()
        .find(|r| r.name == name)
        .map_or(0, |r| match &r.value {
            ResourceValue::Integer(v) => *v,
            ResourceValue::StringSet(_) => 0,
        })
}

/// Port set of the named resource. Entries that don't parse as port
/// numbers are skipped.
fn resource_ports(resources: &[Resource], name: &str) -> BTreeSet<u16> {
    let Some(resource) = resources.iter().find(|r| r.name == name) else {
        return BTreeSet::new();
    };
    match &resource.value {
        ResourceValue::StringSet(entries) => entries
            .iter()
            .filter_map(|entry| match entry.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    warn!(resource = %name, %entry, "unparseable port entry skipped");
                    None
                }
            })
            .collect(),
        ResourceValue::Integer(_) => BTreeSet::new(),
    }
}

/// Unpack a resource list into a [`Capacity`].
pub fn capacity_from_resources(resources: &[Resource]) -> Capacity {
    Capacity {
        cpu: resource_int(resources, RESOURCE_CPU),
        memory: resource_int(resources, RESOURCE_MEMORY),
        tcp_ports: resource_ports(resources, RESOURCE_PORTS_TCP),
        udp_ports: resource_ports(resources, RESOURCE_PORTS_UDP),
    }
}

/// Build a store [`ContainerInstance`] from a wire record.
///
/// The owning cluster is not part of the wire record; it comes from the
/// refresh cycle's mirrored cluster.
pub fn container_instance_from_record(
    record: InstanceRecord,
    cluster_id: &str,
    refresh_epoch: u64,
) -> ContainerInstance {
    ContainerInstance {
        registered: capacity_from_resources(&record.registered_resources),
        remaining: capacity_from_resources(&record.remaining_resources),
        id: record.id,
        cluster_id: cluster_id.to_string(),
        agent_connected: record.agent_connected,
        agent_version: record.agent_version.unwrap_or_default(),
        agent_hash: record.agent_hash.unwrap_or_default(),
        runtime_version: record.runtime_version.unwrap_or_default(),
        agent_update_status: record.agent_update_status.unwrap_or_default(),
        host_instance_id: record.host_instance_id.unwrap_or_default(),
        status: record.status,
        refresh_epoch,
    }
}

/// Build a store [`Task`] from a wire record.
pub fn task_from_record(record: TaskRecord, refresh_epoch: u64) -> Task {
    Task {
        id: record.id,
        cluster_id: record.cluster_id,
        container_instance_id: record.container_instance_id,
        task_definition_id: record.task_definition_id,
        desired_status: record.desired_status,
        last_status: record.last_status,
        started_by: record.started_by,
        refresh_epoch,
    }
}
