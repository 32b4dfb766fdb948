//! redb table definitions for the fleetmirror state store.
//!
//! Entity tables use `&str` keys (the upstream resource identifier) and
//! `&[u8]` values (JSON-serialized domain types). The alias table maps
//! short references to identifiers, and the meta table holds bare counters.

use redb::TableDefinition;

/// Clusters keyed by `{cluster_id}`.
pub const CLUSTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("clusters");

/// Container instances keyed by `{instance_id}`.
pub const CONTAINER_INSTANCES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("container_instances");

/// Tasks keyed by `{task_id}`.
pub const TASKS: TableDefinition<&str, &[u8]> = TableDefinition::new("tasks");

/// Task definitions keyed by `{task_definition_id}`.
pub const TASK_DEFINITIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("task_definitions");

/// Alias rows: `{family}:{revision}` short reference → task definition id.
pub const TASK_DEFINITION_ALIASES: TableDefinition<&str, &str> =
    TableDefinition::new("task_definition_aliases");

/// Store-level counters (currently only the refresh epoch).
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");
