//! StateStore — redb-backed mirror of upstream orchestrator state.
//!
//! Typed CRUD over clusters, container instances, tasks, and task
//! definitions, each serialized to JSON in its own table. Opens either a
//! database file or an in-memory backend (for tests and one-shot offline
//! analysis).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Shorthand for collapsing a redb or serde error into the named variant.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Meta-table key for the persisted refresh-epoch counter.
const LAST_REFRESH_EPOCH: &str = "last_refresh_epoch";

/// Thread-safe mirror store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent mirror store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "mirror store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory mirror store.
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory mirror store opened");
        Ok(store)
    }

    /// Touch every table once so read transactions never see one missing.
    fn ensure_tables(&self) -> StateResult<()> {
        // redb creates a table on first open inside a write transaction.
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        txn.open_table(CONTAINER_INSTANCES).map_err(map_err!(Table))?;
        txn.open_table(TASKS).map_err(map_err!(Table))?;
        txn.open_table(TASK_DEFINITIONS).map_err(map_err!(Table))?;
        txn.open_table(TASK_DEFINITION_ALIASES)
            .map_err(map_err!(Table))?;
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Clusters ───────────────────────────────────────────────────

    /// Insert or replace a cluster record, keyed by its identifier.
    pub fn upsert_cluster(&self, cluster: &Cluster) -> StateResult<()> {
        let value = serde_json::to_vec(cluster).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
            table
                .insert(cluster.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = %cluster.id, name = %cluster.name, "cluster stored");
        Ok(())
    }

    /// Get a cluster by identifier.
    pub fn get_cluster(&self, id: &str) -> StateResult<Option<Cluster>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let cluster: Cluster =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(cluster))
            }
            None => Ok(None),
        }
    }

    /// Find a cluster by its display name (unique upstream).
    pub fn find_cluster_by_name(&self, name: &str) -> StateResult<Option<Cluster>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let cluster: Cluster =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if cluster.name == name {
                return Ok(Some(cluster));
            }
        }
        Ok(None)
    }

    /// List all mirrored clusters.
    pub fn list_clusters(&self) -> StateResult<Vec<Cluster>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let cluster: Cluster =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(cluster);
        }
        Ok(results)
    }

    // ── Container instances ────────────────────────────────────────

    /// Insert or replace a container instance, keyed by its identifier.
    pub fn upsert_container_instance(&self, instance: &ContainerInstance) -> StateResult<()> {
        let value = serde_json::to_vec(instance).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn
                .open_table(CONTAINER_INSTANCES)
                .map_err(map_err!(Table))?;
            table
                .insert(instance.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get a container instance by identifier.
    pub fn get_container_instance(&self, id: &str) -> StateResult<Option<ContainerInstance>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(CONTAINER_INSTANCES)
            .map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let instance: ContainerInstance =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(instance))
            }
            None => Ok(None),
        }
    }

    /// List all mirrored container instances.
    pub fn list_container_instances(&self) -> StateResult<Vec<ContainerInstance>> {
        self.find_container_instances(|_| true)
    }

    /// List container instances registered to a cluster.
    pub fn list_container_instances_in_cluster(
        &self,
        cluster_id: &str,
    ) -> StateResult<Vec<ContainerInstance>> {
        self.find_container_instances(|instance| instance.cluster_id == cluster_id)
    }

    /// Scan container instances matching a predicate.
    pub fn find_container_instances<F>(&self, pred: F) -> StateResult<Vec<ContainerInstance>>
    where
        F: Fn(&ContainerInstance) -> bool,
    {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn
            .open_table(CONTAINER_INSTANCES)
            .map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let instance: ContainerInstance =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if pred(&instance) {
                results.push(instance);
            }
        }
        Ok(results)
    }

    /// Container instances last observed before the given epoch.
    pub fn container_instances_older_than(
        &self,
        epoch: u64,
    ) -> StateResult<Vec<ContainerInstance>> {
        self.find_container_instances(|instance| instance.refresh_epoch < epoch)
    }

    /// Delete a container instance by identifier. Returns true if it existed.
    pub fn delete_container_instance(&self, id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn
                .open_table(CONTAINER_INSTANCES)
                .map_err(map_err!(Table))?;
            existed = table.remove(id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%id, existed, "container instance deleted");
        Ok(existed)
    }

    // ── Tasks ──────────────────────────────────────────────────────

    /// Insert or replace a task, keyed by its identifier.
    pub fn upsert_task(&self, task: &Task) -> StateResult<()> {
        let value = serde_json::to_vec(task).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(TASKS).map_err(map_err!(Table))?;
            table
                .insert(task.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get a task by identifier.
    pub fn get_task(&self, id: &str) -> StateResult<Option<Task>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let task: Task =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// List all mirrored tasks.
    pub fn list_tasks(&self) -> StateResult<Vec<Task>> {
        self.find_tasks(|_| true)
    }

    /// List tasks running in a cluster.
    pub fn list_tasks_in_cluster(&self, cluster_id: &str) -> StateResult<Vec<Task>> {
        self.find_tasks(|task| task.cluster_id == cluster_id)
    }

    /// Scan tasks matching a predicate.
    pub fn find_tasks<F>(&self, pred: F) -> StateResult<Vec<Task>>
    where
        F: Fn(&Task) -> bool,
    {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASKS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let task: Task =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if pred(&task) {
                results.push(task);
            }
        }
        Ok(results)
    }

    /// Tasks last observed before the given epoch.
    pub fn tasks_older_than(&self, epoch: u64) -> StateResult<Vec<Task>> {
        self.find_tasks(|task| task.refresh_epoch < epoch)
    }

    /// Delete a task by identifier. Returns true if it existed.
    pub fn delete_task(&self, id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(TASKS).map_err(map_err!(Table))?;
            existed = table.remove(id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%id, existed, "task deleted");
        Ok(existed)
    }

    // ── Task definitions ───────────────────────────────────────────

    /// Insert a task definition, write-once.
    ///
    /// Populates the primary table and the short-reference alias row in one
    /// transaction. An existing definition under the same identifier is left
    /// untouched. Returns true if a new record was written.
    pub fn insert_task_definition(&self, definition: &TaskDefinition) -> StateResult<bool> {
        let value = serde_json::to_vec(definition).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let inserted;
        {
            let mut table = txn.open_table(TASK_DEFINITIONS).map_err(map_err!(Table))?;
            let mut aliases = txn
                .open_table(TASK_DEFINITION_ALIASES)
                .map_err(map_err!(Table))?;
            if table
                .get(definition.id.as_str())
                .map_err(map_err!(Read))?
                .is_some()
            {
                inserted = false;
            } else {
                table
                    .insert(definition.id.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
                aliases
                    .insert(definition.short_ref.as_str(), definition.id.as_str())
                    .map_err(map_err!(Write))?;
                inserted = true;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        if inserted {
            debug!(id = %definition.id, short_ref = %definition.short_ref, "task definition cached");
        }
        Ok(inserted)
    }

    /// Get a task definition by identifier.
    pub fn get_task_definition(&self, id: &str) -> StateResult<Option<TaskDefinition>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TASK_DEFINITIONS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let definition: TaskDefinition =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(definition))
            }
            None => Ok(None),
        }
    }

    /// Get a task definition by its `{family}:{revision}` short reference.
    pub fn get_task_definition_by_short_ref(
        &self,
        short_ref: &str,
    ) -> StateResult<Option<TaskDefinition>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let aliases = txn
            .open_table(TASK_DEFINITION_ALIASES)
            .map_err(map_err!(Table))?;
        let id = match aliases.get(short_ref).map_err(map_err!(Read))? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };
        let table = txn.open_table(TASK_DEFINITIONS).map_err(map_err!(Table))?;
        match table.get(id.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let definition: TaskDefinition =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(definition))
            }
            None => Ok(None),
        }
    }

    // ── Refresh epochs ─────────────────────────────────────────────

    /// Allocate the next refresh epoch.
    ///
    /// The counter is persisted in the meta table and bumped in a single
    /// write transaction, so epochs are unique per call and strictly
    /// increasing across process restarts.
    pub fn next_refresh_epoch(&self) -> StateResult<u64> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let next;
        {
            let mut table = txn.open_table(META).map_err(map_err!(Table))?;
            let current = table
                .get(LAST_REFRESH_EPOCH)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value())
                .unwrap_or(0);
            next = current + 1;
            table
                .insert(LAST_REFRESH_EPOCH, &next)
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(epoch = next, "refresh epoch allocated");
        Ok(next)
    }
}
