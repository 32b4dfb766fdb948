//! Mirror — one handle over one mirrored cluster.

use std::sync::Arc;

use tracing::debug;

use fleetmirror_placement::PlacementEngine;
use fleetmirror_source::SourceClient;
use fleetmirror_state::{Cluster, ContainerInstance, StateStore, Task, TaskDefinition};
use fleetmirror_sync::{Reconciler, RefreshSummary};

use crate::config::MirrorConfig;
use crate::error::MirrorResult;

/// A locally queryable mirror of one upstream cluster.
///
/// Binds the state store, the reconciler, and the placement engine to a
/// configured cluster name. Refresh operations pull upstream truth; query
/// operations answer from the store and never call upstream, except for
/// the one-time describe when a template is first resolved.
pub struct Mirror {
    store: StateStore,
    reconciler: Reconciler,
    placement: PlacementEngine,
    cluster_name: String,
}

impl Mirror {
    /// Open a mirror per the configuration.
    pub fn open(config: &MirrorConfig, source: Arc<dyn SourceClient>) -> MirrorResult<Self> {
        let store = match &config.data_path {
            Some(path) => StateStore::open(path)?,
            None => StateStore::open_in_memory()?,
        };
        Ok(Self::with_store(store, source, &config.cluster))
    }

    /// Assemble a mirror from pre-built parts.
    pub fn with_store(store: StateStore, source: Arc<dyn SourceClient>, cluster: &str) -> Self {
        let reconciler = Reconciler::new(store.clone(), source.clone(), cluster);
        let placement = PlacementEngine::new(store.clone(), source);
        Self {
            store,
            reconciler,
            placement,
            cluster_name: cluster.to_string(),
        }
    }

    // ── Refresh ────────────────────────────────────────────────────

    /// Refresh the mirrored cluster record.
    pub async fn refresh_cluster(&self) -> MirrorResult<Cluster> {
        Ok(self.reconciler.refresh_cluster().await?)
    }

    /// Refresh the mirrored container instances.
    pub async fn refresh_container_instances(&self) -> MirrorResult<RefreshSummary> {
        Ok(self.reconciler.refresh_container_instances().await?)
    }

    /// Refresh the mirrored tasks.
    pub async fn refresh_tasks(&self) -> MirrorResult<RefreshSummary> {
        Ok(self.reconciler.refresh_tasks().await?)
    }

    /// Refresh everything: cluster, container instances, tasks.
    pub async fn refresh_all(&self) -> MirrorResult<RefreshSummary> {
        Ok(self.reconciler.refresh_all().await?)
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Nodes in the mirrored cluster able to host the template.
    ///
    /// Empty before the first cluster refresh.
    pub async fn find_locations(&self, reference: &str) -> MirrorResult<Vec<ContainerInstance>> {
        let Some(cluster) = self.store.find_cluster_by_name(&self.cluster_name)? else {
            debug!(cluster = %self.cluster_name, "placement query before first refresh");
            return Ok(Vec::new());
        };
        Ok(self.placement.find_locations(reference, &cluster.id).await?)
    }

    /// Resolve a template reference, cache-first.
    pub async fn find_task_definition(&self, reference: &str) -> MirrorResult<TaskDefinition> {
        Ok(self.placement.resolver().resolve(reference).await?)
    }

    /// The mirrored cluster record, if refreshed yet.
    pub fn cluster(&self) -> MirrorResult<Option<Cluster>> {
        self.find_cluster_by_name(&self.cluster_name)
    }

    /// Look up any mirrored cluster by display name.
    pub fn find_cluster_by_name(&self, name: &str) -> MirrorResult<Option<Cluster>> {
        Ok(self.store.find_cluster_by_name(name)?)
    }

    /// All mirrored container instances of the configured cluster.
    pub fn container_instances(&self) -> MirrorResult<Vec<ContainerInstance>> {
        let Some(cluster) = self.store.find_cluster_by_name(&self.cluster_name)? else {
            return Ok(Vec::new());
        };
        Ok(self
            .store
            .list_container_instances_in_cluster(&cluster.id)?)
    }

    /// All mirrored tasks of the configured cluster.
    pub fn tasks(&self) -> MirrorResult<Vec<Task>> {
        let Some(cluster) = self.store.find_cluster_by_name(&self.cluster_name)? else {
            return Ok(Vec::new());
        };
        Ok(self.store.list_tasks_in_cluster(&cluster.id)?)
    }

    /// The underlying store, for queries this facade does not cover.
    pub fn store(&self) -> &StateStore {
        &self.store
    }
}
