//! Reconciler — per-kind refresh cycles against the upstream source.
//!
//! Each cycle allocates a fresh refresh epoch, pages through upstream
//! identifiers, batch-describes them, normalizes and upserts every record
//! under the new epoch, and only then deletes records left on an older
//! epoch. A transport failure aborts the cycle before that stale sweep:
//! records upserted so far stay (they are current anyway) and nothing is
//! deleted from a partial view. The next successful cycle converges.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use fleetmirror_source::SourceClient;
use fleetmirror_state::{Cluster, StateStore};

use crate::error::{SyncError, SyncResult};
use crate::normalize;

/// Outcome counters for one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Records written during the cycle.
    pub upserted: usize,
    /// Stale records deleted after the cycle completed.
    pub removed: usize,
    /// Per-item describe failures reported upstream (non-fatal).
    pub failed_items: usize,
}

/// Pulls upstream state for one configured cluster into the local store.
///
/// Cycles of the same kind are serialized by a per-kind mutex, so a refresh
/// runs to completion (or aborts) before the next one of its kind starts.
/// Dropping a refresh future mid-cycle is equivalent to the failure path:
/// the stale sweep is skipped and the next cycle self-heals.
pub struct Reconciler {
    store: StateStore,
    source: Arc<dyn SourceClient>,
    cluster_name: String,
    instance_cycle: Mutex<()>,
    task_cycle: Mutex<()>,
}

impl Reconciler {
    /// Create a reconciler bound to one upstream cluster name.
    pub fn new(
        store: StateStore,
        source: Arc<dyn SourceClient>,
        cluster_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            source,
            cluster_name: cluster_name.into(),
            instance_cycle: Mutex::new(()),
            task_cycle: Mutex::new(()),
        }
    }

    /// The upstream cluster this reconciler mirrors.
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Refresh the mirrored cluster record.
    pub async fn refresh_cluster(&self) -> SyncResult<Cluster> {
        let record = self.source.describe_cluster(&self.cluster_name).await?;
        let cluster = Cluster {
            id: record.id,
            name: record.name,
            status: record.status,
        };
        self.store.upsert_cluster(&cluster)?;
        info!(cluster = %cluster.name, status = %cluster.status, "cluster refreshed");
        Ok(cluster)
    }

    /// Run one container instance refresh cycle.
    ///
    /// Requires the cluster to be mirrored already: instance wire records
    /// do not carry their cluster, so normalization takes it from the
    /// local record. Returns `ClusterNotSynced` otherwise.
    pub async fn refresh_container_instances(&self) -> SyncResult<RefreshSummary> {
        let _cycle = self.instance_cycle.lock().await;
        let cluster = self
            .store
            .find_cluster_by_name(&self.cluster_name)?
            .ok_or_else(|| SyncError::ClusterNotSynced(self.cluster_name.clone()))?;

        let epoch = self.store.next_refresh_epoch()?;
        let mut summary = RefreshSummary::default();
        let mut next_token = None;
        loop {
            let page = self
                .source
                .list_container_instances(&self.cluster_name, next_token)
                .await?;
            if !page.items.is_empty() {
                let batch = self
                    .source
                    .describe_container_instances(&self.cluster_name, &page.items)
                    .await?;
                for failure in &batch.failures {
                    warn!(id = %failure.id, reason = %failure.reason, "container instance describe failed");
                }
                summary.failed_items += batch.failures.len();
                for record in batch.records {
                    let instance =
                        normalize::container_instance_from_record(record, &cluster.id, epoch);
                    self.store.upsert_container_instance(&instance)?;
                    summary.upserted += 1;
                }
            }
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        // Every page landed; anything still on an older epoch is gone upstream.
        for stale in self.store.container_instances_older_than(epoch)? {
            if self.store.delete_container_instance(&stale.id)? {
                debug!(id = %stale.id, "stale container instance removed");
                summary.removed += 1;
            }
        }

        info!(
            cluster = %self.cluster_name,
            epoch,
            upserted = summary.upserted,
            removed = summary.removed,
            failed = summary.failed_items,
            "container instances refreshed"
        );
        Ok(summary)
    }

    /// Run one task refresh cycle.
    ///
    /// Task wire records carry their own cluster identifier, so this cycle
    /// has no ordering dependency on the cluster refresh.
    pub async fn refresh_tasks(&self) -> SyncResult<RefreshSummary> {
        let _cycle = self.task_cycle.lock().await;

        let epoch = self.store.next_refresh_epoch()?;
        let mut summary = RefreshSummary::default();
        let mut next_token = None;
        loop {
            let page = self
                .source
                .list_tasks(&self.cluster_name, next_token)
                .await?;
            if !page.items.is_empty() {
                let batch = self
                    .source
                    .describe_tasks(&self.cluster_name, &page.items)
                    .await?;
                for failure in &batch.failures {
                    warn!(id = %failure.id, reason = %failure.reason, "task describe failed");
                }
                summary.failed_items += batch.failures.len();
                for record in batch.records {
                    let task = normalize::task_from_record(record, epoch);
                    self.store.upsert_task(&task)?;
                    summary.upserted += 1;
                }
            }
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        for stale in self.store.tasks_older_than(epoch)? {
            if self.store.delete_task(&stale.id)? {
                debug!(id = %stale.id, "stale task removed");
                summary.removed += 1;
            }
        }

        info!(
            cluster = %self.cluster_name,
            epoch,
            upserted = summary.upserted,
            removed = summary.removed,
            failed = summary.failed_items,
            "tasks refreshed"
        );
        Ok(summary)
    }

    /// Refresh everything: cluster, then container instances, then tasks.
    pub async fn refresh_all(&self) -> SyncResult<RefreshSummary> {
        self.refresh_cluster().await?;
        let instances = self.refresh_container_instances().await?;
        let tasks = self.refresh_tasks().await?;
        Ok(RefreshSummary {
            upserted: instances.upserted + tasks.upserted,
            removed: instances.removed + tasks.removed,
            failed_items: instances.failed_items + tasks.failed_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmirror_source::{
        ClusterRecord, InstanceRecord, RESOURCE_CPU, RESOURCE_MEMORY, RESOURCE_PORTS_TCP,
        Resource, Snapshot, SnapshotSource, TaskRecord,
    };

    fn instance_record(id: &str, remaining_cpu: i64) -> InstanceRecord {
        InstanceRecord {
            id: id.to_string(),
            agent_connected: true,
            agent_version: Some("1.29.0".to_string()),
            agent_hash: None,
            runtime_version: None,
            agent_update_status: None,
            host_instance_id: Some(format!("host-{id}")),
            registered_resources: vec![
                Resource::integer(RESOURCE_CPU, 2048),
                Resource::integer(RESOURCE_MEMORY, 4096),
                Resource::string_set(RESOURCE_PORTS_TCP, ["22"]),
            ],
            remaining_resources: vec![
                Resource::integer(RESOURCE_CPU, remaining_cpu),
                Resource::integer(RESOURCE_MEMORY, 2048),
                Resource::string_set(RESOURCE_PORTS_TCP, ["80", "443"]),
            ],
            status: "ACTIVE".to_string(),
        }
    }

    fn task_record(id: &str) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            cluster_id: "c-1".to_string(),
            container_instance_id: Some("ci-1".to_string()),
            task_definition_id: "td-1".to_string(),
            desired_status: "RUNNING".to_string(),
            last_status: "RUNNING".to_string(),
            started_by: None,
        }
    }

    fn snapshot_with_instances(ids: &[&str]) -> Snapshot {
        Snapshot {
            clusters: vec![ClusterRecord {
                id: "c-1".to_string(),
                name: "default".to_string(),
                status: "ACTIVE".to_string(),
            }],
            container_instances: ids.iter().map(|id| instance_record(id, 1024)).collect(),
            ..Snapshot::default()
        }
    }

    fn reconciler_for(source: Arc<SnapshotSource>) -> (StateStore, Reconciler) {
        let store = StateStore::open_in_memory().unwrap();
        let reconciler = Reconciler::new(store.clone(), source, "default");
        (store, reconciler)
    }

    #[tokio::test]
    async fn refresh_cluster_mirrors_record() {
        let source = Arc::new(SnapshotSource::new(snapshot_with_instances(&[])));
        let (store, reconciler) = reconciler_for(source);

        let cluster = reconciler.refresh_cluster().await.unwrap();
        assert_eq!(cluster.id, "c-1");
        assert_eq!(
            store.find_cluster_by_name("default").unwrap().unwrap().id,
            "c-1"
        );
    }

    #[tokio::test]
    async fn refresh_cluster_unknown_is_source_error() {
        let source = Arc::new(SnapshotSource::new(Snapshot::default()));
        let (_store, reconciler) = reconciler_for(source);

        let result = reconciler.refresh_cluster().await;
        assert!(matches!(result, Err(SyncError::Source(_))));
    }

    #[tokio::test]
    async fn instance_refresh_requires_mirrored_cluster() {
        let source = Arc::new(SnapshotSource::new(snapshot_with_instances(&["ci-1"])));
        let (_store, reconciler) = reconciler_for(source);

        let result = reconciler.refresh_container_instances().await;
        assert!(matches!(result, Err(SyncError::ClusterNotSynced(_))));
    }

    #[tokio::test]
    async fn instance_refresh_walks_every_page() {
        let source = Arc::new(
            SnapshotSource::new(snapshot_with_instances(&[
                "ci-1", "ci-2", "ci-3", "ci-4", "ci-5",
            ]))
            .with_page_size(2),
        );
        let (store, reconciler) = reconciler_for(source);

        reconciler.refresh_cluster().await.unwrap();
        let summary = reconciler.refresh_container_instances().await.unwrap();

        assert_eq!(summary.upserted, 5);
        assert_eq!(summary.removed, 0);
        let mirrored = store.list_container_instances().unwrap();
        assert_eq!(mirrored.len(), 5);
        assert!(mirrored.iter().all(|i| i.cluster_id == "c-1"));
    }

    #[tokio::test]
    async fn repeated_refresh_is_idempotent() {
        let source = Arc::new(SnapshotSource::new(snapshot_with_instances(&[
            "ci-1", "ci-2",
        ])));
        let (store, reconciler) = reconciler_for(source);
        reconciler.refresh_cluster().await.unwrap();

        reconciler.refresh_container_instances().await.unwrap();
        let mut first = store.list_container_instances().unwrap();

        reconciler.refresh_container_instances().await.unwrap();
        let mut second = store.list_container_instances().unwrap();

        assert_eq!(second.len(), 2);
        // Identical content apart from the epoch stamp.
        for instance in first.iter_mut().chain(second.iter_mut()) {
            instance.refresh_epoch = 0;
        }
        first.sort_by(|a, b| a.id.cmp(&b.id));
        second.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn vanished_instance_is_garbage_collected() {
        let source = Arc::new(SnapshotSource::new(snapshot_with_instances(&[
            "ci-1", "ci-2",
        ])));
        let (store, reconciler) = reconciler_for(source.clone());
        reconciler.refresh_cluster().await.unwrap();
        reconciler.refresh_container_instances().await.unwrap();

        source
            .replace_snapshot(snapshot_with_instances(&["ci-1"]))
            .await;
        let summary = reconciler.refresh_container_instances().await.unwrap();

        assert_eq!(summary.removed, 1);
        assert!(store.get_container_instance("ci-2").unwrap().is_none());
        assert!(store.get_container_instance("ci-1").unwrap().is_some());
    }

    #[tokio::test]
    async fn transport_failure_skips_garbage_collection() {
        let ids = ["ci-1", "ci-2", "ci-3"];
        let source = Arc::new(SnapshotSource::new(snapshot_with_instances(&ids)));
        let (store, reconciler) = reconciler_for(source);
        reconciler.refresh_cluster().await.unwrap();
        reconciler.refresh_container_instances().await.unwrap();

        // New source over the same store: one page lands, then the list fails.
        let failing = Arc::new(
            SnapshotSource::new(snapshot_with_instances(&ids))
                .with_page_size(1)
                .with_instance_list_error_after(1),
        );
        let retry = Reconciler::new(store.clone(), failing, "default");

        let result = retry.refresh_container_instances().await;
        assert!(matches!(result, Err(SyncError::Source(_))));
        // Nothing was deleted from the partial view.
        assert_eq!(store.list_container_instances().unwrap().len(), 3);

        // The injected error fired once; the next cycle converges.
        let summary = retry.refresh_container_instances().await.unwrap();
        assert_eq!(summary.upserted, 3);
        assert_eq!(summary.removed, 0);
        assert_eq!(store.list_container_instances().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn per_item_failures_are_non_fatal() {
        let mut snapshot = snapshot_with_instances(&["ci-1", "ci-2"]);
        snapshot.missing_container_instances = vec!["ci-ghost".to_string()];
        let source = Arc::new(SnapshotSource::new(snapshot));
        let (store, reconciler) = reconciler_for(source);
        reconciler.refresh_cluster().await.unwrap();

        let summary = reconciler.refresh_container_instances().await.unwrap();

        assert_eq!(summary.upserted, 2);
        assert_eq!(summary.failed_items, 1);
        assert_eq!(summary.removed, 0);
        assert_eq!(store.list_container_instances().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn task_refresh_mirrors_and_collects() {
        let mut snapshot = snapshot_with_instances(&[]);
        snapshot.tasks = vec![task_record("t-1"), task_record("t-2")];
        let source = Arc::new(SnapshotSource::new(snapshot.clone()));
        let (store, reconciler) = reconciler_for(source.clone());

        let summary = reconciler.refresh_tasks().await.unwrap();
        assert_eq!(summary.upserted, 2);
        assert_eq!(store.list_tasks().unwrap().len(), 2);

        snapshot.tasks.truncate(1);
        source.replace_snapshot(snapshot).await;
        let summary = reconciler.refresh_tasks().await.unwrap();

        assert_eq!(summary.removed, 1);
        assert!(store.get_task("t-2").unwrap().is_none());
    }

    #[tokio::test]
    async fn task_refresh_does_not_require_mirrored_cluster() {
        let mut snapshot = snapshot_with_instances(&[]);
        snapshot.tasks = vec![task_record("t-1")];
        let source = Arc::new(SnapshotSource::new(snapshot));
        let (store, reconciler) = reconciler_for(source);

        // No cluster refresh first; task records carry their cluster id.
        let summary = reconciler.refresh_tasks().await.unwrap();
        assert_eq!(summary.upserted, 1);
        assert_eq!(store.get_task("t-1").unwrap().unwrap().cluster_id, "c-1");
    }

    #[tokio::test]
    async fn refresh_all_mirrors_everything() {
        let mut snapshot = snapshot_with_instances(&["ci-1"]);
        snapshot.tasks = vec![task_record("t-1")];
        let source = Arc::new(SnapshotSource::new(snapshot));
        let (store, reconciler) = reconciler_for(source);

        let summary = reconciler.refresh_all().await.unwrap();

        assert_eq!(summary.upserted, 2);
        assert!(store.find_cluster_by_name("default").unwrap().is_some());
        assert_eq!(store.list_container_instances().unwrap().len(), 1);
        assert_eq!(store.list_tasks().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remaining_capacity_updates_across_cycles() {
        let mut snapshot = snapshot_with_instances(&[]);
        snapshot.container_instances = vec![instance_record("ci-1", 1024)];
        let source = Arc::new(SnapshotSource::new(snapshot.clone()));
        let (store, reconciler) = reconciler_for(source.clone());
        reconciler.refresh_cluster().await.unwrap();
        reconciler.refresh_container_instances().await.unwrap();

        snapshot.container_instances = vec![instance_record("ci-1", 256)];
        source.replace_snapshot(snapshot).await;
        reconciler.refresh_container_instances().await.unwrap();

        let mirrored = store.get_container_instance("ci-1").unwrap().unwrap();
        assert_eq!(mirrored.remaining.cpu, 256);
    }
}
