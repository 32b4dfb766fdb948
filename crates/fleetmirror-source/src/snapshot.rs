//! SnapshotSource — deterministic in-memory source adapter.
//!
//! Serves a serializable [`Snapshot`] of upstream state through the
//! [`SourceClient`] surface, with a configurable page size and scripted
//! failures. Drives the test suites across the workspace and the offline
//! CLI's snapshot files.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::SourceClient;
use crate::error::{SourceError, SourceResult};
use crate::records::*;

/// Page size used when none is configured.
const DEFAULT_PAGE_SIZE: usize = 100;

/// A point-in-time capture of the upstream view.
///
/// Task records reference clusters by id, matching the wire shapes. The
/// `missing_*` lists hold ids that appear in list results but fail to
/// describe, modeling resources deleted between the two calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub clusters: Vec<ClusterRecord>,
    #[serde(default)]
    pub container_instances: Vec<InstanceRecord>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(default)]
    pub task_definitions: Vec<TemplateRecord>,
    #[serde(default)]
    pub missing_container_instances: Vec<String>,
    #[serde(default)]
    pub missing_tasks: Vec<String>,
}

/// In-memory [`SourceClient`] backed by a [`Snapshot`].
///
/// The snapshot can be swapped between refresh cycles to model upstream
/// change; list calls can be scripted to fail at a given call index to
/// model transport errors mid-cycle.
pub struct SnapshotSource {
    snapshot: Mutex<Snapshot>,
    page_size: usize,
    fail_instance_list_at: Option<usize>,
    fail_task_list_at: Option<usize>,
    fail_template_describe_at: Option<usize>,
    instance_list_calls: AtomicUsize,
    task_list_calls: AtomicUsize,
    template_describe_calls: AtomicUsize,
}

impl SnapshotSource {
    /// Create a source serving the given snapshot.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            page_size: DEFAULT_PAGE_SIZE,
            fail_instance_list_at: None,
            fail_task_list_at: None,
            fail_template_describe_at: None,
            instance_list_calls: AtomicUsize::new(0),
            task_list_calls: AtomicUsize::new(0),
            template_describe_calls: AtomicUsize::new(0),
        }
    }

    /// Set the page size for list calls (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fail the instance list call that follows `successes` successful
    /// ones with a transport error, once. Later calls succeed again.
    pub fn with_instance_list_error_after(mut self, successes: usize) -> Self {
        self.fail_instance_list_at = Some(successes);
        self
    }

    /// Fail the task list call that follows `successes` successful ones
    /// with a transport error, once.
    pub fn with_task_list_error_after(mut self, successes: usize) -> Self {
        self.fail_task_list_at = Some(successes);
        self
    }

    /// Fail the template describe call that follows `successes` successful
    /// ones with a transport error, once.
    pub fn with_template_describe_error_after(mut self, successes: usize) -> Self {
        self.fail_template_describe_at = Some(successes);
        self
    }

    /// Number of template describe calls served so far.
    pub fn template_describe_calls(&self) -> usize {
        self.template_describe_calls.load(Ordering::SeqCst)
    }

    /// Swap the served snapshot, modeling upstream change between cycles.
    pub async fn replace_snapshot(&self, snapshot: Snapshot) {
        *self.snapshot.lock().await = snapshot;
        debug!("snapshot replaced");
    }
}

/// Match a cluster by display name or identifier.
fn resolve_cluster(snapshot: &Snapshot, cluster: &str) -> Option<ClusterRecord> {
    snapshot
        .clusters
        .iter()
        .find(|c| c.name == cluster || c.id == cluster)
        .cloned()
}

/// Slice one page out of an id list, using numeric offset tokens.
fn paginate(ids: &[String], next_token: Option<String>, page_size: usize) -> Page<String> {
    let start = next_token
        .as_deref()
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(0)
        .min(ids.len());
    let end = (start + page_size).min(ids.len());
    Page {
        items: ids[start..end].to_vec(),
        next_token: (end < ids.len()).then(|| end.to_string()),
    }
}

#[async_trait::async_trait]
impl SourceClient for SnapshotSource {
    async fn describe_cluster(&self, cluster: &str) -> SourceResult<ClusterRecord> {
        let snapshot = self.snapshot.lock().await;
        resolve_cluster(&snapshot, cluster)
            .ok_or_else(|| SourceError::NotFound(format!("cluster {cluster}")))
    }

    async fn list_container_instances(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> SourceResult<Page<String>> {
        let call = self.instance_list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_instance_list_at == Some(call) {
            return Err(SourceError::Transport(format!(
                "instance list call {call} failed"
            )));
        }
        let snapshot = self.snapshot.lock().await;
        resolve_cluster(&snapshot, cluster)
            .ok_or_else(|| SourceError::NotFound(format!("cluster {cluster}")))?;
        let mut ids: Vec<String> = snapshot
            .container_instances
            .iter()
            .map(|i| i.id.clone())
            .collect();
        ids.extend(snapshot.missing_container_instances.iter().cloned());
        Ok(paginate(&ids, next_token, self.page_size))
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        ids: &[String],
    ) -> SourceResult<Batch<InstanceRecord>> {
        let snapshot = self.snapshot.lock().await;
        resolve_cluster(&snapshot, cluster)
            .ok_or_else(|| SourceError::NotFound(format!("cluster {cluster}")))?;
        let mut records = Vec::new();
        let mut failures = Vec::new();
        for id in ids {
            match snapshot.container_instances.iter().find(|i| &i.id == id) {
                Some(record) => records.push(record.clone()),
                None => failures.push(Failure {
                    id: id.clone(),
                    reason: "MISSING".to_string(),
                }),
            }
        }
        Ok(Batch { records, failures })
    }

    async fn list_tasks(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> SourceResult<Page<String>> {
        let call = self.task_list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_task_list_at == Some(call) {
            return Err(SourceError::Transport(format!(
                "task list call {call} failed"
            )));
        }
        let snapshot = self.snapshot.lock().await;
        let resolved = resolve_cluster(&snapshot, cluster)
            .ok_or_else(|| SourceError::NotFound(format!("cluster {cluster}")))?;
        let mut ids: Vec<String> = snapshot
            .tasks
            .iter()
            .filter(|t| t.cluster_id == resolved.id)
            .map(|t| t.id.clone())
            .collect();
        ids.extend(snapshot.missing_tasks.iter().cloned());
        Ok(paginate(&ids, next_token, self.page_size))
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        ids: &[String],
    ) -> SourceResult<Batch<TaskRecord>> {
        let snapshot = self.snapshot.lock().await;
        resolve_cluster(&snapshot, cluster)
            .ok_or_else(|| SourceError::NotFound(format!("cluster {cluster}")))?;
        let mut records = Vec::new();
        let mut failures = Vec::new();
        for id in ids {
            match snapshot.tasks.iter().find(|t| &t.id == id) {
                Some(record) => records.push(record.clone()),
                None => failures.push(Failure {
                    id: id.clone(),
                    reason: "MISSING".to_string(),
                }),
            }
        }
        Ok(Batch { records, failures })
    }

    async fn describe_task_definition(&self, reference: &str) -> SourceResult<TemplateRecord> {
        let call = self.template_describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_template_describe_at == Some(call) {
            return Err(SourceError::Transport(format!(
                "template describe call {call} failed"
            )));
        }
        let snapshot = self.snapshot.lock().await;
        snapshot
            .task_definitions
            .iter()
            .find(|t| t.id == reference || t.short_ref() == reference)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("task definition {reference}")))
    }
}
