//! The `SourceClient` trait — upstream list/describe surface.

use async_trait::async_trait;

use crate::error::SourceResult;
use crate::records::*;

/// Read-only client for the upstream orchestrator's state API.
///
/// This is the seam the reconciler and the template resolver drive:
/// paginated identifier lists, batch describes with per-item failures,
/// and point describes for clusters and templates. The trait is object
/// safe and implementations are held as `Arc<dyn SourceClient>`.
///
/// Calls never block indefinitely on the caller's side of the seam;
/// bounding a slow upstream is done by wrapping the returned future
/// (e.g. `tokio::time::timeout`).
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Describe a cluster by display name or identifier.
    async fn describe_cluster(&self, cluster: &str) -> SourceResult<ClusterRecord>;

    /// List one page of container instance ids registered to a cluster.
    async fn list_container_instances(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> SourceResult<Page<String>>;

    /// Describe a batch of container instances.
    async fn describe_container_instances(
        &self,
        cluster: &str,
        ids: &[String],
    ) -> SourceResult<Batch<InstanceRecord>>;

    /// List one page of task ids running in a cluster.
    async fn list_tasks(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> SourceResult<Page<String>>;

    /// Describe a batch of tasks.
    async fn describe_tasks(
        &self,
        cluster: &str,
        ids: &[String],
    ) -> SourceResult<Batch<TaskRecord>>;

    /// Describe a work-unit template by identifier or `family:revision`.
    async fn describe_task_definition(&self, reference: &str) -> SourceResult<TemplateRecord>;
}
