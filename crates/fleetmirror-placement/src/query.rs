//! Placement queries against the mirrored state.
//!
//! Filtering only: every node in the cluster that passes connectivity,
//! CPU, memory, and port checks is returned, in store order. Ranking and
//! reservation are the caller's concern.

use std::sync::Arc;

use tracing::debug;

use fleetmirror_source::SourceClient;
use fleetmirror_state::{ContainerInstance, StateStore, TaskDefinition};

use crate::error::PlacementResult;
use crate::resolver::TemplateResolver;

/// True when a node can host one instance of the template right now.
///
/// The node's agent must be connected, remaining CPU and memory must cover
/// the template's totals, and every required host port must still be in
/// the node's remaining port set for its protocol.
pub fn node_can_host(definition: &TaskDefinition, node: &ContainerInstance) -> bool {
    node.agent_connected
        && node.remaining.cpu >= definition.cpu
        && node.remaining.memory >= definition.memory
        && definition.tcp_ports.is_subset(&node.remaining.tcp_ports)
        && definition.udp_ports.is_subset(&node.remaining.udp_ports)
}

/// Answers "which nodes can host template T" from the mirrored state.
pub struct PlacementEngine {
    store: StateStore,
    resolver: TemplateResolver,
}

impl PlacementEngine {
    pub fn new(store: StateStore, source: Arc<dyn SourceClient>) -> Self {
        let resolver = TemplateResolver::new(store.clone(), source);
        Self { store, resolver }
    }

    /// Resolve the template and filter candidate nodes in the cluster.
    ///
    /// Zero qualifying nodes is an empty vec, not an error. Results
    /// reflect the last completed refresh; the engine never decrements
    /// remaining capacity for placements it informs.
    pub async fn find_locations(
        &self,
        reference: &str,
        cluster_id: &str,
    ) -> PlacementResult<Vec<ContainerInstance>> {
        let definition = self.resolver.resolve(reference).await?;
        let candidates = self.store.find_container_instances(|node| {
            node.cluster_id == cluster_id && node_can_host(&definition, node)
        })?;
        debug!(
            %reference,
            %cluster_id,
            candidates = candidates.len(),
            "placement query answered"
        );
        Ok(candidates)
    }

    /// The resolver backing this engine (for direct template lookups).
    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }
}
