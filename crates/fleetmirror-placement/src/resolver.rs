//! Template resolution with a write-once local cache.
//!
//! A reference arrives either as a `family:revision` short form or as a
//! full upstream identifier. Both resolve to the same cached record:
//! first resolution describes the template upstream, aggregates its
//! container definitions into totals, and persists the result under both
//! keys. Templates are immutable upstream, so the cache never expires.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use fleetmirror_source::{Protocol, SourceClient, SourceError, TemplateRecord};
use fleetmirror_state::{StateStore, TaskDefinition};

use crate::error::{PlacementError, PlacementResult};

/// A classified template reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    /// `family:revision` short form.
    Short(String),
    /// Full upstream identifier.
    Identifier(String),
}

impl TemplateRef {
    /// Classify a reference string by shape.
    ///
    /// The short form is exactly one `:` separating a non-empty family
    /// (no `/`) from a numeric revision. Anything else is treated as a
    /// full identifier.
    pub fn parse(reference: &str) -> Self {
        if let Some((family, revision)) = reference.split_once(':') {
            if !family.is_empty()
                && !family.contains('/')
                && !revision.is_empty()
                && revision.chars().all(|c| c.is_ascii_digit())
            {
                return TemplateRef::Short(reference.to_string());
            }
        }
        TemplateRef::Identifier(reference.to_string())
    }

    /// The raw reference string.
    pub fn as_str(&self) -> &str {
        match self {
            TemplateRef::Short(s) | TemplateRef::Identifier(s) => s,
        }
    }
}

/// Resolves template references against the local cache, falling back to
/// the upstream source exactly once per template.
pub struct TemplateResolver {
    store: StateStore,
    source: Arc<dyn SourceClient>,
}

impl TemplateResolver {
    pub fn new(store: StateStore, source: Arc<dyn SourceClient>) -> Self {
        Self { store, source }
    }

    /// Resolve a reference to its cached requirement record.
    ///
    /// Cache hits never touch the source. Misses describe the template
    /// upstream, aggregate it, and persist the result write-once under
    /// both the identifier and the short form.
    pub async fn resolve(&self, reference: &str) -> PlacementResult<TaskDefinition> {
        let cached = match TemplateRef::parse(reference) {
            TemplateRef::Short(short) => self.store.get_task_definition_by_short_ref(&short)?,
            TemplateRef::Identifier(id) => self.store.get_task_definition(&id)?,
        };
        if let Some(definition) = cached {
            debug!(%reference, id = %definition.id, "template cache hit");
            return Ok(definition);
        }

        let record = self
            .source
            .describe_task_definition(reference)
            .await
            .map_err(|e| match e {
                SourceError::NotFound(_) => {
                    PlacementError::TemplateNotFound(reference.to_string())
                }
                other => PlacementError::Source(other),
            })?;
        let definition = aggregate_template(&record);
        self.store.insert_task_definition(&definition)?;
        debug!(
            %reference,
            id = %definition.id,
            cpu = definition.cpu,
            memory = definition.memory,
            "template resolved and cached"
        );
        Ok(definition)
    }
}

/// Sum per-container requirements into a single requirement record.
///
/// Host ports are collected into protocol-split sets; mappings without a
/// fixed host port reserve nothing and are skipped.
fn aggregate_template(record: &TemplateRecord) -> TaskDefinition {
    let mut cpu = 0;
    let mut memory = 0;
    let mut tcp_ports = BTreeSet::new();
    let mut udp_ports = BTreeSet::new();
    for container in &record.container_definitions {
        cpu += container.cpu;
        memory += container.memory;
        for mapping in &container.port_mappings {
            let Some(port) = mapping.host_port.filter(|p| *p != 0) else {
                continue;
            };
            match mapping.protocol.unwrap_or(Protocol::Tcp) {
                Protocol::Tcp => tcp_ports.insert(port),
                Protocol::Udp => udp_ports.insert(port),
            };
        }
    }
    TaskDefinition {
        id: record.id.clone(),
        short_ref: record.short_ref(),
        cpu,
        memory,
        tcp_ports,
        udp_ports,
    }
}
