//! End-to-end mirror tests.
//!
//! Each test drives a Mirror against an in-process SnapshotSource the
//! same way the CLI does: seed a snapshot, refresh, then query. The
//! upstream never answers queries directly — everything a query returns
//! must have landed in the local store during a refresh cycle.

use std::sync::Arc;

use fleetmirror::{Mirror, MirrorConfig, Snapshot, SnapshotSource};
use fleetmirror_source::{
    ClusterRecord, ContainerDefinitionRecord, InstanceRecord, PortMapping, Protocol, Resource,
    TaskRecord, TemplateRecord, RESOURCE_CPU, RESOURCE_MEMORY, RESOURCE_PORTS_TCP,
};

fn sample_cluster() -> ClusterRecord {
    ClusterRecord {
        id: "cluster-default".to_string(),
        name: "default".to_string(),
        status: "ACTIVE".to_string(),
    }
}

fn node_record(id: &str, cpu: i64, memory: i64, tcp: &[u16]) -> InstanceRecord {
    InstanceRecord {
        id: id.to_string(),
        agent_connected: true,
        agent_version: Some("1.82.0".to_string()),
        agent_hash: None,
        runtime_version: Some("docker-27.1".to_string()),
        agent_update_status: None,
        host_instance_id: Some(format!("host-{id}")),
        registered_resources: vec![
            Resource::integer(RESOURCE_CPU, 2048),
            Resource::integer(RESOURCE_MEMORY, 4096),
            Resource::string_set(RESOURCE_PORTS_TCP, ["80", "443"]),
        ],
        remaining_resources: vec![
            Resource::integer(RESOURCE_CPU, cpu),
            Resource::integer(RESOURCE_MEMORY, memory),
            Resource::string_set(RESOURCE_PORTS_TCP, tcp.iter().map(|p| p.to_string())),
        ],
        status: "ACTIVE".to_string(),
    }
}

fn task_record(id: &str, cluster_id: &str, node: &str) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        cluster_id: cluster_id.to_string(),
        container_instance_id: Some(node.to_string()),
        task_definition_id: "td-web".to_string(),
        desired_status: "RUNNING".to_string(),
        last_status: "RUNNING".to_string(),
        started_by: None,
    }
}

/// sample-app:1 wants 100 CPU, 100 MiB and host port 80/tcp.
fn web_template() -> TemplateRecord {
    TemplateRecord {
        id: "td-web".to_string(),
        family: "sample-app".to_string(),
        revision: 1,
        container_definitions: vec![ContainerDefinitionRecord {
            cpu: 100,
            memory: 100,
            port_mappings: vec![PortMapping {
                container_port: 8080,
                host_port: Some(80),
                protocol: Some(Protocol::Tcp),
            }],
        }],
    }
}

fn base_snapshot(nodes: Vec<InstanceRecord>) -> Snapshot {
    Snapshot {
        clusters: vec![sample_cluster()],
        container_instances: nodes,
        task_definitions: vec![web_template()],
        ..Snapshot::default()
    }
}

fn open_mirror(source: Arc<SnapshotSource>) -> Mirror {
    Mirror::open(&MirrorConfig::in_memory("default"), source).unwrap()
}

// ── Queries before and after refresh ──────────────────────────

#[tokio::test]
async fn locate_before_first_refresh_is_empty() {
    let source = Arc::new(SnapshotSource::new(base_snapshot(vec![node_record(
        "i-1",
        900,
        3000,
        &[80],
    )])));
    let mirror = open_mirror(source);

    // Nothing mirrored yet, so there is nothing to return. Not an error.
    assert!(mirror.cluster().unwrap().is_none());
    let nodes = mirror.find_locations("sample-app:1").await.unwrap();
    assert!(nodes.is_empty());
}

#[tokio::test]
async fn refresh_all_mirrors_cluster_nodes_and_tasks() {
    let snapshot = Snapshot {
        tasks: vec![task_record("t-1", "cluster-default", "i-1")],
        ..base_snapshot(vec![
            node_record("i-1", 900, 3000, &[80]),
            node_record("i-2", 1800, 4000, &[80, 443]),
        ])
    };
    let mirror = open_mirror(Arc::new(SnapshotSource::new(snapshot)));

    let summary = mirror.refresh_all().await.unwrap();
    assert_eq!(summary.upserted, 3);
    assert_eq!(summary.removed, 0);
    assert_eq!(summary.failed_items, 0);

    let cluster = mirror.cluster().unwrap().unwrap();
    assert_eq!(cluster.name, "default");
    assert_eq!(cluster.status, "ACTIVE");
    assert!(mirror.find_cluster_by_name("default").unwrap().is_some());
    assert!(mirror.find_cluster_by_name("other").unwrap().is_none());
    assert_eq!(mirror.container_instances().unwrap().len(), 2);

    let tasks = mirror.tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "t-1");
    assert_eq!(tasks[0].container_instance_id.as_deref(), Some("i-1"));
}

// ── Placement over mirrored state ─────────────────────────────

#[tokio::test]
async fn scale_down_frees_port_for_placement() {
    // Port 80 is taken on the only node, so sample-app:1 has nowhere to go.
    let source = Arc::new(SnapshotSource::new(base_snapshot(vec![node_record(
        "i-1",
        900,
        3000,
        &[],
    )])));
    let mirror = open_mirror(source.clone());
    mirror.refresh_all().await.unwrap();

    let nodes = mirror.find_locations("sample-app:1").await.unwrap();
    assert!(nodes.is_empty());

    // Upstream scales the old workload down, freeing the port. The mirror
    // only sees that after the next refresh.
    source
        .replace_snapshot(base_snapshot(vec![node_record("i-1", 900, 3000, &[80])]))
        .await;
    let nodes = mirror.find_locations("sample-app:1").await.unwrap();
    assert!(nodes.is_empty());

    mirror.refresh_container_instances().await.unwrap();
    let nodes = mirror.find_locations("sample-app:1").await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, "i-1");
}

#[tokio::test]
async fn template_is_described_once_then_cached() {
    let source = Arc::new(SnapshotSource::new(base_snapshot(vec![node_record(
        "i-1",
        900,
        3000,
        &[80],
    )])));
    let mirror = open_mirror(source.clone());
    mirror.refresh_all().await.unwrap();

    mirror.find_locations("sample-app:1").await.unwrap();
    mirror.find_locations("sample-app:1").await.unwrap();
    let definition = mirror.find_task_definition("sample-app:1").await.unwrap();

    assert_eq!(source.template_describe_calls(), 1);
    assert_eq!(definition.id, "td-web");
    assert_eq!(definition.cpu, 100);
    assert_eq!(definition.memory, 100);
    assert!(definition.tcp_ports.contains(&80));
}

// ── Convergence across refresh cycles ─────────────────────────

#[tokio::test]
async fn vanished_node_is_dropped_on_next_refresh() {
    let source = Arc::new(SnapshotSource::new(base_snapshot(vec![
        node_record("i-1", 900, 3000, &[80]),
        node_record("i-2", 1800, 4000, &[80]),
    ])));
    let mirror = open_mirror(source.clone());
    mirror.refresh_all().await.unwrap();
    assert_eq!(mirror.container_instances().unwrap().len(), 2);

    source
        .replace_snapshot(base_snapshot(vec![node_record("i-2", 1800, 4000, &[80])]))
        .await;
    let summary = mirror.refresh_container_instances().await.unwrap();
    assert_eq!(summary.removed, 1);

    let nodes = mirror.container_instances().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, "i-2");
}

#[tokio::test]
async fn tasks_from_other_clusters_stay_out() {
    let snapshot = Snapshot {
        clusters: vec![
            sample_cluster(),
            ClusterRecord {
                id: "cluster-other".to_string(),
                name: "other".to_string(),
                status: "ACTIVE".to_string(),
            },
        ],
        tasks: vec![
            task_record("t-mine", "cluster-default", "i-1"),
            task_record("t-theirs", "cluster-other", "i-9"),
        ],
        ..base_snapshot(vec![node_record("i-1", 900, 3000, &[80])])
    };
    let mirror = open_mirror(Arc::new(SnapshotSource::new(snapshot)));
    mirror.refresh_all().await.unwrap();

    let tasks = mirror.tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "t-mine");
}

// ── Persistence ───────────────────────────────────────────────

#[tokio::test]
async fn mirrored_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = MirrorConfig {
        cluster: "default".to_string(),
        data_path: Some(dir.path().join("mirror.redb")),
    };

    let source = Arc::new(SnapshotSource::new(base_snapshot(vec![node_record(
        "i-1",
        900,
        3000,
        &[80],
    )])));
    let mirror = Mirror::open(&config, source).unwrap();
    mirror.refresh_all().await.unwrap();
    // Caches td-web on disk alongside the mirrored entities.
    assert_eq!(mirror.find_locations("sample-app:1").await.unwrap().len(), 1);
    drop(mirror);

    // A fresh handle over the same file sees the mirrored state without
    // having refreshed, even if the upstream is gone.
    let empty = Arc::new(SnapshotSource::new(Snapshot::default()));
    let mirror = Mirror::open(&config, empty).unwrap();
    assert!(mirror.cluster().unwrap().is_some());
    assert_eq!(mirror.container_instances().unwrap().len(), 1);
    let nodes = mirror.find_locations("sample-app:1").await.unwrap();
    assert_eq!(nodes.len(), 1);
}
