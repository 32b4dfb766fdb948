//! fleetmirror — offline placement queries over a cluster snapshot.
//!
//! Loads a JSON snapshot of the upstream cluster, mirrors it into an
//! in-memory store, then answers queries locally:
//!
//! ```text
//! fleetmirror locate --snapshot cluster.json --template sample-app:1
//! fleetmirror nodes --snapshot cluster.json --json
//! fleetmirror tasks --snapshot cluster.json --cluster prod
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fleetmirror::{Mirror, MirrorConfig, Snapshot, SnapshotSource};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "fleetmirror",
    about = "Locally queryable mirror of an upstream cluster",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find nodes with enough spare capacity and free host ports to run a
    /// task definition.
    Locate {
        /// Template reference: `family:revision` or a full identifier.
        #[arg(long)]
        template: String,

        /// Snapshot file describing the upstream cluster.
        #[arg(long)]
        snapshot: PathBuf,

        /// Name of the cluster to mirror.
        #[arg(long, default_value = "default")]
        cluster: String,

        /// Print JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// List the mirrored container instances.
    Nodes {
        /// Snapshot file describing the upstream cluster.
        #[arg(long)]
        snapshot: PathBuf,

        /// Name of the cluster to mirror.
        #[arg(long, default_value = "default")]
        cluster: String,

        /// Print JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// List the mirrored tasks.
    Tasks {
        /// Snapshot file describing the upstream cluster.
        #[arg(long)]
        snapshot: PathBuf,

        /// Name of the cluster to mirror.
        #[arg(long, default_value = "default")]
        cluster: String,

        /// Print JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,fleetmirror=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Locate {
            template,
            snapshot,
            cluster,
            json,
        } => run_locate(&template, &snapshot, &cluster, json).await,
        Command::Nodes {
            snapshot,
            cluster,
            json,
        } => run_nodes(&snapshot, &cluster, json).await,
        Command::Tasks {
            snapshot,
            cluster,
            json,
        } => run_tasks(&snapshot, &cluster, json).await,
    }
}

/// Load a snapshot file and refresh an in-memory mirror from it.
async fn open_mirror(snapshot: &Path, cluster: &str) -> anyhow::Result<Mirror> {
    let content = std::fs::read_to_string(snapshot)
        .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
    let parsed: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("parsing snapshot {}", snapshot.display()))?;

    let source = Arc::new(SnapshotSource::new(parsed));
    let mirror = Mirror::open(&MirrorConfig::in_memory(cluster), source)?;
    let summary = mirror.refresh_all().await?;
    info!(
        upserted = summary.upserted,
        removed = summary.removed,
        failed = summary.failed_items,
        "snapshot mirrored"
    );
    Ok(mirror)
}

async fn run_locate(
    template: &str,
    snapshot: &Path,
    cluster: &str,
    json: bool,
) -> anyhow::Result<()> {
    let mirror = open_mirror(snapshot, cluster).await?;
    let definition = mirror.find_task_definition(template).await?;
    let nodes = mirror.find_locations(template).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    println!(
        "{} needs cpu={} memory={} tcp=[{}] udp=[{}]",
        template,
        definition.cpu,
        definition.memory,
        join_ports(&definition.tcp_ports),
        join_ports(&definition.udp_ports),
    );
    if nodes.is_empty() {
        println!("no node in {cluster} can host it");
        return Ok(());
    }
    println!("{} candidate node(s) in {cluster}:", nodes.len());
    for node in &nodes {
        println!(
            "  {}  cpu={} memory={} tcp_free=[{}] udp_free=[{}]",
            node.id,
            node.remaining.cpu,
            node.remaining.memory,
            join_ports(&node.remaining.tcp_ports),
            join_ports(&node.remaining.udp_ports),
        );
    }
    Ok(())
}

async fn run_nodes(snapshot: &Path, cluster: &str, json: bool) -> anyhow::Result<()> {
    let mirror = open_mirror(snapshot, cluster).await?;
    let nodes = mirror.container_instances()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    println!("{} node(s) in {cluster}:", nodes.len());
    for node in &nodes {
        let agent = if node.agent_connected {
            "connected"
        } else {
            "disconnected"
        };
        println!(
            "  {}  {}  {}  cpu={}/{} memory={}/{} tcp_free=[{}]",
            node.id,
            node.status,
            agent,
            node.remaining.cpu,
            node.registered.cpu,
            node.remaining.memory,
            node.registered.memory,
            join_ports(&node.remaining.tcp_ports),
        );
    }
    Ok(())
}

async fn run_tasks(snapshot: &Path, cluster: &str, json: bool) -> anyhow::Result<()> {
    let mirror = open_mirror(snapshot, cluster).await?;
    let tasks = mirror.tasks()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    println!("{} task(s) in {cluster}:", tasks.len());
    for task in &tasks {
        println!(
            "  {}  {} -> {}  template={}  node={}",
            task.id,
            task.last_status,
            task.desired_status,
            task.task_definition_id,
            task.container_instance_id.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn join_ports(ports: &BTreeSet<u16>) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
