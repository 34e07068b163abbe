//! Phase sequencing for one load run.
//!
//! `LoadingRecords → BuildingIdentitySet → CreatingNodes →
//! ResolvingIdentities → CreatingEdges → Done`, with `Failed` absorbing the
//! first fatal error from any phase. No phase starts before its predecessor
//! completes, and nothing is rolled back on failure: batches are not
//! transactional across each other, so a failed run can leave partial data
//! in the store.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use graphload_client::OrientClient;
use tracing::info;

use crate::dispatch::BatchDispatcher;
use crate::edges::create_edges;
use crate::identity::{build_identity_set, resolve_identities};
use crate::nodes::create_nodes;
use crate::pool::BatchPool;
use crate::records::load_records;

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Phases of a load run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    LoadingRecords,
    BuildingIdentitySet,
    CreatingNodes,
    ResolvingIdentities,
    CreatingEdges,
    Done,
    Failed,
}

impl LoadPhase {
    /// Phase name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            LoadPhase::LoadingRecords => "loading records",
            LoadPhase::BuildingIdentitySet => "building identity set",
            LoadPhase::CreatingNodes => "creating nodes",
            LoadPhase::ResolvingIdentities => "resolving identifiers",
            LoadPhase::CreatingEdges => "creating edges",
            LoadPhase::Done => "done",
            LoadPhase::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Settings & summary
// ---------------------------------------------------------------------------

/// Knobs for one load run, passed in at construction.
#[derive(Debug, Clone)]
pub struct LoadSettings {
    /// Node-attribute source path.
    pub nodes_path: PathBuf,
    /// Edge-list source path.
    pub edges_path: PathBuf,
    /// Operations per batch.
    pub batch_size: usize,
    /// Workers per phase pool.
    pub workers: usize,
    /// Batches buffered in the work channel.
    pub channel_capacity: usize,
    /// Ask the store to apply each batch as one all-or-nothing unit.
    pub transactional: bool,
}

/// Counters reported after a successful run.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    /// Distinct names seen across both sources.
    pub distinct_names: usize,
    /// Nodes created (one per distinct name).
    pub nodes_created: usize,
    /// Node batches submitted.
    pub node_batches: usize,
    /// Edges created.
    pub edges_created: usize,
    /// Edge batches submitted.
    pub edge_batches: usize,
    /// Edges dropped because an endpoint never resolved.
    pub edges_dangling: usize,
    /// Malformed node lines skipped.
    pub skipped_node_lines: usize,
    /// Malformed edge lines skipped.
    pub skipped_edge_lines: usize,
    /// Wall-clock duration of the whole run.
    pub elapsed_ms: u64,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Sequences the load phases against one store client.
pub struct Coordinator {
    client: OrientClient,
    settings: LoadSettings,
    phase: LoadPhase,
}

impl Coordinator {
    pub fn new(client: OrientClient, settings: LoadSettings) -> Self {
        Self {
            client,
            settings,
            phase: LoadPhase::LoadingRecords,
        }
    }

    /// The phase the last [`run`](Self::run) call reached.
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Runs all phases to completion or to the first fatal error.
    ///
    /// The error chain names the failed phase. Already-submitted batches are
    /// not compensated on failure.
    pub async fn run(&mut self) -> Result<LoadSummary> {
        let started = Instant::now();
        match self.run_phases().await {
            Ok(mut summary) => {
                self.phase = LoadPhase::Done;
                summary.elapsed_ms = started.elapsed().as_millis() as u64;
                info!(
                    "Load complete: {} nodes, {} edges, {} dangling in {}ms",
                    summary.nodes_created,
                    summary.edges_created,
                    summary.edges_dangling,
                    summary.elapsed_ms,
                );
                Ok(summary)
            }
            Err(e) => {
                self.phase = LoadPhase::Failed;
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self) -> Result<LoadSummary> {
        self.enter(LoadPhase::LoadingRecords);
        let records = load_records(&self.settings.nodes_path, &self.settings.edges_path)
            .context("loading records failed")?;

        self.enter(LoadPhase::BuildingIdentitySet);
        let identities = build_identity_set(&records.popularity, &records.edges);
        info!(
            "{} distinct names from {} node records and {} edge pairs",
            identities.len(),
            records.popularity.len(),
            records.edges.len(),
        );

        let dispatcher =
            BatchDispatcher::for_store(self.client.clone(), self.settings.transactional);
        let pool = BatchPool::new(
            dispatcher,
            self.settings.workers,
            self.settings.channel_capacity,
        );

        self.enter(LoadPhase::CreatingNodes);
        let node_outcome = create_nodes(
            &pool,
            &identities,
            &records.popularity,
            self.settings.batch_size,
        )
        .await
        .context("creating nodes failed")?;

        self.enter(LoadPhase::ResolvingIdentities);
        let identity_map = resolve_identities(&self.client)
            .await
            .context("resolving identifiers failed")?;

        self.enter(LoadPhase::CreatingEdges);
        let edge_outcome = create_edges(
            &pool,
            &records.edges,
            &identity_map,
            self.settings.batch_size,
        )
        .await
        .context("creating edges failed")?;

        Ok(LoadSummary {
            distinct_names: identities.len(),
            nodes_created: node_outcome.nodes_submitted,
            node_batches: node_outcome.batches_submitted,
            edges_created: edge_outcome.edges_submitted,
            edge_batches: edge_outcome.batches_submitted,
            edges_dangling: edge_outcome.edges_dangling,
            skipped_node_lines: records.skipped_node_lines,
            skipped_edge_lines: records.skipped_edge_lines,
            elapsed_ms: 0,
        })
    }

    fn enter(&mut self, phase: LoadPhase) {
        self.phase = phase;
        info!("Phase: {}", phase.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphload_client::StoreConfig;
    use std::time::Duration;

    fn dead_client() -> OrientClient {
        OrientClient::new(StoreConfig {
            base_url: "http://127.0.0.1:19999".to_string(),
            request_timeout: Duration::from_secs(2),
            ..StoreConfig::default()
        })
        .expect("client should build")
    }

    fn settings(nodes: PathBuf, edges: PathBuf) -> LoadSettings {
        LoadSettings {
            nodes_path: nodes,
            edges_path: edges,
            batch_size: 10,
            workers: 2,
            channel_capacity: 2,
            transactional: false,
        }
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(LoadPhase::CreatingNodes.as_str(), "creating nodes");
        assert_eq!(LoadPhase::Failed.as_str(), "failed");
    }

    #[tokio::test]
    async fn test_missing_source_fails_in_record_phase() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut coordinator = Coordinator::new(
            dead_client(),
            settings(dir.path().join("absent.csv"), dir.path().join("edges.csv")),
        );

        let err = coordinator.run().await.expect_err("should fail");
        assert!(format!("{:#}", err).contains("loading records failed"));
        assert_eq!(coordinator.phase(), LoadPhase::Failed);
    }

    #[tokio::test]
    async fn test_node_phase_failure_names_node_phase() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nodes = dir.path().join("nodes.csv");
        let edges = dir.path().join("edges.csv");
        std::fs::write(&nodes, "A,1\n").expect("write");
        std::fs::write(&edges, "").expect("write");

        // First network touch happens in the node phase; the client points
        // at a closed port.
        let mut coordinator = Coordinator::new(dead_client(), settings(nodes, edges));

        let err = coordinator.run().await.expect_err("should fail");
        assert!(format!("{:#}", err).contains("creating nodes failed"));
        assert_eq!(coordinator.phase(), LoadPhase::Failed);
    }

    #[tokio::test]
    async fn test_empty_sources_fail_at_resolution_not_before() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nodes = dir.path().join("nodes.csv");
        let edges = dir.path().join("edges.csv");
        std::fs::write(&nodes, "").expect("write");
        std::fs::write(&edges, "").expect("write");

        // With nothing to create, the node phase submits zero batches and
        // the identifier read is the first call to hit the dead client.
        let mut coordinator = Coordinator::new(dead_client(), settings(nodes, edges));

        let err = coordinator.run().await.expect_err("should fail");
        assert!(format!("{:#}", err).contains("resolving identifiers failed"));
        assert_eq!(coordinator.phase(), LoadPhase::Failed);
    }
}
