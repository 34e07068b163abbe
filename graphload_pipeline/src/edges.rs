//! Edge-creation phase: endpoint resolution, dangling-edge accounting, and
//! batch submission.

use anyhow::Result;
use graphload_client::StoreOperation;
use tracing::{info, warn};

use crate::identity::IdentityMap;
use crate::pool::BatchPool;
use crate::records::EdgePair;

/// Counters from a completed edge phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeLoadOutcome {
    /// Create-edge operations submitted (both endpoints resolved).
    pub edges_submitted: usize,
    /// Edges skipped because an endpoint never resolved to an identifier.
    pub edges_dangling: usize,
    /// Batches submitted.
    pub batches_submitted: usize,
}

/// Creates every edge whose both endpoints resolve.
///
/// An unresolved endpoint is never fatal: the pair is counted as dangling
/// and skipped, since upstream data may reference names that were lost to a
/// collision. Identical pairs are not deduplicated; each occurrence produces
/// its own edge. `edges_submitted + edges_dangling` always equals the input
/// pair count.
pub async fn create_edges(
    pool: &BatchPool,
    pairs: &[EdgePair],
    identities: &IdentityMap,
    batch_size: usize,
) -> Result<EdgeLoadOutcome> {
    let mut dangling = 0usize;
    let operations = pairs.iter().filter_map(|pair| {
        match (identities.get(&pair.from), identities.get(&pair.to)) {
            (Some(from), Some(to)) => Some(StoreOperation::CreateEdge {
                from: from.clone(),
                to: to.clone(),
            }),
            _ => {
                dangling += 1;
                warn!("Skipping dangling edge {} -> {}", pair.from, pair.to);
                None
            }
        }
    });
    let batches_submitted = pool.run_batches(operations, batch_size).await?;
    let outcome = EdgeLoadOutcome {
        edges_submitted: pairs.len() - dangling,
        edges_dangling: dangling,
        batches_submitted,
    };
    info!(
        "Edge phase complete: {} edges in {} batches, {} dangling",
        outcome.edges_submitted, outcome.batches_submitted, outcome.edges_dangling
    );
    Ok(outcome)
}
