//! Node-creation phase: every identity becomes exactly one create-node
//! operation.
//!
//! Operations are commutative and conflict-free among themselves; the only
//! serialization hazard, a duplicate name, is caught server-side by the
//! unique name index and surfaces as a batch failure.

use std::collections::HashMap;

use anyhow::Result;
use graphload_client::StoreOperation;
use tracing::info;

use crate::identity::IdentitySet;
use crate::pool::BatchPool;

/// Counters from a completed node phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeLoadOutcome {
    /// Create-node operations submitted, one per identity.
    pub nodes_submitted: usize,
    /// Batches submitted.
    pub batches_submitted: usize,
}

/// Creates one node per identity through the pool.
///
/// Names missing from the popularity map (referenced only by edges) default
/// to popularity 0. An empty identity set completes with zero batches.
pub async fn create_nodes(
    pool: &BatchPool,
    identities: &IdentitySet,
    popularity: &HashMap<String, i64>,
    batch_size: usize,
) -> Result<NodeLoadOutcome> {
    let operations = identities.iter().map(|name| StoreOperation::CreateNode {
        name: name.clone(),
        popularity: popularity.get(name).copied().unwrap_or(0),
    });
    let batches_submitted = pool.run_batches(operations, batch_size).await?;
    let outcome = NodeLoadOutcome {
        nodes_submitted: identities.len(),
        batches_submitted,
    };
    info!(
        "Node phase complete: {} nodes in {} batches",
        outcome.nodes_submitted, outcome.batches_submitted
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{BatchDispatcher, SubmitFn};
    use graphload_client::BatchOutcome;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Helper to create a pool that records every batch.
    fn recording_pool(workers: usize) -> (BatchPool, Arc<Mutex<Vec<Vec<StoreOperation>>>>) {
        let batches: Arc<Mutex<Vec<Vec<StoreOperation>>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = batches.clone();
        let submit: SubmitFn = Arc::new(move |batch: Vec<StoreOperation>| {
            let recorded = recorded.clone();
            Box::pin(async move {
                recorded.lock().unwrap().push(batch);
                Ok(BatchOutcome::default())
            })
        });
        let pool = BatchPool::new(BatchDispatcher::new(submit), workers, 4);
        (pool, batches)
    }

    fn identities(names: &[&str]) -> IdentitySet {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_every_identity_submitted_once_with_popularity() {
        let (pool, batches) = recording_pool(3);
        let set = identities(&["A", "B", "C"]);
        let popularity: HashMap<String, i64> =
            [("A".to_string(), 5), ("B".to_string(), 3)].into_iter().collect();

        let outcome = create_nodes(&pool, &set, &popularity, 2)
            .await
            .expect("should run");

        assert_eq!(outcome.nodes_submitted, 3);
        assert_eq!(outcome.batches_submitted, 2); // ceil(3 / 2)

        let recorded = batches.lock().unwrap();
        let mut seen = HashSet::new();
        for batch in recorded.iter() {
            for operation in batch {
                let StoreOperation::CreateNode { name, popularity } = operation else {
                    panic!("node phase must only submit create-node operations");
                };
                assert!(seen.insert(name.clone()));
                let expected = match name.as_str() {
                    "A" => 5,
                    "B" => 3,
                    // Edge-only names default to zero.
                    "C" => 0,
                    other => panic!("unexpected name {}", other),
                };
                assert_eq!(*popularity, expected);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_identity_set_trivially_completes() {
        let (pool, batches) = recording_pool(2);
        let set = IdentitySet::new();

        let outcome = create_nodes(&pool, &set, &HashMap::new(), 10)
            .await
            .expect("should run");

        assert_eq!(outcome.nodes_submitted, 0);
        assert_eq!(outcome.batches_submitted, 0);
        assert!(batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_node_phase_failure_propagates() {
        let submit: SubmitFn = Arc::new(move |_batch: Vec<StoreOperation>| {
            Box::pin(async move { Err(anyhow::anyhow!("duplicate key on index")) })
        });
        let pool = BatchPool::new(BatchDispatcher::new(submit), 2, 2);
        let set = identities(&["A", "B"]);

        let err = create_nodes(&pool, &set, &HashMap::new(), 1)
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("duplicate key"));
    }
}
