//! Batch submission primitive over the store boundary.
//!
//! Knows nothing about nodes or edges: it takes ready operation batches and
//! reports each terminal outcome upward. Submission is type-erased behind
//! [`SubmitFn`] so the worker pool and loaders can run against recording or
//! failing closures in tests.
//!
//! There are no retries at this layer. Node creation under a unique-name
//! index is not idempotent: a retry after a transient network error that the
//! store had in fact committed would collide on the index. Retry policy
//! belongs to callers who can judge idempotency.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use graphload_client::{BatchOutcome, OrientClient, StoreOperation};
use tracing::debug;

/// A type-erased batch submit function.
///
/// Takes one batch of operations and resolves to its terminal outcome.
/// This avoids the dyn-incompatibility of `async fn` in traits.
pub type SubmitFn = Arc<
    dyn Fn(Vec<StoreOperation>) -> Pin<Box<dyn Future<Output = Result<BatchOutcome>> + Send>>
        + Send
        + Sync,
>;

/// Wraps a store client into a [`SubmitFn`] with a fixed transactional flag.
pub fn store_submit_fn(client: OrientClient, transactional: bool) -> SubmitFn {
    Arc::new(move |batch: Vec<StoreOperation>| {
        let client = client.clone();
        Box::pin(async move {
            let outcome = client.submit_batch(&batch, transactional).await?;
            Ok(outcome)
        })
    })
}

/// Submits operation batches and reports per-batch outcomes.
#[derive(Clone)]
pub struct BatchDispatcher {
    submit: SubmitFn,
}

impl BatchDispatcher {
    /// Builds a dispatcher over an arbitrary submit function.
    pub fn new(submit: SubmitFn) -> Self {
        Self { submit }
    }

    /// Builds a dispatcher submitting through the store client.
    pub fn for_store(client: OrientClient, transactional: bool) -> Self {
        Self::new(store_submit_fn(client, transactional))
    }

    /// Submits one batch and waits for its terminal response.
    pub async fn submit(&self, batch: Vec<StoreOperation>) -> Result<BatchOutcome> {
        let size = batch.len();
        let outcome = (self.submit)(batch).await?;
        debug!("Submitted batch of {} operations", size);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn op(name: &str) -> StoreOperation {
        StoreOperation::CreateNode {
            name: name.to_string(),
            popularity: 0,
        }
    }

    /// Helper to create a submit function that records every batch.
    fn recording_submit_fn() -> (SubmitFn, Arc<Mutex<Vec<Vec<StoreOperation>>>>) {
        let batches: Arc<Mutex<Vec<Vec<StoreOperation>>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = batches.clone();
        let submit: SubmitFn = Arc::new(move |batch: Vec<StoreOperation>| {
            let recorded = recorded.clone();
            Box::pin(async move {
                recorded.lock().unwrap().push(batch);
                Ok(BatchOutcome::default())
            })
        });
        (submit, batches)
    }

    /// Helper to create a submit function that always fails.
    fn failing_submit_fn(msg: &str) -> SubmitFn {
        let msg = msg.to_string();
        Arc::new(move |_batch: Vec<StoreOperation>| {
            let msg = msg.clone();
            Box::pin(async move { Err(anyhow::anyhow!("{}", msg)) })
        })
    }

    #[tokio::test]
    async fn test_dispatcher_passes_batch_through() {
        let (submit, batches) = recording_submit_fn();
        let dispatcher = BatchDispatcher::new(submit);

        dispatcher
            .submit(vec![op("A"), op("B")])
            .await
            .expect("should submit");

        let recorded = batches.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].len(), 2);
    }

    #[tokio::test]
    async fn test_dispatcher_reports_failure_verbatim() {
        let dispatcher = BatchDispatcher::new(failing_submit_fn("store rejected batch"));

        let err = dispatcher
            .submit(vec![op("A")])
            .await
            .expect_err("should fail");
        assert_eq!(err.to_string(), "store rejected batch");
    }

    #[tokio::test]
    async fn test_dispatcher_does_not_retry() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();
        let submit: SubmitFn = Arc::new(move |_batch: Vec<StoreOperation>| {
            *counter.lock().unwrap() += 1;
            Box::pin(async move { Err(anyhow::anyhow!("boom")) })
        });
        let dispatcher = BatchDispatcher::new(submit);

        let _ = dispatcher.submit(vec![op("A")]).await;
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_submit_fn_connection_refused() {
        let client = OrientClient::new(graphload_client::StoreConfig {
            base_url: "http://127.0.0.1:19999".to_string(),
            request_timeout: std::time::Duration::from_secs(2),
            ..graphload_client::StoreConfig::default()
        })
        .expect("client should build");

        let dispatcher = BatchDispatcher::for_store(client, false);
        let result = dispatcher.submit(vec![op("A")]).await;
        assert!(result.is_err());
    }
}
