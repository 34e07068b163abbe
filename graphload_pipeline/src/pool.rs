//! Bounded worker pool for concurrent batch submission.
//!
//! One producer streams operations, chunks them into fixed-size batches, and
//! feeds a bounded channel; a fixed set of workers drains the channel and
//! submits through the dispatcher. Backpressure on the channel keeps memory
//! bounded by (channel capacity + workers) × batch size regardless of input
//! size.
//!
//! Failure policy is fail fast: the first submit error flips a shared flag
//! that stops siblings from taking new batches and the producer from feeding
//! more. In-flight requests are left to finish and nothing is retried.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, ensure, Result};
use graphload_client::StoreOperation;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dispatch::BatchDispatcher;

/// A fixed-size pool of batch-submitting workers over a bounded channel.
#[derive(Clone)]
pub struct BatchPool {
    dispatcher: BatchDispatcher,
    workers: usize,
    channel_capacity: usize,
}

impl BatchPool {
    pub fn new(dispatcher: BatchDispatcher, workers: usize, channel_capacity: usize) -> Self {
        Self {
            dispatcher,
            workers,
            channel_capacity,
        }
    }

    /// Drains `operations` through the pool in batches of `batch_size`.
    ///
    /// The producer runs on the calling task; workers are spawned fresh for
    /// this call and joined before it returns. On success the number of
    /// batches submitted is returned; on failure the first worker error is
    /// returned once every worker has stopped. An empty input completes with
    /// zero batches and no submissions.
    pub async fn run_batches<I>(&self, operations: I, batch_size: usize) -> Result<usize>
    where
        I: Iterator<Item = StoreOperation>,
    {
        ensure!(batch_size > 0, "batch size must be positive");
        ensure!(self.workers > 0, "worker count must be positive");
        ensure!(self.channel_capacity > 0, "channel capacity must be positive");

        let (tx, rx) = mpsc::channel::<Vec<StoreOperation>>(self.channel_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let cancel = Arc::new(AtomicBool::new(false));

        let handles: Vec<JoinHandle<Result<usize>>> = (0..self.workers)
            .map(|worker_id| {
                let dispatcher = self.dispatcher.clone();
                let rx = rx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let mut submitted = 0usize;
                    loop {
                        // The lock is held only while waiting for a batch,
                        // never across the network call.
                        let batch = {
                            let mut rx = rx.lock().await;
                            rx.recv().await
                        };
                        let Some(batch) = batch else { break };
                        if cancel.load(Ordering::SeqCst) {
                            break;
                        }
                        match dispatcher.submit(batch).await {
                            Ok(_) => submitted += 1,
                            Err(e) => {
                                cancel.store(true, Ordering::SeqCst);
                                warn!("Worker {} stopping after batch failure: {:#}", worker_id, e);
                                return Err(e);
                            }
                        }
                    }
                    Ok(submitted)
                })
            })
            .collect();
        // Workers now hold the only receiver handles, so the channel closes
        // when the last worker exits and a blocked send below cannot outlive
        // the pool.
        drop(rx);

        // Producer: accumulate full batches and push them into the channel,
        // blocking when it is full. Stops on cancellation or when every
        // worker has exited.
        let mut pending: Vec<StoreOperation> = Vec::with_capacity(batch_size);
        for operation in operations {
            if cancel.load(Ordering::SeqCst) {
                break;
            }
            pending.push(operation);
            if pending.len() == batch_size {
                let batch = mem::replace(&mut pending, Vec::with_capacity(batch_size));
                if tx.send(batch).await.is_err() {
                    break;
                }
            }
        }
        if !pending.is_empty() && !cancel.load(Ordering::SeqCst) {
            let _ = tx.send(pending).await;
        }
        drop(tx);

        let mut submitted = 0usize;
        let mut first_error: Option<anyhow::Error> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(count)) => submitted += count,
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error = Some(anyhow!("worker task panicked: {}", join_err));
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("Pool drained: {} batches submitted", submitted);
                Ok(submitted)
            }
        }
    }
}
