//! Bulk transfer worker pool
//!
//! Every job of a directory transfer is spawned up front as its own tokio
//! task. A semaphore caps how many run at once and completions are drained
//! in whatever order they finish. Failed jobs never stop the others; they
//! are collected and reported together once the whole batch is done.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Semaphore;

use crate::error::{Error, Result, TransferFailure};
use crate::traits::DEFAULT_CONCURRENCY;

/// One unit of work in a bulk transfer
#[derive(Debug, Clone)]
pub struct TransferJob<J> {
    /// Address of the object being moved, used to report failures
    pub source: String,
    /// Whatever the operation needs to move it
    pub payload: J,
}

impl<J> TransferJob<J> {
    pub fn new(source: impl Into<String>, payload: J) -> Self {
        Self {
            source: source.into(),
            payload,
        }
    }
}

/// Bounded-concurrency executor for per-object transfers
#[derive(Debug, Clone, Copy)]
pub struct TransferPool {
    concurrency: usize,
}

impl Default for TransferPool {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl TransferPool {
    /// Create a pool running at most `concurrency` jobs at a time
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `op` on every job and wait for all of them
    ///
    /// Returns the outputs of all jobs in completion order, or
    /// [`Error::PartialTransfer`] listing every failed job.
    pub async fn run<J, T, F, Fut>(&self, jobs: Vec<TransferJob<J>>, op: F) -> Result<Vec<T>>
    where
        J: Send + 'static,
        T: Send + 'static,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let total = jobs.len();
        tracing::debug!(jobs = total, concurrency = self.concurrency, "Starting bulk transfer");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let op = Arc::new(op);
        let mut tasks = FuturesUnordered::new();

        for TransferJob { source, payload } in jobs {
            let semaphore = Arc::clone(&semaphore);
            let op = Arc::clone(&op);
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::General(format!("Transfer pool closed: {e}")))?;
                op(payload).await
            });
            tasks.push(async move { (source, handle.await) });
        }

        let mut outputs = Vec::with_capacity(total);
        let mut failures = Vec::new();
        while let Some((source, joined)) = tasks.next().await {
            match joined {
                Ok(Ok(output)) => outputs.push(output),
                Ok(Err(error)) => {
                    tracing::warn!(source = %source, error = %error, "Transfer failed");
                    failures.push(TransferFailure { source, error });
                }
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "Transfer task aborted");
                    failures.push(TransferFailure {
                        source,
                        error: Error::Transfer(format!("worker task failed: {e}")),
                    });
                }
            }
        }

        if failures.is_empty() {
            tracing::debug!(jobs = total, "Bulk transfer complete");
            return Ok(outputs);
        }

        failures.sort_by(|a, b| a.source.cmp(&b.source));
        Err(Error::PartialTransfer {
            succeeded: outputs.len(),
            failures,
        })
    }
}
