//! Scatter-gather execution.
//!
//! One tokio task per target shard, bounded by a semaphore when
//! `max_parallelism` is set. A single cancellation token, derived from the
//! caller's token when supplied, governs the whole call: the deadline
//! cancels it, and still-running shard queries are recorded as failed
//! rather than silently dropped. No internal retries.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use shardway_models::ShardId;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{BoxError, ScatterGatherError, ShardQueryError};
use crate::outcome::{ScatterGatherOutcome, ShardFailure, ShardResult};

#[derive(Debug, Clone)]
pub struct ScatterGatherOptions {
    /// Upper bound on concurrently running shard queries, `None` = one
    /// task per shard with no bound
    pub max_parallelism: Option<usize>,
    pub timeout: Duration,
    /// When false, any shard failure fails the whole call
    pub allow_partial_results: bool,
}

impl Default for ScatterGatherOptions {
    fn default() -> Self {
        Self {
            max_parallelism: None,
            timeout: Duration::from_secs(30),
            allow_partial_results: true,
        }
    }
}

impl ScatterGatherOptions {
    pub fn with_max_parallelism(mut self, limit: usize) -> Self {
        self.max_parallelism = Some(limit);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn all_or_nothing(mut self) -> Self {
        self.allow_partial_results = false;
        self
    }
}

#[derive(Debug, Default)]
pub struct ScatterGatherExecutor;

impl ScatterGatherExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute<T, F, Fut>(
        &self,
        targets: Vec<ShardId>,
        query: F,
        options: &ScatterGatherOptions,
    ) -> Result<ScatterGatherOutcome<T>, ScatterGatherError>
    where
        T: Send + 'static,
        F: Fn(ShardId, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, BoxError>> + Send + 'static,
    {
        self.execute_cancellable(targets, query, options, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), additionally honoring the caller's
    /// cancellation token (request-level cancellation).
    pub async fn execute_cancellable<T, F, Fut>(
        &self,
        targets: Vec<ShardId>,
        query: F,
        options: &ScatterGatherOptions,
        parent: &CancellationToken,
    ) -> Result<ScatterGatherOutcome<T>, ScatterGatherError>
    where
        T: Send + 'static,
        F: Fn(ShardId, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, BoxError>> + Send + 'static,
    {
        let token = parent.child_token();
        let semaphore = options
            .max_parallelism
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let query = Arc::new(query);
        let total = targets.len();
        let started = Instant::now();
        debug!(
            shards = total,
            timeout_ms = options.timeout.as_millis() as u64,
            max_parallelism = ?options.max_parallelism,
            "scatter-gather start"
        );

        let mut join_set = JoinSet::new();
        for shard_id in targets {
            let token = token.clone();
            let query = query.clone();
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let _permit = match &semaphore {
                    Some(semaphore) => {
                        tokio::select! {
                            permit = semaphore.clone().acquire_owned() => match permit {
                                Ok(permit) => Some(permit),
                                Err(_) => {
                                    return (shard_id, Err(ShardQueryError::Cancelled));
                                }
                            },
                            _ = token.cancelled() => {
                                return (shard_id, Err(ShardQueryError::Cancelled));
                            }
                        }
                    }
                    None => None,
                };
                let query_fut = AssertUnwindSafe((query.as_ref())(
                    shard_id.clone(),
                    token.child_token(),
                ))
                .catch_unwind();
                tokio::select! {
                    result = query_fut => match result {
                        Ok(Ok(items)) => (shard_id, Ok(items)),
                        Ok(Err(error)) => {
                            (shard_id, Err(ShardQueryError::Query(error)))
                        }
                        Err(panic) => {
                            (shard_id, Err(ShardQueryError::Panicked(panic_message(panic))))
                        }
                    },
                    _ = token.cancelled() => (shard_id, Err(ShardQueryError::Cancelled)),
                }
            });
        }

        let deadline = tokio::time::sleep(options.timeout);
        tokio::pin!(deadline);
        let mut timed_out = false;
        let mut successful_shards = Vec::new();
        let mut failed_shards: Vec<ShardFailure> = Vec::new();
        loop {
            tokio::select! {
                joined = join_set.join_next() => match joined {
                    None => break,
                    Some(Ok((shard_id, Ok(items)))) => {
                        successful_shards.push(ShardResult { shard_id, items });
                    }
                    Some(Ok((shard_id, Err(error)))) => {
                        let error = match error {
                            // The deadline cancels the shared token; relabel
                            // so callers can tell timeout from caller cancel.
                            ShardQueryError::Cancelled if timed_out => {
                                ShardQueryError::Timeout { elapsed: started.elapsed() }
                            }
                            other => other,
                        };
                        warn!(shard = %shard_id, code = error.code(), "shard query failed");
                        failed_shards.push(ShardFailure { shard_id, error });
                    }
                    Some(Err(join_error)) => {
                        // Only reachable on runtime teardown; queries panics
                        // are caught inside the task.
                        warn!(error = %join_error, "shard task join failed");
                    }
                },
                _ = &mut deadline, if !timed_out => {
                    timed_out = true;
                    warn!(
                        timeout_ms = options.timeout.as_millis() as u64,
                        "scatter-gather deadline reached, cancelling in-flight shards"
                    );
                    token.cancel();
                }
            }
        }

        let elapsed = started.elapsed();
        if !failed_shards.is_empty() && !options.allow_partial_results {
            return Err(ScatterGatherError::PartialFailure {
                total,
                succeeded: successful_shards.len(),
                failures: failed_shards,
            });
        }
        debug!(
            succeeded = successful_shards.len(),
            failed = failed_shards.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "scatter-gather done"
        );
        Ok(ScatterGatherOutcome {
            successful_shards,
            failed_shards,
            elapsed,
        })
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_owned()
    }
}
