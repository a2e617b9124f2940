//! Bounded worker pool that queries every prefix exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use hibp_range_client::{Prefix, RangeSource};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::engine::MatchingEngine;
use crate::progress::{Progress, ProgressUpdate};

/// Default number of concurrent range queries.
pub const DEFAULT_WORKERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSummary {
    /// Prefixes handed to the pool.
    pub total: u64,
    /// Prefixes attempted, successfully or not.
    pub completed: u64,
    /// Attempted prefixes whose query failed.
    pub failed: u64,
    /// Prefixes never attempted, or interrupted mid-query, because the run
    /// was cancelled or a worker died.
    pub skipped: u64,
    pub workers: usize,
    /// Worker tasks that panicked. The others keep draining the queue.
    pub panicked_workers: usize,
    pub elapsed: Duration,
}

struct Shared<C> {
    client: Arc<C>,
    engine: Arc<MatchingEngine>,
    progress: Arc<dyn Progress>,
    jobs: Mutex<mpsc::Receiver<Prefix>>,
    completed: AtomicU64,
    failed: AtomicU64,
    total: u64,
    started: Instant,
    cancel: CancellationToken,
}

/// Runs every prefix through `client` and `engine` on `workers` tasks.
///
/// Returns once each prefix has been attempted, or right after `cancel`
/// fires: in-flight queries are dropped and counted as skipped. Query
/// failures and worker panics are reported and counted, never returned.
pub async fn run<C: RangeSource>(
    prefixes: &[Prefix],
    workers: usize,
    client: Arc<C>,
    engine: Arc<MatchingEngine>,
    progress: Arc<dyn Progress>,
    cancel: CancellationToken,
) -> PoolSummary {
    let workers = workers.max(1);
    let total = prefixes.len() as u64;

    // Every job is queued before any worker starts, so the channel only has
    // to hold them all.
    let (tx, rx) = mpsc::channel(prefixes.len().max(1));
    for prefix in prefixes {
        if tx.send(*prefix).await.is_err() {
            break;
        }
    }
    drop(tx);

    progress.started(total, workers);

    let shared = Arc::new(Shared {
        client,
        engine,
        progress: Arc::clone(&progress),
        jobs: Mutex::new(rx),
        completed: AtomicU64::new(0),
        failed: AtomicU64::new(0),
        total,
        started: Instant::now(),
        cancel,
    });

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let shared = Arc::clone(&shared);
        handles.push(tokio::spawn(async move { worker(&shared).await }));
    }

    // Wait for all workers to complete
    let mut panicked_workers = 0;
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "worker task failed");
            panicked_workers += 1;
        }
    }

    let completed = shared.completed.load(Ordering::Acquire);
    let summary = PoolSummary {
        total,
        completed,
        failed: shared.failed.load(Ordering::Acquire),
        skipped: total - completed,
        workers,
        panicked_workers,
        elapsed: shared.started.elapsed(),
    };
    progress.finished(&summary);

    summary
}

async fn worker<C: RangeSource>(shared: &Shared<C>) {
    loop {
        if shared.cancel.is_cancelled() {
            break;
        }

        // The queue is fully populated, so this lock is only held for a pop.
        let next = shared.jobs.lock().await.recv().await;
        let Some(prefix) = next else { break };

        // An interrupted query is never counted as completed.
        let result = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => {
                tracing::debug!(%prefix, "query interrupted");
                break;
            }
            result = shared.client.query_prefix(&prefix) => result,
        };

        match result {
            Ok(body) => {
                let found = shared.engine.match_response(&prefix, &body);
                if found > 0 {
                    tracing::debug!(%prefix, found, "prefix matched local hashes");
                }
            }
            Err(e) => {
                shared.failed.fetch_add(1, Ordering::AcqRel);
                shared.progress.query_failed(&prefix, &e);
            }
        }

        let completed = shared.completed.fetch_add(1, Ordering::AcqRel) + 1;
        shared.progress.prefix_completed(&ProgressUpdate {
            completed,
            total: shared.total,
            elapsed: shared.started.elapsed(),
        });
    }
}
