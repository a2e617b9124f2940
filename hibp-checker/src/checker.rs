use std::path::Path;
use std::sync::Arc;

use hibp_range_client::{HashMode, RangeSource};
use tokio_util::sync::CancellationToken;

use crate::engine::MatchingEngine;
use crate::error::Error;
use crate::index::HashIndex;
use crate::loader::{LoadOptions, Record, load_file};
use crate::pool::{self, DEFAULT_WORKERS, PoolSummary};
use crate::progress::{Progress, Silent};
use crate::sink::ResultSink;

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub load: LoadOptions,
    /// Concurrent range queries. Values below 1 are treated as 1.
    pub workers: usize,
    /// Digest length the export should contain. Hashes of other lengths are
    /// still checked, but a warning is logged.
    pub expected_hash_len: Option<usize>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            workers: DEFAULT_WORKERS,
            expected_hash_len: Some(HashMode::Ntlm.digest_len()),
        }
    }
}

/// Outcome of a run. Always produced unless the input could not be read.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// Records parsed from the input.
    pub records: usize,
    /// Records that made it into the index.
    pub indexed: usize,
    /// Distinct prefixes handed to the pool.
    pub prefixes: usize,
    /// Distinct accounts confirmed exposed.
    pub exposed: usize,
    /// Accounts written to the result sink.
    pub written: u64,
    pub pool: PoolSummary,
}

/// Loads credentials, indexes them and checks every prefix against a range source.
pub struct Checker<C> {
    client: Arc<C>,
    progress: Arc<dyn Progress>,
    cancel: CancellationToken,
}

impl<C: RangeSource> Checker<C> {
    pub fn new(client: C) -> Self {
        Self::from_arc(Arc::new(client))
    }

    pub fn from_arc(client: Arc<C>) -> Self {
        Self { client, progress: Arc::new(Silent), cancel: CancellationToken::new() }
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    /// Stops the run once `cancel` fires, dropping in-flight queries. Results
    /// found so far are still reported.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Checks every account in the export at `path`.
    ///
    /// Only a missing or unreadable input aborts. Failed prefixes and failed
    /// writes are reported through the progress hooks, and a panicking worker
    /// only shows up in the report's counts.
    pub async fn check_file(
        &self,
        path: &Path,
        options: &CheckOptions,
        sink: Arc<ResultSink>,
    ) -> Result<CheckReport, Error> {
        let records = load_file(path, &options.load)?;
        self.check_records(&records, options, sink).await
    }

    pub async fn check_records(
        &self,
        records: &[Record],
        options: &CheckOptions,
        sink: Arc<ResultSink>,
    ) -> Result<CheckReport, Error> {
        let index = Arc::new(HashIndex::build(records));
        let skipped = index.skipped();

        tracing::info!(
            records = records.len(),
            indexed = index.account_count(),
            machine_accounts = skipped.machine,
            empty_hashes = skipped.empty,
            short_hashes = skipped.short,
            "found {} users, {} unique hash prefixes to query",
            records.len(),
            index.prefixes().len(),
        );

        if let Some(expected) = options.expected_hash_len {
            let odd = index.unexpected_length_count(expected);
            if odd > 0 {
                tracing::warn!(hashes = odd, expected, "some hashes do not have the expected length");
            }
        }

        let engine = Arc::new(MatchingEngine::new(
            Arc::clone(&index),
            Arc::clone(&sink),
            Arc::clone(&self.progress),
        ));

        let pool = pool::run(
            index.prefixes(),
            options.workers,
            Arc::clone(&self.client),
            Arc::clone(&engine),
            Arc::clone(&self.progress),
            self.cancel.clone(),
        )
        .await;

        if pool.panicked_workers > 0 {
            tracing::error!(
                workers = pool.panicked_workers,
                skipped = pool.skipped,
                "worker tasks panicked"
            );
        }

        if let Err(e) = sink.flush() {
            tracing::warn!(error = %e, "failed to flush results");
        }

        Ok(CheckReport {
            records: records.len(),
            indexed: index.account_count(),
            prefixes: index.prefixes().len(),
            exposed: engine.exposed_count(),
            written: sink.written(),
            pool,
        })
    }
}
