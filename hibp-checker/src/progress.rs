//! Progress and notification hooks for a run.
//!
//! The engine and the pool report through [`Progress`] instead of printing,
//! so tests can observe them directly.

use std::time::Duration;

use hibp_range_client::Prefix;
use indicatif::{ProgressBar, ProgressStyle};

use crate::pool::PoolSummary;

/// Snapshot taken right after a prefix query finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub completed: u64,
    pub total: u64,
    pub elapsed: Duration,
}

impl ProgressUpdate {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

/// Receives run events. Every method defaults to doing nothing.
///
/// Called concurrently from all workers. `exposed` is called while the
/// exposure lock is held, so implementations must not block for long.
pub trait Progress: Send + Sync {
    fn started(&self, _total: u64, _workers: usize) {}

    fn prefix_completed(&self, _update: &ProgressUpdate) {}

    fn exposed(&self, _account: &str) {}

    fn query_failed(&self, _prefix: &Prefix, _error: &hibp_range_client::Error) {}

    fn write_failed(&self, _account: &str, _error: &std::io::Error) {}

    fn finished(&self, _summary: &PoolSummary) {}
}

/// Reports nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Progress for Silent {}

/// Terminal reporting: a progress bar plus `tracing` events.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message("querying HIBP");
        Self { bar }
    }

    /// No bar, only log lines.
    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for ConsoleProgress {
    fn started(&self, total: u64, workers: usize) {
        self.bar.set_length(total);
        self.bar.suspend(|| tracing::info!(prefixes = total, workers, "querying range API"));
    }

    fn prefix_completed(&self, update: &ProgressUpdate) {
        // Completions race, so only ever move the bar forward.
        if update.completed > self.bar.position() {
            self.bar.set_position(update.completed);
        }
    }

    fn exposed(&self, account: &str) {
        if self.bar.is_hidden() {
            println!("[EXPOSED] {account}");
        } else {
            self.bar.println(format!("[EXPOSED] {account}"));
        }
    }

    fn query_failed(&self, prefix: &Prefix, error: &hibp_range_client::Error) {
        self.bar.suspend(|| tracing::warn!(%prefix, %error, "failed to query prefix"));
    }

    fn write_failed(&self, account: &str, error: &std::io::Error) {
        self.bar.suspend(|| tracing::warn!(account, %error, "failed to write result"));
    }

    fn finished(&self, summary: &PoolSummary) {
        self.bar.finish_and_clear();
        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            workers = summary.workers,
            "queried {} prefixes in {:?}",
            summary.total,
            summary.elapsed,
        );
    }
}
