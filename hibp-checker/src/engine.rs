//! Matches range responses against the local hash index.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use compact_str::CompactString;
use hibp_range_client::Prefix;

use crate::index::HashIndex;
use crate::progress::Progress;
use crate::sink::ResultSink;

/// Shared by every worker. The index is read without locking; the exposure
/// set is only touched under its mutex, which makes check-and-set plus
/// emission atomic per matched hash.
pub struct MatchingEngine {
    index: Arc<HashIndex>,
    exposed: Mutex<HashSet<CompactString>>,
    sink: Arc<ResultSink>,
    progress: Arc<dyn Progress>,
}

impl MatchingEngine {
    pub fn new(index: Arc<HashIndex>, sink: Arc<ResultSink>, progress: Arc<dyn Progress>) -> Self {
        Self { index, exposed: Mutex::new(HashSet::new()), sink, progress }
    }

    pub fn index(&self) -> &HashIndex {
        &self.index
    }

    /// Processes one prefix's raw `SUFFIX:COUNT` body.
    ///
    /// Returns how many accounts became exposed because of it. Lines that do
    /// not split into suffix and count are ignored.
    pub fn match_response(&self, prefix: &Prefix, body: &str) -> usize {
        let mut full_hash = CompactString::with_capacity(prefix.as_str().len() + 40);
        let mut newly_exposed = 0;

        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((suffix, _count)) = line.split_once(':') else {
                continue;
            };

            full_hash.clear();
            full_hash.push_str(prefix.as_str());
            full_hash.extend(suffix.chars().map(|c| c.to_ascii_uppercase()));

            if let Some(accounts) = self.index.accounts(&full_hash) {
                newly_exposed += self.mark_exposed(accounts);
            }
        }

        newly_exposed
    }

    /// Marks accounts exposed, emitting each one the first time only.
    ///
    /// Check-and-set and the progress notification happen under the lock.
    /// Sink writes happen after it is released.
    fn mark_exposed(&self, accounts: &[CompactString]) -> usize {
        let mut added = Vec::new();
        {
            let mut exposed = self.lock_exposed();
            for account in accounts {
                if exposed.insert(account.clone()) {
                    self.progress.exposed(account);
                    added.push(account);
                }
            }
        }

        let count = added.len();
        for account in added {
            if let Err(e) = self.sink.write(account) {
                self.progress.write_failed(account, &e);
            }
        }

        count
    }

    pub fn exposed_count(&self) -> usize {
        self.lock_exposed().len()
    }

    pub fn is_exposed(&self, account: &str) -> bool {
        self.lock_exposed().contains(account)
    }

    /// Sorted snapshot of every exposed account.
    pub fn exposed_accounts(&self) -> Vec<CompactString> {
        let mut accounts: Vec<_> = self.lock_exposed().iter().cloned().collect();
        accounts.sort();
        accounts
    }

    // A panic while holding the lock cannot leave the set half-updated (one
    // insert at a time), so a poisoned lock is still safe to use.
    fn lock_exposed(&self) -> MutexGuard<'_, HashSet<CompactString>> {
        self.exposed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
