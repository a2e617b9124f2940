//! Groups accounts by hash and derives the distinct set of range query prefixes.
//!
//! The index is built once, single-threaded, then shared read-only between
//! all workers (behind an `Arc`, no lock).

use std::collections::{HashMap, HashSet};

use compact_str::CompactString;
use hibp_range_client::{PREFIX_LEN, Prefix};

use crate::loader::Record;

/// Trailing marker of a computer account in an Active Directory export.
pub const MACHINE_ACCOUNT_MARKER: char = '$';

#[inline]
pub fn is_machine_account(account: &str) -> bool {
    account.ends_with(MACHINE_ACCOUNT_MARKER)
}

/// Trims and uppercases a hash, returning it with its query prefix.
///
/// `None` if the hash is too short to yield a prefix.
pub fn normalize_hash(hash: &str) -> Option<(CompactString, Prefix)> {
    let hash = hash.trim();
    if hash.len() < PREFIX_LEN {
        return None;
    }
    let prefix = Prefix::from_hash(hash)?;
    Some((CompactString::from(hash.to_ascii_uppercase()), prefix))
}

/// Why records were left out of the index.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkipCounts {
    pub machine: usize,
    pub empty: usize,
    pub short: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.machine + self.empty + self.short
    }
}

#[derive(Debug, Default)]
pub struct HashIndex {
    by_hash: HashMap<CompactString, Vec<CompactString>>,
    prefixes: Vec<Prefix>,
    accounts: usize,
    skipped: SkipCounts,
}

impl HashIndex {
    pub fn build(records: &[Record]) -> Self {
        let mut index = Self::default();
        let mut seen = HashSet::new();

        for record in records {
            if is_machine_account(&record.account) {
                index.skipped.machine += 1;
                continue;
            }
            if record.hash.trim().is_empty() {
                index.skipped.empty += 1;
                continue;
            }
            let Some((hash, prefix)) = normalize_hash(&record.hash) else {
                index.skipped.short += 1;
                continue;
            };

            index.by_hash.entry(hash).or_default().push(record.account.clone());
            index.accounts += 1;

            if seen.insert(prefix) {
                index.prefixes.push(prefix);
            }
        }

        index
    }

    /// Accounts whose normalized hash is exactly `full_hash`.
    #[inline]
    pub fn accounts(&self, full_hash: &str) -> Option<&[CompactString]> {
        self.by_hash.get(full_hash).map(Vec::as_slice)
    }

    /// Distinct prefixes in first-seen order.
    pub fn prefixes(&self) -> &[Prefix] {
        &self.prefixes
    }

    /// Number of distinct hashes.
    pub fn hash_count(&self) -> usize {
        self.by_hash.len()
    }

    /// Number of indexed records (accounts sharing a hash are counted each).
    pub fn account_count(&self) -> usize {
        self.accounts
    }

    pub fn skipped(&self) -> SkipCounts {
        self.skipped
    }

    /// Number of distinct hashes whose length differs from `expected`.
    pub fn unexpected_length_count(&self, expected: usize) -> usize {
        self.by_hash.keys().filter(|h| h.len() != expected).count()
    }
}
