//! Drops records whose fingerprint was stored before or already seen this run.

use std::collections::HashSet;
use tracing::debug;
use trimport_core::{Transaction, TxnHash};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DedupOutcome {
    pub records: Vec<Transaction>,
    /// Hashes of `records`, for the caller to add to its known set.
    pub new_hashes: HashSet<TxnHash>,
    pub skipped_known: usize,
    pub skipped_repeats: usize,
}

/// Filters against a borrowed snapshot of stored hashes. The snapshot is
/// never written; hashes seen during the run are kept separately.
#[derive(Debug)]
pub struct Deduplicator<'k> {
    known: &'k HashSet<TxnHash>,
    seen: HashSet<TxnHash>,
}

impl<'k> Deduplicator<'k> {
    pub fn new(known: &'k HashSet<TxnHash>) -> Self {
        Self {
            known,
            seen: HashSet::new(),
        }
    }

    pub fn filter(&mut self, records: Vec<Transaction>) -> DedupOutcome {
        let mut outcome = DedupOutcome::default();
        for record in records {
            if self.known.contains(&record.txn_hash) {
                debug!(hash = %record.txn_hash, "already stored");
                outcome.skipped_known += 1;
            } else if !self.seen.insert(record.txn_hash.clone()) {
                debug!(hash = %record.txn_hash, "repeated within this run");
                outcome.skipped_repeats += 1;
            } else {
                outcome.new_hashes.insert(record.txn_hash.clone());
                outcome.records.push(record);
            }
        }
        outcome
    }

    /// Everything accepted so far, across all `filter` calls.
    pub fn seen(&self) -> &HashSet<TxnHash> {
        &self.seen
    }

    pub fn into_seen(self) -> HashSet<TxnHash> {
        self.seen
    }
}
