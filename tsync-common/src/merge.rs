//! Merge/replace reconciliation engine
//!
//! Takes the stored testimonials and a freshly scraped batch and produces a
//! deterministic, deduplicated, order-preserving result plus the positions
//! of the entries that are new in this run.
//!
//! The engine is pure: inputs are borrowed, never mutated, and the result is
//! a fresh copy. It performs no I/O and cannot fail.

use std::collections::HashSet;

use tracing::debug;

use crate::identity::Identity;
use crate::record::{Recommendation, Testimonial};

/// Reconciliation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Keep the stored collection and append unseen records
    #[default]
    Merge,
    /// Discard the stored collection and rebuild from the incoming batch
    Replace,
}

/// Result of a merge or replace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Reconciled collection, stored entries first in their original order
    pub merged: Vec<Testimonial>,
    /// Ascending indices into `merged` of the entries added by this run
    pub newly_added: Vec<usize>,
    /// Incoming records dropped because their identity was already present
    pub skipped_duplicates: usize,
    /// Incoming records dropped for a blank name or quote
    pub skipped_invalid: usize,
}

impl MergeOutcome {
    /// Whether this run added anything
    pub fn has_new_entries(&self) -> bool {
        !self.newly_added.is_empty()
    }

    /// The newly added entries, in the order they were appended
    pub fn new_entries(&self) -> impl Iterator<Item = &Testimonial> {
        self.newly_added.iter().map(move |&idx| &self.merged[idx])
    }

    /// Mutable access to exactly the newly added entries
    ///
    /// Enrichment (avatar upload, translation) writes through these
    /// references so changes land in `merged` before it is persisted.
    pub fn new_entries_mut(&mut self) -> impl Iterator<Item = &mut Testimonial> {
        let added = &self.newly_added;
        self.merged
            .iter_mut()
            .enumerate()
            .filter_map(move |(idx, entry)| added.binary_search(&idx).ok().map(|_| entry))
    }

    /// Append unseen incoming records, tracking identities in `seen`
    fn absorb(&mut self, seen: &mut HashSet<String>, incoming: &[Recommendation]) {
        for rec in incoming {
            if !rec.is_valid() {
                self.skipped_invalid += 1;
                continue;
            }

            // insert() is false when the key came from history or from an
            // earlier record of this same batch; first occurrence wins
            if !seen.insert(rec.identity_key()) {
                self.skipped_duplicates += 1;
                continue;
            }

            self.newly_added.push(self.merged.len());
            self.merged.push(Testimonial::from(rec));
        }
    }
}

/// Merge a scraped batch into the stored collection
///
/// **Algorithm:**
/// 1. Index the identity keys of `existing`
/// 2. Copy `existing` into the result, order untouched
/// 3. Walk `incoming` in order; skip invalid records and any record whose
///    key is already indexed (history or earlier in this batch)
/// 4. Append the rest, recording each appended index as newly added
///
/// Guarantees `merged.len() == existing.len() + newly_added.len()`, that
/// `merged` starts with `existing` verbatim, and that no two entries of
/// `merged` share an identity key as long as `existing` had none.
pub fn merge(existing: &[Testimonial], incoming: &[Recommendation]) -> MergeOutcome {
    let mut seen: HashSet<String> = existing.iter().map(Identity::identity_key).collect();

    let mut outcome = MergeOutcome {
        merged: Vec::with_capacity(existing.len() + incoming.len()),
        ..Default::default()
    };
    outcome.merged.extend_from_slice(existing);
    outcome.absorb(&mut seen, incoming);

    debug!(
        existing = existing.len(),
        incoming = incoming.len(),
        added = outcome.newly_added.len(),
        duplicates = outcome.skipped_duplicates,
        invalid = outcome.skipped_invalid,
        "Merged scraped batch"
    );

    outcome
}

/// Rebuild the collection from the scraped batch alone
///
/// Stored history is discarded, but the identity invariant still holds:
/// duplicates within the batch collapse to their first occurrence. Every
/// surviving entry counts as newly added.
pub fn replace(incoming: &[Recommendation]) -> MergeOutcome {
    let mut seen = HashSet::with_capacity(incoming.len());
    let mut outcome = MergeOutcome {
        merged: Vec::with_capacity(incoming.len()),
        ..Default::default()
    };
    outcome.absorb(&mut seen, incoming);

    debug!(
        incoming = incoming.len(),
        kept = outcome.merged.len(),
        duplicates = outcome.skipped_duplicates,
        invalid = outcome.skipped_invalid,
        "Replaced collection from scraped batch"
    );

    outcome
}

/// Dispatch on the reconciliation policy
pub fn reconcile(
    mode: SyncMode,
    existing: &[Testimonial],
    incoming: &[Recommendation],
) -> MergeOutcome {
    match mode {
        SyncMode::Merge => merge(existing, incoming),
        SyncMode::Replace => replace(incoming),
    }
}
