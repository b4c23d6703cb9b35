//! Last-writer-wins bookkeeping for documents re-written under the same id.
//!
//! A table may contain several records for one `_id`; only the record with the
//! highest record index is live. Every earlier index is superseded and must not
//! be exported.

use std::collections::HashMap;

use roaring::RoaringTreemap;

/// Mutable index used while the profile segments are scanned.
#[derive(Debug, Default)]
pub struct DeletionIndexBuilder {
    latest: HashMap<String, u64>,
    superseded: RoaringTreemap,
}

impl DeletionIndexBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `id` was written at `record_index`.
    ///
    /// Record indices must be observed in increasing order.
    pub fn observe(&mut self, id: &str, record_index: u64) {
        match self.latest.get_mut(id) {
            Some(previous) => {
                debug_assert!(*previous < record_index);
                self.superseded.insert(*previous);
                *previous = record_index;
            }
            None => {
                self.latest.insert(id.to_owned(), record_index);
            }
        }
    }

    /// Freezes the index for the read-only phases of the run.
    #[must_use]
    pub fn freeze(self) -> DeletionIndex {
        DeletionIndex {
            latest: self.latest,
            superseded: self.superseded,
        }
    }
}

/// Frozen id → latest record index map plus the superseded set.
#[derive(Debug, Default, Clone)]
pub struct DeletionIndex {
    latest: HashMap<String, u64>,
    superseded: RoaringTreemap,
}

impl DeletionIndex {
    /// Whether the record at `record_index` was re-written later.
    #[must_use]
    pub fn is_superseded(&self, record_index: u64) -> bool {
        self.superseded.contains(record_index)
    }

    /// Latest record index bound to `id`.
    #[must_use]
    pub fn latest(&self, id: &str) -> Option<u64> {
        self.latest.get(id).copied()
    }

    /// Number of superseded records.
    #[must_use]
    pub fn superseded_count(&self) -> u64 {
        self.superseded.len()
    }

    /// Number of distinct ids.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.latest.len()
    }
}
