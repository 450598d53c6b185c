//! Remembered set for generational GC.
//!
//! When an old generation cell is handed out for mutation it may come to
//! reference a young cell. The heap records the holder here, and the next
//! scavenge treats every remembered holder as an extra root. Entries that no
//! longer point into the young generation are pruned after each scavenge.

use std::collections::BTreeSet;

/// Handle indices of old cells that may reference young cells.
///
/// Ordered so scavenges visit holders deterministically.
#[derive(Debug, Default, Clone)]
pub struct RememberedSet {
    holders: BTreeSet<u32>,
}

impl RememberedSet {
    /// Creates an empty remembered set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a holder. Returns true if it was not already present.
    pub fn add(&mut self, handle_index: u32) -> bool {
        self.holders.insert(handle_index)
    }

    pub fn remove(&mut self, handle_index: u32) {
        self.holders.remove(&handle_index);
    }

    pub fn contains(&self, handle_index: u32) -> bool {
        self.holders.contains(&handle_index)
    }

    pub fn clear(&mut self) {
        self.holders.clear();
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Snapshot of the holders, used as scavenge roots.
    pub fn as_roots(&self) -> Vec<u32> {
        self.holders.iter().copied().collect()
    }

    /// Keep only holders for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(u32) -> bool) {
        self.holders.retain(|h| keep(*h));
    }
}
