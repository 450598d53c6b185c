//! Collector vocabulary: colors, collection kinds, configuration and stats.

use serde::Serialize;
use thiserror::Error;

/// Mark colors for tri-color marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MarkColor {
    /// Unmarked (not yet visited)
    White = 0,
    /// In process (reachable, needs scanning)
    Gray = 1,
    /// Fully processed (reachable, all references scanned)
    Black = 2,
}

/// Which collector to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CollectionKind {
    /// Scavenge the young generation only.
    Young,
    /// Mark the whole heap, sweep both generations, maybe compact.
    Full,
}

/// Phase of the old-generation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GcPhase {
    /// No marking in progress.
    #[default]
    Idle,
    /// Incremental marking in progress; the write barrier re-greys holders.
    Marking,
}

/// Allocation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("heap limit of {limit} bytes exceeded (in use {in_use}, requested {requested})")]
    HeapLimit {
        requested: usize,
        in_use: usize,
        limit: usize,
    },
    #[error("handle table exhausted")]
    HandlesExhausted,
}

/// Heap tuning knobs.
///
/// ```
/// use memory_manager::HeapConfig;
///
/// let config = HeapConfig::default()
///     .with_young_capacity(64 * 1024)
///     .with_max_heap(16 * 1024 * 1024)
///     .with_incremental(true);
/// assert_eq!(config.young_capacity, 64 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Bytes allocated in the young generation before a scavenge is requested.
    pub young_capacity: usize,
    /// Scavenges a cell must survive before promotion.
    pub promotion_age: u8,
    /// Old-generation bytes that trigger the first full collection.
    pub old_trigger: usize,
    /// Next trigger is `live_old_bytes * growth_factor` after a full collection.
    pub growth_factor: f64,
    /// Hard limit on total heap bytes.
    pub max_heap: usize,
    /// Cells at least this large are allocated directly in the old generation.
    pub large_object_threshold: usize,
    /// Fraction of free old slots above which the old generation is compacted.
    pub compaction_threshold: f64,
    /// Old spaces smaller than this are never compacted.
    pub compaction_min_slots: usize,
    /// Mark the old generation in steps at safepoints instead of all at once.
    pub incremental: bool,
    /// Cells blackened per incremental step.
    pub mark_step_budget: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            young_capacity: 1024 * 1024,
            promotion_age: 2,
            old_trigger: 8 * 1024 * 1024,
            growth_factor: 2.0,
            max_heap: 512 * 1024 * 1024,
            large_object_threshold: 32 * 1024,
            compaction_threshold: 0.5,
            compaction_min_slots: 64,
            incremental: false,
            mark_step_budget: 512,
        }
    }
}

impl HeapConfig {
    pub fn with_young_capacity(mut self, bytes: usize) -> Self {
        self.young_capacity = bytes.max(1);
        self
    }

    pub fn with_promotion_age(mut self, age: u8) -> Self {
        self.promotion_age = age.max(1);
        self
    }

    pub fn with_old_trigger(mut self, bytes: usize) -> Self {
        self.old_trigger = bytes;
        self
    }

    pub fn with_max_heap(mut self, bytes: usize) -> Self {
        self.max_heap = bytes;
        self
    }

    pub fn with_large_object_threshold(mut self, bytes: usize) -> Self {
        self.large_object_threshold = bytes;
        self
    }

    pub fn with_compaction_threshold(mut self, fraction: f64, min_slots: usize) -> Self {
        self.compaction_threshold = fraction;
        self.compaction_min_slots = min_slots;
        self
    }

    pub fn with_incremental(mut self, enabled: bool) -> Self {
        self.incremental = enabled;
        self
    }

    pub fn with_mark_step_budget(mut self, cells: usize) -> Self {
        self.mark_step_budget = cells.max(1);
        self
    }
}

/// Running totals kept by the heap.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct GcStats {
    pub young_collections: usize,
    pub full_collections: usize,
    pub compactions: usize,
    pub incremental_steps: usize,
    pub allocated_cells: usize,
    pub promoted_cells: usize,
    pub freed_cells: usize,
    pub pretenured_cells: usize,
    /// Weak references and ephemerons dropped because their target died.
    pub cleared_weak: usize,
    pub live_cells: usize,
    pub young_bytes: usize,
    pub old_bytes: usize,
    pub total_pause_us: u64,
    pub max_pause_us: u64,
}

impl GcStats {
    /// Total collections of either kind.
    pub fn collections(&self) -> usize {
        self.young_collections + self.full_collections
    }

    pub(crate) fn record_pause(&mut self, micros: u64) {
        self.total_pause_us += micros;
        self.max_pause_us = self.max_pause_us.max(micros);
    }
}
