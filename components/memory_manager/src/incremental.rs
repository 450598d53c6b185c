//! Incremental marking state.
//!
//! Marking work is split into bounded steps run at mutator safepoints.
//! Objects are classified into three colors:
//! - **White**: Not yet visited (potentially garbage)
//! - **Gray**: Visited but children not yet scanned (on the mark stack)
//! - **Black**: Fully processed
//!
//! The mutator may store into a black cell between steps. The heap's write
//! barrier turns such a cell gray again and pushes it here, and cells born
//! during marking start gray, so no black cell can hide a white one when
//! marking finishes. Roots are rescanned at finish.

use crate::gc::GcPhase;

/// Gray cells awaiting a scan, by handle index.
#[derive(Debug, Default)]
pub struct MarkStack {
    stack: Vec<u32>,
}

impl MarkStack {
    pub fn push(&mut self, handle_index: u32) {
        self.stack.push(handle_index);
    }

    pub fn pop(&mut self) -> Option<u32> {
        self.stack.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

/// Statistics for one marking cycle.
#[derive(Debug, Default, Clone)]
pub struct IncrementalStats {
    /// Number of marking increments performed
    pub increments: usize,
    /// Total cells blackened
    pub cells_marked: usize,
    /// Cells re-greyed by the write barrier
    pub barrier_regreys: usize,
}

/// Phase plus mark stack for the incremental marker.
#[derive(Debug, Default)]
pub struct IncrementalMarker {
    phase: GcPhase,
    mark_stack: MarkStack,
    stats: IncrementalStats,
}

impl IncrementalMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the marking phase with an empty stack.
    pub fn begin(&mut self) {
        self.phase = GcPhase::Marking;
        self.mark_stack.clear();
        self.stats = IncrementalStats::default();
    }

    /// Leave the marking phase.
    pub fn end(&mut self) -> IncrementalStats {
        self.phase = GcPhase::Idle;
        self.mark_stack.clear();
        std::mem::take(&mut self.stats)
    }

    pub fn phase(&self) -> GcPhase {
        self.phase
    }

    pub fn is_marking(&self) -> bool {
        self.phase == GcPhase::Marking
    }

    pub fn mark_stack(&mut self) -> &mut MarkStack {
        &mut self.mark_stack
    }

    pub fn stats(&self) -> &IncrementalStats {
        &self.stats
    }

    pub(crate) fn note_increment(&mut self, marked: usize) {
        self.stats.increments += 1;
        self.stats.cells_marked += marked;
    }

    pub(crate) fn note_regrey(&mut self, handle_index: u32) {
        self.stats.barrier_regreys += 1;
        self.mark_stack.push(handle_index);
    }
}
