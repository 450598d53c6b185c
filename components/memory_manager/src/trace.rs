//! Edge enumeration for heap cells.
//!
//! Besides strong edges a cell may hold weak references, which the
//! collector never follows, and ephemerons: a `(key, value)` pair whose
//! value is only kept alive while the key is reachable by other means.

use core_types::{HeapRef, Value};

/// Implemented by every type stored in a [`crate::Heap`].
///
/// `trace` must report every heap handle the cell holds; a missed edge is a
/// use-after-free waiting to happen once the target is swept.
pub trait Trace {
    /// Report outgoing edges to `tracer`.
    fn trace(&self, tracer: &mut Tracer);

    /// Approximate retained size in bytes, used for heap accounting.
    fn size_hint(&self) -> usize {
        std::mem::size_of_val(self)
    }

    /// Short kind label for heap snapshots.
    fn kind_name(&self) -> &'static str {
        "cell"
    }

    /// True for cells holding weak references or ephemerons. The heap
    /// revisits them through [`Trace::clear_weak`] after every collection.
    fn holds_weak(&self) -> bool {
        false
    }

    /// Drop every weak reference and ephemeron whose target `is_live`
    /// rejects. Returns how many entries were removed.
    fn clear_weak(&mut self, _is_live: &dyn Fn(HeapRef) -> bool) -> usize {
        0
    }
}

/// Collects the edges reported by [`Trace::trace`].
#[derive(Debug, Default)]
pub struct Tracer {
    edges: Vec<HeapRef>,
    ephemerons: Vec<(HeapRef, HeapRef)>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edge.
    #[inline]
    pub fn visit(&mut self, r: HeapRef) {
        self.edges.push(r);
    }

    /// Record the edge carried by `value`, if any.
    #[inline]
    pub fn visit_value(&mut self, value: &Value) {
        if let Some(r) = value.heap_ref() {
            self.edges.push(r);
        }
    }

    /// Record an optional edge.
    #[inline]
    pub fn visit_opt(&mut self, r: Option<HeapRef>) {
        if let Some(r) = r {
            self.edges.push(r);
        }
    }

    /// Record an ephemeron: `value` is reachable only while `key` is.
    #[inline]
    pub fn visit_ephemeron(&mut self, key: HeapRef, value: &Value) {
        if let Some(v) = value.heap_ref() {
            self.ephemerons.push((key, v));
        }
    }

    /// Consume the tracer, returning every recorded strong edge.
    pub fn into_edges(self) -> Vec<HeapRef> {
        self.edges
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, HeapRef> {
        self.edges.drain(..)
    }

    pub(crate) fn edges(&self) -> &[HeapRef] {
        &self.edges
    }

    pub(crate) fn ephemerons(&self) -> &[(HeapRef, HeapRef)] {
        &self.ephemerons
    }

    pub(crate) fn take_ephemerons(&mut self) -> Vec<(HeapRef, HeapRef)> {
        std::mem::take(&mut self.ephemerons)
    }

    pub(crate) fn clear(&mut self) {
        self.edges.clear();
        self.ephemerons.clear();
    }
}

/// Strong edges of `cell`, collected into a fresh vector.
pub fn edges_of<C: Trace>(cell: &C) -> Vec<HeapRef> {
    let mut tracer = Tracer::new();
    cell.trace(&mut tracer);
    tracer.edges
}

/// Ephemeron pairs of `cell`.
pub fn ephemerons_of<C: Trace>(cell: &C) -> Vec<(HeapRef, HeapRef)> {
    let mut tracer = Tracer::new();
    cell.trace(&mut tracer);
    tracer.ephemerons
}
