//! Memory Manager - Garbage collector and heap management
//!
//! This component provides:
//! - A handle-table heap whose handles survive moving collections
//! - Generational garbage collection (young scavenge + old mark-sweep-compact)
//! - Incremental old-generation marking driven from mutator safepoints
//! - Write barriers for remembered set maintenance
//! - Weak references and ephemerons, cleared after each collection
//! - Heap snapshots for tooling

pub mod gc;
pub mod heap;
pub mod incremental;
pub mod snapshot;
pub mod trace;
pub mod write_barrier;

// Re-export main types
pub use gc::{AllocError, CollectionKind, GcPhase, GcStats, HeapConfig, MarkColor};
pub use heap::{Heap, Space};
pub use incremental::{IncrementalMarker, IncrementalStats, MarkStack};
pub use snapshot::{CellSnapshot, HeapSnapshot};
pub use trace::{edges_of, ephemerons_of, Trace, Tracer};
pub use write_barrier::RememberedSet;
