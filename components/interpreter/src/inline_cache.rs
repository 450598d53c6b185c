//! Inline caching system for property access optimization
//!
//! Each `GetById` / `PutById` site owns one [`InlineCache`] mapping the
//! hidden classes it has seen to the slot holding the property. Sites that
//! see more than [`POLYMORPHIC_LIMIT`] shapes go megamorphic and always use
//! the generic lookup.

use arrayvec::ArrayVec;

use crate::shape::ShapeId;

/// Shapes tracked by a polymorphic site.
pub const POLYMORPHIC_LIMIT: usize = 4;

/// Inline cache for property access optimization
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InlineCache {
    /// No shape cached yet
    #[default]
    Uninitialized,
    /// Single shape cached (most common case)
    Monomorphic {
        /// The cached shape
        shape: ShapeId,
        /// Slot of the property under that shape
        slot: u32,
    },
    /// Several shapes cached
    Polymorphic {
        /// List of (shape, slot) pairs
        entries: ArrayVec<(ShapeId, u32), POLYMORPHIC_LIMIT>,
    },
    /// Too many shapes, always take the generic path
    Megamorphic,
}

impl InlineCache {
    /// Create a new uninitialized cache
    pub fn new() -> Self {
        InlineCache::Uninitialized
    }

    /// Slot for `shape`, if cached.
    #[inline]
    pub fn lookup(&self, shape: ShapeId) -> Option<u32> {
        match self {
            InlineCache::Monomorphic {
                shape: cached,
                slot,
            } if *cached == shape => Some(*slot),
            InlineCache::Polymorphic { entries } => entries
                .iter()
                .find(|(s, _)| *s == shape)
                .map(|(_, slot)| *slot),
            _ => None,
        }
    }

    /// Record that `shape` keeps the property in `slot`.
    ///
    /// Uninitialized → Monomorphic → Polymorphic → Megamorphic; a site
    /// never leaves the megamorphic state.
    pub fn update(&mut self, shape: ShapeId, slot: u32) {
        match self {
            InlineCache::Uninitialized => {
                *self = InlineCache::Monomorphic { shape, slot };
            }
            InlineCache::Monomorphic {
                shape: cached,
                slot: cached_slot,
            } => {
                if *cached == shape {
                    *cached_slot = slot;
                } else {
                    let mut entries = ArrayVec::new();
                    entries.push((*cached, *cached_slot));
                    entries.push((shape, slot));
                    *self = InlineCache::Polymorphic { entries };
                }
            }
            InlineCache::Polymorphic { entries } => {
                if let Some(entry) = entries.iter_mut().find(|(s, _)| *s == shape) {
                    entry.1 = slot;
                } else if entries.try_push((shape, slot)).is_err() {
                    *self = InlineCache::Megamorphic;
                }
            }
            InlineCache::Megamorphic => {}
        }
    }

    pub fn is_megamorphic(&self) -> bool {
        matches!(self, InlineCache::Megamorphic)
    }

    /// Short state label for diagnostics.
    pub fn state_name(&self) -> &'static str {
        match self {
            InlineCache::Uninitialized => "uninitialized",
            InlineCache::Monomorphic { .. } => "monomorphic",
            InlineCache::Polymorphic { .. } => "polymorphic",
            InlineCache::Megamorphic => "megamorphic",
        }
    }
}
