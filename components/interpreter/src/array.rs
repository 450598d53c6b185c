//! Indexed element storage.
//!
//! Elements start out in a [`SegmentedArray`]: a contiguous inline vector
//! for small arrays, then a spine of fixed-size segments so that growing
//! or truncating a large array never moves existing elements. A write far
//! beyond the end switches the object to sparse storage.

use std::collections::BTreeMap;

use core_types::Value;

use crate::property::{Property, PropertyFlags};

/// Elements per segment once the inline part is full.
pub const SEGMENT_SIZE: usize = 1024;
/// Elements kept inline before segmenting.
pub const INLINE_CAPACITY: usize = 4 * SEGMENT_SIZE;
/// Writes leaving a gap larger than this go sparse.
pub const SPARSE_GAP: usize = 1 << 14;

/// Dense element storage with holes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentedArray {
    inline: Vec<Option<Value>>,
    segments: Vec<Box<[Option<Value>]>>,
    len: usize,
}

impl SegmentedArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inline: Vec::with_capacity(capacity.min(INLINE_CAPACITY)),
            segments: Vec::new(),
            len: 0,
        }
    }

    /// Storage length, holes included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn locate(index: usize) -> (usize, usize) {
        let rest = index - INLINE_CAPACITY;
        (rest / SEGMENT_SIZE, rest % SEGMENT_SIZE)
    }

    /// Element at `index`; `None` for holes and out-of-range indices.
    pub fn get(&self, index: usize) -> Option<&Value> {
        if index >= self.len {
            return None;
        }
        if index < INLINE_CAPACITY {
            return self.inline.get(index)?.as_ref();
        }
        let (seg, off) = Self::locate(index);
        self.segments.get(seg)?.get(off)?.as_ref()
    }

    /// Store `value` at `index`, growing storage as needed.
    pub fn set(&mut self, index: usize, value: Value) {
        if index >= self.len {
            self.grow(index + 1);
        }
        if index < INLINE_CAPACITY {
            self.inline[index] = Some(value);
        } else {
            let (seg, off) = Self::locate(index);
            self.segments[seg][off] = Some(value);
        }
    }

    /// Turn `index` into a hole.
    pub fn remove(&mut self, index: usize) {
        if index >= self.len {
            return;
        }
        if index < INLINE_CAPACITY {
            self.inline[index] = None;
        } else {
            let (seg, off) = Self::locate(index);
            self.segments[seg][off] = None;
        }
    }

    fn grow(&mut self, new_len: usize) {
        let inline_len = new_len.min(INLINE_CAPACITY);
        if self.inline.len() < inline_len {
            self.inline.resize(inline_len, None);
        }
        if new_len > INLINE_CAPACITY {
            let needed = (new_len - INLINE_CAPACITY).div_ceil(SEGMENT_SIZE);
            while self.segments.len() < needed {
                self.segments
                    .push(vec![None; SEGMENT_SIZE].into_boxed_slice());
            }
        }
        self.len = new_len;
    }

    /// Drop every element at or beyond `new_len`, freeing whole segments.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        if new_len <= INLINE_CAPACITY {
            self.segments.clear();
            self.inline.truncate(new_len);
        } else {
            let keep = (new_len - INLINE_CAPACITY).div_ceil(SEGMENT_SIZE);
            self.segments.truncate(keep);
            let (seg, off) = Self::locate(new_len);
            if let Some(last) = self.segments.get_mut(seg) {
                for slot in last[off..].iter_mut() {
                    *slot = None;
                }
            }
        }
        self.len = new_len;
    }

    /// Present elements in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Value)> + '_ {
        let inline = self
            .inline
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (i as u32, v)));
        let segmented = self.segments.iter().enumerate().flat_map(|(s, seg)| {
            seg.iter().enumerate().filter_map(move |(o, v)| {
                let index = INLINE_CAPACITY + s * SEGMENT_SIZE + o;
                v.as_ref().map(|v| (index as u32, v))
            })
        });
        inline.chain(segmented).take_while(move |(i, _)| (*i as usize) < self.len)
    }

    /// Number of present elements.
    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

/// Element storage of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum Elements {
    /// Default attributes on every element.
    Dense(SegmentedArray),
    /// Ordered map; also used once any element has non-default attributes.
    Sparse(BTreeMap<u32, Property>),
}

impl Default for Elements {
    fn default() -> Self {
        Elements::Dense(SegmentedArray::new())
    }
}

impl Elements {
    pub fn get(&self, index: u32) -> Option<Property> {
        match self {
            Elements::Dense(a) => a
                .get(index as usize)
                .map(|v| Property::data(v.clone(), PropertyFlags::DEFAULT)),
            Elements::Sparse(m) => m.get(&index).cloned(),
        }
    }

    pub fn contains(&self, index: u32) -> bool {
        match self {
            Elements::Dense(a) => a.get(index as usize).is_some(),
            Elements::Sparse(m) => m.contains_key(&index),
        }
    }

    /// Store a plain element, switching to sparse if the gap is too large.
    pub fn set_value(&mut self, index: u32, value: Value) {
        match self {
            Elements::Dense(a) => {
                let i = index as usize;
                if i > a.len() + SPARSE_GAP {
                    self.make_sparse();
                    self.set_value(index, value);
                } else {
                    a.set(i, value);
                }
            }
            Elements::Sparse(m) => match m.get_mut(&index) {
                Some(prop) => prop.value = crate::property::PropertyValue::Data(value),
                None => {
                    m.insert(index, Property::data(value, PropertyFlags::DEFAULT));
                }
            },
        }
    }

    /// Store an element with arbitrary attributes.
    pub fn set_property(&mut self, index: u32, prop: Property) {
        if prop.flags == PropertyFlags::DEFAULT && !prop.is_accessor() {
            if let crate::property::PropertyValue::Data(v) = prop.value {
                self.set_value(index, v);
                return;
            }
        }
        self.make_sparse();
        if let Elements::Sparse(m) = self {
            m.insert(index, prop);
        }
    }

    pub fn remove(&mut self, index: u32) {
        match self {
            Elements::Dense(a) => a.remove(index as usize),
            Elements::Sparse(m) => {
                m.remove(&index);
            }
        }
    }

    /// Convert to sparse storage (idempotent).
    pub fn make_sparse(&mut self) {
        if let Elements::Dense(a) = self {
            let map = a
                .iter()
                .map(|(i, v)| (i, Property::data(v.clone(), PropertyFlags::DEFAULT)))
                .collect();
            *self = Elements::Sparse(map);
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Elements::Sparse(_))
    }

    /// Present indices in ascending order.
    pub fn indices(&self) -> Vec<u32> {
        match self {
            Elements::Dense(a) => a.iter().map(|(i, _)| i).collect(),
            Elements::Sparse(m) => m.keys().copied().collect(),
        }
    }

    /// Highest present index.
    pub fn last_index(&self) -> Option<u32> {
        match self {
            Elements::Dense(a) => a.iter().map(|(i, _)| i).last(),
            Elements::Sparse(m) => m.keys().next_back().copied(),
        }
    }

    /// Remove indices `>= new_len` from the top down. Stops at the first
    /// non-configurable element and returns the length actually reached.
    pub fn truncate(&mut self, new_len: u32) -> u32 {
        match self {
            Elements::Dense(a) => {
                a.truncate(new_len as usize);
                new_len
            }
            Elements::Sparse(m) => {
                let doomed: Vec<u32> = m.range(new_len..).map(|(i, _)| *i).rev().collect();
                for i in doomed {
                    let configurable = m.get(&i).map_or(true, |p| p.flags.configurable);
                    if !configurable {
                        return i + 1;
                    }
                    m.remove(&i);
                }
                new_len
            }
        }
    }

    pub(crate) fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Elements::Dense(a) => Box::new(a.iter().map(|(_, v)| v)),
            Elements::Sparse(m) => Box::new(m.values().flat_map(|p| p.value.values())),
        }
    }

    pub(crate) fn approx_len(&self) -> usize {
        match self {
            Elements::Dense(a) => a.len(),
            Elements::Sparse(m) => m.len(),
        }
    }
}
