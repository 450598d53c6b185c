//! Hidden classes: shared property layouts with transition trees.
//!
//! Every shaped object points at a [`ShapeId`] describing which keys it has
//! and where their values live in its slot vector. Adding a property moves
//! the object along a transition edge; edges are cached on the parent
//! shape, so two objects that add the same keys in the same order with the
//! same attributes end up on the very same shape. Shapes are immutable once
//! created and live for the lifetime of the runtime.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::property::{PropertyFlags, PropertyKey};

/// Objects with more named properties than this switch to dictionary mode.
pub const MAX_SHAPED_PROPERTIES: usize = 64;

/// Index of a shape in the [`ShapeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

/// Where a property lives for a given shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot: u32,
    pub flags: PropertyFlags,
}

#[derive(Debug)]
struct HiddenClass {
    properties: Rc<IndexMap<PropertyKey, SlotInfo>>,
    transitions: HashMap<(PropertyKey, PropertyFlags), ShapeId>,
}

/// Arena of hidden classes.
///
/// ```
/// use interpreter::{PropertyFlags, PropertyKey, ShapeTable};
///
/// let mut shapes = ShapeTable::new();
/// let a = shapes.add_property(ShapeTable::ROOT, PropertyKey::from("x"), PropertyFlags::DEFAULT);
/// let b = shapes.add_property(ShapeTable::ROOT, PropertyKey::from("x"), PropertyFlags::DEFAULT);
/// assert_eq!(a, b);
/// assert_eq!(shapes.lookup(a, &PropertyKey::from("x")).map(|s| s.slot), Some(0));
/// ```
#[derive(Debug)]
pub struct ShapeTable {
    classes: Vec<HiddenClass>,
}

impl ShapeTable {
    /// The empty shape every new object starts from.
    pub const ROOT: ShapeId = ShapeId(0);

    pub fn new() -> Self {
        Self {
            classes: vec![HiddenClass {
                properties: Rc::new(IndexMap::new()),
                transitions: HashMap::new(),
            }],
        }
    }

    fn class(&self, shape: ShapeId) -> &HiddenClass {
        // ShapeIds are only minted by this table
        &self.classes[shape.0 as usize]
    }

    /// Slot and attributes of `key` under `shape`.
    #[inline]
    pub fn lookup(&self, shape: ShapeId, key: &PropertyKey) -> Option<SlotInfo> {
        self.class(shape).properties.get(key).copied()
    }

    /// Follow (or create) the transition adding `key` with `flags`.
    ///
    /// The new property takes the next free slot.
    pub fn add_property(
        &mut self,
        shape: ShapeId,
        key: PropertyKey,
        flags: PropertyFlags,
    ) -> ShapeId {
        let edge = (key, flags);
        if let Some(next) = self.class(shape).transitions.get(&edge) {
            return *next;
        }
        let parent = self.class(shape);
        let mut properties = (*parent.properties).clone();
        let slot = properties.len() as u32;
        properties.insert(edge.0.clone(), SlotInfo { slot, flags });
        let id = ShapeId(self.classes.len() as u32);
        self.classes.push(HiddenClass {
            properties: Rc::new(properties),
            transitions: HashMap::new(),
        });
        self.classes[shape.0 as usize].transitions.insert(edge, id);
        id
    }

    /// Named properties of `shape` in insertion order.
    pub fn properties(&self, shape: ShapeId) -> Rc<IndexMap<PropertyKey, SlotInfo>> {
        self.class(shape).properties.clone()
    }

    pub fn property_count(&self, shape: ShapeId) -> usize {
        self.class(shape).properties.len()
    }

    /// Number of shapes created so far.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ShapeTable {
    fn default() -> Self {
        Self::new()
    }
}
