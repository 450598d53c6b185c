//! Heap object layout.
//!
//! A [`JsObject`] keeps named properties either in shape-described slots
//! or, after too many additions, a deletion or an attribute change, in a
//! private ordered dictionary. Indexed properties live in [`Elements`].
//! Class-specific state (array length, function code, buffers, ...) hangs
//! off [`ObjectClass`].
//!
//! Methods here are storage primitives only; the semantics that may run
//! script code or throw live on the runtime.

use indexmap::IndexMap;

use core_types::{ErrorKind, HeapRef, StackFrame, Value};

use crate::array::Elements;
use crate::collections::{OrderedTable, WeakMembers, WeakTable};
use crate::function::FunctionKind;
use crate::generator::GeneratorData;
use crate::property::{Property, PropertyFlags, PropertyKey, PropertyValue};
use crate::shape::{ShapeId, ShapeTable, MAX_SHAPED_PROPERTIES};
use crate::typed_array::TypedArrayData;

/// Named property storage.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyStorage {
    /// Layout described by a shared hidden class.
    Shaped {
        shape: ShapeId,
        slots: Vec<PropertyValue>,
    },
    /// Private insertion-ordered map.
    Dictionary(IndexMap<PropertyKey, Property>),
}

/// `arguments` entries still aliased to parameter slots of an environment.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedArguments {
    pub env: HeapRef,
    pub mapped: Vec<bool>,
}

impl MappedArguments {
    pub fn is_mapped(&self, index: u32) -> bool {
        self.mapped.get(index as usize).copied().unwrap_or(false)
    }

    pub fn unmap(&mut self, index: u32) {
        if let Some(m) = self.mapped.get_mut(index as usize) {
            *m = false;
        }
    }
}

/// Payload of error objects.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorData {
    pub kind: ErrorKind,
    /// Stack captured at construction, innermost first.
    pub frames: Vec<StackFrame>,
}

/// Per-class object state.
#[derive(Debug)]
pub enum ObjectClass {
    Ordinary,
    Array { length: u32, length_writable: bool },
    Function(FunctionKind),
    Error(ErrorData),
    Arguments(Option<MappedArguments>),
    /// Backing bytes; `None` once detached.
    ArrayBuffer(Option<Vec<u8>>),
    TypedArray(TypedArrayData),
    Generator(Box<GeneratorData>),
    /// `String`, `Number`, `Boolean`, `Symbol` and `BigInt` wrappers.
    Primitive(Value),
    Map(OrderedTable),
    Set(OrderedTable),
    WeakMap(WeakTable),
    WeakSet(WeakMembers),
    /// Target of a `WeakRef`; `None` once collected.
    WeakRef(Option<HeapRef>),
}

/// A script-visible object.
#[derive(Debug)]
pub struct JsObject {
    pub prototype: Option<HeapRef>,
    pub storage: PropertyStorage,
    pub elements: Elements,
    pub extensible: bool,
    pub class: ObjectClass,
}

impl JsObject {
    pub fn new(prototype: Option<HeapRef>, class: ObjectClass) -> Self {
        Self {
            prototype,
            storage: PropertyStorage::Shaped {
                shape: ShapeTable::ROOT,
                slots: Vec::new(),
            },
            elements: Elements::default(),
            extensible: true,
            class,
        }
    }

    pub fn ordinary(prototype: Option<HeapRef>) -> Self {
        Self::new(prototype, ObjectClass::Ordinary)
    }

    /// Current hidden class, or `None` in dictionary mode.
    #[inline]
    pub fn shape(&self) -> Option<ShapeId> {
        match &self.storage {
            PropertyStorage::Shaped { shape, .. } => Some(*shape),
            PropertyStorage::Dictionary(_) => None,
        }
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self.storage, PropertyStorage::Dictionary(_))
    }

    /// Slot contents for inline-cache hits.
    #[inline]
    pub fn slot(&self, slot: u32) -> Option<&PropertyValue> {
        match &self.storage {
            PropertyStorage::Shaped { slots, .. } => slots.get(slot as usize),
            PropertyStorage::Dictionary(_) => None,
        }
    }

    #[inline]
    pub fn slot_mut(&mut self, slot: u32) -> Option<&mut PropertyValue> {
        match &mut self.storage {
            PropertyStorage::Shaped { slots, .. } => slots.get_mut(slot as usize),
            PropertyStorage::Dictionary(_) => None,
        }
    }

    /// Own named property.
    pub fn get_named(&self, shapes: &ShapeTable, key: &PropertyKey) -> Option<Property> {
        match &self.storage {
            PropertyStorage::Shaped { shape, slots } => {
                let info = shapes.lookup(*shape, key)?;
                let value = slots.get(info.slot as usize)?.clone();
                Some(Property {
                    value,
                    flags: info.flags,
                })
            }
            PropertyStorage::Dictionary(map) => map.get(key).cloned(),
        }
    }

    pub fn has_named(&self, shapes: &ShapeTable, key: &PropertyKey) -> bool {
        match &self.storage {
            PropertyStorage::Shaped { shape, .. } => shapes.lookup(*shape, key).is_some(),
            PropertyStorage::Dictionary(map) => map.contains_key(key),
        }
    }

    /// Add a named property that does not exist yet.
    pub fn add_named(&mut self, shapes: &mut ShapeTable, key: PropertyKey, prop: Property) {
        if let PropertyStorage::Shaped { shape, .. } = &self.storage {
            if shapes.property_count(*shape) >= MAX_SHAPED_PROPERTIES {
                self.to_dictionary(shapes);
            }
        }
        match &mut self.storage {
            PropertyStorage::Shaped { shape, slots } => {
                *shape = shapes.add_property(*shape, key, prop.flags);
                slots.push(prop.value);
            }
            PropertyStorage::Dictionary(map) => {
                map.insert(key, prop);
            }
        }
    }

    /// Overwrite the value of an existing named property, keeping its
    /// attributes. Returns false if the property does not exist.
    pub fn write_named_value(
        &mut self,
        shapes: &ShapeTable,
        key: &PropertyKey,
        value: PropertyValue,
    ) -> bool {
        match &mut self.storage {
            PropertyStorage::Shaped { shape, slots } => {
                let Some(info) = shapes.lookup(*shape, key) else {
                    return false;
                };
                match slots.get_mut(info.slot as usize) {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None => false,
                }
            }
            PropertyStorage::Dictionary(map) => match map.get_mut(key) {
                Some(prop) => {
                    prop.value = value;
                    true
                }
                None => false,
            },
        }
    }

    /// Replace an existing named property, attributes included.
    ///
    /// Changing attributes leaves the shape tree.
    pub fn replace_named(&mut self, shapes: &mut ShapeTable, key: &PropertyKey, prop: Property) {
        if let PropertyStorage::Shaped { shape, .. } = &self.storage {
            match shapes.lookup(*shape, key) {
                Some(info) if info.flags == prop.flags => {
                    self.write_named_value(shapes, key, prop.value);
                    return;
                }
                Some(_) => self.to_dictionary(shapes),
                None => {
                    self.add_named(shapes, key.clone(), prop);
                    return;
                }
            }
        }
        if let PropertyStorage::Dictionary(map) = &mut self.storage {
            match map.get_mut(key) {
                Some(existing) => *existing = prop,
                None => {
                    map.insert(key.clone(), prop);
                }
            }
        }
    }

    /// Remove a named property, preserving the order of the rest.
    pub fn remove_named(&mut self, shapes: &ShapeTable, key: &PropertyKey) -> bool {
        if !self.has_named(shapes, key) {
            return false;
        }
        self.to_dictionary(shapes);
        match &mut self.storage {
            PropertyStorage::Dictionary(map) => map.shift_remove(key).is_some(),
            PropertyStorage::Shaped { .. } => false,
        }
    }

    /// Leave the shape tree.
    pub fn to_dictionary(&mut self, shapes: &ShapeTable) {
        let PropertyStorage::Shaped { shape, slots } = &mut self.storage else {
            return;
        };
        let layout = shapes.properties(*shape);
        let mut slots = std::mem::take(slots);
        let mut map = IndexMap::with_capacity(layout.len());
        for (key, info) in layout.iter() {
            let value = std::mem::replace(
                &mut slots[info.slot as usize],
                PropertyValue::Data(Value::Undefined),
            );
            map.insert(
                key.clone(),
                Property {
                    value,
                    flags: info.flags,
                },
            );
        }
        self.storage = PropertyStorage::Dictionary(map);
    }

    /// Own named keys with attributes, in insertion order.
    pub fn named_keys(&self, shapes: &ShapeTable) -> Vec<(PropertyKey, PropertyFlags)> {
        match &self.storage {
            PropertyStorage::Shaped { shape, .. } => shapes
                .properties(*shape)
                .iter()
                .map(|(k, info)| (k.clone(), info.flags))
                .collect(),
            PropertyStorage::Dictionary(map) => {
                map.iter().map(|(k, p)| (k.clone(), p.flags)).collect()
            }
        }
    }

    /// Apply `f` to the attributes of every named property.
    pub fn update_named_flags(
        &mut self,
        shapes: &ShapeTable,
        mut f: impl FnMut(&PropertyValue, &mut PropertyFlags),
    ) {
        self.to_dictionary(shapes);
        if let PropertyStorage::Dictionary(map) = &mut self.storage {
            for prop in map.values_mut() {
                f(&prop.value, &mut prop.flags);
            }
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.class, ObjectClass::Function(_))
    }

    pub fn is_constructor(&self) -> bool {
        match &self.class {
            ObjectClass::Function(kind) => kind.is_constructor(),
            _ => false,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.class, ObjectClass::Array { .. })
    }

    /// Array length, for arrays.
    pub fn array_length(&self) -> Option<u32> {
        match self.class {
            ObjectClass::Array { length, .. } => Some(length),
            _ => None,
        }
    }

    /// Label used by heap snapshots and `Object.prototype.toString`.
    pub fn class_name(&self) -> &'static str {
        match &self.class {
            ObjectClass::Ordinary => "Object",
            ObjectClass::Array { .. } => "Array",
            ObjectClass::Function(_) => "Function",
            ObjectClass::Error(_) => "Error",
            ObjectClass::Arguments(_) => "Arguments",
            ObjectClass::ArrayBuffer(_) => "ArrayBuffer",
            ObjectClass::TypedArray(t) => t.kind.name(),
            ObjectClass::Generator(_) => "Generator",
            ObjectClass::Map(_) => "Map",
            ObjectClass::Set(_) => "Set",
            ObjectClass::WeakMap(_) => "WeakMap",
            ObjectClass::WeakSet(_) => "WeakSet",
            ObjectClass::WeakRef(_) => "WeakRef",
            ObjectClass::Primitive(v) => match v {
                Value::String(_) => "String",
                Value::Number(_) => "Number",
                Value::Boolean(_) => "Boolean",
                Value::Symbol(_) => "Symbol",
                Value::BigInt(_) => "BigInt",
                _ => "Object",
            },
        }
    }

    /// Every value held by named and indexed properties.
    pub(crate) fn property_values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        let named: Box<dyn Iterator<Item = &Value> + '_> = match &self.storage {
            PropertyStorage::Shaped { slots, .. } => Box::new(slots.iter().flat_map(|s| s.values())),
            PropertyStorage::Dictionary(map) => {
                Box::new(map.values().flat_map(|p| p.value.values()))
            }
        };
        Box::new(named.chain(self.elements.values()))
    }

    pub(crate) fn named_len(&self) -> usize {
        match &self.storage {
            PropertyStorage::Shaped { slots, .. } => slots.len(),
            PropertyStorage::Dictionary(map) => map.len(),
        }
    }
}
