//! Keyed collection storage for `Map`, `Set` and the weak collections.
//!
//! Keys compare with SameValueZero. Every entry carries a serial number
//! that only grows, so an iterator resumes after the last serial it
//! returned: deleted entries are skipped and entries added during
//! iteration are still visited.

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;

use core_types::{HeapRef, SymbolId, Value};
use memory_manager::Tracer;

use crate::error::JsResult;
use crate::object::{JsObject, ObjectClass};
use crate::runtime::Runtime;

/// A [`Value`] hashed and compared by SameValueZero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Undefined,
    Null,
    Boolean(bool),
    /// Bits of the number; `-0` is stored as `+0` and every NaN alike.
    Number(u64),
    String(Rc<str>),
    Symbol(SymbolId),
    BigInt(Rc<BigInt>),
    Object(HeapRef),
}

impl MapKey {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Undefined => MapKey::Undefined,
            Value::Null => MapKey::Null,
            Value::Boolean(b) => MapKey::Boolean(*b),
            Value::Number(n) => MapKey::Number(normalize(*n).to_bits()),
            Value::String(s) => MapKey::String(Rc::clone(s)),
            Value::Symbol(id) => MapKey::Symbol(*id),
            Value::BigInt(b) => MapKey::BigInt(Rc::clone(b)),
            Value::Object(r) | Value::Environment(r) => MapKey::Object(*r),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Undefined => Value::Undefined,
            MapKey::Null => Value::Null,
            MapKey::Boolean(b) => Value::Boolean(*b),
            MapKey::Number(bits) => Value::Number(f64::from_bits(*bits)),
            MapKey::String(s) => Value::String(Rc::clone(s)),
            MapKey::Symbol(id) => Value::Symbol(*id),
            MapKey::BigInt(b) => Value::BigInt(Rc::clone(b)),
            MapKey::Object(r) => Value::Object(*r),
        }
    }
}

fn normalize(n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else if n.is_nan() {
        f64::NAN
    } else {
        n
    }
}

#[derive(Debug, Clone)]
struct TableEntry {
    serial: u64,
    value: Value,
}

/// Insertion-ordered entries of a `Map` or `Set`.
///
/// Sets store `undefined` as every value.
#[derive(Debug, Clone, Default)]
pub struct OrderedTable {
    entries: IndexMap<MapKey, TableEntry>,
    next_serial: u64,
}

impl OrderedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(&MapKey::from_value(key)).map(|e| &e.value)
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.entries.contains_key(&MapKey::from_value(key))
    }

    /// Set `key` to `value`. An existing key keeps its position.
    pub fn insert(&mut self, key: &Value, value: Value) {
        let key = MapKey::from_value(key);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            return;
        }
        let serial = self.next_serial;
        self.next_serial += 1;
        self.entries.insert(key, TableEntry { serial, value });
    }

    pub fn remove(&mut self, key: &Value) -> bool {
        self.entries.shift_remove(&MapKey::from_value(key)).is_some()
    }

    /// Remove every entry. Serials keep counting, so open iterators see
    /// only entries added afterwards.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The first entry added after serial `after` (from the start when
    /// `None`), as `(serial, key, value)`.
    pub fn next_after(&self, after: Option<u64>) -> Option<(u64, Value, Value)> {
        let start = match after {
            None => 0,
            Some(serial) => {
                // serials increase with position
                let (mut lo, mut hi) = (0, self.entries.len());
                while lo < hi {
                    let mid = lo + (hi - lo) / 2;
                    match self.entries.get_index(mid) {
                        Some((_, e)) if e.serial <= serial => lo = mid + 1,
                        _ => hi = mid,
                    }
                }
                lo
            }
        };
        self.entries
            .get_index(start)
            .map(|(k, e)| (e.serial, k.to_value(), e.value.clone()))
    }

    pub fn keys(&self) -> impl Iterator<Item = Value> + '_ {
        self.entries.keys().map(MapKey::to_value)
    }

    pub(crate) fn trace(&self, tracer: &mut Tracer) {
        for (key, entry) in &self.entries {
            if let MapKey::Object(r) = key {
                tracer.visit(*r);
            }
            tracer.visit_value(&entry.value);
        }
    }
}

/// Entries of a `WeakMap`; each value lives only as long as its key.
pub type WeakTable = IndexMap<HeapRef, Value>;

/// Members of a `WeakSet`.
pub type WeakMembers = IndexSet<HeapRef>;

impl Runtime {
    fn alloc_with_class(&mut self, proto: HeapRef, class: ObjectClass) -> JsResult<HeapRef> {
        self.alloc_object(JsObject::new(Some(proto), class))
    }

    pub fn new_map(&mut self) -> JsResult<HeapRef> {
        let proto = self.intrinsics.map_prototype;
        self.alloc_with_class(proto, ObjectClass::Map(OrderedTable::new()))
    }

    pub fn new_set(&mut self) -> JsResult<HeapRef> {
        let proto = self.intrinsics.set_prototype;
        self.alloc_with_class(proto, ObjectClass::Set(OrderedTable::new()))
    }

    pub fn new_weak_map(&mut self) -> JsResult<HeapRef> {
        let proto = self.intrinsics.weak_map_prototype;
        self.alloc_with_class(proto, ObjectClass::WeakMap(WeakTable::new()))
    }

    pub fn new_weak_set(&mut self) -> JsResult<HeapRef> {
        let proto = self.intrinsics.weak_set_prototype;
        self.alloc_with_class(proto, ObjectClass::WeakSet(WeakMembers::new()))
    }

    /// A `WeakRef` to `target`. The target is not kept alive by it.
    pub fn new_weak_ref(&mut self, target: HeapRef) -> JsResult<HeapRef> {
        let proto = self.intrinsics.weak_ref_prototype;
        self.alloc_with_class(proto, ObjectClass::WeakRef(Some(target)))
    }

    /// Entries of a `Map` or `Set`; `None` for other objects.
    pub fn ordered_table(&self, r: HeapRef) -> JsResult<Option<&OrderedTable>> {
        Ok(match &self.object(r)?.class {
            ObjectClass::Map(table) | ObjectClass::Set(table) => Some(table),
            _ => None,
        })
    }

    /// Apply `update` to the entries of a `Map` or `Set`, re-accounting the
    /// cell when it grew. Returns `None` for other objects.
    pub fn update_ordered_table<T>(
        &mut self,
        r: HeapRef,
        update: impl FnOnce(&mut OrderedTable) -> T,
    ) -> JsResult<Option<T>> {
        let (out, grew) = match &mut self.object_mut(r)?.class {
            ObjectClass::Map(table) | ObjectClass::Set(table) => {
                let before = table.len();
                let out = update(table);
                (out, table.len() > before)
            }
            _ => return Ok(None),
        };
        if grew {
            self.note_resize(r)?;
        }
        Ok(Some(out))
    }

    /// Apply `update` to the entries of a `WeakMap`.
    pub fn update_weak_table<T>(
        &mut self,
        r: HeapRef,
        update: impl FnOnce(&mut WeakTable) -> T,
    ) -> JsResult<Option<T>> {
        let (out, grew) = match &mut self.object_mut(r)?.class {
            ObjectClass::WeakMap(table) => {
                let before = table.len();
                let out = update(table);
                (out, table.len() > before)
            }
            _ => return Ok(None),
        };
        if grew {
            self.note_resize(r)?;
        }
        Ok(Some(out))
    }

    /// Apply `update` to the members of a `WeakSet`.
    pub fn update_weak_members<T>(
        &mut self,
        r: HeapRef,
        update: impl FnOnce(&mut WeakMembers) -> T,
    ) -> JsResult<Option<T>> {
        let (out, grew) = match &mut self.object_mut(r)?.class {
            ObjectClass::WeakSet(members) => {
                let before = members.len();
                let out = update(members);
                (out, members.len() > before)
            }
            _ => return Ok(None),
        };
        if grew {
            self.note_resize(r)?;
        }
        Ok(Some(out))
    }

    /// Target of a `WeakRef`: `Ok(None)` for other objects,
    /// `Ok(Some(None))` once the target was collected.
    pub fn weak_ref_target(&self, r: HeapRef) -> JsResult<Option<Option<HeapRef>>> {
        Ok(match &self.object(r)?.class {
            ObjectClass::WeakRef(target) => Some(*target),
            _ => None,
        })
    }
}
