//! `Map`, `Set`, `WeakMap`, `WeakSet` and `WeakRef`
//!
//! Map and Set iterators remember the serial of the last entry they
//! returned, so they keep going across deletions and see entries added
//! while they run. Weak collections only accept objects as keys.

use core_types::{HeapRef, SymbolId, Value};
use interpreter::object::ObjectClass;
use interpreter::{CallArgs, JsResult, PersistentHandle, PropertyKey, Runtime, SYMBOL_ITERATOR};

use crate::array::{collect_into_array, index_key};
use crate::typed_arrays::require_new;
use crate::{constructor, describe, getter, iter_result, length_of, method, method_with_magic};

const MAP: u32 = 0;
const SET: u32 = 1;

const KIND_KEYS: f64 = 0.0;
const KIND_VALUES: f64 = 1.0;
const KIND_ENTRIES: f64 = 2.0;

/// Internal slots of Map and Set iterators, stored under private symbols.
#[derive(Debug)]
struct CollectionIteratorSlots {
    map_prototype: PersistentHandle,
    set_prototype: PersistentHandle,
    target: SymbolId,
    cursor: SymbolId,
    kind: SymbolId,
}

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    install_map(rt)?;
    install_set(rt)?;
    install_weak(rt)?;

    let iterator_proto = rt.intrinsics().iterator_prototype;
    let map_iterator_proto = rt.new_object_with_prototype(Some(iterator_proto))?;
    method_with_magic(rt, map_iterator_proto, "next", 0, iterator_next, MAP)?;
    let set_iterator_proto = rt.new_object_with_prototype(Some(iterator_proto))?;
    method_with_magic(rt, set_iterator_proto, "next", 0, iterator_next, SET)?;
    let slots = CollectionIteratorSlots {
        map_prototype: rt.persist(Value::Object(map_iterator_proto)),
        set_prototype: rt.persist(Value::Object(set_iterator_proto)),
        target: rt.new_symbol(Some("[[IteratedCollection]]".into())),
        cursor: rt.new_symbol(Some("[[LastSerial]]".into())),
        kind: rt.new_symbol(Some("[[Kind]]".into())),
    };
    rt.set_host_data(slots);
    Ok(())
}

fn install_map(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().map_prototype;
    constructor(rt, "Map", 0, map_constructor, 0, proto)?;
    method(rt, proto, "get", 1, map_get)?;
    method(rt, proto, "set", 2, map_set)?;
    method_with_magic(rt, proto, "has", 1, collection_has, MAP)?;
    method_with_magic(rt, proto, "delete", 1, collection_delete, MAP)?;
    method_with_magic(rt, proto, "clear", 0, collection_clear, MAP)?;
    method_with_magic(rt, proto, "forEach", 1, collection_for_each, MAP)?;
    getter(rt, proto, "size", map_size)?;
    method(rt, proto, "keys", 0, map_keys)?;
    method(rt, proto, "values", 0, map_values)?;
    let entries = method(rt, proto, "entries", 0, map_entries)?;
    // @@iterator is the same function object as `entries`.
    rt.define_hidden(proto, PropertyKey::Symbol(SYMBOL_ITERATOR), Value::Object(entries))?;
    Ok(())
}

fn install_set(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().set_prototype;
    constructor(rt, "Set", 0, set_constructor, 0, proto)?;
    method(rt, proto, "add", 1, set_add)?;
    method_with_magic(rt, proto, "has", 1, collection_has, SET)?;
    method_with_magic(rt, proto, "delete", 1, collection_delete, SET)?;
    method_with_magic(rt, proto, "clear", 0, collection_clear, SET)?;
    method_with_magic(rt, proto, "forEach", 1, collection_for_each, SET)?;
    getter(rt, proto, "size", set_size)?;
    method(rt, proto, "entries", 0, set_entries)?;
    let values = method(rt, proto, "values", 0, set_values)?;
    // `keys` and @@iterator are the same function object as `values`.
    rt.define_hidden(proto, PropertyKey::from("keys"), Value::Object(values))?;
    rt.define_hidden(proto, PropertyKey::Symbol(SYMBOL_ITERATOR), Value::Object(values))?;
    Ok(())
}

fn install_weak(rt: &mut Runtime) -> JsResult<()> {
    let weak_map = rt.intrinsics().weak_map_prototype;
    constructor(rt, "WeakMap", 0, weak_map_constructor, 0, weak_map)?;
    method(rt, weak_map, "get", 1, weak_map_get)?;
    method(rt, weak_map, "set", 2, weak_map_set)?;
    method(rt, weak_map, "has", 1, weak_map_has)?;
    method(rt, weak_map, "delete", 1, weak_map_delete)?;

    let weak_set = rt.intrinsics().weak_set_prototype;
    constructor(rt, "WeakSet", 0, weak_set_constructor, 0, weak_set)?;
    method(rt, weak_set, "add", 1, weak_set_add)?;
    method(rt, weak_set, "has", 1, weak_set_has)?;
    method(rt, weak_set, "delete", 1, weak_set_delete)?;

    let weak_ref = rt.intrinsics().weak_ref_prototype;
    constructor(rt, "WeakRef", 1, weak_ref_constructor, 0, weak_ref)?;
    method(rt, weak_ref, "deref", 0, weak_ref_deref)?;
    Ok(())
}

fn incompatible<T>(rt: &mut Runtime, method: &str, this: &Value) -> JsResult<T> {
    let message = format!(
        "Method {} called on incompatible receiver {}",
        method,
        describe(this)
    );
    rt.throw_type_error(&message)
}

fn collection_name(magic: u32) -> &'static str {
    if magic == SET {
        "Set"
    } else {
        "Map"
    }
}

/// `this` as a Map (`magic` = MAP) or Set (`magic` = SET).
fn this_ordered(rt: &mut Runtime, this: &Value, magic: u32, method: &str) -> JsResult<HeapRef> {
    if let Value::Object(r) = this {
        let matches = match &rt.object(*r)?.class {
            ObjectClass::Map(_) => magic == MAP,
            ObjectClass::Set(_) => magic == SET,
            _ => false,
        };
        if matches {
            return Ok(*r);
        }
    }
    let name = format!("{}.prototype.{}", collection_name(magic), method);
    incompatible(rt, &name, this)
}

/// The new collection, with the prototype `new.target` asks for.
fn allocate(
    rt: &mut Runtime,
    args: &CallArgs,
    fallback: HeapRef,
    create: fn(&mut Runtime) -> JsResult<HeapRef>,
) -> JsResult<Value> {
    let proto = rt.prototype_from_constructor(&args.new_target, fallback)?;
    let obj = create(rt)?;
    if proto != fallback {
        rt.set_prototype_of(obj, Some(proto))?;
    }
    let obj = Value::Object(obj);
    rt.root(obj.clone());
    Ok(obj)
}

/// Feed every value `items` iterates to `target[adder]`; entries are
/// split into key and value first when `pairs` is set.
fn add_all(rt: &mut Runtime, target: &Value, items: &Value, adder: &str, pairs: bool) -> JsResult<()> {
    if items.is_nullish() {
        return Ok(());
    }
    let add = rt.get_by_name(target, adder)?;
    if !rt.is_callable(&add) {
        let message = format!("'{}' is not a function", adder);
        return rt.throw_type_error(&message);
    }
    rt.root(add.clone());
    let values = collect_into_array(rt, items, None, Value::Undefined)?;
    rt.root(values.clone());
    let len = length_of(rt, &values)?;
    for i in 0..len {
        let item = rt.get(&values, &index_key(i))?;
        let args = if pairs {
            if !matches!(item, Value::Object(_)) {
                let message = format!("Iterator value {} is not an entry object", describe(&item));
                return rt.throw_type_error(&message);
            }
            vec![rt.get(&item, &index_key(0))?, rt.get(&item, &index_key(1))?]
        } else {
            vec![item]
        };
        rt.call(&add, target.clone(), args)?;
    }
    Ok(())
}

// ---- Map -------------------------------------------------------------------

fn map_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_new(rt, args, "Map")?;
    let fallback = rt.intrinsics().map_prototype;
    let map = allocate(rt, args, fallback, Runtime::new_map)?;
    add_all(rt, &map, &args.arg(0), "set", true)?;
    Ok(map)
}

fn map_get(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let map = this_ordered(rt, &args.this, MAP, "get")?;
    let key = args.arg(0);
    Ok(rt
        .ordered_table(map)?
        .and_then(|table| table.get(&key).cloned())
        .unwrap_or(Value::Undefined))
}

fn map_set(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let map = this_ordered(rt, &args.this, MAP, "set")?;
    let (key, value) = (args.arg(0), args.arg(1));
    rt.update_ordered_table(map, |table| table.insert(&key, value))?;
    Ok(args.this.clone())
}

fn map_size(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let map = this_ordered(rt, &args.this, MAP, "size")?;
    let len = rt.ordered_table(map)?.map_or(0, |t| t.len());
    Ok(Value::number(len as f64))
}

fn map_keys(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    create_iterator(rt, &args.this, MAP, "keys", KIND_KEYS)
}

fn map_values(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    create_iterator(rt, &args.this, MAP, "values", KIND_VALUES)
}

fn map_entries(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    create_iterator(rt, &args.this, MAP, "entries", KIND_ENTRIES)
}

// ---- Set -------------------------------------------------------------------

fn set_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_new(rt, args, "Set")?;
    let fallback = rt.intrinsics().set_prototype;
    let set = allocate(rt, args, fallback, Runtime::new_set)?;
    add_all(rt, &set, &args.arg(0), "add", false)?;
    Ok(set)
}

fn set_add(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let set = this_ordered(rt, &args.this, SET, "add")?;
    let value = args.arg(0);
    rt.update_ordered_table(set, |table| {
        if !table.contains(&value) {
            table.insert(&value, Value::Undefined);
        }
    })?;
    Ok(args.this.clone())
}

fn set_size(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let set = this_ordered(rt, &args.this, SET, "size")?;
    let len = rt.ordered_table(set)?.map_or(0, |t| t.len());
    Ok(Value::number(len as f64))
}

fn set_values(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    create_iterator(rt, &args.this, SET, "values", KIND_VALUES)
}

fn set_entries(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    create_iterator(rt, &args.this, SET, "entries", KIND_ENTRIES)
}

// ---- shared by Map and Set -------------------------------------------------

fn collection_has(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let r = this_ordered(rt, &args.this, args.magic, "has")?;
    let key = args.arg(0);
    let found = rt.ordered_table(r)?.map_or(false, |t| t.contains(&key));
    Ok(Value::Boolean(found))
}

fn collection_delete(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let r = this_ordered(rt, &args.this, args.magic, "delete")?;
    let key = args.arg(0);
    let removed = rt.update_ordered_table(r, |t| t.remove(&key))?;
    Ok(Value::Boolean(removed.unwrap_or(false)))
}

fn collection_clear(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let r = this_ordered(rt, &args.this, args.magic, "clear")?;
    rt.update_ordered_table(r, |t| t.clear())?;
    Ok(Value::Undefined)
}

/// `forEach(callback, thisArg)`; entries added by the callback are visited.
fn collection_for_each(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let r = this_ordered(rt, &args.this, args.magic, "forEach")?;
    let callback = args.arg(0);
    if !rt.is_callable(&callback) {
        let message = format!("{} is not a function", describe(&callback));
        return rt.throw_type_error(&message);
    }
    let this_arg = args.arg(1);
    let marker = rt.gc_scope_marker();
    let mut cursor = None;
    loop {
        let next = rt.ordered_table(r)?.and_then(|t| t.next_after(cursor));
        let Some((serial, key, value)) = next else {
            break;
        };
        rt.flush_gc_scope(marker);
        cursor = Some(serial);
        let value = if args.magic == SET { key.clone() } else { value };
        rt.call(&callback, this_arg.clone(), vec![value, key, args.this.clone()])?;
    }
    Ok(Value::Undefined)
}

// ---- iterators -------------------------------------------------------------

fn slots(rt: &mut Runtime, magic: u32) -> JsResult<(HeapRef, SymbolId, SymbolId, SymbolId)> {
    let found = rt.host_data::<CollectionIteratorSlots>().and_then(|s| {
        let handle = if magic == SET {
            s.set_prototype
        } else {
            s.map_prototype
        };
        let proto = rt.persistent(handle)?.as_object()?;
        Some((proto, s.target, s.cursor, s.kind))
    });
    match found {
        Some(slots) => Ok(slots),
        None => rt.throw_type_error("Collection iterators are not installed"),
    }
}

fn create_iterator(
    rt: &mut Runtime,
    this: &Value,
    magic: u32,
    method: &str,
    kind: f64,
) -> JsResult<Value> {
    let target = this_ordered(rt, this, magic, method)?;
    let (proto, target_slot, cursor_slot, kind_slot) = slots(rt, magic)?;
    let iter = rt.new_object_with_prototype(Some(proto))?;
    rt.define_hidden(iter, PropertyKey::Symbol(target_slot), Value::Object(target))?;
    rt.define_hidden(iter, PropertyKey::Symbol(cursor_slot), Value::Undefined)?;
    rt.define_hidden(iter, PropertyKey::Symbol(kind_slot), Value::number(kind))?;
    Ok(Value::Object(iter))
}

fn own_slot(rt: &Runtime, obj: HeapRef, slot: SymbolId) -> JsResult<Option<Value>> {
    Ok(rt
        .get_own_property(obj, &PropertyKey::Symbol(slot))?
        .and_then(|p| p.value.data_value().cloned()))
}

fn iterator_next(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (proto, target_slot, cursor_slot, kind_slot) = slots(rt, args.magic)?;
    let iter = match args.this {
        Value::Object(r)
            if rt.has_own_property(r, &PropertyKey::Symbol(target_slot))?
                && rt.object(r)?.prototype == Some(proto) =>
        {
            r
        }
        _ => {
            let name = format!("{} Iterator.prototype.next", collection_name(args.magic));
            return incompatible(rt, &name, &args.this);
        }
    };
    let Some(Value::Object(target)) = own_slot(rt, iter, target_slot)? else {
        return iter_result(rt, Value::Undefined, true);
    };
    let cursor = own_slot(rt, iter, cursor_slot)?
        .and_then(|v| v.as_number())
        .map(|n| n as u64);
    let kind = own_slot(rt, iter, kind_slot)?
        .and_then(|v| v.as_number())
        .unwrap_or(KIND_VALUES);

    let next = rt.ordered_table(target)?.and_then(|t| t.next_after(cursor));
    let Some((serial, key, value)) = next else {
        rt.define_hidden(iter, PropertyKey::Symbol(target_slot), Value::Undefined)?;
        return iter_result(rt, Value::Undefined, true);
    };
    rt.define_hidden(
        iter,
        PropertyKey::Symbol(cursor_slot),
        Value::number(serial as f64),
    )?;
    let value = if args.magic == SET { key.clone() } else { value };
    let result = if kind == KIND_KEYS {
        key
    } else if kind == KIND_VALUES {
        value
    } else {
        rt.root(key.clone());
        rt.root(value.clone());
        Value::Object(rt.new_array(vec![key, value])?)
    };
    rt.root(result.clone());
    iter_result(rt, result, false)
}

// ---- WeakMap and WeakSet ---------------------------------------------------

fn this_weak(rt: &mut Runtime, this: &Value, name: &str, method: &str) -> JsResult<HeapRef> {
    if let Value::Object(r) = this {
        let matches = match &rt.object(*r)?.class {
            ObjectClass::WeakMap(_) => name == "WeakMap",
            ObjectClass::WeakSet(_) => name == "WeakSet",
            _ => false,
        };
        if matches {
            return Ok(*r);
        }
    }
    let full = format!("{}.prototype.{}", name, method);
    incompatible(rt, &full, this)
}

fn weak_map_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_new(rt, args, "WeakMap")?;
    let fallback = rt.intrinsics().weak_map_prototype;
    let map = allocate(rt, args, fallback, Runtime::new_weak_map)?;
    add_all(rt, &map, &args.arg(0), "set", true)?;
    Ok(map)
}

fn weak_map_get(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let map = this_weak(rt, &args.this, "WeakMap", "get")?;
    let Value::Object(key) = args.arg(0) else {
        return Ok(Value::Undefined);
    };
    Ok(match &rt.object(map)?.class {
        ObjectClass::WeakMap(table) => table.get(&key).cloned().unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    })
}

fn weak_map_set(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let map = this_weak(rt, &args.this, "WeakMap", "set")?;
    let Value::Object(key) = args.arg(0) else {
        return rt.throw_type_error("Invalid value used as weak map key");
    };
    let value = args.arg(1);
    rt.update_weak_table(map, |table| table.insert(key, value))?;
    Ok(args.this.clone())
}

fn weak_map_has(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let map = this_weak(rt, &args.this, "WeakMap", "has")?;
    let found = match (args.arg(0), &rt.object(map)?.class) {
        (Value::Object(key), ObjectClass::WeakMap(table)) => table.contains_key(&key),
        _ => false,
    };
    Ok(Value::Boolean(found))
}

fn weak_map_delete(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let map = this_weak(rt, &args.this, "WeakMap", "delete")?;
    let Value::Object(key) = args.arg(0) else {
        return Ok(Value::Boolean(false));
    };
    let removed = rt.update_weak_table(map, |table| table.swap_remove(&key).is_some())?;
    Ok(Value::Boolean(removed.unwrap_or(false)))
}

fn weak_set_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_new(rt, args, "WeakSet")?;
    let fallback = rt.intrinsics().weak_set_prototype;
    let set = allocate(rt, args, fallback, Runtime::new_weak_set)?;
    add_all(rt, &set, &args.arg(0), "add", false)?;
    Ok(set)
}

fn weak_set_add(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let set = this_weak(rt, &args.this, "WeakSet", "add")?;
    let Value::Object(member) = args.arg(0) else {
        return rt.throw_type_error("Invalid value used in weak set");
    };
    rt.update_weak_members(set, |members| members.insert(member))?;
    Ok(args.this.clone())
}

fn weak_set_has(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let set = this_weak(rt, &args.this, "WeakSet", "has")?;
    let found = match (args.arg(0), &rt.object(set)?.class) {
        (Value::Object(member), ObjectClass::WeakSet(members)) => members.contains(&member),
        _ => false,
    };
    Ok(Value::Boolean(found))
}

fn weak_set_delete(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let set = this_weak(rt, &args.this, "WeakSet", "delete")?;
    let Value::Object(member) = args.arg(0) else {
        return Ok(Value::Boolean(false));
    };
    let removed = rt.update_weak_members(set, |members| members.swap_remove(&member))?;
    Ok(Value::Boolean(removed.unwrap_or(false)))
}

// ---- WeakRef ---------------------------------------------------------------

fn weak_ref_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_new(rt, args, "WeakRef")?;
    let Value::Object(target) = args.arg(0) else {
        return rt.throw_type_error("WeakRef: target must be an object");
    };
    let fallback = rt.intrinsics().weak_ref_prototype;
    let proto = rt.prototype_from_constructor(&args.new_target, fallback)?;
    let weak_ref = rt.new_weak_ref(target)?;
    if proto != fallback {
        rt.set_prototype_of(weak_ref, Some(proto))?;
    }
    Ok(Value::Object(weak_ref))
}

fn weak_ref_deref(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let target = match &args.this {
        Value::Object(r) => rt.weak_ref_target(*r)?,
        _ => None,
    };
    match target {
        Some(Some(r)) => Ok(Value::Object(r)),
        Some(None) => Ok(Value::Undefined),
        None => incompatible(rt, "WeakRef.prototype.deref", &args.this),
    }
}
