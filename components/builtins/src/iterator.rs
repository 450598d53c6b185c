//! Iterator protocol objects
//!
//! `%IteratorPrototype%`, the generator prototype (`next` / `return` /
//! `throw` drive [`Runtime::generator_resume`]) and array iterators, which
//! also walk typed arrays.

use core_types::{HeapRef, SymbolId, Value};
use interpreter::{
    CallArgs, JsResult, PersistentHandle, PropertyKey, ResumeMode, Runtime, SYMBOL_ITERATOR,
};

use crate::array::index_key;
use crate::{describe, iter_result, length_of, method, method_with_magic, symbol_method};

/// Internal slots of array iterators, stored under private symbols.
#[derive(Debug)]
struct ArrayIteratorSlots {
    prototype: PersistentHandle,
    target: SymbolId,
    next_index: SymbolId,
    kind: SymbolId,
}

const KIND_KEYS: f64 = 0.0;
const KIND_VALUES: f64 = 1.0;
const KIND_ENTRIES: f64 = 2.0;

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let iterator_proto = rt.intrinsics().iterator_prototype;
    symbol_method(
        rt,
        iterator_proto,
        SYMBOL_ITERATOR,
        "[Symbol.iterator]",
        0,
        iterator_self,
    )?;

    let generator_proto = rt.intrinsics().generator_prototype;
    for (name, magic) in [("next", 0), ("return", 1), ("throw", 2)] {
        method_with_magic(rt, generator_proto, name, 1, generator_resume, magic)?;
    }

    let array_iterator_proto = rt.new_object_with_prototype(Some(iterator_proto))?;
    let prototype = rt.persist(Value::Object(array_iterator_proto));
    method(rt, array_iterator_proto, "next", 0, array_iterator_next)?;
    let slots = ArrayIteratorSlots {
        prototype,
        target: rt.new_symbol(Some("[[IteratedObject]]".into())),
        next_index: rt.new_symbol(Some("[[NextIndex]]".into())),
        kind: rt.new_symbol(Some("[[Kind]]".into())),
    };
    rt.set_host_data(slots);
    Ok(())
}

fn iterator_self(_rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(args.this.clone())
}

fn generator_resume(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let mode = match args.magic {
        0 => ResumeMode::Next,
        1 => ResumeMode::Return,
        _ => ResumeMode::Throw,
    };
    let Value::Object(gen) = args.this else {
        let message = format!(
            "Generator method called on incompatible receiver {}",
            describe(&args.this)
        );
        return rt.throw_type_error(&message);
    };
    let (value, done) = rt.generator_resume(gen, mode, args.arg(0))?;
    iter_result(rt, value, done)
}

fn slots(rt: &mut Runtime) -> JsResult<(HeapRef, SymbolId, SymbolId, SymbolId)> {
    let found = rt.host_data::<ArrayIteratorSlots>().and_then(|s| {
        let proto = rt.persistent(s.prototype)?.as_object()?;
        Some((proto, s.target, s.next_index, s.kind))
    });
    match found {
        Some(slots) => Ok(slots),
        None => rt.throw_type_error("Array iterators are not installed"),
    }
}

fn create_array_iterator(rt: &mut Runtime, args: &CallArgs, kind: f64) -> JsResult<Value> {
    let target = Value::Object(rt.to_object(&args.this)?);
    rt.root(target.clone());
    let (proto, target_slot, index_slot, kind_slot) = slots(rt)?;
    let iter = rt.new_object_with_prototype(Some(proto))?;
    rt.define_hidden(iter, PropertyKey::Symbol(target_slot), target)?;
    rt.define_hidden(iter, PropertyKey::Symbol(index_slot), Value::number(0.0))?;
    rt.define_hidden(iter, PropertyKey::Symbol(kind_slot), Value::number(kind))?;
    Ok(Value::Object(iter))
}

pub(crate) fn array_keys(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    create_array_iterator(rt, args, KIND_KEYS)
}

pub(crate) fn array_values(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    create_array_iterator(rt, args, KIND_VALUES)
}

pub(crate) fn array_entries(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    create_array_iterator(rt, args, KIND_ENTRIES)
}

fn own_slot(rt: &Runtime, obj: HeapRef, slot: SymbolId) -> JsResult<Option<Value>> {
    Ok(rt
        .get_own_property(obj, &PropertyKey::Symbol(slot))?
        .and_then(|p| p.value.data_value().cloned()))
}

fn array_iterator_next(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (_, target_slot, index_slot, kind_slot) = slots(rt)?;
    let iter = match args.this {
        Value::Object(r) if rt.has_own_property(r, &PropertyKey::Symbol(target_slot))? => r,
        _ => {
            let message = format!(
                "next method called on incompatible receiver {}",
                describe(&args.this)
            );
            return rt.throw_type_error(&message);
        }
    };
    let target = own_slot(rt, iter, target_slot)?.unwrap_or(Value::Undefined);
    let Value::Object(target_ref) = target else {
        return iter_result(rt, Value::Undefined, true);
    };
    let index = own_slot(rt, iter, index_slot)?
        .and_then(|v| v.as_number())
        .unwrap_or(0.0) as u64;
    let kind = own_slot(rt, iter, kind_slot)?
        .and_then(|v| v.as_number())
        .unwrap_or(KIND_VALUES);

    let len = match rt.typed_array_data(target_ref)? {
        Some(_) => rt.typed_array_length(target_ref)? as u64,
        None => length_of(rt, &target)?,
    };
    if index >= len {
        rt.define_hidden(iter, PropertyKey::Symbol(target_slot), Value::Undefined)?;
        return iter_result(rt, Value::Undefined, true);
    }
    rt.define_hidden(
        iter,
        PropertyKey::Symbol(index_slot),
        Value::number((index + 1) as f64),
    )?;
    let key_value = Value::number(index as f64);
    let result = if kind == KIND_KEYS {
        key_value
    } else {
        let element = rt.get(&target, &index_key(index))?;
        if kind == KIND_VALUES {
            element
        } else {
            rt.root(element.clone());
            Value::Object(rt.new_array(vec![key_value, element])?)
        }
    };
    rt.root(result.clone());
    iter_result(rt, result, false)
}
