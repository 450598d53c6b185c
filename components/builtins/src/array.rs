//! `Array` constructor and `Array.prototype` methods
//!
//! Methods are generic: they work on any array-like `this` through
//! `length` and indexed property access, the way scripts observe them.
//! Holes are skipped where the language skips them.

use std::cell::RefCell;
use std::cmp::Ordering;

use core_types::{HeapRef, Value};
use interpreter::{CallArgs, JsResult, PropertyKey, Runtime, SYMBOL_ITERATOR};

use crate::{constructor, describe, length_of, method, relative_index};

/// Arrays currently being joined; a cyclic reference joins as "".
#[derive(Debug, Default)]
struct JoinStack(RefCell<Vec<HeapRef>>);

/// Longest array length.
const MAX_LENGTH: u64 = u32::MAX as u64;

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    rt.set_host_data(JoinStack::default());
    let proto = rt.intrinsics().array_prototype;
    let ctor = constructor(rt, "Array", 1, array_constructor, 0, proto)?;
    method(rt, ctor, "isArray", 1, array_is_array)?;
    method(rt, ctor, "of", 0, array_of)?;
    method(rt, ctor, "from", 1, array_from)?;

    let methods: [(&str, u32, interpreter::NativeFunction); 27] = [
        ("push", 1, array_push),
        ("pop", 0, array_pop),
        ("shift", 0, array_shift),
        ("unshift", 1, array_unshift),
        ("join", 1, array_join),
        ("toString", 0, array_to_string),
        ("slice", 2, array_slice),
        ("splice", 2, array_splice),
        ("concat", 1, array_concat),
        ("indexOf", 1, array_index_of),
        ("lastIndexOf", 1, array_last_index_of),
        ("includes", 1, array_includes),
        ("forEach", 1, array_for_each),
        ("map", 1, array_map),
        ("filter", 1, array_filter),
        ("some", 1, array_some),
        ("every", 1, array_every),
        ("find", 1, array_find),
        ("findIndex", 1, array_find_index),
        ("reduce", 1, array_reduce),
        ("reverse", 0, array_reverse),
        ("fill", 1, array_fill),
        ("at", 1, array_at),
        ("sort", 1, array_sort),
        ("keys", 0, crate::iterator::array_keys),
        ("entries", 0, crate::iterator::array_entries),
        ("values", 0, crate::iterator::array_values),
    ];
    for (name, arity, func) in methods {
        method(rt, proto, name, arity, func)?;
    }
    // @@iterator is the same function object as `values`.
    let values = rt.get_by_name(&Value::Object(proto), "values")?;
    rt.define_hidden(proto, PropertyKey::Symbol(SYMBOL_ITERATOR), values)?;
    Ok(())
}

/// Key for index `i`, which may exceed the array index range.
pub(crate) fn index_key(i: u64) -> PropertyKey {
    if i < MAX_LENGTH {
        PropertyKey::Index(i as u32)
    } else {
        PropertyKey::from(i.to_string().as_str())
    }
}

/// `ToObject(this)` rooted for the rest of the call.
fn this_object(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = Value::Object(rt.to_object(&args.this)?);
    rt.root(obj.clone());
    Ok(obj)
}

fn set_length(rt: &mut Runtime, obj: &Value, len: u64) -> JsResult<()> {
    rt.set(obj, &PropertyKey::from("length"), Value::number(len as f64), true)
}

fn has(rt: &mut Runtime, obj: &Value, i: u64) -> JsResult<bool> {
    match obj {
        Value::Object(r) => rt.has_property(*r, &index_key(i)),
        _ => Ok(false),
    }
}

fn delete_or_throw(rt: &mut Runtime, obj: &Value, key: &PropertyKey) -> JsResult<()> {
    let Value::Object(r) = obj else {
        return Ok(());
    };
    if rt.delete_property(*r, key)? {
        return Ok(());
    }
    let message = format!("Cannot delete property '{}' of [object Array]", key);
    rt.throw_type_error(&message)
}

fn callback(rt: &mut Runtime, value: &Value) -> JsResult<Value> {
    if rt.is_callable(value) {
        return Ok(value.clone());
    }
    let message = format!("{} is not a function", describe(value));
    rt.throw_type_error(&message)
}

/// A fresh array of `len` holes, rooted.
fn new_array_of_length(rt: &mut Runtime, len: u64) -> JsResult<Value> {
    if len > MAX_LENGTH {
        return rt.throw_range_error("Invalid array length");
    }
    let arr = Value::Object(rt.new_array(Vec::new())?);
    rt.root(arr.clone());
    if len > 0 {
        set_length(rt, &arr, len)?;
    }
    Ok(arr)
}

fn array_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let arr = match args.args.as_slice() {
        [Value::Number(n)] => {
            let len = *n as u64;
            if *n < 0.0 || n.fract() != 0.0 || *n > MAX_LENGTH as f64 || len as f64 != *n {
                return rt.throw_range_error("Invalid array length");
            }
            new_array_of_length(rt, len)?
        }
        values => Value::Object(rt.new_array(values.to_vec())?),
    };
    if args.is_construct() {
        let fallback = rt.intrinsics().array_prototype;
        let proto = rt.prototype_from_constructor(&args.new_target, fallback)?;
        if proto != fallback {
            if let Value::Object(r) = arr {
                rt.set_prototype_of(r, Some(proto))?;
            }
        }
    }
    Ok(arr)
}

fn array_is_array(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(match args.arg(0) {
        Value::Object(r) => rt.object(r)?.is_array(),
        _ => false,
    }))
}

fn array_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Object(rt.new_array(args.args.clone())?))
}

fn array_from(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let items = args.arg(0);
    let map_fn = match args.arg(1) {
        Value::Undefined => None,
        f => Some(callback(rt, &f)?),
    };
    collect_into_array(rt, &items, map_fn, args.arg(2))
}

/// A new array of the values `items` iterates (or, lacking `@@iterator`,
/// its array-like elements), each passed through `map_fn` if given.
pub(crate) fn collect_into_array(
    rt: &mut Runtime,
    items: &Value,
    map_fn: Option<Value>,
    this_arg: Value,
) -> JsResult<Value> {
    if items.is_nullish() {
        let message = format!("{} is not iterable", items);
        return rt.throw_type_error(&message);
    }
    let out = new_array_of_length(rt, 0)?;
    let iterator_method = rt.get(items, &PropertyKey::Symbol(SYMBOL_ITERATOR))?;
    let mut k = 0u64;
    if !iterator_method.is_nullish() {
        let method = callback(rt, &iterator_method)?;
        let iterator = rt.call(&method, items.clone(), Vec::new())?;
        rt.root(iterator.clone());
        let next = rt.get_by_name(&iterator, "next")?;
        let next = callback(rt, &next)?;
        rt.root(next.clone());
        let marker = rt.gc_scope_marker();
        loop {
            rt.flush_gc_scope(marker);
            let step = rt.call(&next, iterator.clone(), Vec::new())?;
            rt.root(step.clone());
            if !matches!(step, Value::Object(_)) {
                let message = format!("Iterator result {} is not an object", describe(&step));
                return rt.throw_type_error(&message);
            }
            if rt.get_by_name(&step, "done")?.is_truthy() {
                break;
            }
            let mut value = rt.get_by_name(&step, "value")?;
            if let Some(f) = &map_fn {
                value = rt.call(f, this_arg.clone(), vec![value, Value::number(k as f64)])?;
            }
            create_at(rt, &out, k, value)?;
            k += 1;
        }
    } else {
        let source = Value::Object(rt.to_object(items)?);
        rt.root(source.clone());
        let len = length_of(rt, &source)?;
        while k < len {
            let mut value = rt.get(&source, &index_key(k))?;
            if let Some(f) = &map_fn {
                value = rt.call(f, this_arg.clone(), vec![value, Value::number(k as f64)])?;
            }
            create_at(rt, &out, k, value)?;
            k += 1;
        }
    }
    set_length(rt, &out, k)?;
    Ok(out)
}

fn create_at(rt: &mut Runtime, arr: &Value, i: u64, value: Value) -> JsResult<()> {
    let Value::Object(r) = arr else {
        return Ok(());
    };
    let key = index_key(i);
    if rt.create_data_property(*r, &key, value)? {
        return Ok(());
    }
    let message = format!("Cannot add property {}, object is not extensible", key);
    rt.throw_type_error(&message)
}

fn array_push(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    if len + args.len() as u64 > 9_007_199_254_740_991 {
        return rt.throw_type_error("Pushing elements past 2^53-1 length");
    }
    for (i, value) in args.args.iter().enumerate() {
        rt.set(&obj, &index_key(len + i as u64), value.clone(), true)?;
    }
    let new_len = len + args.len() as u64;
    set_length(rt, &obj, new_len)?;
    Ok(Value::number(new_len as f64))
}

fn array_pop(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    if len == 0 {
        set_length(rt, &obj, 0)?;
        return Ok(Value::Undefined);
    }
    let key = index_key(len - 1);
    let value = rt.get(&obj, &key)?;
    delete_or_throw(rt, &obj, &key)?;
    set_length(rt, &obj, len - 1)?;
    Ok(value)
}

fn array_shift(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    if len == 0 {
        set_length(rt, &obj, 0)?;
        return Ok(Value::Undefined);
    }
    let first = rt.get(&obj, &PropertyKey::Index(0))?;
    rt.root(first.clone());
    for k in 1..len {
        move_element(rt, &obj, k, k - 1)?;
    }
    delete_or_throw(rt, &obj, &index_key(len - 1))?;
    set_length(rt, &obj, len - 1)?;
    Ok(first)
}

/// Copy element `from` to `to`, deleting `to` when `from` is a hole.
fn move_element(rt: &mut Runtime, obj: &Value, from: u64, to: u64) -> JsResult<()> {
    if has(rt, obj, from)? {
        let value = rt.get(obj, &index_key(from))?;
        rt.set(obj, &index_key(to), value, true)
    } else {
        delete_or_throw(rt, obj, &index_key(to))
    }
}

fn array_unshift(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    let count = args.len() as u64;
    if count > 0 {
        for k in (0..len).rev() {
            move_element(rt, &obj, k, k + count)?;
        }
        for (j, value) in args.args.iter().enumerate() {
            rt.set(&obj, &index_key(j as u64), value.clone(), true)?;
        }
    }
    set_length(rt, &obj, len + count)?;
    Ok(Value::number((len + count) as f64))
}

fn array_join(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let Value::Object(r) = obj else {
        return Ok(Value::string(""));
    };
    let len = length_of(rt, &obj)?;
    let sep = match args.arg(0) {
        Value::Undefined => ",".into(),
        v => rt.to_string(&v)?,
    };

    let cyclic = rt
        .host_data::<JoinStack>()
        .map_or(false, |s| s.0.borrow().contains(&r));
    if cyclic {
        return Ok(Value::string(""));
    }
    if let Some(stack) = rt.host_data::<JoinStack>() {
        stack.0.borrow_mut().push(r);
    }
    let result = join_elements(rt, &obj, len, &sep);
    if let Some(stack) = rt.host_data::<JoinStack>() {
        stack.0.borrow_mut().pop();
    }
    Ok(Value::string(&result?))
}

fn join_elements(rt: &mut Runtime, obj: &Value, len: u64, sep: &str) -> JsResult<String> {
    let mut out = String::new();
    for k in 0..len {
        if k > 0 {
            out.push_str(sep);
        }
        let element = rt.get(obj, &index_key(k))?;
        if !element.is_nullish() {
            out.push_str(&rt.to_string(&element)?);
        }
    }
    Ok(out)
}

fn array_to_string(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let join = rt.get_by_name(&obj, "join")?;
    if rt.is_callable(&join) {
        return rt.call(&join, obj, Vec::new());
    }
    let tag = match obj {
        Value::Object(r) => rt.object(r)?.class_name(),
        _ => "Object",
    };
    Ok(Value::string(&format!("[object {}]", tag)))
}

fn array_slice(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    let start = relative_index(rt, &args.arg(0), len, 0)?;
    let end = relative_index(rt, &args.arg(1), len, len)?;
    let out = new_array_of_length(rt, 0)?;
    let mut n = 0;
    for k in start..end.max(start) {
        if has(rt, &obj, k)? {
            let value = rt.get(&obj, &index_key(k))?;
            create_at(rt, &out, n, value)?;
        }
        n += 1;
    }
    set_length(rt, &out, n)?;
    Ok(out)
}

fn array_splice(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    let start = relative_index(rt, &args.arg(0), len, 0)?;
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => {
            let dc = rt.to_integer(&args.arg(1))?;
            dc.clamp(0.0, (len - start) as f64) as u64
        }
    };
    let items: Vec<Value> = args.args.iter().skip(2).cloned().collect();
    let item_count = items.len() as u64;

    let removed = new_array_of_length(rt, 0)?;
    for k in 0..delete_count {
        if has(rt, &obj, start + k)? {
            let value = rt.get(&obj, &index_key(start + k))?;
            create_at(rt, &removed, k, value)?;
        }
    }
    set_length(rt, &removed, delete_count)?;

    match item_count.cmp(&delete_count) {
        Ordering::Less => {
            for k in start..len - delete_count {
                move_element(rt, &obj, k + delete_count, k + item_count)?;
            }
            for k in (len - delete_count + item_count..len).rev() {
                delete_or_throw(rt, &obj, &index_key(k))?;
            }
        }
        Ordering::Greater => {
            for k in (start..len - delete_count).rev() {
                move_element(rt, &obj, k + delete_count, k + item_count)?;
            }
        }
        Ordering::Equal => {}
    }
    for (j, value) in items.into_iter().enumerate() {
        rt.set(&obj, &index_key(start + j as u64), value, true)?;
    }
    set_length(rt, &obj, len - delete_count + item_count)?;
    Ok(removed)
}

fn array_concat(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let out = new_array_of_length(rt, 0)?;
    let mut n = 0u64;
    for item in std::iter::once(obj).chain(args.args.iter().cloned()) {
        let spreadable = match &item {
            Value::Object(r) => rt.object(*r)?.is_array(),
            _ => false,
        };
        if spreadable {
            let len = length_of(rt, &item)?;
            for k in 0..len {
                if has(rt, &item, k)? {
                    let value = rt.get(&item, &index_key(k))?;
                    create_at(rt, &out, n + k, value)?;
                }
            }
            n += len;
        } else {
            create_at(rt, &out, n, item)?;
            n += 1;
        }
    }
    set_length(rt, &out, n)?;
    Ok(out)
}

fn array_index_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    if len == 0 {
        return Ok(Value::number(-1.0));
    }
    let n = rt.to_integer(&args.arg(1))?;
    if n >= len as f64 {
        return Ok(Value::number(-1.0));
    }
    let start = if n >= 0.0 {
        n as u64
    } else {
        (len as f64 + n).max(0.0) as u64
    };
    let search = args.arg(0);
    for k in start..len {
        if has(rt, &obj, k)? {
            let element = rt.get(&obj, &index_key(k))?;
            if rt.strict_equals(&element, &search) {
                return Ok(Value::number(k as f64));
            }
        }
    }
    Ok(Value::number(-1.0))
}

fn array_last_index_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    if len == 0 {
        return Ok(Value::number(-1.0));
    }
    let n = if args.len() > 1 {
        rt.to_integer(&args.arg(1))?
    } else {
        len as f64 - 1.0
    };
    let from = if n >= 0.0 {
        n.min(len as f64 - 1.0)
    } else {
        len as f64 + n
    };
    if from < 0.0 {
        return Ok(Value::number(-1.0));
    }
    let search = args.arg(0);
    for k in (0..=from as u64).rev() {
        if has(rt, &obj, k)? {
            let element = rt.get(&obj, &index_key(k))?;
            if rt.strict_equals(&element, &search) {
                return Ok(Value::number(k as f64));
            }
        }
    }
    Ok(Value::number(-1.0))
}

fn array_includes(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    if len == 0 {
        return Ok(Value::Boolean(false));
    }
    let start = relative_index(rt, &args.arg(1), len, 0)?;
    let search = args.arg(0);
    for k in start..len {
        let element = rt.get(&obj, &index_key(k))?;
        if element.same_value_zero(&search) {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

/// What an iteration callback's result means to the caller.
enum Visit {
    Continue,
    Stop(Value),
}

/// Shared loop of the callback-taking methods: visit present elements in
/// index order with `(value, index, object)`.
fn visit_elements(
    rt: &mut Runtime,
    args: &CallArgs,
    skip_holes: bool,
    mut on_result: impl FnMut(&mut Runtime, u64, Value, Value) -> JsResult<Visit>,
) -> JsResult<Option<Value>> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    let f = callback(rt, &args.arg(0))?;
    let this_arg = args.arg(1);
    let marker = rt.gc_scope_marker();
    for k in 0..len {
        if skip_holes && !has(rt, &obj, k)? {
            continue;
        }
        rt.flush_gc_scope(marker);
        let value = rt.get(&obj, &index_key(k))?;
        rt.root(value.clone());
        let result = rt.call(
            &f,
            this_arg.clone(),
            vec![value.clone(), Value::number(k as f64), obj.clone()],
        )?;
        if let Visit::Stop(v) = on_result(rt, k, value, result)? {
            return Ok(Some(v));
        }
    }
    Ok(None)
}

fn array_for_each(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    visit_elements(rt, args, true, |_, _, _, _| Ok(Visit::Continue))?;
    Ok(Value::Undefined)
}

fn array_map(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    let out = new_array_of_length(rt, len)?;
    let target = out.clone();
    visit_elements(rt, args, true, |rt, k, _, mapped| {
        create_at(rt, &target, k, mapped)?;
        Ok(Visit::Continue)
    })?;
    Ok(out)
}

fn array_filter(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let out = new_array_of_length(rt, 0)?;
    let target = out.clone();
    let mut n = 0;
    visit_elements(rt, args, true, |rt, _, value, keep| {
        if keep.is_truthy() {
            create_at(rt, &target, n, value)?;
            n += 1;
        }
        Ok(Visit::Continue)
    })?;
    Ok(out)
}

fn array_some(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let found = visit_elements(rt, args, true, |_, _, _, r| {
        Ok(if r.is_truthy() {
            Visit::Stop(Value::Boolean(true))
        } else {
            Visit::Continue
        })
    })?;
    Ok(found.unwrap_or(Value::Boolean(false)))
}

fn array_every(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let failed = visit_elements(rt, args, true, |_, _, _, r| {
        Ok(if r.is_truthy() {
            Visit::Continue
        } else {
            Visit::Stop(Value::Boolean(false))
        })
    })?;
    Ok(failed.unwrap_or(Value::Boolean(true)))
}

fn array_find(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let found = visit_elements(rt, args, false, |_, _, value, r| {
        Ok(if r.is_truthy() {
            Visit::Stop(value)
        } else {
            Visit::Continue
        })
    })?;
    Ok(found.unwrap_or(Value::Undefined))
}

fn array_find_index(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let found = visit_elements(rt, args, false, |_, k, _, r| {
        Ok(if r.is_truthy() {
            Visit::Stop(Value::number(k as f64))
        } else {
            Visit::Continue
        })
    })?;
    Ok(found.unwrap_or(Value::number(-1.0)))
}

fn array_reduce(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    let f = callback(rt, &args.arg(0))?;
    let mut k = 0;
    let mut acc = if args.len() >= 2 {
        args.arg(1)
    } else {
        loop {
            if k >= len {
                return rt.throw_type_error("Reduce of empty array with no initial value");
            }
            k += 1;
            if has(rt, &obj, k - 1)? {
                break rt.get(&obj, &index_key(k - 1))?;
            }
        }
    };
    let marker = rt.gc_scope_marker();
    while k < len {
        if has(rt, &obj, k)? {
            rt.flush_gc_scope(marker);
            rt.root(acc.clone());
            let value = rt.get(&obj, &index_key(k))?;
            acc = rt.call(
                &f,
                Value::Undefined,
                vec![acc, value, Value::number(k as f64), obj.clone()],
            )?;
        }
        k += 1;
    }
    Ok(acc)
}

fn array_reverse(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    let mut lower = 0;
    while len > 0 && lower < len / 2 {
        let upper = len - 1 - lower;
        let (lk, uk) = (index_key(lower), index_key(upper));
        let lower_exists = has(rt, &obj, lower)?;
        let lower_value = if lower_exists { rt.get(&obj, &lk)? } else { Value::Undefined };
        rt.root(lower_value.clone());
        let upper_exists = has(rt, &obj, upper)?;
        let upper_value = if upper_exists { rt.get(&obj, &uk)? } else { Value::Undefined };
        match (lower_exists, upper_exists) {
            (true, true) => {
                rt.set(&obj, &lk, upper_value, true)?;
                rt.set(&obj, &uk, lower_value, true)?;
            }
            (false, true) => {
                rt.set(&obj, &lk, upper_value, true)?;
                delete_or_throw(rt, &obj, &uk)?;
            }
            (true, false) => {
                delete_or_throw(rt, &obj, &lk)?;
                rt.set(&obj, &uk, lower_value, true)?;
            }
            (false, false) => {}
        }
        lower += 1;
    }
    Ok(obj)
}

fn array_fill(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    let start = relative_index(rt, &args.arg(1), len, 0)?;
    let end = relative_index(rt, &args.arg(2), len, len)?;
    let value = args.arg(0);
    for k in start..end.max(start) {
        rt.set(&obj, &index_key(k), value.clone(), true)?;
    }
    Ok(obj)
}

fn array_at(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)? as f64;
    let rel = rt.to_integer(&args.arg(0))?;
    let k = if rel >= 0.0 { rel } else { len + rel };
    if k < 0.0 || k >= len {
        return Ok(Value::Undefined);
    }
    rt.get(&obj, &index_key(k as u64))
}

/// `SortCompare`: undefined sorts last, then the comparator or string order.
fn sort_compare(rt: &mut Runtime, comparator: &Option<Value>, a: &Value, b: &Value) -> JsResult<Ordering> {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => return Ok(Ordering::Equal),
        (Value::Undefined, _) => return Ok(Ordering::Greater),
        (_, Value::Undefined) => return Ok(Ordering::Less),
        _ => {}
    }
    if let Some(f) = comparator {
        let v = rt.call(f, Value::Undefined, vec![a.clone(), b.clone()])?;
        let n = rt.to_number(&v)?;
        return Ok(if n < 0.0 {
            Ordering::Less
        } else if n > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        });
    }
    let sa = rt.to_string(a)?;
    let sb = rt.to_string(b)?;
    Ok(sa.encode_utf16().cmp(sb.encode_utf16()))
}

/// Stable merge sort with a comparator that may throw.
fn merge_sort(
    rt: &mut Runtime,
    comparator: &Option<Value>,
    items: Vec<Value>,
) -> JsResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(rt, comparator, left)?;
    let right = merge_sort(rt, comparator, right)?;
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut l = left.into_iter().peekable();
    let mut r = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (l.peek(), r.peek()) {
        if sort_compare(rt, comparator, b, a)? == Ordering::Less {
            out.extend(r.next());
        } else {
            out.extend(l.next());
        }
    }
    out.extend(l);
    out.extend(r);
    Ok(out)
}

fn array_sort(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let comparator = match args.arg(0) {
        Value::Undefined => None,
        f if rt.is_callable(&f) => Some(f),
        other => {
            let message = format!(
                "The comparison function must be either a function or undefined: {}",
                describe(&other)
            );
            return rt.throw_type_error(&message);
        }
    };
    let obj = this_object(rt, args)?;
    let len = length_of(rt, &obj)?;
    let mut items = Vec::new();
    for k in 0..len {
        if has(rt, &obj, k)? {
            let value = rt.get(&obj, &index_key(k))?;
            rt.root(value.clone());
            items.push(value);
        }
    }
    let count = items.len() as u64;
    let sorted = merge_sort(rt, &comparator, items)?;
    for (k, value) in sorted.into_iter().enumerate() {
        rt.set(&obj, &index_key(k as u64), value, true)?;
    }
    for k in count..len {
        delete_or_throw(rt, &obj, &index_key(k))?;
    }
    Ok(obj)
}
