//! `ArrayBuffer`, `%TypedArray%` and the eleven typed-array constructors
//!
//! Views never cache their buffer's bytes: every element access goes back
//! through the runtime, and every method that converts arguments (which
//! may run script) checks for detachment again before touching memory.

use core_types::{HeapRef, Value};
use interpreter::object::ObjectClass;
use interpreter::{
    CallArgs, JsResult, PropertyFlags, PropertyKey, Runtime, TypedArrayData, TypedArrayKind,
    SYMBOL_ITERATOR,
};

use crate::array::{collect_into_array, index_key};
use crate::iterator::{array_entries, array_keys, array_values};
use crate::{constant, constructor, describe, getter, length_of, method, relative_index};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    install_array_buffer(rt)?;

    let base_proto = rt.intrinsics().typed_array_prototype;
    let base = rt.new_native("TypedArray", 0, abstract_typed_array, 0, true)?;
    rt.define_property_or_throw(
        base,
        PropertyKey::from("prototype"),
        Value::Object(base_proto),
        PropertyFlags::FROZEN,
    )?;
    rt.define_hidden(base_proto, PropertyKey::from("constructor"), Value::Object(base))?;

    getter(rt, base_proto, "length", view_length)?;
    getter(rt, base_proto, "byteLength", view_byte_length)?;
    getter(rt, base_proto, "byteOffset", view_byte_offset)?;
    getter(rt, base_proto, "buffer", view_buffer)?;
    method(rt, base_proto, "at", 1, view_at)?;
    method(rt, base_proto, "copyWithin", 2, view_copy_within)?;
    method(rt, base_proto, "fill", 1, view_fill)?;
    method(rt, base_proto, "forEach", 1, view_for_each)?;
    method(rt, base_proto, "indexOf", 1, view_index_of)?;
    method(rt, base_proto, "join", 1, view_join)?;
    method(rt, base_proto, "set", 1, view_set)?;
    method(rt, base_proto, "slice", 2, view_slice)?;
    method(rt, base_proto, "subarray", 2, view_subarray)?;
    method(rt, base_proto, "keys", 0, array_keys)?;
    method(rt, base_proto, "entries", 0, array_entries)?;
    let values = method(rt, base_proto, "values", 0, array_values)?;
    rt.define_hidden(
        base_proto,
        PropertyKey::Symbol(SYMBOL_ITERATOR),
        Value::Object(values),
    )?;

    for kind in TypedArrayKind::ALL {
        let proto = rt.intrinsics().typed_array_prototype_for(kind);
        let ctor = constructor(
            rt,
            kind.name(),
            3,
            typed_array_constructor,
            kind.index() as u32,
            proto,
        )?;
        rt.set_prototype_of(ctor, Some(base))?;
        let size = Value::number(kind.element_size() as f64);
        constant(rt, ctor, "BYTES_PER_ELEMENT", size.clone())?;
        constant(rt, proto, "BYTES_PER_ELEMENT", size)?;
    }
    Ok(())
}

fn install_array_buffer(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().array_buffer_prototype;
    let ctor = constructor(rt, "ArrayBuffer", 1, array_buffer_constructor, 0, proto)?;
    method(rt, ctor, "isView", 1, array_buffer_is_view)?;
    getter(rt, proto, "byteLength", buffer_byte_length)?;
    getter(rt, proto, "detached", buffer_detached)?;
    method(rt, proto, "slice", 2, buffer_slice)?;
    method(rt, proto, "transfer", 0, buffer_transfer)?;
    Ok(())
}

/// `ToIndex`, with `message` as the RangeError text.
fn to_index(rt: &mut Runtime, value: &Value, message: &str) -> JsResult<usize> {
    if matches!(value, Value::Undefined) {
        return Ok(0);
    }
    let n = rt.to_integer(value)?;
    if !(0.0..=MAX_SAFE_INTEGER).contains(&n) {
        return rt.throw_range_error(message);
    }
    Ok(n as usize)
}

pub(crate) fn require_new(rt: &mut Runtime, args: &CallArgs, name: &str) -> JsResult<()> {
    if args.is_construct() {
        return Ok(());
    }
    let message = format!("Constructor {} requires 'new'", name);
    rt.throw_type_error(&message)
}

fn detached_error<T>(rt: &mut Runtime, method: &str) -> JsResult<T> {
    let message = format!("Cannot perform {} on a detached ArrayBuffer", method);
    rt.throw_type_error(&message)
}

// ---- ArrayBuffer -----------------------------------------------------------

fn array_buffer_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_new(rt, args, "ArrayBuffer")?;
    let len = to_index(rt, &args.arg(0), "Invalid array buffer length")?;
    let fallback = rt.intrinsics().array_buffer_prototype;
    let proto = rt.prototype_from_constructor(&args.new_target, fallback)?;
    let buffer = rt.new_array_buffer(len)?;
    if proto != fallback {
        rt.set_prototype_of(buffer, Some(proto))?;
    }
    Ok(Value::Object(buffer))
}

fn array_buffer_is_view(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let is_view = match args.arg(0) {
        Value::Object(r) => rt.typed_array_data(r)?.is_some(),
        _ => false,
    };
    Ok(Value::Boolean(is_view))
}

fn this_buffer(rt: &mut Runtime, this: &Value, method: &str) -> JsResult<HeapRef> {
    match this {
        Value::Object(r) if rt.is_array_buffer(this) => Ok(*r),
        _ => {
            let message = format!(
                "Method ArrayBuffer.prototype.{} called on incompatible receiver {}",
                method,
                describe(this)
            );
            rt.throw_type_error(&message)
        }
    }
}

fn buffer_byte_length(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let buffer = this_buffer(rt, &args.this, "byteLength")?;
    let len = rt.array_buffer_bytes(buffer)?.map_or(0, <[u8]>::len);
    Ok(Value::number(len as f64))
}

fn buffer_detached(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let buffer = this_buffer(rt, &args.this, "detached")?;
    Ok(Value::Boolean(rt.is_detached(buffer)?))
}

fn buffer_slice(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let buffer = this_buffer(rt, &args.this, "slice")?;
    let Some(len) = rt.array_buffer_bytes(buffer)?.map(<[u8]>::len) else {
        return detached_error(rt, "ArrayBuffer.prototype.slice");
    };
    let first = relative_index(rt, &args.arg(0), len as u64, 0)? as usize;
    let last = relative_index(rt, &args.arg(1), len as u64, len as u64)? as usize;
    let copied = match rt.array_buffer_bytes(buffer)? {
        Some(bytes) => {
            let end = last.min(bytes.len());
            bytes.get(first..end).map_or_else(Vec::new, <[u8]>::to_vec)
        }
        None => return detached_error(rt, "ArrayBuffer.prototype.slice"),
    };
    Ok(Value::Object(rt.array_buffer_from(copied)?))
}

fn buffer_transfer(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let buffer = this_buffer(rt, &args.this, "transfer")?;
    let new_len = match args.arg(0) {
        Value::Undefined => rt.array_buffer_bytes(buffer)?.map_or(0, <[u8]>::len),
        v => to_index(rt, &v, "Invalid array buffer length")?,
    };
    if rt.is_detached(buffer)? {
        return detached_error(rt, "ArrayBuffer.prototype.transfer");
    }
    let mut bytes = rt.detach_array_buffer(buffer)?;
    bytes.resize(new_len, 0);
    Ok(Value::Object(rt.array_buffer_from(bytes)?))
}

// ---- typed-array constructors ---------------------------------------------

fn abstract_typed_array(rt: &mut Runtime, _args: &CallArgs) -> JsResult<Value> {
    rt.throw_type_error("Abstract class TypedArray not directly constructable")
}

fn typed_array_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let kind = TypedArrayKind::ALL
        .get(args.magic as usize)
        .copied()
        .unwrap_or(TypedArrayKind::Uint8);
    require_new(rt, args, kind.name())?;
    let fallback = rt.intrinsics().typed_array_prototype_for(kind);
    let proto = rt.prototype_from_constructor(&args.new_target, fallback)?;

    let first = args.arg(0);
    let view = match &first {
        Value::Object(r) if rt.is_array_buffer(&first) => {
            from_buffer(rt, kind, *r, &args.arg(1), &args.arg(2))?
        }
        Value::Object(r) => match rt.typed_array_data(*r)? {
            Some(source) => from_typed_array(rt, kind, *r, source)?,
            None => from_object(rt, kind, &first)?,
        },
        other => {
            let len = to_index(rt, other, "Invalid typed array length")?;
            allocate(rt, kind, len)?
        }
    };
    if proto != fallback {
        rt.set_prototype_of(view, Some(proto))?;
    }
    Ok(Value::Object(view))
}

/// A view of `len` zeroed elements over a fresh buffer.
fn allocate(rt: &mut Runtime, kind: TypedArrayKind, len: usize) -> JsResult<HeapRef> {
    let Some(byte_len) = len.checked_mul(kind.element_size()) else {
        let message = format!("Invalid typed array length: {}", len);
        return rt.throw_range_error(&message);
    };
    let buffer = rt.new_array_buffer(byte_len)?;
    rt.root(Value::Object(buffer));
    let view = rt.new_typed_array(kind, buffer, 0, len)?;
    rt.root(Value::Object(view));
    Ok(view)
}

fn from_buffer(
    rt: &mut Runtime,
    kind: TypedArrayKind,
    buffer: HeapRef,
    offset: &Value,
    length: &Value,
) -> JsResult<HeapRef> {
    let size = kind.element_size();
    let offset = to_index(rt, offset, "Start offset is outside the bounds of the buffer")?;
    if offset % size != 0 {
        let message = format!("start offset of {} should be a multiple of {}", kind.name(), size);
        return rt.throw_range_error(&message);
    }
    let new_length = match length {
        Value::Undefined => None,
        v => Some(to_index(rt, v, "Invalid typed array length")?),
    };
    let Some(buffer_len) = rt.array_buffer_bytes(buffer)?.map(<[u8]>::len) else {
        return detached_error(rt, "Construct");
    };
    let length = match new_length {
        Some(n) => n,
        None => {
            if buffer_len % size != 0 {
                let message = format!(
                    "byte length of {} should be a multiple of {}",
                    kind.name(),
                    size
                );
                return rt.throw_range_error(&message);
            }
            if offset > buffer_len {
                let message = format!(
                    "Start offset {} is outside the bounds of the buffer",
                    offset
                );
                return rt.throw_range_error(&message);
            }
            (buffer_len - offset) / size
        }
    };
    rt.new_typed_array(kind, buffer, offset, length)
}

fn from_typed_array(
    rt: &mut Runtime,
    kind: TypedArrayKind,
    source: HeapRef,
    data: TypedArrayData,
) -> JsResult<HeapRef> {
    if rt.is_detached(data.buffer)? {
        return detached_error(rt, "Construct");
    }
    if data.kind.is_bigint() != kind.is_bigint() {
        let message = format!("Content type mismatch: {} from {}", kind.name(), data.kind.name());
        return rt.throw_type_error(&message);
    }
    let len = rt.typed_array_length(source)?;
    let view = allocate(rt, kind, len)?;
    for i in 0..len {
        if let Some(v) = rt.typed_array_get(source, i)? {
            rt.typed_array_set(view, i, v)?;
        }
    }
    Ok(view)
}

fn from_object(rt: &mut Runtime, kind: TypedArrayKind, object: &Value) -> JsResult<HeapRef> {
    let values = collect_into_array(rt, object, None, Value::Undefined)?;
    rt.root(values.clone());
    let len = length_of(rt, &values)? as usize;
    let view = allocate(rt, kind, len)?;
    for i in 0..len {
        let v = rt.get(&values, &index_key(i as u64))?;
        rt.typed_array_set(view, i, v)?;
    }
    Ok(view)
}

// ---- %TypedArray%.prototype ------------------------------------------------

/// The receiver as a view, without checking detachment.
fn this_view(rt: &mut Runtime, this: &Value, method: &str) -> JsResult<(HeapRef, TypedArrayData)> {
    if let Value::Object(r) = this {
        if let Some(data) = rt.typed_array_data(*r)? {
            return Ok((*r, data));
        }
    }
    let message = format!(
        "Method %TypedArray%.prototype.{} called on incompatible receiver {}",
        method,
        describe(this)
    );
    rt.throw_type_error(&message)
}

/// `ValidateTypedArray`: the receiver as an attached view and its length.
fn valid_view(
    rt: &mut Runtime,
    this: &Value,
    method: &str,
) -> JsResult<(HeapRef, TypedArrayData, usize)> {
    let (view, data) = this_view(rt, this, method)?;
    ensure_attached(rt, &data, method)?;
    let len = rt.typed_array_length(view)?;
    Ok((view, data, len))
}

fn ensure_attached(rt: &mut Runtime, data: &TypedArrayData, method: &str) -> JsResult<()> {
    if rt.is_detached(data.buffer)? {
        return detached_error(rt, &format!("%TypedArray%.prototype.{}", method));
    }
    Ok(())
}

/// `value` converted to the element type of `kind`.
fn coerce_element(rt: &mut Runtime, kind: TypedArrayKind, value: &Value) -> JsResult<Value> {
    Ok(if kind.is_bigint() {
        Value::BigInt(rt.to_bigint(value)?)
    } else {
        Value::number(rt.to_number(value)?)
    })
}

fn view_length(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (view, _) = this_view(rt, &args.this, "length")?;
    Ok(Value::number(rt.typed_array_length(view)? as f64))
}

fn view_byte_length(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (view, data) = this_view(rt, &args.this, "byteLength")?;
    let len = rt.typed_array_length(view)? * data.kind.element_size();
    Ok(Value::number(len as f64))
}

fn view_byte_offset(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (_, data) = this_view(rt, &args.this, "byteOffset")?;
    let offset = if rt.is_detached(data.buffer)? {
        0
    } else {
        data.byte_offset
    };
    Ok(Value::number(offset as f64))
}

fn view_buffer(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (_, data) = this_view(rt, &args.this, "buffer")?;
    Ok(Value::Object(data.buffer))
}

fn view_at(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (view, _, len) = valid_view(rt, &args.this, "at")?;
    let rel = rt.to_integer(&args.arg(0))?;
    let k = if rel >= 0.0 { rel } else { len as f64 + rel };
    if k < 0.0 || k >= len as f64 {
        return Ok(Value::Undefined);
    }
    Ok(rt.typed_array_get(view, k as usize)?.unwrap_or(Value::Undefined))
}

fn view_copy_within(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (_, data, len) = valid_view(rt, &args.this, "copyWithin")?;
    let len64 = len as u64;
    let target = relative_index(rt, &args.arg(0), len64, 0)?;
    let start = relative_index(rt, &args.arg(1), len64, 0)?;
    let end = relative_index(rt, &args.arg(2), len64, len64)?;
    let count = end.saturating_sub(start).min(len64 - target) as usize;
    if count == 0 {
        return Ok(args.this.clone());
    }
    // Argument conversion may have detached the buffer.
    ensure_attached(rt, &data, "copyWithin")?;
    let size = data.kind.element_size();
    let from = data.byte_offset + start as usize * size;
    let to = data.byte_offset + target as usize * size;
    let byte_count = count * size;
    if let ObjectClass::ArrayBuffer(Some(bytes)) = &mut rt.object_mut(data.buffer)?.class {
        let limit = bytes.len();
        if from + byte_count <= limit && to + byte_count <= limit {
            bytes.copy_within(from..from + byte_count, to);
        }
    }
    Ok(args.this.clone())
}

fn view_fill(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (view, data, len) = valid_view(rt, &args.this, "fill")?;
    let value = coerce_element(rt, data.kind, &args.arg(0))?;
    let start = relative_index(rt, &args.arg(1), len as u64, 0)?;
    let end = relative_index(rt, &args.arg(2), len as u64, len as u64)?;
    ensure_attached(rt, &data, "fill")?;
    for i in start..end {
        rt.typed_array_set(view, i as usize, value.clone())?;
    }
    Ok(args.this.clone())
}

fn view_for_each(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (view, _, len) = valid_view(rt, &args.this, "forEach")?;
    let callback = args.arg(0);
    if !rt.is_callable(&callback) {
        let message = format!("{} is not a function", describe(&callback));
        return rt.throw_type_error(&message);
    }
    let this_arg = args.arg(1);
    let marker = rt.gc_scope_marker();
    for i in 0..len {
        rt.flush_gc_scope(marker);
        let element = rt.typed_array_get(view, i)?.unwrap_or(Value::Undefined);
        rt.root(element.clone());
        rt.call(
            &callback,
            this_arg.clone(),
            vec![element, Value::number(i as f64), args.this.clone()],
        )?;
    }
    Ok(Value::Undefined)
}

fn view_index_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (view, _, len) = valid_view(rt, &args.this, "indexOf")?;
    if len == 0 {
        return Ok(Value::number(-1.0));
    }
    let search = args.arg(0);
    let start = relative_index(rt, &args.arg(1), len as u64, 0)? as usize;
    for i in start..len {
        if let Some(element) = rt.typed_array_get(view, i)? {
            if rt.strict_equals(&element, &search) {
                return Ok(Value::number(i as f64));
            }
        }
    }
    Ok(Value::number(-1.0))
}

fn view_join(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (view, _, len) = valid_view(rt, &args.this, "join")?;
    let separator = match args.arg(0) {
        Value::Undefined => ",".into(),
        v => rt.to_string(&v)?,
    };
    let mut parts = Vec::with_capacity(len);
    for i in 0..len {
        let part = match rt.typed_array_get(view, i)? {
            Some(v) => rt.to_string(&v)?.to_string(),
            None => String::new(),
        };
        parts.push(part);
    }
    Ok(Value::string(&parts.join(&*separator)))
}

fn view_set(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (view, data) = this_view(rt, &args.this, "set")?;
    let offset = rt.to_integer(&args.arg(1))?;
    if offset < 0.0 {
        return rt.throw_range_error("offset is out of bounds");
    }
    ensure_attached(rt, &data, "set")?;
    let len = rt.typed_array_length(view)?;
    let source = args.arg(0);

    let source_view = match &source {
        Value::Object(r) => rt.typed_array_data(*r)?.map(|d| (*r, d)),
        _ => None,
    };
    if let Some((src, src_data)) = source_view {
        ensure_attached(rt, &src_data, "set")?;
        if src_data.kind.is_bigint() != data.kind.is_bigint() {
            return rt.throw_type_error("Content type mismatch");
        }
        let src_len = rt.typed_array_length(src)?;
        if offset + src_len as f64 > len as f64 {
            return rt.throw_range_error("offset is out of bounds");
        }
        // Read everything first; the two views may share a buffer.
        let mut values = Vec::with_capacity(src_len);
        for i in 0..src_len {
            values.push(rt.typed_array_get(src, i)?.unwrap_or(Value::Undefined));
        }
        for (i, v) in values.into_iter().enumerate() {
            rt.typed_array_set(view, offset as usize + i, v)?;
        }
        return Ok(Value::Undefined);
    }

    let src = Value::Object(rt.to_object(&source)?);
    rt.root(src.clone());
    let src_len = length_of(rt, &src)?;
    if offset + src_len as f64 > len as f64 {
        return rt.throw_range_error("offset is out of bounds");
    }
    let marker = rt.gc_scope_marker();
    for i in 0..src_len {
        rt.flush_gc_scope(marker);
        let v = rt.get(&src, &index_key(i))?;
        rt.root(v.clone());
        rt.typed_array_set(view, offset as usize + i as usize, v)?;
    }
    Ok(Value::Undefined)
}

fn view_slice(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (_, data, len) = valid_view(rt, &args.this, "slice")?;
    let start = relative_index(rt, &args.arg(0), len as u64, 0)? as usize;
    let end = relative_index(rt, &args.arg(1), len as u64, len as u64)? as usize;
    let count = end.saturating_sub(start);
    let result = allocate(rt, data.kind, count)?;
    if count > 0 {
        ensure_attached(rt, &data, "slice")?;
        let size = data.kind.element_size();
        let from = data.byte_offset + start * size;
        let copied = rt
            .array_buffer_bytes(data.buffer)?
            .and_then(|bytes| bytes.get(from..from + count * size))
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        if let Some(target) = rt.typed_array_data(result)? {
            if let ObjectClass::ArrayBuffer(Some(bytes)) =
                &mut rt.object_mut(target.buffer)?.class
            {
                let n = copied.len().min(bytes.len());
                bytes[..n].copy_from_slice(&copied[..n]);
            }
        }
    }
    Ok(Value::Object(result))
}

fn view_subarray(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (view, data) = this_view(rt, &args.this, "subarray")?;
    let len = rt.typed_array_length(view)? as u64;
    let begin = relative_index(rt, &args.arg(0), len, 0)?;
    let end = relative_index(rt, &args.arg(1), len, len)?;
    let count = end.saturating_sub(begin) as usize;
    let offset = data.byte_offset + begin as usize * data.kind.element_size();
    Ok(Value::Object(
        rt.new_typed_array(data.kind, data.buffer, offset, count)?,
    ))
}
