//! JavaScript standard library for the interpreter runtime
//!
//! This crate fills the realm's intrinsic objects with the built-in
//! constructors, prototypes and functions scripts expect:
//! - `Object`, `Function.prototype`, `Array`, the error constructors
//! - `String`, `Number`, `Boolean`, `Symbol`, `BigInt` and their prototypes
//! - `Math`, `JSON`, `console`
//! - `ArrayBuffer` and the typed-array constructors
//! - `Map`, `Set`, `WeakMap`, `WeakSet` and `WeakRef`
//! - the generator and iterator prototypes
//! - host globals such as `gc`, `isNaN` and `detachArrayBuffer`
//!
//! # Example
//!
//! ```
//! use builtins::{install, CaptureWriter};
//! use core_types::Value;
//! use interpreter::{Runtime, RuntimeConfig};
//!
//! let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
//! let console = CaptureWriter::new();
//! install(&mut rt, Box::new(console.clone())).unwrap();
//!
//! let global = Value::Object(rt.global_object());
//! let console_object = rt.get_by_name(&global, "console").unwrap();
//! rt.invoke(&console_object, "log", vec![Value::string("hi"), Value::number(3.0)]).unwrap();
//! assert_eq!(console.lines(), vec!["hi 3"]);
//! ```

#![warn(clippy::all)]

pub mod array;
pub mod bigint;
pub mod boolean;
pub mod collections;
pub mod console;
pub mod error;
pub mod function;
pub mod global;
pub mod iterator;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod string;
pub mod symbol;
pub mod typed_arrays;

pub use console::{CaptureWriter, ConsoleLevel, ConsoleWriter, StdoutWriter};

use core_types::{HeapRef, SymbolId, Value};
use interpreter::{
    JsResult, NativeFunction, PropertyDescriptor, PropertyFlags, PropertyKey, Runtime,
};
use tracing::debug;

/// Populate the realm of `rt` with the standard library.
///
/// Console output goes to `console`.
pub fn install(rt: &mut Runtime, console: Box<dyn ConsoleWriter>) -> JsResult<()> {
    object::install(rt)?;
    function::install(rt)?;
    array::install(rt)?;
    error::install(rt)?;
    string::install(rt)?;
    number::install(rt)?;
    boolean::install(rt)?;
    symbol::install(rt)?;
    bigint::install(rt)?;
    collections::install(rt)?;
    math::install(rt)?;
    json::install(rt)?;
    iterator::install(rt)?;
    typed_arrays::install(rt)?;
    console::install(rt, console)?;
    global::install(rt)?;
    debug!(target: "engine::interp", "builtins installed");
    Ok(())
}

/// Define a builtin method on `obj`.
pub(crate) fn method(
    rt: &mut Runtime,
    obj: HeapRef,
    name: &str,
    arity: u32,
    func: NativeFunction,
) -> JsResult<HeapRef> {
    method_with_magic(rt, obj, name, arity, func, 0)
}

pub(crate) fn method_with_magic(
    rt: &mut Runtime,
    obj: HeapRef,
    name: &str,
    arity: u32,
    func: NativeFunction,
    magic: u32,
) -> JsResult<HeapRef> {
    let f = rt.new_native(name, arity, func, magic, false)?;
    rt.define_hidden(obj, PropertyKey::from(name), Value::Object(f))?;
    Ok(f)
}

/// Define a method keyed by a well-known symbol, named `[description]`.
pub(crate) fn symbol_method(
    rt: &mut Runtime,
    obj: HeapRef,
    symbol: SymbolId,
    name: &str,
    arity: u32,
    func: NativeFunction,
) -> JsResult<HeapRef> {
    let f = rt.new_native(name, arity, func, 0, false)?;
    rt.define_hidden(obj, PropertyKey::Symbol(symbol), Value::Object(f))?;
    Ok(f)
}

/// Define a non-enumerable, configurable accessor with only a getter.
pub(crate) fn getter(
    rt: &mut Runtime,
    obj: HeapRef,
    name: &str,
    func: NativeFunction,
) -> JsResult<()> {
    let f = rt.new_native(&format!("get {}", name), 0, func, 0, false)?;
    let desc = PropertyDescriptor::accessor(Value::Object(f), Value::Undefined, false, true);
    rt.define_own_property(obj, &PropertyKey::from(name), desc)?;
    Ok(())
}

/// Define a read-only, non-configurable constant.
pub(crate) fn constant(rt: &mut Runtime, obj: HeapRef, name: &str, value: Value) -> JsResult<()> {
    rt.define_property_or_throw(obj, PropertyKey::from(name), value, PropertyFlags::FROZEN)
}

/// Create a constructor wired to `prototype` and expose it on the global
/// object.
pub(crate) fn constructor(
    rt: &mut Runtime,
    name: &str,
    arity: u32,
    func: NativeFunction,
    magic: u32,
    prototype: HeapRef,
) -> JsResult<HeapRef> {
    let ctor = rt.new_native(name, arity, func, magic, true)?;
    rt.define_property_or_throw(
        ctor,
        PropertyKey::from("prototype"),
        Value::Object(prototype),
        PropertyFlags::FROZEN,
    )?;
    rt.define_hidden(prototype, PropertyKey::from("constructor"), Value::Object(ctor))?;
    let global = rt.global_object();
    rt.define_hidden(global, PropertyKey::from(name), Value::Object(ctor))?;
    Ok(ctor)
}

/// A plain object exposed as global `name` (`Math`, `JSON`, ...).
pub(crate) fn namespace(rt: &mut Runtime, name: &str) -> JsResult<HeapRef> {
    let obj = rt.new_object()?;
    let global = rt.global_object();
    rt.define_hidden(global, PropertyKey::from(name), Value::Object(obj))?;
    Ok(obj)
}

/// `ToLength(Get(obj, "length"))`.
pub(crate) fn length_of(rt: &mut Runtime, obj: &Value) -> JsResult<u64> {
    let len = rt.get_by_name(obj, "length")?;
    let n = rt.to_integer(&len)?;
    Ok(n.clamp(0.0, 9_007_199_254_740_991.0) as u64)
}

/// Resolve a relative index argument (`slice`, `fill`, ...) against `len`.
///
/// Undefined yields `default`.
pub(crate) fn relative_index(
    rt: &mut Runtime,
    value: &Value,
    len: u64,
    default: u64,
) -> JsResult<u64> {
    if matches!(value, Value::Undefined) {
        return Ok(default);
    }
    let rel = rt.to_integer(value)?;
    let len_f = len as f64;
    Ok(if rel < 0.0 {
        (len_f + rel).max(0.0) as u64
    } else {
        rel.min(len_f) as u64
    })
}

/// `{ value, done }`.
pub(crate) fn iter_result(rt: &mut Runtime, value: Value, done: bool) -> JsResult<Value> {
    let obj = rt.new_object()?;
    rt.create_data_property(obj, &PropertyKey::from("value"), value)?;
    rt.create_data_property(obj, &PropertyKey::from("done"), Value::Boolean(done))?;
    Ok(Value::Object(obj))
}

/// Short description of a value for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Object(_) => String::from("object"),
        Value::Symbol(_) => String::from("Symbol()"),
        Value::BigInt(b) => format!("{}n", b),
        other => other.to_string(),
    }
}
