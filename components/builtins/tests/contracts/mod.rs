//! Contract tests for builtins component
//!
//! These tests run hand-assembled bytecode against a runtime with the
//! library installed, checking what scripts observe of the built-ins.

use builtins::{install, CaptureWriter, ConsoleLevel};
use bytecode_system::{FunctionBuilder, ModuleBuilder, Opcode};
use core_types::{ErrorKind, Value};
use interpreter::{CallArgs, EngineError, JsResult, PropertyKey, Runtime, RuntimeConfig};

fn host() -> (Runtime, CaptureWriter) {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    let console = CaptureWriter::new();
    install(&mut rt, Box::new(console.clone())).unwrap();
    (rt, console)
}

/// Run `main`, built by `build`, as the module entry.
fn run(
    rt: &mut Runtime,
    build: impl FnOnce(&mut FunctionBuilder, &mut ModuleBuilder),
) -> Result<Value, EngineError> {
    let mut m = ModuleBuilder::new("contract.js");
    let mut main = FunctionBuilder::new("main", 0);
    build(&mut main, &mut m);
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);
    let id = rt.load_module(m.finish().unwrap()).unwrap();
    rt.run_module(id)
}

/// `dst = global[ns][name]`, with `ns` left in `holder`.
fn load_method(
    f: &mut FunctionBuilder,
    m: &mut ModuleBuilder,
    holder: bytecode_system::RegisterId,
    dst: bytecode_system::RegisterId,
    ns: &str,
    name: &str,
) {
    let ns = m.string(ns);
    let name = m.string(name);
    f.emit(Opcode::GetGlobal { dst: holder, name: ns });
    f.get_by_id(dst, holder, name);
}

#[test]
fn test_console_log_from_script() {
    let (mut rt, console) = host();
    run(&mut rt, |f, m| {
        let (console_obj, log, args) = (f.reg(), f.reg(), f.regs(2));
        load_method(f, m, console_obj, log, "console", "log");
        let hello = m.string("hello");
        f.emit(Opcode::LoadConst { dst: args, index: hello });
        f.emit(Opcode::LoadInt {
            dst: bytecode_system::RegisterId(args.0 + 1),
            value: 42,
        });
        let out = f.reg();
        f.emit(Opcode::Call {
            dst: out,
            callee: log,
            this: console_obj,
            first_arg: args,
            argc: 2,
        });
        f.emit(Opcode::Return { value: out });
    })
    .unwrap();
    assert_eq!(console.entries(), vec![(ConsoleLevel::Log, String::from("hello 42"))]);
}

#[test]
fn test_script_catches_builtin_range_error() {
    let (mut rt, _) = host();
    let result = run(&mut rt, |f, m| {
        let (array, len, obj, e, ctor, ok) = (f.reg(), f.reg(), f.reg(), f.reg(), f.reg(), f.reg());
        let array_name = m.string("Array");
        let range_error = m.string("RangeError");
        let (start, end, handler) = (f.new_label(), f.new_label(), f.new_label());
        f.bind(start);
        f.emit(Opcode::GetGlobal { dst: array, name: array_name });
        f.emit(Opcode::LoadInt { dst: len, value: -1 });
        f.emit(Opcode::Construct {
            dst: obj,
            callee: array,
            first_arg: len,
            argc: 1,
        });
        f.bind(end);
        f.emit(Opcode::LoadBool { dst: ok, value: false });
        f.emit(Opcode::Return { value: ok });
        f.bind(handler);
        f.emit(Opcode::Catch { dst: e });
        f.emit(Opcode::GetGlobal { dst: ctor, name: range_error });
        f.emit(Opcode::InstanceOf { dst: ok, lhs: e, rhs: ctor });
        f.emit(Opcode::Return { value: ok });
        f.handler(start, end, handler);
    });
    assert_eq!(result.unwrap(), Value::Boolean(true));
}

#[test]
fn test_uncaught_builtin_error_reaches_host() {
    let (mut rt, _) = host();
    let result = run(&mut rt, |f, m| {
        let (obj, keys, arg, out) = (f.reg(), f.reg(), f.reg(), f.reg());
        load_method(f, m, obj, keys, "Object", "keys");
        f.emit(Opcode::LoadNull { dst: arg });
        f.emit(Opcode::Call {
            dst: out,
            callee: keys,
            this: obj,
            first_arg: arg,
            argc: 1,
        });
        f.emit(Opcode::Return { value: out });
    });
    let Err(EngineError::Uncaught { error, rendered, .. }) = result else {
        panic!("expected an uncaught exception");
    };
    assert_eq!(error.kind, ErrorKind::TypeError);
    assert!(rendered.starts_with("TypeError: Cannot convert undefined or null to object"));
    assert!(rendered.contains("contract.js"));
}

#[test]
fn test_json_round_trip_from_script() {
    let (mut rt, _) = host();
    let result = run(&mut rt, |f, m| {
        let (json, parse, stringify, text, parsed, out) =
            (f.reg(), f.reg(), f.reg(), f.reg(), f.reg(), f.reg());
        let json_name = m.string("JSON");
        let parse_name = m.string("parse");
        let stringify_name = m.string("stringify");
        let source = m.string(r#"{"a":[1,2,{"b":null}],"c":"é"}"#);
        f.emit(Opcode::GetGlobal { dst: json, name: json_name });
        f.get_by_id(parse, json, parse_name);
        f.get_by_id(stringify, json, stringify_name);
        f.emit(Opcode::LoadConst { dst: text, index: source });
        f.emit(Opcode::Call {
            dst: parsed,
            callee: parse,
            this: json,
            first_arg: text,
            argc: 1,
        });
        f.emit(Opcode::Call {
            dst: out,
            callee: stringify,
            this: json,
            first_arg: parsed,
            argc: 1,
        });
        f.emit(Opcode::Return { value: out });
    });
    assert_eq!(
        result.unwrap(),
        Value::string("{\"a\":[1,2,{\"b\":null}],\"c\":\"\u{e9}\"}")
    );
}

#[test]
fn test_generator_objects_are_iterable() {
    let (mut rt, _) = host();
    // function* g() { yield 1; yield 2; return 3; }  Array.from(g())
    let result = run(&mut rt, |f, m| {
        let mut g = FunctionBuilder::new("g", 0).generator();
        let (v, ret, k) = (g.reg(), g.reg(), g.reg());
        g.emit(Opcode::ResumeGenerator { dst: v, is_return: ret });
        g.emit(Opcode::LoadInt { dst: k, value: 1 });
        g.emit(Opcode::Yield { value: k });
        g.emit(Opcode::ResumeGenerator { dst: v, is_return: ret });
        g.emit(Opcode::LoadInt { dst: k, value: 2 });
        g.emit(Opcode::Yield { value: k });
        g.emit(Opcode::ResumeGenerator { dst: v, is_return: ret });
        g.emit(Opcode::LoadInt { dst: k, value: 3 });
        g.emit(Opcode::Return { value: k });
        let g_index = m.add_function(g.finish().unwrap());

        let (undef, closure, gen, array, from, out) =
            (f.reg(), f.reg(), f.reg(), f.reg(), f.reg(), f.reg());
        f.emit(Opcode::LoadUndefined { dst: undef });
        f.emit(Opcode::CreateClosure {
            dst: closure,
            env: undef,
            function: g_index,
        });
        f.emit(Opcode::Call {
            dst: gen,
            callee: closure,
            this: undef,
            first_arg: undef,
            argc: 0,
        });
        load_method(f, m, array, from, "Array", "from");
        f.emit(Opcode::Call {
            dst: out,
            callee: from,
            this: array,
            first_arg: gen,
            argc: 1,
        });
        f.emit(Opcode::Return { value: out });
    });
    let arr = result.unwrap();
    let joined = rt.invoke(&arr, "join", vec![]).unwrap();
    assert_eq!(joined, Value::string("1,2"));
}

fn detach_global_buffer(rt: &mut Runtime, _args: &CallArgs) -> JsResult<Value> {
    let global = Value::Object(rt.global_object());
    if let Value::Object(buf) = rt.get_by_name(&global, "victim")? {
        rt.detach_array_buffer(buf)?;
    }
    Ok(Value::number(0.0))
}

#[test]
fn test_copy_within_rechecks_detachment_after_conversion() {
    let (mut rt, _) = host();
    let buffer = rt.new_array_buffer(8).unwrap();
    let global = rt.global_object();
    rt.create_data_property(global, &PropertyKey::from("victim"), Value::Object(buffer))
        .unwrap();
    let view = rt
        .new_typed_array(interpreter::TypedArrayKind::Uint8, buffer, 0, 8)
        .unwrap();

    let evil = rt.new_object().unwrap();
    let value_of = rt
        .new_native_function("valueOf", 0, detach_global_buffer)
        .unwrap();
    rt.create_data_property(evil, &PropertyKey::from("valueOf"), Value::Object(value_of))
        .unwrap();

    let err = rt
        .invoke(
            &Value::Object(view),
            "copyWithin",
            vec![Value::number(0.0), Value::Object(evil)],
        )
        .unwrap_err();
    let described = rt.describe_exception(err.value().unwrap());
    assert_eq!(described.kind, ErrorKind::TypeError);
    assert!(rt.is_detached(buffer).unwrap());
    assert_eq!(rt.typed_array_length(view).unwrap(), 0);
}

#[test]
fn test_gc_global_preserves_script_state() {
    let (mut rt, console) = host();
    let result = run(&mut rt, |f, m| {
        let (obj, val, gc, undef, out, cons, log) =
            (f.reg(), f.reg(), f.reg(), f.reg(), f.reg(), f.reg(), f.reg());
        let key = m.string("kept");
        let gc_name = m.string("gc");
        f.emit(Opcode::NewObject { dst: obj });
        f.emit(Opcode::LoadInt { dst: val, value: 7 });
        f.put_by_id(obj, key, val);
        f.emit(Opcode::LoadUndefined { dst: undef });
        f.emit(Opcode::GetGlobal { dst: gc, name: gc_name });
        f.emit(Opcode::Call {
            dst: out,
            callee: gc,
            this: undef,
            first_arg: undef,
            argc: 0,
        });
        f.get_by_id(val, obj, key);
        load_method(f, m, cons, log, "console", "log");
        f.emit(Opcode::Call {
            dst: out,
            callee: log,
            this: cons,
            first_arg: val,
            argc: 1,
        });
        f.emit(Opcode::Return { value: val });
    });
    assert_eq!(result.unwrap(), Value::number(7.0));
    assert_eq!(console.lines(), vec!["7"]);
}
