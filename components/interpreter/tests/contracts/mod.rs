//! Contract tests for interpreter API
//!
//! These tests pin the host-facing surface: runtime construction, module
//! loading, the native calling convention and the error taxonomy.

use std::rc::Rc;

use bytecode_system::{BytecodeModule, FunctionBuilder, ModuleBuilder, Opcode, RegisterId};
use core_types::{ErrorKind, Value};
use interpreter::{
    CallArgs, EngineError, FatalError, JsResult, PropertyKey, Runtime, RuntimeConfig, Throw,
};
use memory_manager::HeapConfig;

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig::default()).unwrap()
}

fn single_function(build: impl FnOnce(&mut FunctionBuilder, &mut ModuleBuilder)) -> BytecodeModule {
    let mut m = ModuleBuilder::new("contract.js");
    let mut main = FunctionBuilder::new("main", 0);
    build(&mut main, &mut m);
    m.add_function(main.finish().unwrap());
    m.finish().unwrap()
}

/// Test Runtime::new() provides a realm with distinct intrinsics
#[test]
fn test_runtime_new_contract() {
    let rt = runtime();
    let i = rt.intrinsics();
    assert_ne!(i.object_prototype, i.function_prototype);
    assert_ne!(i.global, i.object_prototype);
    assert_eq!(rt.global_object(), i.global);
    assert_eq!(rt.frame_depth(), 0);
}

/// Test RuntimeConfig builders clamp limits to at least one
#[test]
fn test_runtime_config_contract() {
    let config = RuntimeConfig::default()
        .with_max_frames(0)
        .with_max_native_depth(0)
        .with_max_prototype_chain(0);
    assert_eq!(config.max_frames, 1);
    assert_eq!(config.max_native_depth, 1);
    assert_eq!(config.max_prototype_chain, 1);
}

/// Test load_module() rejects an out-of-range entry function
#[test]
fn test_load_module_rejects_bad_entry() {
    let mut module = single_function(|f, _| {
        let r = f.reg();
        f.emit(Opcode::Return { value: r });
    });
    module.entry = 7;
    let err = runtime().load_module(module).unwrap_err();
    assert!(matches!(err, EngineError::Fatal(FatalError::MalformedBytecode(_))));
}

/// Test malformed register operands are fatal, not script exceptions
#[test]
fn test_bad_register_is_fatal() {
    let module = single_function(|f, _| {
        f.emit(Opcode::Return { value: RegisterId(99) });
    });
    let mut rt = runtime();
    let id = rt.load_module(module).unwrap();
    let err = rt.run_module(id).unwrap_err();
    assert!(matches!(err, EngineError::Fatal(FatalError::MalformedBytecode(_))));
    assert!(err.thrown_value().is_none());
    assert_eq!(rt.frame_depth(), 0);
}

/// Test a non-string name operand is fatal
#[test]
fn test_non_string_name_is_fatal() {
    let module = single_function(|f, m| {
        let n = m.number(1.0);
        let r = f.reg();
        f.emit(Opcode::GetGlobal { dst: r, name: n });
        f.emit(Opcode::Return { value: r });
    });
    let mut rt = runtime();
    let id = rt.load_module(module).unwrap();
    assert!(matches!(
        rt.run_module(id),
        Err(EngineError::Fatal(FatalError::MalformedBytecode(_)))
    ));
}

fn add_magic(_rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let base = args.arg(0).as_number().unwrap_or(0.0);
    Ok(Value::number(base + args.magic as f64))
}

/// Test natives registered on the global object are callable from bytecode
#[test]
fn test_register_native_contract() {
    let module = single_function(|f, m| {
        let name = m.string("addMagic");
        let (callee, undef, arg, out) = (f.reg(), f.reg(), f.reg(), f.reg());
        f.emit(Opcode::GetGlobal { dst: callee, name });
        f.emit(Opcode::LoadUndefined { dst: undef });
        f.emit(Opcode::LoadInt { dst: arg, value: 40 });
        f.emit(Opcode::Call { dst: out, callee, this: undef, first_arg: arg, argc: 1 });
        f.emit(Opcode::Return { value: out });
    });
    let mut rt = runtime();
    let f = rt.new_native("addMagic", 1, add_magic, 2, false).unwrap();
    let global = rt.global_object();
    rt.define_hidden(global, PropertyKey::from("addMagic"), Value::Object(f))
        .unwrap();
    let id = rt.load_module(module).unwrap();
    assert_eq!(rt.run_module(id).unwrap(), Value::number(42.0));

    let g = Value::Object(f);
    assert_eq!(rt.get_by_name(&g, "name").unwrap(), Value::string("addMagic"));
    assert_eq!(rt.get_by_name(&g, "length").unwrap(), Value::number(1.0));
}

fn report_new_target(_rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(args.is_construct()))
}

/// Test construct() passes new.target to native constructors
#[test]
fn test_native_construct_contract() {
    let mut rt = runtime();
    let ctor = rt.new_native("Probe", 0, report_new_target, 0, true).unwrap();
    let plain = rt.new_native_function("plain", 0, report_new_target).unwrap();
    let ctor = Value::Object(ctor);
    assert_eq!(rt.construct(&ctor, vec![], None).unwrap(), Value::Boolean(true));
    assert_eq!(
        rt.call(&ctor, Value::Undefined, vec![]).unwrap(),
        Value::Boolean(false)
    );
    let err = rt.construct(&Value::Object(plain), vec![], None).unwrap_err();
    let Throw::Value(v) = err else { panic!("expected TypeError") };
    assert_eq!(rt.describe_exception(&v).kind, ErrorKind::TypeError);
}

fn recurse_natively(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    rt.call(&Value::Object(args.callee), Value::Undefined, vec![])
}

/// Test runaway native recursion is a RangeError, not a host stack overflow
#[test]
fn test_native_depth_limit() {
    let mut rt = Runtime::new(RuntimeConfig::default().with_max_native_depth(16)).unwrap();
    let f = rt.new_native_function("deep", 0, recurse_natively).unwrap();
    let err = rt.call(&Value::Object(f), Value::Undefined, vec![]).unwrap_err();
    let Throw::Value(v) = err else { panic!("expected RangeError") };
    let described = rt.describe_exception(&v);
    assert_eq!(described.kind, ErrorKind::RangeError);
    assert_eq!(described.message, "Maximum call stack size exceeded (native stack depth)");
    assert!(described.stack.iter().all(|frame| frame.is_native));
}

/// Test heap exhaustion surfaces as a catchable RangeError
#[test]
fn test_out_of_memory_contract() {
    let module = single_function(|f, m| {
        let name = m.string("next");
        let (head, node) = (f.reg(), f.reg());
        let top = f.new_label();
        f.emit(Opcode::NewObject { dst: head });
        f.bind(top);
        f.emit(Opcode::NewObject { dst: node });
        f.put_by_id(node, name, head);
        f.emit(Opcode::Mov { dst: head, src: node });
        f.jmp(top);
    });
    let heap = HeapConfig::default().with_max_heap(256 * 1024);
    let mut rt = Runtime::new(RuntimeConfig::default().with_heap(heap)).unwrap();
    let id = rt.load_module(module).unwrap();
    let Err(EngineError::Uncaught { error, .. }) = rt.run_module(id) else {
        panic!("expected an uncaught RangeError");
    };
    assert_eq!(error.kind, ErrorKind::RangeError);
    assert_eq!(error.message, "Out of memory");
}

/// Test host data slots are keyed by type
#[test]
fn test_host_data_contract() {
    #[derive(Debug, PartialEq)]
    struct Marker(u32);
    let mut rt = runtime();
    assert!(rt.host_data::<Marker>().is_none());
    rt.set_host_data(Marker(3));
    assert_eq!(rt.host_data::<Marker>(), Some(&Marker(3)));
    assert!(rt.host_data::<String>().is_none());
}

/// Test symbols keep their descriptions
#[test]
fn test_symbol_contract() {
    let mut rt = runtime();
    let a = rt.new_symbol(Some(Rc::from("tag")));
    let b = rt.new_symbol(None);
    assert_ne!(a, b);
    assert_eq!(rt.symbol_description(a).as_deref(), Some("tag"));
    assert_eq!(rt.symbol_description(b), None);
}

/// Test strict writes to undeclared globals are ReferenceErrors
#[test]
fn test_strict_global_assignment_contract() {
    let mut m = ModuleBuilder::new("strict.js");
    let name = m.string("undeclared");
    let mut main = FunctionBuilder::new("main", 0).strict();
    let r = main.reg();
    main.emit(Opcode::LoadInt { dst: r, value: 1 });
    main.emit(Opcode::PutGlobal { name, value: r });
    main.emit(Opcode::Return { value: r });
    m.add_function(main.finish().unwrap());

    let mut rt = runtime();
    let id = rt.load_module(m.finish().unwrap()).unwrap();
    let Err(EngineError::Uncaught { error, .. }) = rt.run_module(id) else {
        panic!("expected a ReferenceError");
    };
    assert_eq!(error.kind, ErrorKind::ReferenceError);
    assert_eq!(error.message, "undeclared is not defined");
}
