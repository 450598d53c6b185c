//! Integration tests for interpreter
//!
//! Hand-assembled programs run end to end through the dispatch loop:
//! calls, closures, handlers, generators, constructors and the heap.

use bytecode_system::{FunctionBuilder, ModuleBuilder, Opcode};
use core_types::{ErrorKind, HeapRef, Value};
use interpreter::{
    CallArgs, EngineError, FatalError, GeneratorState, InterruptMode, JsResult, PropertyDescriptor,
    PropertyFlags, PropertyKey, ResumeMode, Runtime, RuntimeConfig, Throw,
};
use memory_manager::HeapConfig;

fn run_with(config: RuntimeConfig, module: ModuleBuilder) -> (Runtime, Result<Value, EngineError>) {
    let mut rt = Runtime::new(config).unwrap();
    let id = rt.load_module(module.finish().unwrap()).unwrap();
    let result = rt.run_module(id);
    (rt, result)
}

fn run(module: ModuleBuilder) -> (Runtime, Result<Value, EngineError>) {
    run_with(RuntimeConfig::default(), module)
}

/// `main` returning the closure of function `index`.
fn return_closure(m: &mut ModuleBuilder, index: u32) {
    let mut main = FunctionBuilder::new("main", 0);
    let undef = main.reg();
    let f = main.reg();
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateClosure {
        dst: f,
        env: undef,
        function: index,
    });
    main.emit(Opcode::Return { value: f });
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);
}

#[test]
fn test_recursive_fibonacci() {
    let mut m = ModuleBuilder::new("fib.js");
    let fib_name = m.string("fib");
    let fib = m.reserve_function();

    let mut f = FunctionBuilder::new("fib", 1);
    let n = f.param(0);
    let (two, one, cond) = (f.reg(), f.reg(), f.reg());
    let (callee, this, arg, a, b) = (f.reg(), f.reg(), f.reg(), f.reg(), f.reg());
    let recurse = f.new_label();
    f.emit(Opcode::LoadInt { dst: two, value: 2 });
    f.emit(Opcode::Less { dst: cond, lhs: n, rhs: two });
    f.jmp_false(cond, recurse);
    f.emit(Opcode::Return { value: n });
    f.bind(recurse);
    f.emit(Opcode::GetGlobal { dst: callee, name: fib_name });
    f.emit(Opcode::LoadUndefined { dst: this });
    f.emit(Opcode::LoadInt { dst: one, value: 1 });
    f.emit(Opcode::Sub { dst: arg, lhs: n, rhs: one });
    f.emit(Opcode::Call { dst: a, callee, this, first_arg: arg, argc: 1 });
    f.emit(Opcode::Sub { dst: arg, lhs: n, rhs: two });
    f.emit(Opcode::Call { dst: b, callee, this, first_arg: arg, argc: 1 });
    f.emit(Opcode::Add { dst: a, lhs: a, rhs: b });
    f.emit(Opcode::Return { value: a });
    m.define_function(fib, f.finish().unwrap());

    let mut main = FunctionBuilder::new("main", 0);
    let (undef, closure, arg, result) = (main.reg(), main.reg(), main.reg(), main.reg());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateClosure { dst: closure, env: undef, function: fib });
    main.emit(Opcode::PutGlobal { name: fib_name, value: closure });
    main.emit(Opcode::LoadInt { dst: arg, value: 10 });
    main.emit(Opcode::Call { dst: result, callee: closure, this: undef, first_arg: arg, argc: 1 });
    main.emit(Opcode::Return { value: result });
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);

    let (rt, result) = run(m);
    assert_eq!(result.unwrap(), Value::number(55.0));
    assert_eq!(rt.frame_depth(), 0);
}

#[test]
fn test_closures_share_their_environment() {
    let mut m = ModuleBuilder::new("counter.js");

    // function () { return ++count; }
    let mut inc = FunctionBuilder::new("", 0).not_constructor();
    let (env, v) = (inc.reg(), inc.reg());
    inc.emit(Opcode::GetEnvironment { dst: env, depth: 0 });
    inc.emit(Opcode::LoadFromEnvironment { dst: v, env, slot: 0 });
    inc.emit(Opcode::Inc { dst: v, src: v });
    inc.emit(Opcode::StoreToEnvironment { env, slot: 0, value: v });
    inc.emit(Opcode::Return { value: v });
    let inc = m.add_function(inc.finish().unwrap());

    // function makeCounter() { let count = 0; return () => ++count; }
    let mut make = FunctionBuilder::new("makeCounter", 0);
    let (env, zero, closure) = (make.reg(), make.reg(), make.reg());
    make.emit(Opcode::CreateEnvironment { dst: env, size: 1 });
    make.emit(Opcode::LoadInt { dst: zero, value: 0 });
    make.emit(Opcode::StoreToEnvironment { env, slot: 0, value: zero });
    make.emit(Opcode::CreateClosure { dst: closure, env, function: inc });
    make.emit(Opcode::Return { value: closure });
    let make = m.add_function(make.finish().unwrap());

    let mut main = FunctionBuilder::new("main", 0);
    let (undef, maker, c1, c2, r1, r2, ten) = (
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
    );
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateClosure { dst: maker, env: undef, function: make });
    main.emit(Opcode::Call { dst: c1, callee: maker, this: undef, first_arg: undef, argc: 0 });
    main.emit(Opcode::Call { dst: c2, callee: maker, this: undef, first_arg: undef, argc: 0 });
    for _ in 0..3 {
        main.emit(Opcode::Call { dst: r1, callee: c1, this: undef, first_arg: undef, argc: 0 });
    }
    main.emit(Opcode::Call { dst: r2, callee: c2, this: undef, first_arg: undef, argc: 0 });
    main.emit(Opcode::LoadInt { dst: ten, value: 10 });
    main.emit(Opcode::Mul { dst: r1, lhs: r1, rhs: ten });
    main.emit(Opcode::Add { dst: r1, lhs: r1, rhs: r2 });
    main.emit(Opcode::Return { value: r1 });
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);

    let (_rt, result) = run(m);
    assert_eq!(result.unwrap(), Value::number(31.0));
}

#[test]
fn test_engine_type_error_is_catchable() {
    let mut m = ModuleBuilder::new("catch.js");
    let message = m.string("message");
    let mut main = FunctionBuilder::new("main", 0);
    let (undef, r, e, msg) = (main.reg(), main.reg(), main.reg(), main.reg());
    let (start, end, handler) = (main.new_label(), main.new_label(), main.new_label());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.bind(start);
    main.emit(Opcode::Call { dst: r, callee: undef, this: undef, first_arg: undef, argc: 0 });
    main.bind(end);
    main.emit(Opcode::Return { value: r });
    main.bind(handler);
    main.emit(Opcode::Catch { dst: e });
    main.get_by_id(msg, e, message);
    main.emit(Opcode::Return { value: msg });
    main.handler(start, end, handler);
    m.add_function(main.finish().unwrap());

    let (_rt, result) = run(m);
    assert_eq!(result.unwrap(), Value::string("undefined is not a function"));
}

#[test]
fn test_finally_runs_and_rethrows() {
    let mut m = ModuleBuilder::new("finally.js");
    let x = m.string("x");
    let side = m.string("side");

    // function inner() { try { throw "x"; } finally { side = 1; } }
    let mut inner = FunctionBuilder::new("inner", 0);
    let (k, e, one) = (inner.reg(), inner.reg(), inner.reg());
    let (start, end, fin) = (inner.new_label(), inner.new_label(), inner.new_label());
    inner.bind(start);
    inner.emit(Opcode::LoadConst { dst: k, index: x });
    inner.emit(Opcode::Throw { value: k });
    inner.bind(end);
    inner.bind(fin);
    inner.emit(Opcode::Catch { dst: e });
    inner.emit(Opcode::LoadInt { dst: one, value: 1 });
    inner.emit(Opcode::PutGlobal { name: side, value: one });
    inner.emit(Opcode::Throw { value: e });
    inner.handler(start, end, fin);
    let inner = m.add_function(inner.finish().unwrap());

    // try { inner(); } catch (e) { return e + side; }
    let mut main = FunctionBuilder::new("main", 0);
    let (undef, f, r, e, s) = (main.reg(), main.reg(), main.reg(), main.reg(), main.reg());
    let (start, end, handler) = (main.new_label(), main.new_label(), main.new_label());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateClosure { dst: f, env: undef, function: inner });
    main.bind(start);
    main.emit(Opcode::Call { dst: r, callee: f, this: undef, first_arg: undef, argc: 0 });
    main.bind(end);
    main.emit(Opcode::Return { value: r });
    main.bind(handler);
    main.emit(Opcode::Catch { dst: e });
    main.emit(Opcode::GetGlobal { dst: s, name: side });
    main.emit(Opcode::Add { dst: e, lhs: e, rhs: s });
    main.emit(Opcode::Return { value: e });
    main.handler(start, end, handler);
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);

    let (rt, result) = run(m);
    assert_eq!(result.unwrap(), Value::string("x1"));
    assert_eq!(rt.frame_depth(), 0);
}

#[test]
fn test_uncaught_error_reports_stack() {
    let mut m = ModuleBuilder::new("t.js");
    let mut main = FunctionBuilder::new("main", 0);
    let (undef, r) = (main.reg(), main.reg());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::Call { dst: r, callee: undef, this: undef, first_arg: undef, argc: 0 });
    main.emit(Opcode::Return { value: r });
    m.add_function(main.finish().unwrap());

    let (rt, result) = run(m);
    let Err(EngineError::Uncaught { error, rendered, .. }) = result else {
        panic!("expected an uncaught exception");
    };
    assert_eq!(error.kind, ErrorKind::TypeError);
    assert_eq!(error.message, "undefined is not a function");
    assert!(rendered.starts_with("TypeError: undefined is not a function"));
    assert!(rendered.contains("at main (t.js"));
    assert_eq!(rt.frame_depth(), 0);
}

#[test]
fn test_uncaught_primitive_renders_plainly() {
    let mut m = ModuleBuilder::new("t.js");
    let boom = m.string("boom");
    let mut main = FunctionBuilder::new("main", 0);
    let k = main.reg();
    main.emit(Opcode::LoadConst { dst: k, index: boom });
    main.emit(Opcode::Throw { value: k });
    m.add_function(main.finish().unwrap());

    let (_rt, result) = run(m);
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Uncaught boom");
    assert_eq!(err.thrown_value(), Some(&Value::string("boom")));
}

fn counting_generator(m: &mut ModuleBuilder) -> u32 {
    // function* g() { yield 1; yield 2; return 3; }
    let mut g = FunctionBuilder::new("g", 0).generator();
    let (v, ret, k) = (g.reg(), g.reg(), g.reg());
    let cont = g.new_label();
    g.emit(Opcode::ResumeGenerator { dst: v, is_return: ret });
    g.emit(Opcode::LoadInt { dst: k, value: 1 });
    g.emit(Opcode::Yield { value: k });
    g.emit(Opcode::ResumeGenerator { dst: v, is_return: ret });
    g.jmp_false(ret, cont);
    g.emit(Opcode::Return { value: v });
    g.bind(cont);
    g.emit(Opcode::LoadInt { dst: k, value: 2 });
    g.emit(Opcode::Yield { value: k });
    g.emit(Opcode::ResumeGenerator { dst: v, is_return: ret });
    g.emit(Opcode::LoadInt { dst: k, value: 3 });
    g.emit(Opcode::Return { value: k });
    m.add_function(g.finish().unwrap())
}

fn start_generator(rt: &mut Runtime, f: &Value) -> core_types::HeapRef {
    match rt.call(f, Value::Undefined, vec![]).unwrap() {
        Value::Object(r) => r,
        other => panic!("generator call returned {:?}", other),
    }
}

#[test]
fn test_generator_runs_to_completion() {
    let mut m = ModuleBuilder::new("gen.js");
    let g = counting_generator(&mut m);
    return_closure(&mut m, g);
    let (mut rt, f) = run(m);
    let f = f.unwrap();

    let gen = start_generator(&mut rt, &f);
    assert_eq!(rt.generator_state(gen).unwrap(), Some(GeneratorState::SuspendedStart));
    let next = |rt: &mut Runtime| rt.generator_resume(gen, ResumeMode::Next, Value::Undefined).unwrap();
    assert_eq!(next(&mut rt), (Value::number(1.0), false));
    assert_eq!(rt.generator_state(gen).unwrap(), Some(GeneratorState::SuspendedYield));
    assert_eq!(next(&mut rt), (Value::number(2.0), false));
    assert_eq!(next(&mut rt), (Value::number(3.0), true));
    assert_eq!(next(&mut rt), (Value::Undefined, true));
    assert_eq!(rt.generator_state(gen).unwrap(), Some(GeneratorState::Completed));
}

#[test]
fn test_generator_return_and_throw() {
    let mut m = ModuleBuilder::new("gen.js");
    let g = counting_generator(&mut m);
    return_closure(&mut m, g);
    let (mut rt, f) = run(m);
    let f = f.unwrap();

    let gen = start_generator(&mut rt, &f);
    rt.generator_resume(gen, ResumeMode::Next, Value::Undefined).unwrap();
    let out = rt.generator_resume(gen, ResumeMode::Return, Value::number(9.0)).unwrap();
    assert_eq!(out, (Value::number(9.0), true));

    let gen = start_generator(&mut rt, &f);
    rt.generator_resume(gen, ResumeMode::Next, Value::Undefined).unwrap();
    let err = rt
        .generator_resume(gen, ResumeMode::Throw, Value::string("boom"))
        .unwrap_err();
    assert!(matches!(err, Throw::Value(Value::String(ref s)) if &**s == "boom"));
    assert_eq!(rt.generator_state(gen).unwrap(), Some(GeneratorState::Completed));

    // Throwing into a generator that never started completes it.
    let gen = start_generator(&mut rt, &f);
    assert!(rt.generator_resume(gen, ResumeMode::Throw, Value::Null).is_err());
    assert_eq!(
        rt.generator_resume(gen, ResumeMode::Next, Value::Undefined).unwrap(),
        (Value::Undefined, true)
    );
}

#[test]
fn test_stack_overflow_is_range_error() {
    let mut m = ModuleBuilder::new("rec.js");
    let rec = m.reserve_function();
    let mut f = FunctionBuilder::new("rec", 0);
    let (me, undef, r) = (f.reg(), f.reg(), f.reg());
    f.emit(Opcode::LoadUndefined { dst: undef });
    f.emit(Opcode::GetEnvironment { dst: me, depth: 0 });
    f.emit(Opcode::LoadFromEnvironment { dst: me, env: me, slot: 0 });
    f.emit(Opcode::Call { dst: r, callee: me, this: undef, first_arg: undef, argc: 0 });
    f.emit(Opcode::Return { value: r });
    m.define_function(rec, f.finish().unwrap());

    let mut main = FunctionBuilder::new("main", 0);
    let (env, f, undef, r) = (main.reg(), main.reg(), main.reg(), main.reg());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateEnvironment { dst: env, size: 1 });
    main.emit(Opcode::CreateClosure { dst: f, env, function: rec });
    main.emit(Opcode::StoreToEnvironment { env, slot: 0, value: f });
    main.emit(Opcode::Call { dst: r, callee: f, this: undef, first_arg: undef, argc: 0 });
    main.emit(Opcode::Return { value: r });
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);

    let (rt, result) = run_with(RuntimeConfig::default().with_max_frames(200), m);
    let Err(EngineError::Uncaught { error, rendered, .. }) = result else {
        panic!("expected a RangeError");
    };
    assert_eq!(error.kind, ErrorKind::RangeError);
    assert_eq!(error.message, "Maximum call stack size exceeded");
    assert!(rendered.contains("... skipping"));
    assert_eq!(rt.frame_depth(), 0);
}

#[test]
fn test_constructor_and_instanceof() {
    let mut m = ModuleBuilder::new("point.js");
    let x = m.string("x");

    // function Point(x) { this.x = x; return 5; }
    let mut point = FunctionBuilder::new("Point", 1);
    let (this, five) = (point.reg(), point.reg());
    point.emit(Opcode::LoadThis { dst: this });
    point.put_by_id(this, x, point.param(0));
    point.emit(Opcode::LoadInt { dst: five, value: 5 });
    point.emit(Opcode::Return { value: five });
    let point = m.add_function(point.finish().unwrap());

    let mut main = FunctionBuilder::new("main", 0);
    let (undef, ctor, arg, p, px, is) = (
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
    );
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateClosure { dst: ctor, env: undef, function: point });
    main.emit(Opcode::LoadInt { dst: arg, value: 3 });
    main.emit(Opcode::Construct { dst: p, callee: ctor, first_arg: arg, argc: 1 });
    main.get_by_id(px, p, x);
    main.emit(Opcode::InstanceOf { dst: is, lhs: p, rhs: ctor });
    main.emit(Opcode::NewArrayFrom { dst: p, first: px, count: 2 });
    main.emit(Opcode::Return { value: p });
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);

    let (mut rt, result) = run(m);
    let arr = result.unwrap();
    assert_eq!(rt.get(&arr, &PropertyKey::Index(0)).unwrap(), Value::number(3.0));
    assert_eq!(rt.get(&arr, &PropertyKey::Index(1)).unwrap(), Value::Boolean(true));
}

#[test]
fn test_getter_receives_receiver() {
    let mut m = ModuleBuilder::new("getter.js");
    let base = m.string("base");
    let v = m.string("v");

    // get v() { return this.base + 1; }
    let mut getter = FunctionBuilder::new("get v", 0).not_constructor();
    let (this, b, one) = (getter.reg(), getter.reg(), getter.reg());
    getter.emit(Opcode::LoadThis { dst: this });
    getter.get_by_id(b, this, base);
    getter.emit(Opcode::LoadInt { dst: one, value: 1 });
    getter.emit(Opcode::Add { dst: b, lhs: b, rhs: one });
    getter.emit(Opcode::Return { value: b });
    let getter = m.add_function(getter.finish().unwrap());

    let mut main = FunctionBuilder::new("main", 0);
    let (undef, obj, g, six, out) = (main.reg(), main.reg(), main.reg(), main.reg(), main.reg());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::NewObject { dst: obj });
    main.emit(Opcode::LoadInt { dst: six, value: 6 });
    main.emit(Opcode::PutOwnById { obj, name: base, value: six });
    main.emit(Opcode::CreateClosure { dst: g, env: undef, function: getter });
    main.emit(Opcode::PutOwnGetterSetter { obj, name: v, getter: g, setter: undef });
    // Accessor slots are never cached, so both reads call the getter.
    for _ in 0..2 {
        main.get_by_id(out, obj, v);
    }
    main.emit(Opcode::Return { value: out });
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);

    let (_rt, result) = run(m);
    assert_eq!(result.unwrap(), Value::number(7.0));
}

fn arguments_program(strict: bool) -> ModuleBuilder {
    let mut m = ModuleBuilder::new("args.js");
    // function f(a) { arguments[0] = 9; return a; }
    let f = FunctionBuilder::new("f", 1);
    let mut f = if strict { f.strict() } else { f };
    let (env, args, zero, nine, out) = (f.reg(), f.reg(), f.reg(), f.reg(), f.reg());
    f.emit(Opcode::CreateEnvironment { dst: env, size: 1 });
    f.emit(Opcode::StoreToEnvironment { env, slot: 0, value: f.param(0) });
    f.emit(Opcode::CreateArguments { dst: args, env: Some(env) });
    f.emit(Opcode::LoadInt { dst: zero, value: 0 });
    f.emit(Opcode::LoadInt { dst: nine, value: 9 });
    f.emit(Opcode::PutByVal { obj: args, key: zero, value: nine });
    f.emit(Opcode::LoadFromEnvironment { dst: out, env, slot: 0 });
    f.emit(Opcode::Return { value: out });
    let f = m.add_function(f.finish().unwrap());

    let mut main = FunctionBuilder::new("main", 0);
    let (undef, callee, arg, r) = (main.reg(), main.reg(), main.reg(), main.reg());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateClosure { dst: callee, env: undef, function: f });
    main.emit(Opcode::LoadInt { dst: arg, value: 1 });
    main.emit(Opcode::Call { dst: r, callee, this: undef, first_arg: arg, argc: 1 });
    main.emit(Opcode::Return { value: r });
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);
    m
}

#[test]
fn test_sloppy_arguments_alias_parameters() {
    let (_rt, result) = run(arguments_program(false));
    assert_eq!(result.unwrap(), Value::number(9.0));
}

#[test]
fn test_strict_arguments_are_unmapped() {
    let (_rt, result) = run(arguments_program(true));
    assert_eq!(result.unwrap(), Value::number(1.0));
}

fn spin_forever() -> ModuleBuilder {
    let mut m = ModuleBuilder::new("spin.js");
    let mut main = FunctionBuilder::new("main", 0);
    let top = main.new_label();
    main.bind(top);
    main.jmp(top);
    m.add_function(main.finish().unwrap());
    m
}

#[test]
fn test_terminate_interrupt_is_fatal() {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    let id = rt.load_module(spin_forever().finish().unwrap()).unwrap();
    rt.interrupt_handle().request(InterruptMode::Terminate);
    let err = rt.run_module(id).unwrap_err();
    assert!(matches!(err, EngineError::Fatal(FatalError::Terminated)));
    assert_eq!(rt.frame_depth(), 0);
}

#[test]
fn test_catchable_interrupt_from_another_thread() {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    let id = rt.load_module(spin_forever().finish().unwrap()).unwrap();
    let handle = rt.interrupt_handle();
    let waker = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(20));
        handle.request(InterruptMode::Catchable);
    });
    let err = rt.run_module(id).unwrap_err();
    waker.join().unwrap();
    let EngineError::Uncaught { error, .. } = err else {
        panic!("expected a catchable error");
    };
    assert_eq!(error.message, "Execution interrupted");
}

#[test]
fn test_allocation_loop_survives_young_collections() {
    let mut m = ModuleBuilder::new("alloc.js");
    let keep = m.string("keep");
    let mut main = FunctionBuilder::new("main", 0);
    let (i, limit, cond, one, obj, kept, k) = (
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
    );
    let (top, done) = (main.new_label(), main.new_label());
    main.emit(Opcode::LoadInt { dst: i, value: 0 });
    main.emit(Opcode::LoadInt { dst: limit, value: 5000 });
    main.emit(Opcode::LoadInt { dst: one, value: 1 });
    main.emit(Opcode::NewObject { dst: kept });
    main.emit(Opcode::LoadInt { dst: k, value: 42 });
    main.put_by_id(kept, keep, k);
    main.bind(top);
    main.emit(Opcode::Less { dst: cond, lhs: i, rhs: limit });
    main.jmp_false(cond, done);
    main.emit(Opcode::NewObject { dst: obj });
    main.put_by_id(obj, keep, i);
    main.emit(Opcode::Add { dst: i, lhs: i, rhs: one });
    main.jmp(top);
    main.bind(done);
    main.get_by_id(k, kept, keep);
    main.emit(Opcode::Return { value: k });
    m.add_function(main.finish().unwrap());

    let heap = HeapConfig::default().with_young_capacity(16 * 1024);
    let (rt, result) = run_with(RuntimeConfig::default().with_heap(heap), m);
    assert_eq!(result.unwrap(), Value::number(42.0));
    assert!(rt.heap_stats().young_collections > 0);
}

// ============================================================================
// Deletion, inherited assignment and for-in
// ============================================================================

/// Run `module` after `prepare` has populated the global object.
fn run_prepared(
    module: ModuleBuilder,
    prepare: impl FnOnce(&mut Runtime),
) -> (Runtime, Result<Value, EngineError>) {
    let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    prepare(&mut rt);
    let id = rt.load_module(module.finish().unwrap()).unwrap();
    let result = rt.run_module(id);
    (rt, result)
}

fn define_global(rt: &mut Runtime, name: &str, value: Value) {
    let global = rt.global_object();
    assert!(rt.create_data_property(global, &PropertyKey::from(name), value).unwrap());
}

fn global_object_named(rt: &mut Runtime, name: &str) -> HeapRef {
    let global = Value::Object(rt.global_object());
    match rt.get_by_name(&global, name).unwrap() {
        Value::Object(r) => r,
        other => panic!("{} is {:?}", name, other),
    }
}

/// Global `sealed` whose `fixed` property is non-configurable.
fn install_sealed(rt: &mut Runtime) {
    let obj = rt.new_object().unwrap();
    rt.define_property_or_throw(
        obj,
        PropertyKey::from("fixed"),
        Value::number(1.0),
        PropertyFlags::data(true, true, false),
    )
    .unwrap();
    define_global(rt, "sealed", Value::Object(obj));
}

/// `return delete sealed.fixed`, or `delete sealed["fixed"]` when `by_value`.
fn delete_fixed_program(strict: bool, by_value: bool) -> ModuleBuilder {
    let mut m = ModuleBuilder::new("delete.js");
    let sealed = m.string("sealed");
    let fixed = m.string("fixed");
    let main = FunctionBuilder::new("main", 0);
    let mut main = if strict { main.strict() } else { main };
    let (obj, key, out) = (main.reg(), main.reg(), main.reg());
    main.emit(Opcode::GetGlobal { dst: obj, name: sealed });
    if by_value {
        main.emit(Opcode::LoadConst { dst: key, index: fixed });
        main.emit(Opcode::DelByVal { dst: out, obj, key });
    } else {
        main.emit(Opcode::DelById { dst: out, obj, name: fixed });
    }
    main.emit(Opcode::Return { value: out });
    m.add_function(main.finish().unwrap());
    m
}

#[test]
fn test_sloppy_delete_of_non_configurable_is_false() {
    for by_value in [false, true] {
        let (mut rt, result) = run_prepared(delete_fixed_program(false, by_value), install_sealed);
        assert_eq!(result.unwrap(), Value::Boolean(false));
        let sealed = global_object_named(&mut rt, "sealed");
        assert!(rt.has_own_property(sealed, &PropertyKey::from("fixed")).unwrap());
        assert_eq!(
            rt.get_by_name(&Value::Object(sealed), "fixed").unwrap(),
            Value::number(1.0)
        );
    }
}

#[test]
fn test_strict_delete_of_non_configurable_throws() {
    for by_value in [false, true] {
        let (mut rt, result) = run_prepared(delete_fixed_program(true, by_value), install_sealed);
        let Err(EngineError::Uncaught { error, .. }) = result else {
            panic!("expected a TypeError");
        };
        assert_eq!(error.kind, ErrorKind::TypeError);
        assert!(error.message.contains("'fixed'"), "{}", error.message);
        let sealed = global_object_named(&mut rt, "sealed");
        assert!(rt.has_own_property(sealed, &PropertyKey::from("fixed")).unwrap());
    }
}

/// Setter storing its argument as `this.recorded`.
fn record_assignment(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    if let Value::Object(this) = &args.this {
        rt.create_data_property(*this, &PropertyKey::from("recorded"), args.arg(0))?;
    }
    Ok(Value::Undefined)
}

/// Globals `child` and its prototype `proto`, which carries a setter `x`
/// and a read-only data property `ro`.
fn install_inherited(rt: &mut Runtime) {
    let proto = rt.new_object().unwrap();
    let setter = rt.new_native_function("set x", 1, record_assignment).unwrap();
    let accessor = PropertyDescriptor {
        set: Some(Value::Object(setter)),
        enumerable: Some(true),
        configurable: Some(true),
        ..PropertyDescriptor::default()
    };
    assert!(rt.define_own_property(proto, &PropertyKey::from("x"), accessor).unwrap());
    rt.define_property_or_throw(
        proto,
        PropertyKey::from("ro"),
        Value::number(1.0),
        PropertyFlags::data(false, true, true),
    )
    .unwrap();
    let child = rt.new_object().unwrap();
    assert!(rt.set_prototype_of(child, Some(proto)).unwrap());
    define_global(rt, "proto", Value::Object(proto));
    define_global(rt, "child", Value::Object(child));
}

/// `child[name] = 5` twice through one cache slot, then `return 5`.
fn assign_program(strict: bool, name: &str) -> ModuleBuilder {
    let mut m = ModuleBuilder::new("assign.js");
    let child = m.string("child");
    let name = m.string(name);
    let main = FunctionBuilder::new("main", 0);
    let mut main = if strict { main.strict() } else { main };
    let (obj, five) = (main.reg(), main.reg());
    let cache = main.cache();
    main.emit(Opcode::GetGlobal { dst: obj, name: child });
    main.emit(Opcode::LoadInt { dst: five, value: 5 });
    let (top, done, i, two, cond, one) = (
        main.new_label(),
        main.new_label(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
    );
    main.emit(Opcode::LoadInt { dst: i, value: 0 });
    main.emit(Opcode::LoadInt { dst: two, value: 2 });
    main.emit(Opcode::LoadInt { dst: one, value: 1 });
    main.bind(top);
    main.emit(Opcode::Less { dst: cond, lhs: i, rhs: two });
    main.jmp_false(cond, done);
    main.emit(Opcode::PutById { obj, name, value: five, cache });
    main.emit(Opcode::Add { dst: i, lhs: i, rhs: one });
    main.jmp(top);
    main.bind(done);
    main.emit(Opcode::Return { value: five });
    m.add_function(main.finish().unwrap());
    m
}

#[test]
fn test_inherited_setter_runs_without_shadowing() {
    for strict in [false, true] {
        let (mut rt, result) = run_prepared(assign_program(strict, "x"), install_inherited);
        assert_eq!(result.unwrap(), Value::number(5.0));
        let child = global_object_named(&mut rt, "child");
        assert!(!rt.has_own_property(child, &PropertyKey::from("x")).unwrap());
        assert_eq!(
            rt.get_by_name(&Value::Object(child), "recorded").unwrap(),
            Value::number(5.0)
        );
        let proto = global_object_named(&mut rt, "proto");
        assert!(!rt.has_own_property(proto, &PropertyKey::from("recorded")).unwrap());
    }
}

#[test]
fn test_inherited_read_only_blocks_assignment() {
    let (mut rt, result) = run_prepared(assign_program(false, "ro"), install_inherited);
    assert_eq!(result.unwrap(), Value::number(5.0));
    let child = global_object_named(&mut rt, "child");
    assert!(!rt.has_own_property(child, &PropertyKey::from("ro")).unwrap());
    assert_eq!(rt.get_by_name(&Value::Object(child), "ro").unwrap(), Value::number(1.0));

    let (mut rt, result) = run_prepared(assign_program(true, "ro"), install_inherited);
    let Err(EngineError::Uncaught { error, .. }) = result else {
        panic!("expected a TypeError");
    };
    assert_eq!(error.kind, ErrorKind::TypeError);
    let child = global_object_named(&mut rt, "child");
    assert!(!rt.has_own_property(child, &PropertyKey::from("ro")).unwrap());
}

#[test]
fn test_for_in_skips_keys_deleted_during_the_loop() {
    // var s = ""; for (var k in o) { s += k; delete o.c; } return s;
    let mut m = ModuleBuilder::new("forin.js");
    let (a, b, c) = (m.string("a"), m.string("b"), m.string("c"));
    let empty = m.string("");
    let mut main = FunctionBuilder::new("main", 0);
    let (obj, v, names, index, key, undef, done_flag, out, tmp) = (
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
        main.reg(),
    );
    main.emit(Opcode::NewObject { dst: obj });
    main.emit(Opcode::LoadInt { dst: v, value: 1 });
    for name in [a, b, c] {
        main.emit(Opcode::PutOwnById { obj, name, value: v });
    }
    main.emit(Opcode::GetPropertyNames { dst: names, obj });
    main.emit(Opcode::LoadInt { dst: index, value: 0 });
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::LoadConst { dst: out, index: empty });
    let (top, done) = (main.new_label(), main.new_label());
    main.bind(top);
    main.emit(Opcode::GetNextPropertyName { dst: key, names, obj, index });
    main.emit(Opcode::StrictEq { dst: done_flag, lhs: key, rhs: undef });
    main.jmp_true(done_flag, done);
    main.emit(Opcode::Add { dst: out, lhs: out, rhs: key });
    main.emit(Opcode::DelById { dst: tmp, obj, name: c });
    main.jmp(top);
    main.bind(done);
    main.emit(Opcode::Return { value: out });
    m.add_function(main.finish().unwrap());

    let (_rt, result) = run(m);
    assert_eq!(result.unwrap(), Value::string("ab"));
}
