//! Collector soundness and reclamation seen from scripts and the host

use bytecode_system::{BytecodeModule, FunctionBuilder, ModuleBuilder, Opcode};
use core_types::Value;
use integration_tests::{single_function, Harness};
use interpreter::{PropertyKey, RuntimeConfig};
use memory_manager::HeapConfig;

fn small_young_gen() -> Harness {
    let heap = HeapConfig::default().with_young_capacity(8 * 1024);
    Harness::with_config(RuntimeConfig::default().with_heap(heap))
}

/// `function make() { const o = { v: 42 }; return () => o.v; } make()`
fn captured_object_module() -> BytecodeModule {
    let mut m = ModuleBuilder::new("capture.js");
    let v = m.string("v");

    let mut reader = FunctionBuilder::new("", 0).arrow();
    let (env, o, out) = (reader.reg(), reader.reg(), reader.reg());
    reader.emit(Opcode::GetEnvironment { dst: env, depth: 0 });
    reader.emit(Opcode::LoadFromEnvironment { dst: o, env, slot: 0 });
    reader.get_by_id(out, o, v);
    reader.emit(Opcode::Return { value: out });
    let reader = m.add_function(reader.finish().unwrap());

    let mut make = FunctionBuilder::new("make", 0);
    let (env, o, k, closure) = (make.reg(), make.reg(), make.reg(), make.reg());
    make.emit(Opcode::CreateEnvironment { dst: env, size: 1 });
    make.emit(Opcode::NewObject { dst: o });
    make.emit(Opcode::LoadInt { dst: k, value: 42 });
    make.put_by_id(o, v, k);
    make.emit(Opcode::StoreToEnvironment { env, slot: 0, value: o });
    make.emit(Opcode::CreateClosure { dst: closure, env, function: reader });
    make.emit(Opcode::Return { value: closure });
    let make = m.add_function(make.finish().unwrap());

    let mut main = FunctionBuilder::new("main", 0);
    let (undef, maker, r) = (main.reg(), main.reg(), main.reg());
    main.emit(Opcode::LoadUndefined { dst: undef });
    main.emit(Opcode::CreateClosure { dst: maker, env: undef, function: make });
    main.emit(Opcode::Call { dst: r, callee: maker, this: undef, first_arg: undef, argc: 0 });
    main.emit(Opcode::Return { value: r });
    let entry = m.add_function(main.finish().unwrap());
    m.set_entry(entry);
    m.finish().unwrap()
}

#[test]
fn test_upvalue_object_survives_while_closure_is_reachable() {
    let mut h = small_young_gen();
    let marker = h.rt.gc_scope_marker();
    let closure = h.run(captured_object_module()).unwrap();
    let handle = h.rt.persist(closure.clone());
    h.rt.flush_gc_scope(marker);

    for _ in 0..2000 {
        let scratch = h.rt.gc_scope_marker();
        h.rt.new_object().unwrap();
        h.rt.flush_gc_scope(scratch);
    }
    h.rt.collect_garbage();
    assert!(h.rt.heap_stats().young_collections > 0);

    let v = h.rt.call(&closure, Value::Undefined, vec![]).unwrap();
    assert_eq!(v, Value::number(42.0));
    h.rt.unpersist(handle);
    h.rt.flush_gc_scope(marker);
    h.rt.collect_garbage();
    assert!(!h.rt.is_live(&closure));
}

#[test]
fn test_unreachable_cycle_is_collected() {
    let mut h = Harness::new();
    let marker = h.rt.gc_scope_marker();
    let a = h.rt.new_object().unwrap();
    let b = h.rt.new_object().unwrap();
    let peer = PropertyKey::from("peer");
    h.rt.create_data_property(a, &peer, Value::Object(b)).unwrap();
    h.rt.create_data_property(b, &peer, Value::Object(a)).unwrap();
    h.rt.collect_garbage();
    assert!(h.rt.is_live(&Value::Object(a)));

    h.rt.flush_gc_scope(marker);
    h.rt.collect_garbage();
    assert!(!h.rt.is_live(&Value::Object(a)));
    assert!(!h.rt.is_live(&Value::Object(b)));
}

#[test]
fn test_script_cycle_freed_after_global_cleared() {
    let mut h = Harness::new();
    // var keep = {}; keep.self = keep;
    let module = single_function("cycle.js", |f, m| {
        let keep = m.string("keep");
        let self_name = m.string("self");
        let (o, undef) = (f.reg(), f.reg());
        f.emit(Opcode::NewObject { dst: o });
        f.put_by_id(o, self_name, o);
        f.emit(Opcode::DeclareGlobal { name: keep });
        f.emit(Opcode::PutGlobal { name: keep, value: o });
        f.emit(Opcode::LoadUndefined { dst: undef });
        f.emit(Opcode::Return { value: undef });
    });
    let marker = h.rt.gc_scope_marker();
    h.run(module).unwrap();
    let kept = h.global("keep");
    h.rt.flush_gc_scope(marker);
    h.rt.collect_garbage();
    assert!(h.rt.is_live(&kept));

    let global = Value::Object(h.rt.global_object());
    h.rt
        .set(&global, &PropertyKey::from("keep"), Value::Null, false)
        .unwrap();
    h.rt.flush_gc_scope(marker);
    h.rt.collect_garbage();
    assert!(!h.rt.is_live(&kept));
}

#[test]
fn test_old_holder_keeps_young_value_alive() {
    let mut h = small_young_gen();
    let marker = h.rt.gc_scope_marker();
    let holder = h.rt.new_object().unwrap();
    let handle = h.rt.persist(Value::Object(holder));
    h.rt.flush_gc_scope(marker);
    h.rt.collect_garbage();
    h.rt.collect_garbage();

    let young = h.rt.new_object().unwrap();
    h.rt
        .create_data_property(young, &PropertyKey::from("n"), Value::number(9.0))
        .unwrap();
    h.rt
        .set(&Value::Object(holder), &PropertyKey::from("child"), Value::Object(young), true)
        .unwrap();
    h.rt.flush_gc_scope(marker);
    h.rt.collect_young();

    let child = h.rt.get_by_name(&Value::Object(holder), "child").unwrap();
    let n = h.rt.get_by_name(&child, "n").unwrap();
    assert_eq!(n, Value::number(9.0));
    h.rt.unpersist(handle);
}

#[test]
fn test_snapshot_reflects_collections() {
    let mut h = Harness::new();
    h.rt.collect_garbage();
    let snapshot = h.rt.heap_snapshot();
    assert!(snapshot.stats.full_collections >= 1);
    assert!(!snapshot.cells.is_empty());
    assert!(snapshot.to_json().unwrap().contains("\"cells\""));
}
