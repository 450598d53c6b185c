//! Engine-wide properties checked end to end
//!
//! Each test assembles a small program, runs it on a runtime with the
//! standard library installed and checks what the program observes.

use bytecode_system::{Opcode, RegisterId};
use core_types::Value;
use integration_tests::{
    closure_pair_module, fib_module, finally_override_module, single_function, Harness,
};
use interpreter::PropertyKey;

fn next(r: RegisterId, n: u32) -> RegisterId {
    RegisterId(r.0 + n)
}

fn joined(h: &mut Harness, array: &Value) -> String {
    let s = h.rt.invoke(array, "join", vec![]).unwrap();
    h.rt.to_string(&s).unwrap().to_string()
}

#[test]
fn test_object_is_versus_strict_equality() {
    let mut h = Harness::new();
    let nan = Value::number(f64::NAN);
    let is_nan = h.call_static("Object", "is", vec![nan.clone(), nan]);
    assert_eq!(is_nan, Value::Boolean(true));
    let zeros = h.call_static("Object", "is", vec![Value::number(-0.0), Value::number(0.0)]);
    assert_eq!(zeros, Value::Boolean(false));

    // [-0 === 0, NaN === NaN]
    let module = single_function("strict.js", |f, m| {
        let neg_zero = m.number(-0.0);
        let nan = m.number(f64::NAN);
        let (a, b, out, arr) = (f.reg(), f.reg(), f.regs(2), f.reg());
        f.emit(Opcode::LoadConst { dst: a, index: neg_zero });
        f.emit(Opcode::LoadInt { dst: b, value: 0 });
        f.emit(Opcode::StrictEq { dst: out, lhs: a, rhs: b });
        f.emit(Opcode::LoadConst { dst: a, index: nan });
        f.emit(Opcode::StrictEq { dst: next(out, 1), lhs: a, rhs: a });
        f.emit(Opcode::NewArrayFrom { dst: arr, first: out, count: 2 });
        f.emit(Opcode::Return { value: arr });
    });
    let arr = h.run(module).unwrap();
    assert_eq!(joined(&mut h, &arr), "true,false");
}

#[test]
fn test_identical_additions_share_a_shape() {
    let mut h = Harness::new();
    // a = {}; a.x = 1; a.y = 2;  b likewise;  c = {}; c.y = 2; c.x = 1;
    let module = single_function("shapes.js", |f, m| {
        let (x, y) = (m.string("x"), m.string("y"));
        let names = [m.string("a"), m.string("b")];
        let c_name = m.string("c");
        let (obj, one, two, undef) = (f.reg(), f.reg(), f.reg(), f.reg());
        f.emit(Opcode::LoadInt { dst: one, value: 1 });
        f.emit(Opcode::LoadInt { dst: two, value: 2 });
        for name in names {
            f.emit(Opcode::NewObject { dst: obj });
            f.put_by_id(obj, x, one);
            f.put_by_id(obj, y, two);
            f.emit(Opcode::PutGlobal { name, value: obj });
        }
        f.emit(Opcode::NewObject { dst: obj });
        f.put_by_id(obj, y, two);
        f.put_by_id(obj, x, one);
        f.emit(Opcode::PutGlobal { name: c_name, value: obj });
        f.emit(Opcode::LoadUndefined { dst: undef });
        f.emit(Opcode::Return { value: undef });
    });
    h.run(module).unwrap();

    let shape_of = |h: &mut Harness, name: &str| match h.global(name) {
        Value::Object(r) => h.rt.object(r).unwrap().shape(),
        other => panic!("{} is {:?}", name, other),
    };
    let (a, b, c) = (shape_of(&mut h, "a"), shape_of(&mut h, "b"), shape_of(&mut h, "c"));
    assert!(a.is_some());
    assert_eq!(a, b);
    assert_ne!(a, c);

    let a = h.global("a");
    let keys = h.call_static("Object", "keys", vec![a]);
    assert_eq!(joined(&mut h, &keys), "x,y");
    let c = h.global("c");
    let keys = h.call_static("Object", "keys", vec![c]);
    assert_eq!(joined(&mut h, &keys), "y,x");
}

#[test]
fn test_array_length_truncates_and_extends() {
    let mut h = Harness::new();
    // let a = [1,2,3]; a.length = 1; r = [1 in a, 2 in a]; a[10] = 5; r.push(a.length)
    let module = single_function("length.js", |f, m| {
        let length = m.string("length");
        let a_name = m.string("a");
        let (items, a, out, k, v) = (f.regs(3), f.reg(), f.regs(3), f.reg(), f.reg());
        for i in 0..3 {
            f.emit(Opcode::LoadInt { dst: next(items, i), value: i as i32 + 1 });
        }
        f.emit(Opcode::NewArrayFrom { dst: a, first: items, count: 3 });
        f.emit(Opcode::LoadInt { dst: v, value: 1 });
        f.put_by_id(a, length, v);
        f.emit(Opcode::LoadInt { dst: k, value: 1 });
        f.emit(Opcode::In { dst: out, lhs: k, rhs: a });
        f.emit(Opcode::LoadInt { dst: k, value: 2 });
        f.emit(Opcode::In { dst: next(out, 1), lhs: k, rhs: a });
        f.emit(Opcode::LoadInt { dst: k, value: 10 });
        f.emit(Opcode::LoadInt { dst: v, value: 5 });
        f.emit(Opcode::PutByVal { obj: a, key: k, value: v });
        f.get_by_id(next(out, 2), a, length);
        f.emit(Opcode::PutGlobal { name: a_name, value: a });
        f.emit(Opcode::NewArrayFrom { dst: a, first: out, count: 3 });
        f.emit(Opcode::Return { value: a });
    });
    let result = h.run(module).unwrap();
    assert_eq!(joined(&mut h, &result), "false,false,11");

    let a = h.global("a");
    let keys = h.call_static("Object", "keys", vec![a.clone()]);
    assert_eq!(joined(&mut h, &keys), "0,10");
    assert_eq!(h.rt.get(&a, &PropertyKey::from(5u32)).unwrap(), Value::Undefined);
}

#[test]
fn test_sibling_closures_share_a_binding() {
    let mut h = Harness::new();
    assert_eq!(h.run(closure_pair_module()).unwrap(), Value::number(2.0));
}

#[test]
fn test_finally_return_overrides_try_return() {
    let mut h = Harness::new();
    assert_eq!(h.run(finally_override_module()).unwrap(), Value::number(2.0));
    assert_eq!(h.rt.frame_depth(), 0);
}

#[test]
fn test_abstract_equality_table() {
    let mut h = Harness::new();
    // [null == undefined, "" == false, "0" == false, NaN == NaN,
    //  Symbol() == Symbol(), s == s]
    let module = single_function("equality.js", |f, m| {
        let empty = m.string("");
        let zero = m.string("0");
        let nan_name = m.string("NaN");
        let symbol_name = m.string("Symbol");
        let (a, b, out, arr, undef, sym) =
            (f.reg(), f.reg(), f.regs(6), f.reg(), f.reg(), f.reg());
        f.emit(Opcode::LoadUndefined { dst: undef });

        f.emit(Opcode::LoadNull { dst: a });
        f.emit(Opcode::Eq { dst: out, lhs: a, rhs: undef });

        f.emit(Opcode::LoadConst { dst: a, index: empty });
        f.emit(Opcode::LoadBool { dst: b, value: false });
        f.emit(Opcode::Eq { dst: next(out, 1), lhs: a, rhs: b });

        f.emit(Opcode::LoadConst { dst: a, index: zero });
        f.emit(Opcode::Eq { dst: next(out, 2), lhs: a, rhs: b });

        f.emit(Opcode::GetGlobal { dst: a, name: nan_name });
        f.emit(Opcode::Eq { dst: next(out, 3), lhs: a, rhs: a });

        f.emit(Opcode::GetGlobal { dst: sym, name: symbol_name });
        f.emit(Opcode::Call { dst: a, callee: sym, this: undef, first_arg: undef, argc: 0 });
        f.emit(Opcode::Call { dst: b, callee: sym, this: undef, first_arg: undef, argc: 0 });
        f.emit(Opcode::Eq { dst: next(out, 4), lhs: a, rhs: b });
        f.emit(Opcode::Eq { dst: next(out, 5), lhs: a, rhs: a });

        f.emit(Opcode::NewArrayFrom { dst: arr, first: out, count: 6 });
        f.emit(Opcode::Return { value: arr });
    });
    let arr = h.run(module).unwrap();
    assert_eq!(joined(&mut h, &arr), "true,true,true,false,false,true");
}

#[test]
fn test_fibonacci_end_to_end() {
    let mut h = Harness::new();
    assert_eq!(h.run(fib_module(10)).unwrap(), Value::number(55.0));
    assert_eq!(h.rt.frame_depth(), 0);
    assert_eq!(h.run(fib_module(20)).unwrap(), Value::number(6765.0));
}
