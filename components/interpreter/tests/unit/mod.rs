//! Unit tests for interpreter components

use std::rc::Rc;

use core_types::Value;
use interpreter::{
    InlineCache, PropertyDescriptor, PropertyFlags, PropertyKey, Runtime, RuntimeConfig, ShapeId,
    Throw, TypedArrayKind,
};
use num_bigint::BigInt;

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig::default()).unwrap()
}

fn key(s: &str) -> PropertyKey {
    PropertyKey::from(s)
}

fn thrown_header(rt: &Runtime, t: Throw) -> String {
    match t {
        Throw::Value(v) => rt.describe_exception(&v).header(),
        Throw::Fatal(f) => panic!("unexpected fatal error: {}", f),
    }
}

// ============================================================================
// Objects and shapes
// ============================================================================

#[test]
fn test_objects_with_same_keys_share_a_shape() {
    let mut rt = runtime();
    let a = rt.new_object().unwrap();
    let b = rt.new_object().unwrap();
    for r in [a, b] {
        rt.set(&Value::Object(r), &key("x"), Value::number(1.0), true).unwrap();
        rt.set(&Value::Object(r), &key("y"), Value::number(2.0), true).unwrap();
    }
    let shape_a = rt.object(a).unwrap().shape();
    assert!(shape_a.is_some());
    assert_eq!(shape_a, rt.object(b).unwrap().shape());

    let c = rt.new_object().unwrap();
    rt.set(&Value::Object(c), &key("y"), Value::number(2.0), true).unwrap();
    rt.set(&Value::Object(c), &key("x"), Value::number(1.0), true).unwrap();
    assert_ne!(shape_a, rt.object(c).unwrap().shape());
}

#[test]
fn test_delete_switches_to_dictionary_and_keeps_order() {
    let mut rt = runtime();
    let o = rt.new_object().unwrap();
    let v = Value::Object(o);
    for name in ["a", "b", "c"] {
        rt.set(&v, &key(name), Value::Boolean(true), true).unwrap();
    }
    assert!(rt.delete_property(o, &key("b")).unwrap());
    assert!(rt.object(o).unwrap().is_dictionary());
    rt.set(&v, &key("b"), Value::Null, true).unwrap();
    assert_eq!(rt.own_keys(o).unwrap(), vec![key("a"), key("c"), key("b")]);
    assert_eq!(rt.get(&v, &key("b")).unwrap(), Value::Null);
}

#[test]
fn test_own_keys_order_indices_strings_symbols() {
    let mut rt = runtime();
    let o = rt.new_object().unwrap();
    let v = Value::Object(o);
    let sym = rt.new_symbol(Some(Rc::from("s")));
    rt.set(&v, &key("z"), Value::Null, true).unwrap();
    rt.set(&v, &PropertyKey::Symbol(sym), Value::Null, true).unwrap();
    rt.set(&v, &PropertyKey::Index(2), Value::Null, true).unwrap();
    rt.set(&v, &key("a"), Value::Null, true).unwrap();
    rt.set(&v, &PropertyKey::Index(0), Value::Null, true).unwrap();
    assert_eq!(
        rt.own_keys(o).unwrap(),
        vec![
            PropertyKey::Index(0),
            PropertyKey::Index(2),
            key("z"),
            key("a"),
            PropertyKey::Symbol(sym)
        ]
    );
}

#[test]
fn test_read_only_property_strict_and_sloppy() {
    let mut rt = runtime();
    let o = rt.new_object().unwrap();
    let v = Value::Object(o);
    rt.define_property_or_throw(o, key("k"), Value::number(1.0), PropertyFlags::FROZEN)
        .unwrap();

    rt.set(&v, &key("k"), Value::number(2.0), false).unwrap();
    assert_eq!(rt.get(&v, &key("k")).unwrap(), Value::number(1.0));

    let err = rt.set(&v, &key("k"), Value::number(2.0), true).unwrap_err();
    assert_eq!(
        thrown_header(&rt, err),
        "TypeError: Cannot assign to read only property 'k' of object"
    );
    assert!(rt
        .define_property_or_throw(o, key("k"), Value::number(3.0), PropertyFlags::DEFAULT)
        .is_err());
}

#[test]
fn test_freeze_and_test_integrity() {
    let mut rt = runtime();
    let o = rt.new_object().unwrap();
    rt.set(&Value::Object(o), &key("x"), Value::number(1.0), true).unwrap();
    assert!(!rt.test_integrity_level(o, true).unwrap());
    assert!(rt.set_integrity_level(o, true).unwrap());
    assert!(rt.test_integrity_level(o, true).unwrap());
    assert!(rt.test_integrity_level(o, false).unwrap());
    assert!(!rt.create_data_property(o, &key("y"), Value::Null).unwrap());
    assert!(!rt.delete_property(o, &key("x")).unwrap());
}

#[test]
fn test_prototype_cycles_are_rejected() {
    let mut rt = runtime();
    let a = rt.new_object().unwrap();
    let b = rt.new_object_with_prototype(Some(a)).unwrap();
    assert!(!rt.set_prototype_of(a, Some(b)).unwrap());
    assert!(rt.set_prototype_of(b, None).unwrap());
    assert!(rt.set_prototype_of(a, Some(b)).unwrap());
}

#[test]
fn test_inherited_lookup_and_shadowing() {
    let mut rt = runtime();
    let proto = rt.new_object().unwrap();
    rt.set(&Value::Object(proto), &key("m"), Value::number(1.0), true).unwrap();
    let child = rt.new_object_with_prototype(Some(proto)).unwrap();
    let cv = Value::Object(child);
    assert_eq!(rt.get(&cv, &key("m")).unwrap(), Value::number(1.0));
    assert!(!rt.has_own_property(child, &key("m")).unwrap());
    rt.set(&cv, &key("m"), Value::number(2.0), true).unwrap();
    assert_eq!(rt.get(&Value::Object(proto), &key("m")).unwrap(), Value::number(1.0));
    assert_eq!(rt.get(&cv, &key("m")).unwrap(), Value::number(2.0));
    assert_eq!(rt.for_in_keys(child).unwrap(), vec![Value::string("m")]);
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_array_length_tracks_indices() {
    let mut rt = runtime();
    let arr = rt.new_array(vec![Value::number(1.0), Value::number(2.0)]).unwrap();
    let v = Value::Object(arr);
    rt.set(&v, &PropertyKey::Index(9), Value::Null, true).unwrap();
    assert_eq!(rt.get(&v, &key("length")).unwrap(), Value::number(10.0));
    assert_eq!(rt.get(&v, &PropertyKey::Index(5)).unwrap(), Value::Undefined);

    rt.set(&v, &key("length"), Value::number(1.0), true).unwrap();
    assert_eq!(rt.get(&v, &PropertyKey::Index(1)).unwrap(), Value::Undefined);
    assert_eq!(rt.own_keys(arr).unwrap(), vec![PropertyKey::Index(0), key("length")]);
}

#[test]
fn test_invalid_array_length_is_range_error() {
    let mut rt = runtime();
    let arr = rt.new_array(vec![]).unwrap();
    let err = rt
        .set(&Value::Object(arr), &key("length"), Value::number(-1.0), true)
        .unwrap_err();
    assert_eq!(thrown_header(&rt, err), "RangeError: Invalid array length");
}

#[test]
fn test_non_writable_length_blocks_growth() {
    let mut rt = runtime();
    let arr = rt.new_array(vec![Value::Null]).unwrap();
    let desc = PropertyDescriptor {
        writable: Some(false),
        ..PropertyDescriptor::default()
    };
    assert!(rt.define_own_property(arr, &key("length"), desc).unwrap());
    assert!(!rt.create_data_property(arr, &PropertyKey::Index(1), Value::Null).unwrap());
    assert!(rt.set(&Value::Object(arr), &PropertyKey::Index(4), Value::Null, true).is_err());
}

#[test]
fn test_huge_index_goes_sparse() {
    let mut rt = runtime();
    let arr = rt.new_array(vec![]).unwrap();
    let v = Value::Object(arr);
    rt.set(&v, &PropertyKey::Index(4_000_000_000), Value::Boolean(true), true).unwrap();
    assert_eq!(rt.get(&v, &key("length")).unwrap(), Value::number(4_000_000_001.0));
    assert!(rt.object(arr).unwrap().elements.is_sparse());
}

// ============================================================================
// Conversions and operators
// ============================================================================

#[test]
fn test_to_number_and_to_string() {
    let mut rt = runtime();
    assert_eq!(rt.to_number(&Value::string("  0x10 ")).unwrap(), 16.0);
    assert!(rt.to_number(&Value::string("1e")).unwrap().is_nan());
    assert_eq!(rt.to_number(&Value::Null).unwrap(), 0.0);
    assert_eq!(&*rt.to_string(&Value::number(-0.0)).unwrap(), "0");
    assert_eq!(&*rt.to_string(&Value::number(1e21)).unwrap(), "1e+21");
}

#[test]
fn test_abstract_equality_ladder() {
    let mut rt = runtime();
    assert!(rt.abstract_equals(&Value::Null, &Value::Undefined).unwrap());
    assert!(rt.abstract_equals(&Value::string("1"), &Value::number(1.0)).unwrap());
    assert!(rt.abstract_equals(&Value::Boolean(true), &Value::string("1")).unwrap());
    let one = Value::BigInt(Rc::new(BigInt::from(1)));
    assert!(rt.abstract_equals(&one, &Value::number(1.0)).unwrap());
    assert!(rt.abstract_equals(&one, &Value::string("1")).unwrap());
    assert!(!rt.abstract_equals(&Value::Null, &Value::number(0.0)).unwrap());
    assert!(!rt.abstract_equals(&Value::number(f64::NAN), &Value::number(f64::NAN)).unwrap());
}

#[test]
fn test_relational_comparison() {
    let mut rt = runtime();
    assert_eq!(
        rt.less_than(&Value::string("a"), &Value::string("b"), true).unwrap(),
        Some(true)
    );
    assert_eq!(
        rt.less_than(&Value::string("10"), &Value::number(9.0), true).unwrap(),
        Some(false)
    );
    assert_eq!(
        rt.less_than(&Value::number(f64::NAN), &Value::number(1.0), true).unwrap(),
        None
    );
    let big = Value::BigInt(Rc::new(BigInt::from(2).pow(64)));
    assert_eq!(
        rt.less_than(&Value::number(1.8e19), &big, true).unwrap(),
        Some(true)
    );
}

#[test]
fn test_mixing_bigint_and_number_throws() {
    let mut rt = runtime();
    let one = Value::BigInt(Rc::new(BigInt::from(1)));
    let err = rt.add(&one, &Value::number(1.0)).unwrap_err();
    assert!(thrown_header(&rt, err).starts_with("TypeError: Cannot mix BigInt"));
    let s = rt.add(&one, &Value::string("x")).unwrap();
    assert_eq!(s, Value::string("1x"));
}

#[test]
fn test_typeof() {
    let mut rt = runtime();
    let o = rt.new_object().unwrap();
    let f = rt
        .new_native_function("f", 0, |_, _| Ok(Value::Undefined))
        .unwrap();
    assert_eq!(rt.type_of(&Value::Null), "object");
    assert_eq!(rt.type_of(&Value::Object(o)), "object");
    assert_eq!(rt.type_of(&Value::Object(f)), "function");
    assert_eq!(rt.type_of(&Value::BigInt(Rc::new(BigInt::from(0)))), "bigint");
}

#[test]
fn test_reading_property_of_undefined() {
    let mut rt = runtime();
    let err = rt.get(&Value::Undefined, &key("x")).unwrap_err();
    assert_eq!(
        thrown_header(&rt, err),
        "TypeError: Cannot read properties of undefined (reading 'x')"
    );
}

#[test]
fn test_string_primitive_properties() {
    let mut rt = runtime();
    let s = Value::string("héllo");
    assert_eq!(rt.get(&s, &key("length")).unwrap(), Value::number(5.0));
    assert_eq!(rt.get(&s, &PropertyKey::Index(1)).unwrap(), Value::string("é"));
    assert_eq!(rt.get(&s, &PropertyKey::Index(9)).unwrap(), Value::Undefined);
}

#[test]
fn test_indexing_a_long_string_by_code_unit() {
    let mut rt = runtime();
    let text = format!("{}\u{1F600}", "ab".repeat(5_000));
    let s = Value::string(&text);
    assert_eq!(rt.get(&s, &key("length")).unwrap(), Value::number(10_002.0));
    let mut a_count = 0;
    for i in 0..10_000 {
        if rt.get(&s, &PropertyKey::Index(i)).unwrap() == Value::string("a") {
            a_count += 1;
        }
    }
    assert_eq!(a_count, 5_000);
    assert_eq!(
        rt.get(&s, &PropertyKey::Index(10_000)).unwrap(),
        Value::string(&String::from_utf16_lossy(&[0xD83D]))
    );

    let wrapper = rt.to_object(&s).unwrap();
    assert!(rt.has_own_property(wrapper, &PropertyKey::Index(10_001)).unwrap());
    assert!(!rt.has_own_property(wrapper, &PropertyKey::Index(10_002)).unwrap());
}

// ============================================================================
// Typed arrays
// ============================================================================

#[test]
fn test_typed_array_conversions_wrap() {
    let mut rt = runtime();
    let buf = rt.new_array_buffer(8).unwrap();
    let u8s = rt.new_typed_array(TypedArrayKind::Uint8, buf, 0, 8).unwrap();
    let v = Value::Object(u8s);
    rt.set(&v, &PropertyKey::Index(0), Value::number(257.0), true).unwrap();
    rt.set(&v, &PropertyKey::Index(1), Value::number(-1.0), true).unwrap();
    assert_eq!(rt.get(&v, &PropertyKey::Index(0)).unwrap(), Value::number(1.0));
    assert_eq!(rt.get(&v, &PropertyKey::Index(1)).unwrap(), Value::number(255.0));
    // Out-of-range writes are dropped, never turned into ordinary properties.
    rt.set(&v, &PropertyKey::Index(8), Value::number(1.0), true).unwrap();
    assert!(!rt.has_own_property(u8s, &PropertyKey::Index(8)).unwrap());

    let big = rt.new_typed_array(TypedArrayKind::BigInt64, buf, 0, 1).unwrap();
    assert!(rt
        .set(&Value::Object(big), &PropertyKey::Index(0), Value::number(1.0), true)
        .is_err());
}

#[test]
fn test_float64_view_reads_canonical_nan() {
    let mut rt = runtime();
    // A NaN whose high bits match the encoding of `null`.
    let raw: u64 = 0xFFFA_0000_0000_0000;
    let buf = rt.array_buffer_from(raw.to_le_bytes().to_vec()).unwrap();
    let view = rt.new_typed_array(TypedArrayKind::Float64, buf, 0, 1).unwrap();
    let read = rt.get(&Value::Object(view), &PropertyKey::Index(0)).unwrap();
    match read {
        Value::Number(n) => assert_eq!(n.to_bits(), core_types::nan_box::CANONICAL_NAN_BITS),
        other => panic!("expected NaN, got {:?}", other),
    }
    assert_eq!(rt.typed_array_get(view, 0).unwrap(), Some(read));
}

#[test]
fn test_detached_view_reads_undefined() {
    let mut rt = runtime();
    let buf = rt.new_array_buffer(4).unwrap();
    let view = rt.new_typed_array(TypedArrayKind::Int32, buf, 0, 1).unwrap();
    let v = Value::Object(view);
    rt.set(&v, &PropertyKey::Index(0), Value::number(7.0), true).unwrap();
    rt.detach_array_buffer(buf).unwrap();
    assert!(rt.is_detached(buf).unwrap());
    assert_eq!(rt.get(&v, &PropertyKey::Index(0)).unwrap(), Value::Undefined);
    assert_eq!(rt.typed_array_length(view).unwrap(), 0);
}

// ============================================================================
// GC rooting
// ============================================================================

#[test]
fn test_flushed_temporaries_are_collected() {
    let mut rt = runtime();
    let marker = rt.gc_scope_marker();
    let kept = rt.new_object().unwrap();
    let handle = rt.persist(Value::Object(kept));
    let dropped = rt.new_object().unwrap();
    rt.flush_gc_scope(marker);
    rt.collect_garbage();
    assert!(rt.is_live(&Value::Object(kept)));
    assert!(!rt.is_live(&Value::Object(dropped)));
    assert_eq!(rt.unpersist(handle), Some(Value::Object(kept)));
    rt.collect_garbage();
    assert!(!rt.is_live(&Value::Object(kept)));
}

#[test]
fn test_weak_map_entry_dies_with_its_key() {
    let mut rt = runtime();
    let marker = rt.gc_scope_marker();
    let map = rt.new_weak_map().unwrap();
    let kept = rt.new_object().unwrap();
    let dropped = rt.new_object().unwrap();
    let payload = rt.new_object().unwrap();
    rt.update_weak_table(map, |t| {
        t.insert(kept, Value::number(1.0));
        t.insert(dropped, Value::Object(payload));
    })
    .unwrap();
    rt.flush_gc_scope(marker);
    rt.persist(Value::Object(map));
    rt.persist(Value::Object(kept));

    rt.collect_garbage();
    assert!(!rt.is_live(&Value::Object(dropped)));
    assert!(!rt.is_live(&Value::Object(payload)));
    let remaining = rt.update_weak_table(map, |t| t.keys().copied().collect::<Vec<_>>());
    assert_eq!(remaining.unwrap(), Some(vec![kept]));
    assert_eq!(rt.heap_stats().cleared_weak, 1);
}

#[test]
fn test_scavenge_prunes_weak_collections() {
    let mut rt = runtime();
    let marker = rt.gc_scope_marker();
    let set = rt.new_weak_set().unwrap();
    let member = rt.new_object().unwrap();
    let weak_ref = rt.new_weak_ref(member).unwrap();
    rt.update_weak_members(set, |m| m.insert(member)).unwrap();
    rt.flush_gc_scope(marker);
    rt.persist(Value::Object(set));
    rt.persist(Value::Object(weak_ref));

    rt.collect_young();
    assert!(!rt.is_live(&Value::Object(member)));
    assert_eq!(rt.weak_ref_target(weak_ref).unwrap(), Some(None));
    let len = rt.update_weak_members(set, |m| m.len()).unwrap();
    assert_eq!(len, Some(0));
}

#[test]
fn test_map_keys_are_held_strongly() {
    let mut rt = runtime();
    let marker = rt.gc_scope_marker();
    let map = rt.new_map().unwrap();
    let key_obj = rt.new_object().unwrap();
    rt.update_ordered_table(map, |t| t.insert(&Value::Object(key_obj), Value::Null))
        .unwrap();
    rt.flush_gc_scope(marker);
    rt.persist(Value::Object(map));

    rt.collect_garbage();
    assert!(rt.is_live(&Value::Object(key_obj)));
    let table = rt.ordered_table(map).unwrap().unwrap();
    assert!(table.contains(&Value::Object(key_obj)));
}

// ============================================================================
// Inline cache
// ============================================================================

#[test]
fn test_inline_cache_goes_megamorphic() {
    let mut cache = InlineCache::new();
    assert_eq!(cache.lookup(ShapeId(1)), None);
    cache.update(ShapeId(1), 0);
    assert_eq!(cache.lookup(ShapeId(1)), Some(0));
    for i in 2..10 {
        cache.update(ShapeId(i), i);
    }
    assert!(cache.is_megamorphic());
    assert_eq!(cache.lookup(ShapeId(1)), None);
}
