//! `Object` constructor and `Object.prototype`

use core_types::{HeapRef, Value};
use interpreter::{
    CallArgs, JsResult, Property, PropertyDescriptor, PropertyKey, PropertyValue, Runtime,
};

use crate::{constructor, describe, method};

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().object_prototype;
    let ctor = constructor(rt, "Object", 1, object_constructor, 0, proto)?;

    let statics: [(&str, u32, interpreter::NativeFunction); 19] = [
        ("is", 2, object_is),
        ("keys", 1, object_keys),
        ("values", 1, object_values),
        ("entries", 1, object_entries),
        ("getPrototypeOf", 1, object_get_prototype_of),
        ("setPrototypeOf", 2, object_set_prototype_of),
        ("create", 2, object_create),
        ("defineProperty", 3, object_define_property),
        ("defineProperties", 2, object_define_properties),
        ("getOwnPropertyDescriptor", 2, object_get_own_property_descriptor),
        ("getOwnPropertyNames", 1, object_get_own_property_names),
        ("assign", 2, object_assign),
        ("freeze", 1, object_freeze),
        ("isFrozen", 1, object_is_frozen),
        ("seal", 1, object_seal),
        ("isSealed", 1, object_is_sealed),
        ("preventExtensions", 1, object_prevent_extensions),
        ("isExtensible", 1, object_is_extensible),
        ("fromEntries", 1, object_from_entries),
    ];
    for (name, arity, func) in statics {
        method(rt, ctor, name, arity, func)?;
    }

    method(rt, proto, "hasOwnProperty", 1, proto_has_own_property)?;
    method(rt, proto, "isPrototypeOf", 1, proto_is_prototype_of)?;
    method(rt, proto, "propertyIsEnumerable", 1, proto_property_is_enumerable)?;
    method(rt, proto, "toString", 0, proto_to_string)?;
    method(rt, proto, "toLocaleString", 0, proto_to_locale_string)?;
    method(rt, proto, "valueOf", 0, proto_value_of)?;
    Ok(())
}

fn object_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    if args.is_construct() && args.new_target != Value::Object(args.callee) {
        let fallback = rt.intrinsics().object_prototype;
        let proto = rt.prototype_from_constructor(&args.new_target, fallback)?;
        return Ok(Value::Object(rt.new_object_with_prototype(Some(proto))?));
    }
    let value = args.arg(0);
    if value.is_nullish() {
        return Ok(Value::Object(rt.new_object()?));
    }
    Ok(Value::Object(rt.to_object(&value)?))
}

fn object_is(_rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(args.arg(0).same_value(&args.arg(1))))
}

fn object_keys(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = rt.to_object(&args.arg(0))?;
    rt.root(Value::Object(obj));
    let keys: Vec<Value> = rt
        .own_enumerable_string_keys(obj)?
        .iter()
        .map(PropertyKey::to_value)
        .collect();
    Ok(Value::Object(rt.new_array(keys)?))
}

fn enumerable_entries(rt: &mut Runtime, target: &Value) -> JsResult<Vec<(PropertyKey, Value)>> {
    let obj = rt.to_object(target)?;
    rt.root(Value::Object(obj));
    let mut out = Vec::new();
    for key in rt.own_keys(obj)? {
        if key.is_symbol() {
            continue;
        }
        // A getter may have deleted or hidden the key since own_keys ran.
        match rt.get_own_property(obj, &key)? {
            Some(prop) if prop.flags.enumerable => {
                let value = rt.get(&Value::Object(obj), &key)?;
                rt.root(value.clone());
                out.push((key, value));
            }
            _ => {}
        }
    }
    Ok(out)
}

fn object_values(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let values = enumerable_entries(rt, &args.arg(0))?
        .into_iter()
        .map(|(_, v)| v)
        .collect();
    Ok(Value::Object(rt.new_array(values)?))
}

fn object_entries(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let entries = enumerable_entries(rt, &args.arg(0))?;
    let mut pairs = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let pair = rt.new_array(vec![key.to_value(), value])?;
        rt.root(Value::Object(pair));
        pairs.push(Value::Object(pair));
    }
    Ok(Value::Object(rt.new_array(pairs)?))
}

fn object_from_entries(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let source = args.arg(0);
    if source.is_nullish() {
        return rt.throw_type_error(&format!("{} is not iterable", source));
    }
    let result = rt.new_object()?;
    rt.root(Value::Object(result));
    let len = crate::length_of(rt, &source)?;
    for i in 0..len {
        let entry = rt.get(&source, &PropertyKey::from(i as u32))?;
        if !matches!(entry, Value::Object(_)) {
            let message = format!("Iterator value {} is not an entry object", describe(&entry));
            return rt.throw_type_error(&message);
        }
        let k = rt.get(&entry, &PropertyKey::Index(0))?;
        let v = rt.get(&entry, &PropertyKey::Index(1))?;
        let key = rt.to_property_key(&k)?;
        rt.create_data_property(result, &key, v)?;
    }
    Ok(Value::Object(result))
}

fn object_get_prototype_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = rt.to_object(&args.arg(0))?;
    Ok(match rt.get_prototype_of(obj)? {
        Some(p) => Value::Object(p),
        None => Value::Null,
    })
}

/// An `Object` or `null` prototype argument.
fn prototype_argument(rt: &mut Runtime, value: &Value) -> JsResult<Option<HeapRef>> {
    match value {
        Value::Object(r) => Ok(Some(*r)),
        Value::Null => Ok(None),
        other => {
            let message = format!(
                "Object prototype may only be an Object or null: {}",
                describe(other)
            );
            rt.throw_type_error(&message)
        }
    }
}

fn object_set_prototype_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let target = args.arg(0);
    if target.is_nullish() {
        return rt.throw_type_error("Object.setPrototypeOf called on null or undefined");
    }
    let proto = prototype_argument(rt, &args.arg(1))?;
    let Value::Object(r) = target else {
        return Ok(target);
    };
    if !rt.set_prototype_of(r, proto)? {
        if rt.object(r)?.extensible {
            return rt.throw_type_error("Cyclic __proto__ value");
        }
        return rt.throw_type_error("Object.setPrototypeOf called on a non-extensible object");
    }
    Ok(target)
}

fn object_create(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let proto = prototype_argument(rt, &args.arg(0))?;
    let obj = rt.new_object_with_prototype(proto)?;
    rt.root(Value::Object(obj));
    let props = args.arg(1);
    if !matches!(props, Value::Undefined) {
        define_properties(rt, obj, &props)?;
    }
    Ok(Value::Object(obj))
}

/// `ToPropertyDescriptor`.
pub(crate) fn to_property_descriptor(
    rt: &mut Runtime,
    value: &Value,
) -> JsResult<PropertyDescriptor> {
    let Value::Object(obj) = value else {
        let message = format!("Property description must be an object: {}", describe(value));
        return rt.throw_type_error(&message);
    };
    let mut desc = PropertyDescriptor::default();
    let field = |rt: &mut Runtime, name: &str| -> JsResult<Option<Value>> {
        let key = PropertyKey::from(name);
        if rt.has_property(*obj, &key)? {
            Ok(Some(rt.get(&Value::Object(*obj), &key)?))
        } else {
            Ok(None)
        }
    };
    desc.enumerable = field(rt, "enumerable")?.map(|v| v.is_truthy());
    desc.configurable = field(rt, "configurable")?.map(|v| v.is_truthy());
    desc.value = field(rt, "value")?;
    desc.writable = field(rt, "writable")?.map(|v| v.is_truthy());
    for (name, slot) in [("get", 0), ("set", 1)] {
        let Some(f) = field(rt, name)? else { continue };
        if !matches!(f, Value::Undefined) && !rt.is_callable(&f) {
            let which = if slot == 0 { "Getter" } else { "Setter" };
            let message = format!("{} must be a function: {}", which, describe(&f));
            return rt.throw_type_error(&message);
        }
        if slot == 0 {
            desc.get = Some(f);
        } else {
            desc.set = Some(f);
        }
    }
    if desc.is_accessor() && desc.is_data() {
        return rt.throw_type_error(
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
        );
    }
    Ok(desc)
}

/// `FromPropertyDescriptor`.
pub(crate) fn from_property(rt: &mut Runtime, prop: &Property) -> JsResult<Value> {
    let obj = rt.new_object()?;
    let put = |rt: &mut Runtime, name: &str, value: Value| {
        rt.create_data_property(obj, &PropertyKey::from(name), value)
    };
    match &prop.value {
        PropertyValue::Data(v) => {
            put(rt, "value", v.clone())?;
            put(rt, "writable", Value::Boolean(prop.flags.writable))?;
        }
        PropertyValue::Accessor { get, set } => {
            put(rt, "get", get.clone())?;
            put(rt, "set", set.clone())?;
        }
    }
    put(rt, "enumerable", Value::Boolean(prop.flags.enumerable))?;
    put(rt, "configurable", Value::Boolean(prop.flags.configurable))?;
    Ok(Value::Object(obj))
}

fn define_or_throw(
    rt: &mut Runtime,
    obj: HeapRef,
    key: &PropertyKey,
    desc: PropertyDescriptor,
) -> JsResult<()> {
    if rt.define_own_property(obj, key, desc)? {
        return Ok(());
    }
    let message = format!("Cannot redefine property: {}", key);
    rt.throw_type_error(&message)
}

fn object_define_property(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let Value::Object(obj) = args.arg(0) else {
        return rt.throw_type_error("Object.defineProperty called on non-object");
    };
    let key = rt.to_property_key(&args.arg(1))?;
    let desc = to_property_descriptor(rt, &args.arg(2))?;
    define_or_throw(rt, obj, &key, desc)?;
    Ok(Value::Object(obj))
}

fn define_properties(rt: &mut Runtime, obj: HeapRef, props: &Value) -> JsResult<()> {
    let props_obj = rt.to_object(props)?;
    rt.root(Value::Object(props_obj));
    let mut descriptors = Vec::new();
    for key in rt.own_keys(props_obj)? {
        match rt.get_own_property(props_obj, &key)? {
            Some(prop) if prop.flags.enumerable => {
                let desc_obj = rt.get(&Value::Object(props_obj), &key)?;
                let desc = to_property_descriptor(rt, &desc_obj)?;
                descriptors.push((key, desc));
            }
            _ => {}
        }
    }
    for (key, desc) in descriptors {
        define_or_throw(rt, obj, &key, desc)?;
    }
    Ok(())
}

fn object_define_properties(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let Value::Object(obj) = args.arg(0) else {
        return rt.throw_type_error("Object.defineProperties called on non-object");
    };
    define_properties(rt, obj, &args.arg(1))?;
    Ok(Value::Object(obj))
}

fn object_get_own_property_descriptor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = rt.to_object(&args.arg(0))?;
    rt.root(Value::Object(obj));
    let key = rt.to_property_key(&args.arg(1))?;
    match rt.get_own_property(obj, &key)? {
        Some(prop) => from_property(rt, &prop),
        None => Ok(Value::Undefined),
    }
}

fn object_get_own_property_names(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let obj = rt.to_object(&args.arg(0))?;
    rt.root(Value::Object(obj));
    let names = rt
        .own_keys(obj)?
        .iter()
        .filter(|k| !k.is_symbol())
        .map(PropertyKey::to_value)
        .collect();
    Ok(Value::Object(rt.new_array(names)?))
}

fn object_assign(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let target = rt.to_object(&args.arg(0))?;
    rt.root(Value::Object(target));
    for source in args.args.iter().skip(1) {
        if source.is_nullish() {
            continue;
        }
        let from = rt.to_object(source)?;
        rt.root(Value::Object(from));
        for key in rt.own_keys(from)? {
            match rt.get_own_property(from, &key)? {
                Some(prop) if prop.flags.enumerable => {
                    let value = rt.get(&Value::Object(from), &key)?;
                    rt.set(&Value::Object(target), &key, value, true)?;
                }
                _ => {}
            }
        }
    }
    Ok(Value::Object(target))
}

fn object_freeze(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let target = args.arg(0);
    if let Value::Object(r) = target {
        if !rt.set_integrity_level(r, true)? {
            return rt.throw_type_error("Cannot freeze");
        }
    }
    Ok(target)
}

fn object_is_frozen(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(match args.arg(0) {
        Value::Object(r) => rt.test_integrity_level(r, true)?,
        _ => true,
    }))
}

fn object_seal(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let target = args.arg(0);
    if let Value::Object(r) = target {
        if !rt.set_integrity_level(r, false)? {
            return rt.throw_type_error("Cannot seal");
        }
    }
    Ok(target)
}

fn object_is_sealed(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(match args.arg(0) {
        Value::Object(r) => rt.test_integrity_level(r, false)?,
        _ => true,
    }))
}

fn object_prevent_extensions(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let target = args.arg(0);
    if let Value::Object(r) = target {
        if !rt.prevent_extensions(r)? {
            return rt.throw_type_error("Cannot prevent extensions");
        }
    }
    Ok(target)
}

fn object_is_extensible(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(match args.arg(0) {
        Value::Object(r) => rt.object(r)?.extensible,
        _ => false,
    }))
}

fn proto_has_own_property(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let key = rt.to_property_key(&args.arg(0))?;
    let obj = rt.to_object(&args.this)?;
    Ok(Value::Boolean(rt.has_own_property(obj, &key)?))
}

fn proto_is_prototype_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let Value::Object(mut v) = args.arg(0) else {
        return Ok(Value::Boolean(false));
    };
    let obj = rt.to_object(&args.this)?;
    let limit = rt.config().max_prototype_chain;
    for _ in 0..limit {
        match rt.get_prototype_of(v)? {
            Some(p) if p == obj => return Ok(Value::Boolean(true)),
            Some(p) => v = p,
            None => return Ok(Value::Boolean(false)),
        }
    }
    rt.throw_range_error("Maximum prototype chain length exceeded")
}

fn proto_property_is_enumerable(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let key = rt.to_property_key(&args.arg(0))?;
    let obj = rt.to_object(&args.this)?;
    Ok(Value::Boolean(
        rt.get_own_property(obj, &key)?
            .map_or(false, |p| p.flags.enumerable),
    ))
}

fn proto_to_string(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let tag = match &args.this {
        Value::Undefined => "Undefined",
        Value::Null => "Null",
        this => {
            let obj = rt.to_object(this)?;
            rt.object(obj)?.class_name()
        }
    };
    Ok(Value::string(&format!("[object {}]", tag)))
}

fn proto_to_locale_string(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    rt.invoke(&args.this, "toString", Vec::new())
}

fn proto_value_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Object(rt.to_object(&args.this)?))
}
