//! `Boolean` constructor and prototype

use core_types::Value;
use interpreter::object::ObjectClass;
use interpreter::{CallArgs, JsResult, Runtime};

use crate::{constructor, method};

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().boolean_prototype;
    constructor(rt, "Boolean", 1, boolean_constructor, 0, proto)?;
    method(rt, proto, "toString", 0, boolean_to_string)?;
    method(rt, proto, "valueOf", 0, boolean_value_of)?;
    Ok(())
}

fn boolean_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let b = args.arg(0).is_truthy();
    if !args.is_construct() {
        return Ok(Value::Boolean(b));
    }
    let wrapper = rt.to_object(&Value::Boolean(b))?;
    let fallback = rt.intrinsics().boolean_prototype;
    let proto = rt.prototype_from_constructor(&args.new_target, fallback)?;
    if proto != fallback {
        rt.set_prototype_of(wrapper, Some(proto))?;
    }
    Ok(Value::Object(wrapper))
}

fn this_boolean(rt: &mut Runtime, this: &Value, method: &str) -> JsResult<bool> {
    match this {
        Value::Boolean(b) => return Ok(*b),
        Value::Object(r) => {
            if let ObjectClass::Primitive(Value::Boolean(b)) = rt.object(*r)?.class {
                return Ok(b);
            }
        }
        _ => {}
    }
    let message = format!(
        "Boolean.prototype.{} requires that 'this' be a Boolean",
        method
    );
    rt.throw_type_error(&message)
}

fn boolean_to_string(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let b = this_boolean(rt, &args.this, "toString")?;
    Ok(Value::string(if b { "true" } else { "false" }))
}

fn boolean_value_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(this_boolean(rt, &args.this, "valueOf")?))
}
