//! Global value properties and host functions

use core_types::Value;
use interpreter::{CallArgs, JsResult, PropertyKey, Runtime};

use crate::{constant, describe};

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let global = rt.global_object();
    rt.define_hidden(global, PropertyKey::from("globalThis"), Value::Object(global))?;
    constant(rt, global, "NaN", Value::number(f64::NAN))?;
    constant(rt, global, "Infinity", Value::number(f64::INFINITY))?;
    constant(rt, global, "undefined", Value::Undefined)?;

    rt.register_native("isNaN", 1, global_is_nan)?;
    rt.register_native("isFinite", 1, global_is_finite)?;
    rt.register_native("gc", 0, global_gc)?;
    rt.register_native("detachArrayBuffer", 1, global_detach_array_buffer)?;

    // `print` is the shell spelling of console.log.
    let console = rt.get_by_name(&Value::Object(global), "console")?;
    if !console.is_nullish() {
        let log = rt.get_by_name(&console, "log")?;
        rt.define_hidden(global, PropertyKey::from("print"), log)?;
    }
    Ok(())
}

fn global_is_nan(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(rt.to_number(&args.arg(0))?.is_nan()))
}

fn global_is_finite(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(rt.to_number(&args.arg(0))?.is_finite()))
}

/// Force a full collection.
fn global_gc(rt: &mut Runtime, _args: &CallArgs) -> JsResult<Value> {
    rt.collect_garbage();
    Ok(Value::Undefined)
}

fn global_detach_array_buffer(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let buffer = args.arg(0);
    match buffer {
        Value::Object(r) if rt.is_array_buffer(&buffer) => {
            rt.detach_array_buffer(r)?;
            Ok(Value::Undefined)
        }
        other => {
            let message = format!("{} is not an ArrayBuffer", describe(&other));
            rt.throw_type_error(&message)
        }
    }
}
