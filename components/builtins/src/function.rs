//! `Function.prototype`

use core_types::Value;
use interpreter::{CallArgs, JsResult, Runtime, SYMBOL_HAS_INSTANCE};

use crate::{describe, method, symbol_method};

/// Largest argument list `apply` will spread.
const MAX_APPLY_ARGS: u64 = 65_535;

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().function_prototype;
    method(rt, proto, "call", 1, function_call)?;
    method(rt, proto, "apply", 2, function_apply)?;
    method(rt, proto, "bind", 1, function_bind)?;
    method(rt, proto, "toString", 0, function_to_string)?;
    symbol_method(
        rt,
        proto,
        SYMBOL_HAS_INSTANCE,
        "[Symbol.hasInstance]",
        1,
        function_has_instance,
    )?;
    Ok(())
}

fn require_callable(rt: &mut Runtime, this: &Value, method: &str) -> JsResult<()> {
    if rt.is_callable(this) {
        return Ok(());
    }
    let message = format!(
        "Function.prototype.{} called on {}, which is not a function",
        method,
        describe(this)
    );
    rt.throw_type_error(&message)
}

fn function_call(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_callable(rt, &args.this, "call")?;
    let rest = args.args.iter().skip(1).cloned().collect();
    rt.call(&args.this, args.arg(0), rest)
}

/// `CreateListFromArrayLike`.
pub(crate) fn list_from_array_like(rt: &mut Runtime, value: &Value) -> JsResult<Vec<Value>> {
    if value.is_nullish() {
        return Ok(Vec::new());
    }
    if !matches!(value, Value::Object(_)) {
        return rt.throw_type_error("CreateListFromArrayLike called on non-object");
    }
    let len = crate::length_of(rt, value)?;
    if len > MAX_APPLY_ARGS {
        return rt.throw_range_error("Maximum call stack size exceeded");
    }
    let mut out = Vec::with_capacity(len as usize);
    for i in 0..len as u32 {
        out.push(rt.get(value, &i.into())?);
    }
    Ok(out)
}

fn function_apply(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_callable(rt, &args.this, "apply")?;
    let list = list_from_array_like(rt, &args.arg(1))?;
    rt.call(&args.this, args.arg(0), list)
}

fn function_bind(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_callable(rt, &args.this, "bind")?;
    let Value::Object(target) = args.this else {
        return rt.throw_type_error("Bind must be called on a function");
    };
    let bound_args = args.args.iter().skip(1).cloned().collect();
    Ok(Value::Object(rt.new_bound_function(target, args.arg(0), bound_args)?))
}

fn function_to_string(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    require_callable(rt, &args.this, "toString")?;
    let name = match rt.get_by_name(&args.this, "name")? {
        Value::String(s) => s.to_string(),
        _ => String::new(),
    };
    Ok(Value::string(&format!("function {}() {{ [native code] }}", name)))
}

fn function_has_instance(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(rt.ordinary_has_instance(&args.this, &args.arg(0))?))
}
