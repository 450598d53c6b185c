//! Error constructors
//!
//! `Error` and its subtypes share one native body; the callee's magic
//! selects the [`ErrorKind`]. The stack is captured when the error is
//! constructed, without the constructor's own frame.

use core_types::{error_header, format_stack, ErrorKind, HeapRef, Value};
use interpreter::object::ObjectClass;
use interpreter::{CallArgs, JsResult, PropertyFlags, PropertyKey, Runtime};

use crate::{constructor, method};

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let mut base = None;
    for (magic, kind) in ErrorKind::ALL.into_iter().enumerate() {
        let proto = rt.intrinsics().error_prototype(kind);
        let ctor = constructor(rt, kind.name(), 1, error_constructor, magic as u32, proto)?;
        match base {
            None => base = Some(ctor),
            Some(error_ctor) => {
                rt.set_prototype_of(ctor, Some(error_ctor))?;
            }
        }
    }
    let proto = rt.intrinsics().error_prototype(ErrorKind::Error);
    method(rt, proto, "toString", 0, error_to_string)?;
    Ok(())
}

fn error_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let kind = ErrorKind::ALL
        .get(args.magic as usize)
        .copied()
        .unwrap_or(ErrorKind::Error);
    let new_target = if args.is_construct() {
        args.new_target.clone()
    } else {
        Value::Object(args.callee)
    };
    let fallback = rt.intrinsics().error_prototype(kind);
    let proto = rt.prototype_from_constructor(&new_target, fallback)?;
    let message = match args.arg(0) {
        Value::Undefined => None,
        v => Some(rt.to_string(&v)?),
    };
    let err = rt.create_error_object(kind, message.as_deref(), Some(proto))?;
    rt.root(Value::Object(err));
    drop_constructor_frame(rt, err, kind, message.as_deref().unwrap_or(""))?;

    if let Value::Object(options) = args.arg(1) {
        let key = PropertyKey::from("cause");
        if rt.has_property(options, &key)? {
            let cause = rt.get(&Value::Object(options), &key)?;
            rt.define_property_or_throw(err, key, cause, PropertyFlags::HIDDEN)?;
        }
    }
    Ok(Value::Object(err))
}

/// Remove the innermost native frame (this constructor) from the captured
/// trace and re-render `stack`.
fn drop_constructor_frame(
    rt: &mut Runtime,
    err: HeapRef,
    kind: ErrorKind,
    message: &str,
) -> JsResult<()> {
    let frames = match &mut rt.object_mut(err)?.class {
        ObjectClass::Error(data) => {
            if data.frames.first().map_or(false, |f| f.is_native) {
                data.frames.remove(0);
            }
            data.frames.clone()
        }
        _ => return Ok(()),
    };
    let stack = format_stack(&error_header(kind.name(), message), &frames);
    rt.define_property_or_throw(
        err,
        PropertyKey::from("stack"),
        Value::string(&stack),
        PropertyFlags::HIDDEN,
    )
}

fn error_to_string(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    if !matches!(args.this, Value::Object(_)) {
        return rt.throw_type_error("Error.prototype.toString called on non-object");
    }
    let name = match rt.get_by_name(&args.this, "name")? {
        Value::Undefined => "Error".into(),
        v => rt.to_string(&v)?,
    };
    let message = match rt.get_by_name(&args.this, "message")? {
        Value::Undefined => "".into(),
        v => rt.to_string(&v)?,
    };
    Ok(Value::string(&error_header(&name, &message)))
}
