//! `BigInt` function and prototype

use std::rc::Rc;

use core_types::Value;
use interpreter::object::ObjectClass;
use interpreter::{CallArgs, JsResult, PreferredType, PropertyFlags, PropertyKey, Runtime};
use num_bigint::BigInt;
use num_traits::One;

use crate::method;

/// Widest `asIntN` / `asUintN` accepted.
const MAX_BITS: f64 = (1u64 << 24) as f64;

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().bigint_prototype;
    let ctor = rt.new_native("BigInt", 1, bigint_function, 0, false)?;
    rt.define_property_or_throw(
        ctor,
        PropertyKey::from("prototype"),
        Value::Object(proto),
        PropertyFlags::FROZEN,
    )?;
    rt.define_hidden(proto, PropertyKey::from("constructor"), Value::Object(ctor))?;
    let global = rt.global_object();
    rt.define_hidden(global, PropertyKey::from("BigInt"), Value::Object(ctor))?;

    method(rt, ctor, "asIntN", 2, bigint_as_int_n)?;
    method(rt, ctor, "asUintN", 2, bigint_as_uint_n)?;
    method(rt, proto, "toString", 0, bigint_to_string)?;
    method(rt, proto, "toLocaleString", 0, bigint_to_string)?;
    method(rt, proto, "valueOf", 0, bigint_value_of)?;
    Ok(())
}

fn bigint_function(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let prim = rt.to_primitive(&args.arg(0), PreferredType::Number)?;
    let b = match prim {
        Value::Number(n) => rt.number_to_bigint(n)?,
        other => rt.to_bigint(&other)?,
    };
    Ok(Value::BigInt(b))
}

fn this_bigint(rt: &mut Runtime, this: &Value, method: &str) -> JsResult<Rc<BigInt>> {
    match this {
        Value::BigInt(b) => return Ok(b.clone()),
        Value::Object(r) => {
            if let ObjectClass::Primitive(Value::BigInt(b)) = &rt.object(*r)?.class {
                return Ok(b.clone());
            }
        }
        _ => {}
    }
    let message = format!(
        "BigInt.prototype.{} requires that 'this' be a BigInt",
        method
    );
    rt.throw_type_error(&message)
}

fn bigint_to_string(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let b = this_bigint(rt, &args.this, "toString")?;
    let radix = match args.arg(0) {
        Value::Undefined => 10.0,
        v => rt.to_integer(&v)?,
    };
    if !(2.0..=36.0).contains(&radix) {
        return rt.throw_range_error("toString() radix must be between 2 and 36");
    }
    Ok(Value::string(&b.to_str_radix(radix as u32)))
}

fn bigint_value_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::BigInt(this_bigint(rt, &args.this, "valueOf")?))
}

/// `bits` and `bigint` arguments of `asIntN` / `asUintN`, with
/// `bigint mod 2^bits` already reduced into `[0, 2^bits)`.
fn wrap_args(rt: &mut Runtime, args: &CallArgs) -> JsResult<(u64, BigInt, BigInt)> {
    let bits = rt.to_integer(&args.arg(0))?;
    if !(0.0..=MAX_BITS).contains(&bits) {
        return rt.throw_range_error("Maximum BigInt size exceeded");
    }
    let b = rt.to_bigint(&args.arg(1))?;
    let bits = bits as u64;
    let modulus = BigInt::one() << bits;
    let reduced = ((b.as_ref() % &modulus) + &modulus) % &modulus;
    Ok((bits, modulus, reduced))
}

fn bigint_as_uint_n(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (_, _, reduced) = wrap_args(rt, args)?;
    Ok(Value::BigInt(Rc::new(reduced)))
}

fn bigint_as_int_n(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let (bits, modulus, reduced) = wrap_args(rt, args)?;
    if bits == 0 {
        return Ok(Value::BigInt(Rc::new(reduced)));
    }
    let half = BigInt::one() << (bits - 1);
    let signed = if reduced >= half {
        reduced - modulus
    } else {
        reduced
    };
    Ok(Value::BigInt(Rc::new(signed)))
}
