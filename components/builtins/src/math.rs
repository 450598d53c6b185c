//! The `Math` namespace
//!
//! One-argument functions share a single native body; the callee's magic
//! indexes [`UNARY`].

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

use core_types::number::to_uint32;
use core_types::Value;
use interpreter::{number_pow, CallArgs, JsResult, Runtime};

use crate::{constant, method, method_with_magic, namespace};

type UnaryFn = fn(f64) -> f64;

const UNARY: &[(&str, UnaryFn)] = &[
    ("abs", f64::abs),
    ("acos", f64::acos),
    ("acosh", f64::acosh),
    ("asin", f64::asin),
    ("asinh", f64::asinh),
    ("atan", f64::atan),
    ("atanh", f64::atanh),
    ("cbrt", f64::cbrt),
    ("ceil", f64::ceil),
    ("cos", f64::cos),
    ("cosh", f64::cosh),
    ("exp", f64::exp),
    ("expm1", f64::exp_m1),
    ("floor", f64::floor),
    ("fround", fround),
    ("log", f64::ln),
    ("log1p", f64::ln_1p),
    ("log10", f64::log10),
    ("log2", f64::log2),
    ("round", round),
    ("sign", sign),
    ("sin", f64::sin),
    ("sinh", f64::sinh),
    ("sqrt", f64::sqrt),
    ("tan", f64::tan),
    ("tanh", f64::tanh),
    ("trunc", f64::trunc),
];

/// xorshift64* state behind `Math.random`.
#[derive(Debug)]
struct RandomState(Cell<u64>);

impl RandomState {
    fn seeded() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x2545_f491_4f6c_dd1d);
        RandomState(Cell::new(nanos | 1))
    }

    fn next_f64(&self) -> f64 {
        let mut x = self.0.get();
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0.set(x);
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }
}

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let math = namespace(rt, "Math")?;
    let constants = [
        ("E", std::f64::consts::E),
        ("LN10", std::f64::consts::LN_10),
        ("LN2", std::f64::consts::LN_2),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("PI", std::f64::consts::PI),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
        ("SQRT2", std::f64::consts::SQRT_2),
    ];
    for (name, value) in constants {
        constant(rt, math, name, Value::number(value))?;
    }
    for (magic, (name, _)) in UNARY.iter().enumerate() {
        method_with_magic(rt, math, name, 1, math_unary, magic as u32)?;
    }
    method(rt, math, "atan2", 2, math_atan2)?;
    method(rt, math, "clz32", 1, math_clz32)?;
    method(rt, math, "hypot", 2, math_hypot)?;
    method(rt, math, "imul", 2, math_imul)?;
    method(rt, math, "max", 2, math_max)?;
    method(rt, math, "min", 2, math_min)?;
    method(rt, math, "pow", 2, math_pow)?;
    method(rt, math, "random", 0, math_random)?;
    rt.set_host_data(RandomState::seeded());
    Ok(())
}

fn fround(x: f64) -> f64 {
    x as f32 as f64
}

/// Round half toward +Infinity, keeping the sign of zero.
fn round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 || x.fract() == 0.0 {
        return x;
    }
    if x > 0.0 && x < 0.5 {
        return 0.0;
    }
    if x < 0.0 && x >= -0.5 {
        return -0.0;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn math_unary(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let x = rt.to_number(&args.arg(0))?;
    let f = UNARY
        .get(args.magic as usize)
        .map_or(f64::abs as UnaryFn, |(_, f)| *f);
    Ok(Value::number(f(x)))
}

fn numbers(rt: &mut Runtime, args: &CallArgs) -> JsResult<Vec<f64>> {
    args.args.iter().map(|v| rt.to_number(v)).collect()
}

fn math_atan2(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let y = rt.to_number(&args.arg(0))?;
    let x = rt.to_number(&args.arg(1))?;
    Ok(Value::number(y.atan2(x)))
}

fn math_clz32(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let n = to_uint32(rt.to_number(&args.arg(0))?);
    Ok(Value::number(n.leading_zeros() as f64))
}

fn math_hypot(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let values = numbers(rt, args)?;
    if values.iter().any(|v| v.is_infinite()) {
        return Ok(Value::number(f64::INFINITY));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Ok(Value::number(f64::NAN));
    }
    let largest = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if largest == 0.0 {
        return Ok(Value::number(0.0));
    }
    let sum: f64 = values.iter().map(|v| (v / largest).powi(2)).sum();
    Ok(Value::number(largest * sum.sqrt()))
}

fn math_imul(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let a = to_uint32(rt.to_number(&args.arg(0))?);
    let b = to_uint32(rt.to_number(&args.arg(1))?);
    Ok(Value::number(a.wrapping_mul(b) as i32 as f64))
}

fn math_max(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let values = numbers(rt, args)?;
    let result = values.into_iter().fold(f64::NEG_INFINITY, |acc, v| {
        if acc.is_nan() || v.is_nan() {
            f64::NAN
        } else if v > acc || (v == 0.0 && acc == 0.0 && acc.is_sign_negative()) {
            v
        } else {
            acc
        }
    });
    Ok(Value::number(result))
}

fn math_min(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let values = numbers(rt, args)?;
    let result = values.into_iter().fold(f64::INFINITY, |acc, v| {
        if acc.is_nan() || v.is_nan() {
            f64::NAN
        } else if v < acc || (v == 0.0 && acc == 0.0 && v.is_sign_negative()) {
            v
        } else {
            acc
        }
    });
    Ok(Value::number(result))
}

fn math_pow(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let base = rt.to_number(&args.arg(0))?;
    let exponent = rt.to_number(&args.arg(1))?;
    Ok(Value::number(number_pow(base, exponent)))
}

fn math_random(rt: &mut Runtime, _args: &CallArgs) -> JsResult<Value> {
    let n = rt
        .host_data::<RandomState>()
        .map_or(0.0, RandomState::next_f64);
    Ok(Value::number(n))
}
