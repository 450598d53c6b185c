//! `Number` constructor, `Number.prototype` and the numeric globals
//! `parseInt` / `parseFloat`

use core_types::number::{is_js_whitespace, number_to_string, string_to_number, to_int32};
use core_types::Value;
use interpreter::object::ObjectClass;
use interpreter::{CallArgs, JsResult, Numeric, PropertyKey, Runtime};
use num_traits::ToPrimitive;

use crate::{constant, constructor, method};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().number_prototype;
    let ctor = constructor(rt, "Number", 1, number_constructor, 0, proto)?;

    let constants = [
        ("MAX_SAFE_INTEGER", MAX_SAFE_INTEGER),
        ("MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("EPSILON", f64::EPSILON),
        ("NaN", f64::NAN),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
    ];
    for (name, value) in constants {
        constant(rt, ctor, name, Value::number(value))?;
    }
    method(rt, ctor, "isFinite", 1, number_is_finite)?;
    method(rt, ctor, "isInteger", 1, number_is_integer)?;
    method(rt, ctor, "isNaN", 1, number_is_nan)?;
    method(rt, ctor, "isSafeInteger", 1, number_is_safe_integer)?;

    // Number.parseInt and Number.parseFloat are the global functions.
    let parse_int = rt.register_native("parseInt", 2, global_parse_int)?;
    let parse_float = rt.register_native("parseFloat", 1, global_parse_float)?;
    rt.define_hidden(ctor, PropertyKey::from("parseInt"), Value::Object(parse_int))?;
    rt.define_hidden(ctor, PropertyKey::from("parseFloat"), Value::Object(parse_float))?;

    method(rt, proto, "toString", 1, number_to_string_method)?;
    method(rt, proto, "toLocaleString", 0, number_to_string_method)?;
    method(rt, proto, "valueOf", 0, number_value_of)?;
    method(rt, proto, "toFixed", 1, number_to_fixed)?;
    Ok(())
}

fn number_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let n = match args.args.first() {
        None => 0.0,
        Some(v) => match rt.to_numeric(v)? {
            Numeric::Number(n) => n,
            Numeric::BigInt(b) => b.to_f64().unwrap_or(f64::NAN),
        },
    };
    if !args.is_construct() {
        return Ok(Value::number(n));
    }
    let wrapper = rt.to_object(&Value::number(n))?;
    let fallback = rt.intrinsics().number_prototype;
    let proto = rt.prototype_from_constructor(&args.new_target, fallback)?;
    if proto != fallback {
        rt.set_prototype_of(wrapper, Some(proto))?;
    }
    Ok(Value::Object(wrapper))
}

/// `thisNumberValue`.
fn this_number(rt: &mut Runtime, this: &Value, method: &str) -> JsResult<f64> {
    match this {
        Value::Number(n) => return Ok(*n),
        Value::Object(r) => {
            if let ObjectClass::Primitive(Value::Number(n)) = rt.object(*r)?.class {
                return Ok(n);
            }
        }
        _ => {}
    }
    let message = format!(
        "Number.prototype.{} requires that 'this' be a Number",
        method
    );
    rt.throw_type_error(&message)
}

fn number_is_finite(_rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(matches!(args.arg(0), Value::Number(n) if n.is_finite())))
}

fn number_is_integer(_rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(
        matches!(args.arg(0), Value::Number(n) if n.is_finite() && n.trunc() == n),
    ))
}

fn number_is_nan(_rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(matches!(args.arg(0), Value::Number(n) if n.is_nan())))
}

fn number_is_safe_integer(_rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Boolean(matches!(
        args.arg(0),
        Value::Number(n) if n.is_finite() && n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER
    )))
}

fn number_value_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::number(this_number(rt, &args.this, "valueOf")?))
}

fn number_to_string_method(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let x = this_number(rt, &args.this, "toString")?;
    let radix = match args.arg(0) {
        Value::Undefined => 10.0,
        v => rt.to_integer(&v)?,
    };
    if !(2.0..=36.0).contains(&radix) {
        return rt.throw_range_error("toString() radix must be between 2 and 36");
    }
    if radix == 10.0 {
        return Ok(Value::string(&number_to_string(x)));
    }
    Ok(Value::string(&to_radix_string(x, radix as u32)))
}

/// Render `x` in base `radix` (not 10).
pub(crate) fn to_radix_string(x: f64, radix: u32) -> String {
    if x.is_nan() {
        return String::from("NaN");
    }
    if x.is_infinite() {
        return String::from(if x > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if x == 0.0 {
        return String::from("0");
    }
    let digit = |d: u32| std::char::from_digit(d, radix).unwrap_or('0');
    let negative = x < 0.0;
    let x = x.abs();
    let mut int_part = x.trunc();
    let mut frac = x - int_part;

    let mut int_digits = Vec::new();
    let r = radix as f64;
    while int_part >= 1.0 {
        let d = int_part % r;
        int_digits.push(digit(d as u32));
        int_part = ((int_part - d) / r).trunc();
    }
    if int_digits.is_empty() {
        int_digits.push('0');
    }
    int_digits.reverse();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.extend(int_digits);
    if frac > 0.0 {
        out.push('.');
        // 52 fraction bits never need more than 52 digits in any base >= 2.
        for _ in 0..52 {
            frac *= r;
            let d = frac.trunc();
            out.push(digit(d as u32));
            frac -= d;
            if frac == 0.0 {
                break;
            }
        }
    }
    out
}

fn number_to_fixed(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let x = this_number(rt, &args.this, "toFixed")?;
    let digits = rt.to_integer(&args.arg(0))?;
    if !(0.0..=100.0).contains(&digits) {
        return rt.throw_range_error("toFixed() digits argument must be between 0 and 100");
    }
    if !x.is_finite() || x.abs() >= 1e21 {
        return Ok(Value::string(&number_to_string(x)));
    }
    Ok(Value::string(&to_fixed(x, digits as usize)))
}

/// `x` with `digits` fraction digits, ties rounded away from zero.
pub(crate) fn to_fixed(x: f64, digits: usize) -> String {
    // Exact decimal expansion well past the rounding position.
    let exact = format!("{:.*}", digits + 30, x.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((&exact, ""));
    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(digits))
        .map(|b| b - b'0')
        .collect();
    let round_up = frac_part.as_bytes().get(digits).map_or(false, |b| *b >= b'5');
    if round_up {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, 1);
                break;
            }
            i -= 1;
            if kept[i] == 9 {
                kept[i] = 0;
            } else {
                kept[i] += 1;
                break;
            }
        }
    }
    let int_len = kept.len() - digits;
    let mut out = String::new();
    if x < 0.0 && kept.iter().any(|d| *d != 0) {
        out.push('-');
    }
    for (i, d) in kept.iter().enumerate() {
        if i == int_len {
            out.push('.');
        }
        out.push((b'0' + d) as char);
    }
    out
}

fn global_parse_int(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let input = rt.to_string(&args.arg(0))?;
    let radix = rt.to_number(&args.arg(1))?;
    Ok(Value::number(parse_int(&input, to_int32(radix))))
}

/// `parseInt` on an already converted string and radix.
pub(crate) fn parse_int(input: &str, radix: i32) -> f64 {
    let s = input.trim_start_matches(is_js_whitespace);
    let (sign, s) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let mut radix = radix;
    let mut s = s;
    let has_hex_prefix = s.starts_with("0x") || s.starts_with("0X");
    if radix == 0 {
        radix = if has_hex_prefix { 16 } else { 10 };
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if radix == 16 && has_hex_prefix {
        s = &s[2..];
    }
    let digits: String = s
        .chars()
        .take_while(|c| c.is_digit(radix as u32))
        .collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let magnitude = if radix == 10 {
        string_to_number(&digits)
    } else {
        digits.chars().fold(0.0, |acc, c| {
            acc * radix as f64 + c.to_digit(radix as u32).unwrap_or(0) as f64
        })
    };
    sign * magnitude
}

fn global_parse_float(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let input = rt.to_string(&args.arg(0))?;
    Ok(Value::number(parse_float(&input)))
}

/// Longest `StrDecimalLiteral` prefix of `input`, as a number.
pub(crate) fn parse_float(input: &str) -> f64 {
    let s = input.trim_start_matches(is_js_whitespace);
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if bytes.first() == Some(&b'-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    let digits_from = |mut i: usize| {
        while bytes.get(i).map_or(false, u8::is_ascii_digit) {
            i += 1;
        }
        i
    };
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - end - 1;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}
