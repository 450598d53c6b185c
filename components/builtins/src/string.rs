//! `String` constructor and `String.prototype`
//!
//! Strings are stored as UTF-8 but indexed in UTF-16 code units, so every
//! positional method converts to units first.

use std::rc::Rc;

use core_types::number::{is_js_whitespace, to_uint16};
use core_types::Value;
use interpreter::object::ObjectClass;
use interpreter::{CallArgs, JsResult, Runtime};

use crate::{constructor, method};

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().string_prototype;
    let ctor = constructor(rt, "String", 1, string_constructor, 0, proto)?;
    method(rt, ctor, "fromCharCode", 1, string_from_char_code)?;

    let methods: [(&str, u32, interpreter::NativeFunction); 25] = [
        ("charAt", 1, string_char_at),
        ("charCodeAt", 1, string_char_code_at),
        ("codePointAt", 1, string_code_point_at),
        ("at", 1, string_at),
        ("indexOf", 1, string_index_of),
        ("lastIndexOf", 1, string_last_index_of),
        ("includes", 1, string_includes),
        ("startsWith", 1, string_starts_with),
        ("endsWith", 1, string_ends_with),
        ("slice", 2, string_slice),
        ("substring", 2, string_substring),
        ("toUpperCase", 0, string_to_upper_case),
        ("toLowerCase", 0, string_to_lower_case),
        ("trim", 0, string_trim),
        ("trimStart", 0, string_trim_start),
        ("trimEnd", 0, string_trim_end),
        ("padStart", 2, string_pad_start),
        ("padEnd", 2, string_pad_end),
        ("repeat", 1, string_repeat),
        ("split", 2, string_split),
        ("concat", 1, string_concat),
        ("toString", 0, string_to_string),
        ("valueOf", 0, string_to_string),
        ("localeCompare", 1, string_locale_compare),
        ("normalize", 0, string_normalize),
    ];
    for (name, arity, func) in methods {
        method(rt, proto, name, arity, func)?;
    }
    Ok(())
}

fn units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn from_units(units: &[u16]) -> Value {
    Value::string(&String::from_utf16_lossy(units))
}

/// `RequireObjectCoercible(this)` then `ToString`.
fn this_string(rt: &mut Runtime, args: &CallArgs, method: &str) -> JsResult<Rc<str>> {
    if args.this.is_nullish() {
        let message = format!(
            "String.prototype.{} called on null or undefined",
            method
        );
        return rt.throw_type_error(&message);
    }
    rt.to_string(&args.this)
}

fn string_constructor(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s: Rc<str> = match args.args.first() {
        None => "".into(),
        Some(Value::Symbol(id)) if !args.is_construct() => {
            let description = rt.symbol_description(*id).unwrap_or_else(|| "".into());
            format!("Symbol({})", description).into()
        }
        Some(v) => rt.to_string(v)?,
    };
    if !args.is_construct() {
        return Ok(Value::String(s));
    }
    let wrapper = rt.to_object(&Value::String(s))?;
    let fallback = rt.intrinsics().string_prototype;
    let proto = rt.prototype_from_constructor(&args.new_target, fallback)?;
    if proto != fallback {
        rt.set_prototype_of(wrapper, Some(proto))?;
    }
    Ok(Value::Object(wrapper))
}

fn string_from_char_code(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let mut out = Vec::with_capacity(args.len());
    for a in &args.args {
        out.push(to_uint16(rt.to_number(a)?));
    }
    Ok(from_units(&out))
}

/// Position argument as an integer, `0` when undefined.
fn position(rt: &mut Runtime, value: &Value) -> JsResult<f64> {
    rt.to_integer(value)
}

fn string_char_at(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "charAt")?);
    let pos = position(rt, &args.arg(0))?;
    if pos < 0.0 || pos >= s.len() as f64 {
        return Ok(Value::string(""));
    }
    Ok(from_units(&s[pos as usize..pos as usize + 1]))
}

fn string_char_code_at(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "charCodeAt")?);
    let pos = position(rt, &args.arg(0))?;
    if pos < 0.0 || pos >= s.len() as f64 {
        return Ok(Value::number(f64::NAN));
    }
    Ok(Value::number(s[pos as usize] as f64))
}

fn string_code_point_at(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "codePointAt")?);
    let pos = position(rt, &args.arg(0))?;
    if pos < 0.0 || pos >= s.len() as f64 {
        return Ok(Value::Undefined);
    }
    let i = pos as usize;
    let first = s[i];
    if (0xD800..0xDC00).contains(&first) {
        if let Some(&second) = s.get(i + 1) {
            if (0xDC00..0xE000).contains(&second) {
                let cp = 0x10000 + ((first as u32 - 0xD800) << 10) + (second as u32 - 0xDC00);
                return Ok(Value::number(cp as f64));
            }
        }
    }
    Ok(Value::number(first as f64))
}

fn string_at(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "at")?);
    let rel = position(rt, &args.arg(0))?;
    let k = if rel >= 0.0 { rel } else { s.len() as f64 + rel };
    if k < 0.0 || k >= s.len() as f64 {
        return Ok(Value::Undefined);
    }
    Ok(from_units(&s[k as usize..k as usize + 1]))
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= haystack.len()).then_some(from);
    }
    (from..=haystack.len().saturating_sub(needle.len()))
        .find(|&i| haystack[i..].starts_with(needle))
}

fn string_index_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "indexOf")?);
    let search = units(&rt.to_string(&args.arg(0))?);
    let from = position(rt, &args.arg(1))?.clamp(0.0, s.len() as f64) as usize;
    Ok(Value::number(
        find_units(&s, &search, from).map_or(-1.0, |i| i as f64),
    ))
}

fn string_last_index_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "lastIndexOf")?);
    let search = units(&rt.to_string(&args.arg(0))?);
    let n = rt.to_number(&args.arg(1))?;
    let max_start = s.len().saturating_sub(search.len());
    let from = if n.is_nan() {
        max_start
    } else {
        (n.trunc().max(0.0) as usize).min(max_start)
    };
    if search.len() > s.len() {
        return Ok(Value::number(-1.0));
    }
    let found = (0..=from).rev().find(|&i| s[i..].starts_with(&search));
    Ok(Value::number(found.map_or(-1.0, |i| i as f64)))
}

fn string_includes(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "includes")?);
    let search = units(&rt.to_string(&args.arg(0))?);
    let from = position(rt, &args.arg(1))?.clamp(0.0, s.len() as f64) as usize;
    Ok(Value::Boolean(find_units(&s, &search, from).is_some()))
}

fn string_starts_with(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "startsWith")?);
    let search = units(&rt.to_string(&args.arg(0))?);
    let start = position(rt, &args.arg(1))?.clamp(0.0, s.len() as f64) as usize;
    Ok(Value::Boolean(s[start..].starts_with(&search)))
}

fn string_ends_with(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "endsWith")?);
    let search = units(&rt.to_string(&args.arg(0))?);
    let end = match args.arg(1) {
        Value::Undefined => s.len(),
        v => position(rt, &v)?.clamp(0.0, s.len() as f64) as usize,
    };
    Ok(Value::Boolean(s[..end].ends_with(&search)))
}

fn string_slice(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "slice")?);
    let len = s.len() as u64;
    let start = crate::relative_index(rt, &args.arg(0), len, 0)? as usize;
    let end = crate::relative_index(rt, &args.arg(1), len, len)? as usize;
    if start >= end {
        return Ok(Value::string(""));
    }
    Ok(from_units(&s[start..end]))
}

fn string_substring(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = units(&this_string(rt, args, "substring")?);
    let len = s.len() as f64;
    let start = position(rt, &args.arg(0))?.clamp(0.0, len) as usize;
    let end = match args.arg(1) {
        Value::Undefined => s.len(),
        v => position(rt, &v)?.clamp(0.0, len) as usize,
    };
    let (from, to) = if start <= end { (start, end) } else { (end, start) };
    Ok(from_units(&s[from..to]))
}

fn string_to_upper_case(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = this_string(rt, args, "toUpperCase")?;
    Ok(Value::string(&s.to_uppercase()))
}

fn string_to_lower_case(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = this_string(rt, args, "toLowerCase")?;
    Ok(Value::string(&s.to_lowercase()))
}

fn string_trim(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = this_string(rt, args, "trim")?;
    Ok(Value::string(s.trim_matches(is_js_whitespace)))
}

fn string_trim_start(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = this_string(rt, args, "trimStart")?;
    Ok(Value::string(s.trim_start_matches(is_js_whitespace)))
}

fn string_trim_end(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = this_string(rt, args, "trimEnd")?;
    Ok(Value::string(s.trim_end_matches(is_js_whitespace)))
}

fn pad(rt: &mut Runtime, args: &CallArgs, at_start: bool) -> JsResult<Value> {
    let s = units(&this_string(rt, args, if at_start { "padStart" } else { "padEnd" })?);
    let max_len = rt.to_integer(&args.arg(0))?.max(0.0) as u64;
    let filler = match args.arg(1) {
        Value::Undefined => vec![b' ' as u16],
        v => units(&rt.to_string(&v)?),
    };
    if max_len <= s.len() as u64 || filler.is_empty() {
        return Ok(from_units(&s));
    }
    if max_len > MAX_STRING_LENGTH {
        return rt.throw_range_error("Invalid string length");
    }
    let fill_len = max_len as usize - s.len();
    let padding: Vec<u16> = filler.iter().copied().cycle().take(fill_len).collect();
    let out = if at_start {
        [padding, s].concat()
    } else {
        [s, padding].concat()
    };
    Ok(from_units(&out))
}

/// Longest string the runtime will build, in code units.
const MAX_STRING_LENGTH: u64 = (1 << 30) - 25;

fn string_pad_start(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    pad(rt, args, true)
}

fn string_pad_end(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    pad(rt, args, false)
}

fn string_repeat(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = this_string(rt, args, "repeat")?;
    let n = rt.to_integer(&args.arg(0))?;
    if n < 0.0 || n.is_infinite() {
        let message = format!("Invalid count value: {}", core_types::number::number_to_string(n));
        return rt.throw_range_error(&message);
    }
    let total = s.encode_utf16().count() as f64 * n;
    if total > MAX_STRING_LENGTH as f64 {
        return rt.throw_range_error("Invalid string length");
    }
    Ok(Value::string(&s.repeat(n as usize)))
}

fn string_split(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = this_string(rt, args, "split")?;
    let limit = match args.arg(1) {
        Value::Undefined => u32::MAX,
        v => rt.to_uint32(&v)?,
    } as usize;
    let separator = match args.arg(0) {
        Value::Undefined => None,
        v => Some(rt.to_string(&v)?),
    };
    if limit == 0 {
        return Ok(Value::Object(rt.new_array(Vec::new())?));
    }
    let parts: Vec<Value> = match separator {
        None => vec![Value::String(s)],
        Some(sep) if sep.is_empty() => units(&s)
            .iter()
            .take(limit)
            .map(|u| from_units(std::slice::from_ref(u)))
            .collect(),
        Some(sep) => {
            let (hay, needle) = (units(&s), units(&sep));
            let mut out = Vec::new();
            let mut start = 0;
            while out.len() < limit {
                match find_units(&hay, &needle, start).filter(|&i| i < hay.len()) {
                    Some(i) => {
                        out.push(from_units(&hay[start..i]));
                        start = i + needle.len();
                    }
                    None => {
                        out.push(from_units(&hay[start..]));
                        break;
                    }
                }
            }
            out
        }
    };
    Ok(Value::Object(rt.new_array(parts)?))
}

fn string_concat(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let mut out = this_string(rt, args, "concat")?.to_string();
    for a in &args.args {
        out.push_str(&rt.to_string(a)?);
    }
    Ok(Value::string(&out))
}

fn string_to_string(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    match &args.this {
        Value::String(_) => return Ok(args.this.clone()),
        Value::Object(r) => {
            if let ObjectClass::Primitive(v @ Value::String(_)) = &rt.object(*r)?.class {
                return Ok(v.clone());
            }
        }
        _ => {}
    }
    rt.throw_type_error("String.prototype.toString requires that 'this' be a String")
}

fn string_locale_compare(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = this_string(rt, args, "localeCompare")?;
    let other = rt.to_string(&args.arg(0))?;
    Ok(Value::number(match s.cmp(&other) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    }))
}

fn string_normalize(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let s = this_string(rt, args, "normalize")?;
    match args.arg(0) {
        Value::Undefined => {}
        v => {
            let form = rt.to_string(&v)?;
            if !matches!(&*form, "NFC" | "NFD" | "NFKC" | "NFKD") {
                return rt.throw_range_error("The normalization form should be one of NFC, NFD, NFKC, NFKD.");
            }
        }
    }
    Ok(Value::String(s))
}
