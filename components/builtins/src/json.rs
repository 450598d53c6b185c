//! The `JSON` namespace
//!
//! `JSON.parse` decodes with `serde_json` (object key order preserved) and
//! then materializes script values; `JSON.stringify` walks script values
//! directly because it must observe `toJSON`, replacers and getters.

use core_types::number::number_to_string;
use core_types::{ErrorKind, HeapRef, Value};
use interpreter::object::ObjectClass;
use interpreter::{CallArgs, JsResult, PropertyKey, Runtime};

use crate::array::index_key;
use crate::{length_of, method, namespace};

/// Longest indentation unit `stringify` honors.
const MAX_GAP: usize = 10;

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let json = namespace(rt, "JSON")?;
    method(rt, json, "parse", 2, json_parse)?;
    method(rt, json, "stringify", 3, json_stringify)?;
    Ok(())
}

fn json_parse(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let text = rt.to_string(&args.arg(0))?;
    let parsed: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let message = format!(
                "Unexpected token in JSON at line {} column {}",
                e.line(),
                e.column()
            );
            return rt.throw_error(ErrorKind::SyntaxError, &message);
        }
    };
    let value = materialize(rt, &parsed)?;
    rt.root(value.clone());

    let reviver = args.arg(1);
    if !rt.is_callable(&reviver) {
        return Ok(value);
    }
    let root = rt.new_object()?;
    rt.root(Value::Object(root));
    rt.create_data_property(root, &PropertyKey::from(""), value)?;
    internalize(rt, root, PropertyKey::from(""), &reviver)
}

/// Build the script value for a decoded JSON document.
fn materialize(rt: &mut Runtime, json: &serde_json::Value) -> JsResult<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => {
            let arr = rt.new_array(Vec::new())?;
            rt.root(Value::Object(arr));
            for (i, item) in items.iter().enumerate() {
                let marker = rt.gc_scope_marker();
                let v = materialize(rt, item)?;
                rt.create_data_property(arr, &index_key(i as u64), v)?;
                rt.flush_gc_scope(marker);
            }
            Value::Object(arr)
        }
        serde_json::Value::Object(map) => {
            let obj = rt.new_object()?;
            rt.root(Value::Object(obj));
            for (key, item) in map {
                let marker = rt.gc_scope_marker();
                let v = materialize(rt, item)?;
                rt.create_data_property(obj, &PropertyKey::from(key.as_str()), v)?;
                rt.flush_gc_scope(marker);
            }
            Value::Object(obj)
        }
    })
}

/// `InternalizeJSONProperty`.
fn internalize(
    rt: &mut Runtime,
    holder: HeapRef,
    key: PropertyKey,
    reviver: &Value,
) -> JsResult<Value> {
    let value = rt.get(&Value::Object(holder), &key)?;
    if let Value::Object(obj) = value {
        rt.root(value.clone());
        let keys = if rt.object(obj)?.is_array() {
            let len = length_of(rt, &value)?;
            (0..len).map(index_key).collect()
        } else {
            rt.own_enumerable_string_keys(obj)?
        };
        for k in keys {
            let marker = rt.gc_scope_marker();
            let revived = internalize(rt, obj, k.clone(), reviver)?;
            if matches!(revived, Value::Undefined) {
                rt.delete_property(obj, &k)?;
            } else {
                rt.create_data_property(obj, &k, revived)?;
            }
            rt.flush_gc_scope(marker);
        }
    }
    rt.call(reviver, Value::Object(holder), vec![key.to_value(), value])
}

fn json_stringify(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let mut serializer = Serializer::new(rt, &args.arg(1), &args.arg(2))?;
    let wrapper = serializer.rt.new_object()?;
    serializer.rt.root(Value::Object(wrapper));
    serializer
        .rt
        .create_data_property(wrapper, &PropertyKey::from(""), args.arg(0))?;
    let mut out = String::new();
    let written = serializer.property(wrapper, PropertyKey::from(""), &mut out)?;
    Ok(if written {
        Value::string(&out)
    } else {
        Value::Undefined
    })
}

/// `JSON.stringify` state.
struct Serializer<'rt> {
    rt: &'rt mut Runtime,
    replacer: Option<Value>,
    property_list: Option<Vec<PropertyKey>>,
    gap: String,
    indent: String,
    stack: Vec<HeapRef>,
}

impl<'rt> Serializer<'rt> {
    fn new(rt: &'rt mut Runtime, replacer: &Value, space: &Value) -> JsResult<Self> {
        let mut function = None;
        let mut property_list = None;
        if rt.is_callable(replacer) {
            function = Some(replacer.clone());
        } else if let Value::Object(r) = replacer {
            if rt.object(*r)?.is_array() {
                property_list = Some(Self::property_list(rt, replacer)?);
            }
        }

        let gap = match unwrap_primitive(rt, space)? {
            Value::Number(n) => " ".repeat(n.clamp(0.0, MAX_GAP as f64) as usize),
            Value::String(s) => s.chars().take(MAX_GAP).collect(),
            _ => String::new(),
        };
        Ok(Serializer {
            rt,
            replacer: function,
            property_list,
            gap,
            indent: String::new(),
            stack: Vec::new(),
        })
    }

    /// Keys named by an array replacer, deduplicated in order.
    fn property_list(rt: &mut Runtime, replacer: &Value) -> JsResult<Vec<PropertyKey>> {
        let len = length_of(rt, replacer)?;
        let mut keys: Vec<PropertyKey> = Vec::new();
        for i in 0..len {
            let item = rt.get(replacer, &index_key(i))?;
            let key = match unwrap_primitive(rt, &item)? {
                v @ (Value::String(_) | Value::Number(_)) => Some(rt.to_string(&v)?),
                _ => None,
            };
            if let Some(name) = key {
                let key = PropertyKey::from(&*name);
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    /// `SerializeJSONProperty`; returns `false` when the value is skipped.
    fn property(&mut self, holder: HeapRef, key: PropertyKey, out: &mut String) -> JsResult<bool> {
        let marker = self.rt.gc_scope_marker();
        let written = self.property_inner(holder, key, out);
        self.rt.flush_gc_scope(marker);
        written
    }

    fn property_inner(
        &mut self,
        holder: HeapRef,
        key: PropertyKey,
        out: &mut String,
    ) -> JsResult<bool> {
        let rt = &mut *self.rt;
        let mut value = rt.get(&Value::Object(holder), &key)?;
        rt.root(value.clone());
        if matches!(value, Value::Object(_) | Value::BigInt(_)) {
            let to_json = rt.get_by_name(&value, "toJSON")?;
            if rt.is_callable(&to_json) {
                value = rt.call(&to_json, value, vec![key.to_value()])?;
                rt.root(value.clone());
            }
        }
        if let Some(replacer) = &self.replacer {
            value = rt.call(replacer, Value::Object(holder), vec![key.to_value(), value])?;
            rt.root(value.clone());
        }
        let value = unwrap_primitive(rt, &value)?;

        match &value {
            Value::Null => out.push_str("null"),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::String(s) => quote(s, out),
            Value::Number(n) if n.is_finite() => out.push_str(&number_to_string(*n)),
            Value::Number(_) => out.push_str("null"),
            Value::BigInt(_) => {
                return rt.throw_type_error("Do not know how to serialize a BigInt");
            }
            Value::Object(r) if !rt.is_callable(&value) => {
                let r = *r;
                if rt.object(r)?.is_array() {
                    self.array(r, out)?;
                } else {
                    self.object(r, out)?;
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn enter(&mut self, r: HeapRef) -> JsResult<String> {
        if self.stack.contains(&r) {
            return self
                .rt
                .throw_type_error("Converting circular structure to JSON");
        }
        self.stack.push(r);
        let stepback = self.indent.clone();
        self.indent.push_str(&self.gap);
        Ok(stepback)
    }

    fn leave(&mut self, stepback: String) {
        self.stack.pop();
        self.indent = stepback;
    }

    /// Join already-rendered members with the current indentation.
    fn wrap(&self, open: char, close: char, parts: &[String], stepback: &str, out: &mut String) {
        out.push(open);
        if !parts.is_empty() {
            if self.gap.is_empty() {
                out.push_str(&parts.join(","));
            } else {
                let separator = format!(",\n{}", self.indent);
                out.push('\n');
                out.push_str(&self.indent);
                out.push_str(&parts.join(separator.as_str()));
                out.push('\n');
                out.push_str(stepback);
            }
        }
        out.push(close);
    }

    fn object(&mut self, r: HeapRef, out: &mut String) -> JsResult<()> {
        let stepback = self.enter(r)?;
        let keys = match &self.property_list {
            Some(list) => list.clone(),
            None => self.rt.own_enumerable_string_keys(r)?,
        };
        let mut parts = Vec::new();
        for key in keys {
            let mut member = String::new();
            if self.property(r, key.clone(), &mut member)? {
                let mut entry = String::new();
                quote(&key.to_string(), &mut entry);
                entry.push(':');
                if !self.gap.is_empty() {
                    entry.push(' ');
                }
                entry.push_str(&member);
                parts.push(entry);
            }
        }
        self.wrap('{', '}', &parts, &stepback, out);
        self.leave(stepback);
        Ok(())
    }

    fn array(&mut self, r: HeapRef, out: &mut String) -> JsResult<()> {
        let stepback = self.enter(r)?;
        let len = length_of(self.rt, &Value::Object(r))?;
        let mut parts = Vec::new();
        for i in 0..len {
            let mut element = String::new();
            if !self.property(r, index_key(i), &mut element)? {
                element.push_str("null");
            }
            parts.push(element);
        }
        self.wrap('[', ']', &parts, &stepback, out);
        self.leave(stepback);
        Ok(())
    }
}

/// Unwrap `Number`, `String`, `Boolean` and `BigInt` wrapper objects the way
/// `stringify` sees them; anything else is returned as is.
fn unwrap_primitive(rt: &mut Runtime, value: &Value) -> JsResult<Value> {
    let inner = match value {
        Value::Object(r) => match &rt.object(*r)?.class {
            ObjectClass::Primitive(v) => Some(v.clone()),
            _ => None,
        },
        _ => None,
    };
    Ok(match inner {
        Some(Value::Number(_)) => Value::number(rt.to_number(value)?),
        Some(Value::String(_)) => Value::String(rt.to_string(value)?),
        Some(v @ (Value::Boolean(_) | Value::BigInt(_))) => v,
        _ => value.clone(),
    })
}

/// `QuoteJSONString`.
fn quote(s: &str, out: &mut String) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}
