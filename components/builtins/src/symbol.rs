//! `Symbol` function, the well-known symbols and the global symbol registry

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use core_types::{SymbolId, Value};
use interpreter::object::ObjectClass;
use interpreter::{
    CallArgs, JsResult, PropertyFlags, PropertyKey, Runtime, SYMBOL_HAS_INSTANCE, SYMBOL_ITERATOR,
    SYMBOL_TO_PRIMITIVE,
};

use crate::{constant, describe, getter, method, symbol_method};

/// `Symbol.for` keys and the symbols they were registered as.
#[derive(Debug, Default)]
struct SymbolRegistry {
    by_key: RefCell<HashMap<Rc<str>, SymbolId>>,
}

impl SymbolRegistry {
    fn key_for(&self, id: SymbolId) -> Option<Rc<str>> {
        self.by_key
            .borrow()
            .iter()
            .find(|(_, sym)| **sym == id)
            .map(|(key, _)| key.clone())
    }
}

pub(crate) fn install(rt: &mut Runtime) -> JsResult<()> {
    let proto = rt.intrinsics().symbol_prototype;
    // Symbol is callable but never constructible.
    let ctor = rt.new_native("Symbol", 0, symbol_function, 0, false)?;
    rt.define_property_or_throw(
        ctor,
        PropertyKey::from("prototype"),
        Value::Object(proto),
        PropertyFlags::FROZEN,
    )?;
    rt.define_hidden(proto, PropertyKey::from("constructor"), Value::Object(ctor))?;
    let global = rt.global_object();
    rt.define_hidden(global, PropertyKey::from("Symbol"), Value::Object(ctor))?;

    for (name, id) in [
        ("iterator", SYMBOL_ITERATOR),
        ("toPrimitive", SYMBOL_TO_PRIMITIVE),
        ("hasInstance", SYMBOL_HAS_INSTANCE),
    ] {
        constant(rt, ctor, name, Value::Symbol(id))?;
    }
    method(rt, ctor, "for", 1, symbol_for)?;
    method(rt, ctor, "keyFor", 1, symbol_key_for)?;

    method(rt, proto, "toString", 0, symbol_to_string)?;
    method(rt, proto, "valueOf", 0, symbol_value_of)?;
    getter(rt, proto, "description", symbol_description)?;
    let to_primitive = symbol_method(
        rt,
        proto,
        SYMBOL_TO_PRIMITIVE,
        "[Symbol.toPrimitive]",
        1,
        symbol_value_of,
    )?;
    rt.define_property_or_throw(
        proto,
        PropertyKey::Symbol(SYMBOL_TO_PRIMITIVE),
        Value::Object(to_primitive),
        PropertyFlags::READ_ONLY_CONFIGURABLE,
    )?;

    rt.set_host_data(SymbolRegistry::default());
    Ok(())
}

fn symbol_function(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let description = match args.arg(0) {
        Value::Undefined => None,
        v => Some(rt.to_string(&v)?),
    };
    Ok(Value::Symbol(rt.new_symbol(description)))
}

fn symbol_for(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let key = rt.to_string(&args.arg(0))?;
    let existing = rt
        .host_data::<SymbolRegistry>()
        .and_then(|r| r.by_key.borrow().get(&key).copied());
    if let Some(id) = existing {
        return Ok(Value::Symbol(id));
    }
    let id = rt.new_symbol(Some(key.clone()));
    if let Some(registry) = rt.host_data::<SymbolRegistry>() {
        registry.by_key.borrow_mut().insert(key, id);
    }
    Ok(Value::Symbol(id))
}

fn symbol_key_for(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let Value::Symbol(id) = args.arg(0) else {
        let message = format!("{} is not a symbol", describe(&args.arg(0)));
        return rt.throw_type_error(&message);
    };
    let key = rt.host_data::<SymbolRegistry>().and_then(|r| r.key_for(id));
    Ok(key.map_or(Value::Undefined, Value::String))
}

/// `thisSymbolValue`.
fn this_symbol(rt: &mut Runtime, this: &Value, method: &str) -> JsResult<SymbolId> {
    match this {
        Value::Symbol(id) => return Ok(*id),
        Value::Object(r) => {
            if let ObjectClass::Primitive(Value::Symbol(id)) = rt.object(*r)?.class {
                return Ok(id);
            }
        }
        _ => {}
    }
    let message = format!(
        "Symbol.prototype.{} requires that 'this' be a Symbol",
        method
    );
    rt.throw_type_error(&message)
}

/// `Symbol(description)` as text.
pub(crate) fn symbol_descriptive_string(rt: &Runtime, id: SymbolId) -> String {
    format!("Symbol({})", rt.symbol_description(id).as_deref().unwrap_or(""))
}

fn symbol_to_string(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let id = this_symbol(rt, &args.this, "toString")?;
    Ok(Value::string(&symbol_descriptive_string(rt, id)))
}

fn symbol_value_of(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    Ok(Value::Symbol(this_symbol(rt, &args.this, "valueOf")?))
}

fn symbol_description(rt: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    let id = this_symbol(rt, &args.this, "description")?;
    Ok(rt
        .symbol_description(id)
        .map_or(Value::Undefined, Value::String))
}
