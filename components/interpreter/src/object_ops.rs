//! Property semantics: lookup along prototype chains, assignment,
//! definition, deletion and key enumeration.
//!
//! These are the object-model operations proper. They may run script code
//! (getters, setters, `valueOf` during array length conversion), so each
//! one re-reads object state from the heap after anything that can call
//! back into script.

use std::collections::HashSet;
use std::rc::Rc;

use core_types::number::to_uint32;
use core_types::{HeapRef, Value};

use crate::error::{malformed, JsResult};
use crate::object::ObjectClass;
use crate::property::{Property, PropertyDescriptor, PropertyFlags, PropertyKey, PropertyValue};
use crate::runtime::Runtime;

/// Attributes of the characters of a string wrapper.
const STRING_INDEX: PropertyFlags = PropertyFlags::data(false, true, false);

fn utf16_unit_string(unit: u16) -> Value {
    Value::String(Rc::from(String::from_utf16_lossy(&[unit])))
}

/// Describe `key` for error messages, the way property reads print it.
pub(crate) fn key_label(key: &PropertyKey) -> String {
    match key {
        PropertyKey::Symbol(_) => String::from("Symbol()"),
        other => other.to_string(),
    }
}

impl Runtime {
    fn chain_too_long<T>(&mut self) -> JsResult<T> {
        self.throw_range_error("Maximum prototype chain length exceeded")
    }

    /// Own property of `r`, including exotic ones (array `length`, string
    /// characters, typed-array elements, mapped arguments).
    pub fn get_own_property(&self, r: HeapRef, key: &PropertyKey) -> JsResult<Option<Property>> {
        let obj = self.object(r)?;
        match (&obj.class, key) {
            (ObjectClass::Primitive(Value::String(s)), PropertyKey::Index(i)) => {
                if let Some(unit) = self.utf16.unit_at(s, *i as usize) {
                    return Ok(Some(Property::data(utf16_unit_string(unit), STRING_INDEX)));
                }
            }
            (ObjectClass::Primitive(Value::String(s)), k) if k.is_named("length") => {
                let len = self.utf16.len(s);
                return Ok(Some(Property::data(
                    Value::number(len as f64),
                    PropertyFlags::FROZEN,
                )));
            }
            (
                ObjectClass::Array {
                    length,
                    length_writable,
                },
                k,
            ) if k.is_named("length") => {
                return Ok(Some(Property::data(
                    Value::number(*length as f64),
                    PropertyFlags::data(*length_writable, false, false),
                )));
            }
            (ObjectClass::TypedArray(_), PropertyKey::Index(i)) => {
                return Ok(self
                    .typed_array_get(r, *i as usize)?
                    .map(|v| Property::data(v, PropertyFlags::DEFAULT)));
            }
            (ObjectClass::Arguments(Some(mapped)), PropertyKey::Index(i)) if mapped.is_mapped(*i) => {
                if let Some(mut prop) = obj.elements.get(*i) {
                    let slot = self.environment(mapped.env)?.slots.get(*i as usize).cloned();
                    prop.value = PropertyValue::Data(slot.unwrap_or(Value::Undefined));
                    return Ok(Some(prop));
                }
            }
            _ => {}
        }
        Ok(match key {
            PropertyKey::Index(i) => obj.elements.get(*i),
            _ => obj.get_named(&self.shapes, key),
        })
    }

    pub fn has_own_property(&self, r: HeapRef, key: &PropertyKey) -> JsResult<bool> {
        Ok(self.get_own_property(r, key)?.is_some())
    }

    /// `key in obj`.
    pub fn has_property(&mut self, r: HeapRef, key: &PropertyKey) -> JsResult<bool> {
        let mut current = Some(r);
        let mut depth = 0;
        while let Some(obj) = current {
            if self.get_own_property(obj, key)?.is_some() {
                return Ok(true);
            }
            if let ObjectClass::TypedArray(_) = self.object(obj)?.class {
                if key.as_index().is_some() {
                    return Ok(false);
                }
            }
            depth += 1;
            if depth > self.config.max_prototype_chain {
                return self.chain_too_long();
            }
            current = self.object(obj)?.prototype;
        }
        Ok(false)
    }

    /// Object whose chain serves property reads on `target`.
    fn lookup_start(&mut self, target: &Value, key: &PropertyKey) -> JsResult<HeapRef> {
        let i = &self.intrinsics;
        Ok(match target {
            Value::Object(r) => *r,
            Value::String(_) => i.string_prototype,
            Value::Number(_) => i.number_prototype,
            Value::Boolean(_) => i.boolean_prototype,
            Value::Symbol(_) => i.symbol_prototype,
            Value::BigInt(_) => i.bigint_prototype,
            Value::Undefined | Value::Null => {
                let message = format!(
                    "Cannot read properties of {} (reading '{}')",
                    target,
                    key_label(key)
                );
                return self.throw_type_error(&message);
            }
            Value::Environment(_) => return malformed("property access on an environment"),
        })
    }

    /// `target[key]`, with `target` as the receiver for getters.
    pub fn get(&mut self, target: &Value, key: &PropertyKey) -> JsResult<Value> {
        if let Value::String(s) = target {
            match key {
                PropertyKey::Index(i) => {
                    if let Some(unit) = self.utf16.unit_at(s, *i as usize) {
                        return Ok(utf16_unit_string(unit));
                    }
                }
                k if k.is_named("length") => {
                    return Ok(Value::number(self.utf16.len(s) as f64));
                }
                _ => {}
            }
        }
        let start = self.lookup_start(target, key)?;
        self.get_from(start, key, target)
    }

    /// Property lookup starting at `start` with an explicit receiver.
    pub(crate) fn get_from(
        &mut self,
        start: HeapRef,
        key: &PropertyKey,
        receiver: &Value,
    ) -> JsResult<Value> {
        let mut current = Some(start);
        let mut depth = 0;
        while let Some(obj) = current {
            if let Some(prop) = self.get_own_property(obj, key)? {
                return match prop.value {
                    PropertyValue::Data(v) => Ok(v),
                    PropertyValue::Accessor { get, .. } => {
                        if self.is_callable(&get) {
                            self.call(&get, receiver.clone(), Vec::new())
                        } else {
                            Ok(Value::Undefined)
                        }
                    }
                };
            }
            if let ObjectClass::TypedArray(_) = self.object(obj)?.class {
                if key.as_index().is_some() {
                    return Ok(Value::Undefined);
                }
            }
            depth += 1;
            if depth > self.config.max_prototype_chain {
                return self.chain_too_long();
            }
            current = self.object(obj)?.prototype;
        }
        Ok(Value::Undefined)
    }

    /// Convenience read of a string-named property.
    pub fn get_by_name(&mut self, target: &Value, name: &str) -> JsResult<Value> {
        self.get(target, &PropertyKey::from(name))
    }

    /// `target[key] = value`. In strict code a rejected assignment throws.
    pub fn set(
        &mut self,
        target: &Value,
        key: &PropertyKey,
        value: Value,
        strict: bool,
    ) -> JsResult<()> {
        let start = match target {
            Value::Undefined | Value::Null => {
                let message = format!(
                    "Cannot set properties of {} (setting '{}')",
                    target,
                    key_label(key)
                );
                return self.throw_type_error(&message);
            }
            _ => self.lookup_start(target, key)?,
        };
        let done = self.ordinary_set(start, key, value, target)?;
        if !done && strict {
            let message = match target {
                Value::Object(_) => format!(
                    "Cannot assign to read only property '{}' of object",
                    key_label(key)
                ),
                primitive => format!(
                    "Cannot create property '{}' on {} '{}'",
                    key_label(key),
                    primitive.type_of(),
                    primitive
                ),
            };
            return self.throw_type_error(&message);
        }
        Ok(())
    }

    /// OrdinarySet: returns false when the assignment was rejected.
    fn ordinary_set(
        &mut self,
        start: HeapRef,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
    ) -> JsResult<bool> {
        let mut current = Some(start);
        let mut depth = 0;
        while let Some(obj) = current {
            if let Some(prop) = self.get_own_property(obj, key)? {
                match prop.value {
                    PropertyValue::Accessor { set, .. } => {
                        if !self.is_callable(&set) {
                            return Ok(false);
                        }
                        self.call(&set, receiver.clone(), vec![value])?;
                        return Ok(true);
                    }
                    PropertyValue::Data(_) if !prop.flags.writable => return Ok(false),
                    PropertyValue::Data(_) => {
                        if receiver.as_object() == Some(obj) {
                            return self.set_own_data(obj, key, value);
                        }
                        break;
                    }
                }
            }
            if let (ObjectClass::TypedArray(_), Some(i)) = (&self.object(obj)?.class, key.as_index()) {
                if receiver.as_object() == Some(obj) {
                    self.typed_array_set(obj, i as usize, value)?;
                }
                return Ok(true);
            }
            depth += 1;
            if depth > self.config.max_prototype_chain {
                return self.chain_too_long();
            }
            current = self.object(obj)?.prototype;
        }

        let Some(target) = receiver.as_object() else {
            return Ok(false);
        };
        match self.get_own_property(target, key)? {
            Some(existing) => {
                if existing.is_accessor() || !existing.flags.writable {
                    return Ok(false);
                }
                self.set_own_data(target, key, value)
            }
            None => self.create_data_property(target, key, value),
        }
    }

    /// Overwrite an existing writable own data property.
    fn set_own_data(&mut self, r: HeapRef, key: &PropertyKey, value: Value) -> JsResult<bool> {
        let obj = self.object(r)?;
        match (&obj.class, key) {
            (ObjectClass::Array { .. }, k) if k.is_named("length") => {
                return self.array_define_length(
                    r,
                    PropertyDescriptor {
                        value: Some(value),
                        ..Default::default()
                    },
                );
            }
            (ObjectClass::TypedArray(_), PropertyKey::Index(i)) => {
                self.typed_array_set(r, *i as usize, value)?;
                return Ok(true);
            }
            (ObjectClass::Arguments(Some(mapped)), PropertyKey::Index(i)) if mapped.is_mapped(*i) => {
                let env = mapped.env;
                if let Some(slot) = self.environment_mut(env)?.slots.get_mut(*i as usize) {
                    *slot = value.clone();
                }
            }
            _ => {}
        }
        let (obj, shapes) = self.object_with_shapes(r)?;
        match key {
            PropertyKey::Index(i) => {
                let flags = obj.elements.get(*i).map_or(PropertyFlags::DEFAULT, |p| p.flags);
                obj.elements.set_property(*i, Property::data(value, flags));
            }
            _ => {
                obj.write_named_value(shapes, key, PropertyValue::Data(value));
            }
        }
        Ok(true)
    }

    /// Add a new enumerable, writable, configurable own property.
    ///
    /// Returns false for non-extensible objects and for array indices past
    /// a frozen length.
    pub fn create_data_property(
        &mut self,
        r: HeapRef,
        key: &PropertyKey,
        value: Value,
    ) -> JsResult<bool> {
        self.define_own_property(r, key, PropertyDescriptor::data(value, PropertyFlags::DEFAULT))
    }

    /// Define a data property, throwing `TypeError` when that is impossible.
    pub fn define_property_or_throw(
        &mut self,
        r: HeapRef,
        key: PropertyKey,
        value: Value,
        flags: PropertyFlags,
    ) -> JsResult<()> {
        if self.define_own_property(r, &key, PropertyDescriptor::data(value, flags))? {
            return Ok(());
        }
        let message = format!("Cannot redefine property: {}", key_label(&key));
        self.throw_type_error(&message)
    }

    /// `[[DefineOwnProperty]]`: validate `desc` against the current property
    /// and apply it. Returns false when the definition is not allowed.
    pub fn define_own_property(
        &mut self,
        r: HeapRef,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> JsResult<bool> {
        let obj = self.object(r)?;
        match (&obj.class, key) {
            (ObjectClass::Array { .. }, k) if k.is_named("length") => {
                return self.array_define_length(r, desc);
            }
            (ObjectClass::Array { length, length_writable }, PropertyKey::Index(i)) => {
                let (length, writable) = (*length, *length_writable);
                if *i >= length && !writable {
                    return Ok(false);
                }
                if !self.ordinary_define(r, key, desc)? {
                    return Ok(false);
                }
                if *i >= length {
                    if let ObjectClass::Array { length, .. } = &mut self.object_mut(r)?.class {
                        *length = i + 1;
                    }
                }
                return Ok(true);
            }
            (ObjectClass::TypedArray(_), PropertyKey::Index(i)) => {
                let i = *i as usize;
                if desc.is_accessor()
                    || desc.configurable == Some(false)
                    || desc.enumerable == Some(false)
                    || desc.writable == Some(false)
                    || self.typed_array_get(r, i)?.is_none()
                {
                    return Ok(false);
                }
                if let Some(v) = desc.value {
                    self.typed_array_set(r, i, v)?;
                }
                return Ok(true);
            }
            (ObjectClass::Primitive(Value::String(_)), _) => {
                if let Some(current) = self.get_own_property(r, key)? {
                    if !current.flags.configurable && !current.flags.writable {
                        return Ok(is_compatible(&desc, &current));
                    }
                }
            }
            (ObjectClass::Arguments(Some(mapped)), PropertyKey::Index(i)) if mapped.is_mapped(*i) => {
                let (env, i) = (mapped.env, *i);
                // Freeze the current mapped value into the element first.
                let current = self.environment(env)?.slots.get(i as usize).cloned();
                if let Some(v) = current {
                    let obj = self.object_mut(r)?;
                    if let Some(mut prop) = obj.elements.get(i) {
                        prop.value = PropertyValue::Data(v);
                        obj.elements.set_property(i, prop);
                    }
                }
                if !self.ordinary_define(r, key, desc.clone())? {
                    return Ok(false);
                }
                let unmap = if desc.is_accessor() {
                    true
                } else {
                    if let Some(v) = desc.value {
                        if let Some(slot) = self.environment_mut(env)?.slots.get_mut(i as usize) {
                            *slot = v;
                        }
                    }
                    desc.writable == Some(false)
                };
                if unmap {
                    if let ObjectClass::Arguments(Some(m)) = &mut self.object_mut(r)?.class {
                        m.unmap(i);
                    }
                }
                return Ok(true);
            }
            _ => {}
        }
        self.ordinary_define(r, key, desc)
    }

    /// ValidateAndApplyPropertyDescriptor on stored properties.
    fn ordinary_define(
        &mut self,
        r: HeapRef,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> JsResult<bool> {
        let current = self.get_own_property(r, key)?;
        let prop = match current {
            None => {
                if !self.object(r)?.extensible {
                    return Ok(false);
                }
                property_from_descriptor(desc)
            }
            Some(current) => {
                if !is_compatible(&desc, &current) {
                    return Ok(false);
                }
                merge_descriptor(current, desc)
            }
        };
        let (obj, shapes) = self.object_with_shapes(r)?;
        match key {
            PropertyKey::Index(i) => obj.elements.set_property(*i, prop),
            _ if obj.has_named(shapes, key) => obj.replace_named(shapes, key, prop),
            _ => obj.add_named(shapes, key.clone(), prop),
        }
        self.note_resize(r)?;
        Ok(true)
    }

    /// ArraySetLength.
    fn array_define_length(&mut self, r: HeapRef, desc: PropertyDescriptor) -> JsResult<bool> {
        if desc.is_accessor() || desc.configurable == Some(true) || desc.enumerable == Some(true) {
            return Ok(false);
        }
        let new_len = match &desc.value {
            None => None,
            Some(v) => {
                let number = self.to_number(v)?;
                let len = to_uint32(number);
                if len as f64 != number {
                    return self.throw_range_error("Invalid array length");
                }
                Some(len)
            }
        };
        // Conversion may have run script; read the array again.
        let obj = self.object_mut(r)?;
        let ObjectClass::Array {
            length,
            length_writable,
        } = &mut obj.class
        else {
            return malformed("array length on a non-array");
        };
        if desc.writable == Some(true) && !*length_writable {
            return Ok(false);
        }
        let mut ok = true;
        if let Some(new_len) = new_len {
            if new_len != *length {
                if !*length_writable {
                    return Ok(false);
                }
                if new_len < *length {
                    let reached = obj.elements.truncate(new_len);
                    ok = reached == new_len;
                    *length = reached;
                } else {
                    *length = new_len;
                }
            }
        }
        if desc.writable == Some(false) {
            *length_writable = false;
        }
        self.note_resize(r)?;
        Ok(ok)
    }

    /// `delete obj[key]`; false when the property is non-configurable.
    pub fn delete_property(&mut self, r: HeapRef, key: &PropertyKey) -> JsResult<bool> {
        let Some(current) = self.get_own_property(r, key)? else {
            return Ok(true);
        };
        if !current.flags.configurable {
            return Ok(false);
        }
        let (obj, shapes) = self.object_with_shapes(r)?;
        match &mut obj.class {
            ObjectClass::TypedArray(_) if key.as_index().is_some() => return Ok(false),
            ObjectClass::Arguments(Some(mapped)) => {
                if let Some(i) = key.as_index() {
                    mapped.unmap(i);
                }
            }
            _ => {}
        }
        match key {
            PropertyKey::Index(i) => obj.elements.remove(*i),
            _ => {
                obj.remove_named(shapes, key);
            }
        }
        self.note_resize(r)?;
        Ok(true)
    }

    /// Own keys: indices ascending, then strings in insertion order, then
    /// symbols in insertion order.
    pub fn own_keys(&self, r: HeapRef) -> JsResult<Vec<PropertyKey>> {
        let obj = self.object(r)?;
        let mut keys = Vec::new();
        let exotic_len = match &obj.class {
            ObjectClass::Primitive(Value::String(s)) => Some(self.utf16.len(s)),
            ObjectClass::TypedArray(_) => Some(self.typed_array_length(r)?),
            _ => None,
        };
        if let Some(len) = exotic_len {
            keys.extend((0..len as u32).map(PropertyKey::Index));
        }
        keys.extend(
            obj.elements
                .indices()
                .into_iter()
                .filter(|i| exotic_len.map_or(true, |len| *i as usize >= len))
                .map(PropertyKey::Index),
        );
        if matches!(
            obj.class,
            ObjectClass::Array { .. } | ObjectClass::Primitive(Value::String(_))
        ) {
            keys.push(PropertyKey::from("length"));
        }
        let named = obj.named_keys(&self.shapes);
        keys.extend(named.iter().filter(|(k, _)| !k.is_symbol()).map(|(k, _)| k.clone()));
        keys.extend(named.iter().filter(|(k, _)| k.is_symbol()).map(|(k, _)| k.clone()));
        Ok(keys)
    }

    /// Enumerable own string keys, as `Object.keys` reports them.
    pub fn own_enumerable_string_keys(&self, r: HeapRef) -> JsResult<Vec<PropertyKey>> {
        let mut out = Vec::new();
        for key in self.own_keys(r)? {
            if key.is_symbol() {
                continue;
            }
            if let Some(prop) = self.get_own_property(r, &key)? {
                if prop.flags.enumerable {
                    out.push(key);
                }
            }
        }
        Ok(out)
    }

    /// Names visited by `for (k in obj)`: enumerable string keys along the
    /// chain, each reported once, shadowed keys hidden.
    pub fn for_in_keys(&mut self, r: HeapRef) -> JsResult<Vec<Value>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut current = Some(r);
        let mut depth = 0;
        while let Some(obj) = current {
            for key in self.own_keys(obj)? {
                if key.is_symbol() || !seen.insert(key.clone()) {
                    continue;
                }
                if let Some(prop) = self.get_own_property(obj, &key)? {
                    if prop.flags.enumerable {
                        out.push(key.to_value());
                    }
                }
            }
            depth += 1;
            if depth > self.config.max_prototype_chain {
                return self.chain_too_long();
            }
            current = self.object(obj)?.prototype;
        }
        Ok(out)
    }

    pub fn get_prototype_of(&self, r: HeapRef) -> JsResult<Option<HeapRef>> {
        Ok(self.object(r)?.prototype)
    }

    /// `[[SetPrototypeOf]]`; false for non-extensible objects, cycles and
    /// the immutable `Object.prototype`.
    pub fn set_prototype_of(&mut self, r: HeapRef, proto: Option<HeapRef>) -> JsResult<bool> {
        let obj = self.object(r)?;
        if obj.prototype == proto {
            return Ok(true);
        }
        if !obj.extensible || r == self.intrinsics.object_prototype {
            return Ok(false);
        }
        let mut p = proto;
        let mut depth = 0;
        while let Some(link) = p {
            if link == r {
                return Ok(false);
            }
            depth += 1;
            if depth > self.config.max_prototype_chain {
                return self.chain_too_long();
            }
            p = self.object(link)?.prototype;
        }
        self.object_mut(r)?.prototype = proto;
        Ok(true)
    }

    pub fn prevent_extensions(&mut self, r: HeapRef) -> JsResult<bool> {
        self.object_mut(r)?.extensible = false;
        Ok(true)
    }

    /// `Object.freeze` (`frozen`) or `Object.seal`.
    pub fn set_integrity_level(&mut self, r: HeapRef, frozen: bool) -> JsResult<bool> {
        if frozen {
            if let ObjectClass::TypedArray(_) = self.object(r)?.class {
                if self.typed_array_length(r)? > 0 {
                    return self.throw_type_error("Cannot freeze array buffer views with elements");
                }
            }
        }
        self.prevent_extensions(r)?;
        for key in self.own_keys(r)? {
            let Some(current) = self.get_own_property(r, &key)? else {
                continue;
            };
            let desc = PropertyDescriptor {
                configurable: Some(false),
                writable: (frozen && !current.is_accessor()).then_some(false),
                ..Default::default()
            };
            if !self.define_own_property(r, &key, desc)? {
                let message = format!("Cannot redefine property: {}", key_label(&key));
                return self.throw_type_error(&message);
            }
        }
        Ok(true)
    }

    /// `Object.isFrozen` (`frozen`) or `Object.isSealed`.
    pub fn test_integrity_level(&self, r: HeapRef, frozen: bool) -> JsResult<bool> {
        if self.object(r)?.extensible {
            return Ok(false);
        }
        for key in self.own_keys(r)? {
            if let Some(prop) = self.get_own_property(r, &key)? {
                if prop.flags.configurable || (frozen && !prop.is_accessor() && prop.flags.writable) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Can `desc` be applied over `current` without violating its attributes?
fn is_compatible(desc: &PropertyDescriptor, current: &Property) -> bool {
    if current.flags.configurable {
        return true;
    }
    if desc.configurable == Some(true) {
        return false;
    }
    if desc.enumerable.map_or(false, |e| e != current.flags.enumerable) {
        return false;
    }
    if desc.is_generic() {
        return true;
    }
    match &current.value {
        PropertyValue::Accessor { get, set } => {
            if !desc.is_accessor() {
                return false;
            }
            desc.get.as_ref().map_or(true, |g| g.same_value(get))
                && desc.set.as_ref().map_or(true, |s| s.same_value(set))
        }
        PropertyValue::Data(value) => {
            if desc.is_accessor() {
                return false;
            }
            if current.flags.writable {
                return true;
            }
            desc.writable != Some(true) && desc.value.as_ref().map_or(true, |v| v.same_value(value))
        }
    }
}

/// A new property from a descriptor; missing fields default to false /
/// undefined.
fn property_from_descriptor(desc: PropertyDescriptor) -> Property {
    let enumerable = desc.enumerable.unwrap_or(false);
    let configurable = desc.configurable.unwrap_or(false);
    if desc.is_accessor() {
        Property {
            value: PropertyValue::Accessor {
                get: desc.get.unwrap_or(Value::Undefined),
                set: desc.set.unwrap_or(Value::Undefined),
            },
            flags: PropertyFlags::accessor(enumerable, configurable),
        }
    } else {
        Property::data(
            desc.value.unwrap_or(Value::Undefined),
            PropertyFlags::data(desc.writable.unwrap_or(false), enumerable, configurable),
        )
    }
}

/// Apply the present fields of `desc` over `current`.
fn merge_descriptor(current: Property, desc: PropertyDescriptor) -> Property {
    let enumerable = desc.enumerable.unwrap_or(current.flags.enumerable);
    let configurable = desc.configurable.unwrap_or(current.flags.configurable);
    match current.value {
        PropertyValue::Data(value) if !desc.is_accessor() => Property::data(
            desc.value.unwrap_or(value),
            PropertyFlags::data(
                desc.writable.unwrap_or(current.flags.writable),
                enumerable,
                configurable,
            ),
        ),
        PropertyValue::Accessor { get, set } if !desc.is_data() => Property {
            value: PropertyValue::Accessor {
                get: desc.get.unwrap_or(get),
                set: desc.set.unwrap_or(set),
            },
            flags: PropertyFlags::accessor(enumerable, configurable),
        },
        // Kind change: keep enumerable / configurable, reset the rest.
        _ => property_from_descriptor(PropertyDescriptor {
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..desc
        }),
    }
}
