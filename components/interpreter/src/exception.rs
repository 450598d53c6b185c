//! Error objects, stack capture and the host-facing exception description.

use core_types::{error_header, format_stack, ErrorKind, HeapRef, JsError, StackFrame, Value};

use crate::error::{JsResult, Throw};
use crate::object::{ErrorData, JsObject, ObjectClass};
use crate::property::{PropertyFlags, PropertyKey, PropertyValue};
use crate::runtime::Runtime;

impl Runtime {
    /// Allocate an error of `kind` with the realm's prototype for it.
    pub fn create_error(&mut self, kind: ErrorKind, message: &str) -> JsResult<HeapRef> {
        let proto = self.intrinsics.error_prototype(kind);
        self.create_error_object(kind, Some(message), Some(proto))
    }

    /// Allocate an error object with an explicit prototype (subclassing via
    /// `new.target`). `message` is left undefined when `None`.
    ///
    /// The current stack is captured into both the object payload and its
    /// `stack` property.
    pub fn create_error_object(
        &mut self,
        kind: ErrorKind,
        message: Option<&str>,
        prototype: Option<HeapRef>,
    ) -> JsResult<HeapRef> {
        let nested = std::mem::replace(&mut self.constructing_error, true);
        let result = self.build_error(kind, message, prototype);
        self.constructing_error = nested;
        result
    }

    fn build_error(
        &mut self,
        kind: ErrorKind,
        message: Option<&str>,
        prototype: Option<HeapRef>,
    ) -> JsResult<HeapRef> {
        let frames = self.capture_stack_trace();
        let header = error_header(kind.name(), message.unwrap_or(""));
        let stack = format_stack(&header, &frames);
        let err = self.alloc_object(JsObject::new(
            prototype,
            ObjectClass::Error(ErrorData { kind, frames }),
        ))?;
        if let Some(message) = message {
            self.define_property_or_throw(
                err,
                PropertyKey::from("message"),
                Value::string(message),
                PropertyFlags::HIDDEN,
            )?;
        }
        self.define_property_or_throw(
            err,
            PropertyKey::from("stack"),
            Value::string(&stack),
            PropertyFlags::HIDDEN,
        )?;
        Ok(err)
    }

    /// Throw a freshly created error of `kind`.
    pub fn throw_error<T>(&mut self, kind: ErrorKind, message: &str) -> JsResult<T> {
        let err = self.create_error(kind, message)?;
        Err(Throw::Value(Value::Object(err)))
    }

    pub fn throw_type_error<T>(&mut self, message: &str) -> JsResult<T> {
        self.throw_error(ErrorKind::TypeError, message)
    }

    pub fn throw_range_error<T>(&mut self, message: &str) -> JsResult<T> {
        self.throw_error(ErrorKind::RangeError, message)
    }

    pub fn throw_reference_error<T>(&mut self, message: &str) -> JsResult<T> {
        self.throw_error(ErrorKind::ReferenceError, message)
    }

    /// Live call stack, innermost frame first.
    ///
    /// Native calls are interleaved with interpreted frames in call order.
    pub fn capture_stack_trace(&self) -> Vec<StackFrame> {
        let mut out = Vec::with_capacity(self.frames.len() + self.native_frames.len());
        let mut natives = self.native_frames.iter().rev().peekable();
        for depth in (0..=self.frames.len()).rev() {
            while let Some(native) = natives.next_if(|n| n.js_depth >= depth) {
                out.push(StackFrame::native(&native.name));
            }
            if depth == 0 {
                break;
            }
            let frame = &self.frames[depth - 1];
            let (line, column) = frame
                .code
                .instructions
                .get(frame.pc as usize)
                .and_then(|i| i.loc.as_ref())
                .map(|loc| {
                    let pos = loc.start_position();
                    (pos.line, pos.column)
                })
                .unwrap_or((0, 0));
            out.push(StackFrame::script(
                frame.function_name(),
                frame.source_url(),
                line,
                column,
            ));
        }
        out
    }

    /// Host-side description of a thrown value.
    ///
    /// Never runs script code: only data properties are consulted.
    pub fn describe_exception(&self, value: &Value) -> JsError {
        let Value::Object(r) = value else {
            return JsError::new(ErrorKind::Error, value.to_string());
        };
        let Ok(obj) = self.object(*r) else {
            return JsError::new(ErrorKind::Error, "<collected>");
        };
        match &obj.class {
            ObjectClass::Error(data) => {
                let message = match self.data_property(*r, "message") {
                    Some(Value::String(s)) => s.to_string(),
                    Some(v) if !v.is_primitive() => String::from("[object Object]"),
                    Some(v) => v.to_string(),
                    None => String::new(),
                };
                JsError::new(data.kind, message).with_stack(data.frames.clone())
            }
            _ => JsError::new(ErrorKind::Error, "[object Object]"),
        }
    }

    /// The text hosts print after `Uncaught `.
    pub(crate) fn render_exception(&self, value: &Value, error: &JsError) -> String {
        match value {
            Value::Object(r) if matches!(
                self.object(*r).map(|o| &o.class),
                Ok(ObjectClass::Error(_))
            ) => match self.data_property(*r, "stack") {
                Some(Value::String(stack)) => stack.to_string(),
                _ => error.to_string(),
            },
            Value::Object(_) => String::from("[object Object]"),
            Value::String(s) => s.to_string(),
            other => other.to_string(),
        }
    }

    /// A data property found along the chain of `r`; accessors are skipped.
    fn data_property(&self, r: HeapRef, name: &str) -> Option<Value> {
        let key = PropertyKey::from(name);
        let mut current = Some(r);
        let mut steps = 0;
        while let Some(obj_ref) = current {
            let obj = self.object(obj_ref).ok()?;
            if let Some(prop) = obj.get_named(&self.shapes, &key) {
                return match prop.value {
                    PropertyValue::Data(v) => Some(v),
                    PropertyValue::Accessor { .. } => None,
                };
            }
            steps += 1;
            if steps > self.config.max_prototype_chain {
                return None;
            }
            current = obj.prototype;
        }
        None
    }
}
