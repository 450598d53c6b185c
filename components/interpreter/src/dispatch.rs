//! Bytecode dispatch loop and the calling convention.
//!
//! Interpreted calls do not recurse on the host stack: `Call` pushes a
//! [`CallFrame`] and the loop continues in the callee, `Return` pops it and
//! resumes the caller at the instruction after its call. Only native code
//! (and host entry points) re-enter [`Runtime::execute`].

use std::rc::Rc;

use bytecode_system::{Opcode, RegisterId};
use core_types::{HeapRef, Value};
use tracing::trace;

use crate::call_frame::CallFrame;
use crate::code::CodeRef;
use crate::environment::Environment;
use crate::error::{malformed, JsResult, Throw};
use crate::function::{CallArgs, FunctionKind, NativeFunction};
use crate::generator::{GeneratorData, ResumeMode};
use crate::inline_cache::InlineCache;
use crate::object::{JsObject, MappedArguments, ObjectClass};
use crate::operations::BinaryOp;
use crate::property::{Property, PropertyDescriptor, PropertyFlags, PropertyKey, PropertyValue};
use crate::runtime::{NativeFrame, Runtime};

/// How a run of the dispatch loop ended.
#[derive(Debug)]
pub(crate) enum Completion {
    Return(Value),
    /// The generator frame at the entry depth suspended itself.
    Yield(Value),
}

/// Effect of one instruction on the program counter.
enum Flow {
    Next,
    Jump(u32),
    /// A callee frame was pushed; the caller's pc stays on the call.
    Entered,
    Return(Value),
    Yield(Value),
}

/// Outcome of setting up a call.
enum Prepared {
    /// Native, or a generator function: the result is already known.
    Done(Value),
    /// Bytecode callee; the frame still has to be pushed.
    Frame(Box<CallFrame>),
}

/// Short rendering of a value for error messages.
fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Symbol(_) => String::from("Symbol()"),
        Value::BigInt(n) => format!("{}n", n),
        Value::Object(_) | Value::Environment(_) => String::from("object"),
        other => other.to_string(),
    }
}

impl Runtime {
    // ---- frame and register access -----------------------------------------

    fn frame(&self) -> JsResult<&CallFrame> {
        match self.frames.last() {
            Some(frame) => Ok(frame),
            None => malformed("no active frame"),
        }
    }

    fn frame_mut(&mut self) -> JsResult<&mut CallFrame> {
        match self.frames.last_mut() {
            Some(frame) => Ok(frame),
            None => malformed("no active frame"),
        }
    }

    #[inline]
    fn read(&self, r: RegisterId) -> JsResult<Value> {
        match self.frame()?.registers.get(r.0 as usize) {
            Some(v) => Ok(v.clone()),
            None => malformed(format!("register r{} out of range", r.0)),
        }
    }

    #[inline]
    fn write(&mut self, r: RegisterId, value: Value) -> JsResult<()> {
        match self.frame_mut()?.registers.get_mut(r.0 as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => malformed(format!("register r{} out of range", r.0)),
        }
    }

    fn read_range(&self, first: RegisterId, count: u32) -> JsResult<Vec<Value>> {
        let start = first.0 as usize;
        let end = start + count as usize;
        match self.frame()?.registers.get(start..end) {
            Some(values) => Ok(values.to_vec()),
            None => malformed(format!("register range r{}..r{} out of range", start, end)),
        }
    }

    fn constant(&self, index: u32) -> JsResult<Value> {
        match self.frame()?.module.constants.get(index as usize) {
            Some(v) => Ok(v.clone()),
            None => malformed(format!("constant {} out of range", index)),
        }
    }

    fn name_key(&self, index: u32) -> JsResult<PropertyKey> {
        match self.constant(index)? {
            Value::String(s) => Ok(PropertyKey::from_rc(s)),
            other => malformed(format!("constant {} is not a name: {:?}", index, other)),
        }
    }

    fn env_operand(&self, r: RegisterId) -> JsResult<HeapRef> {
        match self.read(r)? {
            Value::Environment(env) => Ok(env),
            other => malformed(format!("r{} holds {:?}, not an environment", r.0, other)),
        }
    }

    fn object_operand(&self, r: RegisterId) -> JsResult<HeapRef> {
        match self.read(r)? {
            Value::Object(obj) => Ok(obj),
            other => malformed(format!("r{} holds {:?}, not an object", r.0, other)),
        }
    }

    fn inline_cache(&mut self, code: CodeRef, slot: u32) -> JsResult<&mut InlineCache> {
        match self
            .caches
            .get_mut(code.module.0 as usize)
            .and_then(|m| m.get_mut(code.function as usize))
            .and_then(|f| f.get_mut(slot as usize))
        {
            Some(cache) => Ok(cache),
            None => malformed(format!("inline cache {} out of range", slot)),
        }
    }

    /// Record the own data slot of `key` in `r` under its current shape.
    fn update_cache(
        &mut self,
        code: CodeRef,
        slot: u32,
        r: HeapRef,
        key: &PropertyKey,
        for_write: bool,
    ) -> JsResult<()> {
        let Some(shape) = self.object(r)?.shape() else {
            return Ok(());
        };
        let Some(info) = self.shapes.lookup(shape, key) else {
            return Ok(());
        };
        if info.flags.accessor || (for_write && !info.flags.writable) {
            return Ok(());
        }
        self.inline_cache(code, slot)?.update(shape, info.slot);
        Ok(())
    }

    // ---- the loop ------------------------------------------------------------

    /// Run frames until the frame at `entry_depth` returns or yields.
    ///
    /// Exceptions unwind to the innermost handler at or above `entry_depth`;
    /// if none exists every frame down to `entry_depth` is popped and the
    /// exception is returned.
    pub(crate) fn execute(&mut self, entry_depth: usize) -> JsResult<Completion> {
        let scope_base = self.gc_scope.len();
        loop {
            self.gc_scope.truncate(scope_base);
            let outcome = match self.step(entry_depth) {
                Ok(None) => continue,
                Ok(Some(completion)) => Ok(completion),
                Err(Throw::Value(value)) => match self.unwind(value, entry_depth) {
                    Ok(()) => continue,
                    Err(t) => Err(t),
                },
                Err(Throw::Fatal(fatal)) => {
                    self.frames.truncate(entry_depth);
                    Err(Throw::Fatal(fatal))
                }
            };
            self.gc_scope.truncate(scope_base);
            match &outcome {
                Ok(Completion::Return(v)) | Ok(Completion::Yield(v)) | Err(Throw::Value(v)) => {
                    self.root(v.clone());
                }
                Err(Throw::Fatal(_)) => {}
            }
            return outcome;
        }
    }

    /// Transfer control to the nearest handler for `value`.
    fn unwind(&mut self, value: Value, entry_depth: usize) -> JsResult<()> {
        while self.frames.len() > entry_depth {
            let Some(frame) = self.frames.last_mut() else {
                break;
            };
            if let Some(target) = frame.code.find_handler(frame.pc).map(|h| h.target) {
                trace!(target: "engine::interp", function = %frame.code.name, pc = frame.pc, handler = target, "exception caught");
                frame.pc = target;
                frame.exception = Some(value);
                return Ok(());
            }
            self.frames.pop();
        }
        Err(Throw::Value(value))
    }

    fn step(&mut self, entry_depth: usize) -> JsResult<Option<Completion>> {
        let frame = self.frame()?;
        let pc = frame.pc;
        let Some(op) = frame.code.instructions.get(pc as usize).map(|i| i.opcode) else {
            return malformed(format!("pc {} past the end of {}", pc, frame.code.name));
        };
        if op.is_safepoint(pc) {
            self.safepoint()?;
        }
        match self.exec(op)? {
            Flow::Next => self.frame_mut()?.pc = pc + 1,
            Flow::Jump(target) => self.frame_mut()?.pc = target,
            Flow::Entered => {}
            Flow::Return(value) => return self.return_from_frame(value, entry_depth),
            Flow::Yield(value) => return self.suspend_generator(value, entry_depth).map(Some),
        }
        Ok(None)
    }

    fn return_from_frame(&mut self, value: Value, entry_depth: usize) -> JsResult<Option<Completion>> {
        let Some(frame) = self.frames.pop() else {
            return malformed("return without a frame");
        };
        let value = if frame.construct && !matches!(value, Value::Object(_)) {
            frame.this
        } else {
            value
        };
        if self.frames.len() <= entry_depth {
            return Ok(Some(Completion::Return(value)));
        }
        if let Some(dst) = frame.return_to {
            self.write(dst, value)?;
        }
        self.frame_mut()?.pc += 1;
        Ok(None)
    }

    fn suspend_generator(&mut self, value: Value, entry_depth: usize) -> JsResult<Completion> {
        if self.frames.len() != entry_depth + 1 {
            return malformed("yield outside a resumed generator");
        }
        let Some(mut frame) = self.frames.pop() else {
            return malformed("yield without a frame");
        };
        let Some(gen) = frame.generator else {
            return malformed("yield in a non-generator function");
        };
        frame.pc += 1;
        match &mut self.object_mut(gen)?.class {
            ObjectClass::Generator(data) => data.frame = Some(Box::new(frame)),
            _ => return malformed("generator frame owned by a non-generator"),
        }
        self.note_resize(gen)?;
        Ok(Completion::Yield(value))
    }

    fn exec(&mut self, op: Opcode) -> JsResult<Flow> {
        macro_rules! binary {
            ($dst:expr, $lhs:expr, $rhs:expr, $op:expr) => {{
                let a = self.read($lhs)?;
                let b = self.read($rhs)?;
                let v = self.binary_op($op, &a, &b)?;
                self.write($dst, v)?;
            }};
        }
        macro_rules! compare {
            ($dst:expr, $lhs:expr, $rhs:expr, |$rt:ident, $a:ident, $b:ident| $body:expr) => {{
                let $a = self.read($lhs)?;
                let $b = self.read($rhs)?;
                let $rt = &mut *self;
                let result: bool = $body;
                self.write($dst, Value::Boolean(result))?;
            }};
        }

        match op {
            Opcode::Mov { dst, src } => {
                let v = self.read(src)?;
                self.write(dst, v)?;
            }
            Opcode::LoadConst { dst, index } => {
                let v = self.constant(index)?;
                self.write(dst, v)?;
            }
            Opcode::LoadUndefined { dst } => self.write(dst, Value::Undefined)?,
            Opcode::LoadNull { dst } => self.write(dst, Value::Null)?,
            Opcode::LoadBool { dst, value } => self.write(dst, Value::Boolean(value))?,
            Opcode::LoadInt { dst, value } => self.write(dst, Value::number(value as f64))?,
            Opcode::LoadThis { dst } => {
                let v = self.frame()?.this.clone();
                self.write(dst, v)?;
            }
            Opcode::LoadNewTarget { dst } => {
                let v = self.frame()?.new_target.clone();
                self.write(dst, v)?;
            }

            Opcode::Add { dst, lhs, rhs } => {
                let a = self.read(lhs)?;
                let b = self.read(rhs)?;
                let v = match (&a, &b) {
                    (Value::Number(x), Value::Number(y)) => Value::number(x + y),
                    _ => self.add(&a, &b)?,
                };
                self.write(dst, v)?;
            }
            Opcode::Sub { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::Sub),
            Opcode::Mul { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::Mul),
            Opcode::Div { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::Div),
            Opcode::Mod { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::Mod),
            Opcode::Exp { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::Exp),
            Opcode::BitAnd { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::BitAnd),
            Opcode::BitOr { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::BitOr),
            Opcode::BitXor { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::BitXor),
            Opcode::Shl { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::Shl),
            Opcode::Shr { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::Shr),
            Opcode::UShr { dst, lhs, rhs } => binary!(dst, lhs, rhs, BinaryOp::UShr),

            Opcode::Negate { dst, src } => {
                let v = self.read(src)?;
                let v = self.negate(&v)?;
                self.write(dst, v)?;
            }
            Opcode::BitNot { dst, src } => {
                let v = self.read(src)?;
                let v = self.bit_not(&v)?;
                self.write(dst, v)?;
            }
            Opcode::Not { dst, src } => {
                let v = self.read(src)?;
                self.write(dst, Value::Boolean(!v.is_truthy()))?;
            }
            Opcode::TypeOf { dst, src } => {
                let v = self.read(src)?;
                let name = self.type_of(&v);
                self.write(dst, Value::string(name))?;
            }
            Opcode::ToNumeric { dst, src } => {
                let v = self.read(src)?;
                let n = self.to_numeric(&v)?;
                self.write(dst, Value::from(n))?;
            }
            Opcode::Inc { dst, src } => {
                let v = self.read(src)?;
                let v = self.increment(&v, 1)?;
                self.write(dst, v)?;
            }
            Opcode::Dec { dst, src } => {
                let v = self.read(src)?;
                let v = self.increment(&v, -1)?;
                self.write(dst, v)?;
            }

            Opcode::Eq { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| rt.abstract_equals(&a, &b)?)
            }
            Opcode::NotEq { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| !rt.abstract_equals(&a, &b)?)
            }
            Opcode::StrictEq { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| rt.strict_equals(&a, &b))
            }
            Opcode::StrictNotEq { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| !rt.strict_equals(&a, &b))
            }
            Opcode::Less { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| rt.less_than(&a, &b, true)? == Some(true))
            }
            Opcode::LessEq { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| rt.less_than(&b, &a, false)? == Some(false))
            }
            Opcode::Greater { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| rt.less_than(&b, &a, false)? == Some(true))
            }
            Opcode::GreaterEq { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| rt.less_than(&a, &b, true)? == Some(false))
            }
            Opcode::InstanceOf { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| rt.instance_of(&a, &b)?)
            }
            Opcode::In { dst, lhs, rhs } => {
                compare!(dst, lhs, rhs, |rt, a, b| rt.in_operator(&a, &b)?)
            }

            Opcode::Jmp { target } => return Ok(Flow::Jump(target)),
            Opcode::JmpTrue { cond, target } => {
                if self.read(cond)?.is_truthy() {
                    return Ok(Flow::Jump(target));
                }
            }
            Opcode::JmpFalse { cond, target } => {
                if !self.read(cond)?.is_truthy() {
                    return Ok(Flow::Jump(target));
                }
            }
            Opcode::Return { value } => return Ok(Flow::Return(self.read(value)?)),
            Opcode::Throw { value } => return Err(Throw::Value(self.read(value)?)),
            Opcode::Catch { dst } => {
                let v = self.frame_mut()?.exception.take().unwrap_or(Value::Undefined);
                self.write(dst, v)?;
            }

            Opcode::GetGlobal { dst, name } => {
                let key = self.name_key(name)?;
                let global = self.intrinsics.global;
                if !self.has_property(global, &key)? {
                    return self.throw_reference_error(&format!("{} is not defined", key));
                }
                let v = self.get(&Value::Object(global), &key)?;
                self.write(dst, v)?;
            }
            Opcode::TryGetGlobal { dst, name } => {
                let key = self.name_key(name)?;
                let v = self.get(&Value::Object(self.intrinsics.global), &key)?;
                self.write(dst, v)?;
            }
            Opcode::PutGlobal { name, value } => {
                let key = self.name_key(name)?;
                let v = self.read(value)?;
                let global = self.intrinsics.global;
                let strict = self.frame()?.is_strict();
                if strict && !self.has_property(global, &key)? {
                    return self.throw_reference_error(&format!("{} is not defined", key));
                }
                self.set(&Value::Object(global), &key, v, strict)?;
            }
            Opcode::DeclareGlobal { name } => {
                let key = self.name_key(name)?;
                let global = self.intrinsics.global;
                if !self.has_own_property(global, &key)? {
                    self.define_own_property(
                        global,
                        &key,
                        PropertyDescriptor::data(Value::Undefined, PropertyFlags::data(true, true, false)),
                    )?;
                }
            }

            Opcode::CreateEnvironment { dst, size } => {
                let parent = self.frame()?.env;
                let env = self.alloc_environment(Environment::new(parent, size))?;
                self.write(dst, Value::Environment(env))?;
            }
            Opcode::CreateInnerEnvironment { dst, parent, size } => {
                let parent = self.env_operand(parent)?;
                let env = self.alloc_environment(Environment::new(Some(parent), size))?;
                self.write(dst, Value::Environment(env))?;
            }
            Opcode::GetEnvironment { dst, depth } => {
                let mut env = self.frame()?.env;
                for _ in 0..depth {
                    env = match env {
                        Some(e) => self.environment(e)?.parent,
                        None => None,
                    };
                }
                let Some(env) = env else {
                    return malformed(format!("no environment at depth {}", depth));
                };
                self.write(dst, Value::Environment(env))?;
            }
            Opcode::LoadFromEnvironment { dst, env, slot } => {
                let env = self.env_operand(env)?;
                let Some(v) = self.environment(env)?.slots.get(slot as usize).cloned() else {
                    return malformed(format!("environment slot {} out of range", slot));
                };
                self.write(dst, v)?;
            }
            Opcode::StoreToEnvironment { env, slot, value } => {
                let env = self.env_operand(env)?;
                let v = self.read(value)?;
                match self.environment_mut(env)?.slots.get_mut(slot as usize) {
                    Some(s) => *s = v,
                    None => return malformed(format!("environment slot {} out of range", slot)),
                }
            }
            Opcode::CreateClosure { dst, env, function } => {
                let env = match self.read(env)? {
                    Value::Environment(e) => Some(e),
                    Value::Undefined => None,
                    other => return malformed(format!("closure environment {:?}", other)),
                };
                let frame = self.frame()?;
                let code = CodeRef {
                    module: frame.code_ref.module,
                    function,
                };
                let this = frame.this.clone();
                let closure = self.create_closure(code, env, Some(this))?;
                self.write(dst, Value::Object(closure))?;
            }
            Opcode::CreateArguments { dst, env } => {
                let env = match env {
                    Some(r) => Some(self.env_operand(r)?),
                    None => None,
                };
                let args = self.create_arguments(env)?;
                self.write(dst, Value::Object(args))?;
            }

            Opcode::NewObject { dst } => {
                let obj = self.new_object()?;
                self.write(dst, Value::Object(obj))?;
            }
            Opcode::NewObjectWithParent { dst, parent } => {
                let proto = match self.read(parent)? {
                    Value::Object(p) => Some(p),
                    Value::Null => None,
                    _ => Some(self.intrinsics.object_prototype),
                };
                let obj = self.new_object_with_prototype(proto)?;
                self.write(dst, Value::Object(obj))?;
            }
            Opcode::NewArray { dst, .. } => {
                let arr = self.new_array(Vec::new())?;
                self.write(dst, Value::Object(arr))?;
            }
            Opcode::NewArrayFrom { dst, first, count } => {
                let values = self.read_range(first, count)?;
                let arr = self.new_array(values)?;
                self.write(dst, Value::Object(arr))?;
            }
            Opcode::GetById {
                dst,
                obj,
                name,
                cache,
            } => self.get_by_id(dst, obj, name, cache)?,
            Opcode::PutById {
                obj,
                name,
                value,
                cache,
            } => self.put_by_id(obj, name, value, cache)?,
            Opcode::PutOwnById { obj, name, value } => {
                let r = self.object_operand(obj)?;
                let key = self.name_key(name)?;
                let v = self.read(value)?;
                self.define_property_or_throw(r, key, v, PropertyFlags::DEFAULT)?;
            }
            Opcode::GetByVal { dst, obj, key } => {
                let target = self.read(obj)?;
                let key = self.read(key)?;
                self.require_coercible(&target, &key, "read")?;
                let key = self.to_property_key(&key)?;
                let v = self.get(&target, &key)?;
                self.write(dst, v)?;
            }
            Opcode::PutByVal { obj, key, value } => {
                let target = self.read(obj)?;
                let key = self.read(key)?;
                let v = self.read(value)?;
                self.require_coercible(&target, &key, "set")?;
                let key = self.to_property_key(&key)?;
                let strict = self.frame()?.is_strict();
                self.set(&target, &key, v, strict)?;
            }
            Opcode::PutOwnByIndex { obj, index, value } => {
                let r = self.object_operand(obj)?;
                let v = self.read(value)?;
                self.define_property_or_throw(r, PropertyKey::Index(index), v, PropertyFlags::DEFAULT)?;
            }
            Opcode::DelById { dst, obj, name } => {
                let target = self.read(obj)?;
                let key = self.name_key(name)?;
                let deleted = self.delete(&target, &key)?;
                self.write(dst, Value::Boolean(deleted))?;
            }
            Opcode::DelByVal { dst, obj, key } => {
                let target = self.read(obj)?;
                let key = self.read(key)?;
                self.require_coercible(&target, &key, "delete")?;
                let key = self.to_property_key(&key)?;
                let deleted = self.delete(&target, &key)?;
                self.write(dst, Value::Boolean(deleted))?;
            }
            Opcode::PutOwnGetterSetter {
                obj,
                name,
                getter,
                setter,
            } => {
                let r = self.object_operand(obj)?;
                let key = self.name_key(name)?;
                let get = Some(self.read(getter)?).filter(|v| !matches!(v, Value::Undefined));
                let set = Some(self.read(setter)?).filter(|v| !matches!(v, Value::Undefined));
                let desc = PropertyDescriptor {
                    get,
                    set,
                    enumerable: Some(true),
                    configurable: Some(true),
                    ..PropertyDescriptor::default()
                };
                if !self.define_own_property(r, &key, desc)? {
                    return self.throw_type_error(&format!("Cannot redefine property: {}", key));
                }
            }
            Opcode::GetPropertyNames { dst, obj } => {
                let target = self.read(obj)?;
                let keys = if target.is_nullish() {
                    Vec::new()
                } else {
                    let r = self.to_object(&target)?;
                    self.for_in_keys(r)?
                };
                let arr = self.new_array(keys)?;
                self.write(dst, Value::Object(arr))?;
            }
            Opcode::GetNextPropertyName {
                dst,
                names,
                obj,
                index,
            } => {
                let names = self.object_operand(names)?;
                let count = self.object(names)?.array_length().unwrap_or(0);
                let mut i = match self.read(index)? {
                    Value::Number(n) if n > 0.0 => n as u32,
                    _ => 0,
                };
                let target = self.read(obj)?;
                let mut next = Value::Undefined;
                while i < count {
                    let name = self.get(&Value::Object(names), &PropertyKey::Index(i))?;
                    i += 1;
                    let present = match &target {
                        Value::Object(r) => {
                            let key = self.to_property_key(&name)?;
                            self.has_property(*r, &key)?
                        }
                        // Primitive wrappers have no deletable keys.
                        _ => true,
                    };
                    if present {
                        next = name;
                        break;
                    }
                }
                self.write(index, Value::number(i as f64))?;
                self.write(dst, next)?;
            }

            Opcode::Call {
                dst,
                callee,
                this,
                first_arg,
                argc,
            } => {
                let f = self.read(callee)?;
                let this = self.read(this)?;
                let args = self.read_range(first_arg, argc)?;
                let prepared = self.prepare_call(&f, this, args, None)?;
                return self.enter(dst, prepared);
            }
            Opcode::Construct {
                dst,
                callee,
                first_arg,
                argc,
            } => {
                let f = self.read(callee)?;
                let args = self.read_range(first_arg, argc)?;
                if !self.is_constructor(&f) {
                    return self.throw_type_error(&format!("{} is not a constructor", value_label(&f)));
                }
                let prepared = self.prepare_call(&f, Value::Undefined, args, Some(f.clone()))?;
                return self.enter(dst, prepared);
            }

            Opcode::Yield { value } => return Ok(Flow::Yield(self.read(value)?)),
            Opcode::ResumeGenerator { dst, is_return } => {
                let (mode, value) = self
                    .frame_mut()?
                    .resume
                    .take()
                    .unwrap_or((ResumeMode::Next, Value::Undefined));
                match mode {
                    ResumeMode::Throw => return Err(Throw::Value(value)),
                    ResumeMode::Next | ResumeMode::Return => {
                        self.write(dst, value)?;
                        self.write(is_return, Value::Boolean(mode == ResumeMode::Return))?;
                    }
                }
            }
        }
        Ok(Flow::Next)
    }

    /// Continue a `Call` / `Construct` with a prepared callee.
    fn enter(&mut self, dst: RegisterId, prepared: Prepared) -> JsResult<Flow> {
        match prepared {
            Prepared::Done(value) => {
                self.write(dst, value)?;
                Ok(Flow::Next)
            }
            Prepared::Frame(mut frame) => {
                frame.return_to = Some(dst);
                self.push_frame(*frame)?;
                Ok(Flow::Entered)
            }
        }
    }

    fn get_by_id(&mut self, dst: RegisterId, obj: RegisterId, name: u32, cache: u32) -> JsResult<()> {
        let target = self.read(obj)?;
        let code = self.frame()?.code_ref;
        if let Value::Object(r) = target {
            let slot = match self.object(r)?.shape() {
                Some(shape) => self.inline_cache(code, cache)?.lookup(shape),
                None => None,
            };
            if let Some(slot) = slot {
                if let Some(PropertyValue::Data(v)) = self.object(r)?.slot(slot) {
                    let v = v.clone();
                    return self.write(dst, v);
                }
            }
        }
        let key = self.name_key(name)?;
        let v = self.get(&target, &key)?;
        if let Value::Object(r) = target {
            self.update_cache(code, cache, r, &key, false)?;
        }
        self.write(dst, v)
    }

    fn put_by_id(&mut self, obj: RegisterId, name: u32, value: RegisterId, cache: u32) -> JsResult<()> {
        let target = self.read(obj)?;
        let v = self.read(value)?;
        let code = self.frame()?.code_ref;
        if let Value::Object(r) = target {
            let slot = match self.object(r)?.shape() {
                Some(shape) => self.inline_cache(code, cache)?.lookup(shape),
                None => None,
            };
            if let Some(slot) = slot {
                if let Some(s) = self.object_mut(r)?.slot_mut(slot) {
                    *s = PropertyValue::Data(v);
                    return Ok(());
                }
            }
        }
        let key = self.name_key(name)?;
        let strict = self.frame()?.is_strict();
        self.set(&target, &key, v, strict)?;
        if let Value::Object(r) = target {
            self.update_cache(code, cache, r, &key, true)?;
        }
        Ok(())
    }

    /// TypeError for property access on `undefined` / `null`.
    fn require_coercible(&mut self, target: &Value, key: &Value, verb: &str) -> JsResult<()> {
        if !target.is_nullish() {
            return Ok(());
        }
        let key = match key {
            Value::Object(_) => String::from("[object Object]"),
            other => other.to_string(),
        };
        let message = match verb {
            "delete" => String::from("Cannot convert undefined or null to object"),
            _ => format!("Cannot {} properties of {} ({}ing '{}')", verb, target, verb, key),
        };
        self.throw_type_error(&message)
    }

    /// `delete target[key]` with the strict-mode failure check.
    fn delete(&mut self, target: &Value, key: &PropertyKey) -> JsResult<bool> {
        let r = self.to_object(target)?;
        let deleted = self.delete_property(r, key)?;
        if !deleted && self.frame()?.is_strict() {
            return self.throw_type_error(&format!("Cannot delete property '{}' of {}", key, value_label(target)));
        }
        Ok(deleted)
    }

    fn create_arguments(&mut self, env: Option<HeapRef>) -> JsResult<HeapRef> {
        let frame = self.frame()?;
        let args = frame.arguments.clone();
        let strict = frame.is_strict();
        let callee = frame.callee;
        let mapped = match env {
            Some(env) if !strict && frame.code.flags.simple_params => {
                let count = args.len().min(frame.code.param_count as usize);
                Some(MappedArguments {
                    env,
                    mapped: vec![true; count],
                })
            }
            _ => None,
        };

        let mut obj = JsObject::new(
            Some(self.intrinsics.object_prototype),
            ObjectClass::Arguments(mapped),
        );
        let length = args.len();
        for (i, v) in args.into_iter().enumerate() {
            obj.elements.set_value(i as u32, v);
        }
        obj.add_named(
            &mut self.shapes,
            PropertyKey::from("length"),
            Property::data(Value::number(length as f64), PropertyFlags::HIDDEN),
        );
        if strict {
            let thrower = Value::Object(self.intrinsics.throw_type_error);
            obj.add_named(
                &mut self.shapes,
                PropertyKey::from("callee"),
                Property {
                    value: PropertyValue::Accessor {
                        get: thrower.clone(),
                        set: thrower,
                    },
                    flags: PropertyFlags::accessor(false, false),
                },
            );
        } else if let Some(callee) = callee {
            obj.add_named(
                &mut self.shapes,
                PropertyKey::from("callee"),
                Property::data(Value::Object(callee), PropertyFlags::HIDDEN),
            );
        }
        self.alloc_object(obj)
    }

    // ---- calls -----------------------------------------------------------------

    fn push_frame(&mut self, frame: CallFrame) -> JsResult<()> {
        if self.frames.len() >= self.config.max_frames {
            return self.throw_range_error("Maximum call stack size exceeded");
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Resolve `callee` and either run it (natives, generator creation) or
    /// build its frame. `new_target` is `Some` for `new`.
    fn prepare_call(
        &mut self,
        callee: &Value,
        this: Value,
        args: Vec<Value>,
        new_target: Option<Value>,
    ) -> JsResult<Prepared> {
        let kind = match callee {
            Value::Object(r) => match &self.object(*r)?.class {
                ObjectClass::Function(kind) => Some((*r, kind.clone())),
                _ => None,
            },
            _ => None,
        };
        let Some((f, kind)) = kind else {
            return self.throw_type_error(&format!("{} is not a function", value_label(callee)));
        };

        match kind {
            FunctionKind::Native { func, magic, .. } => {
                let v = self.call_native(f, func, magic, this, args, new_target.unwrap_or(Value::Undefined))?;
                Ok(Prepared::Done(v))
            }
            FunctionKind::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                let mut all = bound_args;
                all.extend(args);
                let new_target = new_target.map(|nt| match nt {
                    Value::Object(r) if r == f => Value::Object(target),
                    other => other,
                });
                self.prepare_call(&Value::Object(target), bound_this, all, new_target)
            }
            FunctionKind::Bytecode {
                code,
                env,
                lexical_this,
                generator,
                ..
            } => {
                let Some(module) = self.module(code.module).cloned() else {
                    return malformed(format!("unknown module {}", code.module.0));
                };
                let Some(record) = module.function(code.function).cloned() else {
                    return malformed(format!("function index {} out of range", code.function));
                };
                let strict = record.flags.strict;
                let construct = new_target.is_some();
                let this = match (lexical_this, &new_target) {
                    (Some(lexical), _) => lexical,
                    (None, Some(nt)) => {
                        let proto = self.prototype_from_constructor(nt, self.intrinsics.object_prototype)?;
                        Value::Object(self.new_object_with_prototype(Some(proto))?)
                    }
                    (None, None) if strict => this,
                    (None, None) => self.sloppy_this(this)?,
                };

                let mut frame = CallFrame::new(module, record, code, args);
                frame.env = env;
                frame.this = this;
                frame.new_target = new_target.unwrap_or(Value::Undefined);
                frame.callee = Some(f);
                frame.construct = construct;

                if generator {
                    let proto = self.prototype_from_constructor(
                        &Value::Object(f),
                        self.intrinsics.generator_prototype,
                    )?;
                    let gen = self.alloc_object(JsObject::new(
                        Some(proto),
                        ObjectClass::Generator(Box::new(GeneratorData::new(frame))),
                    ))?;
                    if let ObjectClass::Generator(data) = &mut self.object_mut(gen)?.class {
                        if let Some(frame) = data.frame.as_mut() {
                            frame.generator = Some(gen);
                        }
                    }
                    return Ok(Prepared::Done(Value::Object(gen)));
                }
                Ok(Prepared::Frame(Box::new(frame)))
            }
        }
    }

    fn sloppy_this(&mut self, this: Value) -> JsResult<Value> {
        Ok(match this {
            Value::Undefined | Value::Null => Value::Object(self.intrinsics.global),
            Value::Object(_) => this,
            primitive => Value::Object(self.to_object(&primitive)?),
        })
    }

    /// `constructor.prototype` if it is an object, else `fallback`.
    pub fn prototype_from_constructor(&mut self, constructor: &Value, fallback: HeapRef) -> JsResult<HeapRef> {
        if !matches!(constructor, Value::Object(_)) {
            return Ok(fallback);
        }
        Ok(match self.get_by_name(constructor, "prototype")? {
            Value::Object(p) => p,
            _ => fallback,
        })
    }

    fn enter_host(&mut self) -> JsResult<()> {
        if self.reentry_depth >= self.config.max_native_depth {
            return self.throw_range_error("Maximum call stack size exceeded (native stack depth)");
        }
        self.reentry_depth += 1;
        Ok(())
    }

    fn call_native(
        &mut self,
        callee: HeapRef,
        func: NativeFunction,
        magic: u32,
        this: Value,
        args: Vec<Value>,
        new_target: Value,
    ) -> JsResult<Value> {
        self.enter_host()?;
        let name: Rc<str> = match self.object(callee)?.get_named(&self.shapes, &PropertyKey::from("name")) {
            Some(Property {
                value: PropertyValue::Data(Value::String(s)),
                ..
            }) => s,
            _ => Rc::from(""),
        };
        let marker = self.gc_scope.len();
        self.gc_scope.push(Value::Object(callee));
        self.root(this.clone());
        self.root(new_target.clone());
        for arg in &args {
            self.root(arg.clone());
        }
        self.native_frames.push(NativeFrame {
            name,
            js_depth: self.frames.len(),
        });
        let call_args = CallArgs {
            this,
            args,
            new_target,
            callee,
            magic,
        };
        let result = func(self, &call_args);
        self.native_frames.pop();
        self.reentry_depth -= 1;
        self.gc_scope.truncate(marker);
        match &result {
            Ok(v) | Err(Throw::Value(v)) => self.root(v.clone()),
            Err(Throw::Fatal(_)) => {}
        }
        result
    }

    /// Run a prepared bytecode frame to completion on a nested loop.
    fn run_frame(&mut self, frame: CallFrame) -> JsResult<Value> {
        self.enter_host()?;
        let depth = self.frames.len();
        let result = match self.push_frame(frame) {
            Ok(()) => self.execute(depth),
            Err(t) => Err(t),
        };
        self.reentry_depth -= 1;
        match result? {
            Completion::Return(v) => Ok(v),
            Completion::Yield(_) => malformed("yield escaped a plain call"),
        }
    }

    /// Call `callee` with `this` and `args`.
    ///
    /// ```
    /// # use interpreter::{Runtime, RuntimeConfig, CallArgs, JsResult};
    /// # use core_types::Value;
    /// fn twice(_: &mut Runtime, args: &CallArgs) -> JsResult<Value> {
    ///     Ok(Value::number(args.arg(0).as_number().unwrap_or(0.0) * 2.0))
    /// }
    /// let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
    /// let f = rt.new_native_function("twice", 1, twice).unwrap();
    /// let v = rt.call(&Value::Object(f), Value::Undefined, vec![Value::number(21.0)]).unwrap();
    /// assert_eq!(v, Value::number(42.0));
    /// ```
    pub fn call(&mut self, callee: &Value, this: Value, args: Vec<Value>) -> JsResult<Value> {
        match self.prepare_call(callee, this, args, None)? {
            Prepared::Done(v) => Ok(v),
            Prepared::Frame(frame) => self.run_frame(*frame),
        }
    }

    /// `new callee(...args)`; `new_target` defaults to `callee`.
    pub fn construct(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        new_target: Option<&Value>,
    ) -> JsResult<Value> {
        if !self.is_constructor(callee) {
            return self.throw_type_error(&format!("{} is not a constructor", value_label(callee)));
        }
        let new_target = new_target.unwrap_or(callee).clone();
        match self.prepare_call(callee, Value::Undefined, args, Some(new_target))? {
            Prepared::Done(v) => Ok(v),
            Prepared::Frame(frame) => self.run_frame(*frame),
        }
    }

    /// Invoke method `name` of `target`.
    pub fn invoke(&mut self, target: &Value, name: &str, args: Vec<Value>) -> JsResult<Value> {
        let method = self.get_by_name(target, name)?;
        self.call(&method, target.clone(), args)
    }
}
