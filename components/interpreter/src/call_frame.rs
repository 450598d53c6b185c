//! Call frame for function call stack management

use std::rc::Rc;

use bytecode_system::{FunctionRecord, RegisterId};
use core_types::{HeapRef, Value};
use memory_manager::Tracer;

use crate::code::{CodeRef, LoadedModule};
use crate::generator::ResumeMode;

/// Activation record of a bytecode function.
///
/// `pc` always names the instruction being executed; for a caller it is the
/// call instruction, so handler lookup and stack traces use it directly.
#[derive(Debug)]
pub struct CallFrame {
    pub(crate) module: Rc<LoadedModule>,
    pub(crate) code: Rc<FunctionRecord>,
    pub code_ref: CodeRef,
    pub pc: u32,
    pub registers: Vec<Value>,
    /// Environment captured by the closure being run.
    pub env: Option<HeapRef>,
    pub this: Value,
    pub new_target: Value,
    pub callee: Option<HeapRef>,
    /// Actual arguments, kept for `arguments` objects.
    pub arguments: Vec<Value>,
    /// Exception delivered to the handler about to run `Catch`.
    pub(crate) exception: Option<Value>,
    /// Pending generator resumption, consumed by `ResumeGenerator`.
    pub(crate) resume: Option<(ResumeMode, Value)>,
    /// Caller register receiving the result.
    pub(crate) return_to: Option<RegisterId>,
    /// Frame created by `new`; non-object results are replaced by `this`.
    pub(crate) construct: bool,
    /// Generator object owning this frame.
    pub(crate) generator: Option<HeapRef>,
}

impl CallFrame {
    pub(crate) fn new(
        module: Rc<LoadedModule>,
        code: Rc<FunctionRecord>,
        code_ref: CodeRef,
        args: Vec<Value>,
    ) -> Self {
        let mut registers = vec![Value::Undefined; code.register_count.max(code.param_count) as usize];
        for (slot, arg) in registers
            .iter_mut()
            .zip(args.iter())
            .take(code.param_count as usize)
        {
            *slot = arg.clone();
        }
        Self {
            module,
            code,
            code_ref,
            pc: 0,
            registers,
            env: None,
            this: Value::Undefined,
            new_target: Value::Undefined,
            callee: None,
            arguments: args,
            exception: None,
            resume: None,
            return_to: None,
            construct: false,
            generator: None,
        }
    }

    pub fn function_name(&self) -> &str {
        &self.code.name
    }

    pub fn source_url(&self) -> &str {
        &self.module.source_url
    }

    pub fn is_strict(&self) -> bool {
        self.code.flags.strict
    }

    /// Report every heap handle the frame keeps alive.
    pub(crate) fn trace(&self, tracer: &mut Tracer) {
        for v in &self.registers {
            tracer.visit_value(v);
        }
        for v in &self.arguments {
            tracer.visit_value(v);
        }
        tracer.visit_opt(self.env);
        tracer.visit_opt(self.callee);
        tracer.visit_opt(self.generator);
        tracer.visit_value(&self.this);
        tracer.visit_value(&self.new_target);
        if let Some(e) = &self.exception {
            tracer.visit_value(e);
        }
        if let Some((_, v)) = &self.resume {
            tracer.visit_value(v);
        }
    }
}
