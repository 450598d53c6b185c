//! Programmatic construction of bytecode modules.
//!
//! Front ends (and tests) emit instructions through [`FunctionBuilder`],
//! using [`Label`]s for forward jumps and try regions, then collect the
//! finished functions in a [`ModuleBuilder`].
//!
//! ```
//! use bytecode_system::{FunctionBuilder, ModuleBuilder, Opcode};
//!
//! let mut module = ModuleBuilder::new("answer.js");
//! let mut f = FunctionBuilder::new("main", 0);
//! let r = f.reg();
//! f.emit(Opcode::LoadInt { dst: r, value: 42 });
//! f.emit(Opcode::Return { value: r });
//! let entry = module.add_function(f.finish().unwrap());
//! module.set_entry(entry);
//! let module = module.finish().unwrap();
//! assert_eq!(module.functions[0].register_count, 1);
//! ```

use std::collections::HashMap;

use core_types::SourceLocation;
use thiserror::Error;

use crate::function::{FunctionFlags, FunctionRecord, HandlerEntry};
use crate::instruction::Instruction;
use crate::module::{BytecodeModule, Constant};
use crate::opcode::{Opcode, RegisterId};

/// Errors detected while finishing a function or module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("label {0} used but never bound")]
    UnboundLabel(u32),
    #[error("function {0} reserved but never defined")]
    UndefinedFunction(u32),
    #[error("module has no functions")]
    Empty,
}

/// A jump target or try-region boundary inside one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(u32);

/// Builds one [`FunctionRecord`].
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    param_count: u32,
    flags: FunctionFlags,
    instructions: Vec<Instruction>,
    labels: Vec<Option<u32>>,
    fixups: Vec<(usize, Label)>,
    handlers: Vec<(Label, Label, Label)>,
    next_register: u32,
    cache_count: u32,
    location: Option<SourceLocation>,
}

impl FunctionBuilder {
    /// Registers `0..param_count` hold the parameters.
    pub fn new(name: &str, param_count: u32) -> Self {
        Self {
            name: name.to_string(),
            param_count,
            flags: FunctionFlags {
                simple_params: true,
                constructor: true,
                ..FunctionFlags::default()
            },
            instructions: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
            handlers: Vec::new(),
            next_register: param_count,
            cache_count: 0,
            location: None,
        }
    }

    pub fn strict(mut self) -> Self {
        self.flags.strict = true;
        self
    }

    pub fn generator(mut self) -> Self {
        self.flags.generator = true;
        self.flags.constructor = false;
        self
    }

    pub fn arrow(mut self) -> Self {
        self.flags.arrow = true;
        self.flags.constructor = false;
        self
    }

    /// Methods and accessors are not constructors.
    pub fn not_constructor(mut self) -> Self {
        self.flags.constructor = false;
        self
    }

    /// Parameter list uses destructuring, defaults or rest.
    pub fn complex_params(mut self) -> Self {
        self.flags.simple_params = false;
        self
    }

    pub fn flags(&self) -> FunctionFlags {
        self.flags
    }

    /// Register holding parameter `i`.
    pub fn param(&self, i: u32) -> RegisterId {
        RegisterId(i)
    }

    /// Allocate a fresh register.
    pub fn reg(&mut self) -> RegisterId {
        let r = RegisterId(self.next_register);
        self.next_register += 1;
        r
    }

    /// Allocate `count` consecutive registers, returning the first.
    pub fn regs(&mut self, count: u32) -> RegisterId {
        let first = RegisterId(self.next_register);
        self.next_register += count;
        first
    }

    /// Allocate an inline cache slot.
    pub fn cache(&mut self) -> u32 {
        let slot = self.cache_count;
        self.cache_count += 1;
        slot
    }

    /// Location attached to subsequently emitted instructions.
    pub fn set_location(&mut self, loc: Option<SourceLocation>) {
        self.location = loc;
    }

    /// Index the next instruction will get.
    pub fn pc(&self) -> u32 {
        self.instructions.len() as u32
    }

    /// Append an instruction, returning its index.
    pub fn emit(&mut self, opcode: Opcode) -> u32 {
        let pc = self.pc();
        self.instructions.push(Instruction {
            opcode,
            loc: self.location,
        });
        pc
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() as u32 - 1)
    }

    /// Bind `label` to the next instruction.
    pub fn bind(&mut self, label: Label) {
        let pc = self.pc();
        self.labels[label.0 as usize] = Some(pc);
    }

    fn emit_branch(&mut self, opcode: Opcode, label: Label) -> u32 {
        let at = self.emit(opcode);
        self.fixups.push((at as usize, label));
        at
    }

    pub fn jmp(&mut self, label: Label) -> u32 {
        self.emit_branch(Opcode::Jmp { target: 0 }, label)
    }

    pub fn jmp_true(&mut self, cond: RegisterId, label: Label) -> u32 {
        self.emit_branch(Opcode::JmpTrue { cond, target: 0 }, label)
    }

    pub fn jmp_false(&mut self, cond: RegisterId, label: Label) -> u32 {
        self.emit_branch(Opcode::JmpFalse { cond, target: 0 }, label)
    }

    /// Register a try region `[start, end)` handled at `target`.
    ///
    /// Register inner regions before the regions enclosing them.
    pub fn handler(&mut self, start: Label, end: Label, target: Label) {
        self.handlers.push((start, end, target));
    }

    /// `dst = obj.name` through a fresh inline cache slot.
    pub fn get_by_id(&mut self, dst: RegisterId, obj: RegisterId, name: u32) -> u32 {
        let cache = self.cache();
        self.emit(Opcode::GetById {
            dst,
            obj,
            name,
            cache,
        })
    }

    /// `obj.name = value` through a fresh inline cache slot.
    pub fn put_by_id(&mut self, obj: RegisterId, name: u32, value: RegisterId) -> u32 {
        let cache = self.cache();
        self.emit(Opcode::PutById {
            obj,
            name,
            value,
            cache,
        })
    }

    fn resolve(&self, label: Label) -> Result<u32, BuildError> {
        self.labels
            .get(label.0 as usize)
            .copied()
            .flatten()
            .ok_or(BuildError::UnboundLabel(label.0))
    }

    /// Patch jumps and handlers and produce the record.
    pub fn finish(mut self) -> Result<FunctionRecord, BuildError> {
        for (at, label) in std::mem::take(&mut self.fixups) {
            let target = self.resolve(label)?;
            if let Some(slot) = self.instructions[at].opcode.jump_target_mut() {
                *slot = target;
            }
        }
        let mut handlers = Vec::with_capacity(self.handlers.len());
        for (start, end, target) in &self.handlers {
            handlers.push(HandlerEntry {
                start: self.resolve(*start)?,
                end: self.resolve(*end)?,
                target: self.resolve(*target)?,
            });
        }
        Ok(FunctionRecord {
            name: self.name,
            param_count: self.param_count,
            register_count: self.next_register.max(1),
            cache_count: self.cache_count,
            flags: self.flags,
            instructions: self.instructions,
            handlers,
        })
    }
}

/// Collects constants and functions into a [`BytecodeModule`].
#[derive(Debug)]
pub struct ModuleBuilder {
    source_url: String,
    constants: Vec<Constant>,
    strings: HashMap<String, u32>,
    functions: Vec<Option<FunctionRecord>>,
    entry: u32,
}

impl ModuleBuilder {
    pub fn new(source_url: &str) -> Self {
        Self {
            source_url: source_url.to_string(),
            constants: Vec::new(),
            strings: HashMap::new(),
            functions: Vec::new(),
            entry: 0,
        }
    }

    /// Append a constant (strings go through [`ModuleBuilder::string`]).
    pub fn constant(&mut self, constant: Constant) -> u32 {
        if let Constant::String(s) = &constant {
            return self.string(s);
        }
        self.constants.push(constant);
        self.constants.len() as u32 - 1
    }

    /// Interned string constant.
    pub fn string(&mut self, s: &str) -> u32 {
        if let Some(index) = self.strings.get(s) {
            return *index;
        }
        self.constants.push(Constant::String(s.to_string()));
        let index = self.constants.len() as u32 - 1;
        self.strings.insert(s.to_string(), index);
        index
    }

    pub fn number(&mut self, n: f64) -> u32 {
        self.constant(Constant::Number(n))
    }

    /// BigInt constant from decimal digits.
    pub fn bigint(&mut self, digits: &str) -> u32 {
        self.constant(Constant::BigInt(digits.to_string()))
    }

    /// Reserve a function index to be filled by [`ModuleBuilder::define_function`],
    /// so closures can refer to functions built later.
    pub fn reserve_function(&mut self) -> u32 {
        self.functions.push(None);
        self.functions.len() as u32 - 1
    }

    pub fn define_function(&mut self, index: u32, function: FunctionRecord) {
        if let Some(slot) = self.functions.get_mut(index as usize) {
            *slot = Some(function);
        }
    }

    pub fn add_function(&mut self, function: FunctionRecord) -> u32 {
        self.functions.push(Some(function));
        self.functions.len() as u32 - 1
    }

    pub fn set_entry(&mut self, index: u32) {
        self.entry = index;
    }

    pub fn finish(self) -> Result<BytecodeModule, BuildError> {
        if self.functions.is_empty() {
            return Err(BuildError::Empty);
        }
        let functions = self
            .functions
            .into_iter()
            .enumerate()
            .map(|(i, f)| f.ok_or(BuildError::UndefinedFunction(i as u32)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BytecodeModule {
            source_url: self.source_url,
            constants: self.constants,
            functions,
            entry: self.entry,
        })
    }
}
