//! Bytecode opcodes for JavaScript runtime
//!
//! Defines the instruction set of the register-based VM. Every operand is a
//! register, an index into the module constant pool (`name`, `index`), an
//! index into the module function table (`function`), or an absolute
//! instruction index (`target`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Register identifier for local variable slots
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegisterId(pub u32);

impl fmt::Debug for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Bytecode opcodes for JavaScript execution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Opcode {
    // Moves and literals
    /// Copy a register
    Mov { dst: RegisterId, src: RegisterId },
    /// Load constant from constant pool at given index
    LoadConst { dst: RegisterId, index: u32 },
    LoadUndefined { dst: RegisterId },
    LoadNull { dst: RegisterId },
    LoadBool { dst: RegisterId, value: bool },
    /// Load a small integer without a constant pool entry
    LoadInt { dst: RegisterId, value: i32 },
    /// Load the frame's `this` binding
    LoadThis { dst: RegisterId },
    /// Load `new.target` (undefined for plain calls)
    LoadNewTarget { dst: RegisterId },

    // Binary arithmetic
    Add { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    Sub { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    Mul { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    Div { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    Mod { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    Exp { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    BitAnd { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    BitOr { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    BitXor { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    Shl { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    Shr { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    UShr { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },

    // Unary
    Negate { dst: RegisterId, src: RegisterId },
    BitNot { dst: RegisterId, src: RegisterId },
    /// Logical NOT (invert truthiness)
    Not { dst: RegisterId, src: RegisterId },
    /// typeof operator
    TypeOf { dst: RegisterId, src: RegisterId },
    /// Unary `+` for numbers, BigInt passthrough (used by `x++` lowering)
    ToNumeric { dst: RegisterId, src: RegisterId },
    Inc { dst: RegisterId, src: RegisterId },
    Dec { dst: RegisterId, src: RegisterId },

    // Comparison
    /// Loose equality (==)
    Eq { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    NotEq { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    /// Strict equality (===)
    StrictEq { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    StrictNotEq { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    Less { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    LessEq { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    Greater { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    GreaterEq { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    InstanceOf { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },
    /// `lhs in rhs`
    In { dst: RegisterId, lhs: RegisterId, rhs: RegisterId },

    // Control flow
    /// Unconditional jump to an absolute instruction index
    Jmp { target: u32 },
    JmpTrue { cond: RegisterId, target: u32 },
    JmpFalse { cond: RegisterId, target: u32 },
    /// Return from current function
    Return { value: RegisterId },
    Throw { value: RegisterId },
    /// First instruction of a handler: take the in-flight exception
    Catch { dst: RegisterId },

    // Globals (`name` is a string constant)
    /// Read a global; ReferenceError if it does not exist
    GetGlobal { dst: RegisterId, name: u32 },
    /// Read a global; undefined if it does not exist (`typeof x`)
    TryGetGlobal { dst: RegisterId, name: u32 },
    PutGlobal { name: u32, value: RegisterId },
    /// `var name` at script top level
    DeclareGlobal { name: u32 },

    // Environments
    /// New environment whose parent is the current closure environment
    CreateEnvironment { dst: RegisterId, size: u32 },
    /// New environment nested in `parent` (block scopes, per-iteration bindings)
    CreateInnerEnvironment { dst: RegisterId, parent: RegisterId, size: u32 },
    /// Walk `depth` parents up from the closure environment
    GetEnvironment { dst: RegisterId, depth: u32 },
    LoadFromEnvironment { dst: RegisterId, env: RegisterId, slot: u32 },
    StoreToEnvironment { env: RegisterId, slot: u32, value: RegisterId },
    /// Instantiate function `function` capturing `env`
    CreateClosure { dst: RegisterId, env: RegisterId, function: u32 },
    /// Materialize `arguments`; mapped onto `env` slots when `env` is given
    CreateArguments { dst: RegisterId, env: Option<RegisterId> },

    // Objects (`name` is a string constant; `cache` an inline cache slot)
    NewObject { dst: RegisterId },
    NewObjectWithParent { dst: RegisterId, parent: RegisterId },
    NewArray { dst: RegisterId, size_hint: u32 },
    /// Array literal from `count` consecutive registers starting at `first`
    NewArrayFrom { dst: RegisterId, first: RegisterId, count: u32 },
    GetById { dst: RegisterId, obj: RegisterId, name: u32, cache: u32 },
    PutById { obj: RegisterId, name: u32, value: RegisterId, cache: u32 },
    /// Define a data property (object literals)
    PutOwnById { obj: RegisterId, name: u32, value: RegisterId },
    GetByVal { dst: RegisterId, obj: RegisterId, key: RegisterId },
    PutByVal { obj: RegisterId, key: RegisterId, value: RegisterId },
    /// Define an element (array literals)
    PutOwnByIndex { obj: RegisterId, index: u32, value: RegisterId },
    DelById { dst: RegisterId, obj: RegisterId, name: u32 },
    DelByVal { dst: RegisterId, obj: RegisterId, key: RegisterId },
    /// Define an accessor; either register may hold undefined
    PutOwnGetterSetter { obj: RegisterId, name: u32, getter: RegisterId, setter: RegisterId },
    /// Array of enumerable string keys along the prototype chain (`for-in`)
    GetPropertyNames { dst: RegisterId, obj: RegisterId },
    /// Next name from a `GetPropertyNames` list, starting at the position in
    /// `index`, that `obj` still has; names deleted since the list was taken
    /// are skipped. Advances `index`; `dst` is undefined when exhausted.
    GetNextPropertyName { dst: RegisterId, names: RegisterId, obj: RegisterId, index: RegisterId },

    // Calls
    /// Call `callee` with `argc` arguments in consecutive registers from `first_arg`
    Call { dst: RegisterId, callee: RegisterId, this: RegisterId, first_arg: RegisterId, argc: u32 },
    Construct { dst: RegisterId, callee: RegisterId, first_arg: RegisterId, argc: u32 },

    // Generators
    /// Suspend the generator, producing `value`
    Yield { value: RegisterId },
    /// Receive the resumption value; `is_return` is set when `.return()` resumed us.
    /// A `.throw()` resumption raises at this instruction.
    ResumeGenerator { dst: RegisterId, is_return: RegisterId },
}

impl Opcode {
    /// Check if this opcode is a terminator (ends basic block)
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Opcode::Return { .. }
                | Opcode::Jmp { .. }
                | Opcode::JmpTrue { .. }
                | Opcode::JmpFalse { .. }
                | Opcode::Throw { .. }
        )
    }

    /// Check if this opcode is an unconditional terminator
    pub fn is_unconditional_terminator(&self) -> bool {
        matches!(
            self,
            Opcode::Return { .. } | Opcode::Jmp { .. } | Opcode::Throw { .. }
        )
    }

    /// Check if this opcode is a binary arithmetic operation
    pub fn is_binary_arithmetic(&self) -> bool {
        matches!(
            self,
            Opcode::Add { .. }
                | Opcode::Sub { .. }
                | Opcode::Mul { .. }
                | Opcode::Div { .. }
                | Opcode::Mod { .. }
                | Opcode::Exp { .. }
        )
    }

    /// Jump target, if this is a branch.
    pub fn jump_target(&self) -> Option<u32> {
        match self {
            Opcode::Jmp { target }
            | Opcode::JmpTrue { target, .. }
            | Opcode::JmpFalse { target, .. } => Some(*target),
            _ => None,
        }
    }

    pub(crate) fn jump_target_mut(&mut self) -> Option<&mut u32> {
        match self {
            Opcode::Jmp { target }
            | Opcode::JmpTrue { target, .. }
            | Opcode::JmpFalse { target, .. } => Some(target),
            _ => None,
        }
    }

    /// String-constant operand naming a property or global.
    pub fn name_operand(&self) -> Option<u32> {
        match self {
            Opcode::GetGlobal { name, .. }
            | Opcode::TryGetGlobal { name, .. }
            | Opcode::PutGlobal { name, .. }
            | Opcode::DeclareGlobal { name }
            | Opcode::GetById { name, .. }
            | Opcode::PutById { name, .. }
            | Opcode::PutOwnById { name, .. }
            | Opcode::DelById { name, .. }
            | Opcode::PutOwnGetterSetter { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// Inline cache slot used by this instruction.
    pub fn cache_slot(&self) -> Option<u32> {
        match self {
            Opcode::GetById { cache, .. } | Opcode::PutById { cache, .. } => Some(*cache),
            _ => None,
        }
    }

    /// True for instructions the interpreter treats as GC / interrupt safepoints.
    pub fn is_safepoint(&self, pc: u32) -> bool {
        match self.jump_target() {
            Some(target) => target <= pc,
            None => matches!(
                self,
                Opcode::Call { .. } | Opcode::Construct { .. } | Opcode::Return { .. }
            ),
        }
    }
}
