//! Compiled function records and exception handler tables.

use serde::{Deserialize, Serialize};

use crate::instruction::Instruction;

/// Static properties of a compiled function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionFlags {
    /// Strict-mode code
    pub strict: bool,
    /// `function*`; calling it creates a generator object
    pub generator: bool,
    /// May be invoked with `new`
    pub constructor: bool,
    /// Arrow function: lexical `this`, never a constructor
    pub arrow: bool,
    /// No destructuring, defaults or rest in the parameter list
    pub simple_params: bool,
}

/// One try region: exceptions raised at `start <= pc < end` transfer
/// control to `target`.
///
/// Entries are searched in order and the first covering entry wins, so
/// inner regions must precede the regions that enclose them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerEntry {
    pub start: u32,
    pub end: u32,
    pub target: u32,
}

impl HandlerEntry {
    pub fn covers(&self, pc: u32) -> bool {
        self.start <= pc && pc < self.end
    }
}

/// A compiled function.
///
/// Arguments arrive in registers `0..param_count`; the remaining registers
/// up to `register_count` start out undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub param_count: u32,
    pub register_count: u32,
    /// Number of inline cache slots used by `GetById` / `PutById`
    #[serde(default)]
    pub cache_count: u32,
    #[serde(default)]
    pub flags: FunctionFlags,
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub handlers: Vec<HandlerEntry>,
}

impl FunctionRecord {
    /// First handler covering `pc`.
    pub fn find_handler(&self, pc: u32) -> Option<&HandlerEntry> {
        self.handlers.iter().find(|h| h.covers(pc))
    }
}
