//! Bytecode instruction representation
//!
//! Contains instruction structure and source location tracking.

use core_types::SourceLocation;
use serde::{Deserialize, Serialize};

use crate::opcode::Opcode;

/// A single bytecode instruction with optional source mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The opcode for this instruction
    #[serde(flatten)]
    pub opcode: Opcode,
    /// Optional source location for stack traces, serialized inline as
    /// `loc` / `range` keys beside the operands
    #[serde(flatten)]
    pub loc: Option<SourceLocation>,
}

impl Instruction {
    /// Create a new instruction without source location
    pub fn new(opcode: Opcode) -> Self {
        Self { opcode, loc: None }
    }

    /// Create a new instruction with source location
    pub fn with_location(opcode: Opcode, loc: SourceLocation) -> Self {
        Self {
            opcode,
            loc: Some(loc),
        }
    }
}
