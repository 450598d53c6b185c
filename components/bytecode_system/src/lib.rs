//! Bytecode system for JavaScript runtime
//!
//! This crate defines the boundary between a compiler front end and the
//! interpreter: the register-based instruction set, compiled function
//! records with exception handler tables, and the module container with its
//! JSON interchange form.
//!
//! # Features
//!
//! - Register-based bytecode architecture
//! - Per-instruction source locations for stack traces
//! - Try-region handler tables
//! - Builders with label patching
//! - JSON serialization and a disassembler
//!
//! # Example
//!
//! ```
//! use bytecode_system::{BytecodeModule, FunctionBuilder, ModuleBuilder, Opcode};
//!
//! let mut module = ModuleBuilder::new("add.js");
//! let mut f = FunctionBuilder::new("add", 2);
//! let sum = f.reg();
//! f.emit(Opcode::Add { dst: sum, lhs: f.param(0), rhs: f.param(1) });
//! f.emit(Opcode::Return { value: sum });
//! module.add_function(f.finish().unwrap());
//!
//! let module = module.finish().unwrap();
//! let json = module.to_json().unwrap();
//! assert_eq!(BytecodeModule::from_json(&json).unwrap(), module);
//! ```

#![warn(clippy::all)]

pub mod builder;
pub mod disasm;
pub mod function;
pub mod instruction;
pub mod module;
pub mod opcode;

// Re-export main types at crate root
pub use builder::{BuildError, FunctionBuilder, Label, ModuleBuilder};
pub use disasm::disassemble;
pub use function::{FunctionFlags, FunctionRecord, HandlerEntry};
pub use instruction::Instruction;
pub use module::{BytecodeModule, Constant, ModuleError};
pub use opcode::{Opcode, RegisterId};
