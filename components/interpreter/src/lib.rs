//! Register-based bytecode interpreter for JavaScript
//!
//! This crate provides the execution core of the engine:
//! - A [`Runtime`] owning one realm, its garbage-collected heap and the
//!   interpreter stack
//! - Objects with hidden-class shapes, segmented element storage,
//!   typed arrays over detachable buffers and keyed collections
//! - A dispatch loop with inline caches, exception handlers, generators
//!   and native function calls
//!
//! # Example
//!
//! ```
//! use bytecode_system::{FunctionBuilder, ModuleBuilder, Opcode};
//! use core_types::Value;
//! use interpreter::{Runtime, RuntimeConfig};
//!
//! let mut module = ModuleBuilder::new("answer.js");
//! let mut main = FunctionBuilder::new("main", 0);
//! let r = main.reg();
//! main.emit(Opcode::LoadInt { dst: r, value: 42 });
//! main.emit(Opcode::Return { value: r });
//! module.add_function(main.finish().unwrap());
//!
//! let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
//! let id = rt.load_module(module.finish().unwrap()).unwrap();
//! assert_eq!(rt.run_module(id).unwrap(), Value::number(42.0));
//! ```

#![warn(clippy::all)]

pub mod array;
pub mod buffer;
pub mod call_frame;
pub mod code;
pub mod collections;
mod dispatch;
pub mod environment;
pub mod error;
mod exception;
pub mod function;
pub mod gc_integration;
pub mod generator;
pub mod inline_cache;
pub mod interrupt;
pub mod object;
mod object_ops;
pub mod operations;
pub mod property;
pub mod realm;
pub mod runtime;
pub mod shape;
pub mod typed_array;
mod utf16;

// Re-export main types at crate root
pub use array::{Elements, SegmentedArray};
pub use call_frame::CallFrame;
pub use code::{CodeRef, LoadedModule, ModuleId};
pub use collections::{MapKey, OrderedTable, WeakMembers, WeakTable};
pub use environment::Environment;
pub use error::{EngineError, FatalError, JsResult, Throw};
pub use function::{CallArgs, FunctionKind, NativeFunction};
pub use gc_integration::Cell;
pub use generator::{GeneratorData, GeneratorState, ResumeMode};
pub use inline_cache::InlineCache;
pub use interrupt::{InterruptHandle, InterruptMode};
pub use object::{JsObject, ObjectClass};
pub use operations::{number_pow, BinaryOp, Numeric, PreferredType};
pub use property::{Property, PropertyDescriptor, PropertyFlags, PropertyKey, PropertyValue};
pub use realm::{Intrinsics, SYMBOL_HAS_INSTANCE, SYMBOL_ITERATOR, SYMBOL_TO_PRIMITIVE};
pub use runtime::{PersistentHandle, Runtime, RuntimeConfig};
pub use shape::{ShapeId, ShapeTable};
pub use typed_array::{TypedArrayData, TypedArrayKind};
