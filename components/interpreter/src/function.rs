//! Function objects and the native calling convention.

use std::fmt;

use core_types::{HeapRef, Value};

use crate::code::CodeRef;
use crate::error::JsResult;
use crate::runtime::Runtime;

/// Host function signature.
///
/// Natives receive the same `this` / argument list as interpreted code and
/// must go through the runtime for every heap access.
pub type NativeFunction = fn(&mut Runtime, &CallArgs) -> JsResult<Value>;

/// Arguments of a native call.
#[derive(Debug, Clone)]
pub struct CallArgs {
    pub this: Value,
    pub args: Vec<Value>,
    /// The constructor `new` was applied to; undefined for plain calls.
    pub new_target: Value,
    /// The function object being invoked.
    pub callee: HeapRef,
    /// Discriminator of natives sharing one body.
    pub magic: u32,
}

impl CallArgs {
    /// Argument `i`, or undefined.
    #[inline]
    pub fn arg(&self, i: usize) -> Value {
        self.args.get(i).cloned().unwrap_or(Value::Undefined)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn is_construct(&self) -> bool {
        !matches!(self.new_target, Value::Undefined)
    }
}

/// Callable object payload.
#[derive(Clone)]
pub enum FunctionKind {
    /// Bytecode closure over an environment.
    Bytecode {
        code: CodeRef,
        env: Option<HeapRef>,
        /// Arrow functions capture `this` at creation.
        lexical_this: Option<Value>,
        constructor: bool,
        generator: bool,
    },
    /// Host function; `magic` distinguishes natives sharing one body.
    Native {
        func: NativeFunction,
        magic: u32,
        constructor: bool,
    },
    /// Result of `Function.prototype.bind`.
    Bound {
        target: HeapRef,
        this: Value,
        args: Vec<Value>,
    },
}

impl FunctionKind {
    pub fn is_constructor(&self) -> bool {
        match self {
            FunctionKind::Bytecode { constructor, .. } | FunctionKind::Native { constructor, .. } => {
                *constructor
            }
            // Bound constructors are resolved through the target at call time.
            FunctionKind::Bound { .. } => true,
        }
    }
}

impl fmt::Debug for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::Bytecode {
                code,
                env,
                lexical_this,
                constructor,
                generator,
            } => f
                .debug_struct("Bytecode")
                .field("code", code)
                .field("env", env)
                .field("lexical_this", lexical_this)
                .field("constructor", constructor)
                .field("generator", generator)
                .finish(),
            FunctionKind::Native {
                magic, constructor, ..
            } => f
                .debug_struct("Native")
                .field("magic", magic)
                .field("constructor", constructor)
                .finish_non_exhaustive(),
            FunctionKind::Bound { target, this, args } => f
                .debug_struct("Bound")
                .field("target", target)
                .field("this", this)
                .field("args", args)
                .finish(),
        }
    }
}
