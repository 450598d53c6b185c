//! Error plumbing between bytecode, native functions and the host.

use core_types::{HeapRef, JsError, Value};
use thiserror::Error;

/// Conditions that abort the current execution context outright.
///
/// These skip every exception handler and surface at the host boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("malformed bytecode: {0}")]
    MalformedBytecode(String),
    #[error("stale heap handle {0:?}")]
    StaleHandle(HeapRef),
    #[error("out of memory while constructing an error")]
    OutOfMemory,
    #[error("execution terminated by host")]
    Terminated,
    #[error("internal error: {0}")]
    Internal(String),
}

/// Abrupt completion of an operation.
#[derive(Debug, Clone)]
pub enum Throw {
    /// A script value in flight; catchable by handlers.
    Value(Value),
    /// Uncatchable engine fault.
    Fatal(FatalError),
}

impl Throw {
    /// The thrown script value, if this is not a fatal fault.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Throw::Value(v) => Some(v),
            Throw::Fatal(_) => None,
        }
    }
}

impl From<FatalError> for Throw {
    fn from(e: FatalError) -> Self {
        Throw::Fatal(e)
    }
}

/// Result of any operation that can throw.
pub type JsResult<T> = Result<T, Throw>;

/// Failure reported to the embedding host.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A script exception nobody caught.
    #[error("Uncaught {rendered}")]
    Uncaught {
        /// Host-side description with captured stack.
        error: JsError,
        /// The thrown value itself.
        value: Value,
        /// Text printed after `Uncaught`: the stack of error objects, the
        /// string form of anything else.
        rendered: String,
    },
    #[error("fatal: {0}")]
    Fatal(#[from] FatalError),
}

impl EngineError {
    /// The thrown value, for uncaught exceptions.
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            EngineError::Uncaught { value, .. } => Some(value),
            EngineError::Fatal(_) => None,
        }
    }
}

pub(crate) fn malformed<T>(what: impl Into<String>) -> JsResult<T> {
    Err(Throw::Fatal(FatalError::MalformedBytecode(what.into())))
}
