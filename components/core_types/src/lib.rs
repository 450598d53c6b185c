//! Core JavaScript value types and error handling.
//!
//! This crate provides the foundational types shared by every engine layer:
//! value representation, numeric conversions, error descriptions and source
//! location tracking.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of JavaScript values
//! - [`nan_box::NanBoxed`] - Compact 64-bit encoding of immediates
//! - [`number`] - `ToNumber` / `Number::toString` and integer conversions
//! - [`JsError`] - JavaScript errors with stack traces
//! - [`ErrorKind`] - Types of JavaScript errors
//! - [`SourceLocation`] / [`StackFrame`] - Debug locations and call frames
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! let num = Value::number(42.0);
//! assert!(num.is_truthy());
//! assert_eq!(num.type_of(), "number");
//!
//! let error = JsError::new(ErrorKind::TypeError, "undefined is not a function");
//! assert_eq!(error.to_string(), "TypeError: undefined is not a function");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
pub mod nan_box;
pub mod number;
#[allow(missing_docs)]
mod source;
mod value;

pub use error::{error_header, format_stack, ErrorKind, JsError, STACK_TRACE_HALF};
pub use source::{LineColumn, LocationSpan, SourceLocation, SourcePosition, StackFrame};
pub use value::{HeapRef, SymbolId, Value, ValueTag, CANONICAL_NAN};
