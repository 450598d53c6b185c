//! JavaScript error kinds and the host-facing error description.
//!
//! A [`JsError`] is what an embedder sees when script throws: the error
//! constructor kind, its message and the frames captured at construction.

use std::fmt;

use crate::{SourcePosition, StackFrame};

/// Number of frames kept from each end of an oversized trace.
pub const STACK_TRACE_HALF: usize = 50;

/// The kind of JavaScript error.
///
/// These correspond to JavaScript's built-in error constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Plain `Error`
    Error,
    /// Syntax error in JavaScript code
    SyntaxError,
    /// Type error (e.g., calling a non-function)
    TypeError,
    /// Reference to an undefined variable
    ReferenceError,
    /// Value out of allowed range, including resource exhaustion
    RangeError,
    /// Error in eval() function
    EvalError,
    /// Error in URI handling functions
    URIError,
}

impl ErrorKind {
    /// Every kind, in the order their constructors are installed.
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Error,
        ErrorKind::EvalError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::TypeError,
        ErrorKind::URIError,
    ];

    /// The constructor name (`"TypeError"` etc.).
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::URIError => "URIError",
        }
    }

    /// Inverse of [`ErrorKind::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A JavaScript error with message and stack trace.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError, StackFrame};
///
/// let error = JsError::new(ErrorKind::TypeError, "undefined is not a function")
///     .with_stack(vec![StackFrame::script("main", "app.js", 3, 7)]);
///
/// assert_eq!(
///     error.to_string(),
///     "TypeError: undefined is not a function\n    at main (app.js:3:7)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Stack trace (call stack at the time of the error)
    pub stack: Vec<StackFrame>,
    /// Source position where the error occurred
    pub source_position: Option<SourcePosition>,
}

impl JsError {
    /// Create an error without stack information.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: Vec::new(),
            source_position: None,
        }
    }

    /// Attach captured frames; the innermost frame also becomes the source position.
    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> Self {
        self.source_position = stack.first().and_then(StackFrame::position);
        self.stack = stack;
        self
    }

    /// `Error.prototype.toString` style header: `Name: message`, or just
    /// `Name` for an empty message.
    pub fn header(&self) -> String {
        error_header(self.kind.name(), &self.message)
    }
}

impl fmt::Display for JsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_stack(&self.header(), &self.stack))
    }
}

impl std::error::Error for JsError {}

/// `Name: message` with the separator dropped when either side is empty.
pub fn error_header(name: &str, message: &str) -> String {
    match (name.is_empty(), message.is_empty()) {
        (_, true) => name.to_string(),
        (true, false) => message.to_string(),
        (false, false) => format!("{}: {}", name, message),
    }
}

/// Render a header followed by one `    at` line per frame.
///
/// Traces longer than twice [`STACK_TRACE_HALF`] keep both ends and replace
/// the middle with a `... skipping N frames` line.
pub fn format_stack(header: &str, frames: &[StackFrame]) -> String {
    let mut out = String::from(header);
    let limit = STACK_TRACE_HALF * 2;
    if frames.len() <= limit {
        for frame in frames {
            out.push_str("\n    at ");
            out.push_str(&frame.to_string());
        }
        return out;
    }
    let skipped = frames.len() - limit;
    for frame in &frames[..STACK_TRACE_HALF] {
        out.push_str("\n    at ");
        out.push_str(&frame.to_string());
    }
    out.push_str(&format!("\n    ... skipping {} frames", skipped));
    for frame in &frames[frames.len() - STACK_TRACE_HALF..] {
        out.push_str("\n    at ");
        out.push_str(&frame.to_string());
    }
    out
}
