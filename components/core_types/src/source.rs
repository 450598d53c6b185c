//! Source positions, debug locations and stack frames.
//!
//! [`SourceLocation`] is the serialized debug-location form shared with
//! external tooling:
//!
//! ```json
//! { "loc": { "start": { "line": 1, "column": 4 },
//!            "end":   { "line": 1, "column": 9 } },
//!   "range": [4, 9] }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a position in source code.
///
/// Lines and columns are 1-based; `offset` is a 0-based byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
    /// Byte offset from the start of the source file
    pub offset: usize,
}

/// A `{line, column}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineColumn {
    pub line: u32,
    pub column: u32,
}

/// Start/end pair serialized as `loc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSpan {
    pub start: LineColumn,
    pub end: LineColumn,
}

/// Debug location of an instruction or syntax node.
///
/// # Examples
///
/// ```
/// use core_types::SourceLocation;
///
/// let loc = SourceLocation::new((2, 5), (2, 11), 17..23);
/// let json = serde_json::to_value(&loc).unwrap();
/// assert_eq!(json["loc"]["start"]["line"], 2);
/// assert_eq!(json["range"][1], 23);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub loc: LocationSpan,
    pub range: [u32; 2],
}

impl SourceLocation {
    /// Build from `(line, column)` pairs and a byte range.
    pub fn new(start: (u32, u32), end: (u32, u32), range: std::ops::Range<u32>) -> Self {
        Self {
            loc: LocationSpan {
                start: LineColumn {
                    line: start.0,
                    column: start.1,
                },
                end: LineColumn {
                    line: end.0,
                    column: end.1,
                },
            },
            range: [range.start, range.end],
        }
    }

    /// Single-point location at `line:column`.
    pub fn at(line: u32, column: u32) -> Self {
        Self::new((line, column), (line, column), 0..0)
    }

    /// The start as a [`SourcePosition`].
    pub fn start_position(&self) -> SourcePosition {
        SourcePosition {
            line: self.loc.start.line,
            column: self.loc.start.column,
            offset: self.range[0] as usize,
        }
    }
}

/// Represents a single frame in a JavaScript call stack.
///
/// # Examples
///
/// ```
/// use core_types::StackFrame;
///
/// let frame = StackFrame::script("myFunction", "file:///main.js", 25, 10);
/// assert_eq!(frame.to_string(), "myFunction (file:///main.js:25:10)");
///
/// let native = StackFrame::native("push");
/// assert_eq!(native.to_string(), "push (native)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Name of the function, or None for anonymous functions
    pub function_name: Option<String>,
    /// URL or file path of the source, or None if not available
    pub source_url: Option<String>,
    /// Line number where the call occurred
    pub line: u32,
    /// Column number where the call occurred
    pub column: u32,
    /// Frame belongs to a host function
    #[serde(default)]
    pub is_native: bool,
}

impl StackFrame {
    /// Frame for interpreted code.
    pub fn script(name: &str, url: &str, line: u32, column: u32) -> Self {
        Self {
            function_name: (!name.is_empty()).then(|| name.to_string()),
            source_url: Some(url.to_string()),
            line,
            column,
            is_native: false,
        }
    }

    /// Frame for a native function.
    pub fn native(name: &str) -> Self {
        Self {
            function_name: (!name.is_empty()).then(|| name.to_string()),
            source_url: None,
            line: 0,
            column: 0,
            is_native: true,
        }
    }

    /// Position of this frame when it has one.
    pub fn position(&self) -> Option<SourcePosition> {
        (!self.is_native && self.line > 0).then_some(SourcePosition {
            line: self.line,
            column: self.column,
            offset: 0,
        })
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.function_name.as_deref().unwrap_or("anonymous");
        if self.is_native {
            return write!(f, "{} (native)", name);
        }
        let url = self.source_url.as_deref().unwrap_or("<unknown>");
        if self.line == 0 {
            write!(f, "{} ({})", name, url)
        } else {
            write!(f, "{} ({}:{}:{})", name, url, self.line, self.column)
        }
    }
}
