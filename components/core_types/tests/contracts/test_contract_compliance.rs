//! Contract compliance tests for core_types
//!
//! These tests pin the public surface the other engine crates rely on.

use core_types::{
    ErrorKind, HeapRef, JsError, LineColumn, SourceLocation, SourcePosition, StackFrame, Value,
};

#[cfg(test)]
mod value_contract_tests {
    use super::*;

    /// Contract: heap values carry a handle with index and generation
    #[test]
    fn test_heap_ref_parts() {
        let r = HeapRef::new(12, 3);
        assert_eq!((r.index(), r.generation()), (12, 3));
        assert_eq!(format!("{:?}", r), "@12.3");
        assert_eq!(Value::Object(r).as_object(), Some(r));
        assert_eq!(Value::Environment(r).as_object(), None);
        assert_eq!(Value::Environment(r).heap_ref(), Some(r));
    }

    /// Contract: typeof on primitives needs no heap access
    #[test]
    fn test_type_of_primitives() {
        assert_eq!(Value::from(false).type_of(), "boolean");
        assert_eq!(Value::from("").type_of(), "string");
        assert_eq!(Value::number(1.0).type_of(), "number");
    }

    /// Contract: Display is String() for primitives
    #[test]
    fn test_display_numbers() {
        assert_eq!(Value::number(-0.0).to_string(), "0");
        assert_eq!(Value::number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::number(55.0).to_string(), "55");
    }
}

#[cfg(test)]
mod error_contract_tests {
    use super::*;

    /// Contract: JsError exposes kind, message, stack and position fields
    #[test]
    fn test_js_error_fields() {
        let error = JsError {
            kind: ErrorKind::SyntaxError,
            message: "bad".to_string(),
            stack: vec![],
            source_position: Some(SourcePosition {
                line: 1,
                column: 1,
                offset: 0,
            }),
        };
        assert_eq!(error.header(), "SyntaxError: bad");
    }

    /// Contract: StackFrame fields are public
    #[test]
    fn test_stack_frame_fields() {
        let frame = StackFrame {
            function_name: Some("test".to_string()),
            source_url: None,
            line: 1,
            column: 1,
            is_native: false,
        };
        assert_eq!(frame.function_name.as_deref(), Some("test"));
    }

    /// Contract: locations are built from line/column pairs
    #[test]
    fn test_source_location_fields() {
        let loc = SourceLocation::at(4, 2);
        assert_eq!(loc.loc.start, LineColumn { line: 4, column: 2 });
    }
}
