//! Unit tests for error types

use core_types::{format_stack, ErrorKind, JsError, StackFrame};

#[test]
fn test_display_includes_frames() {
    let error = JsError::new(ErrorKind::RangeError, "Maximum call stack size exceeded")
        .with_stack(vec![
            StackFrame::script("recurse", "deep.js", 2, 10),
            StackFrame::native("apply"),
        ]);
    assert_eq!(
        error.to_string(),
        "RangeError: Maximum call stack size exceeded\n    at recurse (deep.js:2:10)\n    at apply (native)"
    );
    assert_eq!(error.source_position.map(|p| p.line), Some(2));
}

#[test]
fn test_exactly_one_hundred_frames_are_not_elided() {
    let frames = vec![StackFrame::native("f"); 100];
    let text = format_stack("Error", &frames);
    assert!(!text.contains("skipping"));
    assert_eq!(text.lines().count(), 101);
}

#[test]
fn test_error_is_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&JsError::new(ErrorKind::Error, "x"));
}
