//! Lexical environment records.
//!
//! Captured variables live in environment slots rather than registers, so
//! every closure created in a scope shares the same record and observes the
//! others' writes.

use core_types::{HeapRef, Value};

/// A heap-resident scope: `slots` hold the captured bindings, `parent`
/// links to the enclosing scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub parent: Option<HeapRef>,
    pub slots: Vec<Value>,
}

impl Environment {
    /// A scope with `size` bindings, all undefined.
    pub fn new(parent: Option<HeapRef>, size: u32) -> Self {
        Self {
            parent,
            slots: vec![Value::Undefined; size as usize],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
