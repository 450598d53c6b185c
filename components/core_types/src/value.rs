//! JavaScript value representation.
//!
//! This module provides the core `Value` enum that represents all possible
//! JavaScript values. Primitive values are stored inline; heap cells are
//! referenced through a [`HeapRef`] handle owned by the garbage collector.
//! The compact 64-bit encoding used at raw-memory boundaries lives in
//! [`crate::nan_box`].

use num_bigint::BigInt;
use num_traits::Zero;
use std::fmt;
use std::rc::Rc;

use crate::number::number_to_string;

/// Canonical quiet NaN produced by every arithmetic path.
pub const CANONICAL_NAN: f64 = f64::NAN;

/// Handle to a garbage-collected heap cell.
///
/// Handles index an indirection table owned by the heap, so the collector
/// can move cells between spaces without invalidating them. The generation
/// counter detects use of a handle whose slot has been recycled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapRef {
    index: u32,
    generation: u32,
}

impl HeapRef {
    /// Create a handle from its raw parts.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the handle table.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time the handle was issued.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}.{}", self.index, self.generation)
    }
}

/// Identifier of a symbol in the runtime's symbol registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// Type tag of a [`Value`].
///
/// The tag uniquely determines which payload is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Boolean,
    /// IEEE-754 double
    Number,
    /// Immutable string
    String,
    /// Symbol
    Symbol,
    /// Arbitrary precision integer
    BigInt,
    /// Heap object
    Object,
    /// Engine-internal environment record
    Environment,
}

/// Represents any JavaScript value.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let undefined = Value::Undefined;
/// let number = Value::number(42.0);
///
/// assert!(!undefined.is_truthy());
/// assert!(number.is_truthy());
/// assert_eq!(number.type_of(), "number");
/// ```
#[derive(Clone)]
pub enum Value {
    /// JavaScript undefined value
    Undefined,
    /// JavaScript null value
    Null,
    /// JavaScript boolean (true or false)
    Boolean(bool),
    /// IEEE 754 double-precision floating point
    Number(f64),
    /// JavaScript string value
    String(Rc<str>),
    /// JavaScript symbol (compared by identity)
    Symbol(SymbolId),
    /// JavaScript BigInt (arbitrary precision integer)
    BigInt(Rc<BigInt>),
    /// Heap-allocated object
    Object(HeapRef),
    /// Lexical environment record. Only bytecode registers hold these.
    Environment(HeapRef),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Symbol(id) => f.debug_tuple("Symbol").field(&id.0).finish(),
            Value::BigInt(n) => f.debug_tuple("BigInt").field(n.as_ref()).finish(),
            Value::Object(r) => f.debug_tuple("Object").field(r).finish(),
            Value::Environment(r) => f.debug_tuple("Environment").field(r).finish(),
        }
    }
}

/// Structural equality is `SameValue`: `NaN` equals itself and `+0` differs
/// from `-0`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(Rc::new(n))
    }
}

impl Value {
    /// Build a number value, replacing any NaN payload with the canonical NaN.
    pub fn number(n: f64) -> Self {
        if n.is_nan() {
            Value::Number(CANONICAL_NAN)
        } else {
            Value::Number(n)
        }
    }

    /// Build a string value.
    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    /// The type tag of this value.
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Undefined => ValueTag::Undefined,
            Value::Null => ValueTag::Null,
            Value::Boolean(_) => ValueTag::Boolean,
            Value::Number(_) => ValueTag::Number,
            Value::String(_) => ValueTag::String,
            Value::Symbol(_) => ValueTag::Symbol,
            Value::BigInt(_) => ValueTag::BigInt,
            Value::Object(_) => ValueTag::Object,
            Value::Environment(_) => ValueTag::Environment,
        }
    }

    /// Returns whether this value is truthy in JavaScript semantics.
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert!(!Value::Undefined.is_truthy());
    /// assert!(!Value::number(f64::NAN).is_truthy());
    /// assert!(!Value::string("").is_truthy());
    /// assert!(Value::string("0").is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Symbol(_) => true,
            Value::BigInt(n) => !n.is_zero(),
            Value::Object(_) | Value::Environment(_) => true,
        }
    }

    /// Returns the `typeof` result for this value.
    ///
    /// Objects always report `"object"` here; the interpreter refines this to
    /// `"function"` for callable objects since that requires heap access.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::BigInt(_) => "bigint",
            Value::Object(_) | Value::Environment(_) => "object",
        }
    }

    /// True for `undefined` and `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// True for every non-object value.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Object(_) | Value::Environment(_))
    }

    /// The numeric payload if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string payload if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The heap handle if this is an object.
    pub fn as_object(&self) -> Option<HeapRef> {
        match self {
            Value::Object(r) => Some(*r),
            _ => None,
        }
    }

    /// Any heap handle carried by this value, object or environment.
    pub fn heap_ref(&self) -> Option<HeapRef> {
        match self {
            Value::Object(r) | Value::Environment(r) => Some(*r),
            _ => None,
        }
    }

    /// Strict equality (`===`).
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert!(Value::number(-0.0).strict_equals(&Value::number(0.0)));
    /// assert!(!Value::number(f64::NAN).strict_equals(&Value::number(f64::NAN)));
    /// ```
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.same_non_number(other),
        }
    }

    /// `SameValue` (`Object.is`).
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            _ => self.same_non_number(other),
        }
    }

    /// `SameValueZero` (used by `includes` and keyed collections).
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self.same_non_number(other),
        }
    }

    fn same_non_number(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Environment(a), Value::Environment(b)) => a == b,
            _ => false,
        }
    }
}

/// JavaScript `String()` conversion for primitives.
///
/// Objects render as `[object Object]`; the interpreter performs the full
/// `ToPrimitive` conversion before reaching this path.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&number_to_string(*n)),
            Value::String(s) => f.write_str(s),
            Value::Symbol(id) => write!(f, "Symbol({})", id.0),
            Value::BigInt(n) => write!(f, "{}", n),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Environment(_) => write!(f, "[environment]"),
        }
    }
}
