//! NaN-boxed 64-bit encoding of immediate values.
//!
//! ```text
//! 64 bits: SEEEEEEE EEEEQMMM MMMMMMMM ... MMMMMMMM
//!
//! Doubles:   stored directly; every NaN is rewritten to 0x7FF8_0000_0000_0000
//! Tagged:    top 16 bits in [0xFFF9, 0xFFFC], payload in the low 32 bits
//!   0xFFF9   undefined
//!   0xFFFA   null
//!   0xFFFB   boolean   (payload 0 / 1)
//!   0xFFFC   symbol    (payload = symbol id)
//! ```
//!
//! Tagged words are negative quiet NaNs, so a double that reaches this
//! encoding with one of those bit patterns would be misread as a tag. All
//! doubles therefore pass through [`sanitize_double`] before encoding, and
//! raw words read from untrusted memory go through [`NanBoxed::from_bits_untrusted`].

use crate::value::{SymbolId, Value};

/// Bit pattern of the canonical quiet NaN.
pub const CANONICAL_NAN_BITS: u64 = 0x7FF8_0000_0000_0000;

const TAG_SHIFT: u32 = 48;
const TAG_UNDEFINED: u64 = 0xFFF9;
const TAG_NULL: u64 = 0xFFFA;
const TAG_BOOL: u64 = 0xFFFB;
const TAG_SYMBOL: u64 = 0xFFFC;
const FIRST_TAG: u64 = TAG_UNDEFINED;
const LAST_TAG: u64 = TAG_SYMBOL;
const PAYLOAD_MASK: u64 = 0xFFFF_FFFF;

/// Replace any NaN payload with the canonical NaN.
#[inline]
pub fn sanitize_double(n: f64) -> f64 {
    if n.is_nan() {
        f64::from_bits(CANONICAL_NAN_BITS)
    } else {
        n
    }
}

/// A value in its compact 64-bit form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NanBoxed(u64);

impl NanBoxed {
    /// Encode a double, sanitizing NaN.
    pub fn from_f64(n: f64) -> Self {
        NanBoxed(sanitize_double(n).to_bits())
    }

    /// Reinterpret raw bits that did not come from [`NanBoxed::to_bits`].
    ///
    /// Words in the tag range are only accepted when they are well formed;
    /// anything else that is a NaN collapses to the canonical NaN.
    pub fn from_bits_untrusted(bits: u64) -> Self {
        let candidate = NanBoxed(bits);
        if candidate.tag().is_some() {
            return candidate;
        }
        NanBoxed::from_f64(f64::from_bits(bits))
    }

    /// Reinterpret raw bits that are known to hold an IEEE double, such as
    /// a Float64 element. Tag-range words are NaNs here, never tags.
    pub fn from_double_bits(bits: u64) -> Self {
        NanBoxed::from_f64(f64::from_bits(bits))
    }

    /// Raw bits.
    pub fn to_bits(self) -> u64 {
        self.0
    }

    fn tag(self) -> Option<u64> {
        let tag = self.0 >> TAG_SHIFT;
        if !(FIRST_TAG..=LAST_TAG).contains(&tag) {
            return None;
        }
        let payload = self.0 & ((1u64 << TAG_SHIFT) - 1);
        let well_formed = match tag {
            TAG_UNDEFINED | TAG_NULL => payload == 0,
            TAG_BOOL => payload <= 1,
            _ => payload <= PAYLOAD_MASK,
        };
        well_formed.then_some(tag)
    }

    fn tagged(tag: u64, payload: u64) -> Self {
        NanBoxed((tag << TAG_SHIFT) | (payload & PAYLOAD_MASK))
    }

    /// Encode an immediate value. Values with heap or owned payloads
    /// (strings, bigints, objects) have no compact form and return `None`.
    pub fn encode(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Undefined => Self::tagged(TAG_UNDEFINED, 0),
            Value::Null => Self::tagged(TAG_NULL, 0),
            Value::Boolean(b) => Self::tagged(TAG_BOOL, *b as u64),
            Value::Number(n) => Self::from_f64(*n),
            Value::Symbol(id) => Self::tagged(TAG_SYMBOL, id.0 as u64),
            Value::String(_) | Value::BigInt(_) | Value::Object(_) | Value::Environment(_) => {
                return None
            }
        })
    }

    /// Decode back into a [`Value`].
    pub fn decode(self) -> Value {
        match self.tag() {
            Some(TAG_UNDEFINED) => Value::Undefined,
            Some(TAG_NULL) => Value::Null,
            Some(TAG_BOOL) => Value::Boolean(self.0 & 1 == 1),
            Some(TAG_SYMBOL) => Value::Symbol(SymbolId((self.0 & PAYLOAD_MASK) as u32)),
            _ => Value::Number(sanitize_double(f64::from_bits(self.0))),
        }
    }

    /// True if this word encodes a number.
    pub fn is_number(self) -> bool {
        self.tag().is_none()
    }
}
