//! Typed array element kinds and raw element access.
//!
//! Elements are stored little-endian. Reads and writes here work on a byte
//! slice the caller obtained from a live (non-detached) buffer; checking
//! detachment is the caller's job and must be repeated after anything that
//! can run script code.

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use core_types::nan_box::NanBoxed;
use core_types::number::{to_int32, to_uint16, to_uint32};
use core_types::{HeapRef, Value};

/// Element type of a typed array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedArrayKind {
    pub const ALL: [TypedArrayKind; 11] = [
        TypedArrayKind::Int8,
        TypedArrayKind::Uint8,
        TypedArrayKind::Uint8Clamped,
        TypedArrayKind::Int16,
        TypedArrayKind::Uint16,
        TypedArrayKind::Int32,
        TypedArrayKind::Uint32,
        TypedArrayKind::Float32,
        TypedArrayKind::Float64,
        TypedArrayKind::BigInt64,
        TypedArrayKind::BigUint64,
    ];

    /// Position in [`TypedArrayKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn element_size(self) -> usize {
        match self {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => 1,
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 | TypedArrayKind::Float32 => 4,
            TypedArrayKind::Float64 | TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => 8,
        }
    }

    /// Constructor name, e.g. `"Uint8ClampedArray"`.
    pub fn name(self) -> &'static str {
        match self {
            TypedArrayKind::Int8 => "Int8Array",
            TypedArrayKind::Uint8 => "Uint8Array",
            TypedArrayKind::Uint8Clamped => "Uint8ClampedArray",
            TypedArrayKind::Int16 => "Int16Array",
            TypedArrayKind::Uint16 => "Uint16Array",
            TypedArrayKind::Int32 => "Int32Array",
            TypedArrayKind::Uint32 => "Uint32Array",
            TypedArrayKind::Float32 => "Float32Array",
            TypedArrayKind::Float64 => "Float64Array",
            TypedArrayKind::BigInt64 => "BigInt64Array",
            TypedArrayKind::BigUint64 => "BigUint64Array",
        }
    }

    /// Elements are BigInts rather than Numbers.
    pub fn is_bigint(self) -> bool {
        matches!(self, TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64)
    }

    /// Decode the element starting at `bytes[0]`.
    pub fn read(self, bytes: &[u8]) -> Value {
        fn arr<const N: usize>(b: &[u8]) -> [u8; N] {
            let mut out = [0u8; N];
            out.copy_from_slice(&b[..N]);
            out
        }
        match self {
            TypedArrayKind::Int8 => Value::number(bytes[0] as i8 as f64),
            TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => Value::number(bytes[0] as f64),
            TypedArrayKind::Int16 => Value::number(i16::from_le_bytes(arr(bytes)) as f64),
            TypedArrayKind::Uint16 => Value::number(u16::from_le_bytes(arr(bytes)) as f64),
            TypedArrayKind::Int32 => Value::number(i32::from_le_bytes(arr(bytes)) as f64),
            TypedArrayKind::Uint32 => Value::number(u32::from_le_bytes(arr(bytes)) as f64),
            TypedArrayKind::Float32 => {
                let widened = f32::from_le_bytes(arr(bytes)) as f64;
                NanBoxed::from_double_bits(widened.to_bits()).decode()
            }
            TypedArrayKind::Float64 => {
                NanBoxed::from_double_bits(u64::from_le_bytes(arr(bytes))).decode()
            }
            TypedArrayKind::BigInt64 => {
                Value::BigInt(Rc::new(BigInt::from(i64::from_le_bytes(arr(bytes)))))
            }
            TypedArrayKind::BigUint64 => {
                Value::BigInt(Rc::new(BigInt::from(u64::from_le_bytes(arr(bytes)))))
            }
        }
    }

    /// Encode an already converted numeric value into `bytes[..size]`.
    ///
    /// Number kinds expect a Number, BigInt kinds a BigInt; anything else
    /// stores zero.
    pub fn write(self, bytes: &mut [u8], value: &Value) {
        let n = value.as_number().unwrap_or(0.0);
        match self {
            TypedArrayKind::Int8 => bytes[0] = to_int32(n) as i8 as u8,
            TypedArrayKind::Uint8 => bytes[0] = to_uint32(n) as u8,
            TypedArrayKind::Uint8Clamped => bytes[0] = clamp_u8(n),
            TypedArrayKind::Int16 => bytes[..2].copy_from_slice(&(to_int32(n) as i16).to_le_bytes()),
            TypedArrayKind::Uint16 => bytes[..2].copy_from_slice(&to_uint16(n).to_le_bytes()),
            TypedArrayKind::Int32 => bytes[..4].copy_from_slice(&to_int32(n).to_le_bytes()),
            TypedArrayKind::Uint32 => bytes[..4].copy_from_slice(&to_uint32(n).to_le_bytes()),
            TypedArrayKind::Float32 => bytes[..4].copy_from_slice(&(n as f32).to_le_bytes()),
            TypedArrayKind::Float64 => bytes[..8].copy_from_slice(&n.to_le_bytes()),
            TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => {
                let bits = match value {
                    Value::BigInt(b) => bigint_to_u64_wrapping(b),
                    _ => 0,
                };
                bytes[..8].copy_from_slice(&bits.to_le_bytes());
            }
        }
    }
}

/// `ToUint8Clamp`: round half to even, saturate.
fn clamp_u8(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n >= 255.0 {
        return 255;
    }
    let f = n.floor();
    let diff = n - f;
    let rounded = if diff > 0.5 || (diff == 0.5 && f % 2.0 != 0.0) {
        f + 1.0
    } else {
        f
    };
    rounded as u8
}

/// The low 64 bits of a two's complement BigInt.
pub fn bigint_to_u64_wrapping(b: &BigInt) -> u64 {
    let modulus = BigInt::from(1u8) << 64;
    let mut r: BigInt = b % &modulus;
    if r < BigInt::from(0) {
        r += &modulus;
    }
    r.to_u64().unwrap_or(0)
}

/// A view over an ArrayBuffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedArrayData {
    pub kind: TypedArrayKind,
    pub buffer: HeapRef,
    pub byte_offset: usize,
    /// Element count.
    pub length: usize,
}

impl TypedArrayData {
    pub fn byte_length(&self) -> usize {
        self.length * self.kind.element_size()
    }

    /// Byte range of element `index` within the buffer, if the view covers
    /// it and the buffer (of `buffer_len` bytes) is large enough.
    pub fn element_range(&self, index: usize, buffer_len: usize) -> Option<std::ops::Range<usize>> {
        if index >= self.length {
            return None;
        }
        let size = self.kind.element_size();
        let start = self.byte_offset + index * size;
        let end = start + size;
        (end <= buffer_len).then_some(start..end)
    }
}
