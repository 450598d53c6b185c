//! Numeric conversions shared by the whole engine.
//!
//! `Number::prototype::toString` formatting follows the ECMAScript shortest
//! round-trip rules; the shortest digit string comes from `ryu`.

use num_bigint::{BigInt, BigUint};
use num_traits::{FromPrimitive, Num, ToPrimitive, Zero};
use std::cmp::Ordering;

/// ECMAScript `Number::toString(x)` in radix 10.
///
/// ```
/// use core_types::number::number_to_string;
///
/// assert_eq!(number_to_string(-0.0), "0");
/// assert_eq!(number_to_string(1e21), "1e+21");
/// assert_eq!(number_to_string(0.000001), "0.000001");
/// assert_eq!(number_to_string(1.5e-7), "1.5e-7");
/// ```
pub fn number_to_string(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if v < 0.0 {
        return format!("-{}", number_to_string(-v));
    }

    let (digits, n) = shortest_digits(v);
    let k = digits.len() as i32;
    let mut out = String::with_capacity(k as usize + 8);

    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        out.push_str(&digits[..n as usize]);
        out.push('.');
        out.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-n) as usize));
        out.push_str(&digits);
    } else {
        let e = n - 1;
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if e >= 0 { '+' } else { '-' });
        out.push_str(&e.abs().to_string());
    }
    out
}

/// Decompose a finite positive double into its shortest decimal digits `s`
/// and exponent `n` such that the value is `0.s * 10^n`.
fn shortest_digits(v: f64) -> (String, i32) {
    let mut buffer = ryu::Buffer::new();
    let repr = buffer.format_finite(v);

    let (mantissa, exp) = match repr.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (repr, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mut digits: String = int_part.chars().chain(frac_part.chars()).collect();
    let mut point = int_part.len() as i32 + exp;

    let leading = digits.chars().take_while(|c| *c == '0').count();
    digits.drain(..leading);
    point -= leading as i32;

    let trimmed_len = digits.trim_end_matches('0').len();
    digits.truncate(trimmed_len);

    if digits.is_empty() {
        return ("0".to_string(), 1);
    }
    (digits, point)
}

/// JavaScript `StrWhiteSpaceChar` (whitespace plus line terminators).
pub fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'
            | '\u{000A}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{000D}'
            | '\u{0020}'
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

fn radix_prefix(s: &str) -> Option<(u32, &str)> {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return None;
    }
    match bytes[1] {
        b'x' | b'X' => Some((16, &s[2..])),
        b'o' | b'O' => Some((8, &s[2..])),
        b'b' | b'B' => Some((2, &s[2..])),
        _ => None,
    }
}

/// ECMAScript `StringToNumber`.
///
/// ```
/// use core_types::number::string_to_number;
///
/// assert_eq!(string_to_number("  42  "), 42.0);
/// assert_eq!(string_to_number(""), 0.0);
/// assert_eq!(string_to_number("0x1F"), 31.0);
/// assert!(string_to_number("12px").is_nan());
/// assert!(string_to_number("inf").is_nan());
/// ```
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim_matches(is_js_whitespace);
    if t.is_empty() {
        return 0.0;
    }

    if let Some((radix, digits)) = radix_prefix(t) {
        if digits.is_empty() {
            return f64::NAN;
        }
        // Exact integer first, then a single rounding to double.
        return match BigUint::from_str_radix(digits, radix) {
            Ok(value) if digits.bytes().all(|b| b.is_ascii_alphanumeric()) => {
                value.to_f64().unwrap_or(f64::INFINITY)
            }
            _ => f64::NAN,
        };
    }

    let (negative, unsigned) = match t.as_bytes()[0] {
        b'+' => (false, &t[1..]),
        b'-' => (true, &t[1..]),
        _ => (false, t),
    };

    let magnitude = if unsigned == "Infinity" {
        f64::INFINITY
    } else {
        match parse_decimal_literal(unsigned) {
            Some(v) => v,
            None => return f64::NAN,
        }
    };

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Parse `StrUnsignedDecimalLiteral` without the `Infinity` case.
fn parse_decimal_literal(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }

    let mut normalized = String::with_capacity(s.len() + 2);
    if int_digits == 0 {
        normalized.push('0');
    }
    normalized.push_str(s);
    let normalized = normalized.replacen(".e", ".0e", 1).replacen(".E", ".0E", 1);
    let normalized = if normalized.ends_with('.') {
        format!("{}0", normalized)
    } else {
        normalized
    };
    normalized.parse::<f64>().ok()
}

/// ECMAScript `ToIntegerOrInfinity` on an already-converted number.
pub fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        // `+ 0.0` folds -0 into +0
        n.trunc() + 0.0
    }
}

/// ECMAScript `ToUint32`.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// ECMAScript `ToInt32`.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ECMAScript `ToUint16` (used by `String.fromCharCode`).
pub fn to_uint16(n: f64) -> u16 {
    to_uint32(n) as u16
}

/// ECMAScript `StringToBigInt`. Returns `None` for syntax errors.
///
/// ```
/// use core_types::number::parse_bigint_literal;
/// use num_bigint::BigInt;
///
/// assert_eq!(parse_bigint_literal(" -12 "), Some(BigInt::from(-12)));
/// assert_eq!(parse_bigint_literal("0x10"), Some(BigInt::from(16)));
/// assert_eq!(parse_bigint_literal(""), Some(BigInt::from(0)));
/// assert_eq!(parse_bigint_literal("1.5"), None);
/// ```
pub fn parse_bigint_literal(s: &str) -> Option<BigInt> {
    let t = s.trim_matches(is_js_whitespace);
    if t.is_empty() {
        return Some(BigInt::zero());
    }
    if let Some((radix, digits)) = radix_prefix(t) {
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return BigInt::from_str_radix(digits, radix).ok();
    }
    let (negative, digits) = match t.as_bytes()[0] {
        b'+' => (false, &t[1..]),
        b'-' => (true, &t[1..]),
        _ => (false, t),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = BigInt::from_str_radix(digits, 10).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Exact comparison of a BigInt with a Number, without rounding either side.
///
/// Returns `None` when `n` is NaN.
pub fn compare_bigint_number(b: &BigInt, n: f64) -> Option<Ordering> {
    if n.is_nan() {
        return None;
    }
    if n == f64::INFINITY {
        return Some(Ordering::Less);
    }
    if n == f64::NEG_INFINITY {
        return Some(Ordering::Greater);
    }
    let floor = n.floor();
    let floor_big = BigInt::from_f64(floor)?;
    if floor == n {
        return Some(b.cmp(&floor_big));
    }
    // n lies strictly between floor and floor + 1
    if *b <= floor_big {
        Some(Ordering::Less)
    } else {
        Some(Ordering::Greater)
    }
}

/// Convert an integral double to a BigInt (`NumberToBigInt`).
pub fn number_to_bigint(n: f64) -> Option<BigInt> {
    if !n.is_finite() || n.trunc() != n {
        return None;
    }
    BigInt::from_f64(n)
}

/// If `s` is a canonical array index ("0" ..= "4294967294"), return it.
///
/// ```
/// use core_types::number::canonical_array_index;
///
/// assert_eq!(canonical_array_index("10"), Some(10));
/// assert_eq!(canonical_array_index("010"), None);
/// assert_eq!(canonical_array_index("4294967295"), None);
/// ```
pub fn canonical_array_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    if bytes[0] == b'0' && bytes.len() > 1 {
        return None;
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value: u64 = s.parse().ok()?;
    if value < u32::MAX as u64 {
        Some(value as u32)
    } else {
        None
    }
}
