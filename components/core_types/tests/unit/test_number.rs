//! Unit tests for numeric conversions

use core_types::number::{
    canonical_array_index, number_to_string, parse_bigint_literal, string_to_number, to_int32,
};

#[test]
fn test_number_to_string_boundaries() {
    assert_eq!(number_to_string(1e20), "100000000000000000000");
    assert_eq!(number_to_string(1e21), "1e+21");
    assert_eq!(number_to_string(1e-6), "0.000001");
    assert_eq!(number_to_string(1e-7), "1e-7");
    assert_eq!(number_to_string(123.456), "123.456");
    assert_eq!(number_to_string(5e-324), "5e-324");
    assert_eq!(number_to_string(f64::MAX), "1.7976931348623157e+308");
}

#[test]
fn test_string_to_number_whitespace_and_signs() {
    assert_eq!(string_to_number("\t+3\r\n"), 3.0);
    assert!(string_to_number("-0").is_sign_negative());
    assert!(string_to_number("1 2").is_nan());
    assert!(string_to_number("0x").is_nan());
}

#[test]
fn test_to_int32_wraps() {
    assert_eq!(to_int32(2147483648.0), -2147483648);
    assert_eq!(to_int32(-4294967297.0), -1);
}

#[test]
fn test_bigint_literals() {
    assert!(parse_bigint_literal("0b2").is_none());
    assert!(parse_bigint_literal("-0x1").is_none());
    assert_eq!(
        parse_bigint_literal("123456789012345678901234567890").map(|b| b.to_string()),
        Some("123456789012345678901234567890".to_string())
    );
}

#[test]
fn test_array_index_strings() {
    assert_eq!(canonical_array_index("0"), Some(0));
    assert_eq!(canonical_array_index("4294967294"), Some(4294967294));
    assert_eq!(canonical_array_index("-1"), None);
    assert_eq!(canonical_array_index("1e3"), None);
}
