//! Unit tests for the Value enum

use core_types::nan_box::NanBoxed;
use core_types::{SymbolId, Value, ValueTag};
use num_bigint::BigInt;

#[cfg(test)]
mod value_creation_tests {
    use super::*;

    #[test]
    fn test_value_tags() {
        assert_eq!(Value::Undefined.tag(), ValueTag::Undefined);
        assert_eq!(Value::Null.tag(), ValueTag::Null);
        assert_eq!(Value::from(true).tag(), ValueTag::Boolean);
        assert_eq!(Value::from(3).tag(), ValueTag::Number);
        assert_eq!(Value::from("s").tag(), ValueTag::String);
        assert_eq!(Value::Symbol(SymbolId(0)).tag(), ValueTag::Symbol);
        assert_eq!(Value::from(BigInt::from(1)).tag(), ValueTag::BigInt);
    }

    #[test]
    fn test_value_from_f64_canonicalizes() {
        let v = Value::from(f64::from_bits(0xFFF8_0000_0000_0042));
        assert_eq!(v.as_number().map(f64::to_bits), Some(f64::NAN.to_bits()));
    }
}

#[cfg(test)]
mod value_equality_tests {
    use super::*;

    #[test]
    fn test_object_is_reflexive_for_nan() {
        let x = Value::number(f64::NAN);
        assert!(x.same_value(&x));
    }

    #[test]
    fn test_signed_zero() {
        let neg = Value::number(-0.0);
        let pos = Value::number(0.0);
        assert!(neg.strict_equals(&pos));
        assert!(!neg.same_value(&pos));
        assert_ne!(neg, pos);
    }

    #[test]
    fn test_strings_compare_by_content() {
        assert!(Value::string("ab").strict_equals(&Value::from(String::from("ab"))));
    }

    #[test]
    fn test_bigint_equality_by_value() {
        let a = Value::from(BigInt::from(10));
        let b = Value::from(BigInt::from(10));
        assert!(a.strict_equals(&b));
        assert!(!a.strict_equals(&Value::number(10.0)));
    }
}

#[cfg(test)]
mod value_truthiness_tests {
    use super::*;

    #[test]
    fn test_falsy_values() {
        for v in [
            Value::Undefined,
            Value::Null,
            Value::Boolean(false),
            Value::number(0.0),
            Value::number(-0.0),
            Value::number(f64::NAN),
            Value::string(""),
            Value::from(BigInt::from(0)),
        ] {
            assert!(!v.is_truthy(), "{:?}", v);
        }
    }

    #[test]
    fn test_symbol_is_truthy() {
        assert!(Value::Symbol(SymbolId(7)).is_truthy());
    }
}

#[cfg(test)]
mod nan_box_tests {
    use super::*;

    #[test]
    fn test_number_bits_pass_through() {
        let boxed = NanBoxed::encode(&Value::number(1.25)).unwrap();
        assert!(boxed.is_number());
        assert_eq!(boxed.to_bits(), 1.25f64.to_bits());
    }

    #[test]
    fn test_arbitrary_words_never_produce_heap_values() {
        for bits in [u64::MAX, 0xFFFD_0000_0000_0001, 0xFFFC_0000_0000_0003] {
            let decoded = NanBoxed::from_bits_untrusted(bits).decode();
            assert!(decoded.is_primitive());
        }
    }
}
