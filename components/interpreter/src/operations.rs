//! Type conversions, equality, relational comparison and arithmetic.

use std::cmp::Ordering;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use core_types::number::{
    compare_bigint_number, number_to_bigint, number_to_string, parse_bigint_literal,
    string_to_number, to_int32, to_integer_or_infinity, to_uint32,
};
use core_types::{HeapRef, Value};

use crate::error::{malformed, JsResult};
use crate::function::FunctionKind;
use crate::object::{JsObject, ObjectClass};
use crate::property::PropertyKey;
use crate::realm::{SYMBOL_HAS_INSTANCE, SYMBOL_TO_PRIMITIVE};
use crate::runtime::Runtime;

/// Conversion hint for [`Runtime::to_primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    Number,
    String,
}

impl PreferredType {
    fn name(self) -> &'static str {
        match self {
            PreferredType::Default => "default",
            PreferredType::Number => "number",
            PreferredType::String => "string",
        }
    }
}

/// Result of `ToNumeric`.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    Number(f64),
    BigInt(Rc<BigInt>),
}

impl From<Numeric> for Value {
    fn from(n: Numeric) -> Value {
        match n {
            Numeric::Number(n) => Value::number(n),
            Numeric::BigInt(b) => Value::BigInt(b),
        }
    }
}

/// Binary operators with numeric semantics (everything but `+`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

/// Largest BigInt a shift or exponentiation may produce.
const MAX_BIGINT_BITS: u64 = 1 << 24;

const MIXED_BIGINT: &str = "Cannot mix BigInt and other types, use explicit conversions";

/// `Number::exponentiate`, which differs from `powf` for unit bases.
pub fn number_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() {
        return f64::NAN;
    }
    if base.abs() == 1.0 && exponent.is_infinite() {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// JS `%`: the result takes the sign of the dividend.
fn number_rem(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() || a.is_infinite() || b == 0.0 {
        return f64::NAN;
    }
    if b.is_infinite() || a == 0.0 {
        return a;
    }
    a % b
}

fn number_op(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => number_rem(a, b),
        BinaryOp::Exp => number_pow(a, b),
        BinaryOp::BitAnd => (to_int32(a) & to_int32(b)) as f64,
        BinaryOp::BitOr => (to_int32(a) | to_int32(b)) as f64,
        BinaryOp::BitXor => (to_int32(a) ^ to_int32(b)) as f64,
        BinaryOp::Shl => to_int32(a).wrapping_shl(to_uint32(b) & 31) as f64,
        BinaryOp::Shr => (to_int32(a) >> (to_uint32(b) & 31)) as f64,
        BinaryOp::UShr => (to_uint32(a) >> (to_uint32(b) & 31)) as f64,
    }
}

/// UTF-16 code unit order, as `<` compares strings.
fn compare_utf16(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

impl Runtime {
    /// `ToPrimitive`: `@@toPrimitive` first, then `valueOf` / `toString` in
    /// hint order.
    pub fn to_primitive(&mut self, value: &Value, hint: PreferredType) -> JsResult<Value> {
        let Value::Object(_) = value else {
            return Ok(value.clone());
        };
        let exotic = self.get(value, &PropertyKey::Symbol(SYMBOL_TO_PRIMITIVE))?;
        if !exotic.is_nullish() {
            if !self.is_callable(&exotic) {
                return self.throw_type_error("Symbol.toPrimitive is not a function");
            }
            let result = self.call(&exotic, value.clone(), vec![Value::string(hint.name())])?;
            if result.is_primitive() {
                return Ok(result);
            }
            return self.throw_type_error("Cannot convert object to primitive value");
        }
        let order = match hint {
            PreferredType::String => ["toString", "valueOf"],
            _ => ["valueOf", "toString"],
        };
        for name in order {
            let method = self.get_by_name(value, name)?;
            if self.is_callable(&method) {
                let result = self.call(&method, value.clone(), Vec::new())?;
                if result.is_primitive() {
                    return Ok(result);
                }
            }
        }
        self.throw_type_error("Cannot convert object to primitive value")
    }

    pub fn to_number(&mut self, value: &Value) -> JsResult<f64> {
        match value {
            Value::Undefined => Ok(f64::NAN),
            Value::Null => Ok(0.0),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Ok(*n),
            Value::String(s) => Ok(string_to_number(s)),
            Value::Symbol(_) => self.throw_type_error("Cannot convert a Symbol value to a number"),
            Value::BigInt(_) => self.throw_type_error("Cannot convert a BigInt value to a number"),
            Value::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::Number)?;
                self.to_number(&prim)
            }
            Value::Environment(_) => malformed("numeric conversion of an environment"),
        }
    }

    pub fn to_numeric(&mut self, value: &Value) -> JsResult<Numeric> {
        let prim = self.to_primitive(value, PreferredType::Number)?;
        match prim {
            Value::BigInt(b) => Ok(Numeric::BigInt(b)),
            other => Ok(Numeric::Number(self.to_number(&other)?)),
        }
    }

    /// `ToIntegerOrInfinity`.
    pub fn to_integer(&mut self, value: &Value) -> JsResult<f64> {
        Ok(to_integer_or_infinity(self.to_number(value)?))
    }

    pub fn to_int32(&mut self, value: &Value) -> JsResult<i32> {
        Ok(to_int32(self.to_number(value)?))
    }

    pub fn to_uint32(&mut self, value: &Value) -> JsResult<u32> {
        Ok(to_uint32(self.to_number(value)?))
    }

    /// `ToBigInt`.
    pub fn to_bigint(&mut self, value: &Value) -> JsResult<Rc<BigInt>> {
        let prim = self.to_primitive(value, PreferredType::Number)?;
        match prim {
            Value::BigInt(b) => Ok(b),
            Value::Boolean(b) => Ok(Rc::new(if b { BigInt::one() } else { BigInt::zero() })),
            Value::String(s) => match parse_bigint_literal(&s) {
                Some(b) => Ok(Rc::new(b)),
                None => {
                    let message = format!("Cannot convert {} to a BigInt", s);
                    self.throw_error(core_types::ErrorKind::SyntaxError, &message)
                }
            },
            Value::Symbol(_) => self.throw_type_error("Cannot convert a Symbol value to a BigInt"),
            other => {
                let message = format!("Cannot convert {} to a BigInt", other);
                self.throw_type_error(&message)
            }
        }
    }

    pub fn to_string(&mut self, value: &Value) -> JsResult<Rc<str>> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(Rc::from(number_to_string(*n))),
            Value::Symbol(_) => self.throw_type_error("Cannot convert a Symbol value to a string"),
            Value::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::String)?;
                self.to_string(&prim)
            }
            Value::Environment(_) => malformed("string conversion of an environment"),
            other => Ok(Rc::from(other.to_string())),
        }
    }

    pub fn to_property_key(&mut self, value: &Value) -> JsResult<PropertyKey> {
        match value {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < u32::MAX as f64 => {
                Ok(PropertyKey::Index(*n as u32))
            }
            Value::String(s) => Ok(PropertyKey::from_rc(s.clone())),
            Value::Symbol(id) => Ok(PropertyKey::Symbol(*id)),
            _ => {
                let prim = self.to_primitive(value, PreferredType::String)?;
                if let Value::Symbol(id) = prim {
                    return Ok(PropertyKey::Symbol(id));
                }
                let s = self.to_string(&prim)?;
                Ok(PropertyKey::from_rc(s))
            }
        }
    }

    /// `ToObject`: primitives are wrapped, nullish values throw.
    pub fn to_object(&mut self, value: &Value) -> JsResult<HeapRef> {
        let i = &self.intrinsics;
        let proto = match value {
            Value::Object(r) => return Ok(*r),
            Value::String(_) => i.string_prototype,
            Value::Number(_) => i.number_prototype,
            Value::Boolean(_) => i.boolean_prototype,
            Value::Symbol(_) => i.symbol_prototype,
            Value::BigInt(_) => i.bigint_prototype,
            Value::Undefined | Value::Null => {
                return self.throw_type_error("Cannot convert undefined or null to object");
            }
            Value::Environment(_) => return malformed("object conversion of an environment"),
        };
        self.alloc_object(JsObject::new(
            Some(proto),
            ObjectClass::Primitive(value.clone()),
        ))
    }

    /// `typeof`.
    pub fn type_of(&self, value: &Value) -> &'static str {
        match value {
            Value::Object(_) if self.is_callable(value) => "function",
            other => other.type_of(),
        }
    }

    /// `===`.
    pub fn strict_equals(&self, a: &Value, b: &Value) -> bool {
        a.strict_equals(b)
    }

    /// `==`.
    pub fn abstract_equals(&mut self, a: &Value, b: &Value) -> JsResult<bool> {
        let mut a = a.clone();
        let mut b = b.clone();
        loop {
            match (&a, &b) {
                (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => return Ok(true),
                (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => {
                    return Ok(false)
                }
                (Value::Number(x), Value::Number(y)) => return Ok(x == y),
                (Value::String(x), Value::String(y)) => return Ok(x == y),
                (Value::Boolean(x), Value::Boolean(y)) => return Ok(x == y),
                (Value::Symbol(x), Value::Symbol(y)) => return Ok(x == y),
                (Value::BigInt(x), Value::BigInt(y)) => return Ok(x == y),
                (Value::Object(x), Value::Object(y)) => return Ok(x == y),
                (Value::Number(x), Value::String(s)) => return Ok(*x == string_to_number(s)),
                (Value::String(s), Value::Number(y)) => return Ok(string_to_number(s) == *y),
                (Value::BigInt(x), Value::String(s)) | (Value::String(s), Value::BigInt(x)) => {
                    return Ok(parse_bigint_literal(s).map_or(false, |y| **x == y));
                }
                (Value::BigInt(x), Value::Number(y)) | (Value::Number(y), Value::BigInt(x)) => {
                    return Ok(compare_bigint_number(x, *y) == Some(Ordering::Equal));
                }
                (Value::Boolean(x), _) => a = Value::number(if *x { 1.0 } else { 0.0 }),
                (_, Value::Boolean(y)) => b = Value::number(if *y { 1.0 } else { 0.0 }),
                (Value::Object(_), Value::Symbol(_) | Value::String(_) | Value::Number(_) | Value::BigInt(_)) => {
                    a = self.to_primitive(&a, PreferredType::Default)?;
                }
                (Value::Symbol(_) | Value::String(_) | Value::Number(_) | Value::BigInt(_), Value::Object(_)) => {
                    b = self.to_primitive(&b, PreferredType::Default)?;
                }
                _ => return Ok(false),
            }
        }
    }

    /// Abstract relational comparison `a < b`; `None` means undefined
    /// (a NaN was involved).
    pub fn less_than(&mut self, a: &Value, b: &Value, left_first: bool) -> JsResult<Option<bool>> {
        let (pa, pb) = if left_first {
            let pa = self.to_primitive(a, PreferredType::Number)?;
            let pb = self.to_primitive(b, PreferredType::Number)?;
            (pa, pb)
        } else {
            let pb = self.to_primitive(b, PreferredType::Number)?;
            let pa = self.to_primitive(a, PreferredType::Number)?;
            (pa, pb)
        };
        match (&pa, &pb) {
            (Value::String(x), Value::String(y)) => {
                return Ok(Some(compare_utf16(x, y) == Ordering::Less));
            }
            (Value::BigInt(x), Value::String(y)) => {
                return Ok(parse_bigint_literal(y).map(|y| **x < y));
            }
            (Value::String(x), Value::BigInt(y)) => {
                return Ok(parse_bigint_literal(x).map(|x| x < **y));
            }
            _ => {}
        }
        let na = self.to_numeric(&pa)?;
        let nb = self.to_numeric(&pb)?;
        Ok(match (na, nb) {
            (Numeric::Number(x), Numeric::Number(y)) => {
                if x.is_nan() || y.is_nan() {
                    None
                } else {
                    Some(x < y)
                }
            }
            (Numeric::BigInt(x), Numeric::BigInt(y)) => Some(x < y),
            (Numeric::BigInt(x), Numeric::Number(y)) => {
                compare_bigint_number(&x, y).map(|o| o == Ordering::Less)
            }
            (Numeric::Number(x), Numeric::BigInt(y)) => {
                compare_bigint_number(&y, x).map(|o| o == Ordering::Greater)
            }
        })
    }

    /// `+`: string concatenation when either side is a string after
    /// `ToPrimitive`, numeric addition otherwise.
    pub fn add(&mut self, a: &Value, b: &Value) -> JsResult<Value> {
        if let (Value::Number(x), Value::Number(y)) = (a, b) {
            return Ok(Value::number(x + y));
        }
        let pa = self.to_primitive(a, PreferredType::Default)?;
        let pb = self.to_primitive(b, PreferredType::Default)?;
        if matches!(pa, Value::String(_)) || matches!(pb, Value::String(_)) {
            let sa = self.to_string(&pa)?;
            let sb = self.to_string(&pb)?;
            let mut out = String::with_capacity(sa.len() + sb.len());
            out.push_str(&sa);
            out.push_str(&sb);
            return Ok(Value::String(Rc::from(out)));
        }
        match (self.to_numeric(&pa)?, self.to_numeric(&pb)?) {
            (Numeric::Number(x), Numeric::Number(y)) => Ok(Value::number(x + y)),
            (Numeric::BigInt(x), Numeric::BigInt(y)) => Ok(Value::BigInt(Rc::new(&*x + &*y))),
            _ => self.throw_type_error(MIXED_BIGINT),
        }
    }

    /// Every binary arithmetic and bitwise operator except `+`.
    pub fn binary_op(&mut self, op: BinaryOp, a: &Value, b: &Value) -> JsResult<Value> {
        if let (Value::Number(x), Value::Number(y)) = (a, b) {
            return Ok(Value::number(number_op(op, *x, *y)));
        }
        let na = self.to_numeric(a)?;
        let nb = self.to_numeric(b)?;
        match (na, nb) {
            (Numeric::Number(x), Numeric::Number(y)) => Ok(Value::number(number_op(op, x, y))),
            (Numeric::BigInt(x), Numeric::BigInt(y)) => {
                Ok(Value::BigInt(Rc::new(self.bigint_op(op, &x, &y)?)))
            }
            _ => self.throw_type_error(MIXED_BIGINT),
        }
    }

    fn bigint_op(&mut self, op: BinaryOp, x: &BigInt, y: &BigInt) -> JsResult<BigInt> {
        Ok(match op {
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div | BinaryOp::Mod if y.is_zero() => {
                return self.throw_range_error("Division by zero");
            }
            // Truncating division and remainder, like the Number forms.
            BinaryOp::Div => x / y,
            BinaryOp::Mod => x % y,
            BinaryOp::Exp => {
                if y.is_negative() {
                    return self.throw_range_error("Exponent must be non-negative");
                }
                match y.to_u32() {
                    Some(e) if x.bits().saturating_mul(e as u64) > MAX_BIGINT_BITS => {
                        return self.throw_range_error("Maximum BigInt size exceeded");
                    }
                    Some(e) => x.pow(e),
                    None if x.is_zero() || x.is_one() => x.clone(),
                    None if *x == -BigInt::one() => {
                        if (y % 2u8).is_zero() {
                            BigInt::one()
                        } else {
                            x.clone()
                        }
                    }
                    None => return self.throw_range_error("Maximum BigInt size exceeded"),
                }
            }
            BinaryOp::BitAnd => x & y,
            BinaryOp::BitOr => x | y,
            BinaryOp::BitXor => x ^ y,
            BinaryOp::Shl | BinaryOp::Shr => {
                let left = if op == BinaryOp::Shl { y.clone() } else { -y };
                match left.to_i64() {
                    Some(n) if n >= 0 => match usize::try_from(n) {
                        Ok(n) if (n as u64).saturating_add(x.bits()) <= MAX_BIGINT_BITS => x << n,
                        _ => return self.throw_range_error("Maximum BigInt size exceeded"),
                    },
                    // Arithmetic right shift rounds toward negative infinity.
                    Some(n) => match usize::try_from(n.unsigned_abs()) {
                        Ok(n) => x >> n,
                        Err(_) => shift_out(x),
                    },
                    None if left.is_negative() => shift_out(x),
                    None => return self.throw_range_error("Maximum BigInt size exceeded"),
                }
            }
            BinaryOp::UShr => {
                return self.throw_type_error("BigInts have no unsigned right shift, use >> instead");
            }
        })
    }

    /// Unary `-`.
    pub fn negate(&mut self, value: &Value) -> JsResult<Value> {
        Ok(match self.to_numeric(value)? {
            Numeric::Number(n) => Value::number(-n),
            Numeric::BigInt(b) => Value::BigInt(Rc::new(-&*b)),
        })
    }

    /// Unary `~`.
    pub fn bit_not(&mut self, value: &Value) -> JsResult<Value> {
        Ok(match self.to_numeric(value)? {
            Numeric::Number(n) => Value::number(!to_int32(n) as f64),
            Numeric::BigInt(b) => Value::BigInt(Rc::new(-&*b - 1)),
        })
    }

    /// `x + 1` / `x - 1` on a numeric, for `++` and `--`.
    pub fn increment(&mut self, value: &Value, delta: i8) -> JsResult<Value> {
        Ok(match self.to_numeric(value)? {
            Numeric::Number(n) => Value::number(n + delta as f64),
            Numeric::BigInt(b) => Value::BigInt(Rc::new(&*b + delta)),
        })
    }

    /// `value instanceof target`.
    pub fn instance_of(&mut self, value: &Value, target: &Value) -> JsResult<bool> {
        if !matches!(target, Value::Object(_)) {
            return self.throw_type_error("Right-hand side of 'instanceof' is not an object");
        }
        let handler = self.get(target, &PropertyKey::Symbol(SYMBOL_HAS_INSTANCE))?;
        if !handler.is_nullish() {
            let result = self.call(&handler, target.clone(), vec![value.clone()])?;
            return Ok(result.is_truthy());
        }
        if !self.is_callable(target) {
            return self.throw_type_error("Right-hand side of 'instanceof' is not callable");
        }
        self.ordinary_has_instance(target, value)
    }

    /// OrdinaryHasInstance.
    pub fn ordinary_has_instance(&mut self, ctor: &Value, value: &Value) -> JsResult<bool> {
        let Value::Object(c) = ctor else {
            return Ok(false);
        };
        if !self.is_callable(ctor) {
            return Ok(false);
        }
        if let ObjectClass::Function(FunctionKind::Bound { target, .. }) = &self.object(*c)?.class {
            let target = Value::Object(*target);
            return self.instance_of(value, &target);
        }
        let Value::Object(mut o) = value.clone() else {
            return Ok(false);
        };
        let proto = self.get_by_name(ctor, "prototype")?;
        let Value::Object(proto) = proto else {
            return self.throw_type_error("Function has non-object prototype in instanceof check");
        };
        let mut depth = 0;
        loop {
            match self.object(o)?.prototype {
                None => return Ok(false),
                Some(p) if p == proto => return Ok(true),
                Some(p) => o = p,
            }
            depth += 1;
            if depth > self.config.max_prototype_chain {
                return self.throw_range_error("Maximum prototype chain length exceeded");
            }
        }
    }

    /// `key in target`.
    pub fn in_operator(&mut self, key: &Value, target: &Value) -> JsResult<bool> {
        let Value::Object(r) = target else {
            let message = format!(
                "Cannot use 'in' operator to search for '{}' in {}",
                key, target
            );
            return self.throw_type_error(&message);
        };
        let key = self.to_property_key(key)?;
        self.has_property(*r, &key)
    }

    /// `BigInt(n)` for a Number: integral values only.
    pub fn number_to_bigint(&mut self, n: f64) -> JsResult<Rc<BigInt>> {
        match number_to_bigint(n) {
            Some(b) => Ok(Rc::new(b)),
            None => {
                let message = format!(
                    "The number {} cannot be converted to a BigInt because it is not an integer",
                    number_to_string(n)
                );
                self.throw_range_error(&message)
            }
        }
    }
}

/// `x >> n` for shifts too large to express: everything shifted out.
fn shift_out(x: &BigInt) -> BigInt {
    if x.is_negative() {
        -BigInt::one()
    } else {
        BigInt::zero()
    }
}
