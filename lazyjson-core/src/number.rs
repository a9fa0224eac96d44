//! Materialised JSON number values (§4.2): the bucket an integer literal
//! lands in is chosen by the smallest representation that holds it exactly;
//! fractional/exponential forms are always 64-bit floats.

use std::fmt;

/// A materialised JSON number.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberValue {
    Int32(i32),
    Int64(i64),
    /// An integer literal too large for `i64`, kept as its exact source
    /// digits (no further arithmetic is needed beyond display/comparison).
    Big(String),
    Float(f64),
}

impl NumberValue {
    /// Parses the raw token text of a JSON number into the bucket described
    /// by §4.2.
    #[must_use]
    pub fn parse(text: &str) -> NumberValue {
        if text.contains(['.', 'e', 'E']) {
            return NumberValue::Float(text.parse().unwrap_or(f64::NAN));
        }
        if let Ok(i) = text.parse::<i32>() {
            return NumberValue::Int32(i);
        }
        if let Ok(i) = text.parse::<i64>() {
            return NumberValue::Int64(i);
        }
        NumberValue::Big(text.to_string())
    }

    /// Best-effort conversion to `f64`, used for numeric (as opposed to
    /// literal-text) equality in the diff engine's DEFAULT/LENIENT modes.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            NumberValue::Int32(i) => f64::from(*i),
            NumberValue::Int64(i) => *i as f64,
            NumberValue::Big(s) => s.parse().unwrap_or(f64::NAN),
            NumberValue::Float(f) => *f,
        }
    }

    /// True if the exact value has zero fractional part, per the
    /// `isInteger` policy in §4.5 (so `1`, `1.0`, and `1.0000` are all
    /// integers).
    #[must_use]
    pub fn is_integer(&self) -> bool {
        match self {
            NumberValue::Int32(_) | NumberValue::Int64(_) | NumberValue::Big(_) => true,
            NumberValue::Float(f) => f.fract() == 0.0,
        }
    }
}

impl fmt::Display for NumberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberValue::Int32(i) => write!(f, "{i}"),
            NumberValue::Int64(i) => write!(f, "{i}"),
            NumberValue::Big(s) => f.write_str(s),
            NumberValue::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Numeric equality under the DEFAULT/LENIENT diff modes: `1` and `1.0`
/// compare equal.
#[must_use]
pub fn numeric_eq(a: &NumberValue, b: &NumberValue) -> bool {
    match (a, b) {
        (NumberValue::Int32(x), NumberValue::Int32(y)) => x == y,
        (NumberValue::Int64(x), NumberValue::Int64(y)) => x == y,
        (NumberValue::Int32(x), NumberValue::Int64(y))
        | (NumberValue::Int64(y), NumberValue::Int32(x)) => i64::from(*x) == *y,
        (NumberValue::Big(x), NumberValue::Big(y)) => x == y,
        _ => a.as_f64() == b.as_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integers_are_int32() {
        assert_eq!(NumberValue::parse("42"), NumberValue::Int32(42));
        assert_eq!(NumberValue::parse("-7"), NumberValue::Int32(-7));
    }

    #[test]
    fn large_integers_widen() {
        assert_eq!(
            NumberValue::parse("4294967296"),
            NumberValue::Int64(4_294_967_296)
        );
        assert!(matches!(
            NumberValue::parse("123456789012345678901234567890"),
            NumberValue::Big(_)
        ));
    }

    #[test]
    fn fractional_and_exponential_are_float() {
        assert_eq!(NumberValue::parse("1.5"), NumberValue::Float(1.5));
        assert_eq!(NumberValue::parse("1e3"), NumberValue::Float(1000.0));
    }

    #[test]
    fn integer_policy_ignores_trailing_zero_fraction() {
        assert!(NumberValue::parse("1.0").is_integer());
        assert!(NumberValue::parse("1.0000").is_integer());
        assert!(!NumberValue::parse("1.5").is_integer());
    }

    #[test]
    fn numeric_eq_crosses_int_and_float() {
        assert!(numeric_eq(&NumberValue::parse("1"), &NumberValue::parse("1.0")));
    }
}
