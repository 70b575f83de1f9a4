//! Value type for row fields.
//!
//! This module defines the `Value` enum which represents any value that can
//! be stored in a row field, together with the coercing comparison rules
//! used by the in-memory predicate evaluator.

use alloc::string::String;
use core::cmp::Ordering;
use core::fmt;

/// A value stored in a row field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value. Persisted as an integer by the row store; comparisons
    /// coerce it to 1/0 accordingly.
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    Text(String),
}

impl Value {
    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a Bool, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i64 value if this is an Int, None otherwise.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the f64 value if this is a Float, None otherwise.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is Text, None otherwise.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Booleans viewed as the integer the row store persists them as.
    fn coerce_int(&self) -> Option<i64> {
        match self {
            Value::Bool(v) => Some(*v as i64),
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn coerce_float(&self) -> Option<f64> {
        match self {
            Value::Bool(v) => Some(*v as i64 as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Coercing comparison.
    ///
    /// Booleans compare as integers 1/0, integers and floats compare
    /// numerically, strings lexically. Null equals only Null. Values of
    /// incompatible kinds are unordered (None).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => {
                if let (Some(a), Some(b)) = (self.coerce_int(), other.coerce_int()) {
                    return Some(a.cmp(&b));
                }
                match (self.coerce_float(), other.coerce_float()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => None,
                }
            }
        }
    }

    /// Coercing equality: `Bool(true)` equals `Int(1)`.
    #[inline]
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Value {
    /// Renders the bare value, without SQL quoting. Used when a non-text
    /// value is matched against a LIKE pattern.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_compare_ints() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(Value::Int(2).compare(&Value::Int(2)), Some(Ordering::Equal));
    }

    #[test]
    fn test_bool_coerces_to_int() {
        assert!(Value::Bool(true).loose_eq(&Value::Int(1)));
        assert!(Value::Bool(false).loose_eq(&Value::Int(0)));
        assert!(Value::Int(1).loose_eq(&Value::Bool(true)));
        assert!(!Value::Bool(true).loose_eq(&Value::Int(0)));
    }

    #[test]
    fn test_int_float_compare_numerically() {
        assert_eq!(
            Value::Int(1).compare(&Value::Float(1.5)),
            Some(Ordering::Less)
        );
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
    }

    #[test]
    fn test_text_compares_lexically() {
        assert_eq!(
            Value::Text("a".into()).compare(&Value::Text("b".into())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_mismatched_kinds_unordered() {
        assert_eq!(Value::Text("1".into()).compare(&Value::Int(1)), None);
        assert_eq!(Value::Null.compare(&Value::Int(0)), None);
        assert_eq!(Value::Null.compare(&Value::Null), Some(Ordering::Equal));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Text("hi".into()).to_string(), "hi");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
    }
}
