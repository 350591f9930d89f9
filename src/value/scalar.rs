use std::fmt;

use derive_more::with_trait::From;

/// Leaf value produced by scalar and enum fields.
///
/// Integers are 32-bit as required by the `Int` scalar. Values outside of
/// that range are represented as [`ScalarValue::Float`].
#[derive(Clone, Debug, From, PartialEq)]
pub enum ScalarValue {
    /// `Int` value.
    Int(i32),
    /// `Float` value.
    Float(f64),
    /// `String`, `ID`, enum and custom scalar values.
    String(String),
    /// `Boolean` value.
    Boolean(bool),
}

impl ScalarValue {
    /// Returns the contained integer, if any.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the contained string, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained boolean, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        match i32::try_from(n) {
            Ok(i) => Self::Int(i),
            Err(_) => Self::Float(n as f64),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}
