mod object;
mod scalar;

use std::fmt;

pub use self::{object::Object, scalar::ScalarValue};

/// Serializable value returned from query and field execution.
///
/// Used by the execution engine and resolvers to build up the response
/// structure. Similar to the `Json` type found in the serialize crate.
///
/// It is also similar to the `InputValue` type, but can not contain enum
/// values or variables. Also, lists and objects do not contain any location
/// information since they are generated by resolving fields and values rather
/// than parsing a source query.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// `null`.
    #[default]
    Null,
    /// Leaf value.
    Scalar(ScalarValue),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Ordered map of response keys to values.
    Object(Object),
}

impl Value {
    // CONSTRUCTORS

    /// Constructs a `null` value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Constructs a list value.
    pub fn list(l: Vec<Self>) -> Self {
        Self::List(l)
    }

    /// Constructs an object value.
    pub fn object(o: Object) -> Self {
        Self::Object(o)
    }

    /// Constructs a scalar value.
    pub fn scalar<T: Into<ScalarValue>>(s: T) -> Self {
        Self::Scalar(s.into())
    }

    // DISCRIMINATORS

    /// Does this value represent `null`?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// View the underlying scalar value, if present.
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// View the underlying object value, if present.
    pub fn as_object_value(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// View the underlying list value, if present.
    pub fn as_list_value(&self) -> Option<&Vec<Self>> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// View the underlying string value, if present.
    pub fn as_string_value(&self) -> Option<&str> {
        self.as_scalar().and_then(ScalarValue::as_str)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::List(list) => {
                write!(f, "[")?;
                for (idx, item) in list.iter().enumerate() {
                    write!(f, "{item}")?;
                    if idx < list.len() - 1 {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "]")
            }
            Self::Object(obj) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in obj.iter().enumerate() {
                    write!(f, "\"{key}\": {value}")?;
                    if idx < obj.field_count() - 1 {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<ScalarValue> for Value {
    fn from(s: ScalarValue) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::scalar(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::scalar(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::scalar(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::scalar(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::scalar(b)
    }
}

/// Constructs [`Value`]s with JSON-like syntax.
///
/// ```rust
/// # use juniper_engine::{graphql_value, Value};
/// let v: Value = graphql_value!({ "a": [1, "two", null], "b": { "c": true } });
/// # assert!(v.as_object_value().is_some());
/// ```
#[macro_export]
macro_rules! graphql_value {
    (null) => {
        $crate::Value::Null
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::List(vec![ $( $crate::graphql_value!($elem) ),* ])
    };
    ({ $($key:literal : $val:tt),* $(,)? }) => {
        $crate::Value::Object(
            <$crate::Object as ::std::iter::FromIterator<(&str, $crate::Value)>>::from_iter(
                vec![ $( ($key, $crate::graphql_value!($val)) ),* ],
            ),
        )
    };
    ($e:expr) => {
        $crate::Value::from($e)
    };
}
