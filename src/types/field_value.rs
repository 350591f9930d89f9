use std::{any::Any, fmt, sync::Arc};

use arcstr::ArcStr;

use crate::{
    executor::FieldError,
    value::{Object, Value},
};

/// Raw result of a resolver, before it is completed against the declared
/// field type.
pub enum FieldValue {
    /// `null`.
    Null,
    /// Plain value. Objects in it can serve as parents of nested fields.
    Value(Value),
    /// Opaque parent value for the fields of a composite type.
    Object(Arc<dyn Any + Send + Sync>),
    /// List of items, completed one by one.
    List(Vec<FieldValue>),
    /// Value tagged with its concrete object type name, for abstract types.
    Typed {
        /// Name of the concrete object type.
        type_name: ArcStr,
        /// Tagged value.
        value: Box<FieldValue>,
    },
    /// Error recorded at the position of this value.
    Error(FieldError),
}

impl FieldValue {
    /// Constructs a `null` value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Constructs a plain value.
    pub fn value<T: Into<Value>>(v: T) -> Self {
        Self::Value(v.into())
    }

    /// Wraps any Rust value as the parent of nested fields.
    pub fn object<T: Any + Send + Sync>(v: T) -> Self {
        Self::Object(Arc::new(v))
    }

    /// Constructs a list from its items.
    pub fn list<I: IntoIterator<Item = Self>>(items: I) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Constructs an error value.
    pub fn error<E: Into<FieldError>>(e: E) -> Self {
        Self::Error(e.into())
    }

    /// Tags this value with the name of its concrete object type.
    #[must_use]
    pub fn with_type<N: Into<ArcStr>>(self, type_name: N) -> Self {
        Self::Typed {
            type_name: type_name.into(),
            value: Box::new(self),
        }
    }

    /// Does this value represent `null`?
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null | Self::Value(Value::Null) => true,
            Self::Typed { value, .. } => value.is_null(),
            _ => false,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
            Self::List(l) => f.debug_tuple("List").field(l).finish(),
            Self::Typed { type_name, value } => f
                .debug_struct("Typed")
                .field("type_name", type_name)
                .field("value", value)
                .finish(),
            Self::Error(e) => f.debug_tuple("Error").field(e).finish(),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<Object> for FieldValue {
    fn from(o: Object) -> Self {
        Self::Value(Value::Object(o))
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}
