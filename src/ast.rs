use std::fmt;

use arcstr::ArcStr;
use graphql_parser::query;
use indexmap::IndexMap;

use crate::{
    executor::{FieldError, Variables},
    value::ScalarValue,
};

pub use graphql_parser::Pos as SourcePosition;

/// Parsed executable document, owned for the lifetime of a request.
pub type Document = query::Document<'static, String>;
#[doc(hidden)]
pub type Definition = query::Definition<'static, String>;
#[doc(hidden)]
pub type OperationDefinition = query::OperationDefinition<'static, String>;
#[doc(hidden)]
pub type FragmentDefinition = query::FragmentDefinition<'static, String>;
#[doc(hidden)]
pub type SelectionSet = query::SelectionSet<'static, String>;
#[doc(hidden)]
pub type Selection = query::Selection<'static, String>;
#[doc(hidden)]
pub type Field = query::Field<'static, String>;
#[doc(hidden)]
pub type Directive = query::Directive<'static, String>;
#[doc(hidden)]
pub type VariableDefinition = query::VariableDefinition<'static, String>;
#[doc(hidden)]
pub type SyntaxValue = query::Value<'static, String>;

/// Kind of an executable operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[expect(missing_docs, reason = "self-explanatory")]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        })
    }
}

/// Borrowed view over the parts of an operation definition the engine needs.
#[derive(Clone, Copy, Debug)]
pub struct Operation<'a> {
    #[doc(hidden)]
    pub operation_type: OperationType,
    #[doc(hidden)]
    pub name: Option<&'a str>,
    #[doc(hidden)]
    pub position: SourcePosition,
    #[doc(hidden)]
    pub variable_definitions: &'a [VariableDefinition],
    #[doc(hidden)]
    pub selection_set: &'a SelectionSet,
}

impl<'a> Operation<'a> {
    /// Views the given syntax node as an [`Operation`].
    pub fn from_definition(def: &'a OperationDefinition) -> Self {
        match def {
            query::OperationDefinition::SelectionSet(set) => Self {
                operation_type: OperationType::Query,
                name: None,
                position: set.span.0,
                variable_definitions: &[],
                selection_set: set,
            },
            query::OperationDefinition::Query(q) => Self {
                operation_type: OperationType::Query,
                name: q.name.as_deref(),
                position: q.position,
                variable_definitions: &q.variable_definitions,
                selection_set: &q.selection_set,
            },
            query::OperationDefinition::Mutation(m) => Self {
                operation_type: OperationType::Mutation,
                name: m.name.as_deref(),
                position: m.position,
                variable_definitions: &m.variable_definitions,
                selection_set: &m.selection_set,
            },
            query::OperationDefinition::Subscription(s) => Self {
                operation_type: OperationType::Subscription,
                name: s.name.as_deref(),
                position: s.position,
                variable_definitions: &s.variable_definitions,
                selection_set: &s.selection_set,
            },
        }
    }
}

/// A type literal in the schema.
///
/// This enum carries no semantic information and might refer to types that do
/// not exist.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Type {
    /// A nullable named type, e.g. `String`
    Named(ArcStr),
    /// A nullable list type, e.g. `[String]`
    ///
    /// The list itself is what's nullable, the containing type might be non-null.
    List(Box<Type>),
    /// A non-null named type, e.g. `String!`
    NonNullNamed(ArcStr),
    /// A non-null list type, e.g. `[String]!`.
    ///
    /// The list itself is what's non-null, the containing type might be null.
    NonNullList(Box<Type>),
}

impl Type {
    /// Get the name of a named type.
    ///
    /// Only applies to named types; lists will return `None`.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(n) | Self::NonNullNamed(n) => Some(n),
            _ => None,
        }
    }

    /// Get the innermost name by unpacking lists
    ///
    /// All type literals contain exactly one named type.
    pub fn innermost_name(&self) -> &str {
        match self {
            Self::Named(n) | Self::NonNullNamed(n) => n,
            Self::List(l) | Self::NonNullList(l) => l.innermost_name(),
        }
    }

    /// Determines if a type only can represent non-null values.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNullNamed(_) | Self::NonNullList(_))
    }

    /// Determines if the outermost wrapping (ignoring non-null) is a list.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_) | Self::NonNullList(_))
    }

    /// Item type of a list type.
    pub fn list_item(&self) -> Option<&Self> {
        match self {
            Self::List(t) | Self::NonNullList(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::NonNullNamed(n) => write!(f, "{n}!"),
            Self::List(t) => write!(f, "[{t}]"),
            Self::NonNullList(t) => write!(f, "[{t}]!"),
        }
    }
}

impl<'a> From<&query::Type<'a, String>> for Type {
    fn from(t: &query::Type<'a, String>) -> Self {
        match t {
            query::Type::NamedType(n) => Self::Named(n.as_str().into()),
            query::Type::ListType(inner) => Self::List(Box::new(inner.as_ref().into())),
            query::Type::NonNullType(inner) => match Self::from(inner.as_ref()) {
                Self::Named(n) => Self::NonNullNamed(n),
                Self::List(l) => Self::NonNullList(l),
                non_null => non_null,
            },
        }
    }
}

/// A JSON-like value that can be passed into the query execution, either
/// out-of-band, or in-band as default variable values. These are _not_ constant
/// and might contain variables.
#[derive(Clone, Debug, PartialEq)]
#[expect(missing_docs, reason = "self-explanatory")]
pub enum InputValue {
    Null,
    Scalar(ScalarValue),
    Enum(String),
    Variable(String),
    List(Vec<InputValue>),
    Object(IndexMap<String, InputValue>),
}

impl InputValue {
    /// Construct a `null` value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Construct a scalar value.
    pub fn scalar<T: Into<ScalarValue>>(v: T) -> Self {
        Self::Scalar(v.into())
    }

    /// Construct an enum value.
    pub fn enum_value<T: AsRef<str>>(s: T) -> Self {
        Self::Enum(s.as_ref().into())
    }

    /// Construct a variable value.
    pub fn variable<T: AsRef<str>>(v: T) -> Self {
        Self::Variable(v.as_ref().into())
    }

    /// Construct a list value.
    pub fn list(l: Vec<Self>) -> Self {
        Self::List(l)
    }

    /// Construct an object value.
    pub fn object<K: Into<String>>(o: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Object(o.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Resolves all variables of this [`InputValue`] to their actual `values`.
    ///
    /// If a variable is not present in the `values`:
    /// - Returns [`None`] in case this is an [`InputValue::Variable`].
    /// - Skips field in case of an [`InputValue::Object`] field.
    /// - Replaces with an [`InputValue::Null`] in case of an
    ///   [`InputValue::List`] element.
    #[must_use]
    pub fn into_const(self, values: &Variables) -> Option<Self> {
        match self {
            Self::Variable(v) => values.get(&v).cloned(),
            Self::List(l) => Some(Self::List(
                l.into_iter()
                    .map(|v| v.into_const(values).unwrap_or_else(Self::null))
                    .collect(),
            )),
            Self::Object(o) => Some(Self::Object(
                o.into_iter()
                    .filter_map(|(k, v)| v.into_const(values).map(|v| (k, v)))
                    .collect(),
            )),
            v => Some(v),
        }
    }

    /// Shorthand form of invoking [`FromInputValue::from_input_value()`].
    pub fn convert<T: FromInputValue>(&self) -> Result<T, FieldError> {
        T::from_input_value(self)
    }

    /// Does the value represent a `null`?
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

    /// View the underlying int value, if present.
    pub fn as_int_value(&self) -> Option<i32> {
        self.as_scalar().and_then(ScalarValue::as_int)
    }

    /// View the underlying string value, if present.
    pub fn as_string_value(&self) -> Option<&str> {
        self.as_scalar().and_then(ScalarValue::as_str)
    }

    /// View the underlying enum value, if present.
    pub fn as_enum_value(&self) -> Option<&str> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Enum(v) => write!(f, "{v}"),
            Self::Variable(v) => write!(f, "${v}"),
            Self::List(v) => {
                write!(f, "[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl<'a> From<&query::Value<'a, String>> for InputValue {
    fn from(v: &query::Value<'a, String>) -> Self {
        match v {
            query::Value::Null => Self::Null,
            query::Value::Variable(name) => Self::Variable(name.clone()),
            query::Value::Int(n) => match n.as_i64() {
                Some(n) => Self::Scalar(n.into()),
                None => Self::Null,
            },
            query::Value::Float(f) => Self::scalar(*f),
            query::Value::String(s) => Self::scalar(s.as_str()),
            query::Value::Boolean(b) => Self::scalar(*b),
            query::Value::Enum(e) => Self::Enum(e.clone()),
            query::Value::List(l) => Self::List(l.iter().map(Into::into).collect()),
            query::Value::Object(o) => {
                Self::Object(o.iter().map(|(k, v)| (k.clone(), v.into())).collect())
            }
        }
    }
}

/// Parsing of an unstructured input value into a Rust data type.
///
/// Used by resolvers to read their coerced arguments.
pub trait FromInputValue: Sized {
    /// Performs the conversion.
    fn from_input_value(v: &InputValue) -> Result<Self, FieldError>;

    /// Performs the conversion from an absent value.
    ///
    /// The default implementation just calls [`from_input_value()`] as if an
    /// explicit `null` was provided.
    ///
    /// [`from_input_value()`]: FromInputValue::from_input_value
    fn from_implicit_null() -> Result<Self, FieldError> {
        Self::from_input_value(&InputValue::Null)
    }
}

impl FromInputValue for InputValue {
    fn from_input_value(v: &InputValue) -> Result<Self, FieldError> {
        Ok(v.clone())
    }
}

impl FromInputValue for i32 {
    fn from_input_value(v: &InputValue) -> Result<Self, FieldError> {
        v.as_int_value()
            .ok_or_else(|| format!("Expected `Int`, found: {v}").into())
    }
}

impl FromInputValue for f64 {
    fn from_input_value(v: &InputValue) -> Result<Self, FieldError> {
        v.as_scalar()
            .and_then(ScalarValue::as_float)
            .ok_or_else(|| format!("Expected `Float`, found: {v}").into())
    }
}

impl FromInputValue for bool {
    fn from_input_value(v: &InputValue) -> Result<Self, FieldError> {
        v.as_scalar()
            .and_then(ScalarValue::as_bool)
            .ok_or_else(|| format!("Expected `Boolean`, found: {v}").into())
    }
}

impl FromInputValue for String {
    fn from_input_value(v: &InputValue) -> Result<Self, FieldError> {
        match v {
            InputValue::Scalar(ScalarValue::String(s)) => Ok(s.clone()),
            InputValue::Enum(e) => Ok(e.clone()),
            _ => Err(format!("Expected `String`, found: {v}").into()),
        }
    }
}

impl<T: FromInputValue> FromInputValue for Option<T> {
    fn from_input_value(v: &InputValue) -> Result<Self, FieldError> {
        match v {
            InputValue::Null => Ok(None),
            v => T::from_input_value(v).map(Some),
        }
    }
}

impl<T: FromInputValue> FromInputValue for Vec<T> {
    fn from_input_value(v: &InputValue) -> Result<Self, FieldError> {
        match v {
            InputValue::List(l) => l.iter().map(T::from_input_value).collect(),
            other => T::from_input_value(other).map(|e| vec![e]),
        }
    }
}

/// Key identifying a response entry: the alias if present, else the name.
pub(crate) fn response_key(field: &Field) -> &str {
    field.alias.as_deref().unwrap_or(&field.name)
}
