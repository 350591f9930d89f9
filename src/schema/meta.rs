//! Types used to describe a `GraphQL` schema

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::{
    ast::{InputValue, Type},
    types::{Resolver, TypeResolver},
};

/// Built-in or custom scalar type metadata
#[derive(Debug)]
pub struct ScalarMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub cost: Option<f64>,
}

/// Object type metadata
#[derive(Debug)]
pub struct ObjectMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub fields: IndexMap<ArcStr, Field>,
    #[doc(hidden)]
    pub interface_names: Vec<ArcStr>,
    #[doc(hidden)]
    pub cost: Option<f64>,
}

/// Enum type metadata
#[derive(Debug)]
pub struct EnumMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub values: Vec<EnumValue>,
    #[doc(hidden)]
    pub cost: Option<f64>,
}

/// Interface type metadata
#[derive(Debug)]
pub struct InterfaceMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub fields: IndexMap<ArcStr, Field>,
    #[doc(hidden)]
    pub interface_names: Vec<ArcStr>,
    #[doc(hidden)]
    pub cost: Option<f64>,
    pub(crate) type_resolver: Option<TypeResolver>,
}

/// Union type metadata
#[derive(Debug)]
pub struct UnionMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub of_type_names: Vec<ArcStr>,
    #[doc(hidden)]
    pub cost: Option<f64>,
    pub(crate) type_resolver: Option<TypeResolver>,
}

/// Input object metadata
#[derive(Debug)]
pub struct InputObjectMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub input_fields: IndexMap<ArcStr, Argument>,
    #[doc(hidden)]
    pub cost: Option<f64>,
}

/// Generic type metadata
#[derive(Debug)]
pub enum MetaType {
    #[doc(hidden)]
    Scalar(ScalarMeta),
    #[doc(hidden)]
    Object(ObjectMeta),
    #[doc(hidden)]
    Enum(EnumMeta),
    #[doc(hidden)]
    Interface(InterfaceMeta),
    #[doc(hidden)]
    Union(UnionMeta),
    #[doc(hidden)]
    InputObject(InputObjectMeta),
}

/// `@listSize` annotation of a list-returning field.
#[derive(Clone, Debug, PartialEq)]
pub struct ListSize {
    /// Size assumed when no slicing argument provides one.
    pub assumed_size: Option<u32>,
    /// Arguments bounding the number of returned items, e.g. `first`.
    pub slicing_arguments: Vec<ArcStr>,
    /// Child fields the computed size applies to instead of this field.
    pub sized_fields: Vec<ArcStr>,
    /// Whether exactly one of the [`ListSize::slicing_arguments`] must be
    /// supplied.
    pub require_one_slicing_argument: bool,
}

impl Default for ListSize {
    fn default() -> Self {
        Self {
            assumed_size: None,
            slicing_arguments: Vec::new(),
            sized_fields: Vec::new(),
            require_one_slicing_argument: true,
        }
    }
}

/// Metadata for a field
#[derive(Debug, Clone)]
pub struct Field {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub arguments: Vec<Argument>,
    #[doc(hidden)]
    pub field_type: Type,
    #[doc(hidden)]
    pub cost: Option<f64>,
    #[doc(hidden)]
    pub list_size: Option<ListSize>,
    pub(crate) resolver: Option<Resolver>,
}

impl Field {
    /// Returns true if the type is built-in to GraphQL.
    pub fn is_builtin(&self) -> bool {
        // "used exclusively by GraphQL’s introspection system"
        self.name.starts_with("__")
    }

    /// Access an argument's meta data given its name
    pub fn argument_by_name(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// Metadata for an argument to a field
#[derive(Debug, Clone)]
pub struct Argument {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub arg_type: Type,
    #[doc(hidden)]
    pub default_value: Option<InputValue>,
    #[doc(hidden)]
    pub cost: Option<f64>,
}

/// Metadata for a single value in an enum
#[derive(Debug, Clone)]
pub struct EnumValue {
    /// The name of the enum value
    ///
    /// This is the string literal representation of the enum in responses.
    pub name: ArcStr,
    /// The optional description of the enum value.
    pub description: Option<ArcStr>,
}

/// Directive definition metadata
#[derive(Debug)]
pub struct DirectiveMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub locations: Vec<ArcStr>,
    #[doc(hidden)]
    pub arguments: Vec<Argument>,
}

impl MetaType {
    /// Access the name of the type
    pub fn name(&self) -> &ArcStr {
        match self {
            Self::Scalar(ScalarMeta { name, .. })
            | Self::Object(ObjectMeta { name, .. })
            | Self::Enum(EnumMeta { name, .. })
            | Self::Interface(InterfaceMeta { name, .. })
            | Self::Union(UnionMeta { name, .. })
            | Self::InputObject(InputObjectMeta { name, .. }) => name,
        }
    }

    /// Access the description of the type, if applicable
    pub fn description(&self) -> Option<&ArcStr> {
        match self {
            Self::Scalar(ScalarMeta { description, .. })
            | Self::Object(ObjectMeta { description, .. })
            | Self::Enum(EnumMeta { description, .. })
            | Self::Interface(InterfaceMeta { description, .. })
            | Self::Union(UnionMeta { description, .. })
            | Self::InputObject(InputObjectMeta { description, .. }) => description.as_ref(),
        }
    }

    /// `@cost` weight declared on the type itself.
    pub fn cost(&self) -> Option<f64> {
        match self {
            Self::Scalar(ScalarMeta { cost, .. })
            | Self::Object(ObjectMeta { cost, .. })
            | Self::Enum(EnumMeta { cost, .. })
            | Self::Interface(InterfaceMeta { cost, .. })
            | Self::Union(UnionMeta { cost, .. })
            | Self::InputObject(InputObjectMeta { cost, .. }) => *cost,
        }
    }

    /// Access a field's meta data given its name
    ///
    /// Only objects and interfaces have fields. This method always returns `None` for other types.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        match self {
            Self::Object(ObjectMeta { fields, .. })
            | Self::Interface(InterfaceMeta { fields, .. }) => fields.get(name),
            _ => None,
        }
    }

    /// Access an input field's meta data given its name
    ///
    /// Only input objects have input fields. This method always returns `None` for other types.
    pub fn input_field_by_name(&self, name: &str) -> Option<&Argument> {
        match self {
            Self::InputObject(InputObjectMeta { input_fields, .. }) => input_fields.get(name),
            _ => None,
        }
    }

    /// Returns true if the type is a composite type
    ///
    /// Objects, interfaces, and unions are composite.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Interface(_) | Self::Union(_))
    }

    /// Returns true if the type can occur in leaf positions in queries
    ///
    /// Only enums and scalars are leaf types.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Enum(_) | Self::Scalar(_))
    }

    /// Returns true if the type is abstract
    ///
    /// Only interfaces and unions are abstract types.
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    /// Returns true if the type can be used in input positions, e.g. arguments or variables
    ///
    /// Only scalars, enums, and input objects are input types.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Self::Scalar(_) | Self::Enum(_) | Self::InputObject(_)
        )
    }

    pub(crate) fn type_resolver(&self) -> Option<&TypeResolver> {
        match self {
            Self::Interface(InterfaceMeta { type_resolver, .. })
            | Self::Union(UnionMeta { type_resolver, .. }) => type_resolver.as_ref(),
            _ => None,
        }
    }
}
