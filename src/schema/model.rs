use arcstr::ArcStr;
use fnv::{FnvBuildHasher, FnvHashMap};
use indexmap::IndexMap;

use crate::{
    ast::{OperationType, Type},
    schema::meta::{DirectiveMeta, InterfaceMeta, MetaType, ObjectMeta, UnionMeta},
};

/// Metadata for a schema
///
/// Types keep the order in which they were declared.
#[derive(Debug)]
pub struct SchemaType {
    pub(crate) types: IndexMap<ArcStr, MetaType, FnvBuildHasher>,
    pub(crate) query_type_name: ArcStr,
    pub(crate) mutation_type_name: Option<ArcStr>,
    pub(crate) subscription_type_name: Option<ArcStr>,
    pub(crate) directives: FnvHashMap<ArcStr, DirectiveMeta>,
}

impl SchemaType {
    /// Get a type by name.
    pub fn type_by_name(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// Get an object type by name.
    pub fn object_by_name(&self, name: &str) -> Option<&ObjectMeta> {
        match self.types.get(name)? {
            MetaType::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the query type from the schema.
    pub fn query_type(&self) -> Option<&ObjectMeta> {
        self.object_by_name(&self.query_type_name)
    }

    /// Get the mutation type from the schema, if any.
    pub fn mutation_type(&self) -> Option<&ObjectMeta> {
        self.mutation_type_name
            .as_deref()
            .and_then(|n| self.object_by_name(n))
    }

    /// Get the subscription type, if any.
    pub fn subscription_type(&self) -> Option<&ObjectMeta> {
        self.subscription_type_name
            .as_deref()
            .and_then(|n| self.object_by_name(n))
    }

    /// Root object type an operation of the given kind starts from.
    pub fn root_type(&self, operation: OperationType) -> Option<&ObjectMeta> {
        match operation {
            OperationType::Query => self.query_type(),
            OperationType::Mutation => self.mutation_type(),
            OperationType::Subscription => self.subscription_type(),
        }
    }

    /// A list of all types in the schema
    pub fn type_list(&self) -> impl Iterator<Item = &MetaType> {
        self.types.values()
    }

    /// Get a directive by name.
    pub fn directive_by_name(&self, name: &str) -> Option<&DirectiveMeta> {
        self.directives.get(name)
    }

    /// Named type at the bottom of a type literal.
    pub fn innermost_type(&self, t: &Type) -> Option<&MetaType> {
        self.type_by_name(t.innermost_name())
    }

    /// Object types a value of the given type can have at runtime.
    ///
    /// An object type is its own only possible type.
    pub fn possible_types<'s>(&'s self, t: &'s MetaType) -> Vec<&'s ObjectMeta> {
        match t {
            MetaType::Object(o) => vec![o],
            MetaType::Union(UnionMeta { of_type_names, .. }) => of_type_names
                .iter()
                .filter_map(|n| self.object_by_name(n))
                .collect(),
            MetaType::Interface(InterfaceMeta { name, .. }) => self
                .types
                .values()
                .filter_map(|t| match t {
                    MetaType::Object(o) if o.interface_names.iter().any(|i| i == name) => Some(o),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether an object type can be the runtime type of the given type.
    pub fn is_possible_type(&self, abstract_type: &MetaType, object_name: &str) -> bool {
        match abstract_type {
            MetaType::Object(o) => o.name.as_str() == object_name,
            MetaType::Union(UnionMeta { of_type_names, .. }) => {
                of_type_names.iter().any(|n| n.as_str() == object_name)
            }
            MetaType::Interface(InterfaceMeta { name, .. }) => self
                .object_by_name(object_name)
                .is_some_and(|o| o.interface_names.iter().any(|i| i == name)),
            _ => false,
        }
    }

    /// Whether a fragment with the given type condition applies to an
    /// object type.
    pub fn type_condition_applies(&self, object: &ObjectMeta, condition: &str) -> bool {
        object.name.as_str() == condition
            || self
                .type_by_name(condition)
                .is_some_and(|t| self.is_possible_type(t, &object.name))
    }
}
