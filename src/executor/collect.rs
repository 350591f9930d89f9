use std::sync::Arc;

use arcstr::ArcStr;
use fnv::{FnvHashMap, FnvHashSet};
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::{
    ast::{
        Directive, Field, FragmentDefinition, InputValue, Selection, SelectionSet, SourcePosition,
        response_key,
    },
    executor::Variables,
    schema::{
        meta::{self, ObjectMeta},
        model::SchemaType,
    },
};

/// What a collected field resolves to.
#[derive(Clone, Copy, Debug)]
pub enum FieldKind<'a> {
    /// Field declared by the object type.
    Schema(&'a meta::Field),
    /// The `__typename` meta field.
    Typename,
    /// Field unknown to the object type.
    Unknown,
}

/// A query field bound to its definition within a concrete object type.
///
/// Fields selected several times under the same response key are merged into
/// one selection keeping every syntax node, so their sub-selections are
/// collected together.
#[derive(Debug)]
pub struct FieldSelection<'a> {
    /// Alias or name of the field.
    pub response_key: ArcStr,
    /// Name of the field in the schema.
    pub field_name: &'a str,
    /// Definition the field resolves to.
    pub kind: FieldKind<'a>,
    /// Merged syntax nodes, in document order.
    pub nodes: Vec<&'a Field>,
    /// Position of the first syntax node.
    pub position: SourcePosition,
}

impl<'a> FieldSelection<'a> {
    /// First syntax node, whose arguments are used for resolution.
    pub fn field(&self) -> &'a Field {
        self.nodes[0]
    }

    /// Selection sets of all merged syntax nodes.
    pub fn selection_sets(&self) -> Vec<&'a SelectionSet> {
        self.nodes.iter().map(|f| &f.selection_set).collect()
    }
}

type CollectedFields<'a> = Arc<[Arc<FieldSelection<'a>>]>;

type CacheKey = (usize, Vec<usize>);

/// Expands selection sets into the ordered fields to resolve for an object
/// type.
///
/// Results are cached per object type and selection sets for the lifetime of
/// the collector.
pub struct SelectionCollector<'a> {
    schema: &'a SchemaType,
    fragments: FnvHashMap<&'a str, &'a FragmentDefinition>,
    variables: &'a Variables,
    cache: Mutex<FnvHashMap<CacheKey, CollectedFields<'a>>>,
}

impl<'a> SelectionCollector<'a> {
    /// Creates a collector over the given fragments.
    pub fn new(
        schema: &'a SchemaType,
        fragments: FnvHashMap<&'a str, &'a FragmentDefinition>,
        variables: &'a Variables,
    ) -> Self {
        Self {
            schema,
            fragments,
            variables,
            cache: Mutex::new(FnvHashMap::default()),
        }
    }

    /// Fields to resolve on `object` for the given selection sets, in
    /// selection order.
    pub fn collect(
        &self,
        object: &'a ObjectMeta,
        selection_sets: &[&'a SelectionSet],
    ) -> CollectedFields<'a> {
        let key = (
            object as *const ObjectMeta as usize,
            selection_sets
                .iter()
                .map(|s| *s as *const SelectionSet as usize)
                .collect::<Vec<_>>(),
        );
        if let Some(fields) = self.cache.lock().get(&key) {
            return fields.clone();
        }

        let mut fields = IndexMap::new();
        let mut visited = FnvHashSet::default();
        for set in selection_sets {
            self.collect_into(object, set, &mut fields, &mut visited);
        }
        let fields: CollectedFields<'a> = fields.into_values().map(Arc::new).collect();

        tracing::trace!(
            object = object.name.as_str(),
            fields = fields.len(),
            "collected selection set",
        );
        self.cache.lock().insert(key, fields.clone());
        fields
    }

    /// Number of cached selection sets.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    fn collect_into(
        &self,
        object: &'a ObjectMeta,
        selection_set: &'a SelectionSet,
        fields: &mut IndexMap<&'a str, FieldSelection<'a>>,
        visited_fragments: &mut FnvHashSet<&'a str>,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    if is_excluded(&field.directives, self.variables) {
                        continue;
                    }
                    let key = response_key(field);
                    fields
                        .entry(key)
                        .and_modify(|f| f.nodes.push(field))
                        .or_insert_with(|| FieldSelection {
                            response_key: key.into(),
                            field_name: &field.name,
                            kind: match field.name.as_str() {
                                "__typename" => FieldKind::Typename,
                                name => object
                                    .fields
                                    .get(name)
                                    .map_or(FieldKind::Unknown, FieldKind::Schema),
                            },
                            nodes: vec![field],
                            position: field.position,
                        });
                }
                Selection::FragmentSpread(spread) => {
                    if is_excluded(&spread.directives, self.variables)
                        || !visited_fragments.insert(&spread.fragment_name)
                    {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(spread.fragment_name.as_str()) else {
                        continue;
                    };
                    let graphql_parser::query::TypeCondition::On(condition) =
                        &fragment.type_condition;
                    if self.schema.type_condition_applies(object, condition) {
                        self.collect_into(
                            object,
                            &fragment.selection_set,
                            fields,
                            visited_fragments,
                        );
                    }
                }
                Selection::InlineFragment(inline) => {
                    if is_excluded(&inline.directives, self.variables) {
                        continue;
                    }
                    let applies = match &inline.type_condition {
                        Some(graphql_parser::query::TypeCondition::On(condition)) => {
                            self.schema.type_condition_applies(object, condition)
                        }
                        None => true,
                    };
                    if applies {
                        self.collect_into(object, &inline.selection_set, fields, visited_fragments);
                    }
                }
            }
        }
    }
}

/// Whether `@skip` or `@include` exclude a selection.
pub(crate) fn is_excluded(directives: &[Directive], vars: &Variables) -> bool {
    for directive in directives {
        let condition = directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .and_then(|(_, v)| InputValue::from(v).into_const(vars))
            .and_then(|v| v.as_scalar().and_then(|s| s.as_bool()));

        match (directive.name.as_str(), condition) {
            ("skip", Some(true)) | ("include", Some(false)) => return true,
            _ => {}
        }
    }
    false
}
