use arcstr::ArcStr;
use fnv::{FnvHashMap, FnvHashSet};
use graphql_parser::query::TypeCondition;

use crate::{
    ast::{
        Definition, Document, Field, FragmentDefinition, InputValue, Operation, Selection,
        SelectionSet, SyntaxValue, Type,
    },
    cost::{CostError, CostMetrics, CostOptions},
    executor::{Variables, coerce_variable_values, is_excluded},
    schema::{
        meta::{self, Argument, MetaType},
        model::SchemaType,
    },
};

/// Size estimated by a connection field for its named child fields.
#[derive(Clone, Copy)]
struct SizedFields<'s> {
    names: &'s [ArcStr],
    size: f64,
}

impl SizedFields<'_> {
    fn size_of(&self, field_name: &str) -> Option<f64> {
        self.names
            .iter()
            .any(|n| n.as_str() == field_name)
            .then_some(self.size)
    }
}

/// Estimates the cost of operations of a document.
///
/// Each field contributes its weight times the product of the estimated
/// sizes of the lists enclosing it. Selections on abstract types cost as much
/// as the most expensive possible type.
pub struct CostAnalyzer<'a> {
    schema: &'a SchemaType,
    fragments: FnvHashMap<&'a str, &'a FragmentDefinition>,
    options: &'a CostOptions,
    variables: Variables,
    visiting: FnvHashSet<&'a str>,
}

impl<'a> CostAnalyzer<'a> {
    /// Creates an analyzer for the operations of `document`.
    pub fn new(schema: &'a SchemaType, document: &'a Document, options: &'a CostOptions) -> Self {
        let fragments = document
            .definitions
            .iter()
            .filter_map(|d| match d {
                Definition::Fragment(f) => Some((f.name.as_str(), f)),
                Definition::Operation(_) => None,
            })
            .collect();

        Self {
            schema,
            fragments,
            options,
            variables: Variables::new(),
            visiting: FnvHashSet::default(),
        }
    }

    /// Estimates the cost of an operation with the given variable values.
    pub fn analyze(
        &mut self,
        operation: &Operation<'a>,
        variables: &Variables,
    ) -> Result<CostMetrics, CostError> {
        let root = self
            .schema
            .root_type(operation.operation_type)
            .and_then(|o| self.schema.type_by_name(&o.name))
            .ok_or(CostError::MissingRootType(operation.operation_type))?;

        self.variables = coerce_variable_values(operation, variables);
        self.visiting.clear();
        let metrics = self.score_selection_set(root, operation.selection_set, 1.0, None)?;

        tracing::debug!(
            operation = operation.name.unwrap_or("<anonymous>"),
            field_cost = metrics.field_cost,
            type_cost = metrics.type_cost,
            "estimated operation cost",
        );
        Ok(metrics)
    }

    fn score_selection_set(
        &mut self,
        parent: &'a MetaType,
        selection_set: &'a SelectionSet,
        multiplier: f64,
        sized: Option<SizedFields<'a>>,
    ) -> Result<CostMetrics, CostError> {
        if !parent.is_abstract() {
            return self.score_selections(parent, selection_set, multiplier, sized);
        }

        let possible_types = self.schema.possible_types(parent);
        if possible_types.is_empty() {
            return self.score_selections(parent, selection_set, multiplier, sized);
        }
        let mut max = CostMetrics::default();
        for object in possible_types {
            let Some(concrete) = self.schema.type_by_name(&object.name) else {
                continue;
            };
            let metrics = self.score_selections(concrete, selection_set, multiplier, sized)?;
            max = max.max(metrics);
        }
        Ok(max)
    }

    fn score_selections(
        &mut self,
        parent: &'a MetaType,
        selection_set: &'a SelectionSet,
        multiplier: f64,
        sized: Option<SizedFields<'a>>,
    ) -> Result<CostMetrics, CostError> {
        let mut total = CostMetrics::default();
        for selection in &selection_set.items {
            total += match selection {
                Selection::Field(field) => self.score_field(parent, field, multiplier, sized)?,
                Selection::FragmentSpread(spread) => {
                    if is_excluded(&spread.directives, &self.variables) {
                        continue;
                    }
                    let name = spread.fragment_name.as_str();
                    let fragment = *self
                        .fragments
                        .get(name)
                        .ok_or_else(|| CostError::UnknownFragment(name.into()))?;
                    if !self.visiting.insert(&fragment.name) {
                        return Err(CostError::FragmentCycle(name.into()));
                    }
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    let metrics = if self.condition_applies(parent, condition) {
                        self.score_selections(parent, &fragment.selection_set, multiplier, sized)
                    } else {
                        Ok(CostMetrics::default())
                    };
                    self.visiting.remove(fragment.name.as_str());
                    metrics?
                }
                Selection::InlineFragment(inline) => {
                    if is_excluded(&inline.directives, &self.variables) {
                        continue;
                    }
                    let applies = match &inline.type_condition {
                        Some(TypeCondition::On(condition)) => {
                            self.condition_applies(parent, condition)
                        }
                        None => true,
                    };
                    if !applies {
                        continue;
                    }
                    self.score_selections(parent, &inline.selection_set, multiplier, sized)?
                }
            };
        }
        Ok(total.clamped())
    }

    fn condition_applies(&self, parent: &MetaType, condition: &str) -> bool {
        match parent {
            MetaType::Object(o) => self.schema.type_condition_applies(o, condition),
            other => other.name().as_str() == condition,
        }
    }

    fn score_field(
        &mut self,
        parent: &'a MetaType,
        field: &'a Field,
        multiplier: f64,
        sized: Option<SizedFields<'a>>,
    ) -> Result<CostMetrics, CostError> {
        if field.name.starts_with("__") || is_excluded(&field.directives, &self.variables) {
            return Ok(CostMetrics::default());
        }
        let Some(definition) = parent.field_by_name(&field.name) else {
            return Ok(CostMetrics::default());
        };
        let Some(ty) = self.schema.innermost_type(&definition.field_type) else {
            return Ok(CostMetrics::default());
        };
        let coordinate = || format!("{}.{}", parent.name(), field.name);

        let estimate = self.list_size(definition, field, &coordinate)?;
        let inherited = sized.and_then(|s| s.size_of(&field.name));
        let is_list = definition.field_type.is_list();
        let (own_size, child_sized) = match (&definition.list_size, estimate) {
            (Some(list_size), Some(size)) if !list_size.sized_fields.is_empty() => (
                if is_list { inherited.unwrap_or(1.0) } else { 1.0 },
                Some(SizedFields {
                    names: &list_size.sized_fields,
                    size,
                }),
            ),
            _ if is_list => (
                inherited
                    .or(estimate)
                    .unwrap_or_else(|| f64::from(self.options.default_list_size)),
                None,
            ),
            _ => (1.0, None),
        };

        let field_weight = definition
            .cost
            .or_else(|| ty.cost())
            .unwrap_or_else(|| self.default_weight(ty.is_composite() || is_list));
        let type_weight = ty
            .cost()
            .unwrap_or_else(|| self.default_weight(ty.is_composite()));
        let own = CostMetrics::new(
            field_weight * multiplier,
            type_weight * multiplier * own_size,
        )
        .clamped();

        let mut arguments =
            self.score_arguments(&definition.arguments, &field.arguments, multiplier);
        for directive in &field.directives {
            if let Some(meta) = self.schema.directive_by_name(&directive.name) {
                arguments +=
                    self.score_arguments(&meta.arguments, &directive.arguments, multiplier);
            }
        }
        let arguments = CostMetrics::new(arguments, arguments).clamped();

        let children = if ty.is_composite() {
            self.score_selection_set(ty, &field.selection_set, multiplier * own_size, child_sized)?
        } else {
            CostMetrics::default()
        };

        let cost = own + arguments + children;
        tracing::debug!(
            "Field {} cost breakdown: (weight) {} * (multiplier) {} + (arguments) {} + (children) {} = {}",
            coordinate(),
            field_weight,
            multiplier,
            arguments.field_cost,
            children.field_cost,
            cost.field_cost,
        );
        Ok(cost)
    }

    fn default_weight(&self, counted: bool) -> f64 {
        if self.options.apply_cost_defaults && counted {
            1.0
        } else {
            0.0
        }
    }

    /// Size estimated by the `@listSize` of a field, if it has one.
    fn list_size(
        &self,
        definition: &meta::Field,
        field: &Field,
        coordinate: &dyn Fn() -> String,
    ) -> Result<Option<f64>, CostError> {
        let Some(list_size) = &definition.list_size else {
            return Ok(None);
        };

        let mut slicing = Vec::with_capacity(list_size.slicing_arguments.len());
        for name in &list_size.slicing_arguments {
            match definition.argument_by_name(name) {
                Some(arg) if !arg.arg_type.is_list() && arg.arg_type.innermost_name() == "Int" => {
                    slicing.push(arg);
                }
                _ => {
                    return Err(CostError::UnsupportedSlicingArgument {
                        field: coordinate(),
                        argument: name.to_string(),
                    });
                }
            }
        }

        let supplied = field
            .arguments
            .iter()
            .filter(|(name, _)| slicing.iter().any(|a| a.name.as_str() == name.as_str()))
            .collect::<Vec<_>>();
        if list_size.require_one_slicing_argument && !slicing.is_empty() && supplied.len() != 1 {
            return Err(CostError::RequireOneSlicingArgument {
                field: coordinate(),
                supplied: supplied.len(),
            });
        }

        let mut size: Option<i32> = None;
        for (name, value) in supplied {
            let value = InputValue::from(value).into_const(&self.variables);
            match value.as_ref().map(|v| (v.is_null(), v.as_int_value())) {
                None | Some((true, _)) => {}
                Some((false, Some(n))) => size = Some(size.map_or(n, |s| s.max(n))),
                Some((false, None)) => {
                    return Err(CostError::UnsupportedSlicingArgument {
                        field: coordinate(),
                        argument: name.clone(),
                    });
                }
            }
        }

        let size = size
            .or_else(|| {
                slicing
                    .iter()
                    .filter_map(|a| a.default_value.as_ref()?.as_int_value())
                    .max()
            })
            .map(f64::from)
            .or(list_size.assumed_size.map(f64::from))
            .unwrap_or_else(|| f64::from(self.options.default_list_size));
        Ok(Some(size.max(0.0)))
    }

    /// Cost of the input values supplied for the given arguments.
    fn score_arguments(
        &self,
        definitions: &[Argument],
        supplied: &[(String, SyntaxValue)],
        multiplier: f64,
    ) -> f64 {
        supplied
            .iter()
            .filter_map(|(name, value)| {
                let arg = definitions.iter().find(|a| a.name.as_str() == name.as_str())?;
                let value = InputValue::from(value).into_const(&self.variables)?;
                Some(self.score_input(&arg.arg_type, arg.cost, &value, multiplier))
            })
            .sum()
    }

    fn score_input(
        &self,
        ty: &Type,
        weight: Option<f64>,
        value: &InputValue,
        multiplier: f64,
    ) -> f64 {
        let meta = self.schema.innermost_type(ty);
        match value {
            InputValue::Null => 0.0,
            InputValue::List(items) => {
                let item_type = ty.list_item().unwrap_or(ty);
                items
                    .iter()
                    .map(|i| self.score_input(item_type, weight, i, multiplier))
                    .sum()
            }
            InputValue::Object(fields) => {
                let Some(MetaType::InputObject(input)) = meta else {
                    return 0.0;
                };
                let own = weight
                    .or(input.cost)
                    .unwrap_or_else(|| self.default_weight(true))
                    * multiplier;
                let nested: f64 = fields
                    .iter()
                    .filter_map(|(name, v)| {
                        let field = input.input_fields.get(name.as_str())?;
                        Some(self.score_input(&field.arg_type, field.cost, v, multiplier))
                    })
                    .sum();
                (own + nested).max(0.0)
            }
            InputValue::Scalar(_) | InputValue::Enum(_) | InputValue::Variable(_) => {
                let own = weight.or_else(|| meta.and_then(MetaType::cost)).unwrap_or(0.0);
                (own * multiplier).max(0.0)
            }
        }
    }
}
