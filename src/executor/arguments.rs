use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::{
    ast::{FromInputValue, InputValue, Operation, SyntaxValue, Type},
    executor::{FieldError, FieldResult, Variables},
    schema::{
        meta::{Argument, EnumMeta, InputObjectMeta, MetaType, ScalarMeta},
        model::SchemaType,
    },
    value::ScalarValue,
};

/// Field argument container
///
/// Holds the coerced values of a field's arguments, with defaults applied.
/// Arguments that were neither supplied nor have a default are absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    args: IndexMap<ArcStr, InputValue>,
}

impl Arguments {
    /// Gets and converts an argument into the desired type.
    ///
    /// An absent argument converts as an implicit `null`, so reading it as an
    /// [`Option`] yields [`None`].
    pub fn get<T: FromInputValue>(&self, name: &str) -> FieldResult<T> {
        match self.args.get(name) {
            Some(v) => T::from_input_value(v)
                .map_err(|e| FieldError::from(format!("Argument \"{name}\": {}", e.message()))),
            None => T::from_implicit_null(),
        }
    }

    /// Gets the raw coerced value of an argument.
    pub fn get_input_value(&self, name: &str) -> Option<&InputValue> {
        self.args.get(name)
    }

    /// Whether an argument is present.
    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    /// Iterates over present arguments in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> {
        self.args.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Merges the defaults of an operation's variable definitions under the
/// supplied variable values.
pub fn coerce_variable_values(operation: &Operation<'_>, supplied: &Variables) -> Variables {
    let mut variables = supplied.clone();
    for def in operation.variable_definitions {
        if let Some(default) = &def.default_value {
            variables
                .entry(def.name.clone())
                .or_insert_with(|| InputValue::from(default));
        }
    }
    variables
}

/// Converts the syntax-level arguments of a field into typed runtime values.
pub(crate) fn coerce_arguments(
    schema: &SchemaType,
    definitions: &[Argument],
    supplied: &[(String, SyntaxValue)],
    variables: &Variables,
) -> FieldResult<Arguments> {
    let mut args = IndexMap::with_capacity(definitions.len());

    for def in definitions {
        let value = supplied
            .iter()
            .find(|(name, _)| name.as_str() == def.name.as_str())
            .and_then(|(_, v)| InputValue::from(v).into_const(variables));

        let value = match value {
            Some(v) => v,
            None => match &def.default_value {
                Some(default) => default.clone(),
                None if def.arg_type.is_non_null() => {
                    return Err(format!(
                        "Argument \"{}\" of required type \"{}\" was not provided.",
                        def.name, def.arg_type,
                    )
                    .into());
                }
                None => continue,
            },
        };

        if value.is_null() && def.arg_type.is_non_null() {
            return Err(format!(
                "Argument \"{}\" of non-null type \"{}\" must not be null.",
                def.name, def.arg_type,
            )
            .into());
        }

        let coerced = coerce_input(schema, &def.arg_type, value.clone()).map_err(|e| {
            FieldError::from(format!(
                "Argument \"{}\" has invalid value {value}: {e}",
                def.name,
            ))
        })?;
        args.insert(def.name.clone(), coerced);
    }

    Ok(Arguments { args })
}

/// Coerces a constant input value to the given type.
pub(crate) fn coerce_input(
    schema: &SchemaType,
    ty: &Type,
    value: InputValue,
) -> Result<InputValue, String> {
    if value.is_null() {
        return if ty.is_non_null() {
            Err(format!("Expected \"{ty}\", found null."))
        } else {
            Ok(InputValue::Null)
        };
    }

    match ty {
        Type::List(inner) | Type::NonNullList(inner) => match value {
            InputValue::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    coerce_input(schema, inner, item).map_err(|e| format!("In element #{i}: {e}"))
                })
                .collect::<Result<_, _>>()
                .map(InputValue::List),
            single => Ok(InputValue::List(vec![coerce_input(schema, inner, single)?])),
        },
        Type::Named(name) | Type::NonNullNamed(name) => match schema.type_by_name(name) {
            Some(MetaType::Scalar(meta)) => coerce_scalar(meta, value),
            Some(MetaType::Enum(meta)) => coerce_enum(meta, value),
            Some(MetaType::InputObject(meta)) => coerce_input_object(schema, meta, value),
            Some(_) => Err(format!("Type \"{name}\" is not an input type.")),
            None => Err(format!("Unknown type \"{name}\".")),
        },
    }
}

fn coerce_scalar(meta: &ScalarMeta, value: InputValue) -> Result<InputValue, String> {
    let scalar = match value {
        InputValue::Scalar(s) => s,
        other => {
            return match meta.name.as_str() {
                "Int" | "Float" | "String" | "Boolean" | "ID" => {
                    Err(format!("Expected \"{}\", found {other}.", meta.name))
                }
                _ => Ok(other),
            };
        }
    };

    let coerced = match (meta.name.as_str(), scalar) {
        ("Int", s @ ScalarValue::Int(_))
        | ("Float", s @ ScalarValue::Float(_))
        | ("String", s @ ScalarValue::String(_))
        | ("Boolean", s @ ScalarValue::Boolean(_))
        | ("ID", s @ ScalarValue::String(_)) => s,
        ("Float", ScalarValue::Int(i)) => ScalarValue::Float(f64::from(i)),
        ("ID", ScalarValue::Int(i)) => ScalarValue::String(i.to_string()),
        ("Int" | "Float" | "String" | "Boolean" | "ID", other) => {
            return Err(format!("Expected \"{}\", found {other}.", meta.name));
        }
        (_, other) => other,
    };
    Ok(InputValue::Scalar(coerced))
}

fn coerce_enum(meta: &EnumMeta, value: InputValue) -> Result<InputValue, String> {
    let name = match &value {
        InputValue::Enum(e) | InputValue::Scalar(ScalarValue::String(e)) => e.as_str(),
        _ => return Err(format!("Expected \"{}\", found {value}.", meta.name)),
    };
    if meta.values.iter().any(|v| v.name.as_str() == name) {
        Ok(InputValue::Enum(name.into()))
    } else {
        Err(format!(
            "Value \"{name}\" does not exist in \"{}\" enum.",
            meta.name,
        ))
    }
}

fn coerce_input_object(
    schema: &SchemaType,
    meta: &InputObjectMeta,
    value: InputValue,
) -> Result<InputValue, String> {
    let mut fields = match value {
        InputValue::Object(fields) => fields,
        other => return Err(format!("Expected \"{}\", found {other}.", meta.name)),
    };

    if let Some(unknown) = fields.keys().find(|k| !meta.input_fields.contains_key(k.as_str())) {
        return Err(format!(
            "Field \"{unknown}\" is not defined by type \"{}\".",
            meta.name,
        ));
    }

    let mut coerced = IndexMap::with_capacity(meta.input_fields.len());
    for (name, def) in &meta.input_fields {
        let value = match fields.shift_remove(name.as_str()) {
            Some(v) => v,
            None => match &def.default_value {
                Some(default) => default.clone(),
                None if def.arg_type.is_non_null() => {
                    return Err(format!(
                        "Field \"{}.{name}\" of required type \"{}\" was not provided.",
                        meta.name, def.arg_type,
                    ));
                }
                None => continue,
            },
        };
        let value = coerce_input(schema, &def.arg_type, value)
            .map_err(|e| format!("In field \"{name}\": {e}"))?;
        coerced.insert(name.to_string(), value);
    }
    Ok(InputValue::Object(coerced))
}
