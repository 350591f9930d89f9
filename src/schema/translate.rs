use arcstr::ArcStr;
use derive_more::with_trait::{Display, Error, From};
use fnv::{FnvBuildHasher, FnvHashMap};
use graphql_parser::schema::{self as sdl, parse_schema};
use indexmap::IndexMap;

use crate::{
    ast::{InputValue, Type},
    schema::{
        meta::{
            Argument, DirectiveMeta, EnumMeta, EnumValue, Field, InputObjectMeta, InterfaceMeta,
            ListSize, MetaType, ObjectMeta, ScalarMeta, UnionMeta,
        },
        model::SchemaType,
    },
    types::{Resolver, TypeResolver},
};

type SdlValue<'a> = sdl::Value<'a, String>;
type SdlDirective<'a> = sdl::Directive<'a, String>;

/// Error building a [`SchemaType`].
#[derive(Debug, Display, Error, From)]
pub enum SchemaError {
    /// The SDL has a syntax error.
    #[display("{_0}")]
    Parse(sdl::ParseError),

    /// Two types share a name.
    #[display("Type \"{_0}\" is defined more than once")]
    #[from(ignore)]
    DuplicateType(#[error(not(source))] ArcStr),

    /// A type is referenced but never defined.
    #[display("Unknown type \"{name}\" referenced by {referrer}")]
    #[from(ignore)]
    UnknownType {
        /// Name of the missing type.
        name: String,
        /// Definition referencing it.
        referrer: String,
    },

    /// A root operation type is missing or is not an object type.
    #[display("Root type \"{_0}\" is not an object type of the schema")]
    #[from(ignore)]
    InvalidRootType(#[error(not(source))] ArcStr),

    /// Type extensions are not supported.
    #[display("Extension of type \"{_0}\" is not supported")]
    #[from(ignore)]
    UnsupportedExtension(#[error(not(source))] String),

    /// A cost directive has invalid arguments.
    #[display("Invalid @{directive} on {location}: {message}")]
    #[from(ignore)]
    InvalidDirective {
        /// Name of the directive.
        directive: &'static str,
        /// Schema coordinate the directive is applied to.
        location: String,
        /// What is wrong with it.
        message: String,
    },

    /// A resolver was registered for a field no object type declares.
    #[display("Cannot register a resolver for unknown field \"{type_name}.{field_name}\"")]
    #[from(ignore)]
    UnknownField {
        /// Name of the object type.
        type_name: String,
        /// Name of the field.
        field_name: String,
    },

    /// A type resolver was registered for a type that is not abstract.
    #[display("Type \"{_0}\" is not an interface or a union")]
    #[from(ignore)]
    NotAbstract(#[error(not(source))] String),
}

/// Builds a [`SchemaType`] from SDL and the resolvers bound to its fields.
///
/// ```rust
/// # use juniper_engine::{Resolver, SchemaBuilder};
/// let schema = SchemaBuilder::from_sdl("type Query { hello: String }")?
///     .resolver("Query", "hello", Resolver::constant("world"))
///     .finish()?;
/// assert!(schema.query_type().is_some());
/// # Ok::<(), juniper_engine::SchemaError>(())
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    types: IndexMap<ArcStr, MetaType, FnvBuildHasher>,
    query_type_name: Option<ArcStr>,
    mutation_type_name: Option<ArcStr>,
    subscription_type_name: Option<ArcStr>,
    directives: FnvHashMap<ArcStr, DirectiveMeta>,
    errors: Vec<SchemaError>,
}

impl SchemaBuilder {
    /// Parses an SDL document.
    ///
    /// Built-in scalars and the `@skip`, `@include`, `@cost` and `@listSize`
    /// directives are always defined.
    pub fn from_sdl(source: &str) -> Result<Self, SchemaError> {
        let document = parse_schema::<String>(source)?;
        let mut builder = Self::with_builtins();

        for definition in &document.definitions {
            match definition {
                sdl::Definition::SchemaDefinition(schema) => {
                    builder.query_type_name = schema.query.as_deref().map(Into::into);
                    builder.mutation_type_name = schema.mutation.as_deref().map(Into::into);
                    builder.subscription_type_name =
                        schema.subscription.as_deref().map(Into::into);
                }
                sdl::Definition::TypeDefinition(def) => {
                    let meta = translate_type(def)?;
                    let name = meta.name().clone();
                    if builder.types.insert(name.clone(), meta).is_some() {
                        return Err(SchemaError::DuplicateType(name));
                    }
                }
                sdl::Definition::TypeExtension(ext) => {
                    return Err(SchemaError::UnsupportedExtension(extension_name(ext).into()));
                }
                sdl::Definition::DirectiveDefinition(def) => {
                    let meta = translate_directive(def)?;
                    builder.directives.insert(meta.name.clone(), meta);
                }
            }
        }

        if builder.query_type_name.is_none() {
            builder.query_type_name = Some(arcstr::literal!("Query"));
            builder.mutation_type_name = builder
                .types
                .contains_key("Mutation")
                .then(|| arcstr::literal!("Mutation"));
            builder.subscription_type_name = builder
                .types
                .contains_key("Subscription")
                .then(|| arcstr::literal!("Subscription"));
        }

        Ok(builder)
    }

    fn with_builtins() -> Self {
        let mut types = IndexMap::default();
        for (name, description) in [
            (arcstr::literal!("Int"), "32-bit signed integer."),
            (arcstr::literal!("Float"), "Double-precision floating-point value."),
            (arcstr::literal!("String"), "UTF-8 character sequence."),
            (arcstr::literal!("Boolean"), "`true` or `false`."),
            (arcstr::literal!("ID"), "Unique identifier, serialized as a string."),
        ] {
            types.insert(
                name.clone(),
                MetaType::Scalar(ScalarMeta {
                    name,
                    description: Some(description.into()),
                    cost: None,
                }),
            );
        }

        let directives = builtin_directives()
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();

        Self {
            types,
            query_type_name: None,
            mutation_type_name: None,
            subscription_type_name: None,
            directives,
            errors: Vec::new(),
        }
    }

    /// Binds a resolver to a field of an object type.
    ///
    /// Fields without a resolver read the same-named entry of their parent
    /// [`Value::Object`](crate::Value::Object).
    #[must_use]
    pub fn resolver(mut self, type_name: &str, field_name: &str, resolver: Resolver) -> Self {
        let field = match self.types.get_mut(type_name) {
            Some(MetaType::Object(o)) => o.fields.get_mut(field_name),
            _ => None,
        };
        match field {
            Some(f) => f.resolver = Some(resolver),
            None => self.errors.push(SchemaError::UnknownField {
                type_name: type_name.into(),
                field_name: field_name.into(),
            }),
        }
        self
    }

    /// Binds the function naming the concrete object type of values returned
    /// for an interface or union.
    #[must_use]
    pub fn type_resolver(mut self, type_name: &str, resolver: TypeResolver) -> Self {
        match self.types.get_mut(type_name) {
            Some(MetaType::Interface(InterfaceMeta { type_resolver, .. }))
            | Some(MetaType::Union(UnionMeta { type_resolver, .. })) => {
                *type_resolver = Some(resolver);
            }
            _ => self.errors.push(SchemaError::NotAbstract(type_name.into())),
        }
        self
    }

    /// Checks type references and returns the finished schema.
    ///
    /// Fails with the first registration error, if any.
    pub fn finish(mut self) -> Result<SchemaType, SchemaError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }

        let query_type_name = self
            .query_type_name
            .clone()
            .unwrap_or_else(|| arcstr::literal!("Query"));
        for root in [
            Some(&query_type_name),
            self.mutation_type_name.as_ref(),
            self.subscription_type_name.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            if !matches!(self.types.get(root), Some(MetaType::Object(_))) {
                return Err(SchemaError::InvalidRootType(root.clone()));
            }
        }
        self.check_references()?;

        Ok(SchemaType {
            types: self.types,
            query_type_name,
            mutation_type_name: self.mutation_type_name,
            subscription_type_name: self.subscription_type_name,
            directives: self.directives,
        })
    }

    fn check_references(&self) -> Result<(), SchemaError> {
        let check = |ty: &Type, referrer: &dyn Fn() -> String| {
            let name = ty.innermost_name();
            if self.types.contains_key(name) {
                Ok(())
            } else {
                Err(SchemaError::UnknownType {
                    name: name.into(),
                    referrer: referrer(),
                })
            }
        };
        let check_named = |name: &ArcStr, referrer: &str| {
            check(&Type::Named(name.clone()), &|| referrer.into())
        };
        let check_arguments = |owner: &str, args: &[Argument]| {
            args.iter()
                .try_for_each(|a| check(&a.arg_type, &|| format!("{owner}({}:)", a.name)))
        };

        for meta in self.types.values() {
            match meta {
                MetaType::Object(ObjectMeta { name, fields, interface_names, .. })
                | MetaType::Interface(InterfaceMeta { name, fields, interface_names, .. }) => {
                    for i in interface_names {
                        check_named(i, name)?;
                    }
                    for field in fields.values() {
                        let coordinate = format!("{name}.{}", field.name);
                        check(&field.field_type, &|| coordinate.clone())?;
                        check_arguments(&coordinate, &field.arguments)?;
                    }
                }
                MetaType::Union(UnionMeta { name, of_type_names, .. }) => {
                    for member in of_type_names {
                        check_named(member, name)?;
                    }
                }
                MetaType::InputObject(InputObjectMeta { name, input_fields, .. }) => {
                    for field in input_fields.values() {
                        check(&field.arg_type, &|| format!("{name}.{}", field.name))?;
                    }
                }
                MetaType::Scalar(_) | MetaType::Enum(_) => {}
            }
        }
        for directive in self.directives.values() {
            check_arguments(&format!("@{}", directive.name), &directive.arguments)?;
        }
        Ok(())
    }
}

fn extension_name<'e>(ext: &'e sdl::TypeExtension<'_, String>) -> &'e str {
    match ext {
        sdl::TypeExtension::Scalar(t) => &t.name,
        sdl::TypeExtension::Object(t) => &t.name,
        sdl::TypeExtension::Interface(t) => &t.name,
        sdl::TypeExtension::Union(t) => &t.name,
        sdl::TypeExtension::Enum(t) => &t.name,
        sdl::TypeExtension::InputObject(t) => &t.name,
    }
}

fn description(d: &Option<String>) -> Option<ArcStr> {
    d.as_deref().map(Into::into)
}

fn translate_type(def: &sdl::TypeDefinition<'_, String>) -> Result<MetaType, SchemaError> {
    Ok(match def {
        sdl::TypeDefinition::Scalar(t) => MetaType::Scalar(ScalarMeta {
            name: t.name.as_str().into(),
            description: description(&t.description),
            cost: cost_weight(&t.directives, &t.name)?,
        }),
        sdl::TypeDefinition::Object(t) => MetaType::Object(ObjectMeta {
            name: t.name.as_str().into(),
            description: description(&t.description),
            fields: translate_fields(&t.name, &t.fields)?,
            interface_names: t.implements_interfaces.iter().map(|i| i.as_str().into()).collect(),
            cost: cost_weight(&t.directives, &t.name)?,
        }),
        sdl::TypeDefinition::Interface(t) => MetaType::Interface(InterfaceMeta {
            name: t.name.as_str().into(),
            description: description(&t.description),
            fields: translate_fields(&t.name, &t.fields)?,
            interface_names: t.implements_interfaces.iter().map(|i| i.as_str().into()).collect(),
            cost: cost_weight(&t.directives, &t.name)?,
            type_resolver: None,
        }),
        sdl::TypeDefinition::Union(t) => MetaType::Union(UnionMeta {
            name: t.name.as_str().into(),
            description: description(&t.description),
            of_type_names: t.types.iter().map(|n| n.as_str().into()).collect(),
            cost: cost_weight(&t.directives, &t.name)?,
            type_resolver: None,
        }),
        sdl::TypeDefinition::Enum(t) => MetaType::Enum(EnumMeta {
            name: t.name.as_str().into(),
            description: description(&t.description),
            values: t
                .values
                .iter()
                .map(|v| EnumValue {
                    name: v.name.as_str().into(),
                    description: description(&v.description),
                })
                .collect(),
            cost: cost_weight(&t.directives, &t.name)?,
        }),
        sdl::TypeDefinition::InputObject(t) => MetaType::InputObject(InputObjectMeta {
            name: t.name.as_str().into(),
            description: description(&t.description),
            input_fields: t
                .fields
                .iter()
                .map(|f| {
                    let arg = translate_argument(&t.name, f)?;
                    Ok((arg.name.clone(), arg))
                })
                .collect::<Result<_, SchemaError>>()?,
            cost: cost_weight(&t.directives, &t.name)?,
        }),
    })
}

fn translate_fields(
    owner: &str,
    fields: &[sdl::Field<'_, String>],
) -> Result<IndexMap<ArcStr, Field>, SchemaError> {
    fields
        .iter()
        .map(|f| {
            let coordinate = format!("{owner}.{}", f.name);
            let field = Field {
                name: f.name.as_str().into(),
                description: description(&f.description),
                arguments: f
                    .arguments
                    .iter()
                    .map(|a| translate_argument(&coordinate, a))
                    .collect::<Result<_, _>>()?,
                field_type: Type::from(&f.field_type),
                cost: cost_weight(&f.directives, &coordinate)?,
                list_size: list_size(&f.directives, &coordinate)?,
                resolver: None,
            };
            Ok((field.name.clone(), field))
        })
        .collect()
}

fn translate_argument(
    owner: &str,
    arg: &sdl::InputValue<'_, String>,
) -> Result<Argument, SchemaError> {
    Ok(Argument {
        name: arg.name.as_str().into(),
        description: description(&arg.description),
        arg_type: Type::from(&arg.value_type),
        default_value: arg.default_value.as_ref().map(InputValue::from),
        cost: cost_weight(&arg.directives, &format!("{owner}({}:)", arg.name))?,
    })
}

fn translate_directive(
    def: &sdl::DirectiveDefinition<'_, String>,
) -> Result<DirectiveMeta, SchemaError> {
    let owner = format!("@{}", def.name);
    Ok(DirectiveMeta {
        name: def.name.as_str().into(),
        description: description(&def.description),
        locations: def.locations.iter().map(|l| l.as_str().into()).collect(),
        arguments: def
            .arguments
            .iter()
            .map(|a| translate_argument(&owner, a))
            .collect::<Result<_, _>>()?,
    })
}

fn find_directive<'d, 'a>(
    directives: &'d [SdlDirective<'a>],
    name: &str,
) -> Option<&'d SdlDirective<'a>> {
    directives.iter().find(|d| d.name == name)
}

fn directive_argument<'d, 'a>(
    directive: &'d SdlDirective<'a>,
    name: &str,
) -> Option<&'d SdlValue<'a>> {
    directive
        .arguments
        .iter()
        .find_map(|(n, v)| (n == name).then_some(v))
}

/// Reads the `weight` of a `@cost` directive.
///
/// The weight may be written as a float, an integer or a numeric string.
fn cost_weight(
    directives: &[SdlDirective<'_>],
    location: &str,
) -> Result<Option<f64>, SchemaError> {
    let Some(directive) = find_directive(directives, "cost") else {
        return Ok(None);
    };
    let invalid = |message: &str| SchemaError::InvalidDirective {
        directive: "cost",
        location: location.into(),
        message: message.into(),
    };

    let weight = match directive_argument(directive, "weight") {
        Some(sdl::Value::Float(f)) => *f,
        Some(sdl::Value::Int(n)) => n
            .as_i64()
            .map(|n| n as f64)
            .ok_or_else(|| invalid("weight is out of range"))?,
        Some(sdl::Value::String(s)) => s
            .parse()
            .map_err(|_| invalid("weight is not a number"))?,
        Some(_) => return Err(invalid("weight is not a number")),
        None => return Err(invalid("missing argument \"weight\"")),
    };
    Ok(Some(weight))
}

fn list_size(
    directives: &[SdlDirective<'_>],
    location: &str,
) -> Result<Option<ListSize>, SchemaError> {
    let Some(directive) = find_directive(directives, "listSize") else {
        return Ok(None);
    };
    let invalid = |message: String| SchemaError::InvalidDirective {
        directive: "listSize",
        location: location.into(),
        message,
    };
    let strings = |name: &str| -> Result<Vec<ArcStr>, SchemaError> {
        match directive_argument(directive, name) {
            None | Some(sdl::Value::Null) => Ok(Vec::new()),
            Some(sdl::Value::String(s)) => Ok(vec![s.as_str().into()]),
            Some(sdl::Value::List(items)) => items
                .iter()
                .map(|i| match i {
                    sdl::Value::String(s) => Ok(s.as_str().into()),
                    other => Err(invalid(format!("{name} contains a non-string value {other}"))),
                })
                .collect(),
            Some(other) => Err(invalid(format!("{name} must be a list of strings, found {other}"))),
        }
    };

    let mut size = ListSize {
        slicing_arguments: strings("slicingArguments")?,
        sized_fields: strings("sizedFields")?,
        ..ListSize::default()
    };
    match directive_argument(directive, "assumedSize") {
        None | Some(sdl::Value::Null) => {}
        Some(sdl::Value::Int(n)) => {
            let n = n
                .as_i64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid("assumedSize must be a non-negative integer".into()))?;
            size.assumed_size = Some(n);
        }
        Some(other) => {
            return Err(invalid(format!(
                "assumedSize must be an integer, found {other}"
            )));
        }
    }
    match directive_argument(directive, "requireOneSlicingArgument") {
        None | Some(sdl::Value::Null) => {}
        Some(sdl::Value::Boolean(b)) => size.require_one_slicing_argument = *b,
        Some(other) => {
            return Err(invalid(format!(
                "requireOneSlicingArgument must be a boolean, found {other}"
            )));
        }
    }
    Ok(Some(size))
}

fn builtin_directives() -> Vec<DirectiveMeta> {
    let arg = |name: &str, arg_type: Type, default_value: Option<InputValue>| Argument {
        name: name.into(),
        description: None,
        arg_type,
        default_value,
        cost: None,
    };
    let non_null = |name| Type::NonNullNamed(ArcStr::from(name));
    let named = |name| Type::Named(ArcStr::from(name));
    let strings = || Type::List(Box::new(non_null("String")));
    let directive = |name: &str, description: &str, locations: &[&str], arguments| DirectiveMeta {
        name: name.into(),
        description: Some(description.into()),
        locations: locations.iter().map(|l| ArcStr::from(*l)).collect(),
        arguments,
    };

    vec![
        directive(
            "skip",
            "Directs the executor to skip this field or fragment when the `if` argument is true.",
            &["FIELD", "FRAGMENT_SPREAD", "INLINE_FRAGMENT"],
            vec![arg("if", non_null("Boolean"), None)],
        ),
        directive(
            "include",
            "Directs the executor to include this field or fragment only when the `if` argument is true.",
            &["FIELD", "FRAGMENT_SPREAD", "INLINE_FRAGMENT"],
            vec![arg("if", non_null("Boolean"), None)],
        ),
        directive(
            "cost",
            "Weight of a field, type or argument in the static cost of an operation.",
            &[
                "ARGUMENT_DEFINITION",
                "ENUM",
                "FIELD_DEFINITION",
                "INPUT_FIELD_DEFINITION",
                "OBJECT",
                "SCALAR",
            ],
            vec![arg("weight", non_null("Float"), None)],
        ),
        directive(
            "listSize",
            "Expected size of a list field, for the static cost of an operation.",
            &["FIELD_DEFINITION"],
            vec![
                arg("assumedSize", named("Int"), None),
                arg("slicingArguments", strings(), None),
                arg("sizedFields", strings(), None),
                arg(
                    "requireOneSlicingArgument",
                    named("Boolean"),
                    Some(InputValue::scalar(true)),
                ),
            ],
        ),
    ]
}
