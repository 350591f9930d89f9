use std::{any::Any, sync::Arc};

use futures::future;
use parking_lot::Mutex;

use crate::{
    ast::FromInputValue,
    executor::{
        Arguments, ExecutionError, Executor, FieldError, FieldResult, FieldSelection,
        RequestContext, SharedAny, Variables, arguments::coerce_arguments, completion::SlotRef,
        path::Path,
    },
    schema::{
        meta::{self, ObjectMeta},
        model::SchemaType,
    },
    types::{FieldValue, ResolverFuture},
    value::Value,
};

/// Immutable stack of the values enclosing a field, nearest first.
#[derive(Clone)]
pub struct ParentValue(Option<Arc<ParentFrame>>);

struct ParentFrame {
    value: SharedAny,
    parent: ParentValue,
}

impl ParentValue {
    pub(crate) fn root(value: SharedAny) -> Self {
        Self(None).push(value)
    }

    pub(crate) fn push(&self, value: SharedAny) -> Self {
        Self(Some(Arc::new(ParentFrame {
            value,
            parent: self.clone(),
        })))
    }

    /// Nearest enclosing value.
    pub fn value(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.0.as_deref().map(|f| &*f.value)
    }

    /// Enclosing values, from the nearest to the root value.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn Any + Send + Sync)> {
        let mut cur = self.0.as_deref();
        std::iter::from_fn(move || {
            let frame = cur?;
            cur = frame.parent.0.as_deref();
            Some(&*frame.value)
        })
    }
}

/// One field instance being resolved at a specific path.
///
/// Units are created when the value of their enclosing object is completed,
/// and consumed once their own value is completed into the result tree.
pub struct ResolutionUnit<'a> {
    pub(crate) path: Path,
    pub(crate) selection: Arc<FieldSelection<'a>>,
    pub(crate) field: &'a meta::Field,
    pub(crate) object_type: &'a ObjectMeta,
    pub(crate) parent: ParentValue,
    pub(crate) arguments: Option<FieldResult<Arguments>>,
    pub(crate) slot: SlotRef,
}

impl<'a> ResolutionUnit<'a> {
    /// Path of the field in the response.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Coerces the field's arguments, unless already done.
    pub(crate) fn prepare(&mut self, schema: &SchemaType, variables: &Variables) {
        if self.arguments.is_none() {
            self.arguments = Some(coerce_arguments(
                schema,
                &self.field.arguments,
                &self.selection.field().arguments,
                variables,
            ));
        }
    }

    /// Starts the resolver of the field.
    ///
    /// A coercion error of the arguments is returned as the field's result.
    pub(crate) fn invoke<'c>(&'c self, executor: &'c Executor<'a>) -> ResolverFuture<'c> {
        let arguments = match &self.arguments {
            Some(Ok(args)) => args,
            Some(Err(e)) => return Box::pin(future::ready(Err(e.clone()))),
            None => {
                return Box::pin(future::ready(Err(FieldError::from(
                    "Arguments were not coerced before resolution",
                ))));
            }
        };

        let ctx = ResolverContext {
            schema: executor.schema,
            context: executor.context,
            errors: &executor.errors,
            object_type: self.object_type,
            field: self.field,
            selection: &self.selection,
            path: &self.path,
            parent: &self.parent,
            arguments,
        };

        match &self.field.resolver {
            Some(resolver) => resolver.call(ctx),
            None => Box::pin(future::ready(resolve_default(&ctx))),
        }
    }
}

/// Reads the same-named entry of a parent [`Value::Object`].
fn resolve_default(ctx: &ResolverContext<'_>) -> FieldResult<FieldValue> {
    match ctx.parent_value() {
        Some(Value::Object(o)) => Ok(o
            .get_field_value(ctx.field_name())
            .cloned()
            .map_or(FieldValue::Null, FieldValue::Value)),
        _ => Err(format!(
            "No resolver registered for field \"{}.{}\"",
            ctx.object_type.name,
            ctx.field_name(),
        )
        .into()),
    }
}

/// Everything a resolver can access while computing the value of a field.
#[derive(Clone, Copy)]
pub struct ResolverContext<'c> {
    schema: &'c SchemaType,
    context: &'c RequestContext,
    errors: &'c Mutex<Vec<ExecutionError>>,
    object_type: &'c ObjectMeta,
    field: &'c meta::Field,
    selection: &'c FieldSelection<'c>,
    path: &'c Path,
    parent: &'c ParentValue,
    arguments: &'c Arguments,
}

impl<'c> ResolverContext<'c> {
    /// The parent value, if it is of type `T`.
    pub fn parent<T: Any>(&self) -> Option<&'c T> {
        self.parent.value()?.downcast_ref()
    }

    /// The parent value, if it is a plain [`Value`].
    pub fn parent_value(&self) -> Option<&'c Value> {
        self.parent::<Value>()
    }

    /// All enclosing values, from the parent up to the root value.
    pub fn ancestors(&self) -> impl Iterator<Item = &'c (dyn Any + Send + Sync)> + use<'c> {
        self.parent.iter()
    }

    /// Coerced arguments of the field.
    pub fn args(&self) -> &'c Arguments {
        self.arguments
    }

    /// Gets and converts an argument.
    pub fn arg<T: FromInputValue>(&self, name: &str) -> FieldResult<T> {
        self.arguments.get(name)
    }

    /// A service registered with the request by type.
    pub fn data<T: Any>(&self) -> Option<&'c T> {
        self.context.data()
    }

    /// A named state entry of the request.
    pub fn state<T: Any>(&self, key: &str) -> Option<&'c T> {
        self.context.state(key)
    }

    /// The schema being executed.
    pub fn schema(&self) -> &'c SchemaType {
        self.schema
    }

    /// Path of the field in the response.
    pub fn path(&self) -> &'c Path {
        self.path
    }

    /// Name of the field in the schema.
    pub fn field_name(&self) -> &'c str {
        &self.field.name
    }

    /// Definition of the field.
    pub fn field(&self) -> &'c meta::Field {
        self.field
    }

    /// Object type declaring the field.
    pub fn object_type(&self) -> &'c ObjectMeta {
        self.object_type
    }

    /// The selection of the field, with all merged syntax nodes.
    pub fn selection(&self) -> &'c FieldSelection<'c> {
        self.selection
    }

    /// Records an error at the path of the field without failing it.
    pub fn push_error<E: Into<FieldError>>(&self, error: E) {
        self.errors.lock().push(ExecutionError::new(
            self.selection.position,
            self.path,
            error.into(),
        ));
    }
}
