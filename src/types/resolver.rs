use std::{any::Any, fmt, sync::Arc};

use arcstr::ArcStr;
use futures::future::{self, BoxFuture};

use crate::{
    executor::{FieldResult, ResolverContext},
    types::FieldValue,
    value::Value,
};

/// Future returned by a [`Resolver`], borrowing from its [`ResolverContext`].
pub type ResolverFuture<'c> = BoxFuture<'c, FieldResult<FieldValue>>;

type ResolverFn = dyn for<'c> Fn(ResolverContext<'c>) -> ResolverFuture<'c> + Send + Sync;

/// Function computing the value of a field.
///
/// Resolvers are bound to schema fields once, when the schema is built, and
/// are invoked with a [`ResolverContext`] giving access to the parent value,
/// coerced arguments and request data.
///
/// ```rust
/// # use juniper_engine::{FieldValue, Resolver};
/// let hello = Resolver::new(|ctx| {
///     Box::pin(async move {
///         let name: String = ctx.arg("name")?;
///         Ok(FieldValue::value(format!("Hello, {name}!")))
///     })
/// });
/// # drop(hello);
/// ```
#[derive(Clone)]
pub struct Resolver(Arc<ResolverFn>);

impl Resolver {
    /// Wraps an asynchronous resolver function.
    pub fn new<F>(f: F) -> Self
    where
        F: for<'c> Fn(ResolverContext<'c>) -> ResolverFuture<'c> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wraps a resolver function that completes without suspending.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> FieldResult<FieldValue> + Send + Sync + 'static,
    {
        Self::new(move |ctx| {
            let res = f(&ctx);
            Box::pin(future::ready(res))
        })
    }

    /// Resolver always returning the same value.
    pub fn constant<V: Into<Value>>(v: V) -> Self {
        let v = v.into();
        Self::sync(move |_| Ok(FieldValue::Value(v.clone())))
    }

    pub(crate) fn call<'c>(&self, ctx: ResolverContext<'c>) -> ResolverFuture<'c> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver")
    }
}

type TypeResolverFn = dyn Fn(&(dyn Any + Send + Sync)) -> Option<ArcStr> + Send + Sync;

/// Function naming the concrete object type of a value returned for an
/// interface or union field.
///
/// Receives the value wrapped by [`FieldValue::Object`], or the [`Value`] of a
/// [`FieldValue::Value`].
#[derive(Clone)]
pub struct TypeResolver(Arc<TypeResolverFn>);

impl TypeResolver {
    /// Wraps a type resolving function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&(dyn Any + Send + Sync)) -> Option<ArcStr> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn resolve(&self, value: &(dyn Any + Send + Sync)) -> Option<ArcStr> {
        (self.0)(value)
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeResolver")
    }
}
