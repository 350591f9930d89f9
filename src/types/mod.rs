//! Values produced by resolvers and the resolver functions themselves.

mod field_value;
mod resolver;

pub use self::{
    field_value::FieldValue,
    resolver::{Resolver, ResolverFuture, TypeResolver},
};
