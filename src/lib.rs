//! GraphQL execution engine with wave scheduling and static cost analysis.
//!
//! A schema is built from SDL with [`SchemaBuilder`], binding one
//! [`Resolver`] per field. An [`Engine`] then executes operations against it:
//!
//! 1. the operation is analyzed for its cost, following the `@cost` and
//!    `@listSize` directives of the schema, and rejected if over the
//!    configured limits;
//! 2. its fields are resolved wave by wave: every field discovered while
//!    completing one depth of the response is started together, and batched
//!    fetches queued by them are flushed once they all wait;
//! 3. resolved values are completed against the schema types, with nulls
//!    propagating up to the closest nullable field.
//!
//! ```rust
//! # use juniper_engine::{
//! #     Engine, EngineConfig, FieldValue, RequestContext, Resolver, SchemaBuilder, Variables,
//! #     graphql_value,
//! # };
//! # #[tokio::main]
//! # async fn main() {
//! let schema = SchemaBuilder::from_sdl("type Query { hello(name: String!): String }")
//!     .unwrap()
//!     .resolver(
//!         "Query",
//!         "hello",
//!         Resolver::sync(|ctx| {
//!             let name: String = ctx.arg("name")?;
//!             Ok(FieldValue::value(format!("Hello, {name}!")))
//!         }),
//!     )
//!     .finish()
//!     .unwrap();
//!
//! let engine = Engine::new(schema, EngineConfig::default());
//! let response = engine
//!     .execute(r#"{ hello(name: "world") }"#, None, &Variables::new(), &RequestContext::new())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(response.data, graphql_value!({ "hello": "Hello, world!" }));
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

#[macro_use]
mod value;

pub mod ast;
pub mod config;
pub mod cost;
mod engine;
pub mod executor;
mod integrations;
pub mod schema;
pub mod types;

#[cfg(test)]
mod executor_tests;

use derive_more::with_trait::{Display, Error, From};

#[doc(inline)]
pub use self::{
    ast::{InputValue, OperationType, Type},
    config::{EngineConfig, ExecutionOptions},
    cost::{AnalyzerMode, CostAnalyzer, CostCache, CostError, CostMetrics, CostOptions},
    engine::{Engine, Response},
    executor::{
        DataLoader, ExecutionError, ExecutionPolicy, ExecutionPools, Executor, FieldError,
        FieldResult, Loader, RequestContext, ResolverContext, Variables,
    },
    schema::{SchemaBuilder, SchemaError, model::SchemaType},
    types::{FieldValue, Resolver, TypeResolver},
    value::{Object, ScalarValue, Value},
};

/// An error that prevented operation execution.
#[derive(Clone, Debug, Display, Error, From, PartialEq)]
pub enum GraphQLError {
    /// The document is not syntactically valid.
    #[display("{_0}")]
    ParseError(#[error(not(source))] String),

    /// The document defines no operation.
    #[display("No operation provided")]
    NoOperationProvided,

    /// The document defines several operations, and none was picked by name.
    #[display("Multiple operations provided")]
    MultipleOperationsProvided,

    /// The document has no operation with the requested name.
    #[display("Unknown operation name")]
    UnknownOperationName,

    /// The operation is a subscription, which this engine does not execute.
    #[display("Operation is a subscription")]
    IsSubscription,

    /// The schema has no root type for the operation.
    #[display("Schema is not configured for {_0}s")]
    MissingRootType(#[error(not(source))] OperationType),

    /// Cost analysis failed, or the operation is over a cost limit.
    #[display("{_0}")]
    #[from]
    Cost(CostError),

    /// The operation is over a cost limit, and its costs are reported along
    /// with the rejection.
    #[display("{error}")]
    CostReport {
        /// Limit the operation is over.
        error: CostError,
        /// Computed costs of the operation.
        metrics: CostMetrics,
    },
}

impl GraphQLError {
    /// Code reported in the `extensions` of the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ParseError(_) => "GRAPHQL_PARSE_FAILED",
            Self::NoOperationProvided
            | Self::MultipleOperationsProvided
            | Self::UnknownOperationName
            | Self::IsSubscription
            | Self::MissingRootType(_) => "GRAPHQL_VALIDATION_FAILED",
            Self::Cost(e) | Self::CostReport { error: e, .. } => e.code(),
        }
    }
}
