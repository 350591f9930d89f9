//! Request entry point tying parsing, cost admission and execution together.

use std::time::Duration;

use graphql_parser::parse_query;
use static_assertions::assert_impl_all;
use tokio_util::sync::CancellationToken;

use crate::{
    GraphQLError,
    ast::OperationType,
    config::EngineConfig,
    cost::{CostAnalyzer, CostCache, CostMetrics},
    executor::{
        ExecutionError, ExecutionPolicy, RequestContext, Variables, coerce_variable_values,
        execute_validated_query, get_operation,
    },
    schema::model::SchemaType,
    value::{Object, Value},
};

/// Result of an admitted operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// The `data` entry, `null` when nothing was executed or when a null
    /// propagated to the root.
    pub data: Value,
    /// Field errors, ordered by location and path.
    pub errors: Vec<ExecutionError>,
    /// The `extensions` entry, if anything was reported.
    pub extensions: Option<Object>,
}

/// Executes operations against a schema.
///
/// Every operation is analyzed for its cost and checked against the
/// configured limits before any of its resolvers runs.
pub struct Engine {
    schema: SchemaType,
    config: EngineConfig,
    costs: CostCache,
}

assert_impl_all!(Engine: Send, Sync);
assert_impl_all!(Response: Send, Sync);

impl Engine {
    /// Creates an engine serving `schema`.
    pub fn new(schema: SchemaType, config: EngineConfig) -> Self {
        let costs = CostCache::new(config.cost.cache_capacity);
        Self {
            schema,
            config,
            costs,
        }
    }

    /// The schema being served.
    pub fn schema(&self) -> &SchemaType {
        &self.schema
    }

    /// The settings of this engine.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The cache of operation costs.
    pub fn cost_cache(&self) -> &CostCache {
        &self.costs
    }

    /// Parses, admits and executes an operation.
    ///
    /// `operation_name` picks the operation of a document defining several.
    pub async fn execute(
        &self,
        source: &str,
        operation_name: Option<&str>,
        variables: &Variables,
        context: &RequestContext,
    ) -> Result<Response, GraphQLError> {
        let document = parse_query::<String>(source)
            .map_err(|e| GraphQLError::ParseError(e.to_string()))?
            .into_static();
        let operation = get_operation(&document, operation_name)?;
        if operation.operation_type == OperationType::Subscription {
            return Err(GraphQLError::IsSubscription);
        }
        if self.schema.root_type(operation.operation_type).is_none() {
            return Err(GraphQLError::MissingRootType(operation.operation_type));
        }

        let options = &self.config.cost;
        let operation_id = CostCache::operation_id(source, operation_name, variables);
        let metrics = self
            .costs
            .get_or_analyze(operation_id, || {
                CostAnalyzer::new(&self.schema, &document, options).analyze(&operation, variables)
            })
            .inspect_err(|e| tracing::info!(error = %e, "cost analysis failed"))?;

        if let Err(e) = options.admit(metrics) {
            tracing::warn!(
                field_cost = metrics.field_cost,
                type_cost = metrics.type_cost,
                "operation rejected: {e}",
            );
            return Err(if options.mode.reports() {
                GraphQLError::CostReport { error: e, metrics }
            } else {
                e.into()
            });
        }
        let extensions = options.mode.reports().then(|| cost_extension(metrics));
        if !options.mode.executes() {
            return Ok(Response {
                data: Value::null(),
                errors: Vec::new(),
                extensions,
            });
        }

        let variables = coerce_variable_values(&operation, variables);
        let policy = ExecutionPolicy::for_operation(
            operation.operation_type,
            self.config.execution.serial,
        );
        let cancellation = CancellationToken::new();
        let execution = execute_validated_query(
            &document,
            &operation,
            &self.schema,
            &variables,
            context,
            policy,
            cancellation.clone(),
        );

        let (data, errors) = match self.config.execution.timeout {
            None => execution.await?,
            Some(timeout) => {
                tokio::pin!(execution);
                tokio::select! {
                    res = &mut execution => res?,
                    () = tokio::time::sleep(timeout) => {
                        cancel(&cancellation, timeout);
                        execution.await?
                    }
                }
            }
        };

        Ok(Response {
            data,
            errors,
            extensions,
        })
    }
}

fn cancel(cancellation: &CancellationToken, timeout: Duration) {
    tracing::warn!(?timeout, "request timed out");
    cancellation.cancel();
}

fn cost_extension(metrics: CostMetrics) -> Object {
    let mut cost = Object::with_capacity(2);
    cost.add_field("fieldCost", Value::scalar(metrics.field_cost));
    cost.add_field("typeCost", Value::scalar(metrics.type_cost));

    let mut extensions = Object::with_capacity(1);
    extensions.add_field("cost", Value::object(cost));
    extensions
}
