//! Resolution of an operation's selection graph into a response.

mod arguments;
mod batch;
mod collect;
mod completion;
mod path;
mod pool;
mod scheduler;
mod unit;

use std::{
    any::{Any, TypeId},
    cmp::Ordering,
    collections::HashMap,
    fmt::Display,
    sync::Arc,
};

use fnv::FnvHashMap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    GraphQLError,
    ast::{Definition, Document, Operation, SourcePosition},
    schema::model::SchemaType,
    value::Value,
};

pub use self::{
    arguments::{Arguments, coerce_variable_values},
    batch::{BatchDispatch, BatchOperationHandler, DataLoader, Loader},
    collect::{FieldKind, FieldSelection, SelectionCollector},
    path::{Path, PathSegment},
    pool::{ExecutionPools, PoolStats},
    scheduler::ExecutionPolicy,
    unit::{ParentValue, ResolutionUnit, ResolverContext},
};

pub(crate) use self::{collect::is_excluded, completion::ResultTree};

/// Error type for errors that occur during query execution
///
/// All execution errors contain the source position in the query of the field
/// that failed to resolve. It also contains the path of response keys and
/// list indices leading to it.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionError {
    location: SourcePosition,
    path: Vec<PathSegment>,
    error: FieldError,
}

impl Eq for ExecutionError {}

impl PartialOrd for ExecutionError {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExecutionError {
    fn cmp(&self, other: &Self) -> Ordering {
        (
            self.location.line,
            self.location.column,
            &self.path,
            &self.error.message,
        )
            .cmp(&(
                other.location.line,
                other.location.column,
                &other.path,
                &other.error.message,
            ))
    }
}

impl ExecutionError {
    #[doc(hidden)]
    pub fn new(location: SourcePosition, path: &Path, error: FieldError) -> Self {
        Self {
            location,
            path: path.to_vec(),
            error,
        }
    }

    /// Construct an error at the root of the response.
    pub fn at_origin(error: FieldError) -> Self {
        Self {
            location: SourcePosition { line: 1, column: 1 },
            path: Vec::new(),
            error,
        }
    }

    /// The error message
    pub fn error(&self) -> &FieldError {
        &self.error
    }

    /// The source location _in the query_ of the field that failed to resolve
    pub fn location(&self) -> &SourcePosition {
        &self.location
    }

    /// The path of fields leading to the field that generated this error
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }
}

/// Error type for errors that occur during field resolution
///
/// Field errors are represented by a human-readable error message and an
/// optional `Value` structure containing additional information.
///
/// They can be converted to from any type that implements `std::fmt::Display`,
/// which makes error chaining with the `?` operator a breeze:
///
/// ```rust
/// # use juniper_engine::FieldError;
/// fn get_string(data: Vec<u8>) -> Result<String, FieldError> {
///     let s = String::from_utf8(data)?;
///     Ok(s)
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    message: String,
    extensions: Value,
}

impl<T: Display> From<T> for FieldError {
    fn from(e: T) -> Self {
        Self {
            message: e.to_string(),
            extensions: Value::null(),
        }
    }
}

impl FieldError {
    /// Construct a new [`FieldError`] with additional data.
    ///
    /// ```rust
    /// # use juniper_engine::{graphql_value, FieldError};
    /// FieldError::new(
    ///     "Could not open connection to the database",
    ///     graphql_value!({ "internal_error": "Connection refused" }),
    /// );
    /// ```
    ///
    /// The `extensions` parameter will be added to the `"extensions"` field of
    /// the `"errors"` object in response. If it's `Value::null()`, no extra
    /// data will be included.
    pub fn new<T: Display>(e: T, extensions: Value) -> Self {
        Self {
            message: e.to_string(),
            extensions,
        }
    }

    /// Returns the `"message"` field of this [`FieldError`].
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the `"extensions"` field of this [`FieldError`].
    ///
    /// If there is no `"extensions"`, then [`Value::Null`] will be returned.
    pub fn extensions(&self) -> &Value {
        &self.extensions
    }
}

/// The result of resolving the value of a field of type `T`
pub type FieldResult<T> = Result<T, FieldError>;

/// The map of variables used for substitution during query execution
pub type Variables = HashMap<String, crate::ast::InputValue>;

type SharedAny = Arc<dyn Any + Send + Sync>;

/// Per-request data threaded through every resolver call.
///
/// Holds services looked up by type, named state entries, the batch loaders
/// flushed between waves and the root value handed to top-level resolvers.
#[derive(Default)]
pub struct RequestContext {
    data: FnvHashMap<TypeId, SharedAny>,
    state: FnvHashMap<String, SharedAny>,
    dispatchers: Vec<Arc<dyn BatchDispatch>>,
    root_value: Option<SharedAny>,
}

impl RequestContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service, replacing any previous one of the same type.
    #[must_use]
    pub fn with_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.data.insert(TypeId::of::<T>(), Arc::new(data));
        self
    }

    /// Registers a named state entry.
    #[must_use]
    pub fn with_state<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.state.insert(key.into(), Arc::new(value));
        self
    }

    /// Registers a [`DataLoader`], both as a service and as a source flushed
    /// by the [`BatchOperationHandler`].
    #[must_use]
    pub fn with_loader<K, L>(mut self, loader: DataLoader<K, L>) -> Self
    where
        K: Eq + std::hash::Hash + Clone + Send + Sync + 'static,
        L: Loader<K>,
    {
        let loader = Arc::new(loader);
        self.dispatchers.push(loader.clone());
        self.data.insert(TypeId::of::<DataLoader<K, L>>(), loader);
        self
    }

    /// Sets the value top-level resolvers see as their parent.
    #[must_use]
    pub fn with_root_value<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.root_value = Some(Arc::new(value));
        self
    }

    /// Looks up a service by type.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|d| (**d).downcast_ref())
    }

    /// Looks up a named state entry.
    pub fn state<T: Any>(&self, key: &str) -> Option<&T> {
        self.state.get(key).and_then(|s| (**s).downcast_ref())
    }

    pub(crate) fn dispatchers(&self) -> &[Arc<dyn BatchDispatch>] {
        &self.dispatchers
    }

    pub(crate) fn root_value(&self) -> SharedAny {
        self.root_value
            .clone()
            .unwrap_or_else(|| Arc::new(Value::Null))
    }
}

/// Query execution engine
///
/// The executor drives the execution of one operation. It keeps track of the
/// request's variables, context, and errors, and of the selection sets
/// already collected for each object type.
pub struct Executor<'a> {
    schema: &'a SchemaType,
    variables: &'a Variables,
    context: &'a RequestContext,
    collector: SelectionCollector<'a>,
    batch: Option<BatchOperationHandler<'a>>,
    errors: Mutex<Vec<ExecutionError>>,
    cancellation: CancellationToken,
}

impl<'a> Executor<'a> {
    /// Creates an executor for the given document.
    pub fn new(
        document: &'a Document,
        schema: &'a SchemaType,
        variables: &'a Variables,
        context: &'a RequestContext,
        cancellation: CancellationToken,
    ) -> Self {
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
            variables,
            context,
            collector: SelectionCollector::new(schema, fragments, variables),
            batch: BatchOperationHandler::new(context.dispatchers()),
            errors: Mutex::new(Vec::new()),
            cancellation,
        }
    }

    /// The schema being executed against.
    pub fn schema(&self) -> &'a SchemaType {
        self.schema
    }

    /// The variables of the request.
    pub fn variables(&self) -> &'a Variables {
        self.variables
    }

    /// The context of the request.
    pub fn context(&self) -> &'a RequestContext {
        self.context
    }

    /// Add an error to the execution engine at a given path.
    pub fn push_error_at(&self, error: FieldError, path: &Path, location: SourcePosition) {
        self.errors
            .lock()
            .push(ExecutionError::new(location, path, error));
    }

    /// Whether the request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    fn into_errors(self) -> Vec<ExecutionError> {
        let mut errors = self.errors.into_inner();
        errors.sort();
        errors
    }
}

/// Picks the operation to execute from a document.
pub fn get_operation<'d>(
    document: &'d Document,
    operation_name: Option<&str>,
) -> Result<Operation<'d>, GraphQLError> {
    let mut operation = None;
    for def in &document.definitions {
        if let Definition::Operation(op) = def {
            let op = Operation::from_definition(op);
            if operation_name.is_none() && operation.is_some() {
                return Err(GraphQLError::MultipleOperationsProvided);
            }

            let move_op = operation_name.is_none() || op.name == operation_name;

            if move_op {
                operation = Some(op);
            }
        }
    }
    let op = match operation {
        Some(op) => op,
        None if operation_name.is_some() => return Err(GraphQLError::UnknownOperationName),
        None => return Err(GraphQLError::NoOperationProvided),
    };
    Ok(op)
}

/// Executes an operation that has already been validated against the schema.
///
/// `variables` must already contain the operation's variable defaults, see
/// [`coerce_variable_values()`].
pub async fn execute_validated_query(
    document: &Document,
    operation: &Operation<'_>,
    schema: &SchemaType,
    variables: &Variables,
    context: &RequestContext,
    policy: ExecutionPolicy,
    cancellation: CancellationToken,
) -> Result<(Value, Vec<ExecutionError>), GraphQLError> {
    let root_type = schema
        .root_type(operation.operation_type)
        .ok_or(GraphQLError::MissingRootType(operation.operation_type))?;

    let executor = Executor::new(document, schema, variables, context, cancellation);
    let value = executor
        .execute_root(root_type, operation.selection_set, context.root_value(), policy)
        .await;

    Ok((value, executor.into_errors()))
}
