mod abstract_types;
mod batching;
mod directives;
mod executor;
mod scheduling;
mod variables;

use crate::{
    Engine, EngineConfig, ExecutionError, RequestContext, SchemaBuilder, SchemaType, Value,
    Variables,
};

fn schema(sdl: &str, build: impl FnOnce(SchemaBuilder) -> SchemaBuilder) -> SchemaType {
    build(SchemaBuilder::from_sdl(sdl).unwrap()).finish().unwrap()
}

async fn run_with(
    engine: &Engine,
    query: &str,
    vars: &Variables,
    ctx: &RequestContext,
) -> (Value, Vec<ExecutionError>) {
    let response = engine
        .execute(query, None, vars, ctx)
        .await
        .unwrap_or_else(|e| panic!("execution failed: {e}"));
    (response.data, response.errors)
}

async fn run(schema: SchemaType, query: &str) -> (Value, Vec<ExecutionError>) {
    let engine = Engine::new(schema, EngineConfig::default());
    run_with(&engine, query, &Variables::new(), &RequestContext::new()).await
}

/// Errors as `(path, message)` pairs.
fn error_paths(errors: &[ExecutionError]) -> Vec<(String, &str)> {
    errors
        .iter()
        .map(|e| {
            let path = e.path().iter().map(ToString::to_string).collect::<Vec<_>>();
            (path.join("."), e.error().message())
        })
        .collect()
}

fn keys(value: &Value) -> Vec<&str> {
    value.as_object_value().unwrap().keys().collect()
}
