use std::{sync::Arc, time::Duration};

use futures::FutureExt as _;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::{sync::Barrier, time::sleep};

use crate::{
    Engine, EngineConfig, ExecutionOptions, FieldValue, RequestContext, Resolver, SchemaType,
    Variables,
    executor_tests::{error_paths, keys, run, run_with, schema},
};

#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Resolver logging its start and end around a sleep of `millis`.
fn timed(name: &'static str, millis: u64) -> Resolver {
    Resolver::new(move |ctx| {
        async move {
            let log = ctx.data::<Log>().cloned().unwrap_or_default();
            log.push(format!("start {name}"));
            sleep(Duration::from_millis(millis)).await;
            log.push(format!("end {name}"));
            Ok(FieldValue::value(name))
        }
        .boxed()
    })
}

#[tokio::test]
async fn output_order_ignores_completion_order() {
    let schema = schema(
        "type Item { value: Int } type Query { slow: String fast: String items: [Item] }",
        |b| {
            b.resolver("Query", "slow", timed("slow", 30))
                .resolver("Query", "fast", timed("fast", 0))
                .resolver(
                    "Query",
                    "items",
                    Resolver::sync(|_| Ok(FieldValue::list((0..3).map(FieldValue::object)))),
                )
                .resolver(
                    "Item",
                    "value",
                    Resolver::new(|ctx| {
                        async move {
                            let i = ctx.parent::<i32>().copied().unwrap_or_default();
                            sleep(Duration::from_millis(10 * (3 - i as u64))).await;
                            Ok(FieldValue::value(i))
                        }
                        .boxed()
                    }),
                )
        },
    );

    let (result, errs) = run(schema, "{ slow fast items { value } }").await;

    assert_eq!(errs, []);
    assert_eq!(
        result,
        graphql_value!({
            "slow": "slow",
            "fast": "fast",
            "items": [{ "value": 0 }, { "value": 1 }, { "value": 2 }],
        }),
    );
    assert_eq!(keys(&result), ["slow", "fast", "items"]);
}

#[tokio::test]
async fn query_fields_of_a_wave_run_concurrently() {
    let wait = || {
        Resolver::new(|ctx| {
            async move {
                if let Some(barrier) = ctx.data::<Barrier>() {
                    barrier.wait().await;
                }
                Ok(FieldValue::value(true))
            }
            .boxed()
        })
    };
    let schema = schema("type Query { left: Boolean right: Boolean }", |b| {
        b.resolver("Query", "left", wait()).resolver("Query", "right", wait())
    });
    let engine = Engine::new(schema, EngineConfig::default());
    let ctx = RequestContext::new().with_data(Barrier::new(2));

    let (result, errs) = tokio::time::timeout(
        Duration::from_secs(5),
        run_with(&engine, "{ left right }", &Variables::new(), &ctx),
    )
    .await
    .expect("both fields should be awaited together");

    assert_eq!(errs, []);
    assert_eq!(result, graphql_value!({ "left": true, "right": true }));
}

mod root_fields {
    use pretty_assertions::assert_eq;

    use super::{Log, timed};
    use crate::{
        Engine, EngineConfig, FieldValue, RequestContext, Resolver, SchemaType, Variables,
        executor_tests::{run_with, schema},
    };

    const SDL: &str = r#"
        type Step { label: String }

        type Query {
            first: Step
            second: Step
        }

        type Mutation {
            first: Step
            second: Step
        }
    "#;

    fn step(name: &'static str) -> Resolver {
        Resolver::sync(move |ctx| {
            if let Some(log) = ctx.data::<Log>() {
                log.push(name);
            }
            Ok(FieldValue::value(graphql_value!({ "name": name })))
        })
    }

    fn steps_schema() -> SchemaType {
        let label = Resolver::sync(|ctx| {
            let name = ctx
                .parent_value()
                .and_then(|v| v.as_object_value()?.get_field_value("name")?.as_string_value())
                .unwrap_or_default();
            let label = format!("{name}.label");
            if let Some(log) = ctx.data::<Log>() {
                log.push(label.as_str());
            }
            Ok(FieldValue::value(label))
        });

        schema(SDL, |b| {
            b.resolver("Query", "first", step("first"))
                .resolver("Query", "second", step("second"))
                .resolver("Mutation", "first", step("first"))
                .resolver("Mutation", "second", step("second"))
                .resolver("Step", "label", label)
        })
    }

    async fn log_of(query: &str) -> Vec<String> {
        let engine = Engine::new(steps_schema(), EngineConfig::default());
        let log = Log::default();
        let ctx = RequestContext::new().with_data(log.clone());

        let (_, errs) = run_with(&engine, query, &Variables::new(), &ctx).await;
        assert_eq!(errs, []);
        log.entries()
    }

    #[tokio::test]
    async fn query_resolves_wave_by_wave() {
        assert_eq!(
            log_of("{ first { label } second { label } }").await,
            ["first", "second", "first.label", "second.label"],
        );
    }

    #[tokio::test]
    async fn mutation_completes_each_root_field_before_the_next() {
        assert_eq!(
            log_of("mutation { first { label } second { label } }").await,
            ["first", "first.label", "second", "second.label"],
        );
    }

    #[tokio::test]
    async fn mutation_root_fields_do_not_overlap() {
        let schema = schema(
            "type Query { noop: String } type Mutation { first: String second: String }",
            |b| {
                b.resolver("Mutation", "first", timed("first", 20))
                    .resolver("Mutation", "second", timed("second", 0))
            },
        );
        let engine = Engine::new(schema, EngineConfig::default());
        let log = Log::default();
        let ctx = RequestContext::new().with_data(log.clone());

        let (_, errs) =
            run_with(&engine, "mutation { first second }", &Variables::new(), &ctx).await;

        assert_eq!(errs, []);
        assert_eq!(
            log.entries(),
            ["start first", "end first", "start second", "end second"],
        );
    }
}

fn serial_engine(schema: SchemaType) -> Engine {
    Engine::new(
        schema,
        EngineConfig {
            execution: ExecutionOptions {
                serial: true,
                ..ExecutionOptions::default()
            },
            ..EngineConfig::default()
        },
    )
}

#[tokio::test]
async fn serial_policy_runs_one_field_at_a_time() {
    let schema = schema("type Query { a: String b: String }", |b| {
        b.resolver("Query", "a", timed("a", 20))
            .resolver("Query", "b", timed("b", 0))
    });
    let log = Log::default();
    let ctx = RequestContext::new().with_data(log.clone());

    let (result, errs) = run_with(&serial_engine(schema), "{ a b }", &Variables::new(), &ctx).await;

    assert_eq!(errs, []);
    assert_eq!(result, graphql_value!({ "a": "a", "b": "b" }));
    assert_eq!(log.entries(), ["start a", "end a", "start b", "end b"]);
}

fn timeout_engine(schema: SchemaType, millis: u64) -> Engine {
    Engine::new(
        schema,
        EngineConfig {
            execution: ExecutionOptions {
                timeout: Some(Duration::from_millis(millis)),
                ..ExecutionOptions::default()
            },
            ..EngineConfig::default()
        },
    )
}

#[tokio::test]
async fn timeout_lets_running_resolvers_finish() {
    let schema = schema("type Query { slow: String fast: Int }", |b| {
        b.resolver("Query", "slow", timed("slow", 100))
            .resolver("Query", "fast", Resolver::constant(1))
    });
    let log = Log::default();
    let ctx = RequestContext::new().with_data(log.clone());

    let (result, errs) = run_with(
        &timeout_engine(schema, 10),
        "{ slow fast }",
        &Variables::new(),
        &ctx,
    )
    .await;

    assert_eq!(errs, []);
    assert_eq!(result, graphql_value!({ "slow": "slow", "fast": 1 }));
    assert_eq!(log.entries(), ["start slow", "end slow"]);
}

#[tokio::test]
async fn timeout_stops_before_the_next_wave() {
    let schema = schema("type Inner { value: String } type Query { outer: Inner }", |b| {
        b.resolver(
            "Query",
            "outer",
            Resolver::new(|_| {
                async {
                    sleep(Duration::from_millis(100)).await;
                    Ok(FieldValue::value(graphql_value!({})))
                }
                .boxed()
            }),
        )
        .resolver("Inner", "value", timed("value", 0))
    });
    let log = Log::default();
    let ctx = RequestContext::new().with_data(log.clone());

    let (result, errs) = run_with(
        &timeout_engine(schema, 10),
        "{ outer { value } }",
        &Variables::new(),
        &ctx,
    )
    .await;

    assert_eq!(result, graphql_value!({ "outer": { "value": null } }));
    assert_eq!(
        error_paths(&errs),
        [("outer.value".to_owned(), "Execution was cancelled")],
    );
    assert_eq!(log.entries(), Vec::<String>::new());
}
