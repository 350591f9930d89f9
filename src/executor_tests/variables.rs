use pretty_assertions::assert_eq;

use crate::{
    Engine, EngineConfig, FieldValue, RequestContext, Resolver, Value, Variables,
    executor::ExecutionError,
    executor_tests::{error_paths, run_with, schema},
};

const SDL: &str = r#"
    enum Color { RED GREEN }

    input Point {
        x: Int!
        y: Int = 0
    }

    type Query {
        echo(value: String): String
        sum(n: [Int]): Int
        color(c: Color): Color
        point(p: Point): String
        need(v: Int!): Int
        num(n: Int): Int
    }
"#;

fn engine() -> Engine {
    let schema = schema(SDL, |b| {
        b.resolver(
            "Query",
            "echo",
            Resolver::sync(|ctx| Ok(FieldValue::value(ctx.arg::<Option<String>>("value")?))),
        )
        .resolver(
            "Query",
            "sum",
            Resolver::sync(|ctx| {
                let n = ctx.arg::<Option<Vec<i32>>>("n")?.unwrap_or_default();
                Ok(FieldValue::value(n.iter().sum::<i32>()))
            }),
        )
        .resolver(
            "Query",
            "color",
            Resolver::sync(|ctx| Ok(FieldValue::value(ctx.arg::<String>("c")?))),
        )
        .resolver(
            "Query",
            "point",
            Resolver::sync(|ctx| {
                Ok(FieldValue::value(
                    ctx.args().get_input_value("p").map(ToString::to_string),
                ))
            }),
        )
        .resolver(
            "Query",
            "need",
            Resolver::sync(|ctx| Ok(FieldValue::value(ctx.arg::<i32>("v")?))),
        )
        .resolver(
            "Query",
            "num",
            Resolver::sync(|ctx| Ok(FieldValue::value(ctx.arg::<Option<i32>>("n")?))),
        )
    });
    Engine::new(schema, EngineConfig::default())
}

async fn run_json(query: &str, vars: &str) -> (Value, Vec<ExecutionError>) {
    let vars = serde_json::from_str::<Variables>(vars).unwrap();
    run_with(&engine(), query, &vars, &RequestContext::new()).await
}

#[tokio::test]
async fn input_object_from_variables() {
    let (result, errs) = run_json(
        "query($p: Point) { point(p: $p) }",
        r#"{"p": {"y": 5, "x": 1}}"#,
    )
    .await;

    assert_eq!(errs, []);
    assert_eq!(result, graphql_value!({ "point": "{x: 1, y: 5}" }));
}

#[tokio::test]
async fn input_object_field_defaults() {
    let (result, errs) = run_json("{ point(p: { x: 2 }) }", "{}").await;

    assert_eq!(errs, []);
    assert_eq!(result, graphql_value!({ "point": "{x: 2, y: 0}" }));
}

#[tokio::test]
async fn variable_defaults_and_list_coercion() {
    let (result, errs) = run_json(
        "query($n: [Int] = [1, 2], $v: String) { total: sum(n: $n) single: sum(n: 4) echo(value: $v) }",
        "{}",
    )
    .await;

    assert_eq!(errs, []);
    assert_eq!(
        result,
        graphql_value!({ "total": 3, "single": 4, "echo": null }),
    );
}

#[tokio::test]
async fn supplied_variables_win_over_defaults() {
    let (result, errs) = run_json(
        "query($n: [Int] = [1, 2]) { sum(n: $n) }",
        r#"{"n": [10, 20, 30]}"#,
    )
    .await;

    assert_eq!(errs, []);
    assert_eq!(result, graphql_value!({ "sum": 60 }));
}

#[tokio::test]
async fn enums() {
    let (result, errs) = run_json("{ color(c: GREEN) bad: color(c: BLUE) }", "{}").await;

    assert_eq!(result, graphql_value!({ "color": "GREEN", "bad": null }));
    assert_eq!(
        error_paths(&errs),
        [(
            "bad".to_owned(),
            r#"Argument "c" has invalid value BLUE: Value "BLUE" does not exist in "Color" enum."#,
        )],
    );
}

#[tokio::test]
async fn invalid_arguments_fail_only_their_field() {
    let (result, errs) = run_json(
        r#"{ num(n: "x") ok: echo(value: "fine") need point(p: { y: 1 }) }"#,
        "{}",
    )
    .await;

    assert_eq!(
        result,
        graphql_value!({ "num": null, "ok": "fine", "need": null, "point": null }),
    );
    assert_eq!(
        error_paths(&errs),
        [
            (
                "num".to_owned(),
                r#"Argument "n" has invalid value "x": Expected "Int", found "x"."#,
            ),
            (
                "need".to_owned(),
                r#"Argument "v" of required type "Int!" was not provided."#,
            ),
            (
                "point".to_owned(),
                r#"Argument "p" has invalid value {y: 1}: Field "Point.x" of required type "Int!" was not provided."#,
            ),
        ],
    );
}
