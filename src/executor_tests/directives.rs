use pretty_assertions::assert_eq;

use crate::{
    Engine, EngineConfig, InputValue, RequestContext, Resolver, Value, Variables,
    executor_tests::{keys, run_with, schema},
};

fn engine() -> Engine {
    let schema = schema("type Query { a: String b: String }", |b| {
        b.resolver("Query", "a", Resolver::constant("a"))
            .resolver("Query", "b", Resolver::constant("b"))
    });
    Engine::new(schema, EngineConfig::default())
}

async fn run_variable_query(query: &str, vars: &[(&str, bool)]) -> Value {
    let vars = vars
        .iter()
        .map(|(name, v)| ((*name).to_owned(), InputValue::scalar(*v)))
        .collect::<Variables>();

    let (result, errs) = run_with(&engine(), query, &vars, &RequestContext::new()).await;

    assert_eq!(errs, []);
    result
}

async fn run_query(query: &str) -> Value {
    run_variable_query(query, &[]).await
}

mod field {
    use pretty_assertions::assert_eq;

    use super::run_query;

    #[tokio::test]
    async fn scalar_include_true() {
        let result = run_query("{ a, b @include(if: true) }").await;
        assert_eq!(result, graphql_value!({ "a": "a", "b": "b" }));
    }

    #[tokio::test]
    async fn scalar_include_false() {
        let result = run_query("{ a, b @include(if: false) }").await;
        assert_eq!(result, graphql_value!({ "a": "a" }));
    }

    #[tokio::test]
    async fn scalar_skip_false() {
        let result = run_query("{ a, b @skip(if: false) }").await;
        assert_eq!(result, graphql_value!({ "a": "a", "b": "b" }));
    }

    #[tokio::test]
    async fn scalar_skip_true() {
        let result = run_query("{ a, b @skip(if: true) }").await;
        assert_eq!(result, graphql_value!({ "a": "a" }));
    }

    #[tokio::test]
    async fn skip_wins_over_include() {
        let result = run_query("{ a, b @include(if: true) @skip(if: true) }").await;
        assert_eq!(result, graphql_value!({ "a": "a" }));
    }
}

mod fragment_spread {
    use pretty_assertions::assert_eq;

    use super::run_query;

    #[tokio::test]
    async fn include_true() {
        let result =
            run_query("{ a, ...Frag @include(if: true) } fragment Frag on Query { b }").await;
        assert_eq!(result, graphql_value!({ "a": "a", "b": "b" }));
    }

    #[tokio::test]
    async fn include_false() {
        let result =
            run_query("{ a, ...Frag @include(if: false) } fragment Frag on Query { b }").await;
        assert_eq!(result, graphql_value!({ "a": "a" }));
    }

    #[tokio::test]
    async fn skip_true() {
        let result = run_query("{ a, ...Frag @skip(if: true) } fragment Frag on Query { b }").await;
        assert_eq!(result, graphql_value!({ "a": "a" }));
    }
}

mod inline_fragment {
    use pretty_assertions::assert_eq;

    use super::run_query;

    #[tokio::test]
    async fn include_true() {
        let result = run_query("{ a, ... on Query @include(if: true) { b } }").await;
        assert_eq!(result, graphql_value!({ "a": "a", "b": "b" }));
    }

    #[tokio::test]
    async fn skip_true() {
        let result = run_query("{ a, ... on Query @skip(if: true) { b } }").await;
        assert_eq!(result, graphql_value!({ "a": "a" }));
    }

    #[tokio::test]
    async fn anonymous_skip_false() {
        let result = run_query("{ a, ... @skip(if: false) { b } }").await;
        assert_eq!(result, graphql_value!({ "a": "a", "b": "b" }));
    }
}

mod variables {
    use pretty_assertions::assert_eq;

    use super::run_variable_query;
    use crate::executor_tests::keys;

    const QUERY: &str = "query($flag: Boolean!) { a @skip(if: $flag) b @include(if: $flag) }";

    #[tokio::test]
    async fn flag_true() {
        let result = run_variable_query(QUERY, &[("flag", true)]).await;
        assert_eq!(result, graphql_value!({ "b": "b" }));
    }

    #[tokio::test]
    async fn flag_false() {
        let result = run_variable_query(QUERY, &[("flag", false)]).await;
        assert_eq!(result, graphql_value!({ "a": "a" }));
    }

    #[tokio::test]
    async fn variable_default() {
        let result = run_variable_query(
            "query($flag: Boolean = true) { a b @skip(if: $flag) }",
            &[],
        )
        .await;
        assert_eq!(result, graphql_value!({ "a": "a" }));
    }

    #[tokio::test]
    async fn skipped_first_occurrence_keeps_later_position() {
        let result = run_variable_query(
            "query($flag: Boolean!) { b @skip(if: $flag) a b }",
            &[("flag", true)],
        )
        .await;
        assert_eq!(keys(&result), ["a", "b"]);
    }
}

#[tokio::test]
async fn included_duplicate_keeps_first_position() {
    let result = run_query("{ b a b @include(if: true) }").await;
    assert_eq!(keys(&result), ["b", "a"]);
}
