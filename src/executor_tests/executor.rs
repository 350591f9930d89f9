mod field_execution {
    use pretty_assertions::assert_eq;

    use crate::{
        Engine, EngineConfig, FieldValue, InputValue, RequestContext, Resolver, Variables,
        executor_tests::{run, run_with, schema},
    };

    const SDL: &str = r#"
        type Query {
            a: String
            b: Int
            pic(size: Int = 50): String
            deep: Deep
        }

        type Deep {
            a: String
            c: [String]
            deeper: [Deep]
        }
    "#;

    fn data_schema() -> crate::SchemaType {
        schema(SDL, |b| {
            b.resolver("Query", "a", Resolver::constant("Apple"))
                .resolver("Query", "b", Resolver::constant(42))
                .resolver(
                    "Query",
                    "pic",
                    Resolver::sync(|ctx| {
                        let size: i32 = ctx.arg("size")?;
                        Ok(FieldValue::value(format!("Pic of size: {size}")))
                    }),
                )
                .resolver(
                    "Query",
                    "deep",
                    Resolver::constant(graphql_value!({
                        "a": "Already Been Done",
                        "c": ["Contrived", null, "Confusing"],
                        "deeper": [{ "a": "Boring" }, null],
                    })),
                )
        })
    }

    #[tokio::test]
    async fn test() {
        let engine = Engine::new(data_schema(), EngineConfig::default());
        let doc = r"
          query Example($size: Int) {
            a
            b
            x: a
            ...c
            pic(size: $size)
            deep {
              a
              c
              deeper {
                a
              }
            }
            __typename
          }

          fragment c on Query {
            b
          }";
        let vars = [("size".to_owned(), InputValue::scalar(100))]
            .into_iter()
            .collect::<Variables>();

        let (result, errs) = run_with(&engine, doc, &vars, &RequestContext::new()).await;

        assert_eq!(errs, []);
        assert_eq!(
            result,
            graphql_value!({
                "a": "Apple",
                "b": 42,
                "x": "Apple",
                "pic": "Pic of size: 100",
                "deep": {
                    "a": "Already Been Done",
                    "c": ["Contrived", null, "Confusing"],
                    "deeper": [{ "a": "Boring" }, null],
                },
                "__typename": "Query",
            }),
        );
        assert_eq!(
            crate::executor_tests::keys(&result),
            ["a", "b", "x", "pic", "deep", "__typename"],
        );
    }

    #[tokio::test]
    async fn argument_default() {
        let (result, errs) = run(data_schema(), "{ pic }").await;

        assert_eq!(errs, []);
        assert_eq!(result, graphql_value!({ "pic": "Pic of size: 50" }));
    }

    #[tokio::test]
    async fn root_value_feeds_default_resolvers() {
        let schema = schema("type Query { greeting: String missing: String }", |b| b);
        let engine = Engine::new(schema, EngineConfig::default());
        let ctx = RequestContext::new().with_root_value(graphql_value!({ "greeting": "hi" }));

        let (result, errs) =
            run_with(&engine, "{ greeting missing }", &Variables::new(), &ctx).await;

        assert_eq!(errs, []);
        assert_eq!(result, graphql_value!({ "greeting": "hi", "missing": null }));
    }

    #[tokio::test]
    async fn field_without_resolver() {
        let schema = schema("type Query { orphan: String }", |b| b);

        let (result, errs) = run(schema, "{ orphan }").await;

        assert_eq!(result, graphql_value!({ "orphan": null }));
        assert_eq!(
            crate::executor_tests::error_paths(&errs),
            [(
                "orphan".to_owned(),
                r#"No resolver registered for field "Query.orphan""#,
            )],
        );
    }

    #[tokio::test]
    async fn unknown_field() {
        let (result, errs) = run(data_schema(), "{ a nope }").await;

        assert_eq!(result, graphql_value!({ "a": "Apple", "nope": null }));
        assert_eq!(
            crate::executor_tests::error_paths(&errs),
            [("nope".to_owned(), r#"Unknown field "nope" on type "Query""#)],
        );
    }
}

mod null_propagation {
    use pretty_assertions::assert_eq;

    use crate::{
        FieldError, FieldValue, Resolver, SchemaType,
        executor_tests::{error_paths, run, schema},
    };

    const SDL: &str = r#"
        type A {
            b: String!
            c: String
        }

        type Query {
            a: A
            strictA: A!
            ok: A
            broken: String
        }
    "#;

    fn null_schema() -> SchemaType {
        schema(SDL, |b| {
            b.resolver("Query", "a", Resolver::constant(graphql_value!({ "c": "see" })))
                .resolver("Query", "strictA", Resolver::constant(graphql_value!({ "c": "see" })))
                .resolver("Query", "ok", Resolver::constant(graphql_value!({ "b": "bee" })))
                .resolver(
                    "Query",
                    "broken",
                    Resolver::sync(|_| Err(FieldError::from("boom"))),
                )
        })
    }

    #[tokio::test]
    async fn nullable_parent_absorbs_null() {
        let (result, errs) = run(null_schema(), "{ a { b c } }").await;

        assert_eq!(result, graphql_value!({ "a": null }));
        assert_eq!(
            error_paths(&errs),
            [(
                "a.b".to_owned(),
                "Cannot return null for non-nullable field A.b.",
            )],
        );
    }

    #[tokio::test]
    async fn non_null_chain_nulls_data() {
        let (result, errs) = run(null_schema(), "{ strictA { b c } ok { b } }").await;

        assert_eq!(result, graphql_value!(null));
        assert_eq!(
            error_paths(&errs),
            [(
                "strictA.b".to_owned(),
                "Cannot return null for non-nullable field A.b.",
            )],
        );
    }

    #[tokio::test]
    async fn siblings_keep_their_values() {
        let (result, errs) = run(null_schema(), "{ a { b c } ok { b c } broken }").await;

        assert_eq!(
            result,
            graphql_value!({
                "a": null,
                "ok": { "b": "bee", "c": null },
                "broken": null,
            }),
        );
        assert_eq!(
            error_paths(&errs),
            [
                (
                    "a.b".to_owned(),
                    "Cannot return null for non-nullable field A.b.",
                ),
                ("broken".to_owned(), "boom"),
            ],
        );
    }

    #[tokio::test]
    async fn error_values_are_field_errors() {
        let schema = schema("type Query { a: Int b: Int }", |b| {
            b.resolver("Query", "a", Resolver::sync(|_| Ok(FieldValue::error("bad value"))))
                .resolver("Query", "b", Resolver::constant(1))
        });

        let (result, errs) = run(schema, "{ a b }").await;

        assert_eq!(result, graphql_value!({ "a": null, "b": 1 }));
        assert_eq!(error_paths(&errs), [("a".to_owned(), "bad value")]);
    }
}

mod lists {
    use pretty_assertions::assert_eq;

    use crate::{
        Resolver, SchemaType,
        executor_tests::{error_paths, run, schema},
    };

    const SDL: &str = r#"
        type Item { name: String! }

        type Query {
            items: [Item]
            strictItems: [Item!]
            numbers: [Int!]!
        }
    "#;

    fn list_schema() -> SchemaType {
        let items = graphql_value!([{ "name": "a" }, { "name": null }, { "name": "c" }]);
        schema(SDL, |b| {
            b.resolver("Query", "items", Resolver::constant(items.clone()))
                .resolver("Query", "strictItems", Resolver::constant(items))
                .resolver("Query", "numbers", Resolver::constant(graphql_value!([1, 2.0, 3])))
        })
    }

    #[tokio::test]
    async fn error_path_has_item_index() {
        let (result, errs) = run(list_schema(), "{ items { name } }").await;

        assert_eq!(
            result,
            graphql_value!({ "items": [{ "name": "a" }, null, { "name": "c" }] }),
        );
        assert_eq!(
            error_paths(&errs),
            [(
                "items.1.name".to_owned(),
                "Cannot return null for non-nullable field Item.name.",
            )],
        );
    }

    #[tokio::test]
    async fn non_null_items_null_the_list() {
        let (result, errs) = run(list_schema(), "{ strictItems { name } numbers }").await;

        assert_eq!(
            result,
            graphql_value!({ "strictItems": null, "numbers": [1, 2, 3] }),
        );
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs[0].path().last().map(ToString::to_string).as_deref(),
            Some("name"),
        );
    }
}

mod resolver_context {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use crate::{
        Engine, EngineConfig, FieldValue, RequestContext, Resolver, Variables,
        executor_tests::{error_paths, run_with, schema},
    };

    struct User {
        name: String,
        friends: Vec<&'static str>,
    }

    #[derive(Default)]
    struct Audit(Mutex<Vec<String>>);

    const SDL: &str = r#"
        type User {
            name: String
            friends: [User]
            greeting: String
        }

        type Query { me: User }
    "#;

    fn engine() -> Engine {
        let schema = schema(SDL, |b| {
            b.resolver(
                "Query",
                "me",
                Resolver::sync(|_| {
                    Ok(FieldValue::object(User {
                        name: "ann".into(),
                        friends: vec!["bob", "cid"],
                    }))
                }),
            )
            .resolver(
                "User",
                "name",
                Resolver::sync(|ctx| {
                    let user = ctx.parent::<User>().ok_or("not a user")?;
                    Ok(FieldValue::value(user.name.as_str()))
                }),
            )
            .resolver(
                "User",
                "friends",
                Resolver::sync(|ctx| {
                    let user = ctx.parent::<User>().ok_or("not a user")?;
                    Ok(FieldValue::list(user.friends.iter().map(|f| {
                        FieldValue::object(User {
                            name: (*f).into(),
                            friends: Vec::new(),
                        })
                    })))
                }),
            )
            .resolver(
                "User",
                "greeting",
                Resolver::sync(|ctx| {
                    let depth = ctx.ancestors().filter(|a| a.is::<User>()).count();
                    let prefix = ctx.state::<String>("prefix").ok_or("no prefix")?;
                    if let Some(audit) = ctx.data::<Arc<Audit>>() {
                        audit.0.lock().push(ctx.path().to_string());
                    }
                    if depth > 1 {
                        ctx.push_error(format!("nested greeting at depth {depth}"));
                    }
                    Ok(FieldValue::value(format!("{prefix} ({depth})")))
                }),
            )
        });
        Engine::new(schema, EngineConfig::default())
    }

    #[tokio::test]
    async fn parents_state_and_pushed_errors() {
        let audit = Arc::new(Audit::default());
        let ctx = RequestContext::new()
            .with_state("prefix", String::from("hello"))
            .with_data(audit.clone());

        let (result, errs) = run_with(
            &engine(),
            "{ me { name greeting friends { name greeting } } }",
            &Variables::new(),
            &ctx,
        )
        .await;

        assert_eq!(
            result,
            graphql_value!({
                "me": {
                    "name": "ann",
                    "greeting": "hello (1)",
                    "friends": [
                        { "name": "bob", "greeting": "hello (2)" },
                        { "name": "cid", "greeting": "hello (2)" },
                    ],
                },
            }),
        );
        assert_eq!(
            error_paths(&errs),
            [
                ("me.friends.0.greeting".to_owned(), "nested greeting at depth 2"),
                ("me.friends.1.greeting".to_owned(), "nested greeting at depth 2"),
            ],
        );
        assert_eq!(
            *audit.0.lock(),
            ["me.greeting", "me.friends[0].greeting", "me.friends[1].greeting"],
        );
    }
}

mod leaf_coercion {
    use pretty_assertions::assert_eq;

    use crate::{
        Resolver,
        executor_tests::{error_paths, run, schema},
    };

    #[tokio::test]
    async fn built_in_scalars() {
        let schema = schema(
            "type Query { s: String t: String id: ID n: Int f: Float bad: Int flag: Boolean }",
            |b| {
                b.resolver("Query", "s", Resolver::constant(7))
                    .resolver("Query", "t", Resolver::constant(true))
                    .resolver("Query", "id", Resolver::constant(12))
                    .resolver("Query", "n", Resolver::constant(3.0))
                    .resolver("Query", "f", Resolver::constant(2))
                    .resolver("Query", "bad", Resolver::constant("x"))
                    .resolver("Query", "flag", Resolver::constant("yes"))
            },
        );

        let (result, errs) = run(schema, "{ s t id n f bad flag }").await;

        assert_eq!(
            result,
            graphql_value!({
                "s": "7",
                "t": "true",
                "id": "12",
                "n": 3,
                "f": 2.0,
                "bad": null,
                "flag": null,
            }),
        );
        assert_eq!(
            error_paths(&errs),
            [
                ("bad".to_owned(), r#"Int cannot represent value: "x""#),
                ("flag".to_owned(), r#"Boolean cannot represent value: "yes""#),
            ],
        );
    }
}
