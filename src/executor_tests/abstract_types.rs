use arcstr::literal;
use pretty_assertions::assert_eq;

use crate::{
    FieldValue, Resolver, SchemaType, TypeResolver, Value,
    executor_tests::{error_paths, run, schema},
};

const SDL: &str = r#"
    interface Pet { name: String }

    type Cat implements Pet {
        name: String
        lives: Int
    }

    type Dog implements Pet {
        name: String
        barks: Boolean
    }

    union Thing = Cat | Dog

    type Query {
        pets: [Pet]
        things: [Thing]
        tagged: Pet
        stray: Pet
        impostor: Pet
    }
"#;

fn pets_schema() -> SchemaType {
    schema(SDL, |b| {
        b.resolver(
            "Query",
            "pets",
            Resolver::constant(graphql_value!([
                { "__typename": "Cat", "name": "Tom", "lives": 9 },
                { "__typename": "Dog", "name": "Rex", "barks": true },
            ])),
        )
        .resolver(
            "Query",
            "things",
            Resolver::constant(graphql_value!([
                { "kind": "dog", "name": "Fido", "barks": false },
                { "kind": "cat", "name": "Kit", "lives": 3 },
            ])),
        )
        .type_resolver(
            "Thing",
            TypeResolver::new(|value| {
                let kind = value
                    .downcast_ref::<Value>()?
                    .as_object_value()?
                    .get_field_value("kind")?
                    .as_string_value()?;
                Some(if kind == "cat" { literal!("Cat") } else { literal!("Dog") })
            }),
        )
        .resolver(
            "Query",
            "tagged",
            Resolver::sync(|_| {
                Ok(
                    FieldValue::value(graphql_value!({ "name": "Spot", "barks": true }))
                        .with_type("Dog"),
                )
            }),
        )
        .resolver(
            "Query",
            "stray",
            Resolver::constant(graphql_value!({ "name": "Nobody" })),
        )
        .resolver(
            "Query",
            "impostor",
            Resolver::sync(|_| {
                Ok(FieldValue::value(graphql_value!({ "name": "Q" })).with_type("Query"))
            }),
        )
    })
}

#[tokio::test]
async fn interface_resolved_by_typename() {
    let (result, errs) = run(
        pets_schema(),
        "{ pets { __typename name ... on Cat { lives } ... on Dog { barks } } }",
    )
    .await;

    assert_eq!(errs, []);
    assert_eq!(
        result,
        graphql_value!({
            "pets": [
                { "__typename": "Cat", "name": "Tom", "lives": 9 },
                { "__typename": "Dog", "name": "Rex", "barks": true },
            ],
        }),
    );
}

#[tokio::test]
async fn union_resolved_by_type_resolver() {
    let (result, errs) = run(
        pets_schema(),
        "{ things { __typename ...Pet ... on Cat { lives } } } fragment Pet on Pet { name }",
    )
    .await;

    assert_eq!(errs, []);
    assert_eq!(
        result,
        graphql_value!({
            "things": [
                { "__typename": "Dog", "name": "Fido" },
                { "__typename": "Cat", "name": "Kit", "lives": 3 },
            ],
        }),
    );
}

#[tokio::test]
async fn tagged_values() {
    let (result, errs) = run(pets_schema(), "{ tagged { name ... on Dog { barks } } }").await;

    assert_eq!(errs, []);
    assert_eq!(
        result,
        graphql_value!({ "tagged": { "name": "Spot", "barks": true } }),
    );
}

#[tokio::test]
async fn unresolvable_runtime_types() {
    let (result, errs) = run(pets_schema(), "{ stray { name } impostor { name } }").await;

    assert_eq!(result, graphql_value!({ "stray": null, "impostor": null }));
    let errs = error_paths(&errs);
    assert_eq!(errs.len(), 2);
    assert_eq!(errs[0].0, "stray");
    assert!(
        errs[0].1.starts_with(r#"Abstract type "Pet" must resolve to an Object type at runtime."#),
        "{}",
        errs[0].1,
    );
    assert_eq!(
        errs[1],
        (
            "impostor".to_owned(),
            r#"Runtime Object type "Query" is not a possible type for "Pet"."#,
        ),
    );
}
