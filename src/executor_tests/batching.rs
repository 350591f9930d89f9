use std::collections::HashMap;

use async_trait::async_trait;
use futures::FutureExt as _;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::{
    DataLoader, Engine, EngineConfig, FieldError, FieldValue, Loader, RequestContext, Resolver,
    Value, Variables,
    executor::ExecutionError,
    executor_tests::{error_paths, run_with, schema},
};

#[derive(Default)]
struct Names {
    calls: Mutex<Vec<Vec<i32>>>,
    fail: bool,
}

#[async_trait]
impl Loader<i32> for Names {
    type Value = String;
    type Error = String;

    async fn load(&self, keys: &[i32]) -> Result<HashMap<i32, String>, String> {
        self.calls.lock().push(keys.to_vec());
        if self.fail {
            return Err("backend unavailable".into());
        }
        Ok(keys.iter().map(|k| (*k, format!("user{k}"))).collect())
    }
}

type NameLoader = DataLoader<i32, Names>;

const SDL: &str = r#"
    type User {
        id: Int
        name: String
        bestFriend: User
    }

    type Query { users: [User] }
"#;

fn engine() -> Engine {
    let schema = schema(SDL, |b| {
        b.resolver(
            "Query",
            "users",
            Resolver::sync(|_| Ok(FieldValue::list((1..=3).map(FieldValue::object)))),
        )
        .resolver(
            "User",
            "id",
            Resolver::sync(|ctx| Ok(FieldValue::value(ctx.parent::<i32>().copied()))),
        )
        .resolver(
            "User",
            "name",
            Resolver::new(|ctx| {
                async move {
                    let (Some(id), Some(loader)) = (ctx.parent::<i32>(), ctx.data::<NameLoader>())
                    else {
                        return Err(FieldError::from("no user to load"));
                    };
                    loader.load(*id).await.map(FieldValue::value)
                }
                .boxed()
            }),
        )
        .resolver(
            "User",
            "bestFriend",
            Resolver::sync(|ctx| {
                let id = ctx.parent::<i32>().ok_or("no user")?;
                Ok(FieldValue::object(id % 3 + 1))
            }),
        )
    });
    Engine::new(schema, EngineConfig::default())
}

async fn run_batched(query: &str, names: Names) -> (Value, Vec<ExecutionError>, Vec<Vec<i32>>) {
    let ctx = RequestContext::new().with_loader(DataLoader::new(names));

    let (result, errs) = run_with(&engine(), query, &Variables::new(), &ctx).await;

    let loader = ctx.data::<NameLoader>().unwrap();
    let calls = loader.loader().calls.lock().clone();
    assert_eq!(loader.dispatched_batches(), calls.len());
    (result, errs, calls)
}

#[tokio::test]
async fn one_batch_per_wave() {
    let (result, errs, calls) =
        run_batched("{ users { id name bestFriend { name } } }", Names::default()).await;

    assert_eq!(errs, []);
    assert_eq!(
        result,
        graphql_value!({
            "users": [
                { "id": 1, "name": "user1", "bestFriend": { "name": "user2" } },
                { "id": 2, "name": "user2", "bestFriend": { "name": "user3" } },
                { "id": 3, "name": "user3", "bestFriend": { "name": "user1" } },
            ],
        }),
    );
    assert_eq!(calls, [vec![1, 2, 3], vec![2, 3, 1]]);
}

#[tokio::test]
async fn duplicate_keys_are_loaded_once() {
    let (result, errs, calls) =
        run_batched("{ users { name } again: users { name } }", Names::default()).await;

    assert_eq!(errs, []);
    assert_eq!(
        result.as_object_value().unwrap().get_field_value("again"),
        Some(&graphql_value!([
            { "name": "user1" },
            { "name": "user2" },
            { "name": "user3" },
        ])),
    );
    assert_eq!(calls, [vec![1, 2, 3]]);
}

#[tokio::test]
async fn failed_batch_fails_every_waiting_field() {
    let names = Names {
        fail: true,
        ..Names::default()
    };

    let (result, errs, calls) = run_batched("{ users { name } }", names).await;

    assert_eq!(
        result,
        graphql_value!({ "users": [{ "name": null }, { "name": null }, { "name": null }] }),
    );
    assert_eq!(
        error_paths(&errs),
        [
            ("users.0.name".to_owned(), "backend unavailable"),
            ("users.1.name".to_owned(), "backend unavailable"),
            ("users.2.name".to_owned(), "backend unavailable"),
        ],
    );
    assert_eq!(calls.len(), 1);
}
