use std::{
    any::type_name,
    collections::HashMap,
    fmt::Display,
    future::Future,
    hash::Hash,
    mem,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use futures::{
    channel::oneshot,
    future::{join_all, select_all},
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::executor::{FieldError, FieldResult};

/// Batched data source, fetching values for many keys at once.
#[async_trait]
pub trait Loader<K>: Send + Sync + 'static
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Type of the loaded values.
    type Value: Clone + Send + Sync + 'static;

    /// Type of the error of a failed batch.
    type Error: Display + Send + 'static;

    /// Loads the values of `keys`. Keys missing from the result resolve to
    /// [`None`].
    async fn load(&self, keys: &[K]) -> Result<HashMap<K, Self::Value>, Self::Error>;
}

/// Source of batched fetches flushed by the [`BatchOperationHandler`].
#[async_trait]
pub trait BatchDispatch: Send + Sync {
    /// Whether keys were queued since the last dispatch.
    fn has_pending(&self) -> bool;

    /// Fetches all queued keys with a single load and completes their
    /// waiting futures.
    async fn dispatch(&self);

    /// Completes once a key has been queued.
    async fn queued(&self);
}

type Waiters<V> = Vec<oneshot::Sender<FieldResult<Option<V>>>>;

/// Coalesces the keys requested by resolvers of one wave into a single call of
/// its [`Loader`].
///
/// Keys are queued by [`DataLoader::load()`] and fetched when the scheduler
/// flushes the wave. Duplicate keys are fetched once.
pub struct DataLoader<K, L>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    L: Loader<K>,
{
    loader: L,
    pending: Mutex<IndexMap<K, Waiters<L::Value>>>,
    queued: Notify,
    batches: AtomicUsize,
}

impl<K, L> DataLoader<K, L>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    L: Loader<K>,
{
    /// Wraps a [`Loader`].
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            pending: Mutex::new(IndexMap::new()),
            queued: Notify::new(),
            batches: AtomicUsize::new(0),
        }
    }

    /// The wrapped [`Loader`].
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Queues a key, returning a future completing once its batch was fetched.
    ///
    /// The key is queued immediately, not when the returned future is first
    /// polled.
    pub fn load(
        &self,
        key: K,
    ) -> impl Future<Output = FieldResult<Option<L::Value>>> + Send + use<K, L> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().entry(key).or_default().push(tx);
        self.queued.notify_one();
        async move {
            rx.await
                .map_err(|_| FieldError::from("Batch load was dropped before completion"))?
        }
    }

    /// Queues many keys at once.
    pub fn load_many<I>(
        &self,
        keys: I,
    ) -> impl Future<Output = FieldResult<Vec<Option<L::Value>>>> + Send + use<K, L, I>
    where
        I: IntoIterator<Item = K>,
    {
        let loads = keys.into_iter().map(|k| self.load(k)).collect::<Vec<_>>();
        async move { join_all(loads).await.into_iter().collect() }
    }

    /// Number of batches fetched so far.
    pub fn dispatched_batches(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<K, L> BatchDispatch for DataLoader<K, L>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    L: Loader<K>,
{
    fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    async fn dispatch(&self) {
        let pending = mem::take(&mut *self.pending.lock());
        if pending.is_empty() {
            return;
        }
        let keys = pending.keys().cloned().collect::<Vec<_>>();
        self.batches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            loader = type_name::<L>(),
            keys = keys.len(),
            "dispatching batch",
        );

        match self.loader.load(&keys).await {
            Ok(mut values) => {
                for (key, waiters) in pending {
                    let value = values.remove(&key);
                    for tx in waiters {
                        _ = tx.send(Ok(value.clone()));
                    }
                }
            }
            Err(e) => {
                let error = FieldError::from(e);
                tracing::warn!(
                    loader = type_name::<L>(),
                    error = error.message(),
                    "batch load failed",
                );
                for tx in pending.into_values().flatten() {
                    _ = tx.send(Err(error.clone()));
                }
            }
        }
    }

    async fn queued(&self) {
        self.queued.notified().await;
    }
}

/// Flushes the batched fetches registered with a request once per wave,
/// after the wave's resolvers were started and before they are awaited.
///
/// Absent when a request has no batch sources.
pub struct BatchOperationHandler<'a> {
    dispatchers: &'a [Arc<dyn BatchDispatch>],
}

impl<'a> BatchOperationHandler<'a> {
    /// Creates a handler over the given sources, if there are any.
    pub fn new(dispatchers: &'a [Arc<dyn BatchDispatch>]) -> Option<Self> {
        (!dispatchers.is_empty()).then_some(Self { dispatchers })
    }

    /// Whether any source has queued keys.
    pub fn has_pending(&self) -> bool {
        self.dispatchers.iter().any(|d| d.has_pending())
    }

    /// Dispatches every source with queued keys, concurrently.
    pub async fn complete(&self) {
        join_all(
            self.dispatchers
                .iter()
                .filter(|d| d.has_pending())
                .map(|d| d.dispatch()),
        )
        .await;
    }

    /// Completes once any source has queued a key.
    pub async fn queued(&self) {
        select_all(self.dispatchers.iter().map(|d| d.queued())).await;
    }
}
