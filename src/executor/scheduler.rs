use std::mem;

use futures::{FutureExt as _, StreamExt as _, stream::FuturesUnordered};
use serde::Deserialize;

use crate::{
    ast::{OperationType, SelectionSet},
    executor::{
        ExecutionPools, Executor, FieldError, FieldResult, ParentValue, ResolutionUnit,
        ResultTree, SharedAny,
        completion::Output,
        path::Path,
    },
    schema::meta::ObjectMeta,
    types::{FieldValue, ResolverFuture},
    value::Value,
};

/// How the fields of an operation are scheduled.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    /// Every field of a wave resolves concurrently.
    #[default]
    Concurrent,
    /// Root fields resolve one after another, each with its whole subtree
    /// completed before the next one starts. Nested fields are concurrent.
    SerialRoot,
    /// Every field resolves one after another.
    Serial,
}

impl ExecutionPolicy {
    /// Policy for an operation of the given type.
    ///
    /// Mutations always run their root fields serially.
    pub fn for_operation(operation: OperationType, serial: bool) -> Self {
        match (operation, serial) {
            (_, true) => Self::Serial,
            (OperationType::Mutation, false) => Self::SerialRoot,
            (OperationType::Query | OperationType::Subscription, false) => Self::Concurrent,
        }
    }
}

impl<'a> Executor<'a> {
    /// Resolves the root selection set of an operation into the `data` entry
    /// of the response.
    pub(crate) async fn execute_root(
        &self,
        root_type: &'a ObjectMeta,
        selection_set: &'a SelectionSet,
        root_value: SharedAny,
        policy: ExecutionPolicy,
    ) -> Value {
        let mut tree = ResultTree::new();
        let mut roots = Vec::new();
        let fields = self.collector.collect(root_type, &[selection_set]);
        self.enqueue_fields(
            &mut Output {
                tree: &mut tree,
                next: &mut roots,
            },
            ResultTree::ROOT,
            root_type,
            &fields,
            &Path::root(),
            &ParentValue::root(root_value),
        );

        match policy {
            ExecutionPolicy::Concurrent => self.run_waves(&mut tree, roots, false).await,
            ExecutionPolicy::SerialRoot => {
                for unit in roots {
                    self.run_waves(&mut tree, vec![unit], false).await;
                }
            }
            ExecutionPolicy::Serial => self.run_waves(&mut tree, roots, true).await,
        }

        if tree.is_data_nulled() {
            tracing::debug!("null propagated to the root of the response");
        }
        tree.into_value()
    }

    /// Resolves units wave by wave until no field is left.
    ///
    /// A wave holds every unit discovered while completing the previous one.
    /// Its results are completed in the order the units were created, never
    /// in the order the resolvers finish.
    async fn run_waves(
        &self,
        tree: &mut ResultTree,
        mut wave: Vec<ResolutionUnit<'a>>,
        serial: bool,
    ) {
        let mut next = Vec::with_capacity(wave.len());
        let mut results = ExecutionPools::shared().results.rent();

        while !wave.is_empty() {
            if self.is_cancelled() {
                tracing::warn!(pending = wave.len(), "execution cancelled");
                for unit in wave.drain(..) {
                    self.abandon_unit(tree, unit, FieldError::from("Execution was cancelled"));
                }
                break;
            }

            tracing::debug!(
                depth = wave[0].path.depth(),
                units = wave.len(),
                serial,
                "resolving wave",
            );
            for unit in &mut wave {
                unit.prepare(self.schema, self.variables);
            }
            if serial {
                for unit in &wave {
                    self.drive([unit.invoke(self)], &mut results).await;
                }
            } else {
                self.drive(wave.iter().map(|u| u.invoke(self)), &mut results)
                    .await;
            }

            let mut out = Output {
                tree: &mut *tree,
                next: &mut next,
            };
            for (unit, result) in wave.drain(..).zip(results.drain(..)) {
                self.complete_unit(&mut out, unit, result);
            }
            mem::swap(&mut wave, &mut next);
        }
    }

    /// Awaits resolver futures, flushing batched fetches whenever every
    /// unfinished resolver waits on one.
    ///
    /// Results are appended in the order of `futures`, whatever order they
    /// finish in. Futures are not started at all if the request is already
    /// cancelled, but once started they always run to completion.
    async fn drive<'f>(
        &self,
        futures: impl IntoIterator<Item = ResolverFuture<'f>>,
        results: &mut Vec<FieldResult<FieldValue>>,
    ) {
        let base = results.len();
        let mut in_flight = futures
            .into_iter()
            .enumerate()
            .map(|(i, f)| f.map(move |res| (base + i, res)))
            .collect::<FuturesUnordered<_>>();
        let cancelled = FieldError::from("Execution was cancelled");
        results.resize_with(base + in_flight.len(), || Err(cancelled.clone()));
        if self.is_cancelled() {
            return;
        }

        loop {
            while let Some(Some((i, res))) = in_flight.next().now_or_never() {
                results[i] = res;
            }
            if in_flight.is_empty() {
                break;
            }

            let Some(batch) = &self.batch else {
                if let Some((i, res)) = in_flight.next().await {
                    results[i] = res;
                }
                continue;
            };
            if batch.has_pending() {
                batch.complete().await;
                continue;
            }
            tokio::select! {
                Some((i, res)) = in_flight.next() => results[i] = res,
                () = batch.queued() => {}
            }
        }
    }
}
