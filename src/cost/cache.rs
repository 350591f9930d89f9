use std::{
    collections::BTreeMap,
    hash::{Hash as _, Hasher as _},
    sync::atomic::{AtomicU64, Ordering},
};

use moka::sync::Cache;
use xxhash_rust::xxh3::Xxh3;

use crate::{
    cost::{CostError, CostMetrics},
    executor::Variables,
};

/// Bounded cache of operation costs, keyed by [`CostCache::operation_id()`].
///
/// Failed analyses are not cached.
pub struct CostCache {
    cache: Option<Cache<u64, CostMetrics>>,
    hits: AtomicU64,
}

impl CostCache {
    /// Creates a cache holding up to `capacity` operations. A capacity of `0`
    /// disables caching.
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: (capacity > 0).then(|| Cache::new(capacity)),
            hits: AtomicU64::new(0),
        }
    }

    /// Identifies an operation by its document text, its name and the values
    /// of its variables.
    pub fn operation_id(source: &str, operation_name: Option<&str>, variables: &Variables) -> u64 {
        let mut hasher = Xxh3::new();
        source.hash(&mut hasher);
        operation_name.hash(&mut hasher);
        variables
            .iter()
            .map(|(name, value)| (name.as_str(), value.to_string()))
            .collect::<BTreeMap<_, _>>()
            .hash(&mut hasher);
        hasher.finish()
    }

    /// Returns the cached cost of an operation, or caches the result of
    /// `analyze`.
    pub fn get_or_analyze<F>(&self, operation_id: u64, analyze: F) -> Result<CostMetrics, CostError>
    where
        F: FnOnce() -> Result<CostMetrics, CostError>,
    {
        let Some(cache) = &self.cache else {
            return analyze();
        };
        if let Some(metrics) = cache.get(&operation_id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(operation_id, "cost cache hit");
            return Ok(metrics);
        }

        let metrics = analyze()?;
        cache.insert(operation_id, metrics);
        Ok(metrics)
    }

    /// Number of lookups served from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}
