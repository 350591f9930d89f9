use std::{
    mem,
    ops::{Deref, DerefMut},
    sync::{
        LazyLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    executor::{FieldResult, completion::Node},
    types::FieldValue,
};

/// Buffers retained by a pool are cleared first, and dropped instead when
/// they grew past this many elements.
const MAX_RETAINED_CAPACITY: usize = 4096;

/// Number of buffers a pool retains.
const MAX_RETAINED: usize = 64;

/// Buffer that can be reset for reuse.
pub(crate) trait Recycle: Default {
    /// Clears the buffer, returning whether it is worth retaining.
    fn recycle(&mut self) -> bool;
}

impl<T> Recycle for Vec<T> {
    fn recycle(&mut self) -> bool {
        self.clear();
        self.capacity() <= MAX_RETAINED_CAPACITY
    }
}

/// Thread-safe pool of reusable buffers.
pub(crate) struct Pool<T> {
    items: Mutex<Vec<T>>,
    rented: AtomicUsize,
    reused: AtomicUsize,
}

impl<T: Recycle> Pool<T> {
    fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            rented: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
        }
    }

    /// Takes a buffer out of the pool, or creates a new one.
    ///
    /// The buffer returns to the pool when the guard is dropped, including on
    /// cancellation of the renting future.
    pub(crate) fn rent(&self) -> Pooled<'_, T> {
        self.rented.fetch_add(1, Ordering::Relaxed);
        let value = match self.items.lock().pop() {
            Some(v) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                v
            }
            None => T::default(),
        };
        Pooled { value, pool: self }
    }

    fn give_back(&self, mut value: T) {
        if value.recycle() {
            let mut items = self.items.lock();
            if items.len() < MAX_RETAINED {
                items.push(value);
            }
        }
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            rented: self.rented.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            retained: self.items.lock().len(),
        }
    }
}

/// Buffer rented from a [`Pool`].
pub(crate) struct Pooled<'p, T: Recycle> {
    value: T,
    pool: &'p Pool<T>,
}

impl<T: Recycle> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Recycle> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Recycle> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        self.pool.give_back(mem::take(&mut self.value));
    }
}

/// Usage counters of a pool.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    /// Buffers handed out so far.
    pub rented: usize,
    /// Rentals served by a previously returned buffer.
    pub reused: usize,
    /// Buffers currently held by the pool.
    pub retained: usize,
}

/// Process-wide pools of the buffers an execution allocates per wave and per
/// request.
pub struct ExecutionPools {
    pub(crate) results: Pool<Vec<FieldResult<FieldValue>>>,
    pub(crate) nodes: Pool<Vec<Node>>,
}

static POOLS: LazyLock<ExecutionPools> = LazyLock::new(|| ExecutionPools {
    results: Pool::new(),
    nodes: Pool::new(),
});

impl ExecutionPools {
    /// The process-wide pools.
    pub fn shared() -> &'static Self {
        &POOLS
    }

    /// Counters of the pool of per-wave resolver result arrays.
    pub fn result_stats(&self) -> PoolStats {
        self.results.stats()
    }

    /// Counters of the pool of per-request result tree arenas.
    pub fn node_stats(&self) -> PoolStats {
        self.nodes.stats()
    }
}
