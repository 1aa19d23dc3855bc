//! Bounded worker pool.

use std::num::NonZeroUsize;
use std::thread;

use rayon::prelude::*;

use super::errors::RunError;

/// Fixed number of slots; each runs one task at a time.
///
/// Tasks block on external processes, so every slot is a real thread and
/// at most `workers()` tasks are in flight at once.
pub struct WorkerPool {
    workers: usize,
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool. `0` means one slot per logical core.
    pub fn new(max_workers: usize) -> Result<Self, RunError> {
        let workers = resolve_workers(max_workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("wavnorm-worker-{}", i))
            .build()
            .map_err(|e| RunError::Pool(e.to_string()))?;
        Ok(Self { workers, pool })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` over every item and return the results in input order.
    ///
    /// One item failing never stops the others; `f` is expected to turn
    /// failures into values.
    pub fn run<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        self.pool
            .install(|| items.into_par_iter().with_max_len(1).map(f).collect())
    }
}

/// Resolve the configured worker count. Never less than one.
pub fn resolve_workers(max_workers: usize) -> usize {
    if max_workers > 0 {
        return max_workers;
    }
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
