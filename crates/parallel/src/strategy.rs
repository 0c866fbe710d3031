//! Parallel processing strategies

use std::panic::{catch_unwind, AssertUnwindSafe};
use streamnet_core::{Error, Result};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Processing mode for algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing on the calling thread
    #[default]
    Sequential,
    /// Parallel processing on the global rayon pool
    Parallel,
    /// Parallel processing on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Number of workers this mode will use
    pub fn workers(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => (*n).max(1),
        }
    }
}

/// Strategy for running independent fallible tasks
pub trait ParallelStrategy {
    /// Run `f` over every item and collect the results in input order.
    ///
    /// The first failing item (in input order) determines the reported
    /// error. Panics inside `f` are caught and reported as failures.
    fn try_par_map<I, T, F>(&self, items: Vec<I>, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> Result<T> + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn try_par_map<I, T, F>(&self, items: Vec<I>, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> Result<T> + Sync + Send,
    {
        debug!(tasks = items.len(), mode = ?self, "dispatching tasks");
        let results: Vec<Result<T>> = match self {
            ProcessingMode::Sequential => items.into_iter().map(|item| guarded(&f, item)).collect(),
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => items.into_par_iter().map(|item| guarded(&f, item)).collect(),
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads((*threads).max(1))
                    .build()
                    .map_err(|e| Error::WorkerFailure(format!("cannot build worker pool: {}", e)))?;
                pool.install(|| items.into_par_iter().map(|item| guarded(&f, item)).collect())
            }
            #[cfg(not(feature = "parallel"))]
            ProcessingMode::Parallel | ProcessingMode::ParallelWith(_) => {
                items.into_iter().map(|item| guarded(&f, item)).collect()
            }
        };
        results.into_iter().collect()
    }
}

/// Run one task, converting errors and panics into worker failures
fn guarded<I, T, F>(f: &F, item: I) -> Result<T>
where
    F: Fn(I) -> Result<T>,
{
    match catch_unwind(AssertUnwindSafe(|| f(item))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(Error::WorkerFailure(msg))) => Err(Error::WorkerFailure(msg)),
        Ok(Err(e)) => Err(Error::WorkerFailure(e.to_string())),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_string());
            Err(Error::WorkerFailure(msg))
        }
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        std::thread::available_parallelism().map_or(1, |n| n.get())
    }
}

/// Default worker count: one less than the available cores, at least one
pub fn default_workers() -> usize {
    num_cpus().saturating_sub(1).max(1)
}
