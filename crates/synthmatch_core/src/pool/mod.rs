//! Worker pools for data-parallel correlation tasks.
//!
//! A [`TaskPool`] executes a batch of independent tasks and hands back the
//! results in submission order. Returning from [`TaskPool::run`] is the join
//! barrier: every task has completed and every result slot is filled.
//!
//! Two implementations are provided:
//! - [`SequentialPool`] runs tasks one after another on the calling thread.
//! - [`ThreadPool`] runs tasks on a fixed number of `rayon` worker threads.
//!
//! Because results are placed by submission index, both pools produce
//! identical output for the same tasks.

use rayon::prelude::*;
use thiserror::Error;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 4;

/// Errors raised while building a pool.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Worker count must be at least one.
    #[error("Worker count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),

    /// The underlying thread pool could not be started.
    #[error("Failed to start worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

/// Executes batches of independent tasks.
pub trait TaskPool: Send + Sync {
    /// Number of tasks that may run at once.
    fn workers(&self) -> usize;

    /// Run `work` over every task and return the results in task order.
    fn run<T, R, F>(&self, tasks: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync;
}

/// Runs every task on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPool;

impl TaskPool for SequentialPool {
    fn workers(&self) -> usize {
        1
    }

    fn run<T, R, F>(&self, tasks: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        tasks.into_iter().map(work).collect()
    }
}

/// Fixed-size pool of worker threads.
pub struct ThreadPool {
    inner: rayon::ThreadPool,
    workers: usize,
}

impl ThreadPool {
    /// Start a pool with `workers` threads.
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::InvalidWorkerCount(workers));
        }

        let inner = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("synthmatch-worker-{}", i))
            .build()?;

        tracing::debug!("Started correlation pool with {} workers", workers);

        Ok(Self { inner, workers })
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.workers)
            .finish()
    }
}

impl TaskPool for ThreadPool {
    fn workers(&self) -> usize {
        self.workers
    }

    fn run<T, R, F>(&self, tasks: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        // Indexed collect keeps submission order regardless of scheduling
        self.inner
            .install(|| tasks.into_par_iter().map(&work).collect())
    }
}
