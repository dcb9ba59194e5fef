//! Fixed-size worker pool driving block-parallel compression.
//!
//! The underlying thread/mutex/condvar primitives are out of scope for this
//! crate's own concerns (it asks only for "N worker threads" and a
//! synchronization barrier); in the same spirit as the teacher's own
//! `TPool`, those primitives are supplied by `rayon`'s thread pool plus a
//! `Mutex`/`Condvar` pair standing in for a manual-reset "all jobs drained"
//! event. `prepare_batch`/`enqueue`/`wait` mirror the pending-counter +
//! countdown-barrier shape a hand-rolled job pool would use directly.

use std::sync::{Arc, Condvar, Mutex};

/// A pool of worker threads that runs closures and lets the caller block
/// until an entire batch has drained.
pub struct JobPool {
    pool: rayon::ThreadPool,
    pending: Arc<(Mutex<usize>, Condvar)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// `rayon::ThreadPoolBuilder::build` failed (OS thread creation error).
    SpawnFailed,
}

impl core::fmt::Display for PoolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PoolError::SpawnFailed => write!(f, "failed to spawn worker threads"),
        }
    }
}

impl std::error::Error for PoolError {}

impl JobPool {
    /// Creates a pool with exactly `num_workers` threads.
    pub fn new(num_workers: usize) -> Result<Self, PoolError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers.max(1))
            .build()
            .map_err(|_| PoolError::SpawnFailed)?;
        Ok(JobPool {
            pool,
            pending: Arc::new((Mutex::new(0), Condvar::new())),
        })
    }

    /// Arms the countdown barrier for a batch of `n` jobs. Must be called
    /// before the matching `enqueue` calls.
    pub fn prepare_batch(&self, n: usize) {
        let (lock, _) = &*self.pending;
        *lock.lock().unwrap() = n;
    }

    /// Runs `job` on a worker thread. Decrements the batch counter and
    /// notifies any `wait` callers once `job` returns.
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        self.pool.spawn(move || {
            job();
            let (lock, cvar) = &*pending;
            let mut count = lock.lock().unwrap();
            *count -= 1;
            if *count == 0 {
                cvar.notify_all();
            }
        });
    }

    /// Blocks until every job from the current batch has completed.
    pub fn wait(&self) {
        let (lock, cvar) = &*self.pending;
        let mut count = lock.lock().unwrap();
        while *count > 0 {
            count = cvar.wait(count).unwrap();
        }
    }

    /// Number of worker threads in the pool.
    pub fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}
