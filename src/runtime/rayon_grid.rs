//! Rayon-backed grid

use super::ParallelFor;
use crate::error::{Error, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

/// Work-stealing grid on a rayon thread pool.
///
/// By default units run on rayon's global pool. `with_threads` builds a
/// dedicated pool, which is how tests pin the degree of parallelism.
#[derive(Clone, Debug)]
pub struct RayonGrid {
    pool: Option<Arc<ThreadPool>>,
    min_len: usize,
}

impl RayonGrid {
    /// Grid on the global rayon pool
    pub fn new() -> Self {
        Self {
            pool: None,
            min_len: 1,
        }
    }

    /// Grid on a dedicated pool with `threads` workers
    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("scatr-unit-{i}"))
            .build()
            .map_err(|e| Error::Backend(format!("failed to build rayon pool: {e}")))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
            min_len: 1,
        })
    }

    /// Minimum number of units a rayon task processes before splitting
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len.max(1);
        self
    }

    /// Number of worker threads units are spread over
    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |pool| pool.current_num_threads())
    }

    fn install_parallelism<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl Default for RayonGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl ParallelFor for RayonGrid {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn run<S, F>(&self, slots: &mut [S], body: F)
    where
        S: Send,
        F: Fn(usize, &mut S) + Send + Sync,
    {
        let min_len = self.min_len;
        self.install_parallelism(|| {
            slots
                .par_iter_mut()
                .enumerate()
                .with_min_len(min_len)
                .for_each(|(unit, slot)| body(unit, slot));
        });
    }
}
