//! Scoped OS-thread grid

use super::ParallelFor;
use std::num::NonZeroUsize;

/// Spreads units over a fixed number of scoped OS threads.
///
/// Units are split into contiguous groups, one group per thread; the scope
/// join is the barrier.
#[derive(Clone, Copy, Debug)]
pub struct ThreadGrid {
    threads: usize,
}

impl ThreadGrid {
    /// Grid with `threads` worker threads (at least one)
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    /// Grid sized to the machine's available parallelism
    pub fn available() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        )
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl Default for ThreadGrid {
    fn default() -> Self {
        Self::available()
    }
}

impl ParallelFor for ThreadGrid {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn run<S, F>(&self, slots: &mut [S], body: F)
    where
        S: Send,
        F: Fn(usize, &mut S) + Send + Sync,
    {
        if slots.is_empty() {
            return;
        }
        let group = slots.len().div_ceil(self.threads);
        let body = &body;
        std::thread::scope(|scope| {
            for (g, units) in slots.chunks_mut(group).enumerate() {
                scope.spawn(move || {
                    let first = g * group;
                    for (offset, slot) in units.iter_mut().enumerate() {
                        body(first + offset, slot);
                    }
                });
            }
        });
    }
}
