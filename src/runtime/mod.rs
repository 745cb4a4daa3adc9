//! Compute-unit grids and kernel workspace
//!
//! A kernel launch is a fixed grid of independent compute units. The only
//! cross-unit synchronization is the join at the end of [`ParallelFor::run`]:
//! when it returns, every unit has finished, which is the global barrier the
//! multi-stage kernels rely on.
//!
//! Three substrates are provided:
//!
//! - [`Serial`]: runs units one after another on the calling thread
//! - [`RayonGrid`]: work-stealing pool (requires the `rayon` feature)
//! - [`ThreadGrid`]: one scoped OS thread per group of units

#[cfg(feature = "rayon")]
mod rayon_grid;
mod serial;
mod thread_grid;
mod workspace;

#[cfg(feature = "rayon")]
pub use rayon_grid::RayonGrid;
pub use serial::Serial;
pub use thread_grid::ThreadGrid;
pub use workspace::{Arena, AtomicRegion, Workspace, WorkspaceLayout, region_bytes};

/// Capability to run a body once per compute unit, in parallel, with a join.
///
/// Each unit receives exclusive access to its own slot; anything shared
/// between units must be reached through atomics.
pub trait ParallelFor: Send + Sync {
    /// Name of the substrate, used in log output
    fn name(&self) -> &'static str;

    /// Run `body(unit, &mut slots[unit])` for every slot and wait for all.
    fn run<S, F>(&self, slots: &mut [S], body: F)
    where
        S: Send,
        F: Fn(usize, &mut S) + Send + Sync;

    /// Run `body(unit)` for `units` stateless units and wait for all.
    fn for_each_unit<F>(&self, units: usize, body: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        let mut slots = vec![(); units];
        self.run(&mut slots, |unit, _| body(unit));
    }
}

/// Grid used when the caller does not pick one
#[cfg(feature = "rayon")]
pub type DefaultGrid = RayonGrid;

/// Grid used when the caller does not pick one
#[cfg(not(feature = "rayon"))]
pub type DefaultGrid = ThreadGrid;
