//! Single-threaded grid

use super::ParallelFor;

/// Runs every unit in index order on the calling thread.
///
/// Useful as a reference substrate: with it, even the non-deterministic
/// strategies have a fixed summation order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Serial;

impl ParallelFor for Serial {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn run<S, F>(&self, slots: &mut [S], body: F)
    where
        S: Send,
        F: Fn(usize, &mut S) + Send + Sync,
    {
        for (unit, slot) in slots.iter_mut().enumerate() {
            body(unit, slot);
        }
    }
}
