//! Typed scatter-add entry points

use super::config::{Launch, ScatterConfig, Strategy, select_strategy};
use crate::dtype::{AtomicScalar, DType, Element, IndexElement};
use crate::error::{Error, Result};
use crate::kernels::accum::{AccumView, widen_updates};
use crate::kernels::flatten::flatten_indices;
use crate::kernels::{ScatterJob, Updates, atomic, deterministic, grouped};
use crate::runtime::{Arena, ParallelFor, Workspace};
use crate::tiling::{Shape, Tiling};

/// Buffers of one scatter-add
#[derive(Debug)]
pub struct ScatterArgs<'a, T, I> {
    /// Row-major `rows x row_len` accumulator, updated in place
    pub accumulator: &'a mut [T],
    /// One row index (or one coordinate tuple, see
    /// [`IndexLayout`](crate::tiling::IndexLayout)) per update; out-of-range
    /// entries are ignored
    pub indices: &'a [I],
    /// Update rows
    pub updates: Updates<'a, T>,
    /// Elements per row (D)
    pub row_len: usize,
}

/// Validated launch geometry
struct Geometry {
    shape: Shape,
    count: usize,
}

fn check_dtype(expected: DType, got: DType) -> Result<()> {
    if expected != got {
        return Err(Error::DTypeMismatch { expected, got });
    }
    Ok(())
}

fn validate<T: Element, I: IndexElement>(
    config: &ScatterConfig,
    args: &ScatterArgs<'_, T, I>,
) -> Result<Geometry> {
    check_dtype(config.accumulator, T::DTYPE)?;
    check_dtype(config.index, I::DTYPE)?;

    if args.row_len == 0 {
        return Err(Error::invalid_argument("row_len", "must be at least 1"));
    }
    if args.accumulator.len() % args.row_len != 0 {
        return Err(Error::invalid_argument(
            "accumulator",
            format!(
                "length {} is not a multiple of row_len {}",
                args.accumulator.len(),
                args.row_len
            ),
        ));
    }
    if args.updates.is_broadcast() != config.scalar_updates {
        return Err(Error::invalid_argument(
            "updates",
            format!(
                "broadcast updates given with scalar_updates = {}",
                config.scalar_updates
            ),
        ));
    }

    let layout = &config.index_layout;
    let Some(count) = layout.tuple_count(args.indices.len()) else {
        return Err(Error::invalid_argument(
            "indices",
            format!(
                "length {} is not a multiple of the index rank {}",
                args.indices.len(),
                layout.rank()
            ),
        ));
    };
    let rows = args.accumulator.len() / args.row_len;
    if let Some(addressed) = layout.rows().filter(|&addressed| addressed != rows) {
        return Err(Error::shape_mismatch("index_layout", rows, addressed));
    }

    let expected = args.updates.expected_len(count, args.row_len);
    if args.updates.data().len() != expected {
        return Err(Error::shape_mismatch(
            "updates",
            expected,
            args.updates.data().len(),
        ));
    }

    Ok(Geometry {
        shape: Shape::new(rows, args.row_len),
        count,
    })
}

fn run_strategy<'a, G, I, A>(
    grid: &G,
    tiling: &Tiling,
    strategy: Strategy,
    job: &ScatterJob<'_, I, A>,
    arena: &mut Arena<'a>,
) -> Result<()>
where
    G: ParallelFor,
    I: IndexElement,
    A: AtomicScalar,
{
    match strategy {
        Strategy::Atomic => atomic::scatter(grid, tiling, job),
        Strategy::SortGrouped => grouped::scatter(grid, tiling, job),
        Strategy::Deterministic => deterministic::scatter(grid, tiling, job, arena)?,
    }
    Ok(())
}

pub(crate) fn skipped(config: &ScatterConfig, reason: &str) -> Launch {
    log::warn!(
        "scatter-add skipped ({reason}): accumulator={} index={} address={:?} deterministic={}",
        config.accumulator,
        config.index,
        config.address,
        config.deterministic
    );
    Launch::Skipped
}

/// Scatter-add `args.updates` into `args.accumulator` at `args.indices`.
///
/// Row `r` of the accumulator receives the sum of every update row whose index
/// equals `r` (minus that sum in subtract mode). Indices outside
/// `[0, rows)` are ignored. With a tuple
/// [`IndexLayout`](crate::tiling::IndexLayout) the index array holds `rank`
/// coordinates per update, and a tuple with any out-of-range coordinate is
/// ignored.
///
/// The strategy is picked by [`select_strategy`]. A configuration no strategy
/// matches, or a narrow address width that cannot address the problem, leaves
/// the accumulator untouched and returns [`Launch::Skipped`].
///
/// `workspace` must hold at least
/// [`workspace_layout`](crate::tiling::workspace_layout) bytes.
///
/// # Errors
///
/// Configuration dtypes that do not match `T`/`I`, inconsistent buffer
/// lengths, an index layout whose dims do not multiply to the row count, and
/// an undersized workspace.
///
/// # Example
///
/// ```
/// use scatr::prelude::*;
///
/// let mut acc = vec![0.0f32; 4];
/// let config = ScatterConfig::for_types::<f32, i64>();
/// let tiling = Tiling::new(2, 2)?;
/// let mut ws = Workspace::new(0);
/// let args = ScatterArgs {
///     accumulator: &mut acc,
///     indices: &[0i64, 1, 0, 3, 1],
///     updates: Updates::PerIndex(&[1.0, 2.0, 3.0, 4.0, 5.0]),
///     row_len: 1,
/// };
/// let launch = scatter_add(&Serial, &config, &tiling, args, &mut ws)?;
/// assert!(launch.is_completed());
/// assert_eq!(acc, [4.0, 7.0, 0.0, 4.0]);
/// # Ok::<(), scatr::error::Error>(())
/// ```
pub fn scatter_add<G, T, I>(
    grid: &G,
    config: &ScatterConfig,
    tiling: &Tiling,
    args: ScatterArgs<'_, T, I>,
    workspace: &mut Workspace,
) -> Result<Launch>
where
    G: ParallelFor,
    T: Element,
    I: IndexElement,
{
    let Geometry { shape, count } = validate(config, &args)?;
    let Some(strategy) = select_strategy(config) else {
        return Ok(skipped(config, "unsupported dtypes"));
    };
    if !config.addresses(shape, count) {
        return Ok(skipped(config, "exceeds narrow address width"));
    }

    log::debug!(
        "scatter-add {}: {}x{} <- {count} on {} ({} units, chunk_len {})",
        strategy,
        shape.rows,
        shape.row_len,
        grid.name(),
        tiling.units(),
        tiling.chunk_len()
    );

    let units = tiling.units();
    let mut arena = workspace.arena();
    let view = AccumView::open(grid, units, args.accumulator, &mut arena)?;
    let updates = widen_updates(grid, units, args.updates, &mut arena)?;
    if config.index_layout.is_flat() {
        let job = ScatterJob {
            cells: view.cells(),
            indices: args.indices,
            updates,
            rows: shape.rows,
            row_len: shape.row_len,
            subtract: config.subtract,
        };
        run_strategy(grid, tiling, strategy, &job, &mut arena)?;
    } else {
        let rows = flatten_indices(grid, units, &config.index_layout, args.indices, &mut arena)?;
        let job = ScatterJob {
            cells: view.cells(),
            indices: rows,
            updates,
            rows: shape.rows,
            row_len: shape.row_len,
            subtract: config.subtract,
        };
        run_strategy(grid, tiling, strategy, &job, &mut arena)?;
    }
    view.commit(grid, units);

    log::trace!("scatter-add {strategy}: {} workspace bytes used", arena.used());
    Ok(Launch::Completed(strategy))
}

/// Out-of-place scatter-add: `args.accumulator = input`, then
/// [`scatter_add`] into it.
///
/// On a skipped launch the output still holds a copy of `input`.
pub fn scatter_add_out<G, T, I>(
    grid: &G,
    config: &ScatterConfig,
    tiling: &Tiling,
    input: &[T],
    args: ScatterArgs<'_, T, I>,
    workspace: &mut Workspace,
) -> Result<Launch>
where
    G: ParallelFor,
    T: Element,
    I: IndexElement,
{
    if input.len() != args.accumulator.len() {
        return Err(Error::shape_mismatch(
            "accumulator",
            input.len(),
            args.accumulator.len(),
        ));
    }
    args.accumulator.copy_from_slice(input);
    scatter_add(grid, config, tiling, args, workspace)
}
