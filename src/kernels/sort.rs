//! Key grouping primitive
//!
//! Sorts a chunk of indices and reports, for every distinct key, the original
//! positions of its duplicates. The sort is an LSD radix sort over the
//! order-preserving `u64` image of each key (see [`IndexElement::sort_key`]):
//! 8-bit digits, 8 passes, and any pass whose digit is identical for every key
//! is skipped. For i32 keys, or any chunk whose keys span a small range, most
//! passes are skipped.
//!
//! LSD radix sort is stable, so duplicates come out in ascending original
//! position. Callers that sum duplicates in group order therefore get a fixed
//! summation order for a given chunk.

use crate::dtype::IndexElement;

const RADIX_BITS: u32 = 8;
const RADIX: usize = 1 << RADIX_BITS;
const NUM_PASSES: u32 = u64::BITS / RADIX_BITS;

/// Reusable grouping state for one compute unit.
///
/// All buffers are kept between calls, so grouping many chunks of the same
/// size allocates only once.
#[derive(Debug, Default)]
pub struct KeyGrouper<I> {
    keys: Vec<u64>,
    alt_keys: Vec<u64>,
    order: Vec<u32>,
    alt_order: Vec<u32>,
    sorted: Vec<I>,
    uniques: Vec<I>,
    runs: Vec<u32>,
    starts: Vec<u32>,
}

/// Result of grouping one key slice
#[derive(Debug, Clone, Copy)]
pub struct Grouping<'g, I> {
    sorted: &'g [I],
    order: &'g [u32],
    uniques: &'g [I],
    runs: &'g [u32],
    starts: &'g [u32],
}

impl<I: IndexElement> KeyGrouper<I> {
    /// Empty grouper
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            alt_keys: Vec::new(),
            order: Vec::new(),
            alt_order: Vec::new(),
            sorted: Vec::new(),
            uniques: Vec::new(),
            runs: Vec::new(),
            starts: Vec::new(),
        }
    }

    /// Sort `keys` and group duplicates.
    ///
    /// Keys are not range checked; out-of-range keys form groups like any
    /// other and are filtered by the caller.
    ///
    /// # Panics
    /// If `keys.len()` does not fit in `u32`.
    pub fn group(&mut self, keys: &[I]) -> Grouping<'_, I> {
        let n = keys.len();
        assert!(
            u32::try_from(n).is_ok(),
            "chunk of {n} keys exceeds the u32 permutation range"
        );

        self.keys.clear();
        self.keys.extend(keys.iter().map(|k| k.sort_key()));
        self.order.clear();
        self.order.extend(0..n as u32);
        self.radix_sort();

        self.sorted.clear();
        self.sorted
            .extend(self.order.iter().map(|&pos| keys[pos as usize]));
        self.sorted.push(I::SENTINEL);

        self.uniques.clear();
        self.runs.clear();
        self.starts.clear();
        let mut start = 0usize;
        for i in 1..=n {
            if i == n || self.sorted[i] != self.sorted[start] {
                self.uniques.push(self.sorted[start]);
                self.starts.push(start as u32);
                self.runs.push((i - start) as u32);
                start = i;
            }
        }

        Grouping {
            sorted: &self.sorted,
            order: &self.order,
            uniques: &self.uniques,
            runs: &self.runs,
            starts: &self.starts,
        }
    }

    fn radix_sort(&mut self) {
        let n = self.keys.len();
        self.alt_keys.resize(n, 0);
        self.alt_order.resize(n, 0);

        for pass in 0..NUM_PASSES {
            let shift = pass * RADIX_BITS;
            let digit = |key: u64| ((key >> shift) as usize) & (RADIX - 1);

            let mut offsets = [0usize; RADIX];
            for &key in &self.keys {
                offsets[digit(key)] += 1;
            }
            if offsets.iter().any(|&count| count == n) {
                continue;
            }

            let mut running = 0;
            for slot in offsets.iter_mut() {
                let count = *slot;
                *slot = running;
                running += count;
            }

            for (&key, &pos) in self.keys.iter().zip(&self.order) {
                let d = digit(key);
                self.alt_keys[offsets[d]] = key;
                self.alt_order[offsets[d]] = pos;
                offsets[d] += 1;
            }
            std::mem::swap(&mut self.keys, &mut self.alt_keys);
            std::mem::swap(&mut self.order, &mut self.alt_order);
        }
    }
}

impl<'g, I: IndexElement> Grouping<'g, I> {
    /// Number of keys grouped (L)
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no keys were grouped
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of distinct keys (U)
    pub fn unique_count(&self) -> usize {
        self.uniques.len()
    }

    /// Sorted keys followed by one sentinel (`L + 1` entries)
    pub fn sorted_keys(&self) -> &'g [I] {
        self.sorted
    }

    /// Sorted position → original position
    pub fn order(&self) -> &'g [u32] {
        self.order
    }

    /// Distinct keys in ascending order
    pub fn unique_keys(&self) -> &'g [I] {
        self.uniques
    }

    /// Duplicate count of each distinct key
    pub fn run_lengths(&self) -> &'g [u32] {
        self.runs
    }

    /// Each distinct key with the original positions of its duplicates
    pub fn groups(&self) -> impl Iterator<Item = (I, &'g [u32])> + use<'g, I> {
        let order = self.order;
        self.uniques
            .iter()
            .zip(self.starts.iter().zip(self.runs))
            .map(move |(&key, (&start, &run))| {
                let start = start as usize;
                (key, &order[start..start + run as usize])
            })
    }
}
