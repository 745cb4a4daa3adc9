//! Kernel workspace and region arena
//!
//! The workspace is one pre-sized, cache-line aligned buffer. A launch carves
//! it into typed regions through an [`Arena`]: every region starts on a 64-byte
//! boundary, is bounds checked against the remaining capacity and is zeroed
//! when handed out. Regions are never returned to the arena; the whole
//! workspace is reset by starting a new arena on the next launch.

use crate::error::{Error, Result};
use bytemuck::{Pod, Zeroable};
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64};

/// Alignment (and size granularity) of every workspace region
pub const REGION_ALIGN: usize = 64;

#[derive(Clone, Copy)]
#[repr(C, align(64))]
struct CacheLine([u8; REGION_ALIGN]);

// SAFETY: a plain byte array without padding; all bit patterns are valid.
unsafe impl Zeroable for CacheLine {}
// SAFETY: see above; `repr(C, align(64))` over 64 bytes leaves no padding.
unsafe impl Pod for CacheLine {}

/// Bytes a region of `bytes` payload occupies, including alignment padding
#[inline]
pub fn region_bytes(bytes: usize) -> usize {
    bytes.div_ceil(REGION_ALIGN) * REGION_ALIGN
}

/// Scratch memory for one kernel launch at a time
#[derive(Clone)]
pub struct Workspace {
    lines: Vec<CacheLine>,
}

impl Workspace {
    /// Workspace with at least `bytes` of capacity
    pub fn new(bytes: usize) -> Self {
        Self {
            lines: vec![CacheLine([0; REGION_ALIGN]); bytes.div_ceil(REGION_ALIGN)],
        }
    }

    /// Workspace large enough for `layout`
    pub fn for_layout(layout: &WorkspaceLayout) -> Self {
        Self::new(layout.total_bytes())
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> usize {
        self.lines.len() * REGION_ALIGN
    }

    /// Grow the workspace so it holds at least `bytes`
    pub fn reserve(&mut self, bytes: usize) {
        let lines = bytes.div_ceil(REGION_ALIGN);
        if lines > self.lines.len() {
            self.lines.resize(lines, CacheLine([0; REGION_ALIGN]));
        }
    }

    /// Start carving regions from the beginning of the workspace
    pub fn arena(&mut self) -> Arena<'_> {
        Arena {
            rest: bytemuck::cast_slice_mut(&mut self.lines),
            used: 0,
        }
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Atomic cell types that can be carved directly out of the workspace
pub trait AtomicRegion: Send + Sync + Sized {
    /// Plain integer with the same size and bit validity
    type Raw: Pod;
}

impl AtomicRegion for AtomicU32 {
    type Raw = u32;
}

impl AtomicRegion for AtomicI32 {
    type Raw = i32;
}

impl AtomicRegion for AtomicU64 {
    type Raw = u64;
}

impl AtomicRegion for AtomicI64 {
    type Raw = i64;
}

/// Bump allocator over a [`Workspace`]
pub struct Arena<'a> {
    rest: &'a mut [u8],
    used: usize,
}

impl<'a> Arena<'a> {
    /// Carve a zeroed region of `len` elements of `T`
    pub fn take<T: Pod>(&mut self, region: &'static str, len: usize) -> Result<&'a mut [T]> {
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| Error::invalid_argument("len", format!("region '{region}' overflows")))?;
        let padded = region_bytes(bytes);
        if padded > self.rest.len() {
            return Err(Error::WorkspaceExhausted {
                region,
                requested: padded,
                available: self.rest.len(),
            });
        }

        let rest = std::mem::take(&mut self.rest);
        let (head, tail) = rest.split_at_mut(padded);
        self.rest = tail;
        self.used += padded;

        let head = &mut head[..bytes];
        head.fill(0);
        Ok(bytemuck::cast_slice_mut(head))
    }

    /// Carve a zeroed region of `len` atomic cells
    pub fn take_atomic<A: AtomicRegion>(
        &mut self,
        region: &'static str,
        len: usize,
    ) -> Result<&'a [A]> {
        let raw = self.take::<A::Raw>(region, len)?;
        let ptr = raw.as_mut_ptr().cast::<A>();
        debug_assert!(ptr.is_aligned());
        // SAFETY: `A` has the size and bit validity of `A::Raw`, the region is
        // 64-byte aligned, and the exclusive borrow of the region is given up
        // in exchange for the shared atomic view.
        Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
    }

    /// Bytes carved so far, including padding
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

/// Ordered list of the regions a launch will carve.
///
/// Produced by the sizing step; `total_bytes` is the capacity a
/// [`Workspace`] needs for the launch to succeed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkspaceLayout {
    regions: Vec<(&'static str, usize)>,
}

impl WorkspaceLayout {
    /// Empty layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a region of `len` elements, `elem_bytes` each
    pub fn push(&mut self, region: &'static str, elem_bytes: usize, len: usize) {
        self.regions.push((region, region_bytes(elem_bytes * len)));
    }

    /// Regions with their padded sizes, in carve order
    pub fn regions(&self) -> &[(&'static str, usize)] {
        &self.regions
    }

    /// Total padded bytes
    pub fn total_bytes(&self) -> usize {
        self.regions.iter().map(|(_, bytes)| bytes).sum()
    }
}
