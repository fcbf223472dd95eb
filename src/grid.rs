//! The cell-grid spatial index.
//!
//! ## Layout
//!
//! A lattice is `nx*ny*nz` flat *sub*-buffers (one per cell), laid out back
//! to back in three axis-parallel `Vec<f64>`s plus an `offsets` table, built
//! with a two-pass count-then-fill so no cell ever reallocates mid-fill:
//!
//! ```text
//! offsets: [ 0 | c0 | c0+c1 | c0+c1+c2 | ... ]      <- prefix sum of counts
//! x:       [ -- cell 0 -- | -- cell 1 -- | ... ]     <- one contiguous slab
//! ```
//!
//! `Cell::x/y/z` below are then just `&lattice.x[offsets[c]..offsets[c+1]]`
//! slices into that slab — every cell owns a contiguous range, never its own
//! heap allocation, so the pair kernel streams through cache-contiguous
//! memory instead of chasing per-point heap pointers.

use crate::error::{Axis, PairCountError, Result, try_reserve};
use crate::geometry::{BoundingBox, PointCloud};

/// A read-only view of the points inside one lattice cell.
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub z: &'a [f64],
}

impl<'a> Cell<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// The uniform 3-D lattice built over a bounding box.
#[derive(Debug)]
pub struct Lattice {
    nx: usize,
    ny: usize,
    nz: usize,
    /// Prefix-summed cell boundaries into `x`/`y`/`z`, length `nx*ny*nz + 1`.
    offsets: Vec<usize>,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl Lattice {
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    pub fn total_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Linear index of cell `(ix, iy, iz)`, row-major: `ix*ny*nz + iy*nz + iz`.
    #[inline]
    pub fn linear_index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        ix * self.ny * self.nz + iy * self.nz + iz
    }

    /// Inverse of [`Lattice::linear_index`]. The driver uses this to recover
    /// `(ix, iy, iz)` from a linear cell id and asserts the round-trip holds.
    #[inline]
    pub fn cell_coords(&self, c: usize) -> (usize, usize, usize) {
        let iz = c % self.nz;
        let iy = (c / self.nz) % self.ny;
        let ix = c / (self.nz * self.ny);
        (ix, iy, iz)
    }

    #[inline]
    pub fn cell(&self, c: usize) -> Cell<'_> {
        let start = self.offsets[c];
        let end = self.offsets[c + 1];
        Cell {
            x: &self.x[start..end],
            y: &self.y[start..end],
            z: &self.z[start..end],
        }
    }
}

/// Builds a [`Lattice`] over `cloud` within `bbox`, with cell width along
/// each axis at least `rmax / bin_refine_factor`.
pub fn build(
    cloud: &PointCloud,
    bbox: &BoundingBox,
    rmax: f64,
    bin_refine_factor: u32,
) -> Result<Lattice> {
    if !(rmax > 0.0) {
        return Err(PairCountError::InvalidBins {
            detail: format!("rmax = {rmax} must be > 0"),
        });
    }
    bbox.validate_contains(cloud)?;

    let bf = bin_refine_factor.max(1) as f64;
    let nx = ((bbox.extent_x() * bf / rmax).floor() as usize).max(1);
    let ny = ((bbox.extent_y() * bf / rmax).floor() as usize).max(1);
    let nz = ((bbox.extent_z() * bf / rmax).floor() as usize).max(1);

    let wx = bbox.extent_x() / nx as f64;
    let wy = bbox.extent_y() / ny as f64;
    let wz = bbox.extent_z() / nz as f64;

    let total_cells = nx * ny * nz;
    let n = cloud.len();

    // Pass 1: which cell does each point belong to, and how many points per
    // cell. Computed once so the fill pass below never has to grow a `Vec`.
    let mut cell_of = Vec::new();
    try_reserve(&mut cell_of, n)?;
    let mut counts = vec![0usize; total_cells];

    for i in 0..n {
        let ix = cell_axis_index(cloud.x[i], bbox.xmin, wx, nx, Axis::X)?;
        let iy = cell_axis_index(cloud.y[i], bbox.ymin, wy, ny, Axis::Y)?;
        let iz = cell_axis_index(cloud.z[i], bbox.zmin, wz, nz, Axis::Z)?;
        let c = ix * ny * nz + iy * nz + iz;
        cell_of.push(c);
        counts[c] += 1;
    }

    // Prefix-sum the per-cell counts into slab offsets.
    let mut offsets = Vec::new();
    try_reserve(&mut offsets, total_cells + 1)?;
    offsets.push(0usize);
    let mut running = 0usize;
    for &count in &counts {
        running += count;
        offsets.push(running);
    }

    // Pass 2: scatter each point into its cell's slot, tracked by a cursor
    // per cell so points land in stable (if unspecified) order within a
    // cell build.
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut z = Vec::new();
    try_reserve(&mut x, n)?;
    try_reserve(&mut y, n)?;
    try_reserve(&mut z, n)?;
    x.resize(n, 0.0);
    y.resize(n, 0.0);
    z.resize(n, 0.0);

    let mut cursor = offsets[..total_cells].to_vec();
    for i in 0..n {
        let c = cell_of[i];
        let slot = cursor[c];
        x[slot] = cloud.x[i];
        y[slot] = cloud.y[i];
        z[slot] = cloud.z[i];
        cursor[c] += 1;
    }

    Ok(Lattice {
        nx,
        ny,
        nz,
        offsets,
        x,
        y,
        z,
    })
}

#[inline]
fn cell_axis_index(
    coord: f64,
    min: f64,
    width: f64,
    n: usize,
    axis: Axis,
) -> Result<usize> {
    if width <= 0.0 {
        return Err(PairCountError::InvalidGeometry {
            axis,
            detail: format!("degenerate cell width {width} on {axis} axis"),
        });
    }
    let raw = ((coord - min) / width).floor();
    if !raw.is_finite() {
        return Err(PairCountError::InvalidGeometry {
            axis,
            detail: format!("non-finite cell index computed for coordinate {coord}"),
        });
    }
    let idx = raw as i64;
    Ok(idx.clamp(0, n as i64 - 1) as usize)
}

/// Second lattice in a pair count: either a shared alias of the first
/// (autocorrelation) or an independently built one (cross-correlation).
/// Ownership is carried exactly once, so there is no way to double-build or
/// to forget to build the non-aliased case.
pub enum Lattice2<'a> {
    Same(&'a Lattice),
    Other(Lattice),
}

impl<'a> Lattice2<'a> {
    pub fn as_lattice(&self) -> &Lattice {
        match self {
            Lattice2::Same(l) => l,
            Lattice2::Other(l) => l,
        }
    }
}

/// Checks that two independently-built lattices agree on `(nx, ny, nz)`,
/// required before cross-correlation can proceed.
pub fn check_grid_match(lattice1: &Lattice, lattice2: &Lattice) -> Result<()> {
    if lattice1.dims() != lattice2.dims() {
        return Err(PairCountError::GridMismatch {
            lattice1: lattice1.dims(),
            lattice2: lattice2.dims(),
        });
    }
    Ok(())
}
