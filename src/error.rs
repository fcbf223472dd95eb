//! Typed error kinds for the pair-counting engine.
//!
//! Every failure surface is fatal to the call — there is no per-cell
//! recovery and no retry path, since the computation is deterministic.
//! Partially built `Vec`s are dropped by ordinary Rust ownership on every
//! `?`-propagated exit, so there is no explicit free list to maintain.

use thiserror::Error;

/// One of the three spatial axes, used to report which axis of a
/// [`crate::geometry::BoundingBox`] a point or bound violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Errors the engine can report. Raised during `Build`, never during
/// `Count`/`Reduce` — once the lattices are built the counting loop itself
/// cannot fail.
#[derive(Debug, Error)]
pub enum PairCountError {
    /// A point lies outside the bounding box, or `xmax <= xmin` on some axis.
    #[error("invalid geometry on {axis} axis: {detail}")]
    InvalidGeometry { axis: Axis, detail: String },

    /// `K < 2`, non-monotone edges, or `rmax <= 0`.
    #[error("invalid bin edges: {detail}")]
    InvalidBins { detail: String },

    /// Cross-correlation only: the two lattices disagree on `(nx, ny, nz)`.
    #[error(
        "grid mismatch between lattices: lattice1 = {lattice1:?}, lattice2 = {lattice2:?}"
    )]
    GridMismatch {
        lattice1: (usize, usize, usize),
        lattice2: (usize, usize, usize),
    },

    /// Allocation failed while building a lattice or a histogram.
    #[error("out of memory: failed to allocate {requested_bytes} bytes")]
    OutOfMemory { requested_bytes: usize },
}

pub type Result<T> = std::result::Result<T, PairCountError>;

/// Reserve `additional` elements in `v`, mapping allocation failure to
/// [`PairCountError::OutOfMemory`] instead of aborting the process.
pub(crate) fn try_reserve<T>(v: &mut Vec<T>, additional: usize) -> Result<()> {
    v.try_reserve(additional)
        .map_err(|_| PairCountError::OutOfMemory {
            requested_bytes: additional * std::mem::size_of::<T>(),
        })
}
