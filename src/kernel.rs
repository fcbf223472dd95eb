//! The pairwise distance/bin classification kernel.
//!
//! Two entry points accumulate pair counts between two cells —
//! [`accumulate_scalar`] and [`accumulate_wide`] — chosen at runtime by
//! [`use_wide_kernel`]. Both must (and, by construction below, do) produce
//! bit-identical histograms for any input; only floating-point summation
//! order in the optional distance accumulator can differ, and both paths
//! use the same accumulation order (ascending `j`) to avoid even that.
//!
//! The "wide" form batches lanes of `LANES` squared distances together,
//! reduces them to an in-range bitmask, and skips the descending bin scan
//! entirely whenever the mask is all-zero. Rather than reach for raw
//! `core::arch` intrinsics or nightly `std::simd` (neither of which this
//! needs), the lanes are plain `[f64; LANES]` arrays processed with
//! `#[inline(always)]` and `get_unchecked`, the same manual-unroll idiom a
//! hand-written dot product would use for fixed-width accumulation.

use crate::bins::BinLookup;
use crate::grid::Cell;
use std::sync::OnceLock;

/// Inner-loop block size for the scalar path — keeps one chunk of cellB
/// coordinates resident in cache while cellA's point is held in registers.
const BLOCK_SIZE: usize = 16;

/// Lane width for the wide path: one 256-bit AVX2 register holds four
/// `f64`s, the natural width for this kernel's double-precision math.
const LANES: usize = 4;

/// Per-call accumulator the kernel writes into: one histogram slice and an
/// optional distance-sum slice, both indexed `[0, K)` with index 0 unused.
pub struct Accumulator<'a> {
    pub hist: &'a mut [u64],
    pub dist_sum: Option<&'a mut [f64]>,
}

/// Runtime-detected CPU feature set, cached process-wide after first use.
#[derive(Debug, Clone, Copy)]
pub struct CpuFeatures {
    pub avx2: bool,
}

impl CpuFeatures {
    #[cfg(target_arch = "x86_64")]
    fn detect() -> Self {
        Self {
            avx2: is_x86_feature_detected!("avx2"),
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn detect() -> Self {
        Self { avx2: false }
    }
}

static CPU_FEATURES: OnceLock<CpuFeatures> = OnceLock::new();

pub fn cpu_features() -> CpuFeatures {
    *CPU_FEATURES.get_or_init(CpuFeatures::detect)
}

/// Chooses the wide kernel when the `simd` Cargo feature is enabled and the
/// host CPU supports it, otherwise the scalar kernel.
pub fn use_wide_kernel() -> bool {
    cfg!(feature = "simd") && cpu_features().avx2
}

/// Software prefetch of the next cellB coordinate chunk. Performance hint
/// only, never required for correctness, and a no-op on non-x86_64 targets.
#[inline(always)]
fn prefetch_next_chunk(ptr: *const f64) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        _mm_prefetch(ptr as *const i8, _MM_HINT_T0);
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        let _ = ptr;
    }
}

/// Accumulates all pairs between `cell_a` and `cell_b` into `acc`, dispatching
/// to the wide or scalar form per [`use_wide_kernel`]. Neither form applies a
/// self-pair special case: when `cell_a` and `cell_b` are the same cell,
/// `i == j` contributes `r2 == 0`, excluded only when `bins.rmin_sqr() > 0`.
pub fn accumulate(cell_a: Cell<'_>, cell_b: Cell<'_>, bins: &BinLookup, acc: &mut Accumulator<'_>) {
    if use_wide_kernel() {
        accumulate_wide(cell_a, cell_b, bins, acc);
    } else {
        accumulate_scalar(cell_a, cell_b, bins, acc);
    }
}

/// The scalar form: a double loop blocked in `j` by [`BLOCK_SIZE`].
pub fn accumulate_scalar(
    cell_a: Cell<'_>,
    cell_b: Cell<'_>,
    bins: &BinLookup,
    acc: &mut Accumulator<'_>,
) {
    let rmin_sqr = bins.rmin_sqr();
    let rmax_sqr = bins.rmax_sqr();
    let n_b = cell_b.len();

    for i in 0..cell_a.len() {
        let xi = cell_a.x[i];
        let yi = cell_a.y[i];
        let zi = cell_a.z[i];

        let mut j = 0;
        while j < n_b {
            let block_end = (j + BLOCK_SIZE).min(n_b);
            if block_end < n_b {
                prefetch_next_chunk(&cell_b.x[block_end]);
            }
            for jj in j..block_end {
                let dx = xi - cell_b.x[jj];
                let dy = yi - cell_b.y[jj];
                let dz = zi - cell_b.z[jj];
                let r2 = dx * dx + dy * dy + dz * dz;
                if r2 < rmin_sqr || r2 >= rmax_sqr {
                    continue;
                }
                if let Some(k) = bins.classify(r2) {
                    acc.hist[k] += 1;
                    if let Some(dist_sum) = acc.dist_sum.as_deref_mut() {
                        dist_sum[k] += r2.sqrt();
                    }
                }
            }
            j = block_end;
        }
    }
}

/// The wide form: cellB is consumed in lanes of [`LANES`] at a time. For
/// each lane batch, builds an in-range bitmask and skips the bin scan
/// entirely when it is zero; otherwise scans bins from `K-1` down to `1`,
/// incrementing `hist[k]` by the popcount of the matching lanes and
/// clearing them from the live mask, exiting early once it is empty. The
/// remainder (`j` beyond the widest multiple of `LANES`) falls back to the
/// scalar form.
pub fn accumulate_wide(
    cell_a: Cell<'_>,
    cell_b: Cell<'_>,
    bins: &BinLookup,
    acc: &mut Accumulator<'_>,
) {
    let rmin_sqr = bins.rmin_sqr();
    let rmax_sqr = bins.rmax_sqr();
    let edges_sqr = bins.edges_sqr();
    let k_max = edges_sqr.len();
    let n_b = cell_b.len();
    let n_lanes = n_b / LANES;

    for i in 0..cell_a.len() {
        let xi = cell_a.x[i];
        let yi = cell_a.y[i];
        let zi = cell_a.z[i];

        for lane in 0..n_lanes {
            let base = lane * LANES;
            if base + LANES < n_b {
                prefetch_next_chunk(&cell_b.x[base + LANES]);
            }

            // SAFETY: `base + LANES <= n_lanes*LANES <= n_b == cell_b.x.len()`
            // (and equally for y/z), so every lane index below is in bounds.
            let mut r2 = [0.0f64; LANES];
            unsafe {
                for (l, slot) in r2.iter_mut().enumerate() {
                    let dx = xi - cell_b.x.get_unchecked(base + l);
                    let dy = yi - cell_b.y.get_unchecked(base + l);
                    let dz = zi - cell_b.z.get_unchecked(base + l);
                    *slot = dx * dx + dy * dy + dz * dz;
                }
            }

            let mut mask_range: u8 = 0;
            for l in 0..LANES {
                if r2[l] >= rmin_sqr && r2[l] < rmax_sqr {
                    mask_range |= 1 << l;
                }
            }
            if mask_range == 0 {
                continue;
            }

            let mut mask_left = mask_range;
            for k in (1..k_max).rev() {
                if mask_left == 0 {
                    break;
                }
                let mut mask_bin: u8 = 0;
                for l in 0..LANES {
                    if (mask_left & (1 << l)) != 0 && r2[l] >= edges_sqr[k - 1] {
                        mask_bin |= 1 << l;
                    }
                }
                if mask_bin != 0 {
                    acc.hist[k] += mask_bin.count_ones() as u64;
                    if let Some(dist_sum) = acc.dist_sum.as_deref_mut() {
                        for l in 0..LANES {
                            if (mask_bin & (1 << l)) != 0 {
                                dist_sum[k] += r2[l].sqrt();
                            }
                        }
                    }
                    mask_left &= !mask_bin;
                }
            }
        }

        // Tail: j beyond the widest multiple of LANES, handled scalar.
        let tail_start = n_lanes * LANES;
        for j in tail_start..n_b {
            let dx = xi - cell_b.x[j];
            let dy = yi - cell_b.y[j];
            let dz = zi - cell_b.z[j];
            let r2 = dx * dx + dy * dy + dz * dz;
            if r2 < rmin_sqr || r2 >= rmax_sqr {
                continue;
            }
            if let Some(k) = bins.classify(r2) {
                acc.hist[k] += 1;
                if let Some(dist_sum) = acc.dist_sum.as_deref_mut() {
                    dist_sum[k] += r2.sqrt();
                }
            }
        }
    }
}
