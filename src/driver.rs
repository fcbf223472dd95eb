//! The thread-parallel driver.
//!
//! Partitions cell indices across a `rayon` thread pool with
//! `into_par_iter().fold().reduce()`: each task accumulates its own
//! histogram (and optional distance sums), and the per-task partials are
//! combined with a commutative reduction so the result does not depend on
//! how work happened to be scheduled.

use crate::bins::{BinEdges, BinLookup};
use crate::config::KernelConfig;
use crate::error::Result;
use crate::geometry::{BoundingBox, PointCloud};
use crate::grid::{self, check_grid_match, Lattice, Lattice2};
use crate::kernel::{self, Accumulator};
use rayon::prelude::*;

/// The result of one `count_pairs` call: the filled histogram (`hist[0]`
/// always zero) and, when requested, the per-bin mean distance.
#[derive(Debug, Clone)]
pub struct PairCountResult {
    pub hist: Vec<u64>,
    pub dist_mean: Option<Vec<f64>>,
}

/// Runs the full Build -> Count -> Reduce pipeline.
///
/// `d2` is `None` under autocorrelation (`D2 = D1`); the driver builds a
/// single lattice and aliases it via [`Lattice2::Same`] rather than
/// building a second, identical one.
pub fn run(
    d1: &PointCloud,
    d2: Option<&PointCloud>,
    bbox: &BoundingBox,
    bin_edges: &BinEdges,
    autocorr: bool,
    config: &KernelConfig,
) -> Result<PairCountResult> {
    let bin_refine_factor = config.resolved_bin_refine_factor();
    let rmax = bin_edges.rmax();

    let build_span = tracing::debug_span!("build", bin_refine_factor, rmax);
    let _enter = build_span.enter();

    let lattice1 = grid::build(d1, bbox, rmax, bin_refine_factor)?;
    let lattice2 = if autocorr {
        Lattice2::Same(&lattice1)
    } else {
        let d2 = d2.expect("d2 must be supplied when autocorr is false");
        let built = grid::build(d2, bbox, rmax, bin_refine_factor)?;
        check_grid_match(&lattice1, &built)?;
        Lattice2::Other(built)
    };
    drop(_enter);

    let lookup = bin_edges.lookup();
    let k = lookup.k();
    let n_threads = config.n_threads.max(1);

    tracing::debug!(n_threads, total_cells = lattice1.total_cells(), "count phase starting");
    let (hist, dist_sum) = count_phase(
        &lattice1,
        lattice2.as_lattice(),
        &lookup,
        bin_refine_factor,
        n_threads,
        config.compute_rpavg,
    )?;

    tracing::debug!("reduce phase complete");
    let dist_mean = dist_sum.map(|sums| {
        sums.iter()
            .zip(hist.iter())
            .map(|(&s, &n)| if n > 0 { s / n as f64 } else { 0.0 })
            .collect()
    });

    Ok(PairCountResult { hist, dist_mean })
}

/// Partitions `[0, total_cells)` across a rayon thread pool sized to
/// `n_threads`, dynamically scheduled (rayon's own work-stealing iterator),
/// folding into one histogram per rayon task and reducing them in ascending
/// task order for distance-sum reproducibility.
fn count_phase(
    lattice1: &Lattice,
    lattice2: &Lattice,
    lookup: &BinLookup,
    bin_refine_factor: u32,
    n_threads: usize,
    compute_rpavg: bool,
) -> Result<(Vec<u64>, Option<Vec<f64>>)> {
    let k = lookup.k();
    let total_cells = lattice1.total_cells();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map_err(|_| crate::error::PairCountError::OutOfMemory {
            requested_bytes: n_threads * std::mem::size_of::<usize>(),
        })?;

    let (hist, dist_sum) = pool.install(|| {
        (0..total_cells)
            .into_par_iter()
            .fold(
                || (vec![0u64; k], compute_rpavg.then(|| vec![0.0f64; k])),
                |mut state, c| {
                    visit_cell(lattice1, lattice2, lookup, bin_refine_factor, c, &mut state);
                    state
                },
            )
            .reduce(
                || (vec![0u64; k], compute_rpavg.then(|| vec![0.0f64; k])),
                |mut a, b| {
                    for i in 0..k {
                        a.0[i] += b.0[i];
                    }
                    if let (Some(da), Some(db)) = (a.1.as_mut(), b.1.as_ref()) {
                        for i in 0..k {
                            da[i] += db[i];
                        }
                    }
                    a
                },
            )
    });

    Ok((hist, dist_sum))
}

type ThreadState = (Vec<u64>, Option<Vec<f64>>);

/// Visits outer cell `c` of `lattice1` against its `(2*bf+1)^3` neighborhood
/// in `lattice2`, accumulating into `state`. Neighbor offsets are iterated
/// `dix`, then `diy`, then `diz`, which fixes the floating-point summation
/// order of `dist_sum` within one cell even though it never affects `hist`.
fn visit_cell(
    lattice1: &Lattice,
    lattice2: &Lattice,
    lookup: &BinLookup,
    bin_refine_factor: u32,
    c: usize,
    state: &mut ThreadState,
) {
    let (ix, iy, iz) = lattice1.cell_coords(c);
    debug_assert_eq!(lattice1.linear_index(ix, iy, iz), c);

    let (nx, ny, nz) = lattice2.dims();
    let bf = bin_refine_factor as i64;
    let cell_a = lattice1.cell(c);

    for dix in -bf..=bf {
        let iix = ix as i64 + dix;
        if iix < 0 || iix >= nx as i64 {
            continue;
        }
        for diy in -bf..=bf {
            let iiy = iy as i64 + diy;
            if iiy < 0 || iiy >= ny as i64 {
                continue;
            }
            for diz in -bf..=bf {
                let iiz = iz as i64 + diz;
                if iiz < 0 || iiz >= nz as i64 {
                    continue;
                }
                let c2 = lattice2.linear_index(iix as usize, iiy as usize, iiz as usize);
                let cell_b = lattice2.cell(c2);

                let mut acc = Accumulator {
                    hist: &mut state.0,
                    dist_sum: state.1.as_deref_mut(),
                };
                kernel::accumulate(cell_a, cell_b, lookup, &mut acc);
            }
        }
    }
}
