//! # paircount — cell-grid spatial pair-counting engine
//!
//! ## Architecture Overview
//!
//! Given two point clouds D1, D2 (or D2 = D1 for autocorrelation) and a
//! sequence of radial bin edges, this crate counts, for every bin, how many
//! ordered pairs `(p, q) in D1 x D2` have a Euclidean separation in that
//! bin. The naive approach is O(N*M) pairwise distance evaluations; this
//! crate instead partitions space into a uniform cell grid ([`grid`]) sized
//! so that only a small, fixed neighborhood of cells around each point can
//! possibly hold a partner within `rmax` — pruning the search to
//! O(N * k-bar) where k-bar is the expected neighbor count within `rmax`.
//!
//! Four pieces, leaves first:
//!
//! - [`grid`] — the cell-grid spatial index.
//! - [`bins`] — squared bin-edge storage and distance classification.
//! - [`kernel`] — the pairwise distance/bin-classification inner loop,
//!   with scalar and lane-batched forms.
//! - [`driver`] — the rayon-backed thread-parallel reduction.
//!
//! ## Why `mimalloc`
//!
//! Every grid build allocates one flat coordinate buffer per axis per
//! lattice, sized to the point count, plus a per-cell offsets table —
//! exactly the allocation-heavy, short-lived-per-call pattern `mimalloc`'s
//! per-thread size-segregated free lists are built for. Declared at the
//! crate root so it applies process-wide.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod bins;
pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod kernel;
pub mod report;

pub use bins::{BinEdges, BinLookup};
pub use config::KernelConfig;
pub use driver::PairCountResult;
pub use error::{Axis, PairCountError, Result};
pub use geometry::{BoundingBox, PointCloud};

/// Kernel entry point: counts pairs between `d1` and `d2` (or within `d1`
/// alone, under autocorrelation) whose Euclidean distance falls within the
/// bins described by `bin_edges`.
///
/// `d2` must be `Some` unless `autocorr` is `true`.
pub fn count_pairs(
    d1: &PointCloud,
    d2: Option<&PointCloud>,
    bbox: &BoundingBox,
    bin_edges: &BinEdges,
    autocorr: bool,
    config: &KernelConfig,
) -> Result<PairCountResult> {
    if !autocorr && d2.is_none() {
        return Err(PairCountError::InvalidGeometry {
            axis: Axis::X,
            detail: "d2 must be provided when autocorr is false".to_string(),
        });
    }
    driver::run(d1, d2, bbox, bin_edges, autocorr, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(points: &[(f64, f64, f64)]) -> PointCloud {
        PointCloud::new(
            points.iter().map(|p| p.0).collect(),
            points.iter().map(|p| p.1).collect(),
            points.iter().map(|p| p.2).collect(),
        )
    }

    #[test]
    fn colinear_triple_hits_expected_bins() {
        let d1 = cloud(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (3.0, 0.0, 0.0)]);
        let bbox = BoundingBox::new(-1.0, 5.0, -1.0, 5.0, -1.0, 5.0).unwrap();
        // rupp[0] > 0 excludes the zero-distance self-pairs, leaving the
        // pairwise distances 1 (bin1), 2 (bin2), and 3 (bin3), each ordered
        // both ways.
        let edges = BinEdges::new(vec![1e-6, 1.5, 2.5, 4.0]).unwrap();
        let config = KernelConfig::new(1);

        let result = count_pairs(&d1, None, &bbox, &edges, true, &config).unwrap();
        assert_eq!(result.hist[1], 2);
        assert_eq!(result.hist[2], 2);
        assert_eq!(result.hist[3], 2);
    }

    // Two well-separated clusters -> no cross-cluster pairs.
    #[test]
    fn well_separated_clusters_have_no_cross_pairs() {
        let mut points = vec![(0.0, 0.0, 0.0), (0.2, 0.0, 0.0)];
        points.push((50.0, 0.0, 0.0));
        points.push((50.2, 0.0, 0.0));
        let d1 = cloud(&points);
        let bbox = BoundingBox::new(-1.0, 51.0, -1.0, 51.0, -1.0, 51.0).unwrap();
        // rupp[0] > 0 excludes the zero-distance self-pairs.
        let edges = BinEdges::new(vec![1e-6, 1.0]).unwrap();
        let config = KernelConfig::new(1);

        let result = count_pairs(&d1, None, &bbox, &edges, true, &config).unwrap();
        // each cluster contributes one ordered pair in both directions.
        assert_eq!(result.hist[1], 4);
    }

    // Mean distance accumulation.
    #[test]
    fn mean_distance_matches_manual_average() {
        let d1 = cloud(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (2.0, 0.0, 0.0)]);
        let bbox = BoundingBox::new(-1.0, 3.0, -1.0, 3.0, -1.0, 3.0).unwrap();
        // rupp[0] > 0 excludes the zero-distance self-pairs.
        let edges = BinEdges::new(vec![1e-6, 5.0]).unwrap();
        let config = KernelConfig::new(1).with_rpavg(true);

        let result = count_pairs(&d1, None, &bbox, &edges, true, &config).unwrap();
        assert_eq!(result.hist[1], 6);
        let mean = result.dist_mean.unwrap()[1];
        assert!((mean - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn requires_d2_unless_autocorrelating() {
        let d1 = cloud(&[(0.0, 0.0, 0.0)]);
        let bbox = BoundingBox::new(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        let edges = BinEdges::new(vec![0.0, 1.0]).unwrap();
        let config = KernelConfig::new(1);

        assert!(count_pairs(&d1, None, &bbox, &edges, false, &config).is_err());
    }
}
