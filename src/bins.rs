//! Radial bin edges and squared-distance classification.

use crate::error::{PairCountError, Result};

/// Ordered radial bin edges `rupp[0..K]`, `0 <= rupp[0] < rupp[1] < ... <
/// rupp[K-1]`. Bin `k` (`1 <= k <= K-1`) covers `[rupp[k-1], rupp[k])`.
#[derive(Debug, Clone)]
pub struct BinEdges {
    rupp: Vec<f64>,
}

impl BinEdges {
    /// Validates and wraps a bin-edge sequence. Rejects `K < 2`,
    /// non-monotone edges, and `rmax <= 0` as [`PairCountError::InvalidBins`]
    /// before any lattice construction is attempted.
    pub fn new(rupp: Vec<f64>) -> Result<Self> {
        if rupp.len() < 2 {
            return Err(PairCountError::InvalidBins {
                detail: format!("K = {} edges, need at least 2", rupp.len()),
            });
        }
        if rupp[0] < 0.0 {
            return Err(PairCountError::InvalidBins {
                detail: format!("rupp[0] = {} must be >= 0", rupp[0]),
            });
        }
        for w in rupp.windows(2) {
            if !(w[0] < w[1]) {
                return Err(PairCountError::InvalidBins {
                    detail: format!("edges not strictly increasing: {} >= {}", w[0], w[1]),
                });
            }
        }
        let rmax = *rupp.last().unwrap();
        if !(rmax > 0.0) {
            return Err(PairCountError::InvalidBins {
                detail: format!("rmax = {rmax} must be > 0"),
            });
        }
        Ok(Self { rupp })
    }

    pub fn k(&self) -> usize {
        self.rupp.len()
    }

    pub fn rupp(&self) -> &[f64] {
        &self.rupp
    }

    pub fn rmax(&self) -> f64 {
        *self.rupp.last().unwrap()
    }

    pub fn rmin(&self) -> f64 {
        self.rupp[0]
    }

    /// Builds the derived squared-edge lookup table used by the kernel.
    pub fn lookup(&self) -> BinLookup {
        BinLookup {
            rupp_sqr: self.rupp.iter().map(|r| r * r).collect(),
        }
    }
}

/// Precomputed squared bin edges, used in the hot loop so the kernel never
/// takes a square root until it has already decided a pair is in range
/// (`dist_sum` is the only place `sqrt` is paid for, and only once per
/// accepted pair).
#[derive(Debug, Clone)]
pub struct BinLookup {
    rupp_sqr: Vec<f64>,
}

impl BinLookup {
    #[inline]
    pub fn k(&self) -> usize {
        self.rupp_sqr.len()
    }

    #[inline]
    pub fn rmin_sqr(&self) -> f64 {
        self.rupp_sqr[0]
    }

    #[inline]
    pub fn rmax_sqr(&self) -> f64 {
        *self.rupp_sqr.last().unwrap()
    }

    #[inline]
    pub fn edges_sqr(&self) -> &[f64] {
        &self.rupp_sqr
    }

    /// Classifies a squared distance into a bin ordinal `k in [1, K-1]`, or
    /// `None` when `r2` falls outside `[rmin^2, rmax^2)`.
    ///
    /// Scans from `k = K-1` downward, resolving ties at bin edges
    /// closed-below/open-above: a pair at `r2 == rupp_sqr[k-1]` lands in bin
    /// `k`, not `k-1`.
    #[inline]
    pub fn classify(&self, r2: f64) -> Option<usize> {
        if r2 < self.rmin_sqr() || r2 >= self.rmax_sqr() {
            return None;
        }
        for k in (1..self.rupp_sqr.len()).rev() {
            if r2 >= self.rupp_sqr[k - 1] {
                return Some(k);
            }
        }
        None
    }
}
