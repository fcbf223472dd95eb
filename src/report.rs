//! Human-readable reporting line, kept separate from the kernel: the kernel
//! returns a [`crate::driver::PairCountResult`] value, and formatting is an
//! external collaborator over that value, not something the counting loop
//! does as a side effect.

use crate::bins::BinEdges;
use crate::driver::PairCountResult;

/// Renders one line per bin `k = 1..K-1`:
///
/// ```text
/// <count:10d> <rpavg:20.8f> <rlow:20.8f> <rhigh:20.8f>
/// ```
///
/// `rpavg` is `0.0` when [`PairCountResult::dist_mean`] was not requested.
pub fn format_bins(result: &PairCountResult, bin_edges: &BinEdges) -> String {
    let rupp = bin_edges.rupp();
    let mut out = String::new();
    for k in 1..bin_edges.k() {
        let count = result.hist[k];
        let rpavg = result
            .dist_mean
            .as_ref()
            .map(|means| means[k])
            .unwrap_or(0.0);
        let rlow = rupp[k - 1];
        let rhigh = rupp[k];
        out.push_str(&format!(
            "{count:10} {rpavg:20.8} {rlow:20.8} {rhigh:20.8}\n"
        ));
    }
    out
}
