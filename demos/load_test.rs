//! ```bash
//! RUSTFLAGS="-C target-cpu=native" cargo run --example load_test --release
//! ```

use paircount::report::format_bins;
use paircount::{count_pairs, BinEdges, BoundingBox, KernelConfig, PointCloud};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

/// Half-width of the cube the synthetic clouds are scattered over.
const HALF_EXTENT: f64 = 200.0;
/// Number of points to generate for the load test.
const N_POINTS: usize = 50_000;
/// Deterministic seed for reproducibility.
const SEED: u64 = 42;

fn random_cloud(rng: &mut StdRng, n: usize) -> PointCloud {
    let axis = |rng: &mut StdRng| {
        (0..n)
            .map(|_| rng.gen_range(-HALF_EXTENT..HALF_EXTENT))
            .collect()
    };
    PointCloud::new(axis(rng), axis(rng), axis(rng))
}

fn divider() {
    println!("{}", "─".repeat(60));
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║          paircount Load Test & Consistency Verifier        ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    // ── Phase 1: Data Generation ──────────────────────────────────────────
    divider();
    println!("Phase 1 — Generating random point clouds");
    println!("  Points:  {N_POINTS}");
    println!("  Extent:  [-{HALF_EXTENT}, {HALF_EXTENT}]^3");

    let t0 = Instant::now();
    let mut rng = StdRng::seed_from_u64(SEED);
    let d1 = random_cloud(&mut rng, N_POINTS);
    println!("  Generated in {:?}", t0.elapsed());

    let bbox = BoundingBox::new(
        -HALF_EXTENT - 1.0,
        HALF_EXTENT + 1.0,
        -HALF_EXTENT - 1.0,
        HALF_EXTENT + 1.0,
        -HALF_EXTENT - 1.0,
        HALF_EXTENT + 1.0,
    )?;
    let edges = BinEdges::new(vec![1e-6, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0])?;

    // ── Phase 2: Single-threaded count ─────────────────────────────────────
    divider();
    println!("Phase 2 — Counting pairs, single thread");

    let config = KernelConfig::new(1).with_rpavg(true);
    let t0 = Instant::now();
    let single_thread_result = count_pairs(&d1, None, &bbox, &edges, true, &config)?;
    let single_thread_duration = t0.elapsed();
    let total_pairs: u64 = single_thread_result.hist.iter().sum();

    println!("  Counted {total_pairs} ordered pairs in {single_thread_duration:?}");
    println!(
        "  Throughput: {:.0} cell-visits/sec (not pairs — pruned by the lattice)",
        N_POINTS as f64 / single_thread_duration.as_secs_f64()
    );

    // ── Phase 3: Thread scaling ─────────────────────────────────────────────
    divider();
    println!("Phase 3 — Scaling across thread counts");

    for n_threads in [1usize, 2, 4, 8] {
        let config = KernelConfig::new(n_threads);
        let t0 = Instant::now();
        let result = count_pairs(&d1, None, &bbox, &edges, true, &config)?;
        let duration = t0.elapsed();
        let total: u64 = result.hist.iter().sum();
        println!("  threads={n_threads:<2} total={total:<12} elapsed={duration:?}");
    }

    // ── Phase 4: Thread-count independence check ────────────────────────────
    divider();
    println!("Phase 4 — Verifying thread-count independence of the histogram");

    let baseline = count_pairs(&d1, None, &bbox, &edges, true, &KernelConfig::new(1))?;
    let mut mismatches = 0usize;
    for n_threads in [2usize, 4, 8] {
        let config = KernelConfig::new(n_threads);
        let result = count_pairs(&d1, None, &bbox, &edges, true, &config)?;
        if result.hist != baseline.hist {
            eprintln!("  ✗ threads={n_threads}: histogram diverged from single-threaded baseline");
            mismatches += 1;
        }
    }
    println!("  Mismatches: {mismatches}/3");

    // ── Phase 5: Cross-correlation against a second cloud ───────────────────
    divider();
    println!("Phase 5 — Cross-correlating against a second cloud");

    let d2 = random_cloud(&mut rng, N_POINTS / 5);
    let t0 = Instant::now();
    let cross_result = count_pairs(&d1, Some(&d2), &bbox, &edges, false, &config)?;
    let cross_duration = t0.elapsed();
    println!(
        "  D1 x D2 ({} x {} points) counted in {cross_duration:?}",
        d1.len(),
        d2.len()
    );

    // ── Phase 6: Report ──────────────────────────────────────────────────────
    divider();
    println!("Phase 6 — Per-bin report (autocorrelation, single thread)");
    print!("{}", format_bins(&single_thread_result, &edges));

    // ── Phase 7: Summary ──────────────────────────────────────────────────────
    divider();
    if mismatches == 0 {
        println!("✅ Thread-count independence: PASSED");
    } else {
        println!("❌ Thread-count independence: FAILED ({mismatches} mismatches)");
    }

    println!();
    println!("Performance Summary");
    println!("──────────────────────────────────────────────────");
    println!(
        "  Autocorrelation ({N_POINTS} pts, single thread): {single_thread_duration:?}"
    );
    println!(
        "  Cross-correlation ({} x {} pts): {cross_duration:?}",
        d1.len(),
        d2.len()
    );
    println!("  Total ordered pairs (autocorr): {total_pairs}");
    println!("  Cross-correlation ordered pairs: {}", cross_result.hist.iter().sum::<u64>());
    println!("──────────────────────────────────────────────────");

    Ok(())
}
