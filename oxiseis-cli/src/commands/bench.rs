//! Bench command implementation.
//!
//! Sweeps distortions over synthetic frames and reports ratio, error and
//! throughput for each.

use crate::utils::{CliResult, create_progress_bar};
use oxiseis_seispeg::{
    Policy, SeisPegConfig, compress_frames, compress_frames_parallel, uncompress_frames,
    uncompress_frames_parallel,
};
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

/// Options for the synthetic benchmark.
#[derive(Debug, Clone)]
pub struct BenchOptions {
    /// Samples per trace.
    pub n1: usize,
    /// Traces per frame.
    pub n2: usize,
    /// Number of frames.
    pub frames: usize,
    /// Distortions to sweep.
    pub distortions: Vec<f32>,
    /// Block-size policy.
    pub policy: Policy,
    /// Spread frames over all cores.
    pub parallel: bool,
    /// Output as JSON.
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct BenchRow {
    distortion: f32,
    ratio: f64,
    relative_rms_error: f64,
    compress_mb_s: f64,
    uncompress_mb_s: f64,
}

/// A flat frame of dipping events with a decaying envelope.
fn synthetic_frame(n1: usize, n2: usize, seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_add(0x9E3779B97F4A7C15);
    (0..n1 * n2)
        .map(|k| {
            let (t, i) = (k / n1, k % n1);
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let noise = ((state >> 40) as f32 / (1u64 << 24) as f32 - 0.5) * 0.01;
            let x = i as f32 - 0.3 * t as f32 - seed as f32;
            let decay = (-2.0 * i as f32 / n1 as f32).exp();
            (x * 0.08).sin() * decay + 0.5 * (x * 0.021).cos() * decay + noise
        })
        .collect()
}

fn relative_rms(a: &[Vec<f32>], b: &[Vec<f32>]) -> f64 {
    let (mut err, mut sig) = (0f64, 0f64);
    for (x, y) in a.iter().flatten().zip(b.iter().flatten()) {
        err += ((x - y) as f64).powi(2);
        sig += (*x as f64).powi(2);
    }
    if sig > 0.0 { (err / sig).sqrt() } else { 0.0 }
}

pub fn cmd_bench(opts: &BenchOptions) -> CliResult<()> {
    if opts.frames == 0 {
        return Err("--frames must be at least 1".into());
    }
    let frames: Vec<Vec<f32>> = (0..opts.frames as u64)
        .map(|f| synthetic_frame(opts.n1, opts.n2, f))
        .collect();
    let raw_bytes = (opts.frames * opts.n1 * opts.n2 * 4) as f64;
    let pb = create_progress_bar(opts.distortions.len() as u64, !opts.json);

    let mut rows = Vec::with_capacity(opts.distortions.len());
    for &distortion in &opts.distortions {
        let config = SeisPegConfig::with_policy(opts.n1, opts.n2, distortion, opts.policy);
        debug!(?config, "bench");

        let start = Instant::now();
        let compressed = if opts.parallel {
            compress_frames_parallel(config, &frames)?
        } else {
            compress_frames(config, &frames)?
        };
        let compress_time = start.elapsed().as_secs_f64();

        let start = Instant::now();
        let restored = if opts.parallel {
            uncompress_frames_parallel(config, &compressed, opts.n2)?
        } else {
            uncompress_frames(config, &compressed, opts.n2)?
        };
        let uncompress_time = start.elapsed().as_secs_f64();

        let packed: usize = compressed.iter().map(Vec::len).sum();
        rows.push(BenchRow {
            distortion,
            ratio: raw_bytes / packed.max(1) as f64,
            relative_rms_error: relative_rms(&frames, &restored),
            compress_mb_s: raw_bytes / 1e6 / compress_time.max(1e-9),
            uncompress_mb_s: raw_bytes / 1e6 / uncompress_time.max(1e-9),
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "SeisPEG benchmark: {} frames of {}x{} ({:?}{})",
        opts.frames,
        opts.n1,
        opts.n2,
        opts.policy,
        if opts.parallel { ", parallel" } else { "" }
    );
    println!(
        "{:>10} {:>8} {:>12} {:>14} {:>14}",
        "distortion", "ratio", "rms error", "compress MB/s", "decomp. MB/s"
    );
    for row in &rows {
        println!(
            "{:>10} {:>8.2} {:>12.5} {:>14.1} {:>14.1}",
            row.distortion,
            row.ratio,
            row.relative_rms_error,
            row.compress_mb_s,
            row.uncompress_mb_s
        );
    }
    Ok(())
}
