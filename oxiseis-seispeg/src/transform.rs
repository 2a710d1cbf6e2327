//! Lapped orthogonal transform (LOT) for 8- and 16-sample windows.
//!
//! The transform is computed in two stages:
//!
//! 1. A butterfly "fold" across every window boundary. Each pair of samples
//!    `(x[b - 1 - j], x[b + j])` at distance `j` from boundary `b` is rotated
//!    by a sine-window angle, which spreads every basis function half a
//!    window into its neighbours.
//! 2. An orthonormal DCT-IV on every window.
//!
//! Both stages are orthogonal, so the inverse applies the transposed stages in
//! reverse order. The two outer boundaries are handled by reflecting the
//! signal into a scratch buffer of `nsamps + 2 * trans_length` samples. The
//! right edge is reflected with a negated sign so that both edge folds reduce
//! to the same gain `cos θ + sin θ`.
//!
//! When a compression block is longer than the transform window, the
//! coefficients of its windows are multiplexed: coefficient `k` of every
//! window is stored next to coefficient `k` of the others, which groups the
//! near-zero high frequencies into long runs.

use oxiseis_core::buffer::GrowBuffer;
use oxiseis_core::error::{OxiSeisError, Result};
use std::f64::consts::PI;
use std::sync::LazyLock;

/// Supported transform window lengths.
pub const TRANS_LENGTHS: [usize; 2] = [8, 16];

/// Precomputed coefficients for one window length.
#[derive(Debug)]
pub struct LotKernel {
    /// Window length.
    pub n: usize,
    /// Row-major `n x n` DCT-IV matrix (symmetric and orthogonal).
    pub dct: Vec<f32>,
    /// Fold rotation cosines, index = distance from the boundary.
    pub cos: Vec<f32>,
    /// Fold rotation sines.
    pub sin: Vec<f32>,
}

impl LotKernel {
    fn build(n: usize) -> Self {
        let scale = (2.0 / n as f64).sqrt();
        let mut dct = vec![0f32; n * n];
        for k in 0..n {
            for i in 0..n {
                let arg = PI / n as f64 * (i as f64 + 0.5) * (k as f64 + 0.5);
                dct[k * n + i] = (scale * arg.cos()) as f32;
            }
        }

        let half = n / 2;
        let mut cos = vec![0f32; half];
        let mut sin = vec![0f32; half];
        for j in 0..half {
            let phi = PI / 4.0 + PI * (j as f64 + 0.5) / (2.0 * n as f64);
            cos[j] = phi.sin() as f32;
            sin[j] = phi.cos() as f32;
        }

        Self { n, dct, cos, sin }
    }

    /// `out = DCT-IV(input)`; also its own inverse.
    #[inline]
    fn dct4(&self, input: &[f32], out: &mut [f32]) {
        let n = self.n;
        for (k, y) in out.iter_mut().enumerate().take(n) {
            let row = &self.dct[k * n..(k + 1) * n];
            *y = row.iter().zip(input).map(|(c, v)| c * v).sum();
        }
    }

    /// Forward rotation of the pairs around boundary `b` of `buf`.
    #[inline]
    fn fold(&self, buf: &mut [f32], b: usize) {
        for j in 0..self.n / 2 {
            let (c, s) = (self.cos[j], self.sin[j]);
            let a = buf[b - 1 - j];
            let r = buf[b + j];
            buf[b - 1 - j] = c * a - s * r;
            buf[b + j] = s * a + c * r;
        }
    }

    /// Inverse of [`fold`](Self::fold).
    #[inline]
    fn unfold(&self, buf: &mut [f32], b: usize) {
        for j in 0..self.n / 2 {
            let (c, s) = (self.cos[j], self.sin[j]);
            let a = buf[b - 1 - j];
            let r = buf[b + j];
            buf[b - 1 - j] = c * a + s * r;
            buf[b + j] = c * r - s * a;
        }
    }
}

static LOT8: LazyLock<LotKernel> = LazyLock::new(|| LotKernel::build(8));
static LOT16: LazyLock<LotKernel> = LazyLock::new(|| LotKernel::build(16));

/// Coefficient tables for `trans_length` (8 or 16).
pub fn kernel(trans_length: usize) -> Result<&'static LotKernel> {
    match trans_length {
        8 => Ok(&*LOT8),
        16 => Ok(&*LOT16),
        other => Err(OxiSeisError::invalid_parameter(
            "trans_length",
            format!("must be 8 or 16, got {other}"),
        )),
    }
}

/// Check a (block size, transform length) pair.
pub fn check_lengths(block_size: usize, trans_length: usize) -> Result<()> {
    kernel(trans_length)?;
    if block_size == 0 || block_size % trans_length != 0 {
        return Err(OxiSeisError::invalid_parameter(
            "block_size",
            format!("{block_size} is not a positive multiple of {trans_length}"),
        ));
    }
    Ok(())
}

/// Scratch length needed by [`lot_fwd`] / [`lot_rev`].
pub fn scratch_len(nsamps: usize, trans_length: usize) -> usize {
    nsamps + 2 * trans_length
}

fn prepare<'a>(
    x: &'a mut [f32],
    index: usize,
    block_size: usize,
    trans_length: usize,
    nblocks: usize,
    scratch: &[f32],
) -> Result<(&'a mut [f32], &'static LotKernel)> {
    check_lengths(block_size, trans_length)?;
    let nsamps = block_size * nblocks;
    let needed = scratch_len(nsamps, trans_length);
    if scratch.len() < needed {
        return Err(OxiSeisError::buffer_too_small(needed, scratch.len()));
    }
    let available = x.len();
    let signal = x
        .get_mut(index..index + nsamps)
        .ok_or_else(|| OxiSeisError::buffer_too_small(index + nsamps, available))?;
    Ok((signal, kernel(trans_length)?))
}

/// Forward LOT of `nblocks * block_size` samples of `x` starting at `index`.
pub fn lot_fwd(
    x: &mut [f32],
    index: usize,
    block_size: usize,
    trans_length: usize,
    nblocks: usize,
    scratch: &mut [f32],
) -> Result<()> {
    let (signal, lot) = prepare(x, index, block_size, trans_length, nblocks, scratch)?;
    let n = trans_length;
    let len = signal.len();
    if len == 0 {
        return Ok(());
    }

    let ext = &mut scratch[..len + 2 * n];
    ext[n..n + len].copy_from_slice(signal);
    for j in 0..n {
        ext[n - 1 - j] = signal[j];
        ext[n + len + j] = -signal[len - 1 - j];
    }

    let windows = len / n;
    for k in 0..=windows {
        lot.fold(ext, n + k * n);
    }
    for k in 0..windows {
        let start = n + k * n;
        lot.dct4(&ext[start..start + n], &mut signal[k * n..(k + 1) * n]);
    }

    if block_size > n {
        multiplex(signal, block_size, n, &mut scratch[..block_size]);
    }
    Ok(())
}

/// Reverse LOT, undoing [`lot_fwd`].
pub fn lot_rev(
    x: &mut [f32],
    index: usize,
    block_size: usize,
    trans_length: usize,
    nblocks: usize,
    scratch: &mut [f32],
) -> Result<()> {
    let (signal, lot) = prepare(x, index, block_size, trans_length, nblocks, scratch)?;
    let n = trans_length;
    let len = signal.len();
    if len == 0 {
        return Ok(());
    }

    if block_size > n {
        demultiplex(signal, block_size, n, &mut scratch[..block_size]);
    }

    let ext = &mut scratch[..len + 2 * n];
    let windows = len / n;
    for k in 0..windows {
        let start = n + k * n;
        lot.dct4(&signal[k * n..(k + 1) * n], &mut ext[start..start + n]);
    }
    for k in 1..windows {
        lot.unfold(ext, n + k * n);
    }
    for j in 0..n / 2 {
        let gain = lot.cos[j] + lot.sin[j];
        ext[n + j] /= gain;
        ext[n + len - 1 - j] /= gain;
    }

    signal.copy_from_slice(&ext[n..n + len]);
    Ok(())
}

/// Group coefficient `k` of every window of each block together.
fn multiplex(signal: &mut [f32], block_size: usize, n: usize, tmp: &mut [f32]) {
    let windows = block_size / n;
    for block in signal.chunks_exact_mut(block_size) {
        tmp.copy_from_slice(block);
        for w in 0..windows {
            for k in 0..n {
                block[k * windows + w] = tmp[w * n + k];
            }
        }
    }
}

/// Inverse of [`multiplex`].
fn demultiplex(signal: &mut [f32], block_size: usize, n: usize, tmp: &mut [f32]) {
    let windows = block_size / n;
    for block in signal.chunks_exact_mut(block_size) {
        tmp.copy_from_slice(block);
        for w in 0..windows {
            for k in 0..n {
                block[w * n + k] = tmp[k * windows + w];
            }
        }
    }
}

/// Swap neighbouring samples; stands in for the LOT in integrity-test mode.
pub fn integrity_permute(x: &mut [f32]) {
    for pair in x.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// Shape of a padded 2D block, stored trace by trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockShape {
    /// Samples per trace (padded).
    pub n1: usize,
    /// Traces (padded).
    pub n2: usize,
    /// Block size along the time axis.
    pub vertical_block: usize,
    /// Block size along the trace axis.
    pub horizontal_block: usize,
    /// Transform length along the time axis.
    pub vertical_trans: usize,
    /// Transform length along the trace axis.
    pub horizontal_trans: usize,
}

/// Applies the LOT along both axes of a padded 2D block.
///
/// Owns its scratch buffers; one instance per thread.
#[derive(Debug, Default)]
pub struct Transformer {
    integrity_test: bool,
    scratch: GrowBuffer<f32>,
    column: GrowBuffer<f32>,
}

impl Transformer {
    /// Create a transformer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the LOT by a pairwise sample swap, to check the other
    /// pipeline stages in isolation.
    pub fn set_integrity_test(&mut self, enabled: bool) {
        self.integrity_test = enabled;
    }

    /// Whether integrity-test mode is on.
    pub fn integrity_test(&self) -> bool {
        self.integrity_test
    }

    /// Forward transform: trace axis first, then time axis.
    pub fn forward_2d(&mut self, data: &mut [f32], shape: BlockShape) -> Result<()> {
        self.along_traces(data, shape, true)?;
        self.along_time(data, shape, true)
    }

    /// Reverse transform: time axis first, then trace axis.
    pub fn reverse_2d(&mut self, data: &mut [f32], shape: BlockShape) -> Result<()> {
        self.along_time(data, shape, false)?;
        self.along_traces(data, shape, false)
    }

    fn along_time(&mut self, data: &mut [f32], shape: BlockShape, forward: bool) -> Result<()> {
        let nblocks = shape.n1 / shape.vertical_block;
        let scratch = self
            .scratch
            .ensure(scratch_len(shape.n1, shape.vertical_trans));
        for trace in data.chunks_exact_mut(shape.n1).take(shape.n2) {
            if self.integrity_test {
                integrity_permute(trace);
            } else if forward {
                lot_fwd(
                    trace,
                    0,
                    shape.vertical_block,
                    shape.vertical_trans,
                    nblocks,
                    scratch,
                )?;
            } else {
                lot_rev(
                    trace,
                    0,
                    shape.vertical_block,
                    shape.vertical_trans,
                    nblocks,
                    scratch,
                )?;
            }
        }
        Ok(())
    }

    fn along_traces(&mut self, data: &mut [f32], shape: BlockShape, forward: bool) -> Result<()> {
        let nblocks = shape.n2 / shape.horizontal_block;
        let scratch = self
            .scratch
            .ensure(scratch_len(shape.n2, shape.horizontal_trans));
        let column = self.column.ensure(shape.n2);

        for i in 0..shape.n1 {
            for (t, slot) in column.iter_mut().enumerate() {
                *slot = data[t * shape.n1 + i];
            }
            if self.integrity_test {
                integrity_permute(column);
            } else if forward {
                lot_fwd(
                    column,
                    0,
                    shape.horizontal_block,
                    shape.horizontal_trans,
                    nblocks,
                    scratch,
                )?;
            } else {
                lot_rev(
                    column,
                    0,
                    shape.horizontal_block,
                    shape.horizontal_trans,
                    nblocks,
                    scratch,
                )?;
            }
            for (t, &v) in column.iter().enumerate() {
                data[t * shape.n1 + i] = v;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
            })
            .collect()
    }

    fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
    }

    #[test]
    fn test_dct_is_orthonormal() {
        for n in TRANS_LENGTHS {
            let lot = kernel(n).unwrap();
            assert_eq!(lot.dct.len(), n * n);
            for a in 0..n {
                for b in 0..n {
                    let dot: f32 = (0..n).map(|i| lot.dct[a * n + i] * lot.dct[b * n + i]).sum();
                    let expected = if a == b { 1.0 } else { 0.0 };
                    assert!((dot - expected).abs() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_fold_rotations_are_unit() {
        for n in TRANS_LENGTHS {
            let lot = kernel(n).unwrap();
            for j in 0..n / 2 {
                let norm = lot.cos[j] * lot.cos[j] + lot.sin[j] * lot.sin[j];
                assert!((norm - 1.0).abs() < 1e-6);
                assert!(lot.cos[j] > lot.sin[j]);
            }
        }
    }

    #[test]
    fn test_invalid_lengths() {
        assert!(check_lengths(16, 12).is_err());
        assert!(check_lengths(20, 8).is_err());
        assert!(check_lengths(0, 8).is_err());
        assert!(check_lengths(48, 16).is_ok());
    }

    #[test]
    fn test_roundtrip_all_block_shapes() {
        for (block, trans, nblocks) in [(8, 8, 4), (16, 16, 3), (32, 8, 2), (64, 16, 2), (16, 8, 1)] {
            let len = block * nblocks;
            let original = noise(len + 5, 17);
            let mut x = original.clone();
            let mut scratch = vec![0f32; scratch_len(len, trans)];
            lot_fwd(&mut x, 5, block, trans, nblocks, &mut scratch).unwrap();
            assert_eq!(&x[..5], &original[..5]);
            assert!(max_abs_diff(&x[5..], &original[5..]) > 1e-3);
            lot_rev(&mut x, 5, block, trans, nblocks, &mut scratch).unwrap();
            assert!(
                max_abs_diff(&x, &original) < 1e-4,
                "block {block} trans {trans}"
            );
        }
    }

    #[test]
    fn test_smooth_signal_compacts_energy() {
        let len = 64;
        let mut x: Vec<f32> = (0..len).map(|i| (i as f32 * 0.05).sin() + 2.0).collect();
        let mut scratch = vec![0f32; scratch_len(len, 16)];
        lot_fwd(&mut x, 0, 64, 16, 1, &mut scratch).unwrap();

        // Multiplexed layout: coefficient k of window w sits at k * 4 + w.
        let total: f32 = x.iter().map(|v| v * v).sum();
        let high: f32 = x[32..].iter().map(|v| v * v).sum();
        assert!(high < total * 0.01, "high {high} total {total}");

        // The last window carries the right-edge reflection; the others
        // should have essentially nothing above coefficient 8.
        let x = &x;
        let interior_high: f32 = (8..16)
            .flat_map(|k| (0..3).map(move |w| x[k * 4 + w]))
            .map(|v| v * v)
            .sum();
        assert!(interior_high < total * 1e-4);
    }

    #[test]
    fn test_short_signal_is_rejected() {
        let mut x = vec![0f32; 20];
        let mut scratch = vec![0f32; scratch_len(16, 8)];
        assert!(matches!(
            lot_fwd(&mut x, 8, 16, 8, 1, &mut scratch),
            Err(OxiSeisError::BufferTooSmall {
                needed: 24,
                available: 20
            })
        ));
    }

    #[test]
    fn test_multiplex_layout() {
        let mut block: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let mut tmp = vec![0f32; 16];
        multiplex(&mut block, 16, 8, &mut tmp);
        assert_eq!(&block[..4], &[0.0, 8.0, 1.0, 9.0]);
        demultiplex(&mut block, 16, 8, &mut tmp);
        assert_eq!(block, (0..16).map(|v| v as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_scratch_too_small() {
        let mut x = vec![0f32; 16];
        let mut scratch = vec![0f32; 16];
        assert!(matches!(
            lot_fwd(&mut x, 0, 16, 16, 1, &mut scratch),
            Err(OxiSeisError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_2d_roundtrip() {
        let shape = BlockShape {
            n1: 64,
            n2: 32,
            vertical_block: 32,
            horizontal_block: 16,
            vertical_trans: 16,
            horizontal_trans: 8,
        };
        let original = noise(shape.n1 * shape.n2, 99);
        let mut data = original.clone();
        let mut transformer = Transformer::new();
        transformer.forward_2d(&mut data, shape).unwrap();
        transformer.reverse_2d(&mut data, shape).unwrap();
        assert!(max_abs_diff(&data, &original) < 1e-4);
    }

    #[test]
    fn test_integrity_mode_is_a_permutation() {
        let shape = BlockShape {
            n1: 16,
            n2: 16,
            vertical_block: 16,
            horizontal_block: 16,
            vertical_trans: 16,
            horizontal_trans: 16,
        };
        let original = noise(256, 5);
        let mut data = original.clone();
        let mut transformer = Transformer::new();
        transformer.set_integrity_test(true);
        transformer.forward_2d(&mut data, shape).unwrap();
        assert_eq!(data[0], original[shape.n1 + 1]);
        transformer.reverse_2d(&mut data, shape).unwrap();
        assert_eq!(data, original);
    }
}
