//! Lossy block coder: quantization, run-length coding and Huffman coding.
//!
//! A block of transform coefficients is divided by a step size `delta`,
//! rounded, run-length coded into a byte stream and finally entropy coded
//! with the shared [`HuffCoder`]. The encoded block is
//!
//! ```text
//! +-----------+-------------+---------------------------+
//! | delta f32 | nNonZero i32| Huffman(run-length bytes) |
//! +-----------+-------------+---------------------------+
//! ```
//!
//! Only the prefix up to the last non-zero coefficient (rounded up to an even
//! count) is coded. The decoder zero-fills the rest.
//!
//! ## Run-length alphabet
//!
//! | byte          | meaning                                    |
//! |---------------|--------------------------------------------|
//! | `1..=100`     | run of that many zeros                     |
//! | `101, n`      | run of `n` zeros (101..=255)               |
//! | `102, hi, lo` | run of `u16` zeros, chained past 65535     |
//! | `106..=254`   | literal `byte - 180` (`\|v\| < 75`)        |
//! | `103, b`      | literal `75 + b`                           |
//! | `104, b`      | literal `-(75 + b)`                        |
//! | `105, hi, lo` | literal `+u16`                             |
//! | `0, hi, lo`   | literal `-u16`                             |
//! | `255, i32`    | literal, big-endian `i32`                  |

use crate::huffman::{HuffCoder, HuffTable};
use oxiseis_core::buffer::GrowBuffer;
use oxiseis_core::bytecodec::{ByteOrder, read_at, write_at};
use oxiseis_core::error::{OxiSeisError, Result};
use std::sync::Arc;
use tracing::warn;

/// Empirical ratio between the RMS quantization error and the step size.
pub const CPDF: f32 = 0.26;

/// Size of the per-block sub-header (delta + nNonZero).
pub const BLOCK_HEADER_LEN: usize = 8;

/// Value that terminates a quantized stream for run scanning.
const TERMINATOR: i32 = 1;

const MAX_SHORT_RUN: usize = 100;
const ESC_RUN_BYTE: u8 = 101;
const ESC_RUN_SHORT: u8 = 102;
const ESC_POS_BYTE: u8 = 103;
const ESC_NEG_BYTE: u8 = 104;
const ESC_POS_SHORT: u8 = 105;
const ESC_NEG_SHORT: u8 = 0;
const ESC_INT: u8 = 255;
const LITERAL_BIAS: i32 = 180;
const SMALL_LITERAL_LIMIT: u32 = 75;
const BYTE_LITERAL_LIMIT: u32 = SMALL_LITERAL_LIMIT + 255;
const MAX_CHAINED_RUN: usize = 65535;

/// Upper bound on the run-length bytes produced for `n` values.
pub fn max_run_length_bytes(n: usize) -> usize {
    5 * n + 3
}

/// Estimate the quantization step for a block.
///
/// A first RMS over all samples gives a provisional step. The RMS is then
/// recomputed over samples above a quarter of that step, so that the many
/// near-zero coefficients of a transformed block do not drag it down.
/// Returns `1.0` when no sample passes the threshold (e.g. an all-zero block).
pub fn compute_delta(x: &[f32], distortion: f32) -> f32 {
    if x.is_empty() {
        return 1.0;
    }

    let sum: f64 = x.iter().map(|&v| (v as f64) * (v as f64)).sum();
    let rms = (sum / x.len() as f64).sqrt() as f32;
    let threshold = distortion * rms / CPDF / 4.0;

    let (sum2, count) = x
        .iter()
        .filter(|v| v.abs() > threshold)
        .fold((0f64, 0usize), |(s, c), &v| (s + (v as f64) * (v as f64), c + 1));
    if count == 0 {
        return 1.0;
    }

    let rms2 = (sum2 / count as f64).sqrt() as f32;
    distortion * rms2 / CPDF
}

/// Quantize `x` by `delta`, rounding half away from zero.
pub fn quantize(x: &[f32], delta: f32, out: &mut [i32]) {
    for (q, &v) in out.iter_mut().zip(x) {
        let scaled = v / delta;
        *q = if scaled >= 0.0 {
            (scaled + 0.5) as i32
        } else {
            (scaled - 0.5) as i32
        };
    }
}

/// Run-length code `values[..n]`, where `values[n]` must be non-zero.
///
/// The non-zero terminator bounds the zero-run scan and is not itself coded.
/// Returns the number of bytes written to `out`.
pub fn run_length_encode(values: &[i32], n: usize, out: &mut [u8]) -> Result<usize> {
    if values.len() <= n || values[n] == 0 {
        return Err(OxiSeisError::invalid_parameter(
            "values",
            "quantized stream must end with a non-zero terminator",
        ));
    }
    let needed = max_run_length_bytes(n);
    if out.len() < needed {
        return Err(OxiSeisError::buffer_too_small(needed, out.len()));
    }

    let mut pos = 0usize;
    let mut i = 0usize;
    while i < n {
        if values[i] == 0 {
            let start = i;
            while values[i] == 0 {
                i += 1;
            }
            pos = put_zero_run(i - start, out, pos);
        } else {
            pos = put_literal(values[i], out, pos);
            i += 1;
        }
    }

    Ok(pos)
}

fn put_zero_run(mut run: usize, out: &mut [u8], mut pos: usize) -> usize {
    while run > MAX_CHAINED_RUN {
        out[pos..pos + 3].copy_from_slice(&[ESC_RUN_SHORT, 0xFF, 0xFF]);
        pos += 3;
        run -= MAX_CHAINED_RUN;
    }
    match run {
        0 => pos,
        1..=MAX_SHORT_RUN => {
            out[pos] = run as u8;
            pos + 1
        }
        101..=255 => {
            out[pos] = ESC_RUN_BYTE;
            out[pos + 1] = run as u8;
            pos + 2
        }
        _ => {
            out[pos] = ESC_RUN_SHORT;
            out[pos + 1..pos + 3].copy_from_slice(&(run as u16).to_be_bytes());
            pos + 3
        }
    }
}

fn put_literal(v: i32, out: &mut [u8], pos: usize) -> usize {
    let mag = v.unsigned_abs();
    if mag < SMALL_LITERAL_LIMIT {
        out[pos] = (v + LITERAL_BIAS) as u8;
        pos + 1
    } else if mag <= BYTE_LITERAL_LIMIT {
        out[pos] = if v > 0 { ESC_POS_BYTE } else { ESC_NEG_BYTE };
        out[pos + 1] = (mag - SMALL_LITERAL_LIMIT) as u8;
        pos + 2
    } else if mag <= u16::MAX as u32 {
        out[pos] = if v > 0 { ESC_POS_SHORT } else { ESC_NEG_SHORT };
        out[pos + 1..pos + 3].copy_from_slice(&(mag as u16).to_be_bytes());
        pos + 3
    } else {
        out[pos] = ESC_INT;
        out[pos + 1..pos + 5].copy_from_slice(&v.to_be_bytes());
        pos + 5
    }
}

/// One decoded run-length token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Run {
    /// A run of zeros.
    Zeros(usize),
    /// A single non-zero value.
    Value(i32),
}

/// Iterator over the tokens of a run-length byte stream.
#[derive(Debug)]
pub struct RunDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> RunDecoder<'a> {
    /// Decode tokens from `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| OxiSeisError::corrupted(self.pos, "truncated run-length escape"))?;
        let mut raw = [0u8; N];
        raw.copy_from_slice(slice);
        self.pos = end;
        Ok(raw)
    }
}

impl Iterator for RunDecoder<'_> {
    type Item = Result<Run>;

    fn next(&mut self) -> Option<Self::Item> {
        let code = *self.bytes.get(self.pos)?;
        self.pos += 1;

        let token = match code {
            1..=100 => Ok(Run::Zeros(code as usize)),
            ESC_RUN_BYTE => self.take::<1>().map(|[n]| Run::Zeros(n as usize)),
            ESC_RUN_SHORT => self
                .take::<2>()
                .map(|raw| Run::Zeros(u16::from_be_bytes(raw) as usize)),
            ESC_POS_BYTE => self
                .take::<1>()
                .map(|[b]| Run::Value(SMALL_LITERAL_LIMIT as i32 + b as i32)),
            ESC_NEG_BYTE => self
                .take::<1>()
                .map(|[b]| Run::Value(-(SMALL_LITERAL_LIMIT as i32 + b as i32))),
            ESC_POS_SHORT => self
                .take::<2>()
                .map(|raw| Run::Value(u16::from_be_bytes(raw) as i32)),
            ESC_NEG_SHORT => self
                .take::<2>()
                .map(|raw| Run::Value(-(u16::from_be_bytes(raw) as i32))),
            ESC_INT => self.take::<4>().map(|raw| Run::Value(i32::from_be_bytes(raw))),
            _ => Ok(Run::Value(code as i32 - LITERAL_BIAS)),
        };
        Some(token)
    }
}

/// Expand a run-length stream into `out`, returning the values produced.
pub fn run_length_decode_ints(bytes: &[u8], out: &mut [i32]) -> Result<usize> {
    let mut k = 0usize;
    for token in RunDecoder::new(bytes) {
        match token? {
            Run::Zeros(run) => {
                let end = k + run;
                let slots = out
                    .get_mut(k..end)
                    .ok_or_else(|| OxiSeisError::corrupted(end, "zero run overruns block"))?;
                slots.fill(0);
                k = end;
            }
            Run::Value(v) => {
                let slot = out
                    .get_mut(k)
                    .ok_or_else(|| OxiSeisError::corrupted(k, "literal overruns block"))?;
                *slot = v;
                k += 1;
            }
        }
    }
    Ok(k)
}

/// Expand and dequantize a run-length stream into `out`.
pub fn run_length_decode(bytes: &[u8], delta: f32, out: &mut [f32]) -> Result<usize> {
    let mut k = 0usize;
    for token in RunDecoder::new(bytes) {
        match token? {
            Run::Zeros(run) => {
                let end = k + run;
                let slots = out
                    .get_mut(k..end)
                    .ok_or_else(|| OxiSeisError::corrupted(end, "zero run overruns block"))?;
                slots.fill(0.0);
                k = end;
            }
            Run::Value(v) => {
                let slot = out
                    .get_mut(k)
                    .ok_or_else(|| OxiSeisError::corrupted(k, "literal overruns block"))?;
                *slot = v as f32 * delta;
                k += 1;
            }
        }
    }
    Ok(k)
}

/// Quantize + run-length + Huffman coder for one block at a time.
///
/// Holds grow-only scratch space, so one instance must not be shared between
/// threads. The Huffman code book itself is immutable and can be shared.
#[derive(Debug)]
pub struct BlockCompressor {
    coder: Arc<HuffCoder>,
    order: ByteOrder,
    manual_delta: Option<f32>,
    ints: GrowBuffer<i32>,
    work: GrowBuffer<u8>,
}

impl BlockCompressor {
    /// Create a block compressor sharing an existing code book.
    pub fn new(coder: Arc<HuffCoder>, order: ByteOrder) -> Self {
        Self {
            coder,
            order,
            manual_delta: None,
            ints: GrowBuffer::new(),
            work: GrowBuffer::new(),
        }
    }

    /// Create a block compressor with its own code book for `table`.
    pub fn with_table(table: HuffTable, order: ByteOrder) -> Result<Self> {
        Ok(Self::new(Arc::new(HuffCoder::new(table)?), order))
    }

    /// Pin the quantization step instead of estimating it per block.
    ///
    /// A fixed step keeps the distortion uniform across blocks and frames.
    /// `None` restores per-block estimation.
    pub fn set_delta(&mut self, delta: Option<f32>) -> Result<()> {
        if let Some(d) = delta {
            if !(d.is_finite() && d > 0.0) {
                return Err(OxiSeisError::invalid_parameter(
                    "delta",
                    format!("must be positive and finite, got {d}"),
                ));
            }
        }
        self.manual_delta = delta;
        Ok(())
    }

    /// The pinned step, if any.
    pub fn delta(&self) -> Option<f32> {
        self.manual_delta
    }

    /// Byte order of the sub-header.
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Encode `data` into `out`, returning the bytes used.
    ///
    /// `out` is the whole writable region. When the block does not fit,
    /// returns `BufferTooSmall` and leaves `out` untouched.
    pub fn data_encode(&mut self, data: &[f32], distortion: f32, out: &mut [u8]) -> Result<usize> {
        let n = data.len();
        if out.len() < BLOCK_HEADER_LEN {
            return Err(OxiSeisError::buffer_too_small(BLOCK_HEADER_LEN, out.len()));
        }

        let delta = match self.manual_delta {
            Some(d) => d,
            None => compute_delta(data, distortion),
        };

        let ints = self.ints.ensure(n + 1);
        quantize(data, delta, &mut ints[..n]);
        let n_non_zero = match ints[..n].iter().rposition(|&v| v != 0) {
            Some(last) => ((last + 2) & !1).min(n),
            None => 0,
        };
        ints[n_non_zero] = TERMINATOR;

        let rle = self.work.ensure(max_run_length_bytes(n_non_zero));
        let nrle = run_length_encode(&ints[..=n_non_zero], n_non_zero, rle)?;
        let nhuff = self
            .coder
            .encode(&rle[..nrle], &mut out[BLOCK_HEADER_LEN..])?;

        write_at(out, 0, delta, self.order)?;
        write_at(out, 4, n_non_zero as i32, self.order)?;
        Ok(BLOCK_HEADER_LEN + nhuff)
    }

    /// Decode one block produced by [`data_encode`](Self::data_encode).
    ///
    /// `out.len()` is the number of samples in the block. Corrupted input is
    /// logged and reported as an error; `out` is then unspecified.
    pub fn data_decode(&mut self, encoded: &[u8], out: &mut [f32]) -> Result<()> {
        let result = self.decode_inner(encoded, out);
        if let Err(err) = &result {
            warn!(error = %err, "corrupted SeisPEG block");
        }
        result
    }

    fn decode_inner(&mut self, encoded: &[u8], out: &mut [f32]) -> Result<()> {
        let n = out.len();
        let delta: f32 = read_at(encoded, 0, self.order)
            .map_err(|_| OxiSeisError::corrupted(0, "block shorter than its sub-header"))?;
        let n_non_zero: i32 = read_at(encoded, 4, self.order)
            .map_err(|_| OxiSeisError::corrupted(4, "block shorter than its sub-header"))?;

        if !delta.is_finite() {
            return Err(OxiSeisError::corrupted(0, "non-finite quantization step"));
        }
        if n_non_zero < 0 || n_non_zero as usize > n {
            return Err(OxiSeisError::corrupted(
                4,
                format!("nNonZero {n_non_zero} outside block of {n} samples"),
            ));
        }
        let n_non_zero = n_non_zero as usize;

        let work = self.work.ensure(max_run_length_bytes(n_non_zero));
        let nrle = self
            .coder
            .decode(&encoded[BLOCK_HEADER_LEN..], work)
            .map_err(|err| match err {
                OxiSeisError::BufferTooSmall { .. } => OxiSeisError::corrupted(
                    BLOCK_HEADER_LEN,
                    "Huffman stream overruns its work buffer",
                ),
                other => other,
            })?;

        let produced = run_length_decode(&work[..nrle], delta, &mut out[..n_non_zero])?;
        if produced != n_non_zero {
            return Err(OxiSeisError::corrupted(
                BLOCK_HEADER_LEN,
                format!("decoded {produced} of {n_non_zero} coefficients"),
            ));
        }
        out[n_non_zero..].fill(0.0);
        Ok(())
    }
}
