//! The SeisPEG frame codec.
//!
//! A frame is up to `n2` traces of `n1` samples. Compression pads the frame
//! to whole blocks, applies the LOT along the trace axis and then the time
//! axis, and codes every `vertical_block_size x horizontal_block_size` tile
//! with the [`BlockCompressor`]:
//!
//! ```text
//! +--------+-----------+--------+-----------+-----+------------------+
//! | header | len (i32) | tile 0 | len (i32) | ... | trace headers    |
//! +--------+-----------+--------+-----------+-----+------------------+
//! ```
//!
//! Tiles are stored column by column: all tiles of the first group of
//! traces, top to bottom, then the next group.
//!
//! Frames holding a sample beyond [`BAD_AMPLITUDE`] (or a non-finite one)
//! are not transformed at all. Their samples are copied verbatim and the
//! header is written over the first [`LEN_HDR_INFO`] bytes, so the leading
//! samples of the first trace decode as zeros. When traces are shorter than
//! the header, the samples of later traces it covers are repeated after the
//! raw block. The same raw layout is used when the transform-coded frame does
//! not fit the output buffer.

use crate::block::{BLOCK_HEADER_LEN, BlockCompressor};
use crate::config::SeisPegConfig;
use crate::hdr::{HdrCompressor, HdrLayout, apply_remute};
use crate::header::{HeaderKind, LEN_HDR_INFO, SeisPegHeader, cookie_kind};
use crate::huffman::{HuffCoder, HuffTable};
use crate::transform::{BlockShape, Transformer};
use oxiseis_core::buffer::GrowBuffer;
use oxiseis_core::bytecodec::{ByteOrder, IntSequence, IntSequenceMut, read_at, write_at};
use oxiseis_core::error::{OxiSeisError, Result};
use std::sync::Arc;
use tracing::{debug, trace};

/// Samples with a larger magnitude trigger the raw escape.
pub const BAD_AMPLITUDE: f32 = 1.0e15;

/// Length prefix in front of every tile.
const TILE_PREFIX: usize = 4;

/// Samples the header covers in the raw layout.
const HDR_SAMPLES: usize = LEN_HDR_INFO / 4;

/// Bytes appended to a raw frame to keep the samples of later traces that
/// the header covers.
fn spill_bytes(n1: usize) -> usize {
    HDR_SAMPLES.saturating_sub(n1) * 4
}

/// True when any of the first `n1` samples of any trace is unsafe to
/// transform.
pub fn has_bad_amplitude<T: AsRef<[f32]>>(traces: &[T], n1: usize) -> bool {
    traces.iter().any(|trace| {
        trace.as_ref()[..n1]
            .iter()
            .any(|v| !v.is_finite() || v.abs() > BAD_AMPLITUDE)
    })
}

/// `(t + 1)^e` for every sample, scaled to a mean of one.
fn gain_curve(n1: usize, exponent: f32) -> Result<Vec<f32>> {
    let raw: Vec<f64> = (1..=n1).map(|t| (t as f64).powf(exponent as f64)).collect();
    let mean = raw.iter().sum::<f64>() / n1 as f64;
    let curve: Vec<f32> = raw.iter().map(|g| (g / mean) as f32).collect();
    if curve.iter().any(|g| !(g.is_finite() && *g > 0.0)) {
        return Err(OxiSeisError::invalid_parameter(
            "ft_gain_exponent",
            format!("gain t^{exponent} overflows over {n1} samples"),
        ));
    }
    Ok(curve)
}

/// Worst-case zlib output for `len` input bytes.
fn zlib_bound(len: usize) -> usize {
    len + (len >> 12) + (len >> 14) + (len >> 25) + 13
}

/// Reject a header whose payload is too short for its geometry, or longer
/// than the buffer holding it.
fn check_payload(config: &SeisPegConfig, header: &SeisPegHeader, available: usize) -> Result<()> {
    let minimum = if header.kind.is_bad_amplitude() {
        config.n1.saturating_mul(4)
    } else {
        let tiles = (config.padded_n1() / config.vertical_block_size)
            .saturating_mul(config.padded_n2() / config.horizontal_block_size);
        tiles
            .saturating_mul(TILE_PREFIX + BLOCK_HEADER_LEN)
            .saturating_add(header.kind.header_len())
    };
    if header.n_bytes_traces > available || header.n_bytes_traces < minimum {
        return Err(OxiSeisError::corrupted(
            20,
            format!(
                "trace payload of {} bytes (at least {minimum} expected) in a {available}-byte buffer",
                header.n_bytes_traces
            ),
        ));
    }
    Ok(())
}

/// Compresses and decompresses frames of one fixed geometry.
///
/// Every scratch buffer is owned and reused, so an instance serves one
/// thread. Instances may share a Huffman code book through
/// [`with_coder`](Self::with_coder).
#[derive(Debug)]
pub struct SeisPeg {
    config: SeisPegConfig,
    shape: BlockShape,
    gain: Option<Vec<f32>>,
    remute: bool,
    transformer: Transformer,
    blocks: BlockCompressor,
    hdr: HdrCompressor,
    frame: GrowBuffer<f32>,
    tile: GrowBuffer<f32>,
}

impl SeisPeg {
    /// Create a codec for `config`.
    pub fn new(config: SeisPegConfig) -> Result<Self> {
        Self::with_coder(config, Arc::new(HuffCoder::new(HuffTable::Data)?))
    }

    /// Create a codec using an existing code book.
    pub fn with_coder(config: SeisPegConfig, coder: Arc<HuffCoder>) -> Result<Self> {
        config.validate()?;
        let gain = if config.has_gain() {
            Some(gain_curve(config.n1, config.ft_gain_exponent)?)
        } else {
            None
        };
        let shape = BlockShape {
            n1: config.padded_n1(),
            n2: config.padded_n2(),
            vertical_block: config.vertical_block_size,
            horizontal_block: config.horizontal_block_size,
            vertical_trans: config.vertical_trans_length,
            horizontal_trans: config.horizontal_trans_length,
        };
        debug!(
            n1 = config.n1,
            n2 = config.n2,
            padded_n1 = shape.n1,
            padded_n2 = shape.n2,
            vertical_block = shape.vertical_block,
            horizontal_block = shape.horizontal_block,
            vertical_trans = shape.vertical_trans,
            horizontal_trans = shape.horizontal_trans,
            "configured SeisPEG codec"
        );

        Ok(Self {
            config,
            shape,
            gain,
            remute: false,
            transformer: Transformer::new(),
            blocks: BlockCompressor::new(coder, config.byte_order),
            hdr: HdrCompressor::new(config.byte_order),
            frame: GrowBuffer::new(),
            tile: GrowBuffer::new(),
        })
    }

    /// Rebuild a codec from the header of a compressed buffer.
    ///
    /// The geometry is checked against the size of `input` before any
    /// buffer is sized from it.
    pub fn from_compressed(input: &[u8], order: ByteOrder) -> Result<Self> {
        let header = SeisPegHeader::decode(input, order)?;
        let config = SeisPegConfig::from_header(&header, order);
        config.validate()?;
        check_payload(&config, &header, input.len())?;
        Self::new(config)
    }

    /// Parse the header of a compressed buffer.
    pub fn read_header(input: &[u8], order: ByteOrder) -> Result<SeisPegHeader> {
        SeisPegHeader::decode(input, order)
    }

    /// The configuration in use.
    pub fn config(&self) -> &SeisPegConfig {
        &self.config
    }

    /// Samples per trace after padding.
    pub fn padded_n1(&self) -> usize {
        self.shape.n1
    }

    /// Traces after padding.
    pub fn padded_n2(&self) -> usize {
        self.shape.n2
    }

    /// Pin the quantization step for every block, or restore per-block
    /// estimation with `None`.
    pub fn set_delta(&mut self, delta: Option<f32>) -> Result<()> {
        self.blocks.set_delta(delta)
    }

    /// Store first-live-sample indices with the trace headers and re-zero
    /// the samples before them on decode.
    pub fn set_remute(&mut self, enabled: bool) {
        self.remute = enabled;
    }

    /// Replace the LOT by a sample permutation.
    pub fn set_integrity_test(&mut self, enabled: bool) {
        self.transformer.set_integrity_test(enabled);
    }

    /// An output buffer of this size is always large enough for
    /// [`compress`](Self::compress).
    pub fn max_compressed_bytes(&self) -> usize {
        (self.config.n1 * self.config.n2 * 4).max(LEN_HDR_INFO) + spill_bytes(self.config.n1)
    }

    /// An output buffer of this size is always large enough for
    /// [`compress_with_headers`](Self::compress_with_headers) with
    /// `hdr_length` ints per trace.
    pub fn max_compressed_bytes_with_headers(&self, hdr_length: usize) -> usize {
        let n2 = self.config.n2;
        let ints = crate::hdr::PREAMBLE_LEN + n2 * hdr_length + n2 + 2;
        self.max_compressed_bytes() + zlib_bound(ints * 4)
    }

    fn header(
        &self,
        kind: HeaderKind,
        n_bytes_traces: usize,
        n_bytes_hdrs: usize,
    ) -> SeisPegHeader {
        let c = &self.config;
        SeisPegHeader {
            kind,
            distortion: c.distortion,
            n1: c.n1,
            n2: c.n2,
            vertical_block_size: c.vertical_block_size,
            horizontal_block_size: c.horizontal_block_size,
            vertical_trans_length: c.vertical_trans_length,
            horizontal_trans_length: c.horizontal_trans_length,
            n_bytes_traces,
            n_bytes_hdrs,
            ft_gain_exponent: c.ft_gain_exponent,
        }
    }

    fn check_traces(
        &self,
        available: usize,
        n_traces: usize,
        lens: impl Iterator<Item = usize>,
    ) -> Result<()> {
        if n_traces > self.config.n2 {
            return Err(OxiSeisError::invalid_parameter(
                "n_traces",
                format!("{n_traces} exceeds the frame size {}", self.config.n2),
            ));
        }
        if available < n_traces {
            return Err(OxiSeisError::invalid_parameter(
                "traces",
                format!("{available} traces supplied, {n_traces} requested"),
            ));
        }
        for len in lens.take(n_traces) {
            if len < self.config.n1 {
                return Err(OxiSeisError::buffer_too_small(self.config.n1, len));
            }
        }
        Ok(())
    }

    /// Compress the first `n_traces` traces into `out`, returning the bytes
    /// written.
    ///
    /// Falls back to the raw layout when the coded frame does not fit, and
    /// fails with `BufferTooSmall` only if the raw layout does not fit
    /// either. The contents of `out` are unspecified after an error.
    pub fn compress<T: AsRef<[f32]>>(
        &mut self,
        traces: &[T],
        n_traces: usize,
        out: &mut [u8],
    ) -> Result<usize> {
        let lens = traces.iter().map(|t| t.as_ref().len());
        self.check_traces(traces.len(), n_traces, lens)?;
        let traces = &traces[..n_traces];
        let with_gain = self.config.has_gain();

        if has_bad_amplitude(traces, self.config.n1) {
            debug!(n_traces, "bad amplitude, storing frame raw");
            return self.encode_raw(traces, out);
        }

        self.fill_frame(traces);
        let shape = self.shape;
        let len = shape.n1 * shape.n2;
        self.transformer
            .forward_2d(&mut self.frame.as_mut_slice()[..len], shape)?;

        let kind = HeaderKind::select(false, with_gain);
        match self.encode_tiles(out, kind.header_len()) {
            Ok(end) => {
                self.header(kind, end, 0).encode(out, self.config.byte_order)?;
                trace!(bytes = end, "compressed frame");
                Ok(end)
            }
            Err(OxiSeisError::BufferTooSmall { needed, available }) => {
                debug!(needed, available, "coded frame does not fit, storing raw");
                self.encode_raw(traces, out)
            }
            Err(err) => Err(err),
        }
    }

    /// Copy the traces into the zero-padded frame, applying the gain.
    fn fill_frame<T: AsRef<[f32]>>(&mut self, traces: &[T]) {
        let n1 = self.config.n1;
        let pn1 = self.shape.n1;
        let frame = self.frame.ensure_cleared(pn1 * self.shape.n2);
        for (dst, src) in frame.chunks_exact_mut(pn1).zip(traces) {
            let src = &src.as_ref()[..n1];
            match &self.gain {
                Some(gain) => {
                    for ((d, &s), &g) in dst.iter_mut().zip(src).zip(gain) {
                        *d = s * g;
                    }
                }
                None => dst[..n1].copy_from_slice(src),
            }
        }
    }

    fn encode_tiles(&mut self, out: &mut [u8], start: usize) -> Result<usize> {
        let Self {
            config,
            shape,
            blocks,
            frame,
            tile,
            ..
        } = self;
        let (vb, hb) = (shape.vertical_block, shape.horizontal_block);
        let order = config.byte_order;
        let frame = &frame.as_slice()[..shape.n1 * shape.n2];
        let tile = tile.ensure(vb * hb);

        let mut pos = start;
        for h in 0..shape.n2 / hb {
            for v in 0..shape.n1 / vb {
                for (t, row) in tile.chunks_exact_mut(vb).enumerate() {
                    let src = (h * hb + t) * shape.n1 + v * vb;
                    row.copy_from_slice(&frame[src..src + vb]);
                }
                let body = pos + TILE_PREFIX;
                if body > out.len() {
                    return Err(OxiSeisError::buffer_too_small(body, out.len()));
                }
                let n = blocks.data_encode(tile, config.distortion, &mut out[body..])?;
                write_at(out, pos, n as i32, order)?;
                pos = body + n;
            }
        }
        Ok(pos)
    }

    fn encode_raw<T: AsRef<[f32]>>(&mut self, traces: &[T], out: &mut [u8]) -> Result<usize> {
        let n1 = self.config.n1;
        let order = self.config.byte_order;
        // An empty frame still occupies one trace.
        let body = (traces.len().max(1) * n1 * 4).max(LEN_HDR_INFO);
        let needed = body + spill_bytes(n1);
        if out.len() < needed {
            return Err(OxiSeisError::buffer_too_small(needed, out.len()));
        }
        out[..needed].fill(0);
        let samples = traces.iter().flat_map(|t| t.as_ref()[..n1].iter());
        for (i, &v) in samples.enumerate() {
            write_at(out, i * 4, v, order)?;
            if (n1..HDR_SAMPLES).contains(&i) {
                write_at(out, body + (i - n1) * 4, v, order)?;
            }
        }
        let kind = HeaderKind::select(true, self.config.has_gain());
        self.header(kind, needed, 0).encode(out, order)?;
        Ok(needed)
    }

    /// Decompress `n_traces` traces from `input` into `traces`.
    pub fn uncompress<T: AsMut<[f32]>>(
        &mut self,
        input: &[u8],
        n_traces: usize,
        traces: &mut [T],
    ) -> Result<SeisPegHeader> {
        let available = traces.len();
        self.check_traces(
            available,
            n_traces,
            traces.iter_mut().map(|t| t.as_mut().len()),
        )?;
        let order = self.config.byte_order;
        let kind = cookie_kind(input, order)?;
        let header = SeisPegHeader::decode(input, order)?;
        self.check_header(&header)?;
        check_payload(&self.config, &header, input.len())?;
        let traces = &mut traces[..n_traces];

        if kind.is_bad_amplitude() {
            self.decode_raw(&input[..header.n_bytes_traces], traces)?;
        } else {
            self.decode_tiles(&input[..header.n_bytes_traces], kind.header_len())?;
            let shape = self.shape;
            let len = shape.n1 * shape.n2;
            self.transformer
                .reverse_2d(&mut self.frame.as_mut_slice()[..len], shape)?;
            self.drain_frame(traces);
        }
        Ok(header)
    }

    fn check_header(&self, header: &SeisPegHeader) -> Result<()> {
        let c = &self.config;
        let matches = header.n1 == c.n1
            && header.n2 == c.n2
            && header.vertical_block_size == c.vertical_block_size
            && header.horizontal_block_size == c.horizontal_block_size
            && header.vertical_trans_length == c.vertical_trans_length
            && header.horizontal_trans_length == c.horizontal_trans_length
            && header.ft_gain_exponent == c.ft_gain_exponent;
        if matches {
            Ok(())
        } else {
            Err(OxiSeisError::invalid_parameter(
                "input",
                format!(
                    "frame {}x{} blocks {}x{} does not match codec {}x{} blocks {}x{}",
                    header.n1,
                    header.n2,
                    header.vertical_block_size,
                    header.horizontal_block_size,
                    c.n1,
                    c.n2,
                    c.vertical_block_size,
                    c.horizontal_block_size
                ),
            ))
        }
    }

    fn decode_raw<T: AsMut<[f32]>>(&mut self, input: &[u8], traces: &mut [T]) -> Result<()> {
        let n1 = self.config.n1;
        let order = self.config.byte_order;
        let spill = spill_bytes(n1);
        let needed = (traces.len() * n1 * 4).max(LEN_HDR_INFO) + spill;
        if input.len() < needed {
            return Err(OxiSeisError::corrupted(
                input.len(),
                format!("raw frame needs {needed} bytes"),
            ));
        }
        let spill_at = input.len() - spill;
        let samples = traces.iter_mut().flat_map(|t| t.as_mut()[..n1].iter_mut());
        for (i, v) in samples.enumerate() {
            *v = if i < n1.min(HDR_SAMPLES) {
                0.0
            } else if i < HDR_SAMPLES {
                read_at(input, spill_at + (i - n1) * 4, order)?
            } else {
                read_at(input, i * 4, order)?
            };
        }
        Ok(())
    }

    fn decode_tiles(&mut self, input: &[u8], start: usize) -> Result<()> {
        let Self {
            config,
            shape,
            blocks,
            frame,
            tile,
            ..
        } = self;
        let (vb, hb) = (shape.vertical_block, shape.horizontal_block);
        let order = config.byte_order;
        let frame = frame.ensure(shape.n1 * shape.n2);
        let tile = tile.ensure(vb * hb);

        let mut pos = start;
        for h in 0..shape.n2 / hb {
            for v in 0..shape.n1 / vb {
                let len: i32 = read_at(input, pos, order)
                    .map_err(|_| OxiSeisError::corrupted(pos, "missing tile length"))?;
                let body = pos + TILE_PREFIX;
                let end = usize::try_from(len)
                    .ok()
                    .and_then(|len| body.checked_add(len))
                    .filter(|&end| end <= input.len())
                    .ok_or_else(|| {
                        OxiSeisError::corrupted(pos, format!("tile length {len} out of range"))
                    })?;
                blocks.data_decode(&input[body..end], tile)?;
                for (t, row) in tile.chunks_exact(vb).enumerate() {
                    let dst = (h * hb + t) * shape.n1 + v * vb;
                    frame[dst..dst + vb].copy_from_slice(row);
                }
                pos = end;
            }
        }
        Ok(())
    }

    /// Strip the padding and undo the gain.
    fn drain_frame<T: AsMut<[f32]>>(&self, traces: &mut [T]) {
        let n1 = self.config.n1;
        let frame = self.frame.as_slice();
        for (src, dst) in frame.chunks_exact(self.shape.n1).zip(traces.iter_mut()) {
            let dst = &mut dst.as_mut()[..n1];
            match &self.gain {
                Some(gain) => {
                    for ((d, &s), &g) in dst.iter_mut().zip(src).zip(gain) {
                        *d = s / g;
                    }
                }
                None => dst.copy_from_slice(&src[..n1]),
            }
        }
    }

    /// Compress traces followed by their integer headers.
    ///
    /// `headers` holds `n_traces * hdr_length` ints, trace by trace.
    pub fn compress_with_headers<T, S>(
        &mut self,
        traces: &[T],
        headers: &S,
        n_traces: usize,
        hdr_length: usize,
        out: &mut [u8],
    ) -> Result<usize>
    where
        T: AsRef<[f32]>,
        S: IntSequence + ?Sized,
    {
        let cap = self.max_compressed_bytes().min(out.len());
        let n_bytes_traces = self.compress(traces, n_traces, &mut out[..cap])?;
        let rest = &mut out[n_bytes_traces..];
        let n_bytes_hdrs = if self.remute {
            self.hdr
                .compress_with_remute(headers, n_traces, hdr_length, traces, rest)?
        } else {
            self.hdr.compress(headers, n_traces, hdr_length, rest)?
        };

        let order = self.config.byte_order;
        let mut header = SeisPegHeader::decode(out, order)?;
        header.n_bytes_hdrs = n_bytes_hdrs;
        header.encode(out, order)?;
        Ok(n_bytes_traces + n_bytes_hdrs)
    }

    /// Decompress a buffer written by
    /// [`compress_with_headers`](Self::compress_with_headers).
    pub fn uncompress_with_headers<T, S>(
        &mut self,
        input: &[u8],
        n_traces: usize,
        traces: &mut [T],
        headers: &mut S,
    ) -> Result<HdrLayout>
    where
        T: AsMut<[f32]>,
        S: IntSequenceMut + ?Sized,
    {
        let header = self.uncompress(input, n_traces, traces)?;
        let start = header.n_bytes_traces;
        let end = start
            .checked_add(header.n_bytes_hdrs)
            .filter(|&end| end <= input.len())
            .ok_or_else(|| OxiSeisError::corrupted(24, "header payload out of range"))?;
        if header.n_bytes_hdrs == 0 {
            return Err(OxiSeisError::corrupted(24, "buffer holds no trace headers"));
        }

        let layout = self.hdr.uncompress_into(&input[start..end], headers)?;
        if layout.n_traces != n_traces {
            return Err(OxiSeisError::corrupted(
                start,
                format!("{} trace headers for {n_traces} traces", layout.n_traces),
            ));
        }
        if let Some(indices) = &layout.remute {
            apply_remute(&mut traces[..n_traces], indices);
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n1: usize, n2: usize) -> Vec<Vec<f32>> {
        (0..n2)
            .map(|t| {
                (0..n1)
                    .map(|i| {
                        let x = i as f32 / n1 as f32;
                        (20.0 * x + 0.3 * t as f32).sin() * (1.0 + t as f32 * 0.05)
                    })
                    .collect()
            })
            .collect()
    }

    /// (max error, RMS error, signal RMS)
    fn errors(a: &[Vec<f32>], b: &[Vec<f32>]) -> (f32, f32, f32) {
        let pairs: Vec<(f32, f32)> = a
            .iter()
            .flatten()
            .zip(b.iter().flatten())
            .map(|(&x, &y)| (x, y))
            .collect();
        let n = pairs.len() as f32;
        let max = pairs.iter().map(|(x, y)| (x - y).abs()).fold(0.0, f32::max);
        let rms_err = (pairs.iter().map(|(x, y)| (x - y) * (x - y)).sum::<f32>() / n).sqrt();
        let rms = (pairs.iter().map(|(x, _)| x * x).sum::<f32>() / n).sqrt();
        (max, rms_err, rms)
    }

    /// Worst ratio of max error to `distortion * local RMS` over 16x16 tiles, for
    /// tiles inside the frame and for tiles on its trailing edges.
    fn tile_error_ratios(a: &[Vec<f32>], b: &[Vec<f32>], distortion: f32) -> (f32, f32) {
        let (n2, n1) = (a.len(), a[0].len());
        let (mut inner, mut edge) = (0f32, 0f32);
        for t0 in (0..n2).step_by(16) {
            for i0 in (0..n1).step_by(16) {
                let (mut sum, mut count, mut worst) = (0f32, 0usize, 0f32);
                for t in t0..(t0 + 16).min(n2) {
                    for i in i0..(i0 + 16).min(n1) {
                        sum += a[t][i] * a[t][i];
                        count += 1;
                        worst = worst.max((a[t][i] - b[t][i]).abs());
                    }
                }
                let ratio = worst / (distortion * (sum / count as f32).sqrt());
                if t0 + 16 >= n2 || i0 + 16 >= n1 {
                    edge = edge.max(ratio);
                } else {
                    inner = inner.max(ratio);
                }
            }
        }
        (inner, edge)
    }

    fn codec(n1: usize, n2: usize) -> SeisPeg {
        SeisPeg::new(SeisPegConfig::new(n1, n2, 0.1, (16, 16), (16, 16))).unwrap()
    }

    #[test]
    fn test_roundtrip_is_close() {
        let traces = frame(128, 32);
        let mut sp = codec(128, 32);
        let mut out = vec![0u8; sp.max_compressed_bytes()];
        let n = sp.compress(&traces, 32, &mut out).unwrap();
        assert!(n < 128 * 32 * 4 / 4);

        let mut back = vec![vec![0f32; 128]; 32];
        let header = sp.uncompress(&out[..n], 32, &mut back).unwrap();
        assert_eq!(header.kind, HeaderKind::NormalV2);
        assert_eq!(header.n_bytes_traces, n);
        let (_, rms_err, rms) = errors(&traces, &back);
        assert!(rms_err < 1.5 * 0.1 * rms);
        let (inner, edge) = tile_error_ratios(&traces, &back, 0.1);
        assert!(inner < 5.0, "interior tiles: {inner}");
        assert!(edge < 7.0, "edge tiles: {edge}");
    }

    #[test]
    fn test_padding_is_stripped() {
        let traces = frame(100, 20);
        let mut sp = codec(100, 30);
        assert_eq!(sp.padded_n1(), 112);
        assert_eq!(sp.padded_n2(), 32);
        let mut out = vec![0u8; sp.max_compressed_bytes()];
        let n = sp.compress(&traces, 20, &mut out).unwrap();

        let mut back = vec![vec![9f32; 100]; 20];
        sp.uncompress(&out[..n], 20, &mut back).unwrap();
        let (max, rms_err, rms) = errors(&traces, &back);
        assert!(rms_err < 1.5 * 0.1 * rms);
        assert!(max < 10.0 * 0.1 * rms);
    }

    #[test]
    fn test_integrity_mode_is_exact_up_to_quantization() {
        let traces = frame(32, 16);
        let mut sp = codec(32, 16);
        sp.set_integrity_test(true);
        sp.set_delta(Some(1e-3)).unwrap();
        let mut out = vec![0u8; 1 << 16];
        let n = sp.compress(&traces, 16, &mut out).unwrap();
        let mut back = vec![vec![0f32; 32]; 16];
        sp.uncompress(&out[..n], 16, &mut back).unwrap();
        for (a, b) in traces.iter().flatten().zip(back.iter().flatten()) {
            assert!((a - b).abs() <= 0.5e-3 + 1e-5);
        }
    }

    #[test]
    fn test_gain_roundtrip() {
        let traces = frame(64, 16);
        let config = SeisPegConfig::new(64, 16, 0.05, (16, 16), (8, 8)).gain(1.0);
        let mut sp = SeisPeg::new(config).unwrap();
        let mut out = vec![0u8; sp.max_compressed_bytes()];
        let n = sp.compress(&traces, 16, &mut out).unwrap();
        assert_eq!(cookie_kind(&out, ByteOrder::BigEndian).unwrap(), HeaderKind::NormalV3);

        let mut other = SeisPeg::from_compressed(&out[..n], ByteOrder::BigEndian).unwrap();
        assert_eq!(other.config().ft_gain_exponent, 1.0);
        let mut back = vec![vec![0f32; 64]; 16];
        other.uncompress(&out[..n], 16, &mut back).unwrap();
        let (max, rms_err, rms) = errors(&traces, &back);
        assert!(rms_err < 2.5 * 0.05 * rms);
        assert!(max < 20.0 * 0.05 * rms);
    }

    #[test]
    fn test_gain_curve_mean_is_one() {
        let g = gain_curve(100, 2.0).unwrap();
        let mean: f32 = g.iter().sum::<f32>() / 100.0;
        assert!((mean - 1.0).abs() < 1e-4);
        assert!(g.windows(2).all(|w| w[0] < w[1]));
        assert!(gain_curve(1000, 200.0).is_err());
    }

    #[test]
    fn test_raw_fallback_when_output_is_tight() {
        let mut seed = 99u32;
        let traces: Vec<Vec<f32>> = (0..16)
            .map(|_| {
                (0..16)
                    .map(|_| {
                        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                        (seed >> 8) as f32
                    })
                    .collect()
            })
            .collect();
        let mut sp = SeisPeg::new(SeisPegConfig::new(16, 16, 1e-6, (16, 16), (16, 16))).unwrap();
        let mut out = vec![0u8; sp.max_compressed_bytes()];
        let n = sp.compress(&traces, 16, &mut out).unwrap();
        assert_eq!(n, 16 * 16 * 4);
        assert_eq!(cookie_kind(&out, ByteOrder::BigEndian).unwrap(), HeaderKind::BadAmplitudeV2);

        let mut back = vec![vec![0f32; 16]; 16];
        sp.uncompress(&out[..n], 16, &mut back).unwrap();
        assert!(back[0][..8].iter().all(|&v| v == 0.0));
        assert_eq!(back[0][8..], traces[0][8..]);
        assert_eq!(back[1..], traces[1..]);
    }

    #[test]
    fn test_bad_amplitude_with_short_traces() {
        for (n1, n2) in [(4, 4), (2, 2), (3, 5)] {
            let mut traces: Vec<Vec<f32>> = (0..n2)
                .map(|t| (0..n1).map(|i| (t * 10 + i + 1) as f32).collect())
                .collect();
            traces[n2 - 1][n1 - 1] = 1e16;
            let mut sp = SeisPeg::new(SeisPegConfig::new(n1, n2, 0.1, (8, 8), (8, 8))).unwrap();
            let mut out = vec![0u8; sp.max_compressed_bytes()];
            let n = sp.compress(&traces, n2, &mut out).unwrap();
            assert_eq!(n, sp.max_compressed_bytes());
            assert_eq!(
                cookie_kind(&out, ByteOrder::BigEndian).unwrap(),
                HeaderKind::BadAmplitudeV2
            );

            let mut back = vec![vec![-1f32; n1]; n2];
            sp.uncompress(&out[..n], n2, &mut back).unwrap();
            assert!(back[0].iter().all(|&v| v == 0.0), "{n1}x{n2}");
            assert_eq!(back[1..], traces[1..], "{n1}x{n2}");

            let mut two = vec![vec![0f32; n1]; 2];
            sp.uncompress(&out[..n], 2, &mut two).unwrap();
            assert_eq!(two[1], traces[1]);
        }
    }

    fn forged(kind: HeaderKind, n1: usize, n_bytes_traces: usize) -> Vec<u8> {
        let header = SeisPegHeader {
            kind,
            distortion: 0.1,
            n1,
            n2: 1,
            vertical_block_size: 16,
            horizontal_block_size: 16,
            vertical_trans_length: 16,
            horizontal_trans_length: 16,
            n_bytes_traces,
            n_bytes_hdrs: 0,
            ft_gain_exponent: 2.0,
        };
        let mut buf = vec![0u8; n_bytes_traces];
        header.encode(&mut buf, ByteOrder::BigEndian).unwrap();
        buf
    }

    #[test]
    fn test_from_compressed_rejects_impossible_geometry() {
        for kind in [HeaderKind::NormalV3, HeaderKind::BadAmplitudeV3] {
            let buf = forged(kind, 1 << 30, 48);
            let err = SeisPeg::from_compressed(&buf, ByteOrder::BigEndian).unwrap_err();
            assert!(err.is_corruption(), "{kind:?}");
        }

        // one 16x16 tile needs its prefix and sub-header
        let order = ByteOrder::BigEndian;
        assert!(SeisPeg::from_compressed(&forged(HeaderKind::NormalV3, 16, 44), order).is_ok());
        assert!(SeisPeg::from_compressed(&forged(HeaderKind::NormalV3, 16, 40), order).is_err());
    }

    #[test]
    fn test_output_too_small_for_anything() {
        let traces = frame(32, 16);
        let mut sp = codec(32, 16);
        let mut out = vec![0u8; 20];
        let err = sp.compress(&traces, 16, &mut out).unwrap_err();
        assert!(matches!(err, OxiSeisError::BufferTooSmall { .. }));
    }

    #[test]
    fn test_argument_checks() {
        let traces = frame(32, 16);
        let mut sp = codec(32, 8);
        let mut out = vec![0u8; 4096];
        assert!(sp.compress(&traces, 9, &mut out).is_err());
        let short = vec![vec![0f32; 31]; 4];
        assert!(matches!(
            sp.compress(&short, 4, &mut out).unwrap_err(),
            OxiSeisError::BufferTooSmall { .. }
        ));
    }

    #[test]
    fn test_mismatched_codec_is_rejected() {
        let traces = frame(32, 16);
        let mut sp = codec(32, 16);
        let mut out = vec![0u8; sp.max_compressed_bytes()];
        let n = sp.compress(&traces, 16, &mut out).unwrap();
        let mut other = codec(48, 16);
        let mut back = vec![vec![0f32; 48]; 16];
        assert!(other.uncompress(&out[..n], 16, &mut back).is_err());
    }

    #[test]
    fn test_truncated_tiles_are_corrupted() {
        let traces = frame(32, 16);
        let mut sp = codec(32, 16);
        let mut out = vec![0u8; sp.max_compressed_bytes()];
        let n = sp.compress(&traces, 16, &mut out).unwrap();

        let mut header = SeisPegHeader::decode(&out, ByteOrder::BigEndian).unwrap();
        header.n_bytes_traces = n - 3;
        header.encode(&mut out, ByteOrder::BigEndian).unwrap();
        let mut back = vec![vec![0f32; 32]; 16];
        let err = sp.uncompress(&out[..n], 16, &mut back).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_headers_with_remute() {
        let mut traces = frame(64, 8);
        for trace in traces.iter_mut() {
            trace[..10].fill(0.0);
        }
        let headers: Vec<i32> = (0..8).flat_map(|t| [1, t, 100 + 2 * t]).collect();
        let mut sp = codec(64, 8);
        sp.set_remute(true);
        let mut out = vec![0u8; sp.max_compressed_bytes_with_headers(3)];
        let n = sp
            .compress_with_headers(&traces, &headers[..], 8, 3, &mut out)
            .unwrap();
        let header = SeisPegHeader::decode(&out, ByteOrder::BigEndian).unwrap();
        assert!(header.n_bytes_hdrs > 0);
        assert_eq!(header.n_bytes_traces + header.n_bytes_hdrs, n);

        let mut back = vec![vec![0f32; 64]; 8];
        let mut hdrs = vec![0i32; 24];
        let layout = sp
            .uncompress_with_headers(&out[..n], 8, &mut back, &mut hdrs[..])
            .unwrap();
        assert_eq!(hdrs, headers);
        assert_eq!(layout.remute, Some(vec![10; 8]));
        for trace in &back {
            assert!(trace[..10].iter().all(|&v| v == 0.0));
        }
    }
}
