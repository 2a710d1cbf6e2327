//! Trace-header compression.
//!
//! A frame of integer trace headers is stored trace by trace
//! (`[n_traces][hdr_length]`). Most fields change slowly or not at all from
//! one trace to the next, so the compressor first transposes the block so
//! that every field is contiguous, then replaces runs by short records and
//! finally deflates the resulting int array with zlib.
//!
//! Run records start with a marker value that does not occur anywhere in the
//! data. Five such markers are searched for on every call:
//!
//! | record                              | meaning                                  |
//! |-------------------------------------|------------------------------------------|
//! | `sym_const, count, value`           | `count` copies of `value`                |
//! | `sym_ascend, count, start`          | `start, start + 1, ...`                  |
//! | `sym_descend, count, start`         | `start, start - 1, ...`                  |
//! | `sym_delta, count, start, step`     | `start + i * step`                       |
//! | `sym_floats, count, start, step`    | `f32` bits of `start + i * step`         |
//! | `sym_const, 0`                      | end of data                              |
//!
//! Any other value is a literal. Constant and monotonic runs need at least
//! [`MIN_RUN`] values, delta runs at least [`MIN_DELTA_RUN`].
//!
//! The deflated int array is laid out as
//!
//! ```text
//! cookie, sym_const, sym_ascend, sym_descend, sym_delta, sym_floats,
//! out_count, hdr_length, n_traces, remute_flag, body...
//! ```
//!
//! When remute indices are requested, the index of the first non-zero sample
//! of every trace is appended after the transposed headers.

use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use oxiseis_core::buffer::GrowBuffer;
use oxiseis_core::bytecodec::{ByteOrder, IntSequence, IntSequenceMut, read_at, write_at};
use oxiseis_core::error::{OxiSeisError, Result};
use std::io::Read;
use tracing::{trace, warn};

/// Cookie opening every compressed header block.
pub const HDR_COOKIE: i32 = 0x4A53_4843;

/// Ints before the run-length body.
pub const PREAMBLE_LEN: usize = 10;

/// Shortest constant, ascending or descending run.
pub const MIN_RUN: usize = 3;

/// Shortest integer-delta or float-delta run.
pub const MIN_DELTA_RUN: usize = 5;

/// Marker values tried before falling back to `i32::MIN + k`.
const SENTINEL_CANDIDATES: [i32; 12] = [
    i32::MAX,
    i32::MAX - 1,
    0x7F7F_7F7F,
    0x7EFE_FEFE,
    0x5A5A_5A5A,
    0x3C3C_3C3C,
    0x6B6B_6B6B,
    0x2D2D_2D2D,
    0xA5A5_A5A5_u32 as i32,
    0xC3C3_C3C3_u32 as i32,
    0x9696_9696_u32 as i32,
    0xE1E1_E1E1_u32 as i32,
];

/// The five run markers chosen for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinels {
    /// Constant run (and end of data with a zero count).
    pub constant: i32,
    /// Run incrementing by one.
    pub ascend: i32,
    /// Run decrementing by one.
    pub descend: i32,
    /// Run with an arbitrary integer step.
    pub delta: i32,
    /// Run of `f32` values with a constant step.
    pub floats: i32,
}

impl Sentinels {
    fn from_array(values: [i32; 5]) -> Self {
        Self {
            constant: values[0],
            ascend: values[1],
            descend: values[2],
            delta: values[3],
            floats: values[4],
        }
    }

    fn contains(&self, value: i32) -> bool {
        value == self.constant
            || value == self.ascend
            || value == self.descend
            || value == self.delta
            || value == self.floats
    }
}

/// Pick five values that occur nowhere in `data`.
///
/// `sorted` is scratch space; its contents are replaced.
pub fn find_sentinels(data: &[i32], sorted: &mut Vec<i32>) -> Sentinels {
    sorted.clear();
    sorted.extend_from_slice(data);
    sorted.sort_unstable();
    sorted.dedup();

    let mut found = [0i32; 5];
    let mut count = 0;
    let fallback = (0..=u32::MAX).map(|k| i32::MIN.wrapping_add(k as i32));
    for candidate in SENTINEL_CANDIDATES.into_iter().chain(fallback) {
        if sorted.binary_search(&candidate).is_err() && !found[..count].contains(&candidate) {
            found[count] = candidate;
            count += 1;
            if count == found.len() {
                break;
            }
        }
    }
    Sentinels::from_array(found)
}

fn const_run(x: &[i32]) -> usize {
    x.iter().take_while(|&&v| v == x[0]).count()
}

fn step_run(x: &[i32], step: i32) -> usize {
    let mut expected = x[0];
    x.iter()
        .take_while(|&&v| {
            let hit = v == expected;
            expected = expected.wrapping_add(step);
            hit
        })
        .count()
}

#[inline]
fn float_at(start: f32, step: f32, i: usize) -> i32 {
    (start + i as f32 * step).to_bits() as i32
}

fn float_run(x: &[i32]) -> Option<(usize, f32, f32)> {
    if x.len() < MIN_DELTA_RUN {
        return None;
    }
    let start = f32::from_bits(x[0] as u32);
    let step = f32::from_bits(x[1] as u32) - start;
    if !start.is_finite() || !step.is_finite() || step == 0.0 {
        return None;
    }
    let len = x
        .iter()
        .enumerate()
        .take_while(|&(i, &v)| float_at(start, step, i) == v)
        .count();
    (len >= MIN_DELTA_RUN).then_some((len, start, step))
}

/// Run-length code `data` into `out` (cleared first), ending with the
/// end-of-data record.
pub fn encode_runs(data: &[i32], sym: &Sentinels, out: &mut Vec<i32>) {
    out.clear();
    let mut i = 0;
    while i < data.len() {
        let rest = &data[i..];

        let len = const_run(rest);
        if len >= MIN_RUN {
            out.extend_from_slice(&[sym.constant, len as i32, rest[0]]);
            i += len;
            continue;
        }
        let len = step_run(rest, 1);
        if len >= MIN_RUN {
            out.extend_from_slice(&[sym.ascend, len as i32, rest[0]]);
            i += len;
            continue;
        }
        let len = step_run(rest, -1);
        if len >= MIN_RUN {
            out.extend_from_slice(&[sym.descend, len as i32, rest[0]]);
            i += len;
            continue;
        }
        if rest.len() >= MIN_DELTA_RUN {
            let step = rest[1].wrapping_sub(rest[0]);
            let len = step_run(rest, step);
            if len >= MIN_DELTA_RUN {
                out.extend_from_slice(&[sym.delta, len as i32, rest[0], step]);
                i += len;
                continue;
            }
        }
        if let Some((len, start, step)) = float_run(rest) {
            out.extend_from_slice(&[
                sym.floats,
                len as i32,
                start.to_bits() as i32,
                step.to_bits() as i32,
            ]);
            i += len;
            continue;
        }

        out.push(rest[0]);
        i += 1;
    }
    out.extend_from_slice(&[sym.constant, 0]);
}

/// Number of values [`decode_runs`] would produce from `body`, without
/// writing any of them.
pub fn decoded_len(body: &[i32], sym: &Sentinels, base: usize) -> Result<usize> {
    let bad = |at: usize, msg: &str| OxiSeisError::corrupted((base + at) * 4, msg.to_string());
    let mut pos = 0;
    let mut total = 0usize;

    loop {
        let marker = *body.get(pos).ok_or_else(|| bad(pos, "missing end-of-data record"))?;
        let (count, step) = if !sym.contains(marker) {
            (1, 1)
        } else {
            let operands = if marker == sym.delta || marker == sym.floats { 3 } else { 2 };
            let count = *body.get(pos + 1).ok_or_else(|| bad(pos, "truncated run record"))?;
            if marker == sym.constant && count == 0 {
                return Ok(total);
            }
            if count <= 0 || body.len() < pos + 1 + operands {
                return Err(bad(pos + 1, "bad run record"));
            }
            (count as usize, 1 + operands)
        };
        total = total
            .checked_add(count)
            .ok_or_else(|| bad(pos, "run lengths overflow"))?;
        pos += step;
    }
}

/// Reverse [`encode_runs`], filling exactly `out.len()` values.
///
/// `base` is the body's offset inside the int array, used in error reports.
pub fn decode_runs(body: &[i32], sym: &Sentinels, out: &mut [i32], base: usize) -> Result<()> {
    let bad = |at: usize, msg: &str| OxiSeisError::corrupted((base + at) * 4, msg.to_string());
    let mut pos = 0;
    let mut filled = 0;

    loop {
        let marker = *body.get(pos).ok_or_else(|| bad(pos, "missing end-of-data record"))?;
        if !sym.contains(marker) {
            let slot = out
                .get_mut(filled)
                .ok_or_else(|| bad(pos, "literal past the end of the block"))?;
            *slot = marker;
            filled += 1;
            pos += 1;
            continue;
        }

        let operands = if marker == sym.delta || marker == sym.floats { 3 } else { 2 };
        let count = *body.get(pos + 1).ok_or_else(|| bad(pos, "truncated run record"))?;
        if marker == sym.constant && count == 0 {
            break;
        }
        let record = body
            .get(pos + 1..pos + 1 + operands)
            .ok_or_else(|| bad(pos, "truncated run record"))?;
        if count <= 0 || filled + count as usize > out.len() {
            return Err(bad(pos + 1, "run length out of range"));
        }
        let run = &mut out[filled..filled + count as usize];
        let start = record[1];

        if marker == sym.constant {
            run.fill(start);
        } else if marker == sym.ascend || marker == sym.descend || marker == sym.delta {
            let step = match marker {
                m if m == sym.ascend => 1,
                m if m == sym.descend => -1,
                _ => record[2],
            };
            let mut value = start;
            for slot in run.iter_mut() {
                *slot = value;
                value = value.wrapping_add(step);
            }
        } else {
            let start = f32::from_bits(start as u32);
            let step = f32::from_bits(record[2] as u32);
            for (i, slot) in run.iter_mut().enumerate() {
                *slot = float_at(start, step, i);
            }
        }

        filled += count as usize;
        pos += 1 + operands;
    }

    if filled != out.len() {
        return Err(bad(
            pos,
            &format!("decoded {filled} of {} header values", out.len()),
        ));
    }
    Ok(())
}

/// Index of the first non-zero sample, or the trace length for a dead trace.
pub fn first_live_sample(trace: &[f32]) -> i32 {
    trace
        .iter()
        .position(|&v| v != 0.0)
        .unwrap_or(trace.len()) as i32
}

/// Zero every sample before the stored first live index of each trace.
pub fn apply_remute<T: AsMut<[f32]>>(traces: &mut [T], indices: &[i32]) {
    for (trace, &first) in traces.iter_mut().zip(indices) {
        let trace = trace.as_mut();
        let end = (first.max(0) as usize).min(trace.len());
        trace[..end].fill(0.0);
    }
}

/// Sizes recovered from a compressed header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdrLayout {
    /// Number of traces.
    pub n_traces: usize,
    /// Ints per trace header.
    pub hdr_length: usize,
    /// First live sample per trace, when the block carried them.
    pub remute: Option<Vec<i32>>,
}

/// A fully decoded header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdrFrame {
    /// Number of traces.
    pub n_traces: usize,
    /// Ints per trace header.
    pub hdr_length: usize,
    /// Headers, trace by trace.
    pub headers: Vec<i32>,
    /// First live sample per trace, when the block carried them.
    pub remute: Option<Vec<i32>>,
}

/// Compresses and decompresses frames of integer trace headers.
///
/// Reuses its scratch buffers across calls; one instance per thread.
#[derive(Debug)]
pub struct HdrCompressor {
    order: ByteOrder,
    level: Compression,
    columns: GrowBuffer<i32>,
    sorted: Vec<i32>,
    body: Vec<i32>,
    ints: Vec<i32>,
    bytes: Vec<u8>,
}

impl Default for HdrCompressor {
    fn default() -> Self {
        Self::new(ByteOrder::default())
    }
}

impl HdrCompressor {
    /// Create a compressor writing ints in `order`.
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            level: Compression::default(),
            columns: GrowBuffer::new(),
            sorted: Vec::new(),
            body: Vec::new(),
            ints: Vec::new(),
            bytes: Vec::new(),
        }
    }

    /// Set the zlib level (0-9).
    pub fn set_level(&mut self, level: u32) -> Result<()> {
        if level > 9 {
            return Err(OxiSeisError::invalid_parameter(
                "level",
                format!("zlib level must be 0-9, got {level}"),
            ));
        }
        self.level = Compression::new(level);
        Ok(())
    }

    /// Byte order of the int array.
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Compress `n_traces * hdr_length` headers into `out`.
    pub fn compress<S: IntSequence + ?Sized>(
        &mut self,
        headers: &S,
        n_traces: usize,
        hdr_length: usize,
        out: &mut [u8],
    ) -> Result<usize> {
        self.transpose(headers, n_traces, hdr_length, 0)?;
        self.finish(n_traces, hdr_length, false, out)
    }

    /// Like [`compress`](Self::compress), also storing the first live sample
    /// of each of the first `n_traces` traces.
    pub fn compress_with_remute<S, T>(
        &mut self,
        headers: &S,
        n_traces: usize,
        hdr_length: usize,
        traces: &[T],
        out: &mut [u8],
    ) -> Result<usize>
    where
        S: IntSequence + ?Sized,
        T: AsRef<[f32]>,
    {
        if traces.len() < n_traces {
            return Err(OxiSeisError::invalid_parameter(
                "traces",
                format!("{} traces supplied for {n_traces} headers", traces.len()),
            ));
        }
        let columns = self.transpose(headers, n_traces, hdr_length, n_traces)?;
        let remute = &mut columns[n_traces * hdr_length..];
        for (slot, trace) in remute.iter_mut().zip(traces) {
            *slot = first_live_sample(trace.as_ref());
        }
        self.finish(n_traces, hdr_length, true, out)
    }

    fn transpose<S: IntSequence + ?Sized>(
        &mut self,
        headers: &S,
        n_traces: usize,
        hdr_length: usize,
        extra: usize,
    ) -> Result<&mut [i32]> {
        let total = n_traces
            .checked_mul(hdr_length)
            .filter(|&t| t <= i32::MAX as usize)
            .ok_or_else(|| {
                OxiSeisError::invalid_parameter("hdr_length", "header block too large")
            })?;
        if headers.int_len() < total {
            return Err(OxiSeisError::buffer_too_small(total, headers.int_len()));
        }
        let columns = self.columns.ensure(total + extra);
        for t in 0..n_traces {
            for f in 0..hdr_length {
                columns[f * n_traces + t] = headers.get_int(t * hdr_length + f)?;
            }
        }
        Ok(columns)
    }

    fn finish(
        &mut self,
        n_traces: usize,
        hdr_length: usize,
        remute: bool,
        out: &mut [u8],
    ) -> Result<usize> {
        let len = n_traces * hdr_length + if remute { n_traces } else { 0 };
        let data = &self.columns.as_slice()[..len];
        let sym = find_sentinels(data, &mut self.sorted);

        encode_runs(data, &sym, &mut self.body);
        let out_count = PREAMBLE_LEN + self.body.len();

        self.ints.clear();
        self.ints.extend_from_slice(&[
            HDR_COOKIE,
            sym.constant,
            sym.ascend,
            sym.descend,
            sym.delta,
            sym.floats,
            out_count as i32,
            hdr_length as i32,
            n_traces as i32,
            remute as i32,
        ]);
        self.ints.extend_from_slice(&self.body);

        self.bytes.clear();
        self.bytes.resize(out_count * 4, 0);
        for (i, &v) in self.ints.iter().enumerate() {
            write_at(&mut self.bytes, i * 4, v, self.order)?;
        }

        let mut deflated = Vec::with_capacity(self.bytes.len() / 2 + 16);
        ZlibEncoder::new(&self.bytes[..], self.level).read_to_end(&mut deflated)?;
        if deflated.len() > out.len() {
            return Err(OxiSeisError::buffer_too_small(deflated.len(), out.len()));
        }
        out[..deflated.len()].copy_from_slice(&deflated);
        trace!(
            n_traces,
            hdr_length,
            ints = out_count,
            bytes = deflated.len(),
            "compressed header block"
        );
        Ok(deflated.len())
    }

    /// Decompress a block written by [`compress`](Self::compress) or
    /// [`compress_with_remute`](Self::compress_with_remute).
    pub fn uncompress(&mut self, input: &[u8]) -> Result<HdrFrame> {
        let (n_traces, hdr_length, remute) = self.decode(input)?;
        let mut headers = vec![0i32; n_traces * hdr_length];
        let layout = self.scatter(&mut headers[..], n_traces, hdr_length, remute)?;
        Ok(HdrFrame {
            n_traces,
            hdr_length,
            headers,
            remute: layout.remute,
        })
    }

    /// Decompress directly into any writable int sequence, e.g. a byte
    /// buffer viewed through a `TypedBuffer`.
    pub fn uncompress_into<S: IntSequenceMut + ?Sized>(
        &mut self,
        input: &[u8],
        headers: &mut S,
    ) -> Result<HdrLayout> {
        let (n_traces, hdr_length, remute) = self.decode(input)?;
        let needed = n_traces * hdr_length;
        if headers.int_len() < needed {
            return Err(OxiSeisError::buffer_too_small(needed, headers.int_len()));
        }
        self.scatter(headers, n_traces, hdr_length, remute)
    }

    fn scatter<S: IntSequenceMut + ?Sized>(
        &self,
        headers: &mut S,
        n_traces: usize,
        hdr_length: usize,
        remute: bool,
    ) -> Result<HdrLayout> {
        let columns = self.columns.as_slice();
        for t in 0..n_traces {
            for f in 0..hdr_length {
                headers.put_int(t * hdr_length + f, columns[f * n_traces + t])?;
            }
        }
        let base = n_traces * hdr_length;
        Ok(HdrLayout {
            n_traces,
            hdr_length,
            remute: remute.then(|| columns[base..base + n_traces].to_vec()),
        })
    }

    /// Inflate and run-length decode into `self.columns`.
    fn decode(&mut self, input: &[u8]) -> Result<(usize, usize, bool)> {
        let result = self.decode_inner(input);
        if let Err(err) = &result {
            warn!(error = %err, "corrupted header block");
        }
        result
    }

    fn decode_inner(&mut self, input: &[u8]) -> Result<(usize, usize, bool)> {
        self.bytes.clear();
        ZlibDecoder::new(input)
            .read_to_end(&mut self.bytes)
            .map_err(|err| OxiSeisError::corrupted(0, format!("inflate failed: {err}")))?;
        if self.bytes.len() % 4 != 0 || self.bytes.len() < PREAMBLE_LEN * 4 {
            return Err(OxiSeisError::corrupted(
                0,
                format!("inflated length {} is not a header block", self.bytes.len()),
            ));
        }

        self.ints.clear();
        for offset in (0..self.bytes.len()).step_by(4) {
            self.ints.push(read_at(&self.bytes, offset, self.order)?);
        }
        let p = &self.ints[..PREAMBLE_LEN];
        if p[0] != HDR_COOKIE {
            return Err(OxiSeisError::invalid_cookie(p[0]));
        }
        let sym = Sentinels::from_array([p[1], p[2], p[3], p[4], p[5]]);
        let (out_count, hdr_length, n_traces, remute) = (p[6], p[7], p[8], p[9]);
        if out_count as usize != self.ints.len() || hdr_length < 0 || n_traces < 0 {
            return Err(OxiSeisError::corrupted(24, "inconsistent header block sizes"));
        }
        if remute != 0 && remute != 1 {
            return Err(OxiSeisError::corrupted(36, "bad remute flag"));
        }
        let (n_traces, hdr_length, remute) = (n_traces as usize, hdr_length as usize, remute == 1);

        let total = n_traces
            .checked_mul(hdr_length)
            .filter(|&t| t <= i32::MAX as usize)
            .map(|t| t + if remute { n_traces } else { 0 })
            .ok_or_else(|| OxiSeisError::corrupted(28, "header block too large"))?;
        let body = &self.ints[PREAMBLE_LEN..];
        let decoded = decoded_len(body, &sym, PREAMBLE_LEN)?;
        if decoded != total {
            return Err(OxiSeisError::corrupted(
                PREAMBLE_LEN * 4,
                format!("body decodes to {decoded} values, preamble declares {total}"),
            ));
        }
        let columns = self.columns.ensure(total);
        decode_runs(body, &sym, columns, PREAMBLE_LEN)?;
        Ok((n_traces, hdr_length, remute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiseis_core::bytecodec::TypedBuffer;

    fn lcg(seed: &mut u32) -> i32 {
        *seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
        (*seed >> 1) as i32
    }

    fn scenario_headers() -> Vec<i32> {
        let mut seed = 7;
        let mut headers = vec![0i32; 64 * 10];
        for t in 0..64 {
            let row = &mut headers[t * 10..(t + 1) * 10];
            row[0] = 1;
            row[1] = t as i32;
            row[2] = lcg(&mut seed);
            row[3] = 1000 - 25 * t as i32;
            row[4] = (12.5f32 + t as f32 * 0.25).to_bits() as i32;
            row[5] = if t < 32 { 4 } else { 5 };
            row[6] = 640 - t as i32;
            row[7] = -1;
            row[8] = (t % 3) as i32;
            row[9] = i32::MAX;
        }
        headers
    }

    #[test]
    fn test_scenario_roundtrip() {
        let headers = scenario_headers();
        let mut hc = HdrCompressor::default();
        let mut out = vec![0u8; 64 * 10 * 4 + 256];
        let n = hc.compress(&headers[..], 64, 10, &mut out).unwrap();
        assert!(n < headers.len() * 4 / 2);

        let frame = hc.uncompress(&out[..n]).unwrap();
        assert_eq!(frame.n_traces, 64);
        assert_eq!(frame.hdr_length, 10);
        assert_eq!(frame.headers, headers);
        assert!(frame.remute.is_none());
    }

    #[test]
    fn test_sentinels_are_absent() {
        let data: Vec<i32> = SENTINEL_CANDIDATES
            .iter()
            .copied()
            .chain([i32::MIN, i32::MIN + 2])
            .collect();
        let sym = find_sentinels(&data, &mut Vec::new());
        let all = [sym.constant, sym.ascend, sym.descend, sym.delta, sym.floats];
        for s in all {
            assert!(!data.contains(&s));
        }
        assert_eq!(all, [i32::MIN + 1, i32::MIN + 3, i32::MIN + 4, i32::MIN + 5, i32::MIN + 6]);
    }

    #[test]
    fn test_run_selection() {
        let sym = find_sentinels(&[], &mut Vec::new());
        let mut body = Vec::new();

        encode_runs(&[9, 9, 9], &sym, &mut body);
        assert_eq!(body, vec![sym.constant, 3, 9, sym.constant, 0]);

        encode_runs(&[9, 9], &sym, &mut body);
        assert_eq!(body, vec![9, 9, sym.constant, 0]);

        encode_runs(&[5, 4, 3], &sym, &mut body);
        assert_eq!(body, vec![sym.descend, 3, 5, sym.constant, 0]);

        encode_runs(&[0, 10, 20, 30], &sym, &mut body);
        assert_eq!(body, vec![0, 10, 20, 30, sym.constant, 0]);

        encode_runs(&[0, 10, 20, 30, 40], &sym, &mut body);
        assert_eq!(body, vec![sym.delta, 5, 0, 10, sym.constant, 0]);

        let floats: Vec<i32> = (0..6)
            .map(|i| (1.5f32 + i as f32 * 0.5).to_bits() as i32)
            .collect();
        encode_runs(&floats, &sym, &mut body);
        assert_eq!(body[0], sym.floats);
        assert_eq!(body[1], 6);
        let mut decoded = vec![0; 6];
        decode_runs(&body, &sym, &mut decoded, 0).unwrap();
        assert_eq!(decoded, floats);
    }

    #[test]
    fn test_wrapping_runs() {
        let data = [i32::MAX - 1, i32::MAX, i32::MIN, i32::MIN + 1];
        let sym = find_sentinels(&data, &mut Vec::new());
        let mut body = Vec::new();
        encode_runs(&data, &sym, &mut body);
        assert_eq!(body[..3], [sym.ascend, 4, i32::MAX - 1]);
        let mut decoded = [0; 4];
        decode_runs(&body, &sym, &mut decoded, 0).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_remute_roundtrip() {
        let traces: Vec<Vec<f32>> = vec![
            vec![0.0, 0.0, 1.0, 2.0],
            vec![0.0; 4],
            vec![3.0, 0.0, 0.0, 1.0],
        ];
        let headers = [10, 20, 30, 11, 21, 31, 12, 22, 32];
        let mut hc = HdrCompressor::new(ByteOrder::LittleEndian);
        let mut out = vec![0u8; 512];
        let n = hc
            .compress_with_remute(&headers[..], 3, 3, &traces, &mut out)
            .unwrap();
        let frame = hc.uncompress(&out[..n]).unwrap();
        assert_eq!(frame.headers, headers);
        let remute = frame.remute.unwrap();
        assert_eq!(remute, vec![2, 4, 0]);

        let mut noisy: Vec<Vec<f32>> = traces
            .iter()
            .map(|t| t.iter().map(|v| v + 0.5).collect())
            .collect();
        apply_remute(&mut noisy, &remute);
        assert_eq!(noisy[0], vec![0.0, 0.0, 1.5, 2.5]);
        assert_eq!(noisy[1], vec![0.0; 4]);
        assert_eq!(noisy[2][0], 3.5);
    }

    #[test]
    fn test_byte_buffer_sequences() {
        let headers = scenario_headers();
        let mut raw = vec![0u8; headers.len() * 4];
        {
            let mut view = TypedBuffer::<_, i32>::new(&mut raw[..], ByteOrder::BigEndian);
            view.put_slice(&headers).unwrap();
        }
        let view = TypedBuffer::<_, i32>::new(&raw[..], ByteOrder::BigEndian);
        let mut hc = HdrCompressor::default();
        let mut out = vec![0u8; 4096];
        let n = hc.compress(&view, 64, 10, &mut out).unwrap();

        let mut back = vec![0u8; raw.len()];
        let mut dst = TypedBuffer::<_, i32>::new(&mut back[..], ByteOrder::BigEndian);
        let layout = hc.uncompress_into(&out[..n], &mut dst).unwrap();
        assert_eq!(layout.n_traces, 64);
        assert_eq!(back, raw);
    }

    #[test]
    fn test_output_too_small() {
        let headers = scenario_headers();
        let mut hc = HdrCompressor::default();
        let mut out = vec![0u8; 8];
        let err = hc.compress(&headers[..], 64, 10, &mut out).unwrap_err();
        assert!(matches!(err, OxiSeisError::BufferTooSmall { .. }));
    }

    #[test]
    fn test_short_input_sequence() {
        let mut hc = HdrCompressor::default();
        let mut out = vec![0u8; 64];
        let err = hc.compress(&[1, 2, 3][..], 2, 2, &mut out).unwrap_err();
        assert!(matches!(err, OxiSeisError::BufferTooSmall { needed: 4, .. }));
    }

    #[test]
    fn test_corrupted_blocks() {
        let mut hc = HdrCompressor::default();
        assert!(hc.uncompress(b"not zlib at all").unwrap_err().is_corruption());

        let mut out = vec![0u8; 256];
        let n = hc.compress(&[1, 2, 3, 4][..], 2, 2, &mut out).unwrap();

        let mut other = HdrCompressor::new(ByteOrder::LittleEndian);
        let err = other.uncompress(&out[..n]).unwrap_err();
        assert!(matches!(err, OxiSeisError::InvalidCookie { .. }));
    }

    #[test]
    fn test_decode_rejects_overlong_runs() {
        let sym = find_sentinels(&[], &mut Vec::new());
        let mut out = [0; 2];
        let err = decode_runs(&[sym.constant, 3, 1, sym.constant, 0], &sym, &mut out, 0);
        assert!(err.is_err());
        let err = decode_runs(&[7, 8], &sym, &mut out, 0);
        assert!(err.is_err());
    }

    fn deflate_ints(ints: &[i32]) -> Vec<u8> {
        let mut bytes = vec![0u8; ints.len() * 4];
        for (i, &v) in ints.iter().enumerate() {
            write_at(&mut bytes, i * 4, v, ByteOrder::BigEndian).unwrap();
        }
        let mut out = Vec::new();
        ZlibEncoder::new(&bytes[..], Compression::default())
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_decoded_len() {
        let sym = find_sentinels(&[], &mut Vec::new());
        let body = [sym.constant, 3, 1, 7, sym.delta, 5, 0, 2, sym.constant, 0];
        assert_eq!(decoded_len(&body, &sym, 0).unwrap(), 9);
        assert!(decoded_len(&body[..9], &sym, 0).is_err());
        assert!(decoded_len(&[sym.ascend, -4, 1, sym.constant, 0], &sym, 0).is_err());
    }

    #[test]
    fn test_oversized_preamble_is_rejected_before_allocating() {
        let sym = find_sentinels(&[], &mut Vec::new());
        let ints = [
            HDR_COOKIE,
            sym.constant,
            sym.ascend,
            sym.descend,
            sym.delta,
            sym.floats,
            12,
            10_000,
            10_000,
            0,
            sym.constant,
            0,
        ];
        let mut hc = HdrCompressor::default();
        let err = hc.uncompress(&deflate_ints(&ints)).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(hc.columns.capacity(), 0);
    }

    #[test]
    fn test_long_constant_run_still_decodes() {
        let sym = find_sentinels(&[], &mut Vec::new());
        let ints = [
            HDR_COOKIE,
            sym.constant,
            sym.ascend,
            sym.descend,
            sym.delta,
            sym.floats,
            15,
            300,
            200,
            0,
            sym.constant,
            60_000,
            42,
            sym.constant,
            0,
        ];
        let mut hc = HdrCompressor::default();
        let frame = hc.uncompress(&deflate_ints(&ints)).unwrap();
        assert_eq!((frame.n_traces, frame.hdr_length), (200, 300));
        assert!(frame.headers.iter().all(|&v| v == 42));
    }
}
