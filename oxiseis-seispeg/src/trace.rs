//! Fixed-ratio 16-bit and 8-bit trace codecs.
//!
//! Every trace is cut into windows of [`WINDOW_LEN`] samples. Each window is
//! scaled so that its largest magnitude maps to the largest integer of the
//! sample type. A record holds the per-window scale factors followed by the
//! scaled samples, padded to a multiple of four bytes:
//!
//! ```text
//! +-------------------+---------------------------+---------+
//! | nwin x f32 scales | n1 x int16 (or int8)      | padding |
//! +-------------------+---------------------------+---------+
//! ```
//!
//! An all-zero window stores a scale of 0.

use oxiseis_core::bytecodec::{ByteOrder, Element, TypedBuffer};
use oxiseis_core::error::{OxiSeisError, Result};

/// Samples per scaling window.
pub const WINDOW_LEN: usize = 100;

/// Integer width of a fixed-ratio record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceFormat {
    /// 16-bit samples.
    Int16,
    /// 8-bit samples.
    Int8,
}

impl TraceFormat {
    /// Bytes per sample.
    pub fn sample_size(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int8 => 1,
        }
    }
}

trait Sample: Element {
    const LIMIT: f32;
    fn from_scaled(v: f32) -> Self;
    fn to_f32(self) -> f32;
}

impl Sample for i16 {
    const LIMIT: f32 = i16::MAX as f32;
    fn from_scaled(v: f32) -> Self {
        v.round() as i16
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Sample for i8 {
    const LIMIT: f32 = i8::MAX as f32;
    fn from_scaled(v: f32) -> Self {
        v.round() as i8
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
}

/// Encodes traces of `n1` samples into fixed-length records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceCodec {
    format: TraceFormat,
    n1: usize,
    order: ByteOrder,
}

impl TraceCodec {
    /// Create a codec for traces of `n1` samples.
    pub fn new(format: TraceFormat, n1: usize, order: ByteOrder) -> Result<Self> {
        if n1 == 0 {
            return Err(OxiSeisError::invalid_parameter("n1", "must be positive"));
        }
        Ok(Self { format, n1, order })
    }

    /// Sample format.
    pub fn format(&self) -> TraceFormat {
        self.format
    }

    /// Number of scaling windows per trace.
    pub fn windows(&self) -> usize {
        self.n1.div_ceil(WINDOW_LEN)
    }

    /// Bytes per encoded trace.
    pub fn record_length(&self) -> usize {
        let raw = self.windows() * 4 + self.n1 * self.format.sample_size();
        raw.div_ceil(4) * 4
    }

    /// Encode the first `n1` samples of `trace` into `out`.
    ///
    /// Non-finite samples have no scaled representation and are rejected
    /// with `InvalidParameter`; `out` is left untouched.
    pub fn encode_trace(&self, trace: &[f32], out: &mut [u8]) -> Result<usize> {
        let len = self.record_length();
        if trace.len() < self.n1 {
            return Err(OxiSeisError::buffer_too_small(self.n1, trace.len()));
        }
        if out.len() < len {
            return Err(OxiSeisError::buffer_too_small(len, out.len()));
        }
        if let Some(i) = trace[..self.n1].iter().position(|v| !v.is_finite()) {
            return Err(OxiSeisError::invalid_parameter(
                "trace",
                format!("sample {i} is not finite"),
            ));
        }
        match self.format {
            TraceFormat::Int16 => self.encode_as::<i16>(&trace[..self.n1], &mut out[..len])?,
            TraceFormat::Int8 => self.encode_as::<i8>(&trace[..self.n1], &mut out[..len])?,
        }
        Ok(len)
    }

    fn encode_as<S: Sample>(&self, trace: &[f32], record: &mut [u8]) -> Result<()> {
        let split = self.windows() * 4;
        let (head, body) = record.split_at_mut(split);
        let mut scales = TypedBuffer::<_, f32>::new(head, self.order);
        let mut samples = TypedBuffer::<_, S>::new(body, self.order);

        for window in trace.chunks(WINDOW_LEN) {
            let peak = window.iter().fold(0f32, |m, v| m.max(v.abs()));
            let scale = peak / S::LIMIT;
            scales.put(scale)?;
            for &v in window {
                let q = if scale > 0.0 {
                    S::from_scaled(v / scale)
                } else {
                    S::default()
                };
                samples.put(q)?;
            }
        }
        let end = split + trace.len() * S::SIZE;
        record[end..].fill(0);
        Ok(())
    }

    /// Decode one record into the first `n1` samples of `trace`.
    pub fn decode_trace(&self, input: &[u8], trace: &mut [f32]) -> Result<()> {
        let len = self.record_length();
        if input.len() < len {
            return Err(OxiSeisError::corrupted(
                input.len(),
                format!("trace record needs {len} bytes"),
            ));
        }
        if trace.len() < self.n1 {
            return Err(OxiSeisError::buffer_too_small(self.n1, trace.len()));
        }
        match self.format {
            TraceFormat::Int16 => self.decode_as::<i16>(&input[..len], &mut trace[..self.n1]),
            TraceFormat::Int8 => self.decode_as::<i8>(&input[..len], &mut trace[..self.n1]),
        }
    }

    fn decode_as<S: Sample>(&self, record: &[u8], trace: &mut [f32]) -> Result<()> {
        let (head, body) = record.split_at(self.windows() * 4);
        let mut scales = TypedBuffer::<_, f32>::new(head, self.order);
        let mut samples = TypedBuffer::<_, S>::new(body, self.order);
        for window in trace.chunks_mut(WINDOW_LEN) {
            let scale = scales.get()?;
            for v in window.iter_mut() {
                *v = samples.get()?.to_f32() * scale;
            }
        }
        Ok(())
    }

    /// Encode `n_traces` traces back to back.
    pub fn encode_frame<T: AsRef<[f32]>>(
        &self,
        traces: &[T],
        n_traces: usize,
        out: &mut [u8],
    ) -> Result<usize> {
        let len = self.record_length();
        let needed = len * n_traces;
        if traces.len() < n_traces {
            return Err(OxiSeisError::invalid_parameter(
                "traces",
                format!("{} traces supplied, {n_traces} requested", traces.len()),
            ));
        }
        if out.len() < needed {
            return Err(OxiSeisError::buffer_too_small(needed, out.len()));
        }
        for (trace, record) in traces.iter().zip(out.chunks_exact_mut(len)).take(n_traces) {
            self.encode_trace(trace.as_ref(), record)?;
        }
        Ok(needed)
    }

    /// Decode `n_traces` back-to-back records.
    pub fn decode_frame<T: AsMut<[f32]>>(
        &self,
        input: &[u8],
        n_traces: usize,
        traces: &mut [T],
    ) -> Result<()> {
        let len = self.record_length();
        if traces.len() < n_traces {
            return Err(OxiSeisError::invalid_parameter(
                "traces",
                format!("{} traces supplied, {n_traces} requested", traces.len()),
            ));
        }
        if input.len() < len * n_traces {
            return Err(OxiSeisError::corrupted(
                input.len(),
                format!("frame of {n_traces} records needs {} bytes", len * n_traces),
            ));
        }
        for (record, trace) in input.chunks_exact(len).zip(traces.iter_mut()).take(n_traces) {
            self.decode_trace(record, trace.as_mut())?;
        }
        Ok(())
    }
}
