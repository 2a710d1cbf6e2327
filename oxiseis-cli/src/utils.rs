//! Utility functions for the CLI.
//!
//! Compressed files are a short file header followed by one record per
//! frame:
//!
//! ```text
//! +--------+-------+---------+   +----------+---------+---------+
//! | "OXSP" | order | 3 x pad |   | n_traces | n_bytes | payload | ...
//! +--------+-------+---------+   +----------+---------+---------+
//! ```
//!
//! `order` is 0 for big-endian and 1 for little-endian; it applies to the
//! record fields and to every SeisPEG payload. Raw sample files are
//! little-endian f32, trace after trace.

use indicatif::{ProgressBar, ProgressStyle};
use oxiseis_core::bytecodec::{ByteOrder, read_at, write_at};
use std::error::Error;
use std::io::{self, Read, Write};

/// Magic bytes at the start of every compressed file.
pub const MAGIC: [u8; 4] = *b"OXSP";

/// Length of the file header.
pub const FILE_HEADER_LEN: usize = 8;

/// Length of a frame record prefix.
pub const RECORD_PREFIX_LEN: usize = 8;

/// Boxed error used throughout the commands.
pub type CliResult<T> = Result<T, Box<dyn Error>>;

/// Create a progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    pb.set_style(style);
    pb
}

/// Format a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read up to `n2` traces of `n1` little-endian f32 samples.
///
/// Returns `None` at end of input. A trailing partial trace is an error.
pub fn read_raw_frame<R: Read>(
    reader: &mut R,
    n1: usize,
    n2: usize,
    scratch: &mut Vec<u8>,
) -> CliResult<Option<Vec<Vec<f32>>>> {
    scratch.resize(n1 * n2 * 4, 0);
    let n = fill(reader, scratch)?;
    if n == 0 {
        return Ok(None);
    }
    if n % (n1 * 4) != 0 {
        return Err(format!(
            "input ends inside a trace ({} trailing bytes for n1 = {})",
            n % (n1 * 4),
            n1
        )
        .into());
    }

    let traces = scratch[..n]
        .chunks_exact(n1 * 4)
        .map(|trace| {
            trace
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect();
    Ok(Some(traces))
}

/// Write traces as little-endian f32 samples.
pub fn write_raw_frame<W: Write>(writer: &mut W, traces: &[Vec<f32>]) -> io::Result<()> {
    for trace in traces {
        for v in trace {
            writer.write_all(&v.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Writes frame records after the file header.
pub struct ContainerWriter<W: Write> {
    inner: W,
    order: ByteOrder,
}

impl<W: Write> ContainerWriter<W> {
    /// Write the file header.
    pub fn new(mut inner: W, order: ByteOrder) -> io::Result<Self> {
        let mut header = [0u8; FILE_HEADER_LEN];
        header[..4].copy_from_slice(&MAGIC);
        header[4] = match order {
            ByteOrder::BigEndian => 0,
            ByteOrder::LittleEndian => 1,
        };
        inner.write_all(&header)?;
        Ok(Self { inner, order })
    }

    /// Append one compressed frame.
    pub fn write_frame(&mut self, n_traces: usize, payload: &[u8]) -> CliResult<()> {
        let mut prefix = [0u8; RECORD_PREFIX_LEN];
        write_at(&mut prefix, 0, u32::try_from(n_traces)?, self.order)?;
        write_at(&mut prefix, 4, u32::try_from(payload.len())?, self.order)?;
        self.inner.write_all(&prefix)?;
        self.inner.write_all(payload)?;
        Ok(())
    }

    /// Flush and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// One frame record.
#[derive(Debug)]
pub struct FrameRecord {
    /// Live traces in the frame.
    pub n_traces: usize,
    /// SeisPEG payload.
    pub payload: Vec<u8>,
}

/// Reads frame records after validating the file header.
pub struct ContainerReader<R: Read> {
    inner: R,
    order: ByteOrder,
}

impl<R: Read> ContainerReader<R> {
    /// Read and check the file header.
    pub fn new(mut inner: R) -> CliResult<Self> {
        let mut header = [0u8; FILE_HEADER_LEN];
        if fill(&mut inner, &mut header)? < FILE_HEADER_LEN || header[..4] != MAGIC {
            return Err("not an OxiSeis file (bad magic)".into());
        }
        let order = match header[4] {
            0 => ByteOrder::BigEndian,
            1 => ByteOrder::LittleEndian,
            other => return Err(format!("unknown byte order flag {}", other).into()),
        };
        Ok(Self { inner, order })
    }

    /// Byte order of the payloads.
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// The next record, or `None` at end of file.
    pub fn next_frame(&mut self) -> CliResult<Option<FrameRecord>> {
        let mut prefix = [0u8; RECORD_PREFIX_LEN];
        match fill(&mut self.inner, &mut prefix)? {
            0 => return Ok(None),
            RECORD_PREFIX_LEN => {}
            _ => return Err("truncated frame record".into()),
        }
        let n_traces: u32 = read_at(&prefix, 0, self.order)?;
        let len: u32 = read_at(&prefix, 4, self.order)?;

        let mut payload = vec![0u8; len as usize];
        if fill(&mut self.inner, &mut payload)? < payload.len() {
            return Err("truncated frame payload".into());
        }
        Ok(Some(FrameRecord {
            n_traces: n_traces as usize,
            payload,
        }))
    }
}
