//! Info command implementation.

use crate::utils::{CliResult, ContainerReader, FILE_HEADER_LEN, RECORD_PREFIX_LEN, format_size};
use oxiseis_seispeg::{SeisPeg, SeisPegHeader};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// JSON serializable view of the first frame header.
#[derive(Debug, Serialize)]
struct HeaderJson {
    kind: String,
    distortion: f32,
    n1: usize,
    n2: usize,
    vertical_block_size: usize,
    horizontal_block_size: usize,
    vertical_trans_length: usize,
    horizontal_trans_length: usize,
    ft_gain_exponent: f32,
}

impl From<&SeisPegHeader> for HeaderJson {
    fn from(h: &SeisPegHeader) -> Self {
        Self {
            kind: h.kind.name().to_string(),
            distortion: h.distortion,
            n1: h.n1,
            n2: h.n2,
            vertical_block_size: h.vertical_block_size,
            horizontal_block_size: h.horizontal_block_size,
            vertical_trans_length: h.vertical_trans_length,
            horizontal_trans_length: h.horizontal_trans_length,
            ft_gain_exponent: h.ft_gain_exponent,
        }
    }
}

/// JSON serializable file summary.
#[derive(Debug, Serialize)]
struct FileInfoJson {
    file: String,
    byte_order: String,
    frames: usize,
    traces: usize,
    bad_amplitude_frames: usize,
    frames_with_headers: usize,
    compressed_bytes: u64,
    uncompressed_bytes: u64,
    ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_frame: Option<HeaderJson>,
}

pub fn cmd_info(input: &Path, json: bool) -> CliResult<()> {
    let mut reader = ContainerReader::new(BufReader::new(File::open(input)?))?;
    let order = reader.order();

    let mut first: Option<SeisPegHeader> = None;
    let mut frames = 0usize;
    let mut traces = 0usize;
    let mut bad = 0usize;
    let mut with_headers = 0usize;
    let mut compressed = FILE_HEADER_LEN as u64;
    let mut uncompressed = 0u64;
    while let Some(record) = reader.next_frame()? {
        let header = SeisPeg::read_header(&record.payload, order)?;
        frames += 1;
        traces += record.n_traces;
        if header.kind.is_bad_amplitude() {
            bad += 1;
        }
        if header.n_bytes_hdrs > 0 {
            with_headers += 1;
        }
        compressed += (RECORD_PREFIX_LEN + record.payload.len()) as u64;
        uncompressed = uncompressed
            .saturating_add((record.n_traces as u64).saturating_mul(header.n1 as u64 * 4));
        first.get_or_insert(header);
    }

    let ratio = if compressed > 0 {
        uncompressed as f64 / compressed as f64
    } else {
        0.0
    };

    if json {
        let output = FileInfoJson {
            file: input.display().to_string(),
            byte_order: order.name().to_string(),
            frames,
            traces,
            bad_amplitude_frames: bad,
            frames_with_headers: with_headers,
            compressed_bytes: compressed,
            uncompressed_bytes: uncompressed,
            ratio,
            first_frame: first.as_ref().map(HeaderJson::from),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("SeisPEG File Information");
    println!("========================");
    println!("File: {}", input.display());
    println!("Byte order: {}", order.name());
    println!("Frames: {}", frames);
    println!("Traces: {}", traces);
    println!("Compressed size: {}", format_size(compressed));
    println!("Uncompressed size: {}", format_size(uncompressed));
    if compressed > 0 {
        println!("Compression ratio: {:.2}:1", ratio);
    }
    if bad > 0 {
        println!("Frames stored raw (bad amplitude): {}", bad);
    }
    if with_headers > 0 {
        println!("Frames with trace headers: {}", with_headers);
    }

    if let Some(h) = first {
        println!();
        println!("First frame:");
        println!("  Format: {}", h.kind);
        println!("  Samples per trace: {}", h.n1);
        println!("  Traces per frame: {}", h.n2);
        println!("  Distortion: {}", h.distortion);
        println!(
            "  Blocks: {}x{} (transform {}x{})",
            h.vertical_block_size,
            h.horizontal_block_size,
            h.vertical_trans_length,
            h.horizontal_trans_length
        );
        if h.kind.has_gain() {
            println!("  Gain exponent: {}", h.ft_gain_exponent);
        }
    }
    Ok(())
}
