//! Compress command implementation.

use crate::utils::{
    CliResult, ContainerWriter, create_progress_bar, format_size, read_raw_frame,
};
use oxiseis_seispeg::{ByteOrder, Policy, SeisPeg, SeisPegConfig};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

/// Options for compressing a raw sample file.
#[derive(Debug, Clone, Copy)]
pub struct CompressOptions {
    /// Samples per trace.
    pub n1: usize,
    /// Traces per frame.
    pub n2: usize,
    /// Relative quantization step.
    pub distortion: f32,
    /// Block-size policy.
    pub policy: Policy,
    /// Byte order of the compressed payloads.
    pub byte_order: ByteOrder,
    /// Gain exponent, 0 for none.
    pub gain: f32,
    /// Show a progress bar.
    pub progress: bool,
}

impl CompressOptions {
    /// The codec configuration these options describe.
    pub fn config(&self) -> SeisPegConfig {
        SeisPegConfig::with_policy(self.n1, self.n2, self.distortion, self.policy)
            .gain(self.gain)
            .byte_order(self.byte_order)
    }
}

pub fn cmd_compress(input: &Path, output: &Path, opts: &CompressOptions) -> CliResult<()> {
    let config = opts.config();
    let mut codec = SeisPeg::new(config)?;
    debug!(?config, "compress");

    let frame_bytes = (opts.n1 * opts.n2 * 4) as u64;
    let input_len = std::fs::metadata(input)?.len();
    let pb = create_progress_bar(input_len.div_ceil(frame_bytes), opts.progress);

    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = ContainerWriter::new(BufWriter::new(File::create(output)?), opts.byte_order)?;
    let mut scratch = Vec::new();
    let mut out = vec![0u8; codec.max_compressed_bytes()];

    let mut frames = 0usize;
    let mut traces_in = 0usize;
    let mut bytes_out = 0u64;
    while let Some(traces) = read_raw_frame(&mut reader, opts.n1, opts.n2, &mut scratch)? {
        let n = codec.compress(&traces, traces.len(), &mut out)?;
        writer.write_frame(traces.len(), &out[..n])?;

        frames += 1;
        traces_in += traces.len();
        bytes_out += n as u64;
        pb.inc(1);
    }
    writer.finish()?;
    pb.finish_and_clear();

    let bytes_in = (traces_in * opts.n1 * 4) as u64;
    info!(frames, traces = traces_in, bytes_in, bytes_out, "compressed");
    println!(
        "Compressed {} frames ({} traces): {} -> {}",
        frames,
        traces_in,
        format_size(bytes_in),
        format_size(bytes_out)
    );
    if bytes_out > 0 {
        println!("Ratio: {:.2}:1", bytes_in as f64 / bytes_out as f64);
    }
    Ok(())
}
