//! Whole-frame helpers over flat sample buffers.
//!
//! A flat frame holds `n_traces * n1` samples, trace after trace. With the
//! `parallel` feature, frames are spread over the rayon thread pool and
//! every worker builds its own [`SeisPeg`], since codec instances carry
//! scratch state and must not be shared.

use crate::config::SeisPegConfig;
use crate::seispeg::SeisPeg;
use oxiseis_core::error::{OxiSeisError, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

fn traces_of(frame: &[f32], n1: usize, n2: usize) -> Result<Vec<&[f32]>> {
    if frame.len() % n1 != 0 || frame.len() / n1 > n2 {
        return Err(OxiSeisError::invalid_parameter(
            "frame",
            format!(
                "{} samples is not a whole number of at most {n2} traces of {n1}",
                frame.len()
            ),
        ));
    }
    Ok(frame.chunks_exact(n1).collect())
}

fn compress_one(codec: &mut SeisPeg, frame: &[f32]) -> Result<Vec<u8>> {
    let (n1, n2) = (codec.config().n1, codec.config().n2);
    let traces = traces_of(frame, n1, n2)?;
    let mut out = vec![0u8; codec.max_compressed_bytes()];
    let n = codec.compress(&traces, traces.len(), &mut out)?;
    out.truncate(n);
    Ok(out)
}

fn uncompress_one(codec: &mut SeisPeg, input: &[u8], n_traces: usize) -> Result<Vec<f32>> {
    let n1 = codec.config().n1;
    let mut frame = vec![0f32; n_traces * n1];
    let mut traces: Vec<&mut [f32]> = frame.chunks_exact_mut(n1).collect();
    codec.uncompress(input, n_traces, &mut traces)?;
    Ok(frame)
}

/// Compress every flat frame with one codec.
pub fn compress_frames<F: AsRef<[f32]>>(
    config: SeisPegConfig,
    frames: &[F],
) -> Result<Vec<Vec<u8>>> {
    let mut codec = SeisPeg::new(config)?;
    frames
        .iter()
        .map(|frame| compress_one(&mut codec, frame.as_ref()))
        .collect()
}

/// Decompress buffers of `n_traces` traces each into flat frames.
pub fn uncompress_frames<B: AsRef<[u8]>>(
    config: SeisPegConfig,
    buffers: &[B],
    n_traces: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut codec = SeisPeg::new(config)?;
    buffers
        .iter()
        .map(|buf| uncompress_one(&mut codec, buf.as_ref(), n_traces))
        .collect()
}

/// Parallel [`compress_frames`] (requires the `parallel` feature).
///
/// The output is identical to the sequential version.
#[cfg(feature = "parallel")]
pub fn compress_frames_parallel<F: AsRef<[f32]> + Sync>(
    config: SeisPegConfig,
    frames: &[F],
) -> Result<Vec<Vec<u8>>> {
    config.validate()?;
    frames
        .par_iter()
        .map_init(
            || SeisPeg::new(config),
            |codec, frame| match codec {
                Ok(codec) => compress_one(codec, frame.as_ref()),
                Err(err) => Err(OxiSeisError::invalid_parameter("config", err.to_string())),
            },
        )
        .collect()
}

/// Parallel [`uncompress_frames`] (requires the `parallel` feature).
#[cfg(feature = "parallel")]
pub fn uncompress_frames_parallel<B: AsRef<[u8]> + Sync>(
    config: SeisPegConfig,
    buffers: &[B],
    n_traces: usize,
) -> Result<Vec<Vec<f32>>> {
    config.validate()?;
    buffers
        .par_iter()
        .map_init(
            || SeisPeg::new(config),
            |codec, buf| match codec {
                Ok(codec) => uncompress_one(codec, buf.as_ref(), n_traces),
                Err(err) => Err(OxiSeisError::invalid_parameter("config", err.to_string())),
            },
        )
        .collect()
}
