//! Pure Rust SeisPEG codec for JavaSeis trace data.
//!
//! SeisPEG is a lossy transform coder for 2D frames of seismic traces. A
//! frame is padded to whole blocks, transformed with a lapped orthogonal
//! transform along both axes, and every tile of coefficients is quantized,
//! run-length coded and Huffman coded against a fixed frequency table.
//! Integer trace headers travel alongside, compressed losslessly by a
//! run-length coder and zlib.
//!
//! # Pipeline
//!
//! ```text
//! traces ──► pad + gain ──► LOT (traces, then time) ──► per tile:
//!            quantize ──► run-length ──► Huffman ──► [len | tile] ...
//! headers ─► transpose ──► sentinel runs ──► zlib
//! ```
//!
//! # Modules
//!
//! - [`huffman`] / [`tables`]: static Huffman code books
//! - [`block`]: quantization and run-length coding of one tile
//! - [`transform`]: 8- and 16-point lapped orthogonal transforms
//! - [`hdr`]: trace-header compressor
//! - [`header`]: the self-describing buffer header
//! - [`seispeg`]: the frame codec
//! - [`trace`]: fixed-ratio 16-bit and 8-bit trace codecs
//! - [`frames`]: whole-frame helpers, parallel with the `parallel` feature
//!
//! # Example
//!
//! ```
//! use oxiseis_seispeg::{Policy, SeisPeg, SeisPegConfig};
//!
//! let (n1, n2) = (64, 16);
//! let traces: Vec<Vec<f32>> = (0..n2)
//!     .map(|t| (0..n1).map(|i| ((i + t) as f32 * 0.1).sin()).collect())
//!     .collect();
//!
//! let config = SeisPegConfig::with_policy(n1, n2, 0.1, Policy::MaxCompression);
//! let mut codec = SeisPeg::new(config).unwrap();
//! let mut out = vec![0u8; codec.max_compressed_bytes()];
//! let n = codec.compress(&traces, n2, &mut out).unwrap();
//!
//! let mut back = vec![vec![0f32; n1]; n2];
//! codec.uncompress(&out[..n], n2, &mut back).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod block;
pub mod config;
pub mod frames;
pub mod hdr;
pub mod header;
pub mod huffman;
pub mod seispeg;
pub mod tables;
pub mod trace;
pub mod transform;

pub use block::{BlockCompressor, CPDF, compute_delta, quantize};
pub use config::{Policy, SeisPegConfig};
pub use frames::{compress_frames, uncompress_frames};
pub use hdr::{HdrCompressor, HdrFrame, HdrLayout, apply_remute};
pub use header::{HeaderKind, LEN_HDR_INFO, SeisPegHeader, cookie_kind};
pub use huffman::{HuffCoder, HuffTable};
pub use seispeg::{BAD_AMPLITUDE, SeisPeg};
pub use trace::{TraceCodec, TraceFormat};
pub use transform::{BlockShape, Transformer, lot_fwd, lot_rev};

#[cfg(feature = "parallel")]
pub use frames::{compress_frames_parallel, uncompress_frames_parallel};

pub use oxiseis_core::{ByteOrder, OxiSeisError, Result};
