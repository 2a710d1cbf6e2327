//! # OxiSeis Core
//!
//! Core components for the OxiSeis JavaSeis codec.
//!
//! This crate provides the building blocks shared by every codec stage:
//!
//! - [`bytecodec`]: Typed, byte-order aware views over raw byte buffers
//! - [`bitstream`]: MSB-first bit I/O into caller-owned slices
//! - [`buffer`]: Grow-only scratch buffers reused across frames
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Tools                                               │
//! │     oxiseis CLI                                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     SeisPEG (LOT + quantize + RLE + Huffman),           │
//! │     header compressor, 16/8-bit trace codecs            │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Buffers (this crate)                                │
//! │     TypedBuffer, MsbBitReader/Writer, GrowBuffer        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiseis_core::bytecodec::{ByteOrder, TypedBuffer};
//!
//! let bytes = 3.5f32.to_le_bytes();
//! let floats = TypedBuffer::<_, f32>::new(&bytes[..], ByteOrder::LittleEndian);
//! assert_eq!(floats.get_at(0).unwrap(), 3.5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod bitstream;
pub mod buffer;
pub mod bytecodec;
pub mod error;

// Re-exports for convenience
pub use bitstream::{MsbBitReader, MsbBitWriter};
pub use buffer::GrowBuffer;
pub use bytecodec::{ByteOrder, Element, IntSequence, IntSequenceMut, TypedBuffer};
pub use error::{OxiSeisError, Result};
