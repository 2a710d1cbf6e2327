//! The self-describing header at the start of every SeisPEG buffer.
//!
//! ```text
//! offset  size  field
//!      0     2  cookie (int16)
//!      2     4  distortion (f32 bits)
//!      6     4  n1
//!     10     4  n2
//!     14     2  vertical block size
//!     16     2  horizontal block size
//!     18     1  vertical transform length
//!     19     1  horizontal transform length
//!     20     4  bytes used by traces
//!     24     4  bytes used by headers
//!     28     4  function-of-time gain exponent (f32 bits, v3 only)
//! ```
//!
//! All fields use the codec's configured byte order.

use oxiseis_core::bytecodec::{ByteOrder, read_at, write_at};
use oxiseis_core::error::{OxiSeisError, Result};

/// Header length without the gain field.
pub const HEADER_LEN_V2: usize = 28;

/// Header length with the gain field.
pub const HEADER_LEN_V3: usize = 32;

/// Bytes reserved at the start of a bad-amplitude buffer, enough for any
/// header version.
pub const LEN_HDR_INFO: usize = 32;

const COOKIE_NORMAL_V2: i16 = 0x6A53;
const COOKIE_NORMAL_V3: i16 = 0x6A54;
const COOKIE_BAD_AMPLITUDE_V2: i16 = 0x6A55;
const COOKIE_BAD_AMPLITUDE_V3: i16 = 0x6A56;

/// Header variant, identified by the cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    /// Transform-coded frame.
    NormalV2,
    /// Transform-coded frame with a gain exponent.
    NormalV3,
    /// Raw copy of a frame holding out-of-range samples.
    BadAmplitudeV2,
    /// Raw copy, with a gain exponent.
    BadAmplitudeV3,
}

impl HeaderKind {
    /// Pick the variant for a frame.
    pub fn select(bad_amplitude: bool, with_gain: bool) -> Self {
        match (bad_amplitude, with_gain) {
            (false, false) => Self::NormalV2,
            (false, true) => Self::NormalV3,
            (true, false) => Self::BadAmplitudeV2,
            (true, true) => Self::BadAmplitudeV3,
        }
    }

    /// The int16 cookie.
    pub fn cookie(self) -> i16 {
        match self {
            Self::NormalV2 => COOKIE_NORMAL_V2,
            Self::NormalV3 => COOKIE_NORMAL_V3,
            Self::BadAmplitudeV2 => COOKIE_BAD_AMPLITUDE_V2,
            Self::BadAmplitudeV3 => COOKIE_BAD_AMPLITUDE_V3,
        }
    }

    /// Map a cookie back to its variant.
    pub fn from_cookie(cookie: i16) -> Option<Self> {
        match cookie {
            COOKIE_NORMAL_V2 => Some(Self::NormalV2),
            COOKIE_NORMAL_V3 => Some(Self::NormalV3),
            COOKIE_BAD_AMPLITUDE_V2 => Some(Self::BadAmplitudeV2),
            COOKIE_BAD_AMPLITUDE_V3 => Some(Self::BadAmplitudeV3),
            _ => None,
        }
    }

    /// Whether the gain exponent field is present.
    pub fn has_gain(self) -> bool {
        matches!(self, Self::NormalV3 | Self::BadAmplitudeV3)
    }

    /// Whether the frame was stored raw.
    pub fn is_bad_amplitude(self) -> bool {
        matches!(self, Self::BadAmplitudeV2 | Self::BadAmplitudeV3)
    }

    /// Encoded header length.
    pub fn header_len(self) -> usize {
        if self.has_gain() {
            HEADER_LEN_V3
        } else {
            HEADER_LEN_V2
        }
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::NormalV2 => "normal-v2",
            Self::NormalV3 => "normal-v3",
            Self::BadAmplitudeV2 => "bad-amplitude-v2",
            Self::BadAmplitudeV3 => "bad-amplitude-v3",
        }
    }
}

impl std::fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Read only the cookie of a compressed buffer.
pub fn cookie_kind(input: &[u8], order: ByteOrder) -> Result<HeaderKind> {
    let cookie: i16 = read_at(input, 0, order)
        .map_err(|_| OxiSeisError::corrupted(0, "buffer shorter than a cookie"))?;
    HeaderKind::from_cookie(cookie).ok_or_else(|| OxiSeisError::invalid_cookie(cookie as i32))
}

/// Decoded SeisPEG header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeisPegHeader {
    /// Variant.
    pub kind: HeaderKind,
    /// Distortion the frame was compressed with.
    pub distortion: f32,
    /// Samples per trace.
    pub n1: usize,
    /// Maximum traces per frame.
    pub n2: usize,
    /// Block size along the time axis.
    pub vertical_block_size: usize,
    /// Block size along the trace axis.
    pub horizontal_block_size: usize,
    /// Transform length along the time axis.
    pub vertical_trans_length: usize,
    /// Transform length along the trace axis.
    pub horizontal_trans_length: usize,
    /// Bytes used by the trace payload, header included.
    pub n_bytes_traces: usize,
    /// Bytes used by the compressed trace headers that follow, or 0.
    pub n_bytes_hdrs: usize,
    /// Exponent of the `t^e` gain, 0 when absent.
    pub ft_gain_exponent: f32,
}

fn to_i32(name: &'static str, value: usize) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| OxiSeisError::invalid_parameter(name, format!("{value} does not fit in int32")))
}

fn to_i16(name: &'static str, value: usize) -> Result<i16> {
    i16::try_from(value)
        .map_err(|_| OxiSeisError::invalid_parameter(name, format!("{value} does not fit in int16")))
}

fn to_i8(name: &'static str, value: usize) -> Result<i8> {
    i8::try_from(value)
        .map_err(|_| OxiSeisError::invalid_parameter(name, format!("{value} does not fit in int8")))
}

fn non_negative(field: usize, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| OxiSeisError::corrupted(field, format!("negative header field {value}")))
}

impl SeisPegHeader {
    /// Encoded length of this header.
    pub fn encoded_len(&self) -> usize {
        self.kind.header_len()
    }

    /// Write the header at the start of `out`.
    pub fn encode(&self, out: &mut [u8], order: ByteOrder) -> Result<usize> {
        let len = self.encoded_len();
        if out.len() < len {
            return Err(OxiSeisError::buffer_too_small(len, out.len()));
        }
        let n1 = to_i32("n1", self.n1)?;
        let n2 = to_i32("n2", self.n2)?;
        let vb = to_i16("vertical_block_size", self.vertical_block_size)?;
        let hb = to_i16("horizontal_block_size", self.horizontal_block_size)?;
        let vt = to_i8("vertical_trans_length", self.vertical_trans_length)?;
        let ht = to_i8("horizontal_trans_length", self.horizontal_trans_length)?;
        let traces = to_i32("n_bytes_traces", self.n_bytes_traces)?;
        let hdrs = to_i32("n_bytes_hdrs", self.n_bytes_hdrs)?;

        write_at(out, 0, self.kind.cookie(), order)?;
        write_at(out, 2, self.distortion, order)?;
        write_at(out, 6, n1, order)?;
        write_at(out, 10, n2, order)?;
        write_at(out, 14, vb, order)?;
        write_at(out, 16, hb, order)?;
        write_at(out, 18, vt, order)?;
        write_at(out, 19, ht, order)?;
        write_at(out, 20, traces, order)?;
        write_at(out, 24, hdrs, order)?;
        if self.kind.has_gain() {
            write_at(out, 28, self.ft_gain_exponent, order)?;
        }
        Ok(len)
    }

    /// Parse the header at the start of `input`.
    pub fn decode(input: &[u8], order: ByteOrder) -> Result<Self> {
        let kind = cookie_kind(input, order)?;
        if input.len() < kind.header_len() {
            return Err(OxiSeisError::corrupted(
                0,
                format!(
                    "{kind} header needs {} bytes, buffer has {}",
                    kind.header_len(),
                    input.len()
                ),
            ));
        }

        let int = |offset: usize| -> Result<usize> {
            non_negative(offset, read_at::<i32>(input, offset, order)? as i64)
        };
        let short = |offset: usize| -> Result<usize> {
            non_negative(offset, read_at::<i16>(input, offset, order)? as i64)
        };
        let byte = |offset: usize| -> Result<usize> {
            non_negative(offset, read_at::<i8>(input, offset, order)? as i64)
        };

        Ok(Self {
            kind,
            distortion: read_at(input, 2, order)?,
            n1: int(6)?,
            n2: int(10)?,
            vertical_block_size: short(14)?,
            horizontal_block_size: short(16)?,
            vertical_trans_length: byte(18)?,
            horizontal_trans_length: byte(19)?,
            n_bytes_traces: int(20)?,
            n_bytes_hdrs: int(24)?,
            ft_gain_exponent: if kind.has_gain() {
                read_at(input, 28, order)?
            } else {
                0.0
            },
        })
    }
}
