//! SeisPEG configuration and block-size policies.

use crate::header::SeisPegHeader;
use crate::transform::check_lengths;
use oxiseis_core::bytecodec::ByteOrder;
use oxiseis_core::error::{OxiSeisError, Result};

/// Largest block size a policy will pick.
pub const MAX_POLICY_BLOCK: usize = 512;

/// Largest block size the `Fastest` policy will pick.
pub const MAX_FAST_BLOCK: usize = 64;

/// How block and transform sizes are chosen from the frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Policy {
    /// Short blocks and 8-sample transforms.
    Fastest,
    /// Blocks close to the frame size, 16-sample transforms where possible.
    #[default]
    MaxCompression,
}

impl Policy {
    /// Block size for an axis of `n` samples.
    pub fn block_size(self, n: usize) -> usize {
        if n <= 8 {
            return 8;
        }
        let cap = match self {
            Self::Fastest => MAX_FAST_BLOCK,
            Self::MaxCompression => MAX_POLICY_BLOCK,
        };
        n.div_ceil(16).saturating_mul(16).clamp(16, cap)
    }

    /// Transform length for a block of `block_size` samples.
    pub fn trans_length(self, block_size: usize) -> usize {
        match self {
            Self::Fastest => 8,
            Self::MaxCompression if block_size % 16 == 0 => 16,
            Self::MaxCompression => 8,
        }
    }
}

/// Parameters of a SeisPEG codec instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeisPegConfig {
    /// Samples per trace.
    pub n1: usize,
    /// Maximum traces per frame.
    pub n2: usize,
    /// Quantization step relative to the block RMS.
    pub distortion: f32,
    /// Block size along the time axis.
    pub vertical_block_size: usize,
    /// Block size along the trace axis.
    pub horizontal_block_size: usize,
    /// Transform length along the time axis.
    pub vertical_trans_length: usize,
    /// Transform length along the trace axis.
    pub horizontal_trans_length: usize,
    /// Exponent of the `t^e` gain applied before compression, 0 for none.
    pub ft_gain_exponent: f32,
    /// Byte order of every multi-byte field.
    pub byte_order: ByteOrder,
}

impl SeisPegConfig {
    /// Configuration with explicit block and transform sizes.
    pub fn new(
        n1: usize,
        n2: usize,
        distortion: f32,
        block_sizes: (usize, usize),
        trans_lengths: (usize, usize),
    ) -> Self {
        Self {
            n1,
            n2,
            distortion,
            vertical_block_size: block_sizes.0,
            horizontal_block_size: block_sizes.1,
            vertical_trans_length: trans_lengths.0,
            horizontal_trans_length: trans_lengths.1,
            ft_gain_exponent: 0.0,
            byte_order: ByteOrder::default(),
        }
    }

    /// Configuration whose sizes are picked by `policy`.
    pub fn with_policy(n1: usize, n2: usize, distortion: f32, policy: Policy) -> Self {
        let vb = policy.block_size(n1);
        let hb = policy.block_size(n2);
        Self::new(
            n1,
            n2,
            distortion,
            (vb, hb),
            (policy.trans_length(vb), policy.trans_length(hb)),
        )
    }

    /// Rebuild the configuration recorded in a header.
    pub fn from_header(header: &SeisPegHeader, order: ByteOrder) -> Self {
        Self {
            n1: header.n1,
            n2: header.n2,
            distortion: header.distortion,
            vertical_block_size: header.vertical_block_size,
            horizontal_block_size: header.horizontal_block_size,
            vertical_trans_length: header.vertical_trans_length,
            horizontal_trans_length: header.horizontal_trans_length,
            ft_gain_exponent: header.ft_gain_exponent,
            byte_order: order,
        }
    }

    /// Set the gain exponent.
    pub fn gain(mut self, exponent: f32) -> Self {
        self.ft_gain_exponent = exponent;
        self
    }

    /// Set the byte order.
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    /// Check every parameter.
    pub fn validate(&self) -> Result<()> {
        for (name, n) in [("n1", self.n1), ("n2", self.n2)] {
            if n == 0 || n > i32::MAX as usize {
                return Err(OxiSeisError::invalid_parameter(
                    name,
                    format!("must be in 1..=2^31-1, got {n}"),
                ));
            }
        }
        if !(self.distortion.is_finite() && self.distortion > 0.0) {
            return Err(OxiSeisError::invalid_parameter(
                "distortion",
                format!("must be positive and finite, got {}", self.distortion),
            ));
        }
        if !self.ft_gain_exponent.is_finite() {
            return Err(OxiSeisError::invalid_parameter(
                "ft_gain_exponent",
                "must be finite",
            ));
        }
        for (block, trans) in [
            (self.vertical_block_size, self.vertical_trans_length),
            (self.horizontal_block_size, self.horizontal_trans_length),
        ] {
            check_lengths(block, trans)?;
            if block > i16::MAX as usize {
                return Err(OxiSeisError::invalid_parameter(
                    "block_size",
                    format!("{block} does not fit in int16"),
                ));
            }
        }
        if self.padded_n1().checked_mul(self.padded_n2()).is_none() {
            return Err(OxiSeisError::invalid_parameter("n2", "padded frame too large"));
        }
        Ok(())
    }

    /// Samples per trace after padding to whole blocks.
    pub fn padded_n1(&self) -> usize {
        self.n1.div_ceil(self.vertical_block_size) * self.vertical_block_size
    }

    /// Traces after padding to whole blocks.
    pub fn padded_n2(&self) -> usize {
        self.n2.div_ceil(self.horizontal_block_size) * self.horizontal_block_size
    }

    /// Whether a gain is applied.
    pub fn has_gain(&self) -> bool {
        self.ft_gain_exponent != 0.0
    }
}
