//! MSB-first bit I/O over caller-owned byte slices.
//!
//! The SeisPEG entropy coder packs codes starting from the most significant
//! bit of each byte and writes straight into a region of the caller's output
//! buffer. Unlike a `Vec`-backed writer, [`MsbBitWriter`] therefore has a hard
//! capacity and refuses to write past it.

use crate::error::{OxiSeisError, Result};

/// MSB-first bit writer into a fixed region of a byte slice.
#[derive(Debug)]
pub struct MsbBitWriter<'a> {
    /// Destination region.
    output: &'a mut [u8],
    /// Next byte to fill.
    byte_pos: usize,
    /// Pending bits (right-aligned).
    buffer: u64,
    /// Number of pending bits.
    bits_in_buffer: u8,
}

impl<'a> MsbBitWriter<'a> {
    /// Create a writer over `output`.
    pub fn new(output: &'a mut [u8]) -> Self {
        Self {
            output,
            byte_pos: 0,
            buffer: 0,
            bits_in_buffer: 0,
        }
    }

    /// Write the low `count` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, count: u8) -> Result<()> {
        if count > 56 {
            // Split so the 64-bit accumulator never overflows.
            self.write_bits(value >> 32, count - 32)?;
            return self.write_bits(value & 0xFFFF_FFFF, 32);
        }
        if count == 0 {
            return Ok(());
        }

        let mask = (1u64 << count) - 1;
        self.buffer = (self.buffer << count) | (value & mask);
        self.bits_in_buffer += count;

        while self.bits_in_buffer >= 8 {
            let byte = (self.buffer >> (self.bits_in_buffer - 8)) as u8;
            self.push_byte(byte)?;
            self.bits_in_buffer -= 8;
        }
        self.buffer &= (1u64 << self.bits_in_buffer) - 1;

        Ok(())
    }

    fn push_byte(&mut self, byte: u8) -> Result<()> {
        let slot = self
            .output
            .get_mut(self.byte_pos)
            .ok_or_else(|| OxiSeisError::buffer_too_small(self.byte_pos + 1, self.byte_pos))?;
        *slot = byte;
        self.byte_pos += 1;
        Ok(())
    }

    /// Flush pending bits, zero-padding the last byte. Returns bytes written.
    pub fn finish(mut self) -> Result<usize> {
        if self.bits_in_buffer > 0 {
            let byte = (self.buffer << (8 - self.bits_in_buffer)) as u8;
            self.push_byte(byte)?;
            self.bits_in_buffer = 0;
        }
        Ok(self.byte_pos)
    }
}

/// MSB-first bit reader over a byte slice.
#[derive(Debug)]
pub struct MsbBitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> MsbBitReader<'a> {
    /// Create a reader over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Read one bit, or `None` once the input is exhausted.
    #[inline]
    pub fn read_bit(&mut self) -> Option<bool> {
        let byte = *self.data.get(self.bit_pos >> 3)?;
        let bit = (byte >> (7 - (self.bit_pos & 7))) & 1;
        self.bit_pos += 1;
        Some(bit == 1)
    }

    /// Total bits consumed.
    pub fn bits_read(&self) -> usize {
        self.bit_pos
    }

    /// Bytes touched so far, counting a partially consumed byte.
    pub fn bytes_consumed(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_roundtrip() {
        let mut out = [0u8; 4];
        let mut writer = MsbBitWriter::new(&mut out);
        writer.write_bits(0b101, 3).unwrap();
        writer.write_bits(0b1100, 4).unwrap();
        writer.write_bits(0b1111_1111, 8).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let mut reader = MsbBitReader::new(&out);
        let mut value = 0u32;
        for _ in 0..15 {
            value = (value << 1) | reader.read_bit().unwrap() as u32;
        }
        assert_eq!(value, 0b101_1100_1111_1111);
        assert_eq!(reader.bytes_consumed(), 2);
    }

    #[test]
    fn test_padding_is_zero() {
        let mut out = [0xFFu8; 1];
        let mut writer = MsbBitWriter::new(&mut out);
        writer.write_bits(1, 1).unwrap();
        writer.finish().unwrap();
        assert_eq!(out, [0x80]);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut out = [0u8; 1];
        let mut writer = MsbBitWriter::new(&mut out);
        writer.write_bits(0xAB, 8).unwrap();
        assert!(writer.write_bits(0xCD, 8).is_err());
    }

    #[test]
    fn test_long_codes() {
        let mut out = [0u8; 8];
        let mut writer = MsbBitWriter::new(&mut out);
        writer.write_bits(0x0123_4567_89AB_CDEF, 64).unwrap();
        writer.finish().unwrap();
        assert_eq!(out, 0x0123_4567_89AB_CDEFu64.to_be_bytes());
    }

    #[test]
    fn test_reader_exhaustion() {
        let data = [0b1000_0000u8];
        let mut reader = MsbBitReader::new(&data);
        assert_eq!(reader.read_bit(), Some(true));
        for _ in 0..7 {
            assert_eq!(reader.read_bit(), Some(false));
        }
        assert_eq!(reader.read_bit(), None);
    }
}
