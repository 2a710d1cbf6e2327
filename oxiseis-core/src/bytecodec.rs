//! Typed views over raw byte buffers.
//!
//! JavaSeis files carry an explicit byte order that is independent of the
//! host. [`TypedBuffer`] interprets a byte region as a sequence of `i16`,
//! `i32`, `i64`, `f32` or `f64` values with a cursor for relative access and
//! bounds-checked absolute access, swapping bytes whenever the configured
//! order differs from the native one.
//!
//! # Example
//!
//! ```
//! use oxiseis_core::bytecodec::{ByteOrder, TypedBuffer};
//!
//! let mut bytes = vec![0u8; 8];
//! let mut ints = TypedBuffer::<_, i32>::new(&mut bytes[..], ByteOrder::BigEndian);
//! ints.put(1).unwrap();
//! ints.put(-2).unwrap();
//! assert_eq!(ints.get_at(1).unwrap(), -2);
//! assert_eq!(bytes[..4], [0, 0, 0, 1]);
//! ```

use crate::error::{OxiSeisError, Result};
use std::marker::PhantomData;

/// Byte order of multi-byte fields in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Most significant byte first (JavaSeis default).
    #[default]
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

impl ByteOrder {
    /// The byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::BigEndian
        } else {
            Self::LittleEndian
        }
    }

    /// Whether values in this order must be swapped to reach native order.
    #[inline]
    pub fn needs_swap(self) -> bool {
        Self::native() != self
    }

    /// Short lowercase name, as used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::BigEndian => "big",
            Self::LittleEndian => "little",
        }
    }
}

/// A fixed-size value that can be stored in a byte buffer.
pub trait Element: Copy + Default + PartialEq + std::fmt::Debug {
    /// Size of one element in bytes.
    const SIZE: usize;

    /// Decode one element from the first `SIZE` bytes of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than `SIZE`.
    fn read(bytes: &[u8], order: ByteOrder) -> Self;

    /// Encode this element into the first `SIZE` bytes of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than `SIZE`.
    fn write(self, bytes: &mut [u8], order: ByteOrder);
}

macro_rules! impl_int_element {
    ($($t:ty),* $(,)?) => {$(
        impl Element for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            #[inline]
            fn read(bytes: &[u8], order: ByteOrder) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(&bytes[..Self::SIZE]);
                let value = <$t>::from_ne_bytes(raw);
                if order.needs_swap() { value.swap_bytes() } else { value }
            }

            #[inline]
            fn write(self, bytes: &mut [u8], order: ByteOrder) {
                let value = if order.needs_swap() { self.swap_bytes() } else { self };
                bytes[..Self::SIZE].copy_from_slice(&value.to_ne_bytes());
            }
        }
    )*};
}

impl_int_element!(i8, u8, i16, u16, i32, u32, i64, u64);

macro_rules! impl_float_element {
    ($($t:ty => $bits:ty),* $(,)?) => {$(
        impl Element for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            #[inline]
            fn read(bytes: &[u8], order: ByteOrder) -> Self {
                <$t>::from_bits(<$bits as Element>::read(bytes, order))
            }

            #[inline]
            fn write(self, bytes: &mut [u8], order: ByteOrder) {
                self.to_bits().write(bytes, order)
            }
        }
    )*};
}

impl_float_element!(f32 => u32, f64 => u64);

/// Read one element at a byte offset, failing if it would run off the end.
pub fn read_at<T: Element>(bytes: &[u8], offset: usize, order: ByteOrder) -> Result<T> {
    match offset.checked_add(T::SIZE) {
        Some(end) if end <= bytes.len() => Ok(T::read(&bytes[offset..end], order)),
        _ => Err(OxiSeisError::buffer_too_small(
            offset.saturating_add(T::SIZE),
            bytes.len(),
        )),
    }
}

/// Write one element at a byte offset, failing if it would run off the end.
pub fn write_at<T: Element>(
    bytes: &mut [u8],
    offset: usize,
    value: T,
    order: ByteOrder,
) -> Result<()> {
    match offset.checked_add(T::SIZE) {
        Some(end) if end <= bytes.len() => {
            value.write(&mut bytes[offset..end], order);
            Ok(())
        }
        _ => Err(OxiSeisError::buffer_too_small(
            offset.saturating_add(T::SIZE),
            bytes.len(),
        )),
    }
}

/// A typed, cursor-based view over a byte buffer.
///
/// Reads are available for any `B: AsRef<[u8]>`; writes additionally need
/// `B: AsMut<[u8]>`. Trailing bytes that do not form a whole element are
/// ignored.
#[derive(Debug)]
pub struct TypedBuffer<B, T> {
    buf: B,
    order: ByteOrder,
    pos: usize,
    _marker: PhantomData<T>,
}

impl<B: AsRef<[u8]>, T: Element> TypedBuffer<B, T> {
    /// Create a view over `buf` with the cursor at element 0.
    pub fn new(buf: B, order: ByteOrder) -> Self {
        Self {
            buf,
            order,
            pos: 0,
            _marker: PhantomData,
        }
    }

    /// Number of whole elements in the view.
    pub fn size(&self) -> usize {
        self.buf.as_ref().len() / T::SIZE
    }

    /// Current cursor position, in elements.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor. `position == size()` is allowed (end of buffer).
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.size() {
            return Err(OxiSeisError::out_of_range(position, self.size()));
        }
        self.pos = position;
        Ok(())
    }

    /// Elements left between the cursor and the end.
    pub fn remaining(&self) -> usize {
        self.size() - self.pos
    }

    /// Byte order of the view.
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_ref()
    }

    /// Consume the view and return the underlying buffer.
    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Read the element at `index`.
    pub fn get_at(&self, index: usize) -> Result<T> {
        if index >= self.size() {
            return Err(OxiSeisError::out_of_range(index, self.size()));
        }
        let start = index * T::SIZE;
        Ok(T::read(&self.buf.as_ref()[start..start + T::SIZE], self.order))
    }

    /// Read the element under the cursor and advance.
    pub fn get(&mut self) -> Result<T> {
        let value = self.get_at(self.pos)?;
        self.pos += 1;
        Ok(value)
    }

    /// Fill `dst` from the cursor onwards and advance by `dst.len()`.
    pub fn get_slice(&mut self, dst: &mut [T]) -> Result<()> {
        if dst.len() > self.remaining() {
            return Err(OxiSeisError::out_of_range(self.pos + dst.len(), self.size()));
        }
        let bytes = self.buf.as_ref();
        for (i, slot) in dst.iter_mut().enumerate() {
            let start = (self.pos + i) * T::SIZE;
            *slot = T::read(&bytes[start..start + T::SIZE], self.order);
        }
        self.pos += dst.len();
        Ok(())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>, T: Element> TypedBuffer<B, T> {
    /// Write `value` at `index`.
    pub fn put_at(&mut self, index: usize, value: T) -> Result<()> {
        if index >= self.size() {
            return Err(OxiSeisError::out_of_range(index, self.size()));
        }
        let start = index * T::SIZE;
        let order = self.order;
        value.write(&mut self.buf.as_mut()[start..start + T::SIZE], order);
        Ok(())
    }

    /// Write `value` under the cursor and advance.
    pub fn put(&mut self, value: T) -> Result<()> {
        self.put_at(self.pos, value)?;
        self.pos += 1;
        Ok(())
    }

    /// Copy all of `src` from the cursor onwards and advance by `src.len()`.
    pub fn put_slice(&mut self, src: &[T]) -> Result<()> {
        if src.len() > self.remaining() {
            return Err(OxiSeisError::out_of_range(self.pos + src.len(), self.size()));
        }
        let order = self.order;
        let pos = self.pos;
        let bytes = self.buf.as_mut();
        for (i, &value) in src.iter().enumerate() {
            let start = (pos + i) * T::SIZE;
            value.write(&mut bytes[start..start + T::SIZE], order);
        }
        self.pos += src.len();
        Ok(())
    }
}

/// A sequence of `i32` with positional reads.
///
/// Lets the header compressor run unchanged over plain slices and over
/// byte buffers holding big- or little-endian ints.
pub trait IntSequence {
    /// Number of ints in the sequence.
    fn int_len(&self) -> usize;

    /// Read the int at `index`.
    fn get_int(&self, index: usize) -> Result<i32>;
}

/// An [`IntSequence`] that also supports positional writes.
pub trait IntSequenceMut: IntSequence {
    /// Write `value` at `index`.
    fn put_int(&mut self, index: usize, value: i32) -> Result<()>;
}

impl IntSequence for [i32] {
    fn int_len(&self) -> usize {
        self.len()
    }

    fn get_int(&self, index: usize) -> Result<i32> {
        self.get(index)
            .copied()
            .ok_or_else(|| OxiSeisError::out_of_range(index, self.len()))
    }
}

impl IntSequenceMut for [i32] {
    fn put_int(&mut self, index: usize, value: i32) -> Result<()> {
        let size = self.len();
        let slot = self
            .get_mut(index)
            .ok_or_else(|| OxiSeisError::out_of_range(index, size))?;
        *slot = value;
        Ok(())
    }
}

impl<B: AsRef<[u8]>> IntSequence for TypedBuffer<B, i32> {
    fn int_len(&self) -> usize {
        self.size()
    }

    fn get_int(&self, index: usize) -> Result<i32> {
        self.get_at(index)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> IntSequenceMut for TypedBuffer<B, i32> {
    fn put_int(&mut self, index: usize, value: i32) -> Result<()> {
        self.put_at(index, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_layout() {
        let mut bytes = [0u8; 6];
        let mut view = TypedBuffer::<_, i16>::new(&mut bytes[..], ByteOrder::BigEndian);
        view.put(0x0102).unwrap();
        view.put(-1).unwrap();
        view.put(0x7F00).unwrap();
        assert_eq!(bytes, [0x01, 0x02, 0xFF, 0xFF, 0x7F, 0x00]);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut bytes = [0u8; 4];
        write_at(&mut bytes, 0, 0x0A0B0C0Di32, ByteOrder::LittleEndian).unwrap();
        assert_eq!(bytes, [0x0D, 0x0C, 0x0B, 0x0A]);
        let back: i32 = read_at(&bytes, 0, ByteOrder::LittleEndian).unwrap();
        assert_eq!(back, 0x0A0B0C0D);
    }

    #[test]
    fn test_float_and_double() {
        let mut bytes = vec![0u8; 12];
        write_at(&mut bytes, 0, 1.5f32, ByteOrder::BigEndian).unwrap();
        write_at(&mut bytes, 4, -2.25f64, ByteOrder::BigEndian).unwrap();
        assert_eq!(&bytes[..4], &1.5f32.to_be_bytes());
        assert_eq!(read_at::<f64>(&bytes, 4, ByteOrder::BigEndian).unwrap(), -2.25);
    }

    #[test]
    fn test_absolute_access_bounds() {
        let bytes = [0u8; 10];
        let view = TypedBuffer::<_, i32>::new(&bytes[..], ByteOrder::BigEndian);
        assert_eq!(view.size(), 2);
        assert!(view.get_at(1).is_ok());
        assert!(matches!(
            view.get_at(2),
            Err(OxiSeisError::IndexOutOfRange { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_bulk_access_does_not_overrun() {
        let mut bytes = [0u8; 16];
        let mut view = TypedBuffer::<_, i64>::new(&mut bytes[..], ByteOrder::LittleEndian);
        view.put_slice(&[7, -9]).unwrap();
        assert!(view.put_slice(&[1]).is_err());

        view.set_position(0).unwrap();
        let mut dst = [0i64; 3];
        assert!(view.get_slice(&mut dst).is_err());
        assert_eq!(view.position(), 0);

        let mut dst = [0i64; 2];
        view.get_slice(&mut dst).unwrap();
        assert_eq!(dst, [7, -9]);
        assert_eq!(view.remaining(), 0);
    }

    #[test]
    fn test_int_sequence_over_bytes() {
        let mut bytes = vec![0u8; 12];
        let mut view = TypedBuffer::<_, i32>::new(&mut bytes[..], ByteOrder::LittleEndian);
        view.put_int(2, 42).unwrap();
        assert_eq!(view.int_len(), 3);
        assert_eq!(view.get_int(2).unwrap(), 42);
        assert!(view.put_int(3, 0).is_err());

        let plain = [1, 2, 3];
        assert_eq!(plain[..].get_int(1).unwrap(), 2);
        assert!(plain[..].get_int(3).is_err());
    }

    #[test]
    fn test_native_order_never_swaps() {
        assert!(!ByteOrder::native().needs_swap());
    }
}
