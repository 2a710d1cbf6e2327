//! Grow-only scratch buffers.
//!
//! Codec instances are reused across many frames. Their work arrays grow on
//! demand, at least doubling each time, and are never shrunk, so a run of
//! calls with slowly increasing sizes reallocates only a handful of times.

/// An owned scratch array that only ever grows.
#[derive(Debug, Clone, Default)]
pub struct GrowBuffer<T> {
    data: Vec<T>,
}

impl<T: Copy + Default> GrowBuffer<T> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a buffer holding `len` default elements.
    pub fn with_len(len: usize) -> Self {
        Self {
            data: vec![T::default(); len],
        }
    }

    /// Make sure at least `len` elements exist and return the first `len`.
    ///
    /// Existing contents are kept. New elements are `T::default()`.
    pub fn ensure(&mut self, len: usize) -> &mut [T] {
        if len > self.data.len() {
            let target = len.max(self.data.len().saturating_mul(2));
            self.data.resize(target, T::default());
        }
        &mut self.data[..len]
    }

    /// Like [`ensure`](Self::ensure) but zero-fills the returned prefix.
    pub fn ensure_cleared(&mut self, len: usize) -> &mut [T] {
        let slice = self.ensure(len);
        slice.fill(T::default());
        slice
    }

    /// Number of elements currently allocated.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// All allocated elements.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// All allocated elements, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grows_geometrically() {
        let mut buf = GrowBuffer::<u8>::with_len(10);
        buf.ensure(11);
        assert_eq!(buf.capacity(), 20);
        buf.ensure(100);
        assert_eq!(buf.capacity(), 100);
    }

    #[test]
    fn test_never_shrinks() {
        let mut buf = GrowBuffer::<f32>::new();
        assert_eq!(buf.ensure(64).len(), 64);
        assert_eq!(buf.ensure(8).len(), 8);
        assert_eq!(buf.capacity(), 64);
    }

    #[test]
    fn test_contents_survive_growth() {
        let mut buf = GrowBuffer::<i32>::new();
        buf.ensure(3).copy_from_slice(&[1, 2, 3]);
        let grown = buf.ensure(7);
        assert_eq!(&grown[..4], &[1, 2, 3, 0]);
    }

    #[test]
    fn test_ensure_cleared() {
        let mut buf = GrowBuffer::<i32>::new();
        buf.ensure(4).fill(9);
        assert!(buf.ensure_cleared(4).iter().all(|&v| v == 0));
    }
}
