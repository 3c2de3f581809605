// src/acquisition/ring_buffer.rs
//! Statically sized ring used as the comb filter's tap delay line

/// Fixed-capacity circular buffer with a single write cursor.
///
/// The ring is always full: every slot holds a value (initially
/// `T::default()`), and each write evicts the oldest slot. Capacity is a
/// const parameter so indexing never leaves the backing array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapRing<T, const N: usize> {
    slots: [T; N],
    cursor: usize,
}

impl<T: Copy + Default, const N: usize> TapRing<T, N> {
    const NON_EMPTY: () = assert!(N > 0, "TapRing capacity must be non-zero");

    /// Create a ring with every slot set to `T::default()`
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Self {
            slots: [T::default(); N],
            cursor: 0,
        }
    }

    /// Write `value` at the cursor, advance the cursor, and return the
    /// value that occupied the slot.
    #[inline]
    pub fn replace(&mut self, value: T) -> T {
        let evicted = core::mem::replace(&mut self.slots[self.cursor], value);
        self.cursor = (self.cursor + 1) % N;
        evicted
    }

    /// Slot the next `replace` will overwrite
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Value the next `replace` will evict
    #[inline]
    pub fn oldest(&self) -> T {
        self.slots[self.cursor]
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Raw slot storage in index order (not age order)
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    /// Iterate from oldest to newest
    pub fn iter_chronological(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots[self.cursor..]
            .iter()
            .chain(self.slots[..self.cursor].iter())
    }

    /// Zero every slot and rewind the cursor
    pub fn reset(&mut self) {
        self.slots = [T::default(); N];
        self.cursor = 0;
    }
}

impl<T: Copy + Default, const N: usize> Default for TapRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
