// src/processing/envelope.rs
//! Rectify-and-integrate envelope over a power-of-two window

use serde::{Deserialize, Serialize};

/// Envelope level published at a window boundary.
///
/// Stored at full width; `to_byte` narrows for the byte-oriented output
/// channel without clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnvelopeLevel(pub u16);

impl EnvelopeLevel {
    pub const ZERO: Self = Self(0);

    pub fn value(self) -> u16 {
        self.0
    }

    /// Low byte of the level, as written to the serial channel
    #[inline]
    pub fn to_byte(self) -> u8 {
        self.0 as u8
    }

    /// Whether `to_byte` is lossless for this level
    pub fn fits_byte(self) -> bool {
        self.0 <= u16::from(u8::MAX)
    }
}

impl From<EnvelopeLevel> for u16 {
    fn from(level: EnvelopeLevel) -> Self {
        level.0
    }
}

/// Envelope state: accumulator, window counter and last published level.
///
/// The window length is `1 << SHIFT`, so the power-of-two requirement holds
/// for every instantiation and the divide is an exact right shift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeAccumulator<const SHIFT: u32> {
    accumulator: u32,
    count: u32,
    level: EnvelopeLevel,
}

impl<const SHIFT: u32> EnvelopeAccumulator<SHIFT> {
    /// Number of samples integrated per published level
    pub const WINDOW_LEN: u32 = {
        assert!(
            SHIFT <= crate::config::constants::envelope::MAX_WINDOW_SHIFT,
            "window too long for a u32 accumulator"
        );
        1 << SHIFT
    };

    pub fn new() -> Self {
        let _ = Self::WINDOW_LEN;
        Self {
            accumulator: 0,
            count: 0,
            level: EnvelopeLevel::ZERO,
        }
    }

    /// Add `|filter_output|` to the window.
    ///
    /// Returns the freshly published level when this sample completes a
    /// window; accumulator and counter are zero again on return in that case.
    #[inline]
    pub fn accumulate(&mut self, filter_output: i32) -> Option<EnvelopeLevel> {
        self.accumulator += filter_output.unsigned_abs();
        self.count += 1;

        if self.count < Self::WINDOW_LEN {
            return None;
        }

        self.level = EnvelopeLevel((self.accumulator >> SHIFT) as u16);
        self.accumulator = 0;
        self.count = 0;
        Some(self.level)
    }

    /// Level published at the most recent window boundary
    #[inline]
    pub fn level(&self) -> EnvelopeLevel {
        self.level
    }

    pub fn accumulator(&self) -> u32 {
        self.accumulator
    }

    /// Samples accumulated in the current window
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn window_len(&self) -> u32 {
        Self::WINDOW_LEN
    }

    pub fn reset(&mut self) {
        self.accumulator = 0;
        self.count = 0;
        self.level = EnvelopeLevel::ZERO;
    }
}

impl<const SHIFT: u32> Default for EnvelopeAccumulator<SHIFT> {
    fn default() -> Self {
        Self::new()
    }
}

/// Divide a non-negative accumulator by `1 << shift`
#[inline]
pub fn scale_window(accumulator: u32, shift: u32) -> u32 {
    accumulator >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_len_from_shift() {
        assert_eq!(EnvelopeAccumulator::<7>::WINDOW_LEN, 128);
        assert_eq!(EnvelopeAccumulator::<0>::WINDOW_LEN, 1);
        assert_eq!(EnvelopeAccumulator::<2>::new().window_len(), 4);
    }

    #[test]
    fn test_level_held_between_boundaries() {
        let mut env = EnvelopeAccumulator::<2>::new();
        assert_eq!(env.accumulate(8), None);
        assert_eq!(env.accumulate(-8), None);
        assert_eq!(env.accumulate(8), None);
        assert_eq!(env.level(), EnvelopeLevel::ZERO);

        assert_eq!(env.accumulate(-8), Some(EnvelopeLevel(8)));
        assert_eq!(env.accumulator(), 0);
        assert_eq!(env.count(), 0);

        // Next window in progress, published level unchanged
        env.accumulate(100);
        assert_eq!(env.level(), EnvelopeLevel(8));
        assert_eq!(env.accumulator(), 100);
    }

    #[test]
    fn test_rectification() {
        let mut env = EnvelopeAccumulator::<1>::new();
        env.accumulate(-5);
        assert_eq!(env.accumulator(), 5);
        assert_eq!(env.accumulate(-7), Some(EnvelopeLevel(6)));
    }

    #[test]
    fn test_truncating_division() {
        let mut env = EnvelopeAccumulator::<2>::new();
        for v in [1, 1, 1, 0] {
            env.accumulate(v);
        }
        // 3 / 4 truncates to zero
        assert_eq!(env.level(), EnvelopeLevel(0));
    }

    #[test]
    fn test_byte_narrowing() {
        assert_eq!(EnvelopeLevel(200).to_byte(), 200);
        assert!(EnvelopeLevel(255).fits_byte());
        assert!(!EnvelopeLevel(300).fits_byte());
        assert_eq!(EnvelopeLevel(300).to_byte(), 44);
    }

    #[test]
    fn test_scale_window_matches_division() {
        for acc in [0u32, 1, 127, 128, 129, 65_535, u32::MAX] {
            assert_eq!(scale_window(acc, 7), acc / 128);
        }
    }

    #[test]
    fn test_full_scale_window_does_not_overflow() {
        let mut env = EnvelopeAccumulator::<15>::new();
        let mut published = None;
        for _ in 0..EnvelopeAccumulator::<15>::WINDOW_LEN {
            published = env.accumulate(i32::from(u16::MAX));
        }
        assert_eq!(published, Some(EnvelopeLevel(u16::MAX)));
    }
}
