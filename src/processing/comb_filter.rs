// src/processing/comb_filter.rs
//! Feed-forward comb filter built from a moving sum of first differences
//!
//! Summing the last `TAPS` first differences telescopes to
//! `x[n] - x[n - TAPS]`, which places notches at every multiple of
//! `fs / TAPS`. With 20 taps at 1000 Hz (or 1200 Hz) the notches land on the
//! 50 Hz (or 60 Hz) powerline fundamental and its harmonics, and the DC term
//! is removed so baseline drift drops out as well.

use crate::acquisition::TapRing;
use crate::config::constants::signal::ADC_MIDPOINT;

/// Comb filter state: tap ring, running sum and previous raw sample.
///
/// `running_sum` always equals the sum of the ring contents. It is updated
/// incrementally on every call and never recomputed from the taps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombFilter<const TAPS: usize> {
    taps: TapRing<i32, TAPS>,
    running_sum: i32,
    previous_sample: u16,
}

impl<const TAPS: usize> CombFilter<TAPS> {
    /// Filter seeded with the reference ADC midpoint
    pub fn new() -> Self {
        Self::with_previous(ADC_MIDPOINT)
    }

    /// Filter seeded with an explicit previous sample
    pub fn with_previous(previous_sample: u16) -> Self {
        Self {
            taps: TapRing::new(),
            running_sum: 0,
            previous_sample,
        }
    }

    /// Push one raw sample and return the updated running sum.
    ///
    /// Constant time: one subtraction for the evicted tap, one addition for
    /// the new one.
    #[inline]
    pub fn process(&mut self, sample: u16) -> i32 {
        let diff = i32::from(sample) - i32::from(self.previous_sample);
        let evicted = self.taps.replace(diff);
        self.running_sum = self.running_sum - evicted + diff;
        self.previous_sample = sample;
        self.running_sum
    }

    /// Current filter output
    #[inline]
    pub fn running_sum(&self) -> i32 {
        self.running_sum
    }

    pub fn previous_sample(&self) -> u16 {
        self.previous_sample
    }

    /// Tap delay line, exposed for inspection
    pub fn taps(&self) -> &TapRing<i32, TAPS> {
        &self.taps
    }

    pub fn tap_count(&self) -> usize {
        TAPS
    }

    /// Sum the taps from scratch; only used to check the running sum
    pub fn recompute_sum(&self) -> i32 {
        self.taps.as_slice().iter().sum()
    }

    /// Return to the freshly constructed state with the given seed
    pub fn reset(&mut self, previous_sample: u16) {
        self.taps.reset();
        self.running_sum = 0;
        self.previous_sample = previous_sample;
    }
}

impl<const TAPS: usize> Default for CombFilter<TAPS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_output_is_offset_from_midpoint() {
        let mut filter = CombFilter::<20>::new();
        assert_eq!(filter.process(600), 88);
        assert_eq!(filter.previous_sample(), 600);
    }

    #[test]
    fn test_output_telescopes_to_span_difference() {
        let mut filter = CombFilter::<4>::with_previous(0);
        let input = [10u16, 30, 25, 40, 100, 90, 95];
        let mut history = vec![0u16];
        for &x in &input {
            let out = filter.process(x);
            history.push(x);
            let n = history.len() - 1;
            let lagged = if n >= 4 { history[n - 4] } else { 0 };
            assert_eq!(out, i32::from(x) - i32::from(lagged));
        }
    }

    #[test]
    fn test_running_sum_matches_recompute() {
        let mut filter = CombFilter::<5>::new();
        for x in [512u16, 700, 300, 1023, 0, 0, 512, 800, 799] {
            filter.process(x);
            assert_eq!(filter.running_sum(), filter.recompute_sum());
        }
    }

    #[test]
    fn test_constant_input_settles_to_zero() {
        let mut filter = CombFilter::<20>::new();
        filter.process(900);
        for _ in 0..20 {
            filter.process(900);
        }
        assert_eq!(filter.running_sum(), 0);
        assert!(filter.taps().as_slice().iter().all(|&t| t == 0));
    }

    #[test]
    fn test_extreme_swings_stay_bounded() {
        let mut filter = CombFilter::<20>::new();
        for i in 0..1000 {
            let x = if i % 2 == 0 { 0 } else { u16::MAX };
            let out = filter.process(x);
            assert!(out.abs() <= i32::from(u16::MAX));
        }
    }

    #[test]
    fn test_reset() {
        let mut filter = CombFilter::<3>::new();
        filter.process(100);
        filter.reset(0);
        assert_eq!(filter.running_sum(), 0);
        assert_eq!(filter.previous_sample(), 0);
        assert_eq!(filter.taps().cursor(), 0);
    }
}
