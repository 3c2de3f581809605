// src/processing/pipeline.rs
//! Per-tick EMG linear envelope pipeline
//!
//! Composes the comb filter and the envelope accumulator into the state
//! transition run on every timer tick. Everything here is integer-only and
//! constant-time so it can run from interrupt context.

use crate::config::constants::envelope::{DEFAULT_COMB_TAPS, DEFAULT_WINDOW_SHIFT};
use crate::config::constants::signal::ADC_MIDPOINT;
use crate::processing::comb_filter::CombFilter;
use crate::processing::envelope::{EnvelopeAccumulator, EnvelopeLevel};
use serde::{Deserialize, Serialize};

/// Pipeline in the reference configuration: 20 taps, 128-sample window
pub type EmgLePipeline = EnvelopePipeline<DEFAULT_COMB_TAPS, DEFAULT_WINDOW_SHIFT>;

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutput {
    /// Byte to emit this tick (current level, narrowed)
    pub byte: u8,
    /// Set only on the tick that completes a window
    pub published: Option<EnvelopeLevel>,
    /// Comb filter output for this tick
    pub filter_output: i32,
}

impl TickOutput {
    pub fn is_window_boundary(&self) -> bool {
        self.published.is_some()
    }
}

/// Consistent copy of the pipeline state for readers outside the tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub ticks: u64,
    pub windows_completed: u64,
    pub previous_sample: u16,
    pub running_sum: i32,
    pub accumulator: u32,
    pub window_count: u32,
    pub level: EnvelopeLevel,
}

/// Complete pipeline state, owned exclusively by the tick routine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopePipeline<const TAPS: usize, const SHIFT: u32> {
    comb: CombFilter<TAPS>,
    envelope: EnvelopeAccumulator<SHIFT>,
    ticks: u64,
    windows_completed: u64,
}

impl<const TAPS: usize, const SHIFT: u32> EnvelopePipeline<TAPS, SHIFT> {
    /// Zeroed buffers, previous sample at the 10-bit ADC midpoint
    pub fn new() -> Self {
        Self::with_midpoint(ADC_MIDPOINT)
    }

    /// Zeroed buffers with a custom neutral sample, for other ADC widths
    pub fn with_midpoint(midpoint: u16) -> Self {
        Self {
            comb: CombFilter::with_previous(midpoint),
            envelope: EnvelopeAccumulator::new(),
            ticks: 0,
            windows_completed: 0,
        }
    }

    /// Run one raw sample through comb filter and envelope accumulator
    #[inline]
    pub fn process_sample(&mut self, raw: u16) -> TickOutput {
        let filter_output = self.comb.process(raw);
        let published = self.envelope.accumulate(filter_output);

        self.ticks = self.ticks.wrapping_add(1);
        if published.is_some() {
            self.windows_completed = self.windows_completed.wrapping_add(1);
        }

        TickOutput {
            byte: self.envelope.level().to_byte(),
            published,
            filter_output,
        }
    }

    /// Feed a block of samples, returning the levels published along the way
    pub fn process_block(&mut self, samples: &[u16]) -> Vec<EnvelopeLevel> {
        samples
            .iter()
            .filter_map(|&raw| self.process_sample(raw).published)
            .collect()
    }

    /// Current externally visible level
    #[inline]
    pub fn level(&self) -> EnvelopeLevel {
        self.envelope.level()
    }

    pub fn comb(&self) -> &CombFilter<TAPS> {
        &self.comb
    }

    pub fn envelope(&self) -> &EnvelopeAccumulator<SHIFT> {
        &self.envelope
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn windows_completed(&self) -> u64 {
        self.windows_completed
    }

    pub fn tap_count(&self) -> usize {
        TAPS
    }

    pub fn window_len(&self) -> u32 {
        EnvelopeAccumulator::<SHIFT>::WINDOW_LEN
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            ticks: self.ticks,
            windows_completed: self.windows_completed,
            previous_sample: self.comb.previous_sample(),
            running_sum: self.comb.running_sum(),
            accumulator: self.envelope.accumulator(),
            window_count: self.envelope.count(),
            level: self.envelope.level(),
        }
    }

    /// Back to the start-of-process state
    pub fn reset(&mut self, midpoint: u16) {
        self.comb.reset(midpoint);
        self.envelope.reset();
        self.ticks = 0;
        self.windows_completed = 0;
    }
}

impl<const TAPS: usize, const SHIFT: u32> Default for EnvelopePipeline<TAPS, SHIFT> {
    fn default() -> Self {
        Self::new()
    }
}
