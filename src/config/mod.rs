// src/config/mod.rs
//! Deployment configuration for the envelope runtime
//!
//! The comb tap count and window length are compile-time parameters of the
//! pipeline type. What lives here is everything chosen at deployment: tick
//! interval, converter width, output routing and the simulated sensor.

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::hal::simulator::SimulatorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete runtime configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SystemConfig {
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Timer and converter settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SamplingSettings {
    #[serde(default = "defaults::tick_interval_us")]
    pub tick_interval_us: u32,

    /// Powerline frequency the comb notch must cover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powerline: Option<PowerlineRegion>,

    #[serde(default = "defaults::adc_resolution_bits")]
    pub adc_resolution_bits: u8,
}

/// Mains frequency of the deployment site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerlineRegion {
    #[serde(rename = "50hz")]
    Hz50,
    #[serde(rename = "60hz")]
    Hz60,
}

/// Output emitter routing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "defaults::target")]
    pub target: OutputTarget,

    /// Bytes buffered between tick context and the writer
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,

    /// Line rate of the physical serial link
    #[serde(default = "defaults::baud_rate")]
    pub baud_rate: u32,

    /// Record published levels as CSV
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_csv: Option<PathBuf>,
}

/// Where emitted bytes go
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputTarget {
    Stdout,
    File { path: PathBuf },
    Null,
}

/// Default value providers using constants
mod defaults {
    use super::OutputTarget;
    use crate::config::constants::*;

    pub fn tick_interval_us() -> u32 { timing::DEFAULT_TICK_INTERVAL_US }
    pub fn adc_resolution_bits() -> u8 { signal::DEFAULT_ADC_RESOLUTION_BITS }

    pub fn target() -> OutputTarget { OutputTarget::Null }
    pub fn queue_capacity() -> usize { output::DEFAULT_QUEUE_CAPACITY }
    pub fn baud_rate() -> u32 { output::DEFAULT_BAUD_RATE }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            tick_interval_us: defaults::tick_interval_us(),
            powerline: None,
            adc_resolution_bits: defaults::adc_resolution_bits(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target: defaults::target(),
            queue_capacity: defaults::queue_capacity(),
            baud_rate: defaults::baud_rate(),
            record_csv: None,
        }
    }
}

impl PowerlineRegion {
    pub fn frequency_hz(self) -> f32 {
        match self {
            PowerlineRegion::Hz50 => 50.0,
            PowerlineRegion::Hz60 => 60.0,
        }
    }

    /// Tick interval that puts the first comb notch on this frequency
    pub fn tick_interval_us(self, taps: usize) -> u32 {
        let rate_hz = self.frequency_hz() as f64 * taps as f64;
        (timing::MICROSECONDS_PER_SECOND as f64 / rate_hz).round() as u32
    }
}

impl SamplingSettings {
    /// Settings whose tick interval notches out the given powerline
    pub fn for_powerline(region: PowerlineRegion, taps: usize) -> Self {
        Self {
            tick_interval_us: region.tick_interval_us(taps),
            powerline: Some(region),
            ..Self::default()
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(u64::from(self.tick_interval_us))
    }

    pub fn tick_rate_hz(&self) -> f32 {
        timing::MICROSECONDS_PER_SECOND as f32 / self.tick_interval_us as f32
    }

    /// First notch of a comb with `taps` taps at this tick rate
    pub fn comb_notch_hz(&self, taps: usize) -> f32 {
        self.tick_rate_hz() / taps as f32
    }

    pub fn adc_midpoint(&self) -> u16 {
        signal::midpoint_for(self.adc_resolution_bits)
    }

    /// Largest comb output magnitude, hence largest envelope level
    pub fn worst_case_level(&self) -> u32 {
        signal::max_for(self.adc_resolution_bits)
    }
}

/// Configuration utility functions
impl SystemConfig {
    /// Validate against the reference pipeline dimensions
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        self.validate_for(envelope::DEFAULT_COMB_TAPS, envelope::DEFAULT_WINDOW_SHIFT)
    }

    /// Validate against a pipeline with `taps` taps and a `1 << window_shift` window
    pub fn validate_for(&self, taps: usize, window_shift: u32) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let sampling = &self.sampling;

        if !(timing::MIN_TICK_INTERVAL_US..=timing::MAX_TICK_INTERVAL_US)
            .contains(&sampling.tick_interval_us)
        {
            errors.push(format!(
                "Tick interval {} us outside {}..={} us",
                sampling.tick_interval_us,
                timing::MIN_TICK_INTERVAL_US,
                timing::MAX_TICK_INTERVAL_US
            ));
        }

        if !(signal::MIN_ADC_RESOLUTION_BITS..=signal::MAX_ADC_RESOLUTION_BITS)
            .contains(&sampling.adc_resolution_bits)
        {
            errors.push(format!(
                "ADC resolution {} bits outside {}..={} bits",
                sampling.adc_resolution_bits,
                signal::MIN_ADC_RESOLUTION_BITS,
                signal::MAX_ADC_RESOLUTION_BITS
            ));
        } else {
            let worst_window = (1u64 << window_shift.min(63)) * u64::from(sampling.worst_case_level());
            if worst_window > u64::from(u32::MAX) {
                errors.push(format!(
                    "Envelope accumulator overflows: window of {} samples at {} bits needs {} > u32::MAX",
                    1u64 << window_shift.min(63),
                    sampling.adc_resolution_bits,
                    worst_window
                ));
            }
        }

        if taps == 0 {
            errors.push("Comb filter needs at least one tap".to_string());
        } else if let (Some(region), true) = (sampling.powerline, sampling.tick_interval_us > 0) {
            let notch = sampling.comb_notch_hz(taps);
            if (notch - region.frequency_hz()).abs() > timing::NOTCH_TOLERANCE_HZ {
                errors.push(format!(
                    "Comb notch at {:.2} Hz misses {} Hz powerline; use a {} us tick",
                    notch,
                    region.frequency_hz(),
                    region.tick_interval_us(taps)
                ));
            }
        }

        if self.output.queue_capacity < output::MIN_QUEUE_CAPACITY {
            errors.push(format!(
                "Output queue capacity {} below minimum {}",
                self.output.queue_capacity,
                output::MIN_QUEUE_CAPACITY
            ));
        }

        if let OutputTarget::File { path } = &self.output.target {
            if path.as_os_str().is_empty() {
                errors.push("Output file path is empty".to_string());
            }
        }

        if let Err(e) = self.simulator.validate() {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Whether every reachable level survives narrowing to the output byte
    pub fn level_fits_output(&self) -> bool {
        self.sampling.worst_case_level() <= u32::from(envelope::OUTPUT_LEVEL_MAX)
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        let taps = envelope::DEFAULT_COMB_TAPS;
        let window = envelope::DEFAULT_WINDOW_LEN;
        ConfigSummary {
            tick_interval_us: self.sampling.tick_interval_us,
            tick_rate_hz: self.sampling.tick_rate_hz(),
            comb_taps: taps,
            comb_notch_hz: self.sampling.comb_notch_hz(taps),
            window_len: window,
            window_ms: window as f32 * self.sampling.tick_interval_us as f32 / 1000.0,
            adc_resolution_bits: self.sampling.adc_resolution_bits,
            level_fits_output: self.level_fits_output(),
        }
    }
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub tick_interval_us: u32,
    pub tick_rate_hz: f32,
    pub comb_taps: usize,
    pub comb_notch_hz: f32,
    pub window_len: u32,
    pub window_ms: f32,
    pub adc_resolution_bits: u8,
    pub level_fits_output: bool,
}

impl ConfigSummary {
    /// Single-line JSON form for structured logs
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}
