//! Simulated EMG front end
//!
//! Produces raw ADC readings shaped like a surface EMG sensor's RAW output:
//! a baseline at the converter midpoint, band-limited muscle activity whose
//! amplitude follows an activation pattern, powerline hum and white noise.

use crate::config::constants::{signal, simulation};
use crate::error::{EmgError, EmgResult};
use crate::hal::traits::AnalogSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::str::FromStr;
use std::time::Duration;

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulatorConfig {
    #[serde(default = "defaults::pattern")]
    pub pattern: ActivationPattern,

    /// Peak muscle-activity deviation in ADC counts
    #[serde(default = "defaults::activation_amplitude")]
    pub activation_amplitude: f32,

    /// Noise standard deviation in ADC counts
    #[serde(default = "defaults::noise_level")]
    pub noise_level: f32,

    #[serde(default = "defaults::hum_amplitude")]
    pub hum_amplitude: f32,

    #[serde(default = "defaults::hum_frequency_hz")]
    pub hum_frequency_hz: f32,

    /// Fixed seed for reproducible runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Muscle activation over time
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivationPattern {
    Rest,
    Constant { level: f32 },
    Burst { on_ms: u32, off_ms: u32 },
    Sinusoidal { frequency_hz: f32 },
    Ramp { ramp_ms: u32 },
}

mod defaults {
    use super::ActivationPattern;
    use crate::config::constants::simulation::*;

    pub fn pattern() -> ActivationPattern {
        ActivationPattern::Burst {
            on_ms: DEFAULT_BURST_ON_MS,
            off_ms: DEFAULT_BURST_OFF_MS,
        }
    }
    pub fn activation_amplitude() -> f32 { DEFAULT_ACTIVATION_AMPLITUDE }
    pub fn noise_level() -> f32 { DEFAULT_NOISE_LEVEL }
    pub fn hum_amplitude() -> f32 { DEFAULT_HUM_AMPLITUDE }
    pub fn hum_frequency_hz() -> f32 { DEFAULT_HUM_FREQUENCY_HZ }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            pattern: defaults::pattern(),
            activation_amplitude: defaults::activation_amplitude(),
            noise_level: defaults::noise_level(),
            hum_amplitude: defaults::hum_amplitude(),
            hum_frequency_hz: defaults::hum_frequency_hz(),
            seed: None,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> EmgResult<()> {
        let non_negative = [
            ("activation_amplitude", self.activation_amplitude),
            ("noise_level", self.noise_level),
            ("hum_amplitude", self.hum_amplitude),
            ("hum_frequency_hz", self.hum_frequency_hz),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EmgError::configuration(
                    "simulator",
                    format!("{} must be a non-negative number, got {}", field, value),
                ));
            }
        }

        match self.pattern {
            ActivationPattern::Constant { level } if !(0.0..=1.0).contains(&level) => {
                Err(EmgError::configuration(
                    "simulator",
                    format!("constant activation level {} outside 0.0..=1.0", level),
                ))
            }
            ActivationPattern::Burst { on_ms, off_ms } if on_ms == 0 && off_ms == 0 => Err(
                EmgError::configuration("simulator", "burst period must be non-zero"),
            ),
            ActivationPattern::Sinusoidal { frequency_hz }
                if !frequency_hz.is_finite() || frequency_hz <= 0.0 =>
            {
                Err(EmgError::configuration(
                    "simulator",
                    "sinusoidal frequency must be a positive finite number",
                ))
            }
            ActivationPattern::Ramp { ramp_ms: 0 } => Err(EmgError::configuration(
                "simulator",
                "ramp duration must be non-zero",
            )),
            _ => Ok(()),
        }
    }
}

impl ActivationPattern {
    /// Activation in `0.0..=1.0` at time `t_secs`
    pub fn activation_at(&self, t_secs: f32) -> f32 {
        match *self {
            ActivationPattern::Rest => 0.0,
            ActivationPattern::Constant { level } => level,
            ActivationPattern::Burst { on_ms, off_ms } => {
                let period_ms = on_ms as f32 + off_ms as f32;
                let t_ms = (t_secs * 1000.0) % period_ms;
                if t_ms < on_ms as f32 { 1.0 } else { 0.0 }
            }
            ActivationPattern::Sinusoidal { frequency_hz } => {
                0.5 * (1.0 - (TAU * frequency_hz * t_secs).cos())
            }
            ActivationPattern::Ramp { ramp_ms } => {
                let period = ramp_ms as f32 / 1000.0;
                (t_secs % period) / period
            }
        }
    }
}

impl FromStr for ActivationPattern {
    type Err = EmgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rest" => Ok(ActivationPattern::Rest),
            "constant" => Ok(ActivationPattern::Constant { level: 1.0 }),
            "burst" => Ok(defaults::pattern()),
            "sine" | "sinusoidal" => Ok(ActivationPattern::Sinusoidal { frequency_hz: 0.5 }),
            "ramp" => Ok(ActivationPattern::Ramp { ramp_ms: 3000 }),
            other => Err(EmgError::configuration(
                "simulator",
                format!("unknown activation pattern '{}'", other),
            )),
        }
    }
}

/// Synthetic EMG sensor feeding one reading per tick
pub struct SimulatedEmgSource {
    config: SimulatorConfig,
    rng: StdRng,
    noise: Normal<f32>,
    tick_secs: f32,
    ticks: u64,
    midpoint: f32,
    full_scale: f32,
}

impl SimulatedEmgSource {
    pub fn new(config: SimulatorConfig, tick_interval: Duration, adc_bits: u8) -> EmgResult<Self> {
        config.validate()?;
        if tick_interval.is_zero() {
            return Err(EmgError::configuration("simulator", "tick interval must be non-zero"));
        }
        if !(signal::MIN_ADC_RESOLUTION_BITS..=signal::MAX_ADC_RESOLUTION_BITS).contains(&adc_bits) {
            return Err(EmgError::configuration(
                "simulator",
                format!("unsupported ADC resolution: {} bits", adc_bits),
            ));
        }

        let noise = Normal::new(0.0, 1.0)
            .map_err(|e| EmgError::configuration("simulator", e.to_string()))?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::debug!(
            pattern = ?config.pattern,
            tick_us = tick_interval.as_micros() as u64,
            adc_bits,
            "simulated EMG source created"
        );

        Ok(Self {
            config,
            rng,
            noise,
            tick_secs: tick_interval.as_secs_f32(),
            ticks: 0,
            midpoint: f32::from(signal::midpoint_for(adc_bits)),
            full_scale: signal::max_for(adc_bits) as f32,
        })
    }

    /// Reference setup: 10-bit ADC sampled every `tick_interval`
    pub fn reference(config: SimulatorConfig, tick_interval: Duration) -> EmgResult<Self> {
        Self::new(config, tick_interval, signal::DEFAULT_ADC_RESOLUTION_BITS)
    }

    /// Activation level that drove the most recent reading
    pub fn current_activation(&self) -> f32 {
        self.config.pattern.activation_at(self.elapsed_secs())
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn elapsed_secs(&self) -> f32 {
        self.ticks.saturating_sub(1) as f32 * self.tick_secs
    }

    fn generate(&mut self, t: f32) -> f32 {
        let activation = self.config.pattern.activation_at(t);

        // Random-phase carrier plus broadband component approximates
        // summed motor-unit action potentials.
        let jitter: f32 = self.rng.gen_range(-0.5..0.5);
        let carrier = (TAU * simulation::MUSCLE_CARRIER_HZ * t + jitter).sin();
        let broadband = self.noise.sample(&mut self.rng);
        let muscle = activation * self.config.activation_amplitude * (0.6 * carrier + 0.4 * broadband);

        let hum = self.config.hum_amplitude * (TAU * self.config.hum_frequency_hz * t).sin();
        let noise = self.config.noise_level * self.noise.sample(&mut self.rng);

        self.midpoint + muscle + hum + noise
    }
}

impl AnalogSource for SimulatedEmgSource {
    fn read_raw(&mut self) -> u16 {
        let t = self.ticks as f32 * self.tick_secs;
        self.ticks += 1;
        let value = self.generate(t);
        // ADC saturates at the rails
        value.round().clamp(0.0, self.full_scale) as u16
    }
}

/// Source that always reads the same value
#[derive(Debug, Clone, Copy)]
pub struct ConstantSource(pub u16);

impl AnalogSource for ConstantSource {
    fn read_raw(&mut self) -> u16 {
        self.0
    }
}

/// Source that replays recorded readings, cycling at the end
#[derive(Debug, Clone)]
pub struct ReplaySource {
    samples: Vec<u16>,
    position: usize,
}

impl ReplaySource {
    pub fn new(samples: Vec<u16>) -> EmgResult<Self> {
        if samples.is_empty() {
            return Err(EmgError::configuration("replay source", "no samples to replay"));
        }
        Ok(Self { samples, position: 0 })
    }
}

impl AnalogSource for ReplaySource {
    fn read_raw(&mut self) -> u16 {
        let value = self.samples[self.position];
        self.position = (self.position + 1) % self.samples.len();
        value
    }
}
