// src/config/constants.rs
//! System-wide configuration constants

/// ADC and raw signal constants
pub mod signal {
    pub const DEFAULT_ADC_RESOLUTION_BITS: u8 = 10;
    pub const MIN_ADC_RESOLUTION_BITS: u8 = 8;
    pub const MAX_ADC_RESOLUTION_BITS: u8 = 16;

    /// Largest reading of the reference 10-bit converter
    pub const ADC_MAX: u16 = (1 << DEFAULT_ADC_RESOLUTION_BITS) - 1;

    /// Neutral previous-sample value used to seed the comb filter
    pub const ADC_MIDPOINT: u16 = 1 << (DEFAULT_ADC_RESOLUTION_BITS - 1);

    /// Midpoint of an arbitrary resolution
    pub const fn midpoint_for(bits: u8) -> u16 {
        1 << (bits.saturating_sub(1) & 15)
    }

    /// Full-scale reading of an arbitrary resolution
    pub const fn max_for(bits: u8) -> u32 {
        if bits >= 32 {
            u32::MAX
        } else {
            (1u32 << bits) - 1
        }
    }
}

/// Comb filter and envelope window constants
pub mod envelope {
    /// Number of comb-filter taps (circular buffer capacity)
    pub const DEFAULT_COMB_TAPS: usize = 20;

    /// log2 of the envelope window, also the output scaling shift
    pub const DEFAULT_WINDOW_SHIFT: u32 = 7;

    /// Envelope window length in samples
    pub const DEFAULT_WINDOW_LEN: u32 = 1 << DEFAULT_WINDOW_SHIFT;

    /// Keeps `window * u16::MAX` inside a `u32` accumulator
    pub const MAX_WINDOW_SHIFT: u32 = 15;

    /// Largest level that survives narrowing to the output byte
    pub const OUTPUT_LEVEL_MAX: u16 = u8::MAX as u16;
}

/// Timer and powerline constants
pub mod timing {
    pub const MICROSECONDS_PER_SECOND: u64 = 1_000_000;

    /// 1000 Hz sampling puts the 20-tap comb notch on 50 Hz
    pub const TICK_INTERVAL_50HZ_US: u32 = 1000;

    /// 1200 Hz sampling puts the 20-tap comb notch on 60 Hz
    pub const TICK_INTERVAL_60HZ_US: u32 = 833;

    pub const DEFAULT_TICK_INTERVAL_US: u32 = TICK_INTERVAL_60HZ_US;

    /// Allowed distance between comb notch and powerline frequency
    pub const NOTCH_TOLERANCE_HZ: f32 = 1.0;

    pub const MIN_TICK_INTERVAL_US: u32 = 50;
    pub const MAX_TICK_INTERVAL_US: u32 = 100_000;
}

/// Output emitter constants
pub mod output {
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
    pub const MIN_QUEUE_CAPACITY: usize = 16;

    /// Bytes per drain pass before the drain thread flushes
    pub const DRAIN_BATCH_SIZE: usize = 256;

    /// Drain thread idle sleep when the queue is empty
    pub const DRAIN_IDLE_SLEEP_US: u64 = 500;
}

/// Simulated sensor constants
pub mod simulation {
    /// Peak deviation from baseline during full activation (ADC counts)
    pub const DEFAULT_ACTIVATION_AMPLITUDE: f32 = 300.0;
    /// Background noise standard deviation (ADC counts)
    pub const DEFAULT_NOISE_LEVEL: f32 = 4.0;
    /// Powerline hum amplitude (ADC counts)
    pub const DEFAULT_HUM_AMPLITUDE: f32 = 25.0;
    pub const DEFAULT_HUM_FREQUENCY_HZ: f32 = 60.0;
    pub const DEFAULT_BURST_ON_MS: u32 = 1500;
    pub const DEFAULT_BURST_OFF_MS: u32 = 2500;
    /// Dominant frequency of the synthetic motor-unit activity
    pub const MUSCLE_CARRIER_HZ: f32 = 120.0;
}

/// Configuration file discovery
pub mod paths {
    pub const CONFIG_FILE_NAME: &str = "emg-le.toml";
    pub const CONFIG_SEARCH_DIRS: &[&str] = &[".", "config"];
    pub const CONFIG_ENV_VAR: &str = "EMG_LE_CONFIG";
}
