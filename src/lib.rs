//! EMG-LE: fixed-point EMG linear envelope for timer-driven sampling
//!
//! Every timer tick reads one 10-bit sample, passes it through an integer
//! comb filter that notches the powerline frequency and its harmonics,
//! accumulates the rectified output over a power-of-two window and emits one
//! byte carrying the most recent envelope level.
//!
//! - Const-generic pipeline (`EnvelopePipeline<TAPS, SHIFT>`) with no
//!   allocation and no error path per tick
//! - Collaborator traits for the analog input, output emitter and timer
//! - Simulated EMG sensor, lock-free output queue and periodic timer for
//!   running on a desktop
//! - TOML configuration with environment overrides
//!
//! # Quick Start
//!
//! ```rust
//! use emg_le::hal::simulator::ConstantSource;
//! use emg_le::{EmgLePipeline, EnvelopeTask};
//!
//! let mut task = EnvelopeTask::<_, Vec<u8>, 20, 7>::with_pipeline(
//!     ConstantSource(512),
//!     Vec::new(),
//!     EmgLePipeline::new(),
//! );
//! for _ in 0..256 {
//!     task.tick();
//! }
//! assert_eq!(task.sink().len(), 256);
//! assert_eq!(task.pipeline().level().value(), 0);
//! ```

#![warn(clippy::all)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod processing;
pub mod recording;
pub mod task;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, SystemConfig};
pub use error::{EmgError, EmgResult};
pub use hal::{AnalogSource, LevelSink, TickHandler};
pub use processing::{
    CombFilter, EmgLePipeline, EnvelopeAccumulator, EnvelopeLevel, EnvelopePipeline,
    PipelineSnapshot, TickOutput,
};
pub use task::{EnvelopeTask, LevelMonitor, SnapshotEvents};
pub use utils::time::{current_timestamp_micros, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Fixed-point EMG linear envelope for timer-driven sampling".to_string(),
        comb_taps: config::envelope::DEFAULT_COMB_TAPS,
        window_len: config::envelope::DEFAULT_WINDOW_LEN,
        features: vec![
            "Integer comb filter with powerline notches".to_string(),
            "Power-of-two envelope window".to_string(),
            "Non-blocking byte output".to_string(),
            "TOML configuration".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// Taps of the reference pipeline
    pub comb_taps: usize,
    /// Window length of the reference pipeline
    pub window_len: u32,
    /// List of features
    pub features: Vec<String>,
}
