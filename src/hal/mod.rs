// src/hal/mod.rs
//! Hardware abstraction: sampler, output emitter and periodic timer

pub mod traits;
pub mod types;
pub mod simulator;
pub mod serial_sink;
pub mod timer;

pub use traits::*;
pub use types::*;
