// src/hal/traits.rs
//! Collaborator traits at the hardware boundary

use crate::hal::types::{OutputByte, RawSample};

/// Analog front end read once per tick (the Sampler).
///
/// Implementations return a reading in the converter's native range and
/// must not block.
pub trait AnalogSource {
    fn read_raw(&mut self) -> RawSample;
}

/// Byte-oriented output channel (the Output Emitter).
///
/// Called from tick context with the current level byte. Implementations
/// provide a fixed-latency, non-blocking write; the pipeline never retries.
pub trait LevelSink {
    fn write_level(&mut self, byte: OutputByte);
}

/// Callback registered with a periodic timer
pub trait TickHandler {
    fn on_tick(&mut self);
}

impl<O: LevelSink + ?Sized> LevelSink for &mut O {
    fn write_level(&mut self, byte: u8) {
        (**self).write_level(byte)
    }
}

impl<F: FnMut() -> u16> AnalogSource for F {
    fn read_raw(&mut self) -> u16 {
        self()
    }
}

/// Collects every emitted byte; handy for tests and offline runs
impl LevelSink for Vec<u8> {
    fn write_level(&mut self, byte: u8) {
        self.push(byte);
    }
}
