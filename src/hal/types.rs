// src/hal/types.rs
//! Value types crossing the hardware boundary

use serde::{Deserialize, Serialize};

/// One reading from the analog front end, in converter counts
pub type RawSample = u16;

/// One byte written to the output channel per tick
pub type OutputByte = u8;

/// Counters kept by an output sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkCounters {
    /// Bytes accepted from tick context
    pub accepted: u64,
    /// Bytes discarded because the queue was full
    pub dropped: u64,
    /// Bytes handed to the writer
    pub written: u64,
}

impl SinkCounters {
    /// Bytes accepted but not yet written
    pub fn pending(&self) -> u64 {
        self.accepted.saturating_sub(self.written)
    }
}
