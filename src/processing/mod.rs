// src/processing/mod.rs
//! Fixed-point EMG linear envelope processing

pub mod comb_filter;
pub mod envelope;
pub mod pipeline;

pub use comb_filter::*;
pub use envelope::*;
pub use pipeline::*;
