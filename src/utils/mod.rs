// src/utils/mod.rs
//! Shared helpers

pub mod time;

pub use time::{
    current_timestamp_micros, current_timestamp_nanos, ElapsedTimeProvider, MockTimeProvider,
    SystemTimeProvider, TimeProvider,
};
