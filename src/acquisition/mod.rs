// src/acquisition/mod.rs
//! Sample buffering components

pub mod ring_buffer;

pub use ring_buffer::*;
