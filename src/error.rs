// src/error.rs
//! Error types for the envelope runtime
//!
//! The per-tick pipeline is total and never returns an error. These types
//! cover the surfaces around it: configuration, simulated sources, output
//! plumbing and the worker threads.

use crate::config::loader::ConfigError;
use thiserror::Error;

/// Crate-level error
#[derive(Debug, Error)]
pub enum EmgError {
    /// A component was given parameters it cannot run with
    #[error("invalid {component} configuration: {reason}")]
    Configuration { component: String, reason: String },

    /// Loading or validating the configuration file failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Output or recording I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A timer, drain or recorder thread could not be started or joined
    #[error("worker thread error: {0}")]
    Thread(String),
}

impl EmgError {
    pub fn configuration(component: impl Into<String>, reason: impl Into<String>) -> Self {
        EmgError::Configuration {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from configuration rather than runtime I/O
    pub fn is_configuration(&self) -> bool {
        matches!(self, EmgError::Configuration { .. } | EmgError::Config(_))
    }
}

/// Result alias used across the crate
pub type EmgResult<T> = Result<T, EmgError>;
