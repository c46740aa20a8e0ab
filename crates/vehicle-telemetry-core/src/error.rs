//! Simulator errors

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by the simulation core and runtime
#[derive(Error, Debug)]
pub enum SimError {
    /// Shift delta other than +1 or -1
    #[error("Invalid gear shift delta {0}: only +1 or -1 are accepted")]
    InvalidShift(i8),

    /// Rejected configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Physics produced a non-finite value
    #[error("Physics state corrupted: {0}")]
    CorruptState(String),

    /// A worker thread could not be started
    #[error("Failed to spawn {0} worker: {1}")]
    Spawn(&'static str, std::io::Error),

    /// A worker thread panicked before returning
    #[error("Worker '{0}' panicked")]
    WorkerPanicked(&'static str),
}
