//! Error types for engines and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by an [`InferenceEngine`](crate::InferenceEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Failed to load model from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Unknown tensor: {0}")]
    UnknownTensor(String),

    #[error("Tensor {slot} expects {expected} values, got {actual}")]
    ShapeMismatch {
        slot: String,
        expected: usize,
        actual: usize,
    },

    #[error("Inference failed: {0}")]
    Run(String),

    #[error("Acceleration unavailable: {0}")]
    Acceleration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
