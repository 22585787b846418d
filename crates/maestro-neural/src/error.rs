//! Error types for the model cache, catalog and variants.

use maestro_core::{ConfigError, EngineError, ModelKey};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Model cache already initialized")]
    AlreadyInitialized,

    #[error("Model cache not initialized")]
    NotInitialized,

    #[error("Catalog unavailable at {path}: {source}")]
    CatalogUnavailable {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },

    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Model cache not initialized")]
    NotInitialized,

    #[error("Model not found: {0}")]
    ModelNotFound(ModelKey),

    #[error("Failed to initialize engine for {key}: {source}")]
    EngineInitFailed {
        key: ModelKey,
        #[source]
        source: EngineError,
    },
}

#[derive(Debug, Error)]
pub enum UnloadError {
    #[error("Model cache not initialized")]
    NotInitialized,
}

#[derive(Debug, Error)]
pub enum InferError {
    #[error("Model not initialized")]
    NotInitialized,

    #[error("Input tensor has {actual} values, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Latent vector has {actual} dimensions, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog location does not exist: {0}")]
    Missing(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
