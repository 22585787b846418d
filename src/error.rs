//! Centralized error type for the maestro umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Engine: {0}")]
    Engine(#[from] maestro_core::EngineError),

    #[error("Config: {0}")]
    Config(#[from] maestro_core::ConfigError),

    #[cfg(feature = "neural")]
    #[error("Init: {0}")]
    Init(#[from] maestro_neural::InitError),

    #[cfg(feature = "neural")]
    #[error("Load: {0}")]
    Load(#[from] maestro_neural::LoadError),

    #[cfg(feature = "neural")]
    #[error("Unload: {0}")]
    Unload(#[from] maestro_neural::UnloadError),

    #[cfg(feature = "neural")]
    #[error("Inference: {0}")]
    Infer(#[from] maestro_neural::InferError),

    #[cfg(feature = "neural")]
    #[error("Catalog: {0}")]
    Catalog(#[from] maestro_neural::CatalogError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
