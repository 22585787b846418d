//! Inference engine contract and shared model types for Maestro.
//!
//! No ML framework dependencies: concrete runtimes implement
//! [`InferenceEngine`] outside this crate and are handed to the model cache
//! through an [`EngineFactory`].

mod config;
mod engine;
mod error;
mod metadata;

pub use config::CacheConfig;
pub use engine::{ClosureEngine, EngineFactory, GraphFn, InferenceEngine, TensorMap, TensorSlot};
pub use error::{ConfigError, EngineError};
pub use metadata::{ModelKey, ModelKind, ModelMetadata};
