//! Model lifecycle for Maestro: catalog, memory-budgeted cache, and typed
//! model variants.
//!
//! This crate contains NO ML framework dependencies. Engines are created by
//! an [`EngineFactory`](maestro_core::EngineFactory) supplied at build time;
//! wrap TensorFlow Lite, ONNX Runtime, Burn or a plain closure behind
//! [`InferenceEngine`](maestro_core::InferenceEngine).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maestro_neural::{ModelCache, StaticCatalog};
//! use maestro_core::ModelKind;
//!
//! let cache = ModelCache::builder()
//!     .engine_factory(|meta| my_runtime::open(meta))
//!     .build()?;
//! cache.initialize(StaticCatalog::builtin("./models"), 0, false)?;
//!
//! let groove = cache.get(ModelKind::GrooveTransfer, "GrooVAE");
//! if let Some(model) = groove.as_deref().and_then(|m| m.as_groove()) {
//!     let swung = model.apply_groove(&pattern, 0.6, 0.3)?;
//! }
//! ```

mod error;
pub use error::{CatalogError, InferError, InitError, LoadError, UnloadError};

mod catalog;
pub use catalog::{
    is_model_file, load_model_config, CatalogSource, DirectoryCatalog, ModelConfig,
    StaticCatalog, MODEL_EXTENSIONS,
};

mod cache;
pub use cache::{CallbackId, LoadEvent, LoadSubscription, ModelCache, ModelCacheBuilder};

mod variant;
pub use variant::{
    interpolate_latents, GenerativeModel, GenericModel, GrooveModel, LatentVector, LoadedModel,
    ModelHandle, DEFAULT_GROOVE_TEMPERATURE, DEFAULT_HUMANIZE, DEFAULT_LATENT_DIM,
    MAX_TEMPERATURE, MIN_TEMPERATURE,
};

// Re-export the engine contract for convenience
pub use maestro_core::{
    EngineError, EngineFactory, InferenceEngine, ModelKey, ModelKind, ModelMetadata, TensorSlot,
};
