//! # Maestro - Music Model Engine
//!
//! Sequence codec, inference engine contract and model cache for
//! MIDI-generating neural models.
//!
//! ## Architecture
//!
//! Maestro is an umbrella crate that coordinates:
//! - **maestro-midi** - Notes and sequences, note/tensor codec, quantize, groove, features
//! - **maestro-core** - Inference engine trait, model metadata, cache configuration
//! - **maestro-neural** - Model cache (memory budget, LRU eviction, load callbacks) and
//!   typed model variants
//!
//! ## Quick Start
//!
//! ```ignore
//! use maestro::prelude::*;
//!
//! let cache = ModelCache::builder()
//!     .engine_factory(|meta| my_runtime::open(meta))
//!     .build()?;
//! cache.initialize_with_config(&CacheConfig::load("maestro.toml")?)?;
//!
//! let vae = cache
//!     .get(ModelKind::GenerativeLatent, "MusicVAE")
//!     .ok_or("MusicVAE unavailable")?;
//! let pattern = vae.as_generative().unwrap().sample(0.8)?;
//! let tight = quantize_sequence(&pattern, 120);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Everything enabled
//! - `neural` - Model cache and variants

mod error;
pub use error::{Error, Result};

/// Re-export of maestro-core for direct access
pub use maestro_core as core;

/// Re-export of maestro-midi for direct access
pub use maestro_midi as midi;

/// Re-export of maestro-neural for direct access
#[cfg(feature = "neural")]
pub use maestro_neural as neural;

// Engine contract
pub use maestro_core::{
    CacheConfig, ClosureEngine, ConfigError, EngineError, EngineFactory, InferenceEngine,
    ModelKey, ModelKind, ModelMetadata, TensorMap, TensorSlot,
};

// Data model and codec
pub use maestro_midi::{
    apply_groove_timing, apply_swing, extract_features, extract_subsequence, merge_sequences,
    quantize_sequence, random_sequence, sequence_to_tensor, similarity, tensor_to_sequence,
    transpose_sequence, GrooveVector, Note, Sequence, TimeSignature,
};

// Model cache
#[cfg(feature = "neural")]
pub use maestro_neural::{
    CatalogError, CatalogSource, DirectoryCatalog, GenerativeModel, GenericModel, GrooveModel,
    InferError, InitError, LatentVector, LoadError, LoadEvent, LoadSubscription, LoadedModel,
    ModelCache, ModelCacheBuilder, ModelHandle, StaticCatalog, UnloadError,
};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Error, Result};

    pub use maestro_core::{CacheConfig, ClosureEngine, InferenceEngine, ModelKind, TensorMap};
    pub use maestro_midi::{
        apply_swing, quantize_sequence, sequence_to_tensor, similarity, tensor_to_sequence,
        Note, Sequence,
    };

    #[cfg(feature = "neural")]
    pub use maestro_neural::{
        DirectoryCatalog, LoadEvent, ModelCache, ModelHandle, StaticCatalog,
    };
}
