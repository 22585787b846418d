//! Typed model variants and the shared handle the cache hands out.

mod generative;
mod generic;
mod groove;

pub use generative::{interpolate_latents, GenerativeModel, LatentVector, DEFAULT_LATENT_DIM};
pub use generic::GenericModel;
pub use groove::{GrooveModel, DEFAULT_GROOVE_TEMPERATURE, DEFAULT_HUMANIZE};

use crate::error::InferError;
use maestro_core::{EngineError, EngineFactory, InferenceEngine, ModelKind, ModelMetadata};
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub const MIN_TEMPERATURE: f32 = 0.0001;
pub const MAX_TEMPERATURE: f32 = 2.0;

pub(crate) fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        return 1.0;
    }
    temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Engine plus metadata, shared by every variant.
///
/// Releases the engine when dropped, so the last handle going away frees
/// the model even after the cache has forgotten it.
pub(crate) struct ModelCore {
    metadata: ModelMetadata,
    engine: Mutex<Box<dyn InferenceEngine>>,
    acceleration_engaged: bool,
}

impl ModelCore {
    pub(crate) fn new(
        metadata: ModelMetadata,
        engine: Box<dyn InferenceEngine>,
        acceleration_engaged: bool,
    ) -> Self {
        Self {
            metadata,
            engine: Mutex::new(engine),
            acceleration_engaged,
        }
    }

    pub(crate) fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.engine.lock().is_initialized()
    }

    pub(crate) fn memory_usage(&self) -> u64 {
        self.engine.lock().memory_usage()
    }

    pub(crate) fn acceleration_engaged(&self) -> bool {
        self.acceleration_engaged
    }

    pub(crate) fn unload(&self) {
        let mut engine = self.engine.lock();
        if engine.is_initialized() {
            engine.unload();
            tracing::debug!("Released engine for {}", self.metadata.key());
        }
    }

    /// Run `f` with the engine locked, failing if it has been released.
    pub(crate) fn with_engine<T>(
        &self,
        f: impl FnOnce(&mut dyn InferenceEngine) -> Result<T, InferError>,
    ) -> Result<T, InferError> {
        let mut engine = self.engine.lock();
        if !engine.is_initialized() {
            tracing::warn!("{} used after unload", self.metadata.key());
            return Err(InferError::NotInitialized);
        }
        f(&mut **engine)
    }

    /// Read a declared shape without requiring initialization.
    pub(crate) fn peek<T>(&self, f: impl FnOnce(&dyn InferenceEngine) -> T) -> T {
        let engine = self.engine.lock();
        f(&**engine)
    }
}

impl Drop for ModelCore {
    fn drop(&mut self) {
        let engine = self.engine.get_mut();
        if engine.is_initialized() {
            engine.unload();
        }
    }
}

/// A resident model, tagged by capability.
pub enum LoadedModel {
    GenerativeLatent(GenerativeModel),
    GrooveTransfer(GrooveModel),
    /// Kinds without a typed variant; raw tensor access only.
    Generic(GenericModel),
}

impl LoadedModel {
    /// Create, initialize and wrap an engine for `metadata`.
    ///
    /// Acceleration is only requested when `acceleration` is set and the
    /// model declares support. A refusal is logged, not an error.
    pub(crate) fn load(
        metadata: &ModelMetadata,
        factory: &EngineFactory,
        acceleration: bool,
        ticks_per_quarter: u32,
    ) -> Result<Self, EngineError> {
        let mut engine = factory(metadata)?;
        engine.initialize(&metadata.path)?;

        let mut engaged = false;
        if acceleration && metadata.supports_acceleration {
            match engine.set_acceleration(true) {
                Ok(true) => engaged = true,
                Ok(false) => {
                    tracing::warn!("Acceleration requested but not engaged for {}", metadata.key())
                }
                Err(e) => tracing::warn!(
                    "Acceleration failed for {}, using CPU: {}",
                    metadata.key(),
                    e
                ),
            }
        }

        let core = ModelCore::new(metadata.clone(), engine, engaged);
        Ok(match metadata.kind {
            ModelKind::GenerativeLatent => {
                Self::GenerativeLatent(GenerativeModel::from_core(core, ticks_per_quarter))
            }
            ModelKind::GrooveTransfer => {
                Self::GrooveTransfer(GrooveModel::from_core(core, ticks_per_quarter))
            }
            _ => Self::Generic(GenericModel::from_core(core)),
        })
    }

    fn core(&self) -> &ModelCore {
        match self {
            Self::GenerativeLatent(m) => &m.core,
            Self::GrooveTransfer(m) => &m.core,
            Self::Generic(m) => &m.core,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        self.core().metadata()
    }

    pub fn kind(&self) -> ModelKind {
        self.metadata().kind
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Engine-reported bytes; zero once released.
    pub fn memory_usage(&self) -> u64 {
        self.core().memory_usage()
    }

    pub fn is_initialized(&self) -> bool {
        self.core().is_initialized()
    }

    pub fn acceleration_engaged(&self) -> bool {
        self.core().acceleration_engaged()
    }

    /// Release the engine now. Further inference fails with
    /// [`InferError::NotInitialized`].
    pub fn unload(&self) {
        self.core().unload();
    }

    pub fn as_generative(&self) -> Option<&GenerativeModel> {
        match self {
            Self::GenerativeLatent(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_groove(&self) -> Option<&GrooveModel> {
        match self {
            Self::GrooveTransfer(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_generic(&self) -> Option<&GenericModel> {
        match self {
            Self::Generic(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("key", &self.metadata().key())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Shared reference to a resident model.
///
/// Clones point at the same instance. A handle stays usable after the cache
/// evicts or unloads its model; the engine is released when the last handle
/// drops.
#[derive(Clone, Debug)]
pub struct ModelHandle(Arc<LoadedModel>);

impl ModelHandle {
    pub(crate) fn new(model: LoadedModel) -> Self {
        Self(Arc::new(model))
    }

    /// Whether both handles refer to the same loaded instance.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for ModelHandle {
    type Target = LoadedModel;

    fn deref(&self) -> &LoadedModel {
        &self.0
    }
}
