//! Model cache: catalog, resident set, memory budget and load notifications.
//!
//! One coarse lock guards all cache state. Eviction and the load it serves
//! run under that lock as a single step. Load/unload notifications are
//! collected while the lock is held and delivered after it is released, so a
//! callback may call back into the cache.
//!
//! Loading is blocking and may be slow (disk I/O, engine setup). Call
//! [`ModelCache::load`] and [`ModelCache::get`] from a control thread and
//! keep the returned [`ModelHandle`] for time-sensitive paths. There is no
//! timeout: a stalled engine initialization blocks the caller.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maestro_neural::{ModelCache, StaticCatalog};
//! use maestro_core::ModelKind;
//!
//! let cache = ModelCache::builder()
//!     .engine_factory(my_engine_factory)
//!     .build()?;
//! cache.initialize(StaticCatalog::builtin("./models"), 256 << 20, true)?;
//!
//! if let Some(model) = cache.get(ModelKind::GenerativeLatent, "MusicVAE") {
//!     let vae = model.as_generative().unwrap();
//!     let z = vae.sample_prior(1.0);
//! }
//! ```

use crate::catalog::{CatalogSource, DirectoryCatalog};
use crate::error::{InitError, LoadError, UnloadError};
use crate::variant::{LoadedModel, ModelHandle};
use maestro_core::{
    CacheConfig, ConfigError, EngineError, EngineFactory, InferenceEngine, ModelKey, ModelKind,
    ModelMetadata,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Identifies a registered load callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

/// A model became resident (`loaded == true`) or left the resident set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEvent {
    pub kind: ModelKind,
    pub name: String,
    pub loaded: bool,
}

impl LoadEvent {
    fn new(key: &ModelKey, loaded: bool) -> Self {
        Self {
            kind: key.kind,
            name: key.name.clone(),
            loaded,
        }
    }
}

type LoadCallback = Arc<dyn Fn(&LoadEvent) + Send + Sync>;

struct Resident {
    handle: ModelHandle,
    last_access: u64,
    bytes: u64,
}

struct CacheState {
    initialized: bool,
    source: Option<Box<dyn CatalogSource>>,
    models_dir: Option<PathBuf>,
    catalog: BTreeMap<ModelKey, ModelMetadata>,
    resident: HashMap<ModelKey, Resident>,
    memory_budget: u64,
    acceleration: bool,
    ticks_per_quarter: u32,
    /// Monotonic access counter for LRU ordering.
    clock: u64,
}

impl CacheState {
    fn usage(&self) -> u64 {
        self.resident.values().map(|r| r.bytes).sum()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Evict least-recently-used models until `incoming` more bytes fit the
    /// budget, or until only `keep` models remain.
    fn evict_lru(&mut self, incoming: u64, keep: usize, events: &mut Vec<LoadEvent>) {
        if self.memory_budget == 0 {
            return;
        }
        let mut to_free = (self.usage() + incoming).saturating_sub(self.memory_budget);
        if to_free == 0 {
            return;
        }

        let mut order: Vec<(u64, ModelKey)> = self
            .resident
            .iter()
            .map(|(key, r)| (r.last_access, key.clone()))
            .collect();
        order.sort();

        for (_, key) in order {
            if to_free == 0 || self.resident.len() <= keep {
                break;
            }
            if let Some(entry) = self.resident.remove(&key) {
                to_free = to_free.saturating_sub(entry.bytes);
                tracing::info!("Evicted model {} ({} bytes)", key, entry.bytes);
                events.push(LoadEvent::new(&key, false));
            }
        }

        if to_free > 0 {
            tracing::debug!(
                "Memory budget exceeded by {} bytes after eviction ({} resident)",
                to_free,
                self.resident.len()
            );
        }
    }

    fn install_catalog(&mut self, entries: Vec<ModelMetadata>) {
        self.catalog.clear();
        for meta in entries {
            let key = meta.key();
            if self.catalog.insert(key.clone(), meta).is_some() {
                tracing::warn!("Duplicate catalog entry {}, keeping the last one", key);
            }
        }
    }
}

struct Inner {
    state: Mutex<CacheState>,
    subscribers: Mutex<Vec<(CallbackId, LoadCallback)>>,
    next_callback: AtomicU64,
    factory: EngineFactory,
}

impl Inner {
    fn remove_subscriber(&self, id: CallbackId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }
}

/// Process-owned registry of known and resident models.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ModelCache {
    inner: Arc<Inner>,
}

impl ModelCache {
    pub fn builder() -> ModelCacheBuilder {
        ModelCacheBuilder::default()
    }

    /// Populate the catalog from `source` and start with nothing resident.
    ///
    /// `memory_budget` is in bytes; `0` means unlimited.
    pub fn initialize(
        &self,
        source: impl CatalogSource + 'static,
        memory_budget: u64,
        acceleration: bool,
    ) -> Result<(), InitError> {
        let mut state = self.inner.state.lock();
        if state.initialized {
            return Err(InitError::AlreadyInitialized);
        }

        let entries = source.scan().map_err(|source_err| {
            tracing::warn!(
                "Catalog unavailable at {}: {}",
                source.location().display(),
                source_err
            );
            InitError::CatalogUnavailable {
                path: source.location().to_path_buf(),
                source: source_err,
            }
        })?;

        state.install_catalog(entries);
        state.resident.clear();
        state.memory_budget = memory_budget;
        state.acceleration = acceleration;
        state.models_dir = Some(source.location().to_path_buf());
        state.source = Some(Box::new(source));
        state.initialized = true;

        tracing::info!(
            "Model cache initialized: {} models cataloged, budget {} bytes, acceleration {}",
            state.catalog.len(),
            memory_budget,
            if acceleration { "on" } else { "off" }
        );
        Ok(())
    }

    /// [`initialize`](Self::initialize) from a [`CacheConfig`], scanning
    /// `config.models_dir` as a [`DirectoryCatalog`].
    pub fn initialize_with_config(&self, config: &CacheConfig) -> Result<(), InitError> {
        config.validate()?;
        self.initialize(
            DirectoryCatalog::new(config.models_dir.clone()),
            config.memory_budget_bytes,
            config.acceleration,
        )?;
        self.inner.state.lock().ticks_per_quarter = config.ticks_per_quarter;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().initialized
    }

    /// Make `(kind, name)` resident. Succeeds immediately if it already is.
    pub fn load(&self, kind: ModelKind, name: &str) -> Result<(), LoadError> {
        let key = ModelKey::new(kind, name);
        let mut events = Vec::new();
        let result = {
            let mut state = self.inner.state.lock();
            self.load_locked(&mut state, &key, &mut events)
        };
        self.dispatch(&events);
        result.map(|_| ())
    }

    /// Handle to `(kind, name)`, loading it first if needed.
    ///
    /// Returns `None` when the load fails; the reason is logged.
    pub fn get(&self, kind: ModelKind, name: &str) -> Option<ModelHandle> {
        let key = ModelKey::new(kind, name);
        let mut events = Vec::new();
        let result = {
            let mut state = self.inner.state.lock();
            self.load_locked(&mut state, &key, &mut events)
        };
        self.dispatch(&events);
        result.ok()
    }

    fn load_locked(
        &self,
        state: &mut CacheState,
        key: &ModelKey,
        events: &mut Vec<LoadEvent>,
    ) -> Result<ModelHandle, LoadError> {
        if !state.initialized {
            tracing::warn!("Load of {} before model cache initialization", key);
            return Err(LoadError::NotInitialized);
        }

        let now = state.tick();
        if let Some(entry) = state.resident.get_mut(key) {
            entry.last_access = now;
            tracing::debug!("Cache hit for {}", key);
            return Ok(entry.handle.clone());
        }

        let meta = match state.catalog.get(key) {
            Some(meta) => meta.clone(),
            None => {
                tracing::warn!("Model not found in catalog: {}", key);
                return Err(LoadError::ModelNotFound(key.clone()));
            }
        };

        // The incoming key is not resident, so every resident model is a
        // candidate.
        state.evict_lru(meta.memory_footprint_bytes, 0, events);

        let model = LoadedModel::load(
            &meta,
            &self.inner.factory,
            state.acceleration,
            state.ticks_per_quarter,
        )
        .map_err(|e| {
            tracing::warn!("Failed to load model {}: {}", key, e);
            LoadError::EngineInitFailed {
                key: key.clone(),
                source: e,
            }
        })?;

        let handle = ModelHandle::new(model);
        state.resident.insert(
            key.clone(),
            Resident {
                handle: handle.clone(),
                last_access: now,
                bytes: meta.memory_footprint_bytes,
            },
        );
        tracing::info!(
            "Loaded model {} ({} bytes, {} resident)",
            key,
            meta.memory_footprint_bytes,
            state.resident.len()
        );
        events.push(LoadEvent::new(key, true));
        Ok(handle)
    }

    /// Drop `(kind, name)` from the resident set. No-op if not resident.
    ///
    /// Outstanding handles keep working until they are dropped.
    pub fn unload(&self, kind: ModelKind, name: &str) -> Result<(), UnloadError> {
        let key = ModelKey::new(kind, name);
        let removed = {
            let mut state = self.inner.state.lock();
            if !state.initialized {
                tracing::warn!("Unload of {} before model cache initialization", key);
                return Err(UnloadError::NotInitialized);
            }
            state.resident.remove(&key)
        };

        if removed.is_some() {
            tracing::info!("Unloaded model {}", key);
            self.dispatch(&[LoadEvent::new(&key, false)]);
        }
        Ok(())
    }

    pub fn is_resident(&self, kind: ModelKind, name: &str) -> bool {
        self.inner
            .state
            .lock()
            .resident
            .contains_key(&ModelKey::new(kind, name))
    }

    /// Snapshot of every cataloged model, ordered by key.
    pub fn list_available(&self) -> Vec<ModelMetadata> {
        self.inner.state.lock().catalog.values().cloned().collect()
    }

    /// Snapshot of resident models, ordered by key.
    pub fn list_resident(&self) -> Vec<ModelMetadata> {
        let state = self.inner.state.lock();
        let mut resident: Vec<ModelMetadata> = state
            .resident
            .values()
            .map(|r| r.handle.metadata().clone())
            .collect();
        resident.sort_by_key(|m| m.key());
        resident
    }

    /// Sum of cataloged footprints over resident models.
    pub fn total_resident_bytes(&self) -> u64 {
        self.inner.state.lock().usage()
    }

    pub fn memory_budget(&self) -> u64 {
        self.inner.state.lock().memory_budget
    }

    /// Change the budget, evicting immediately if usage now exceeds it.
    /// The last resident model is never evicted this way.
    pub fn set_memory_budget(&self, bytes: u64) {
        let mut events = Vec::new();
        {
            let mut state = self.inner.state.lock();
            state.memory_budget = bytes;
            state.evict_lru(0, 1, &mut events);
        }
        tracing::info!("Memory budget set to {} bytes", bytes);
        self.dispatch(&events);
    }

    /// Record the acceleration preference for future loads. Resident models
    /// keep their current mode until reloaded.
    pub fn set_acceleration_enabled(&self, enabled: bool) {
        self.inner.state.lock().acceleration = enabled;
    }

    pub fn is_acceleration_enabled(&self) -> bool {
        self.inner.state.lock().acceleration
    }

    /// Whether any resident model is running with acceleration engaged.
    pub fn is_acceleration_available(&self) -> bool {
        self.inner
            .state
            .lock()
            .resident
            .values()
            .any(|r| r.handle.acceleration_engaged())
    }

    pub fn models_dir(&self) -> Option<PathBuf> {
        self.inner.state.lock().models_dir.clone()
    }

    /// Re-read the catalog source. Resident models that are no longer
    /// cataloged are unloaded.
    pub fn rescan(&self) -> Result<(), InitError> {
        let mut events = Vec::new();
        {
            let mut state = self.inner.state.lock();
            if !state.initialized {
                return Err(InitError::NotInitialized);
            }
            let source = state.source.as_ref().ok_or(InitError::NotInitialized)?;
            let entries = source.scan().map_err(|e| InitError::CatalogUnavailable {
                path: source.location().to_path_buf(),
                source: e,
            })?;

            state.install_catalog(entries);
            let gone: Vec<ModelKey> = state
                .resident
                .keys()
                .filter(|key| !state.catalog.contains_key(*key))
                .cloned()
                .collect();
            for key in gone {
                state.resident.remove(&key);
                tracing::info!("Unloaded model {} (removed from catalog)", key);
                events.push(LoadEvent::new(&key, false));
            }
            tracing::info!("Rescanned catalog: {} models", state.catalog.len());
        }
        self.dispatch(&events);
        Ok(())
    }

    /// Call `callback` after every load and unload (including evictions).
    ///
    /// The callback stays registered while the returned guard lives.
    pub fn register_load_callback(
        &self,
        callback: impl Fn(&LoadEvent) + Send + Sync + 'static,
    ) -> LoadSubscription {
        let id = CallbackId(self.inner.next_callback.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.lock().push((id, Arc::new(callback)));
        LoadSubscription {
            id,
            inner: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Remove a callback kept with [`LoadSubscription::detach`]. Returns
    /// whether it was registered.
    pub fn unregister_load_callback(&self, id: CallbackId) -> bool {
        self.inner.remove_subscriber(id)
    }

    fn dispatch(&self, events: &[LoadEvent]) {
        if events.is_empty() {
            return;
        }
        let subscribers: Vec<LoadCallback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        tracing::debug!(
            "Dispatching {} load events to {} callbacks",
            events.len(),
            subscribers.len()
        );
        for event in events {
            for callback in &subscribers {
                callback(event);
            }
        }
    }
}

impl fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ModelCache")
            .field("initialized", &state.initialized)
            .field("cataloged", &state.catalog.len())
            .field("resident", &state.resident.len())
            .field("memory_budget", &state.memory_budget)
            .finish()
    }
}

/// Keeps a load callback registered. Dropping it unregisters the callback.
#[must_use = "dropping the subscription unregisters the callback"]
pub struct LoadSubscription {
    id: CallbackId,
    inner: Weak<Inner>,
    active: bool,
}

impl LoadSubscription {
    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// Keep the callback registered past this guard.
    pub fn detach(mut self) -> CallbackId {
        self.active = false;
        self.id
    }
}

impl Drop for LoadSubscription {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.remove_subscriber(self.id);
        }
    }
}

impl fmt::Debug for LoadSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSubscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

pub struct ModelCacheBuilder {
    engine_factory: Option<EngineFactory>,
    ticks_per_quarter: u32,
}

impl Default for ModelCacheBuilder {
    fn default() -> Self {
        Self {
            engine_factory: None,
            ticks_per_quarter: 480,
        }
    }
}

impl ModelCacheBuilder {
    /// How to create an engine for a cataloged model.
    pub fn engine_factory(
        mut self,
        factory: impl Fn(&ModelMetadata) -> Result<Box<dyn InferenceEngine>, EngineError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.engine_factory = Some(Box::new(factory));
        self
    }

    /// Resolution for sequences decoded by generative models.
    pub fn ticks_per_quarter(mut self, ticks_per_quarter: u32) -> Self {
        self.ticks_per_quarter = ticks_per_quarter;
        self
    }

    pub fn build(self) -> Result<ModelCache, ConfigError> {
        let factory = self.engine_factory.ok_or_else(|| {
            ConfigError::Invalid(
                "No engine factory configured. Use .engine_factory() to set one.".to_string(),
            )
        })?;
        if self.ticks_per_quarter == 0 {
            return Err(ConfigError::Invalid(
                "ticks_per_quarter must be greater than zero".to_string(),
            ));
        }

        Ok(ModelCache {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState {
                    initialized: false,
                    source: None,
                    models_dir: None,
                    catalog: BTreeMap::new(),
                    resident: HashMap::new(),
                    memory_budget: 0,
                    acceleration: false,
                    ticks_per_quarter: self.ticks_per_quarter,
                    clock: 0,
                }),
                subscribers: Mutex::new(Vec::new()),
                next_callback: AtomicU64::new(1),
                factory,
            }),
        })
    }
}
