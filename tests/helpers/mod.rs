//! Test helpers and fixtures for Maestro integration tests
//!
//! Fake engines stand in for real model runtimes:
//! - a latent model whose "latent space" is the note tensor itself, so
//!   encode/decode round trips are exact
//! - a groove model that echoes its input and summarizes timing as an embedding
//! - a passthrough for every other model kind
//!
//! Model directories are written to temp dirs with TOML sidecars, so tests go
//! through the same catalog scan as production code.

#![allow(dead_code)]

pub mod tolerances;

use maestro::{
    ClosureEngine, DirectoryCatalog, EngineError, InferenceEngine, LoadEvent, LoadSubscription,
    ModelCache, ModelKind, ModelMetadata, Note, Sequence, TensorMap,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const MB: u64 = 1024 * 1024;

/// Latent size of the fake latent model: four note records.
pub const TOY_LATENT_DIM: usize = 20;

pub const TICKS_PER_QUARTER: u32 = 480;

/// One 4/4 bar at [`TICKS_PER_QUARTER`].
pub const BAR: u32 = TICKS_PER_QUARTER * 4;

/// Latent model whose encoder pads/truncates the note tensor to
/// [`TOY_LATENT_DIM`] and whose decoder drops all-zero records.
pub fn toy_vae_engine() -> ClosureEngine {
    ClosureEngine::new(|inputs: &TensorMap| {
        let mut out = TensorMap::new();
        if let Some(x) = inputs.get("encoder_input") {
            let mut z = x.clone();
            z.resize(TOY_LATENT_DIM, 0.0);
            out.insert("z".to_string(), z);
        }
        if let Some(z) = inputs.get("z") {
            let records: Vec<f32> = z
                .chunks_exact(5)
                .filter(|r| r.iter().any(|v| *v != 0.0))
                .flatten()
                .copied()
                .collect();
            out.insert("decoder_output".to_string(), records);
        }
        Ok(out)
    })
    .with_output("z", &[1, TOY_LATENT_DIM])
}

/// Groove model that returns its input unchanged and embeds
/// `[mean start fraction, mean velocity]`.
pub fn echo_groove_engine() -> ClosureEngine {
    ClosureEngine::new(|inputs: &TensorMap| {
        let x = inputs
            .get("input_sequence")
            .ok_or("missing input_sequence")?;
        let records = (x.len() / 5).max(1) as f32;
        let mean_start = x.chunks_exact(5).map(|r| r[2]).sum::<f32>() / records;
        let mean_velocity = x.chunks_exact(5).map(|r| r[1]).sum::<f32>() / records;

        let mut out = TensorMap::new();
        out.insert("output_sequence".to_string(), x.clone());
        out.insert(
            "groove_embedding".to_string(),
            vec![mean_start, mean_velocity],
        );
        Ok(out)
    })
}

/// Returns `input` unchanged as `output`.
pub fn passthrough_engine() -> ClosureEngine {
    ClosureEngine::new(|inputs: &TensorMap| {
        let mut out = TensorMap::new();
        if let Some(x) = inputs.get("input") {
            out.insert("output".to_string(), x.clone());
        }
        Ok(out)
    })
}

/// Engine factory over the fake engines. Counts constructions; models named
/// `broken` fail to construct.
pub fn engine_factory(
    constructed: Arc<AtomicUsize>,
) -> impl Fn(&ModelMetadata) -> Result<Box<dyn InferenceEngine>, EngineError> + Send + Sync + 'static
{
    move |meta: &ModelMetadata| {
        if meta.name == "broken" {
            return Err(EngineError::Load {
                path: meta.path.clone(),
                reason: "corrupt weights".to_string(),
            });
        }
        constructed.fetch_add(1, Ordering::SeqCst);

        let engine = match meta.kind {
            ModelKind::GenerativeLatent => toy_vae_engine(),
            ModelKind::GrooveTransfer => echo_groove_engine(),
            _ => passthrough_engine(),
        };
        Ok(Box::new(
            engine
                .with_memory_usage(meta.memory_footprint_bytes)
                .with_acceleration_support(meta.supports_acceleration)
                .require_model_file(),
        ) as Box<dyn InferenceEngine>)
    }
}

/// Write `<stem>.tflite` plus a sidecar declaring `kind` and `megabytes`.
pub fn write_model(dir: &Path, stem: &str, kind: ModelKind, megabytes: u64) {
    std::fs::write(dir.join(format!("{stem}.tflite")), b"weights")
        .expect("Failed to write model file");
    let sidecar = format!(
        "name = \"{stem}\"\nkind = \"{kind}\"\nversion = \"1.0.0\"\nmemory_footprint_bytes = {}\nsupports_acceleration = true\n",
        megabytes * MB
    );
    std::fs::write(dir.join(format!("{stem}.toml")), sidecar).expect("Failed to write sidecar");
}

/// Temp models directory holding `models`.
pub fn model_dir(models: &[(&str, ModelKind, u64)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (stem, kind, megabytes) in models {
        write_model(dir.path(), stem, *kind, *megabytes);
    }
    dir
}

/// Cache over fake engines, not yet initialized.
pub fn test_cache() -> (ModelCache, Arc<AtomicUsize>) {
    init_test_logging();
    let constructed = Arc::new(AtomicUsize::new(0));
    let cache = ModelCache::builder()
        .engine_factory(engine_factory(Arc::clone(&constructed)))
        .ticks_per_quarter(TICKS_PER_QUARTER)
        .build()
        .expect("Failed to build test cache");
    (cache, constructed)
}

/// Route cache logs to the test harness output. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Cache initialized over a temp directory of `models`.
pub fn cache_with_models(
    budget: u64,
    models: &[(&str, ModelKind, u64)],
) -> (ModelCache, Arc<AtomicUsize>, TempDir) {
    let dir = model_dir(models);
    let (cache, constructed) = test_cache();
    cache
        .initialize(DirectoryCatalog::new(dir.path()), budget, false)
        .expect("Failed to initialize test cache");
    (cache, constructed, dir)
}

/// Records every load event a cache emits.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<LoadEvent>>>);

impl EventLog {
    pub fn attach(cache: &ModelCache) -> (Self, LoadSubscription) {
        let log = Self::default();
        let sink = log.clone();
        let subscription = cache.register_load_callback(move |event| sink.0.lock().push(event.clone()));
        (log, subscription)
    }

    /// Drain recorded events as `(name, loaded)` pairs.
    pub fn take(&self) -> Vec<(String, bool)> {
        self.0
            .lock()
            .drain(..)
            .map(|e| (e.name, e.loaded))
            .collect()
    }
}

pub fn loaded(name: &str) -> (String, bool) {
    (name.to_string(), true)
}

pub fn unloaded(name: &str) -> (String, bool) {
    (name.to_string(), false)
}

/// Four-on-the-floor kick plus off-beat hats, one bar.
pub fn drum_bar() -> Sequence {
    let kicks = (0..4).map(|beat| Note::new(36, 110, beat * TICKS_PER_QUARTER, 120).percussion());
    let hats = (0..4).map(|beat| {
        Note::new(42, 80, beat * TICKS_PER_QUARTER + TICKS_PER_QUARTER / 2, 60).percussion()
    });
    let mut seq = Sequence::new(TICKS_PER_QUARTER, BAR).with_notes(kicks.chain(hats));
    seq.sort_by_start();
    seq
}

/// Short C major phrase, one bar.
pub fn melody_bar() -> Sequence {
    Sequence::new(TICKS_PER_QUARTER, BAR).with_notes([
        Note::new(60, 90, 0, 480),
        Note::new(64, 85, 480, 480),
        Note::new(67, 95, 960, 480),
        Note::new(72, 100, 1440, 480),
    ])
}
