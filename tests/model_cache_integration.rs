//! Integration tests for the model cache
//!
//! Covers the cache through its public API over a real directory catalog:
//! - Lifecycle: initialize, load, get, unload, rescan
//! - Memory budget: LRU eviction, soft limit, budget changes
//! - Notifications: load/unload callbacks, re-entrancy, failure paths
//! - Concurrency: shared instances across threads
//!
//! Run with:
//! ```bash
//! cargo test -p maestro --test model_cache_integration
//! ```

mod helpers;

use helpers::*;
use maestro::{
    CacheConfig, InitError, LoadError, LoadEvent, ModelCache, ModelHandle, ModelKind,
    StaticCatalog,
};
use proptest::prelude::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

const GEN: ModelKind = ModelKind::GenerativeLatent;
const GROOVE: ModelKind = ModelKind::GrooveTransfer;
const STYLE: ModelKind = ModelKind::StyleTransfer;

#[test]
fn test_budget_scenario_evicts_least_recent() {
    let (cache, _, _dir) = cache_with_models(
        40 * MB,
        &[("a", GEN, 22), ("b", GROOVE, 18), ("c", STYLE, 16)],
    );
    let (log, _sub) = EventLog::attach(&cache);

    cache.load(GEN, "a").unwrap();
    cache.load(GROOVE, "b").unwrap();
    cache.load(STYLE, "c").unwrap();

    assert_eq!(
        log.take(),
        [loaded("a"), loaded("b"), unloaded("a"), loaded("c")]
    );
    assert!(!cache.is_resident(GEN, "a"));
    assert!(cache.is_resident(GROOVE, "b"));
    assert!(cache.is_resident(STYLE, "c"));
    assert_eq!(cache.total_resident_bytes(), 34 * MB);
}

#[test]
fn test_get_after_load_is_same_instance() {
    let (cache, constructed, _dir) = cache_with_models(0, &[("musicvae", GEN, 10)]);

    cache.load(GEN, "musicvae").unwrap();
    let a = cache.get(GEN, "musicvae").unwrap();
    let b = cache.get(GEN, "musicvae").unwrap();
    assert!(ModelHandle::ptr_eq(&a, &b));
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert_eq!(a.memory_usage(), 10 * MB);
}

#[test]
fn test_handle_outlives_eviction() {
    let (cache, _, _dir) = cache_with_models(
        20 * MB,
        &[("musicvae", GEN, 15), ("groovae", GROOVE, 15)],
    );
    let vae = cache.get(GEN, "musicvae").unwrap();
    cache.load(GROOVE, "groovae").unwrap();

    assert!(!cache.is_resident(GEN, "musicvae"));
    let model = vae.as_generative().unwrap();
    let z = model.encode(&melody_bar()).unwrap();
    assert_eq!(z.len(), TOY_LATENT_DIM);
}

#[test]
fn test_failed_load_leaves_no_entry() {
    let (cache, _, _dir) = cache_with_models(
        40 * MB,
        &[("a", GEN, 22), ("b", GROOVE, 18), ("broken", STYLE, 16)],
    );
    let (log, _sub) = EventLog::attach(&cache);
    cache.load(GEN, "a").unwrap();
    cache.load(GROOVE, "b").unwrap();
    log.take();

    let err = cache.load(STYLE, "broken").unwrap_err();
    assert!(matches!(err, LoadError::EngineInitFailed { .. }));
    assert!(cache.get(STYLE, "broken").is_none());
    assert!(!cache.is_resident(STYLE, "broken"));
    assert_eq!(log.take(), [unloaded("a")]);
    assert_eq!(cache.list_resident().len(), 1);
}

#[test]
fn test_missing_model_file_fails_load() {
    let (cache, _, dir) = cache_with_models(0, &[("musicvae", GEN, 10)]);
    std::fs::remove_file(dir.path().join("musicvae.tflite")).unwrap();

    assert!(matches!(
        cache.load(GEN, "musicvae"),
        Err(LoadError::EngineInitFailed { .. })
    ));
    assert_eq!(cache.total_resident_bytes(), 0);
}

#[test]
fn test_initialize_with_config_file() {
    let models = model_dir(&[("musicvae", GEN, 100), ("groovae", GROOVE, 50)]);
    let config_dir = tempfile::tempdir().unwrap();
    let config_path = config_dir.path().join("maestro.toml");
    std::fs::write(
        &config_path,
        format!(
            "models_dir = {:?}\nmemory_budget_bytes = {}\nacceleration = true\n",
            models.path().display().to_string(),
            120 * MB
        ),
    )
    .unwrap();

    let (cache, _) = test_cache();
    let config = CacheConfig::load(&config_path).unwrap();
    cache.initialize_with_config(&config).unwrap();

    assert_eq!(cache.memory_budget(), 120 * MB);
    assert!(cache.is_acceleration_enabled());
    assert_eq!(cache.list_available().len(), 2);

    cache.load(GEN, "musicvae").unwrap();
    assert!(cache.is_acceleration_available());
    cache.load(GROOVE, "groovae").unwrap();
    assert_eq!(cache.list_resident().len(), 1);

    assert!(matches!(
        cache.initialize_with_config(&config),
        Err(InitError::AlreadyInitialized)
    ));
}

#[test]
fn test_missing_models_dir() {
    let (cache, _) = test_cache();
    let dir = tempfile::tempdir().unwrap();
    let err = cache
        .initialize(StaticCatalog::builtin(dir.path().join("gone")), 0, false)
        .unwrap_err();
    assert!(matches!(err, InitError::CatalogUnavailable { .. }));

    let umbrella: maestro::Error = err.into();
    assert!(umbrella.to_string().contains("Catalog unavailable"));
}

#[test]
fn test_callback_can_query_cache() {
    let (cache, _, _dir) = cache_with_models(0, &[("musicvae", GEN, 10)]);
    let probe = cache.clone();
    let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    let _sub = cache.register_load_callback(move |event: &LoadEvent| {
        sink.lock().push((
            event.loaded,
            probe.is_resident(event.kind, &event.name),
            probe.total_resident_bytes(),
        ));
    });

    cache.load(GEN, "musicvae").unwrap();
    cache.unload(GEN, "musicvae").unwrap();
    assert_eq!(*observed.lock(), [(true, true, 10 * MB), (false, false, 0)]);
}

#[test]
fn test_rescan_picks_up_new_models() {
    let (cache, _, dir) = cache_with_models(0, &[("musicvae", GEN, 10)]);
    assert!(cache.get(GROOVE, "groovae").is_none());

    write_model(dir.path(), "groovae", GROOVE, 5);
    cache.rescan().unwrap();
    assert!(cache.get(GROOVE, "groovae").is_some());
}

#[test]
fn test_concurrent_gets_share_one_instance() {
    let (cache, constructed, _dir) = cache_with_models(0, &[("groovae", GROOVE, 10)]);

    let handles: Vec<ModelHandle> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || cache.get(GROOVE, "groovae").unwrap())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect();

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(handles.windows(2).all(|w| ModelHandle::ptr_eq(&w[0], &w[1])));
}

#[derive(Debug, Clone)]
enum Op {
    Load(usize),
    Unload(usize),
    Budget(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..5usize).prop_map(Op::Load),
        (0..5usize).prop_map(Op::Unload),
        (0..80u64).prop_map(Op::Budget),
    ]
}

const NAMES: [&str; 5] = ["m0", "m1", "m2", "m3", "m4"];

fn budget_cache() -> (ModelCache, tempfile::TempDir) {
    let models: Vec<(&str, ModelKind, u64)> = NAMES
        .iter()
        .zip([22u64, 18, 16, 9, 30])
        .map(|(name, mb)| (*name, STYLE, mb))
        .collect();
    let (cache, _, dir) = cache_with_models(40 * MB, &models);
    (cache, dir)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_budget_holds_with_multiple_residents(ops in proptest::collection::vec(op(), 1..40)) {
        let (cache, _dir) = budget_cache();
        for op in ops {
            match op {
                Op::Load(i) => cache.load(STYLE, NAMES[i]).unwrap(),
                Op::Unload(i) => cache.unload(STYLE, NAMES[i]).unwrap(),
                Op::Budget(mb) => cache.set_memory_budget(mb * MB),
            }

            let budget = cache.memory_budget();
            let resident = cache.list_resident();
            let sum: u64 = resident.iter().map(|m| m.memory_footprint_bytes).sum();
            prop_assert_eq!(sum, cache.total_resident_bytes());
            if budget > 0 && resident.len() > 1 {
                prop_assert!(sum <= budget, "{} bytes resident over budget {}", sum, budget);
            }
        }
    }
}
