//! Catalog sources: where the cache learns which models exist.
//!
//! A [`DirectoryCatalog`] scans a models directory for model files and their
//! TOML sidecars. A [`StaticCatalog`] serves a fixed list, which is what the
//! built-in model set and most tests use.

use crate::error::CatalogError;
use maestro_core::{ModelKind, ModelMetadata};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File extensions recognized as model files.
pub const MODEL_EXTENSIONS: [&str; 6] = ["tflite", "onnx", "safetensors", "pt", "pth", "bin"];

/// Supplies catalog entries for a model location.
pub trait CatalogSource: Send + Sync {
    /// The models directory this source describes.
    fn location(&self) -> &Path;

    /// Enumerate the models at [`location`](Self::location).
    fn scan(&self) -> Result<Vec<ModelMetadata>, CatalogError>;
}

/// Sidecar metadata, read from `<stem>.toml` next to a model file.
///
/// # Example TOML:
/// ```toml
/// name = "MusicVAE"
/// kind = "generative_latent"
/// version = "1.0.0"
/// memory_footprint_bytes = 104857600
/// description = "2-bar melody model"
/// quantized = true
/// supports_acceleration = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: Option<String>,
    pub kind: Option<ModelKind>,
    pub version: Option<String>,
    pub memory_footprint_bytes: Option<u64>,
    pub description: Option<String>,
    pub quantized: Option<bool>,
    pub supports_acceleration: Option<bool>,
}

/// Read the sidecar for `model_path`, if one exists and parses.
pub fn load_model_config(model_path: &Path) -> Option<ModelConfig> {
    let toml_path = model_path.with_extension("toml");

    if !toml_path.is_file() {
        return None;
    }

    let contents = match std::fs::read_to_string(&toml_path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", toml_path.display(), e);
            return None;
        }
    };

    match toml::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring malformed sidecar {}: {}", toml_path.display(), e);
            None
        }
    }
}

pub fn is_model_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_lowercase();
                MODEL_EXTENSIONS.contains(&e.as_str())
            })
            .unwrap_or(false)
}

/// Scans one directory (non-recursive) for model files.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Metadata for one model file: sidecar values first, inferred values
    /// for anything the sidecar leaves out.
    fn describe(path: &Path) -> Result<Option<ModelMetadata>, CatalogError> {
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem,
            None => return Ok(None),
        };
        let config = load_model_config(path).unwrap_or_default();

        let kind = match config.kind.or_else(|| ModelKind::from_stem(stem)) {
            Some(kind) => kind,
            None => {
                tracing::warn!(
                    "Skipping {}: model kind not declared and not inferable from name",
                    path.display()
                );
                return Ok(None);
            }
        };

        let footprint = match config.memory_footprint_bytes {
            Some(bytes) => bytes,
            None => std::fs::metadata(path)?.len(),
        };

        let meta = ModelMetadata::new(kind, config.name.unwrap_or_else(|| stem.to_string()))
            .with_version(config.version.unwrap_or_else(|| "0.0.0".to_string()))
            .with_footprint(footprint)
            .with_description(config.description.unwrap_or_default())
            .quantized(config.quantized.unwrap_or(false))
            .accelerated(config.supports_acceleration.unwrap_or(false))
            .with_path(path);

        Ok(Some(meta))
    }
}

impl CatalogSource for DirectoryCatalog {
    fn location(&self) -> &Path {
        &self.root
    }

    fn scan(&self) -> Result<Vec<ModelMetadata>, CatalogError> {
        if !self.root.exists() {
            return Err(CatalogError::Missing(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(CatalogError::NotADirectory(self.root.clone()));
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if is_model_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut found = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(meta) = Self::describe(&path)? {
                tracing::debug!("Cataloged {} from {}", meta.key(), path.display());
                found.push(meta);
            }
        }

        Ok(found)
    }
}

/// A fixed list of catalog entries rooted at a location.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    root: PathBuf,
    entries: Vec<ModelMetadata>,
}

impl StaticCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, meta: ModelMetadata) -> Self {
        self.entries.push(meta);
        self
    }

    /// The stock model set: MusicVAE, GrooVAE and MelodyRNN.
    pub fn builtin(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let stock = [
            (
                ModelKind::GenerativeLatent,
                "MusicVAE",
                100u64,
                "MusicVAE model for pattern generation",
                "musicvae.tflite",
            ),
            (
                ModelKind::GrooveTransfer,
                "GrooVAE",
                50,
                "GrooVAE model for groove modeling",
                "groovae.tflite",
            ),
            (
                ModelKind::MelodyCompletion,
                "MelodyRNN",
                30,
                "MelodyRNN model for melodic completion",
                "melody_rnn.tflite",
            ),
        ];

        let entries = stock
            .into_iter()
            .map(|(kind, name, mib, description, file)| {
                ModelMetadata::new(kind, name)
                    .with_version("1.0.0")
                    .with_footprint(mib * 1024 * 1024)
                    .with_description(description)
                    .quantized(true)
                    .accelerated(true)
                    .with_path(root.join(file))
            })
            .collect();

        Self { root, entries }
    }

    pub fn entries(&self) -> &[ModelMetadata] {
        &self.entries
    }
}

impl CatalogSource for StaticCatalog {
    fn location(&self) -> &Path {
        &self.root
    }

    fn scan(&self) -> Result<Vec<ModelMetadata>, CatalogError> {
        if !self.root.exists() {
            return Err(CatalogError::Missing(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(CatalogError::NotADirectory(self.root.clone()));
        }
        Ok(self.entries.clone())
    }
}
