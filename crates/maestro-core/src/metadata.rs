//! Catalog metadata for models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// What a model does. Determines which typed variant it loads as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Latent-variable sequence model (encode/decode/sample/interpolate).
    GenerativeLatent,
    /// Groove extraction and transfer.
    GrooveTransfer,
    MelodyCompletion,
    StyleTransfer,
    GainStaging,
    EmotionMapping,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::GenerativeLatent,
        ModelKind::GrooveTransfer,
        ModelKind::MelodyCompletion,
        ModelKind::StyleTransfer,
        ModelKind::GainStaging,
        ModelKind::EmotionMapping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerativeLatent => "generative_latent",
            Self::GrooveTransfer => "groove_transfer",
            Self::MelodyCompletion => "melody_completion",
            Self::StyleTransfer => "style_transfer",
            Self::GainStaging => "gain_staging",
            Self::EmotionMapping => "emotion_mapping",
        }
    }

    /// Infer kind from a model file name, e.g. `groovae_2bar.tflite`.
    pub fn from_stem(stem: &str) -> Option<Self> {
        let name = stem.to_lowercase();

        if name.contains("groove") || name.contains("groovae") {
            Some(Self::GrooveTransfer)
        } else if name.contains("vae") {
            Some(Self::GenerativeLatent)
        } else if name.contains("melody") || name.contains("rnn") {
            Some(Self::MelodyCompletion)
        } else if name.contains("style") || name.contains("gan") {
            Some(Self::StyleTransfer)
        } else if name.contains("gain") {
            Some(Self::GainStaging)
        } else if name.contains("emotion") {
            Some(Self::EmotionMapping)
        } else {
            None
        }
    }

    /// Infer kind from a model path's file stem.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .and_then(Self::from_stem)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog key: one model per (kind, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelKey {
    pub kind: ModelKind,
    pub name: String,
}

impl ModelKey {
    pub fn new(kind: ModelKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Read-only description of a cataloged model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub kind: ModelKind,
    pub version: String,
    /// Approximate resident size, used for budget accounting.
    pub memory_footprint_bytes: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_quantized: bool,
    #[serde(default)]
    pub supports_acceleration: bool,
    /// Model file location.
    #[serde(default)]
    pub path: PathBuf,
}

impl ModelMetadata {
    pub fn new(kind: ModelKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            version: "0.0.0".to_string(),
            memory_footprint_bytes: 0,
            description: String::new(),
            is_quantized: false,
            supports_acceleration: false,
            path: PathBuf::new(),
        }
    }

    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.kind, self.name.clone())
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_footprint(mut self, bytes: u64) -> Self {
        self.memory_footprint_bytes = bytes;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn quantized(mut self, is_quantized: bool) -> Self {
        self.is_quantized = is_quantized;
        self
    }

    pub fn accelerated(mut self, supports_acceleration: bool) -> Self {
        self.supports_acceleration = supports_acceleration;
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
}
