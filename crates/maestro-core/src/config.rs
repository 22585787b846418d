//! Model cache configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for a model cache.
///
/// # Example TOML:
/// ```toml
/// models_dir = "/usr/share/maestro/models"
/// memory_budget_bytes = 268435456
/// acceleration = true
/// ticks_per_quarter = 480
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub models_dir: PathBuf,
    /// Soft limit on resident model bytes. `0` means unlimited.
    pub memory_budget_bytes: u64,
    pub acceleration: bool,
    /// Resolution used when decoding model output into sequences.
    pub ticks_per_quarter: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("./models"),
            memory_budget_bytes: 0,
            acceleration: false,
            ticks_per_quarter: 480,
        }
    }
}

impl CacheConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!("Loaded cache config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_quarter == 0 {
            return Err(ConfigError::Invalid(
                "ticks_per_quarter must be greater than zero".to_string(),
            ));
        }
        if self.models_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("models_dir is empty".to_string()));
        }
        Ok(())
    }
}
