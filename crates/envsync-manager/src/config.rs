//! Manager configuration
//!
//! Defaults used when fabricating machines and writing recipe limits.
//! Loadable from TOML; missing keys take their default.

use crate::error::ConfigError;
use envsync_model::{MemoryUnit, DEFAULT_MEMORY_LIMIT_BYTES};
use envsync_recipe::MAX_RECIPE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shared configuration for every environment manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Memory limit given to machines that have none
    pub default_memory_limit_bytes: u64,
    /// Container name of a fabricated pod machine
    pub default_container_name: String,
    /// Image of a fabricated machine
    pub default_image: String,
    /// Port exposed by a fabricated pod container
    pub default_container_port: u16,
    /// Name prefix for fabricated compose services
    pub default_machine_prefix: String,
    /// Machine name for single-machine recipes without configuration
    pub default_machine_name: String,
    /// Unit used when writing container limit strings
    pub limit_unit: MemoryUnit,
    /// Largest recipe accepted by the codecs, in bytes
    pub max_recipe_size: usize,
}

impl ManagerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML configuration
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load TOML configuration from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With default memory limit
    #[inline]
    #[must_use]
    pub fn with_default_memory_limit(mut self, bytes: u64) -> Self {
        self.default_memory_limit_bytes = bytes;
        self
    }

    /// With default image
    #[inline]
    #[must_use]
    pub fn with_default_image(mut self, image: impl Into<String>) -> Self {
        self.default_image = image.into();
        self
    }

    /// With default container name
    #[inline]
    #[must_use]
    pub fn with_default_container_name(mut self, name: impl Into<String>) -> Self {
        self.default_container_name = name.into();
        self
    }

    /// With limit unit
    #[inline]
    #[must_use]
    pub fn with_limit_unit(mut self, unit: MemoryUnit) -> Self {
        self.limit_unit = unit;
        self
    }

    /// With maximum recipe size
    #[inline]
    #[must_use]
    pub fn with_max_recipe_size(mut self, bytes: usize) -> Self {
        self.max_recipe_size = bytes;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            default_container_name: "main".to_string(),
            default_image: "rhche/centos_jdk8:latest".to_string(),
            default_container_port: 8080,
            default_machine_prefix: "machine".to_string(),
            default_machine_name: "dev-machine".to_string(),
            limit_unit: MemoryUnit::Mi,
            max_recipe_size: MAX_RECIPE_SIZE,
        }
    }
}
