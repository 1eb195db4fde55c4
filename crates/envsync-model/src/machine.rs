//! Canonical machine model
//!
//! A [`Machine`] is the format-independent view of one runtime container.
//! It carries the recipe fragment describing that container (for pod
//! recipes, the owning pod reduced to the single container) together with
//! the attributes, servers and agents merged in from the environment's
//! machine configuration.

use crate::environment::{parse_memory_attribute, MachineConfig, ServerConfig, MEMORY_LIMIT_ATTRIBUTE};
use crate::name::container_part;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Generic parsed recipe document (maps, sequences, scalars)
pub type Document = serde_yaml::Value;

/// One runtime container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    /// Machine name; composite `<pod>/<container>` for pod recipes
    pub name: String,
    /// Recipe fragment describing this machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Document>,
    /// Attributes (`memoryLimitBytes`, ...)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    /// Servers by reference name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub servers: IndexMap<String, ServerConfig>,
    /// Installed agents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<String>,
}

impl Machine {
    /// Create machine without recipe or configuration
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create machine from its environment configuration
    #[must_use]
    pub fn from_config(name: impl Into<String>, config: &MachineConfig) -> Self {
        Self {
            name: name.into(),
            recipe: None,
            attributes: config.attributes.clone(),
            servers: config.servers.clone(),
            agents: config.agents.clone(),
        }
    }

    /// Attach recipe fragment
    #[inline]
    #[must_use]
    pub fn with_recipe(mut self, recipe: Document) -> Self {
        self.recipe = Some(recipe);
        self
    }

    /// Overlay configuration onto this machine
    ///
    /// Configured attributes win over existing ones; servers and agents are
    /// taken from the configuration when it declares any.
    pub fn merge_config(&mut self, config: &MachineConfig) {
        for (key, value) in &config.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
        if !config.servers.is_empty() {
            self.servers = config.servers.clone();
        }
        if !config.agents.is_empty() {
            self.agents = config.agents.clone();
        }
    }

    /// Configuration record for this machine
    #[must_use]
    pub fn to_config(&self) -> MachineConfig {
        MachineConfig {
            attributes: self.attributes.clone(),
            servers: self.servers.clone(),
            agents: self.agents.clone(),
        }
    }

    /// `memoryLimitBytes` attribute; absent or malformed reads as `None`
    #[inline]
    #[must_use]
    pub fn memory_limit_attribute(&self) -> Option<u64> {
        parse_memory_attribute(self.attributes.get(MEMORY_LIMIT_ATTRIBUTE)?)
    }

    /// Write the `memoryLimitBytes` attribute
    #[inline]
    pub fn set_memory_limit_attribute(&mut self, bytes: u64) {
        self.attributes
            .insert(MEMORY_LIMIT_ATTRIBUTE.to_string(), bytes.to_string());
    }

    /// Display name: the container part of the machine name
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        container_part(&self.name)
    }
}
