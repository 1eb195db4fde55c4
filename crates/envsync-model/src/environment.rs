//! Environment configuration
//!
//! The structured side of an environment: a recipe reference and the
//! per-machine configuration map, in the workspace API's JSON shape.

use crate::units::limit_string_to_bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Machine attribute holding the memory limit in bytes
pub const MEMORY_LIMIT_ATTRIBUTE: &str = "memoryLimitBytes";

/// Recipe reference embedded in an environment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Recipe type tag (`openshift`, `compose`, `dockerfile`, `dockerimage`)
    #[serde(rename = "type")]
    pub recipe_type: String,
    /// Raw recipe text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// MIME type of the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Location the content was fetched from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Recipe {
    /// Create recipe with inline content
    #[inline]
    #[must_use]
    pub fn new(recipe_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            recipe_type: recipe_type.into(),
            content: Some(content.into()),
            content_type: None,
            location: None,
        }
    }

    /// Set content type
    #[inline]
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Non-empty content, if any
    #[inline]
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Server exposed by a machine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port, optionally with protocol suffix (`8080/tcp`)
    pub port: String,
    /// URL protocol (`http`, `ws`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// URL path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Free-form server attributes
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
}

impl ServerConfig {
    /// Create server on port
    #[inline]
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Set protocol
    #[inline]
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }
}

/// Per-machine configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineConfig {
    /// Machine attributes (`memoryLimitBytes`, ...)
    #[serde(
        default,
        deserialize_with = "deserialize_attributes",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub attributes: IndexMap<String, String>,
    /// Servers by reference name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub servers: IndexMap<String, ServerConfig>,
    /// Agents installed into the machine
    #[serde(default, alias = "installers", skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<String>,
}

impl MachineConfig {
    /// Create empty config
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With memory limit attribute
    #[inline]
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.attributes
            .insert(MEMORY_LIMIT_ATTRIBUTE.to_string(), bytes.to_string());
        self
    }

    /// With server
    #[inline]
    #[must_use]
    pub fn with_server(mut self, name: impl Into<String>, server: ServerConfig) -> Self {
        self.servers.insert(name.into(), server);
        self
    }

    /// With agent
    #[inline]
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agents.push(agent.into());
        self
    }

    /// Memory limit attribute; malformed values read as absent
    #[inline]
    #[must_use]
    pub fn memory_limit(&self) -> Option<u64> {
        parse_memory_attribute(self.attributes.get(MEMORY_LIMIT_ATTRIBUTE)?)
    }
}

/// Environment: recipe plus machine configuration map
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Embedded recipe
    pub recipe: Recipe,
    /// Machine configs keyed by machine name
    #[serde(default)]
    pub machines: IndexMap<String, MachineConfig>,
}

impl Environment {
    /// Create environment without machine configs
    #[inline]
    #[must_use]
    pub fn new(recipe: Recipe) -> Self {
        Self {
            recipe,
            machines: IndexMap::new(),
        }
    }

    /// With machine config
    #[inline]
    #[must_use]
    pub fn with_machine(mut self, name: impl Into<String>, config: MachineConfig) -> Self {
        self.machines.insert(name.into(), config);
        self
    }

    /// Recipe type tag
    #[inline]
    #[must_use]
    pub fn recipe_type(&self) -> &str {
        &self.recipe.recipe_type
    }

    /// Non-empty recipe content
    #[inline]
    #[must_use]
    pub fn recipe_content(&self) -> Option<&str> {
        self.recipe.content()
    }

    /// Configured machine names, in order
    #[inline]
    pub fn machine_names(&self) -> impl Iterator<Item = &str> {
        self.machines.keys().map(String::as_str)
    }
}

/// Parse a `memoryLimitBytes` value
///
/// Plain integers are the canonical form; limit strings (`512Mi`) are
/// tolerated. Anything else reads as absent.
pub(crate) fn parse_memory_attribute(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>()
        .ok()
        .or_else(|| limit_string_to_bytes(raw))
}

/// Attribute maps arrive with numbers or booleans as values; keep their text.
fn deserialize_attributes<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some((key, text)),
            other => Some((key, other.to_string())),
        })
        .collect())
}
