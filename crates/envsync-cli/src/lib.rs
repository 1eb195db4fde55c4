//! envsync command implementations
//!
//! Each command takes a parsed environment and the manager registry and
//! returns a JSON-serializable result. Argument parsing, logging setup and
//! printing live in the binary.

#![warn(unreachable_pub)]

use anyhow::{anyhow, bail, Context, Result};
use envsync_manager::{EnvironmentManager, EnvironmentRegistry, MachineSource, ManagerConfig};
use envsync_model::{limit_string_to_bytes, Environment, Machine, Validation};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// Path argument meaning standard input
pub const STDIN_PATH: &str = "-";

/// Machine as reported by `envsync machines`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineView {
    /// Machine name (configuration key)
    pub name: String,
    /// Name shown to users
    pub display_name: String,
    /// Memory limit in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_bytes: Option<u64>,
    /// Image source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<MachineSource>,
    /// Environment variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_variables: Option<IndexMap<String, String>>,
    /// Whether the machine has a recipe fragment
    pub in_recipe: bool,
}

impl MachineView {
    /// Describe `machine` through `manager`
    #[must_use]
    pub fn new(manager: &dyn EnvironmentManager, machine: &Machine) -> Self {
        Self {
            name: machine.name.clone(),
            display_name: manager.get_machine_name(machine),
            memory_limit_bytes: manager.get_memory_limit(machine),
            source: manager.get_source(machine),
            env_variables: manager.get_env_variables(machine),
            in_recipe: machine.recipe.is_some(),
        }
    }
}

/// Load manager configuration, defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<ManagerConfig> {
    match path {
        Some(path) => ManagerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(ManagerConfig::default()),
    }
}

/// Read an environment from a JSON file, or stdin for `-`
pub fn read_environment(path: &Path) -> Result<Environment> {
    let text = if path.as_os_str() == STDIN_PATH {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read environment from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read environment from {}", path.display()))?
    };
    parse_environment(&text)
}

/// Parse environment JSON
pub fn parse_environment(text: &str) -> Result<Environment> {
    serde_json::from_str(text).context("invalid environment JSON")
}

/// Memory limit from plain bytes or a limit string (`512Mi`)
pub fn parse_memory(value: &str) -> Result<u64> {
    let value = value.trim();
    let bytes = match value.parse::<u64>() {
        Ok(bytes) => bytes,
        Err(_) => limit_string_to_bytes(value)
            .ok_or_else(|| anyhow!("'{value}' is neither a byte count nor a memory limit"))?,
    };
    if bytes == 0 {
        bail!("memory limit must be positive");
    }
    Ok(bytes)
}

fn manager_for<'a>(registry: &'a EnvironmentRegistry, environment: &Environment) -> Result<&'a dyn EnvironmentManager> {
    registry
        .manager_for(environment)
        .ok_or_else(|| anyhow!("unsupported recipe type '{}'", environment.recipe_type()))
}

/// Machines of the environment
pub fn machines(registry: &EnvironmentRegistry, environment: &Environment) -> Result<Vec<MachineView>> {
    let manager = manager_for(registry, environment)?;
    Ok(manager
        .get_machines(environment)
        .iter()
        .map(|machine| MachineView::new(manager, machine))
        .collect())
}

/// Rename a machine
pub fn rename(
    registry: &EnvironmentRegistry,
    environment: &Environment,
    old_name: &str,
    new_name: &str,
) -> Result<Environment> {
    let manager = manager_for(registry, environment)?;
    manager
        .rename_machine(environment, old_name, new_name)
        .with_context(|| format!("failed to rename '{old_name}' to '{new_name}'"))
}

/// Set the memory limit of a machine
pub fn set_memory(
    registry: &EnvironmentRegistry,
    environment: &Environment,
    machine_name: &str,
    bytes: u64,
) -> Result<Environment> {
    let manager = manager_for(registry, environment)?;
    let mut machines = manager.get_machines(environment);
    let machine = machines
        .iter_mut()
        .find(|machine| machine.name == machine_name)
        .ok_or_else(|| anyhow!("machine '{machine_name}' not found"))?;
    manager.set_memory_limit(machine, bytes);
    Ok(manager.get_environment(environment, &machines))
}

/// Add a default machine
pub fn add(registry: &EnvironmentRegistry, environment: &Environment) -> Result<Environment> {
    let manager = manager_for(registry, environment)?;
    if !manager.can_add_machines() {
        bail!("'{}' recipes do not support adding machines", manager.recipe_type());
    }
    let machine = manager
        .create_new_default_machine(environment)
        .context("failed to create machine")?;
    manager
        .add_machine(environment, &machine)
        .with_context(|| format!("failed to add machine '{}'", machine.name))
}

/// Delete a machine
pub fn delete(registry: &EnvironmentRegistry, environment: &Environment, machine_name: &str) -> Result<Environment> {
    let manager = manager_for(registry, environment)?;
    if !manager.can_delete_machines() {
        bail!("'{}' recipes do not support deleting machines", manager.recipe_type());
    }
    manager
        .delete_machine(environment, machine_name)
        .with_context(|| format!("failed to delete machine '{machine_name}'"))
}

/// Validate the environment
pub fn validate(registry: &EnvironmentRegistry, environment: &Environment) -> Validation {
    match registry.manager_for(environment) {
        Some(manager) => manager.validate_environment(environment),
        None => Validation::invalid(format!(
            "unsupported recipe type '{}'",
            environment.recipe_type()
        )),
    }
}

/// Supported recipe types
#[must_use]
pub fn types(registry: &EnvironmentRegistry) -> Vec<String> {
    registry.types().into_iter().map(str::to_string).collect()
}

/// Pretty JSON for stdout
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to encode JSON")
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_arguments() {
        assert_eq!(parse_memory("1024").unwrap(), 1024);
        assert_eq!(parse_memory("512Mi").unwrap(), 512 * 1024 * 1024);
        assert!(parse_memory("512XYZ").is_err());
        assert!(parse_memory("0").is_err());
    }

    #[test]
    fn environment_json() {
        let env = parse_environment(
            r#"{"recipe": {"type": "dockerimage", "content": "alpine"}, "machines": {}}"#,
        )
        .unwrap();
        assert_eq!(env.recipe_type(), "dockerimage");
        assert!(parse_environment("{").is_err());
    }
}
