//! Environment validation
//!
//! Checks shared by every recipe type, followed by the manager's own
//! [`validate_recipe`](EnvironmentManager::validate_recipe). All problems
//! are collected; nothing stops at the first one.

use crate::manager::EnvironmentManager;
use envsync_model::{Environment, MachineConfig, Validation, MEMORY_LIMIT_ATTRIBUTE};
use once_cell::sync::Lazy;
use regex::Regex;

static MACHINE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]+([a-zA-Z0-9_/-]*[a-zA-Z0-9])?$").expect("machine name pattern is valid")
});

static SERVER_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9]+[0-9]*(/(tcp|udp))?$").expect("port pattern is valid"));

static SERVER_PROTOCOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9+.\-]*$").expect("protocol pattern is valid"));

/// Whether `name` is acceptable as a machine name
#[must_use]
pub fn is_valid_machine_name(name: &str) -> bool {
    MACHINE_NAME.is_match(name)
}

/// Validate `environment` against `manager`
pub fn validate_environment<M>(manager: &M, environment: &Environment) -> Validation
where
    M: EnvironmentManager + ?Sized,
{
    let mut errors = Vec::new();

    if !environment.recipe_type().eq_ignore_ascii_case(manager.recipe_type()) {
        errors.push(format!(
            "recipe type '{}' is not handled by the '{}' manager",
            environment.recipe_type(),
            manager.recipe_type()
        ));
    }

    let machines = manager.get_machines(environment);
    if machines.is_empty() {
        errors.push("environment should contain at least one machine".to_string());
    }
    for machine in &machines {
        if !is_valid_machine_name(&machine.name) {
            errors.push(format!("machine name '{}' is invalid", machine.name));
        }
    }

    for (name, config) in &environment.machines {
        config_problems(name, config, &mut errors);
    }

    errors.extend(manager.validate_recipe(environment));
    Validation::from_errors(errors)
}

fn config_problems(name: &str, config: &MachineConfig, errors: &mut Vec<String>) {
    if let Some(limit) = config.attributes.get(MEMORY_LIMIT_ATTRIBUTE) {
        if !matches!(limit.trim().parse::<u64>(), Ok(bytes) if bytes > 0) {
            errors.push(format!(
                "machine '{name}': {MEMORY_LIMIT_ATTRIBUTE} should be a positive integer, found '{limit}'"
            ));
        }
    }

    for (reference, server) in &config.servers {
        if !SERVER_PORT.is_match(&server.port) {
            errors.push(format!(
                "machine '{name}': server '{reference}' has invalid port '{}'",
                server.port
            ));
        }
        if let Some(protocol) = &server.protocol {
            if !SERVER_PROTOCOL.is_match(protocol) {
                errors.push(format!(
                    "machine '{name}': server '{reference}' has invalid protocol '{protocol}'"
                ));
            }
        }
    }
}
