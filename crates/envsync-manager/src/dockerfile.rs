//! Dockerfile environment manager
//!
//! A Dockerfile builds exactly one machine. Its fragment is the whole
//! instruction document; memory lives only in configuration.

use crate::base;
use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::manager::{EnvironmentManager, MachineSource};
use envsync_model::{Environment, Machine};
use envsync_recipe::dockerfile::{env_variables, from_image, set_env_variables, set_from_image};
use envsync_recipe::{DockerfileCodec, RecipeCodec, ValidationError};
use indexmap::IndexMap;

/// Manager for `dockerfile` recipes
#[derive(Debug, Clone)]
pub struct DockerfileEnvironmentManager {
    config: ManagerConfig,
    codec: DockerfileCodec,
}

impl DockerfileEnvironmentManager {
    /// Recipe type tag
    pub const TYPE: &'static str = "dockerfile";

    /// Create manager
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        let codec = DockerfileCodec::new().with_max_size(config.max_recipe_size);
        Self { config, codec }
    }
}

impl Default for DockerfileEnvironmentManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl EnvironmentManager for DockerfileEnvironmentManager {
    fn recipe_type(&self) -> &'static str {
        Self::TYPE
    }

    fn editor_mode(&self) -> &'static str {
        "text/x-dockerfile"
    }

    fn codec(&self) -> &dyn RecipeCodec {
        &self.codec
    }

    fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn get_machines(&self, environment: &Environment) -> Vec<Machine> {
        base::single_recipe_machines(self, environment)
    }

    fn get_environment(&self, environment: &Environment, machines: &[Machine]) -> Environment {
        base::single_recipe_environment(self, environment, machines)
    }

    fn get_machine_name(&self, machine: &Machine) -> String {
        machine.name.clone()
    }

    fn get_source(&self, machine: &Machine) -> Option<MachineSource> {
        let image = from_image(machine.recipe.as_ref()?)?;
        Some(MachineSource::Image {
            image: image.to_string(),
        })
    }

    fn set_source(&self, machine: &mut Machine, image: &str) -> Result<(), ManagerError> {
        let document = machine
            .recipe
            .as_mut()
            .ok_or_else(|| ManagerError::MissingRecipeFragment(machine.name.clone()))?;
        if set_from_image(document, image) {
            Ok(())
        } else {
            Err(ManagerError::Structure(ValidationError::MissingSection("FROM".to_string())))
        }
    }

    fn can_edit_env_variables(&self, machine: &Machine) -> bool {
        machine.recipe.is_some()
    }

    fn get_env_variables(&self, machine: &Machine) -> Option<IndexMap<String, String>> {
        machine.recipe.as_ref().map(env_variables)
    }

    fn set_env_variables(
        &self,
        machine: &mut Machine,
        variables: &IndexMap<String, String>,
    ) -> Result<(), ManagerError> {
        let document = machine
            .recipe
            .as_mut()
            .ok_or_else(|| ManagerError::MissingRecipeFragment(machine.name.clone()))?;
        if set_env_variables(document, variables) {
            Ok(())
        } else {
            Err(ManagerError::Structure(ValidationError::Invalid(
                "dockerfile document is not an instruction list".to_string(),
            )))
        }
    }

    fn validate_recipe(&self, environment: &Environment) -> Vec<String> {
        base::single_recipe_problems(self, environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envsync_model::{MachineConfig, Recipe};
    use pretty_assertions::assert_eq;

    const DOCKERFILE: &str = "FROM eclipse/ubuntu_jdk8 AS base\nENV JAVA_OPTS=-Xmx1g\nRUN make\n";

    fn environment() -> Environment {
        Environment::new(Recipe::new(DockerfileEnvironmentManager::TYPE, DOCKERFILE))
    }

    #[test]
    fn single_machine_with_default_memory() {
        let manager = DockerfileEnvironmentManager::default();
        let machines = manager.get_machines(&environment());
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].name, "dev-machine");
        assert!(machines[0].recipe.is_some());
        assert_eq!(
            manager.get_memory_limit(&machines[0]),
            Some(manager.config().default_memory_limit_bytes)
        );
    }

    #[test]
    fn configured_name_is_used() {
        let env = environment().with_machine("ws", MachineConfig::new().with_memory_limit(42));
        let machines = DockerfileEnvironmentManager::default().get_machines(&env);
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].name, "ws");
        assert_eq!(machines[0].memory_limit_attribute(), Some(42));
    }

    #[test]
    fn source_edit_reaches_recipe() {
        let manager = DockerfileEnvironmentManager::default();
        let env = environment();
        let mut machines = manager.get_machines(&env);
        assert_eq!(
            manager.get_source(&machines[0]),
            Some(MachineSource::Image {
                image: "eclipse/ubuntu_jdk8".to_string()
            })
        );

        manager.set_source(&mut machines[0], "centos:8").unwrap();
        let updated = manager.get_environment(&env, &machines);
        let content = updated.recipe_content().unwrap();
        assert!(content.contains("FROM centos:8 AS base"), "{content}");
        assert!(content.contains("RUN make"));
    }

    #[test]
    fn env_variables_round_trip() {
        let manager = DockerfileEnvironmentManager::default();
        let env = environment();
        let mut machines = manager.get_machines(&env);
        let mut variables = manager.get_env_variables(&machines[0]).unwrap();
        assert_eq!(variables.get("JAVA_OPTS").map(String::as_str), Some("-Xmx1g"));

        variables.insert("GREETING".to_string(), "hello world".to_string());
        manager.set_env_variables(&mut machines[0], &variables).unwrap();
        let updated = manager.get_environment(&env, &machines);
        let reread = manager.get_machines(&updated);
        assert_eq!(manager.get_env_variables(&reread[0]), Some(variables));
    }

    #[test]
    fn adding_is_unsupported() {
        let manager = DockerfileEnvironmentManager::default();
        assert!(!manager.can_add_machines());
        assert!(matches!(
            manager.add_machine(&environment(), &Machine::new("x")),
            Err(ManagerError::Unsupported { .. })
        ));
    }

    #[test]
    fn validation_flags_extra_machines() {
        let manager = DockerfileEnvironmentManager::default();
        let env = environment()
            .with_machine("a", MachineConfig::new())
            .with_machine("b", MachineConfig::new());
        let problems = manager.validate_recipe(&env);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("single machine"));
        assert!(manager.validate_recipe(&environment()).is_empty());
    }
}
