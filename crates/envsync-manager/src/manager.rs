//! Environment manager capability interface
//!
//! One implementation per recipe format. Default methods carry the
//! format-agnostic behaviour: machines and memory limits come from the
//! environment's configuration, and recipe-aware edits report
//! [`ManagerError::Unsupported`].

use crate::base;
use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::validation;
use envsync_model::{container_part, Document, Environment, Machine, Validation};
use envsync_recipe::RecipeCodec;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Debug;

/// Where a machine's image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum MachineSource {
    /// Prebuilt image reference
    Image {
        /// Image reference
        image: String,
    },
    /// Image built from a context directory
    Build {
        /// Build context
        context: String,
        /// Dockerfile within the context
        dockerfile: Option<String>,
    },
}

/// Keeps one recipe format and the machine configuration in sync
///
/// # Contract
///
/// - Operations never modify the environment they are given; edits return
///   a new [`Environment`].
/// - [`get_machines`](Self::get_machines) and
///   [`get_environment`](Self::get_environment) never fail. Unusable recipes
///   are logged and the configuration-only view is returned.
/// - Edits that cannot be applied return an error and log it.
pub trait EnvironmentManager: Send + Sync + Debug {
    /// Recipe type handled (`openshift`, `compose`, ...)
    fn recipe_type(&self) -> &'static str;

    /// Editor mode for recipe text
    fn editor_mode(&self) -> &'static str;

    /// Codec for the recipe format
    fn codec(&self) -> &dyn RecipeCodec;

    /// Shared configuration
    fn config(&self) -> &ManagerConfig;

    /// Decode and check the environment's recipe
    ///
    /// `None` when there is no content or it is unusable; the reason is
    /// logged.
    fn parse_recipe(&self, environment: &Environment) -> Option<Document> {
        let Some(content) = environment.recipe_content() else {
            tracing::debug!(
                recipe_type = self.recipe_type(),
                "no recipe content, using configured machines only"
            );
            return None;
        };
        match self.codec().load(content) {
            Ok(document) => Some(document),
            Err(error) => {
                tracing::warn!(
                    recipe_type = self.recipe_type(),
                    %error,
                    "recipe unusable, using configured machines only"
                );
                None
            }
        }
    }

    /// Encode a whole recipe document
    fn stringify_recipe(&self, document: &Document) -> Result<String, ManagerError> {
        Ok(self.codec().serialize(document)?)
    }

    /// Decode a machine's recipe fragment
    fn parse_fragment(&self, text: &str) -> Result<Document, ManagerError> {
        Ok(self.codec().parse(text)?)
    }

    /// Encode a machine's recipe fragment
    fn stringify_fragment(&self, fragment: &Document) -> Result<String, ManagerError> {
        Ok(self.codec().serialize(fragment)?)
    }

    /// Machines of the environment
    fn get_machines(&self, environment: &Environment) -> Vec<Machine> {
        base::machines_from_config(environment)
    }

    /// Environment reflecting `machines`
    fn get_environment(&self, environment: &Environment, machines: &[Machine]) -> Environment {
        base::environment_from_machines(environment, machines)
    }

    /// Memory limit in bytes; `None` when unset
    fn get_memory_limit(&self, machine: &Machine) -> Option<u64> {
        machine.memory_limit_attribute()
    }

    /// Set the memory limit
    fn set_memory_limit(&self, machine: &mut Machine, bytes: u64) {
        machine.set_memory_limit_attribute(bytes);
    }

    /// Name shown to users
    fn get_machine_name(&self, machine: &Machine) -> String {
        container_part(&machine.name).to_string()
    }

    /// Whether machines can be renamed
    fn can_rename_machines(&self) -> bool {
        true
    }

    /// Rename a machine
    fn rename_machine(
        &self,
        environment: &Environment,
        old_name: &str,
        new_name: &str,
    ) -> Result<Environment, ManagerError> {
        base::rename_machine_config(environment, old_name, new_name)
            .map_err(|e| e.logged(self.recipe_type(), "rename_machine"))
    }

    /// Whether machines can be added
    fn can_add_machines(&self) -> bool {
        false
    }

    /// Whether machines can be deleted
    fn can_delete_machines(&self) -> bool {
        false
    }

    /// Fabricate a machine with a fresh name, not yet part of the environment
    fn create_new_default_machine(&self, _environment: &Environment) -> Result<Machine, ManagerError> {
        Err(ManagerError::unsupported("create_new_default_machine", self.recipe_type())
            .logged(self.recipe_type(), "create_new_default_machine"))
    }

    /// Add a machine to recipe and configuration
    fn add_machine(&self, _environment: &Environment, _machine: &Machine) -> Result<Environment, ManagerError> {
        Err(ManagerError::unsupported("add_machine", self.recipe_type())
            .logged(self.recipe_type(), "add_machine"))
    }

    /// Remove a machine from recipe and configuration
    fn delete_machine(&self, _environment: &Environment, _name: &str) -> Result<Environment, ManagerError> {
        Err(ManagerError::unsupported("delete_machine", self.recipe_type())
            .logged(self.recipe_type(), "delete_machine"))
    }

    /// Image source of a machine
    fn get_source(&self, _machine: &Machine) -> Option<MachineSource> {
        None
    }

    /// Point a machine at another image
    fn set_source(&self, _machine: &mut Machine, _image: &str) -> Result<(), ManagerError> {
        Err(ManagerError::unsupported("set_source", self.recipe_type()))
    }

    /// Whether environment variables of `machine` can be edited
    fn can_edit_env_variables(&self, _machine: &Machine) -> bool {
        false
    }

    /// Environment variables; `None` when the recipe has no such section
    fn get_env_variables(&self, _machine: &Machine) -> Option<IndexMap<String, String>> {
        None
    }

    /// Replace environment variables
    fn set_env_variables(
        &self,
        _machine: &mut Machine,
        _variables: &IndexMap<String, String>,
    ) -> Result<(), ManagerError> {
        Err(ManagerError::unsupported("set_env_variables", self.recipe_type()))
    }

    /// Format-specific recipe problems
    fn validate_recipe(&self, _environment: &Environment) -> Vec<String> {
        Vec::new()
    }

    /// Full environment validation
    fn validate_environment(&self, environment: &Environment) -> Validation {
        validation::validate_environment(self, environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envsync_model::{MachineConfig, Recipe};
    use envsync_recipe::DockerimageCodec;

    /// Manager relying on every provided method
    #[derive(Debug, Default)]
    struct ConfigOnlyManager {
        config: ManagerConfig,
        codec: DockerimageCodec,
    }

    impl EnvironmentManager for ConfigOnlyManager {
        fn recipe_type(&self) -> &'static str {
            "plain"
        }

        fn editor_mode(&self) -> &'static str {
            "text/plain"
        }

        fn codec(&self) -> &dyn RecipeCodec {
            &self.codec
        }

        fn config(&self) -> &ManagerConfig {
            &self.config
        }
    }

    fn environment() -> Environment {
        Environment::new(Recipe::new("plain", "alpine"))
            .with_machine("pod1/main", MachineConfig::new().with_memory_limit(1024))
    }

    #[test]
    fn provided_edits_are_unsupported() {
        let manager = ConfigOnlyManager::default();
        let env = environment();
        let mut machine = Machine::new("pod1/main");

        assert!(matches!(
            manager.create_new_default_machine(&env),
            Err(ManagerError::Unsupported { operation: "create_new_default_machine", .. })
        ));
        assert!(matches!(
            manager.add_machine(&env, &machine),
            Err(ManagerError::Unsupported { operation: "add_machine", .. })
        ));
        assert!(matches!(
            manager.delete_machine(&env, "pod1/main"),
            Err(ManagerError::Unsupported { operation: "delete_machine", .. })
        ));
        assert!(matches!(
            manager.set_source(&mut machine, "nginx"),
            Err(ManagerError::Unsupported { operation: "set_source", .. })
        ));
        assert!(matches!(
            manager.set_env_variables(&mut machine, &IndexMap::new()),
            Err(ManagerError::Unsupported { operation: "set_env_variables", .. })
        ));
    }

    #[test]
    fn provided_queries_use_configuration() {
        let manager = ConfigOnlyManager::default();
        let env = environment();
        let machines = manager.get_machines(&env);

        assert_eq!(machines.len(), 1);
        assert_eq!(manager.get_memory_limit(&machines[0]), Some(1024));
        assert_eq!(manager.get_machine_name(&machines[0]), "main");
        assert_eq!(manager.get_source(&machines[0]), None);
        assert_eq!(manager.get_env_variables(&machines[0]), None);
        assert!(!manager.can_edit_env_variables(&machines[0]));
        assert!(manager.validate_recipe(&env).is_empty());
    }
}
