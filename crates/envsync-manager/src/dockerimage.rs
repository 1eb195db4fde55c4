//! Docker image environment manager
//!
//! The recipe is one image reference, so the environment has one machine.

use crate::base;
use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::manager::{EnvironmentManager, MachineSource};
use envsync_model::{Environment, Machine};
use envsync_recipe::dockerimage::image;
use envsync_recipe::{DockerimageCodec, RecipeCodec};

/// Manager for `dockerimage` recipes
#[derive(Debug, Clone)]
pub struct DockerimageEnvironmentManager {
    config: ManagerConfig,
    codec: DockerimageCodec,
}

impl DockerimageEnvironmentManager {
    /// Recipe type tag
    pub const TYPE: &'static str = "dockerimage";

    /// Create manager
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        let codec = DockerimageCodec::new().with_max_size(config.max_recipe_size);
        Self { config, codec }
    }
}

impl Default for DockerimageEnvironmentManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl EnvironmentManager for DockerimageEnvironmentManager {
    fn recipe_type(&self) -> &'static str {
        Self::TYPE
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
        let reference = image(machine.recipe.as_ref()?)?;
        Some(MachineSource::Image {
            image: reference.to_string(),
        })
    }

    fn set_source(&self, machine: &mut Machine, reference: &str) -> Result<(), ManagerError> {
        let document = self.parse_fragment(reference)?;
        machine.recipe = Some(document);
        Ok(())
    }

    fn validate_recipe(&self, environment: &Environment) -> Vec<String> {
        base::single_recipe_problems(self, environment)
    }
}
