//! Compose environment manager
//!
//! Each service is a machine named by its service key; the recipe fragment
//! is the service mapping.

use crate::base;
use crate::config::ManagerConfig;
use crate::error::{log_failure, ManagerError};
use crate::manager::{EnvironmentManager, MachineSource};
use envsync_model::{Document, Environment, Machine};
use envsync_recipe::compose::{
    remove_service_references, rename_service, rename_service_references, service_build,
    service_dependencies, service_env, service_image, service_memory_limit,
    service_memory_limit_value, service_names, services, services_mut, set_service_env,
    set_service_memory_limit,
};
use envsync_recipe::document::{key, remove_path, set_path};
use envsync_recipe::{ComposeCodec, RecipeCodec, ValidationError};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

/// Manager for `compose` recipes
#[derive(Debug, Clone)]
pub struct ComposeEnvironmentManager {
    config: ManagerConfig,
    codec: ComposeCodec,
}

impl ComposeEnvironmentManager {
    /// Recipe type tag
    pub const TYPE: &'static str = "compose";

    /// Create manager
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        let codec = ComposeCodec::new().with_max_size(config.max_recipe_size);
        Self { config, codec }
    }

    fn load_recipe(&self, environment: &Environment) -> Result<Document, ManagerError> {
        let content = environment
            .recipe_content()
            .ok_or(ManagerError::MissingRecipe)?;
        Ok(self.codec.load(content)?)
    }

    fn with_content(environment: &Environment, content: String) -> Environment {
        let mut updated = environment.clone();
        updated.recipe.content = Some(content);
        updated
    }
}

impl Default for ComposeEnvironmentManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl EnvironmentManager for ComposeEnvironmentManager {
    fn recipe_type(&self) -> &'static str {
        Self::TYPE
    }

    fn editor_mode(&self) -> &'static str {
        "text/x-yaml"
    }

    fn codec(&self) -> &dyn RecipeCodec {
        &self.codec
    }

    fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn get_machines(&self, environment: &Environment) -> Vec<Machine> {
        let mut machines = base::machines_from_config(environment);
        let Some(document) = self.parse_recipe(environment) else {
            return machines;
        };
        let Some(services) = services(&document) else {
            return machines;
        };

        for (name, service) in services {
            let Some(name) = name.as_str() else {
                tracing::warn!("skipping service with a non-string name");
                continue;
            };
            let machine = base::find_or_insert(&mut machines, name);
            machine.recipe = Some(service.clone());
            if let Some(config) = environment.machines.get(name) {
                machine.merge_config(config);
            }
            let recipe_limit = base::recipe_memory_limit(
                machine,
                service_memory_limit_value(service),
                service_memory_limit(service),
            );
            base::apply_memory_default(
                machine,
                recipe_limit,
                self.config.default_memory_limit_bytes,
                |machine, bytes| self.set_memory_limit(machine, bytes),
            );
        }
        machines
    }

    fn get_environment(&self, environment: &Environment, machines: &[Machine]) -> Environment {
        let mut updated = base::environment_from_machines(environment, machines);
        let Some(mut document) = self.parse_recipe(environment) else {
            return updated;
        };

        if let Some(services) = services_mut(&mut document) {
            for machine in machines {
                let Some(fragment) = &machine.recipe else {
                    continue;
                };
                match services.get_mut(machine.name.as_str()) {
                    Some(service) => *service = fragment.clone(),
                    None => {
                        tracing::debug!(machine = %machine.name, "service not found in recipe");
                    }
                }
            }
        }

        match self.stringify_recipe(&document) {
            Ok(content) => updated.recipe.content = Some(content),
            Err(error) => {
                tracing::error!(%error, "recipe serialization failed, keeping previous content");
            }
        }
        updated
    }

    fn get_memory_limit(&self, machine: &Machine) -> Option<u64> {
        machine
            .memory_limit_attribute()
            .or_else(|| service_memory_limit(machine.recipe.as_ref()?))
    }

    fn set_memory_limit(&self, machine: &mut Machine, bytes: u64) {
        machine.set_memory_limit_attribute(bytes);
        if let Some(service) = machine.recipe.as_mut() {
            set_service_memory_limit(service, bytes);
        }
    }

    fn get_machine_name(&self, machine: &Machine) -> String {
        machine.name.clone()
    }

    fn rename_machine(
        &self,
        environment: &Environment,
        old_name: &str,
        new_name: &str,
    ) -> Result<Environment, ManagerError> {
        let fail = log_failure(Self::TYPE, "rename_machine");
        if old_name.is_empty() || new_name.is_empty() {
            return Err(fail(ManagerError::MissingName));
        }
        if old_name == new_name {
            return Ok(environment.clone());
        }
        let mut document = self.load_recipe(environment).map_err(&fail)?;
        let names = service_names(&document);
        if !names.iter().any(|name| name == old_name) {
            return Err(fail(ManagerError::MachineNotFound(old_name.to_string())));
        }
        if names.iter().any(|name| name == new_name) || environment.machines.contains_key(new_name) {
            return Err(fail(ManagerError::NameConflict(new_name.to_string())));
        }

        rename_service(&mut document, old_name, new_name);
        rename_service_references(&mut document, old_name, new_name);
        let content = self.stringify_recipe(&document).map_err(&fail)?;

        let mut updated = Self::with_content(environment, content);
        updated.machines = base::rename_key(&environment.machines, old_name, new_name);
        Ok(updated)
    }

    fn can_add_machines(&self) -> bool {
        true
    }

    fn can_delete_machines(&self) -> bool {
        true
    }

    fn create_new_default_machine(&self, environment: &Environment) -> Result<Machine, ManagerError> {
        let mut used: Vec<String> = environment.machines.keys().cloned().collect();
        if let Some(document) = self.parse_recipe(environment) {
            used.extend(service_names(&document));
        }
        let prefix = &self.config.default_machine_prefix;
        let name = base::first_free_name(prefix, |name| used.iter().any(|used| used == name))
            .ok_or_else(|| {
                ManagerError::NoFreeName(prefix.clone()).logged(Self::TYPE, "create_new_default_machine")
            })?;

        let mut service = Mapping::new();
        service.insert(key("image"), Value::from(self.config.default_image.as_str()));
        let mut machine = Machine::new(name).with_recipe(Value::Mapping(service));
        self.set_memory_limit(&mut machine, self.config.default_memory_limit_bytes);
        Ok(machine)
    }

    fn add_machine(&self, environment: &Environment, machine: &Machine) -> Result<Environment, ManagerError> {
        let fail = log_failure(Self::TYPE, "add_machine");
        if machine.name.is_empty() {
            return Err(fail(ManagerError::MissingName));
        }
        let mut document = self.load_recipe(environment).map_err(&fail)?;
        let fragment = machine
            .recipe
            .clone()
            .ok_or_else(|| fail(ManagerError::MissingRecipeFragment(machine.name.clone())))?;
        if !fragment.is_mapping() {
            return Err(fail(ValidationError::NotAMapping.into()));
        }

        let services = services_mut(&mut document)
            .ok_or_else(|| fail(ValidationError::MissingSection("services".to_string()).into()))?;
        if services.contains_key(machine.name.as_str()) {
            return Err(fail(ManagerError::NameConflict(machine.name.clone())));
        }
        services.insert(key(&machine.name), fragment);

        let content = self.stringify_recipe(&document).map_err(&fail)?;
        let mut updated = Self::with_content(environment, content);
        updated
            .machines
            .insert(machine.name.clone(), machine.to_config());
        Ok(updated)
    }

    fn delete_machine(&self, environment: &Environment, name: &str) -> Result<Environment, ManagerError> {
        let fail = log_failure(Self::TYPE, "delete_machine");
        if name.is_empty() {
            return Err(fail(ManagerError::MissingName));
        }
        let mut document = self.load_recipe(environment).map_err(&fail)?;
        let removed = services_mut(&mut document)
            .and_then(|services| services.shift_remove(name))
            .is_some();
        if !removed && !environment.machines.contains_key(name) {
            return Err(fail(ManagerError::MachineNotFound(name.to_string())));
        }
        remove_service_references(&mut document, name);

        let content = self.stringify_recipe(&document).map_err(&fail)?;
        let mut updated = Self::with_content(environment, content);
        updated.machines.shift_remove(name);
        Ok(updated)
    }

    fn get_source(&self, machine: &Machine) -> Option<MachineSource> {
        let service = machine.recipe.as_ref()?;
        if let Some(image) = service_image(service) {
            return Some(MachineSource::Image {
                image: image.to_string(),
            });
        }
        service_build(service).map(|(context, dockerfile)| MachineSource::Build { context, dockerfile })
    }

    fn set_source(&self, machine: &mut Machine, image: &str) -> Result<(), ManagerError> {
        let service = machine
            .recipe
            .as_mut()
            .ok_or_else(|| ManagerError::MissingRecipeFragment(machine.name.clone()))?;
        remove_path(service, "build");
        set_path(service, "image", Value::from(image));
        Ok(())
    }

    fn can_edit_env_variables(&self, machine: &Machine) -> bool {
        machine.recipe.is_some()
    }

    fn get_env_variables(&self, machine: &Machine) -> Option<IndexMap<String, String>> {
        service_env(machine.recipe.as_ref()?)
    }

    fn set_env_variables(
        &self,
        machine: &mut Machine,
        variables: &IndexMap<String, String>,
    ) -> Result<(), ManagerError> {
        let service = machine
            .recipe
            .as_mut()
            .ok_or_else(|| ManagerError::MissingRecipeFragment(machine.name.clone()))?;
        set_service_env(service, variables);
        Ok(())
    }

    fn validate_recipe(&self, environment: &Environment) -> Vec<String> {
        let document = match self.load_recipe(environment) {
            Ok(document) => document,
            Err(error) => return vec![error.to_string()],
        };
        let names = service_names(&document);
        if names.is_empty() {
            return vec!["recipe should contain at least one service".to_string()];
        }

        let mut errors: Vec<String> = environment
            .machine_names()
            .filter(|machine| !names.iter().any(|name| name.as_str() == *machine))
            .map(|machine| format!("machine '{machine}' is not defined in the recipe"))
            .collect();

        let Some(services) = services(&document) else {
            return errors;
        };
        for (name, service) in services {
            let name = name.as_str().unwrap_or_default();
            if service_image(service).is_none() && service_build(service).is_none() {
                errors.push(format!("service '{name}' should contain 'build' or 'image' section"));
            }
            for dependency in service_dependencies(service) {
                if dependency == name {
                    errors.push(format!("service '{name}' references itself"));
                } else if !names.contains(&dependency) {
                    errors.push(format!(
                        "service '{name}' references missing service '{dependency}'"
                    ));
                }
            }
        }
        errors
    }
}
