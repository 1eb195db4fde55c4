//! OpenShift Pod/List environment manager
//!
//! Every container of every pod is a machine named `<pod>/<container>`.
//! Pods without `metadata.name` or `metadata.generateName` are addressed as
//! `pod<N>`, N being the smallest suffix not already taken by a named pod.
//! The machine's recipe fragment is its pod reduced to that one container.

use crate::base;
use crate::config::ManagerConfig;
use crate::error::{log_failure, ManagerError};
use crate::manager::{EnvironmentManager, MachineSource};
use envsync_model::{
    container_part, pod_part, Document, Environment, Machine, MachineName, NameError,
    NAME_SEPARATOR,
};
use envsync_recipe::document::set_path;
use envsync_recipe::openshift::{
    container_env, container_image, container_memory_limit, container_memory_limit_value,
    container_name, containers, find_container, find_container_mut, is_kind, kind, list_items,
    list_items_mut, new_container, new_pod, pod_name, set_container_env, set_container_image,
    set_container_memory_limit, set_pod_name, single_container, single_container_mut,
    single_container_pod, KIND_LIST, KIND_POD,
};
use envsync_recipe::{OpenshiftCodec, RecipeCodec, ValidationError};
use indexmap::IndexMap;
use serde_yaml::Value;
use std::collections::HashSet;

const POD_PREFIX: &str = "pod";

/// Manager for `openshift` recipes
#[derive(Debug, Clone)]
pub struct OpenshiftEnvironmentManager {
    config: ManagerConfig,
    codec: OpenshiftCodec,
}

impl OpenshiftEnvironmentManager {
    /// Recipe type tag
    pub const TYPE: &'static str = "openshift";

    /// Create manager
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        let codec = OpenshiftCodec::new().with_max_size(config.max_recipe_size);
        Self { config, codec }
    }

    fn load_recipe(&self, environment: &Environment) -> Result<Document, ManagerError> {
        let content = environment
            .recipe_content()
            .ok_or(ManagerError::MissingRecipe)?;
        Ok(self.codec.load(content)?)
    }
}

impl Default for OpenshiftEnvironmentManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

/// Pods of a recipe: the `items` of a List, or the document itself for a Pod
fn pods(document: &Document) -> Vec<&Document> {
    if is_kind(document, KIND_LIST) {
        list_items(document)
            .map(|items| items.iter().collect())
            .unwrap_or_default()
    } else if is_kind(document, KIND_POD) {
        vec![document]
    } else {
        Vec::new()
    }
}

fn pods_mut(document: &mut Document) -> Vec<&mut Document> {
    if is_kind(document, KIND_LIST) {
        list_items_mut(document)
            .map(|items| items.iter_mut().collect())
            .unwrap_or_default()
    } else if is_kind(document, KIND_POD) {
        vec![document]
    } else {
        Vec::new()
    }
}

/// Name of each pod, synthesizing `pod<N>` for unnamed ones
fn pod_names(pods: &[&Document]) -> Vec<String> {
    let mut used: HashSet<String> = pods
        .iter()
        .filter_map(|pod| pod_name(pod))
        .map(str::to_string)
        .collect();
    pods.iter()
        .map(|pod| match pod_name(pod) {
            Some(name) => name.to_string(),
            None => {
                let name = base::first_free_name(POD_PREFIX, |candidate| used.contains(candidate))
                    .unwrap_or_else(|| POD_PREFIX.to_string());
                used.insert(name.clone());
                name
            }
        })
        .collect()
}

/// Container of a fragment that belongs to `machine`
fn fragment_container<'a>(fragment: &'a Document, machine_name: &str) -> Option<&'a Document> {
    find_container(fragment, container_part(machine_name)).or_else(|| single_container(fragment))
}

fn fragment_container_mut<'a>(fragment: &'a mut Document, machine_name: &str) -> Option<&'a mut Document> {
    let name = container_part(machine_name);
    if find_container(fragment, name).is_some() {
        return find_container_mut(fragment, name);
    }
    single_container_mut(fragment)
}

impl EnvironmentManager for OpenshiftEnvironmentManager {
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
        let Some(items) = list_items(&document) else {
            tracing::debug!(
                kind = kind(&document),
                "recipe is not a List with items, using configured machines only"
            );
            return machines;
        };

        let pods: Vec<&Document> = items.iter().collect();
        let names = pod_names(&pods);
        let mut seen = HashSet::new();
        for (pod, pod_name_value) in pods.iter().zip(&names) {
            for (index, container) in containers(pod).iter().enumerate() {
                let Some(container_id) = container_name(container) else {
                    tracing::warn!(pod = %pod_name_value, "skipping container without a name");
                    continue;
                };
                let Some(mut fragment) = single_container_pod(pod, index) else {
                    continue;
                };
                if pod_name(pod).is_none() {
                    set_pod_name(&mut fragment, pod_name_value);
                }

                let name = MachineName::new(pod_name_value.as_str(), container_id).to_string();
                if !seen.insert(name.clone()) {
                    tracing::warn!(
                        machine = %name,
                        "duplicate pod and container name, keeping the first"
                    );
                    continue;
                }
                let machine = base::find_or_insert(&mut machines, &name);
                machine.recipe = Some(fragment);
                if let Some(config) = environment.machines.get(&name) {
                    machine.merge_config(config);
                }
                let recipe_limit = base::recipe_memory_limit(
                    machine,
                    container_memory_limit_value(container),
                    container_memory_limit(container),
                );
                base::apply_memory_default(
                    machine,
                    recipe_limit,
                    self.config.default_memory_limit_bytes,
                    |machine, bytes| self.set_memory_limit(machine, bytes),
                );
            }
        }
        machines
    }

    fn get_environment(&self, environment: &Environment, machines: &[Machine]) -> Environment {
        let mut updated = base::environment_from_machines(environment, machines);
        let Some(mut document) = self.parse_recipe(environment) else {
            return updated;
        };

        let names = pod_names(&pods(&document));
        let mut pod_refs = pods_mut(&mut document);
        for machine in machines {
            let Some(fragment) = &machine.recipe else {
                continue;
            };
            let Some(replacement) = fragment_container(fragment, &machine.name) else {
                tracing::debug!(machine = %machine.name, "fragment has no matching container");
                continue;
            };
            let Ok(name) = machine.name.parse::<MachineName>() else {
                tracing::debug!(machine = %machine.name, "not a pod machine name");
                continue;
            };
            let Some(index) = names.iter().position(|pod| pod == name.pod()) else {
                tracing::debug!(machine = %machine.name, "pod not found in recipe");
                continue;
            };
            if let Some(container) = find_container_mut(&mut *pod_refs[index], name.container()) {
                *container = replacement.clone();
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
        machine.memory_limit_attribute().or_else(|| {
            let fragment = machine.recipe.as_ref()?;
            container_memory_limit(fragment_container(fragment, &machine.name)?)
        })
    }

    fn set_memory_limit(&self, machine: &mut Machine, bytes: u64) {
        machine.set_memory_limit_attribute(bytes);
        if let Some(fragment) = machine.recipe.as_mut() {
            if let Some(container) = fragment_container_mut(fragment, &machine.name) {
                set_container_memory_limit(container, bytes, self.config.limit_unit);
            }
        }
    }

    fn get_machine_name(&self, machine: &Machine) -> String {
        machine
            .recipe
            .as_ref()
            .and_then(single_container)
            .and_then(container_name)
            .unwrap_or_else(|| container_part(&machine.name))
            .to_string()
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
        let mut document = self.load_recipe(environment).map_err(&fail)?;
        let old: MachineName = old_name.parse().map_err(|e: NameError| fail(e.into()))?;
        let new = if new_name.contains(NAME_SEPARATOR) {
            let new: MachineName = new_name.parse().map_err(|e: NameError| fail(e.into()))?;
            if new.pod() != old.pod() {
                return Err(fail(ManagerError::PodMismatch {
                    machine: old_name.to_string(),
                    pod: new.pod().to_string(),
                }));
            }
            new
        } else {
            old.with_container(new_name)
        };
        if new == old {
            return Ok(environment.clone());
        }
        let new_key = new.to_string();
        if environment.machines.contains_key(&new_key) {
            return Err(fail(ManagerError::NameConflict(new_key)));
        }

        {
            let names = pod_names(&pods(&document));
            let index = names
                .iter()
                .position(|pod| pod == old.pod())
                .ok_or_else(|| fail(ManagerError::MachineNotFound(old_name.to_string())))?;
            let mut pod_refs = pods_mut(&mut document);
            let pod = &mut *pod_refs[index];
            if find_container(pod, new.container()).is_some() {
                return Err(fail(ManagerError::NameConflict(new_key)));
            }
            let container = find_container_mut(pod, old.container())
                .ok_or_else(|| fail(ManagerError::MachineNotFound(old_name.to_string())))?;
            set_path(container, "name", Value::from(new.container()));
        }

        let content = self.stringify_recipe(&document).map_err(&fail)?;
        let mut updated = environment.clone();
        updated.recipe.content = Some(content);
        updated.machines = base::rename_key(&environment.machines, old_name, &new_key);
        Ok(updated)
    }

    fn can_add_machines(&self) -> bool {
        true
    }

    fn create_new_default_machine(&self, environment: &Environment) -> Result<Machine, ManagerError> {
        let mut used: HashSet<String> = environment
            .machines
            .keys()
            .filter_map(|name| pod_part(name))
            .map(str::to_string)
            .collect();
        if let Some(document) = self.parse_recipe(environment) {
            used.extend(pod_names(&pods(&document)));
        }

        let pod = base::first_free_name(POD_PREFIX, |name| used.contains(name)).ok_or_else(|| {
            ManagerError::NoFreeName(POD_PREFIX.to_string())
                .logged(Self::TYPE, "create_new_default_machine")
        })?;
        let container = new_container(
            &self.config.default_container_name,
            &self.config.default_image,
            self.config.default_container_port,
        );
        let name = MachineName::new(pod.as_str(), self.config.default_container_name.as_str());
        let mut machine = Machine::new(name.to_string()).with_recipe(new_pod(&pod, vec![container]));
        self.set_memory_limit(&mut machine, self.config.default_memory_limit_bytes);
        Ok(machine)
    }

    fn add_machine(&self, environment: &Environment, machine: &Machine) -> Result<Environment, ManagerError> {
        let fail = log_failure(Self::TYPE, "add_machine");
        let mut document = self.load_recipe(environment).map_err(&fail)?;
        let mut fragment = machine
            .recipe
            .clone()
            .ok_or_else(|| fail(ManagerError::MissingRecipeFragment(machine.name.clone())))?;
        if !fragment.is_mapping() {
            return Err(fail(ValidationError::NotAMapping.into()));
        }

        let pod = match pod_name(&fragment) {
            Some(name) => name.to_string(),
            None => {
                let name = pod_part(&machine.name).ok_or_else(|| fail(ManagerError::MissingName))?;
                set_pod_name(&mut fragment, name);
                name.to_string()
            }
        };
        if pod_names(&pods(&document)).contains(&pod) {
            return Err(fail(ManagerError::NameConflict(pod)));
        }

        let actual = kind(&document).unwrap_or("<none>").to_string();
        let items = list_items_mut(&mut document)
            .ok_or_else(|| fail(ValidationError::unexpected_kind(KIND_LIST, actual).into()))?;
        items.push(fragment);

        let content = self.stringify_recipe(&document).map_err(&fail)?;
        let mut updated = environment.clone();
        updated.recipe.content = Some(content);
        updated
            .machines
            .insert(machine.name.clone(), machine.to_config());
        Ok(updated)
    }

    fn get_source(&self, machine: &Machine) -> Option<MachineSource> {
        let fragment = machine.recipe.as_ref()?;
        let image = container_image(fragment_container(fragment, &machine.name)?)?;
        Some(MachineSource::Image {
            image: image.to_string(),
        })
    }

    fn set_source(&self, machine: &mut Machine, image: &str) -> Result<(), ManagerError> {
        let fragment = machine
            .recipe
            .as_mut()
            .ok_or_else(|| ManagerError::MissingRecipeFragment(machine.name.clone()))?;
        let container = fragment_container_mut(fragment, &machine.name)
            .ok_or_else(|| ManagerError::MachineNotFound(machine.name.clone()))?;
        set_container_image(container, image);
        Ok(())
    }

    fn can_edit_env_variables(&self, machine: &Machine) -> bool {
        machine.recipe.is_some()
    }

    fn get_env_variables(&self, machine: &Machine) -> Option<IndexMap<String, String>> {
        let fragment = machine.recipe.as_ref()?;
        container_env(fragment_container(fragment, &machine.name)?)
    }

    fn set_env_variables(
        &self,
        machine: &mut Machine,
        variables: &IndexMap<String, String>,
    ) -> Result<(), ManagerError> {
        let fragment = machine
            .recipe
            .as_mut()
            .ok_or_else(|| ManagerError::MissingRecipeFragment(machine.name.clone()))?;
        let container = fragment_container_mut(fragment, &machine.name)
            .ok_or_else(|| ManagerError::MachineNotFound(machine.name.clone()))?;
        set_container_env(container, variables);
        Ok(())
    }

    fn validate_recipe(&self, environment: &Environment) -> Vec<String> {
        let document = match self.load_recipe(environment) {
            Ok(document) => document,
            Err(error) => return vec![error.to_string()],
        };
        let pods = pods(&document);
        if pods.is_empty() {
            return vec!["recipe should contain at least one pod".to_string()];
        }

        let names = pod_names(&pods);
        let mut defined: HashSet<String> = HashSet::new();
        let mut errors = Vec::new();
        for (pod, pod_name_value) in pods.iter().zip(&names) {
            for container in containers(pod).iter().filter_map(container_name) {
                let name = MachineName::new(pod_name_value.as_str(), container).to_string();
                if !defined.insert(name.clone()) {
                    errors.push(format!("machine '{name}' is defined more than once in the recipe"));
                }
            }
        }

        errors.extend(
            environment
                .machine_names()
                .filter(|name| !defined.contains(*name))
                .map(|name| format!("machine '{name}' is not defined in the recipe")),
        );
        errors
    }
}
