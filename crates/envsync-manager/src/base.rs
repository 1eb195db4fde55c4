//! Format-agnostic environment operations
//!
//! Machines built from configuration alone, folding machine state back into
//! configuration, config-key renames and free-name search. Format managers
//! build on these.

use crate::error::ManagerError;
use crate::manager::EnvironmentManager;
use envsync_model::{Document, Environment, Machine};
use indexmap::IndexMap;

/// Highest numeric suffix tried when looking for a free name
const MAX_NAME_SUFFIX: u32 = 999;

/// One machine per configured name, without recipe fragments
#[must_use]
pub fn machines_from_config(environment: &Environment) -> Vec<Machine> {
    environment
        .machines
        .iter()
        .map(|(name, config)| Machine::from_config(name.as_str(), config))
        .collect()
}

/// Machine named `name`, appended if missing
pub fn find_or_insert<'a>(machines: &'a mut Vec<Machine>, name: &str) -> &'a mut Machine {
    let index = match machines.iter().position(|machine| machine.name == name) {
        Some(index) => index,
        None => {
            machines.push(Machine::new(name));
            machines.len() - 1
        }
    };
    &mut machines[index]
}

/// Copy of `environment` with each machine's attributes, servers and agents
/// folded into its configuration entry
///
/// Entries are created for machines without one. Recipe content is left as
/// it is.
#[must_use]
pub fn environment_from_machines(environment: &Environment, machines: &[Machine]) -> Environment {
    let mut updated = environment.clone();
    for machine in machines {
        let config = updated.machines.entry(machine.name.clone()).or_default();
        if !machine.attributes.is_empty() {
            config.attributes = machine.attributes.clone();
        }
        if !machine.servers.is_empty() {
            config.servers = machine.servers.clone();
        }
        if !machine.agents.is_empty() {
            config.agents = machine.agents.clone();
        }
    }
    updated
}

/// Memory default for a machine freshly read from a recipe
///
/// Keeps an existing attribute. Otherwise copies the recipe-side limit into
/// the attribute, or writes `default` through `set_limit` when the recipe has
/// none either.
pub fn apply_memory_default<F>(machine: &mut Machine, recipe_limit: Option<u64>, default: u64, set_limit: F)
where
    F: FnOnce(&mut Machine, u64),
{
    if machine.memory_limit_attribute().is_some() {
        return;
    }
    match recipe_limit {
        Some(limit) => machine.set_memory_limit_attribute(limit),
        None => set_limit(machine, default),
    }
}

/// Recipe-side memory limit of `machine`
///
/// `raw` is the limit value as written in the recipe and `limit` its parsed
/// byte count. A limit that is present but unreadable is logged when the
/// machine has no attribute either, since the default then replaces it in
/// the recipe.
pub fn recipe_memory_limit(machine: &Machine, raw: Option<&Document>, limit: Option<u64>) -> Option<u64> {
    if let (Some(raw), None, None) = (raw, limit, machine.memory_limit_attribute()) {
        let text = raw
            .as_str()
            .map_or_else(|| format!("{raw:?}"), str::to_string);
        tracing::warn!(
            machine = %machine.name,
            limit = %text,
            "unreadable memory limit in recipe, replacing it with the default"
        );
    }
    limit
}

/// Copy of `map` with key `old` renamed to `new`, keeping entry order
#[must_use]
pub fn rename_key<V: Clone>(map: &IndexMap<String, V>, old: &str, new: &str) -> IndexMap<String, V> {
    map.iter()
        .map(|(name, value)| {
            let name = if name == old { new } else { name.as_str() };
            (name.to_string(), value.clone())
        })
        .collect()
}

/// Rename a configuration entry without touching the recipe
pub fn rename_machine_config(
    environment: &Environment,
    old_name: &str,
    new_name: &str,
) -> Result<Environment, ManagerError> {
    if old_name.is_empty() || new_name.is_empty() {
        return Err(ManagerError::MissingName);
    }
    if old_name == new_name {
        return Ok(environment.clone());
    }
    if !environment.machines.contains_key(old_name) {
        return Err(ManagerError::MachineNotFound(old_name.to_string()));
    }
    if environment.machines.contains_key(new_name) {
        return Err(ManagerError::NameConflict(new_name.to_string()));
    }

    let mut updated = environment.clone();
    updated.machines = rename_key(&environment.machines, old_name, new_name);
    Ok(updated)
}

/// `<prefix><N>` for the smallest N in 1..=999 that `is_used` rejects
#[must_use]
pub fn first_free_name<F>(prefix: &str, is_used: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    (1..=MAX_NAME_SUFFIX)
        .map(|n| format!("{prefix}{n}"))
        .find(|candidate| !is_used(candidate))
}

/// Name of the only machine of a single-machine recipe
///
/// The first configured machine, else `default`.
#[must_use]
pub fn single_machine_name(environment: &Environment, default: &str) -> String {
    environment
        .machine_names()
        .next()
        .unwrap_or(default)
        .to_string()
}

/// Machines of a recipe describing exactly one machine
///
/// The whole recipe document becomes that machine's fragment.
pub fn single_recipe_machines<M>(manager: &M, environment: &Environment) -> Vec<Machine>
where
    M: EnvironmentManager + ?Sized,
{
    let mut machines = machines_from_config(environment);
    let Some(document) = manager.parse_recipe(environment) else {
        return machines;
    };
    let config = manager.config();
    let name = single_machine_name(environment, &config.default_machine_name);
    let machine = find_or_insert(&mut machines, &name);
    machine.recipe = Some(document);
    apply_memory_default(machine, None, config.default_memory_limit_bytes, |machine, bytes| {
        manager.set_memory_limit(machine, bytes);
    });
    machines
}

/// Environment for a single-machine recipe: the machine's fragment is the
/// new recipe content
pub fn single_recipe_environment<M>(
    manager: &M,
    environment: &Environment,
    machines: &[Machine],
) -> Environment
where
    M: EnvironmentManager + ?Sized,
{
    let mut updated = environment_from_machines(environment, machines);
    let name = single_machine_name(environment, &manager.config().default_machine_name);
    let Some(fragment) = machines
        .iter()
        .find(|machine| machine.name == name)
        .and_then(|machine| machine.recipe.as_ref())
    else {
        return updated;
    };
    match manager.stringify_fragment(fragment) {
        Ok(content) => updated.recipe.content = Some(content),
        Err(error) => {
            tracing::error!(
                recipe_type = manager.recipe_type(),
                %error,
                "recipe serialization failed, keeping previous content"
            );
        }
    }
    updated
}

/// Problems shared by single-machine recipes
pub fn single_recipe_problems<M>(manager: &M, environment: &Environment) -> Vec<String>
where
    M: EnvironmentManager + ?Sized,
{
    let mut errors = Vec::new();
    match environment.recipe_content() {
        None => errors.push("recipe content is missing".to_string()),
        Some(content) => {
            if let Err(error) = manager.codec().load(content) {
                errors.push(error.to_string());
            }
        }
    }
    if environment.machines.len() > 1 {
        errors.push(format!(
            "'{}' recipes describe a single machine, found {} configured",
            manager.recipe_type(),
            environment.machines.len()
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use envsync_model::{MachineConfig, Recipe};
    use pretty_assertions::assert_eq;

    fn environment() -> Environment {
        Environment::new(Recipe::new("openshift", "kind: List\nitems: []\n"))
            .with_machine("pod1/main", MachineConfig::new().with_memory_limit(1024))
            .with_machine("pod2/db", MachineConfig::new().with_agent("terminal"))
    }

    #[test]
    fn machines_follow_configuration() {
        let machines = machines_from_config(&environment());
        let names: Vec<_> = machines.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["pod1/main", "pod2/db"]);
        assert!(machines.iter().all(|m| m.recipe.is_none()));
        assert_eq!(machines[0].memory_limit_attribute(), Some(1024));
    }

    #[test]
    fn find_or_insert_appends_once() {
        let mut machines = machines_from_config(&environment());
        find_or_insert(&mut machines, "pod3/tools").set_memory_limit_attribute(1);
        find_or_insert(&mut machines, "pod3/tools");
        assert_eq!(machines.len(), 3);
        assert_eq!(machines[2].memory_limit_attribute(), Some(1));
    }

    #[test]
    fn fold_machines_into_configuration() {
        let env = environment();
        let mut machines = machines_from_config(&env);
        machines[0].set_memory_limit_attribute(4096);
        machines.push(Machine::new("pod3/new"));

        let updated = environment_from_machines(&env, &machines);

        assert_eq!(updated.machines["pod1/main"].memory_limit(), Some(4096));
        assert!(updated.machines.contains_key("pod3/new"));
        assert_eq!(updated.recipe, env.recipe);
        assert_eq!(env.machines["pod1/main"].memory_limit(), Some(1024));
    }

    #[test]
    fn memory_default_rules() {
        let mut keep = Machine::new("a");
        keep.set_memory_limit_attribute(5);
        apply_memory_default(&mut keep, Some(7), 9, |m, b| m.set_memory_limit_attribute(b));
        assert_eq!(keep.memory_limit_attribute(), Some(5));

        let mut from_recipe = Machine::new("b");
        apply_memory_default(&mut from_recipe, Some(7), 9, |_, _| panic!("recipe limit exists"));
        assert_eq!(from_recipe.memory_limit_attribute(), Some(7));

        let mut defaulted = Machine::new("c");
        apply_memory_default(&mut defaulted, None, 9, |m, b| m.set_memory_limit_attribute(b));
        assert_eq!(defaulted.memory_limit_attribute(), Some(9));
    }

    #[test]
    fn recipe_limit_passes_parsed_value() {
        let machine = Machine::new("pod1/main");
        let raw = Document::from("512Mi");
        assert_eq!(recipe_memory_limit(&machine, Some(&raw), Some(512)), Some(512));
        assert_eq!(recipe_memory_limit(&machine, None, None), None);

        let unreadable = Document::from("512M");
        assert_eq!(recipe_memory_limit(&machine, Some(&unreadable), None), None);
    }

    #[test]
    fn rename_key_keeps_order() {
        let renamed = rename_key(&environment().machines, "pod1/main", "pod1/ide");
        let keys: Vec<_> = renamed.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["pod1/ide", "pod2/db"]);
    }

    #[test]
    fn rename_config_errors() {
        let env = environment();
        assert_eq!(rename_machine_config(&env, "", "x"), Err(ManagerError::MissingName));
        assert_eq!(
            rename_machine_config(&env, "pod9/x", "pod9/y"),
            Err(ManagerError::MachineNotFound("pod9/x".to_string()))
        );
        assert_eq!(
            rename_machine_config(&env, "pod1/main", "pod2/db"),
            Err(ManagerError::NameConflict("pod2/db".to_string()))
        );
    }

    #[test]
    fn single_machine_name_prefers_configuration() {
        assert_eq!(single_machine_name(&environment(), "dev-machine"), "pod1/main");
        let bare = Environment::new(Recipe::new("dockerimage", "ubuntu"));
        assert_eq!(single_machine_name(&bare, "dev-machine"), "dev-machine");
    }

    #[test]
    fn free_names() {
        let used = ["pod1", "pod2"];
        assert_eq!(
            first_free_name("pod", |name| used.contains(&name)),
            Some("pod3".to_string())
        );
        assert_eq!(first_free_name("pod", |_| true), None);
    }
}
