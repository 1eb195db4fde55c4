//! Interactive machine editing
//!
//! [`MachineEditSession`] holds a private copy of an environment while a
//! single machine is added or edited. Nothing reaches the caller's
//! environment until [`commit`](MachineEditSession::commit) succeeds.

use crate::error::ManagerError;
use crate::manager::EnvironmentManager;
use envsync_model::{pod_part, Document, Environment, Machine, MachineName, Validation, NAME_SEPARATOR};

/// Edit state for one machine of an environment
#[derive(Debug, Clone)]
pub struct MachineEditSession<'a> {
    manager: &'a dyn EnvironmentManager,
    original: Environment,
    environment: Environment,
    machine: Machine,
    original_recipe: Option<Document>,
    original_name: String,
    machine_name: String,
    used_names: Vec<String>,
    recipe_script: String,
    is_add: bool,
}

impl<'a> MachineEditSession<'a> {
    /// Start editing `machine_name`, or adding a new machine when `None`
    ///
    /// Adding requires a manager that can add machines.
    pub fn open(
        manager: &'a dyn EnvironmentManager,
        environment: &Environment,
        machine_name: Option<&str>,
    ) -> Result<Self, ManagerError> {
        let is_add = machine_name.is_none();
        let used_names = environment
            .machine_names()
            .filter(|name| Some(*name) != machine_name)
            .map(str::to_string)
            .collect();

        let (working, machine) = match machine_name {
            None => {
                if !manager.can_add_machines() {
                    return Err(ManagerError::unsupported("add_machine", manager.recipe_type()));
                }
                let created = manager.create_new_default_machine(environment)?;
                let working = manager.add_machine(environment, &created)?;
                let machine = find_machine(manager, &working, &created.name).unwrap_or(created);
                (working, machine)
            }
            Some(name) => {
                let machine = find_machine(manager, environment, name)
                    .ok_or_else(|| ManagerError::MachineNotFound(name.to_string()))?;
                (environment.clone(), machine)
            }
        };

        let fragment = machine
            .recipe
            .as_ref()
            .ok_or_else(|| ManagerError::MissingRecipeFragment(machine.name.clone()))?;
        let recipe_script = manager.stringify_fragment(fragment)?;
        let display_name = manager.get_machine_name(&machine);
        tracing::debug!(machine = %machine.name, is_add, "machine edit session opened");

        Ok(Self {
            manager,
            original: environment.clone(),
            environment: working,
            original_recipe: machine.recipe.clone(),
            machine,
            original_name: display_name.clone(),
            machine_name: display_name,
            used_names,
            recipe_script,
            is_add,
        })
    }

    /// Whether this session adds a new machine
    #[inline]
    #[must_use]
    pub fn is_add(&self) -> bool {
        self.is_add
    }

    /// Manager driving the session
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &'a dyn EnvironmentManager {
        self.manager
    }

    /// Working copy of the environment
    #[inline]
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Machine being edited
    #[inline]
    #[must_use]
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Names of the other configured machines
    #[inline]
    #[must_use]
    pub fn used_names(&self) -> &[String] {
        &self.used_names
    }

    /// Editor mode for the recipe script
    #[inline]
    #[must_use]
    pub fn editor_mode(&self) -> &'static str {
        self.manager.editor_mode()
    }

    /// Whether `name` is free for the edited machine
    ///
    /// A bare container name is also checked in its pod-qualified form.
    #[must_use]
    pub fn is_unique(&self, name: &str) -> bool {
        let qualified = self.qualified_name(name);
        !self
            .used_names
            .iter()
            .any(|used| used == name || *used == qualified)
    }

    /// Name shown to users
    #[inline]
    #[must_use]
    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// Memory limit of the edited machine
    #[must_use]
    pub fn memory_limit(&self) -> Option<u64> {
        self.manager.get_memory_limit(&self.machine)
    }

    /// Set the memory limit and re-derive the environment
    ///
    /// Zero is ignored. Returns whether the limit was applied.
    pub fn set_memory_limit(&mut self, bytes: u64) -> bool {
        if bytes == 0 {
            return false;
        }
        self.manager.set_memory_limit(&mut self.machine, bytes);
        self.refresh_script();
        let machines: Vec<Machine> = self
            .manager
            .get_machines(&self.environment)
            .into_iter()
            .map(|machine| {
                if machine.name == self.machine.name {
                    self.machine.clone()
                } else {
                    machine
                }
            })
            .collect();
        self.environment = self.manager.get_environment(&self.environment, &machines);
        true
    }

    /// Rename the edited machine
    ///
    /// On failure the session is unchanged.
    pub fn rename(&mut self, new_name: &str) -> Result<(), ManagerError> {
        let renamed = self
            .manager
            .rename_machine(&self.environment, &self.machine.name, new_name)?;
        let key = self.qualified_name(new_name);
        let machines = self.manager.get_machines(&renamed);
        let machine = machines
            .iter()
            .find(|machine| machine.name == key)
            .cloned()
            .ok_or_else(|| ManagerError::MachineNotFound(key.clone()))?;

        self.environment = self.manager.get_environment(&renamed, &machines);
        self.machine_name = self.manager.get_machine_name(&machine);
        self.machine = machine;
        self.refresh_script();
        Ok(())
    }

    /// Recipe text of the edited machine
    #[inline]
    #[must_use]
    pub fn recipe_script(&self) -> &str {
        &self.recipe_script
    }

    /// Replace the recipe text; applied by [`validate_recipe`](Self::validate_recipe)
    pub fn set_recipe_script(&mut self, script: impl Into<String>) {
        self.recipe_script = script.into();
    }

    /// Apply the recipe text to the working environment
    ///
    /// On failure the session keeps its last valid state and the errors are
    /// returned.
    pub fn validate_recipe(&mut self) -> Validation {
        match self.apply_recipe_script() {
            Ok(errors) if errors.is_empty() => Validation::valid(),
            Ok(errors) => Validation::from_errors(errors),
            Err(error) => Validation::invalid(error.to_string()),
        }
    }

    /// Whether anything differs from the opened state
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.is_add
            || self.machine_name != self.original_name
            || self.machine.recipe != self.original_recipe
            || self.environment != self.original
    }

    /// Environment to persist, or the validation errors
    pub fn commit(mut self) -> Result<Environment, Validation> {
        let validation = self.validate_recipe();
        if validation.is_valid {
            Ok(self.environment)
        } else {
            Err(validation)
        }
    }

    fn apply_recipe_script(&mut self) -> Result<Vec<String>, ManagerError> {
        let manager = self.manager;
        let fragment = manager.parse_fragment(&self.recipe_script)?;
        let mut edited = self.machine.clone();
        edited.recipe = Some(fragment.clone());
        let new_name = manager.get_machine_name(&edited);

        let (environment, key) = if new_name == self.machine_name {
            (self.environment.clone(), self.machine.name.clone())
        } else {
            let renamed = manager.rename_machine(&self.environment, &self.machine.name, &new_name)?;
            (renamed, self.qualified_name(&new_name))
        };

        let recipe_limit = manager.get_memory_limit(&Machine::new(key.as_str()).with_recipe(fragment.clone()));
        let mut machines = manager.get_machines(&environment);
        let machine = machines
            .iter_mut()
            .find(|machine| machine.name == key)
            .ok_or_else(|| ManagerError::MachineNotFound(key.clone()))?;
        machine.recipe = Some(fragment);
        if let Some(limit) = recipe_limit {
            machine.set_memory_limit_attribute(limit);
        }
        let machine = machine.clone();

        let environment = manager.get_environment(&environment, &machines);
        let errors = manager.validate_recipe(&environment);
        if errors.is_empty() {
            self.environment = environment;
            self.machine = machine;
            self.machine_name = new_name;
        }
        Ok(errors)
    }

    /// Configuration key the edited machine would have under `name`
    fn qualified_name(&self, name: &str) -> String {
        match pod_part(&self.machine.name) {
            Some(pod) if !name.contains(NAME_SEPARATOR) => MachineName::new(pod, name).to_string(),
            _ => name.to_string(),
        }
    }

    fn refresh_script(&mut self) {
        let Some(fragment) = &self.machine.recipe else {
            return;
        };
        match self.manager.stringify_fragment(fragment) {
            Ok(script) => self.recipe_script = script,
            Err(error) => {
                tracing::warn!(machine = %self.machine.name, %error, "could not render machine recipe");
            }
        }
    }
}

fn find_machine(manager: &dyn EnvironmentManager, environment: &Environment, name: &str) -> Option<Machine> {
    manager
        .get_machines(environment)
        .into_iter()
        .find(|machine| machine.name == name)
}
