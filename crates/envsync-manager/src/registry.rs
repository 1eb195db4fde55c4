//! Manager registry
//!
//! Maps recipe type tags to their [`EnvironmentManager`]. Unknown types
//! yield `None`; callers fall back to read-only handling.

use crate::compose::ComposeEnvironmentManager;
use crate::config::ManagerConfig;
use crate::dockerfile::DockerfileEnvironmentManager;
use crate::dockerimage::DockerimageEnvironmentManager;
use crate::manager::EnvironmentManager;
use crate::openshift::OpenshiftEnvironmentManager;
use envsync_model::Environment;
use indexmap::IndexMap;
use std::fmt;

/// Registry of environment managers keyed by recipe type
#[derive(Default)]
pub struct EnvironmentRegistry {
    managers: IndexMap<String, Box<dyn EnvironmentManager>>,
}

impl EnvironmentRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            managers: IndexMap::new(),
        }
    }

    /// Create registry with every built-in manager sharing `config`
    #[must_use]
    pub fn with_defaults(config: &ManagerConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(OpenshiftEnvironmentManager::new(config.clone())));
        registry.register(Box::new(ComposeEnvironmentManager::new(config.clone())));
        registry.register(Box::new(DockerfileEnvironmentManager::new(config.clone())));
        registry.register(Box::new(DockerimageEnvironmentManager::new(config.clone())));
        registry
    }

    /// Register a manager under its recipe type, replacing any previous one
    pub fn register(&mut self, manager: Box<dyn EnvironmentManager>) {
        self.managers
            .insert(manager.recipe_type().to_ascii_lowercase(), manager);
    }

    /// Manager for `recipe_type`, matched case-insensitively
    #[must_use]
    pub fn get_environment_manager(&self, recipe_type: &str) -> Option<&dyn EnvironmentManager> {
        let manager = self
            .managers
            .get(recipe_type.to_ascii_lowercase().as_str())
            .map(Box::as_ref);
        if manager.is_none() {
            tracing::debug!(recipe_type, "no manager for recipe type");
        }
        manager
    }

    /// Manager for the environment's recipe type
    #[inline]
    #[must_use]
    pub fn manager_for(&self, environment: &Environment) -> Option<&dyn EnvironmentManager> {
        self.get_environment_manager(environment.recipe_type())
    }

    /// Check if a manager exists for `recipe_type`
    #[inline]
    #[must_use]
    pub fn contains(&self, recipe_type: &str) -> bool {
        self.managers
            .contains_key(recipe_type.to_ascii_lowercase().as_str())
    }

    /// Registered recipe types, in registration order
    #[must_use]
    pub fn types(&self) -> Vec<&str> {
        self.managers.keys().map(String::as_str).collect()
    }

    /// Get number of registered managers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl fmt::Debug for EnvironmentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentRegistry")
            .field("types", &self.types())
            .finish()
    }
}
