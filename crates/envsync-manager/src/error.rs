//! Error types for environment managers

use envsync_model::NameError;
use envsync_recipe::{ParseError, RecipeError, SerializeError, ValidationError};
use std::path::PathBuf;

/// Errors from edits that fail closed
///
/// The caller keeps its own environment; an error means no new one was
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagerError {
    /// Recipe text could not be decoded
    #[error("recipe parse failed: {0}")]
    Parse(#[from] ParseError),

    /// Updated recipe could not be encoded
    #[error("recipe serialization failed: {0}")]
    Serialize(#[from] SerializeError),

    /// Recipe or fragment lacks the expected shape
    #[error("unexpected recipe structure: {0}")]
    Structure(#[from] ValidationError),

    /// Malformed composite machine name
    #[error("invalid machine name: {0}")]
    InvalidName(#[from] NameError),

    /// Environment has no recipe content
    #[error("environment has no recipe content")]
    MissingRecipe,

    /// Machine has no recipe fragment
    #[error("machine '{0}' has no recipe")]
    MissingRecipeFragment(String),

    /// Old or new machine name is empty
    #[error("machine name is missing")]
    MissingName,

    /// Named machine is not in the recipe or configuration
    #[error("machine '{0}' not found")]
    MachineNotFound(String),

    /// Target name is already taken
    #[error("machine name '{0}' is already in use")]
    NameConflict(String),

    /// Rename would move a container to another pod
    #[error("cannot move machine '{machine}' to pod '{pod}'")]
    PodMismatch {
        /// Machine being renamed
        machine: String,
        /// Requested pod
        pod: String,
    },

    /// Every candidate name with this prefix is taken
    #[error("no free name with prefix '{0}'")]
    NoFreeName(String),

    /// Operation not available for this recipe type
    #[error("{operation} is not supported for '{recipe_type}' recipes")]
    Unsupported {
        /// Operation name
        operation: &'static str,
        /// Recipe type of the manager
        recipe_type: String,
    },
}

impl ManagerError {
    /// Create unsupported-operation error
    pub fn unsupported(operation: &'static str, recipe_type: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            recipe_type: recipe_type.into(),
        }
    }

    /// Log the error at the manager boundary and hand it back
    #[must_use]
    pub fn logged(self, recipe_type: &str, operation: &'static str) -> Self {
        tracing::error!(recipe_type, operation, error = %self, "environment edit failed");
        self
    }
}

/// Error mapper logging failures of `operation` on `recipe_type` recipes
pub(crate) fn log_failure(
    recipe_type: &'static str,
    operation: &'static str,
) -> impl Fn(ManagerError) -> ManagerError {
    move |error| error.logged(recipe_type, operation)
}

impl From<RecipeError> for ManagerError {
    fn from(err: RecipeError) -> Self {
        match err {
            RecipeError::Parse(e) => Self::Parse(e),
            RecipeError::Validation(e) => Self::Structure(e),
            RecipeError::Serialize(e) => Self::Serialize(e),
        }
    }
}

/// Result type alias for manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors loading a [`ManagerConfig`](crate::ManagerConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for the config schema
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_display() {
        let err = ManagerError::unsupported("delete_machine", "openshift");
        assert_eq!(
            err.to_string(),
            "delete_machine is not supported for 'openshift' recipes"
        );
    }

    #[test]
    fn recipe_error_conversion() {
        let err: ManagerError = RecipeError::Validation(ValidationError::MissingKind).into();
        assert!(matches!(err, ManagerError::Structure(ValidationError::MissingKind)));
        let err: ManagerError = RecipeError::Parse(ParseError::Empty("compose")).into();
        assert!(matches!(err, ManagerError::Parse(_)));
    }

    #[test]
    fn logged_returns_same_error() {
        let err = ManagerError::MissingRecipe.logged("openshift", "add_machine");
        assert_eq!(err, ManagerError::MissingRecipe);
    }
}
