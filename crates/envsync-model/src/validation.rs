//! Validation results surfaced to interactive callers

use serde::{Deserialize, Serialize};

/// Outcome of validating a recipe edit or an environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    /// Whether no errors were found
    pub is_valid: bool,
    /// Human-readable error messages
    #[serde(default)]
    pub errors: Vec<String>,
}

impl Validation {
    /// Successful validation
    #[inline]
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// Failed validation with one message
    #[inline]
    #[must_use]
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![error.into()],
        }
    }

    /// Valid exactly when `errors` is empty
    #[inline]
    #[must_use]
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::valid()
    }
}
