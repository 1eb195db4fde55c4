//! Composite machine names
//!
//! Pod-based recipes address a machine by `<pod>/<container>`. Internally the
//! two parts are kept apart in [`MachineName`]; the delimited form only
//! appears at the environment boundary (map keys, `Machine::name`).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Separator between the pod and container parts
pub const NAME_SEPARATOR: char = '/';

/// Two-part machine key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MachineName {
    pod: String,
    container: String,
}

impl MachineName {
    /// Create from pod and container parts
    #[inline]
    #[must_use]
    pub fn new(pod: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            container: container.into(),
        }
    }

    /// Pod part
    #[inline]
    #[must_use]
    pub fn pod(&self) -> &str {
        &self.pod
    }

    /// Container part
    #[inline]
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Same pod, different container
    #[inline]
    #[must_use]
    pub fn with_container(&self, container: impl Into<String>) -> Self {
        Self {
            pod: self.pod.clone(),
            container: container.into(),
        }
    }
}

impl Display for MachineName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pod, NAME_SEPARATOR, self.container)
    }
}

impl FromStr for MachineName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pod, container) = s
            .split_once(NAME_SEPARATOR)
            .ok_or_else(|| NameError::NotComposite(s.to_string()))?;
        if pod.is_empty() || container.is_empty() {
            return Err(NameError::EmptySegment(s.to_string()));
        }
        if container.contains(NAME_SEPARATOR) {
            return Err(NameError::TooManySegments(s.to_string()));
        }
        Ok(Self::new(pod, container))
    }
}

/// Container part of a possibly composite name
///
/// `pod/main` yields `main`; a plain name is returned unchanged.
#[inline]
#[must_use]
pub fn container_part(name: &str) -> &str {
    name.split_once(NAME_SEPARATOR)
        .map_or(name, |(_, container)| container)
}

/// Pod part of a composite name, if any
#[inline]
#[must_use]
pub fn pod_part(name: &str) -> Option<&str> {
    name.split_once(NAME_SEPARATOR).map(|(pod, _)| pod)
}

/// Errors related to composite machine names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// No separator in name
    #[error("machine name '{0}' is not of the form <pod>/<container>")]
    NotComposite(String),

    /// Pod or container part is empty
    #[error("machine name '{0}' has an empty pod or container part")]
    EmptySegment(String),

    /// More than one separator
    #[error("machine name '{0}' has more than one '/' separator")]
    TooManySegments(String),
}
