//! envsync environment managers
//!
//! Keeps a workspace environment's recipe and its machine configuration in
//! sync. One [`EnvironmentManager`] per recipe format:
//! - [`OpenshiftEnvironmentManager`]: `List` of pods, machines named
//!   `<pod>/<container>`
//! - [`ComposeEnvironmentManager`]: one machine per service
//! - [`DockerfileEnvironmentManager`], [`DockerimageEnvironmentManager`]:
//!   exactly one machine
//!
//! [`EnvironmentRegistry`] selects the manager for a recipe type and
//! [`MachineEditSession`] drives a single interactive machine edit.
//!
//! # Example
//!
//! ```rust,ignore
//! use envsync_manager::{EnvironmentRegistry, ManagerConfig};
//!
//! let registry = EnvironmentRegistry::with_defaults(&ManagerConfig::default());
//! let manager = registry.manager_for(&environment).ok_or(Unsupported)?;
//! let mut machines = manager.get_machines(&environment);
//! manager.set_memory_limit(&mut machines[0], 1 << 30);
//! let updated = manager.get_environment(&environment, &machines);
//! ```

#![warn(unreachable_pub)]

pub mod base;
pub mod compose;
mod config;
pub mod dockerfile;
pub mod dockerimage;
mod error;
mod manager;
pub mod openshift;
mod registry;
mod session;
pub mod validation;

pub use compose::ComposeEnvironmentManager;
pub use config::ManagerConfig;
pub use dockerfile::DockerfileEnvironmentManager;
pub use dockerimage::DockerimageEnvironmentManager;
pub use error::{ConfigError, ManagerError, ManagerResult};
pub use manager::{EnvironmentManager, MachineSource};
pub use openshift::OpenshiftEnvironmentManager;
pub use registry::EnvironmentRegistry;
pub use session::MachineEditSession;
pub use validation::{is_valid_machine_name, validate_environment};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
