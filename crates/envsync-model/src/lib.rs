//! envsync data model
//!
//! Value types shared by the recipe codecs and the environment managers.
//!
//! # Core Concepts
//!
//! - [`Environment`]: recipe reference plus per-machine configuration
//! - [`Machine`]: format-independent view of one runtime container
//! - [`MachineName`]: composite `<pod>/<container>` key
//! - [`MemoryUnit`]: suffix table for memory limit strings
//! - [`Validation`]: `{isValid, errors}` result for interactive flows
//!
//! Every type here is a plain value. Operations that change an environment
//! take it by reference and hand back a new one.

#![warn(unreachable_pub)]

mod environment;
mod machine;
mod name;
mod units;
mod validation;

pub use environment::{Environment, MachineConfig, Recipe, ServerConfig, MEMORY_LIMIT_ATTRIBUTE};
pub use machine::{Document, Machine};
pub use name::{container_part, pod_part, MachineName, NameError, NAME_SEPARATOR};
pub use units::{
    bytes_to_limit_string, limit_string_to_bytes, MemoryUnit, UnknownUnit,
    DEFAULT_MEMORY_LIMIT_BYTES,
};
pub use validation::Validation;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
