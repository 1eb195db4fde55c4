//! envsync recipe codecs
//!
//! Parse / validate / serialize for every supported recipe format:
//! - `openshift`: Pod or List manifests (YAML)
//! - `compose`: compose files with a `services` section (YAML)
//! - `dockerfile`: Dockerfile text as an instruction sequence
//! - `dockerimage`: a bare image reference
//!
//! Codecs know document structure only. Mapping documents to machines is
//! the job of the environment managers.
//!
//! # Example
//!
//! ```rust,ignore
//! use envsync_recipe::{OpenshiftCodec, RecipeCodec};
//!
//! let codec = OpenshiftCodec::new();
//! let document = codec.load(content)?;
//! let text = codec.serialize(&document)?;
//! ```

#![warn(unreachable_pub)]

mod codec;
pub mod compose;
pub mod document;
pub mod dockerfile;
pub mod dockerimage;
mod error;
pub mod openshift;
pub mod yaml;

pub use codec::{RecipeCodec, MAX_RECIPE_SIZE};
pub use compose::ComposeCodec;
pub use dockerfile::DockerfileCodec;
pub use dockerimage::DockerimageCodec;
pub use error::{ParseError, RecipeError, RecipeResult, SerializeError, ValidationError};
pub use openshift::OpenshiftCodec;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
