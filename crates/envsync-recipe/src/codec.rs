//! Recipe codec trait
//!
//! A codec turns recipe text into a generic [`Document`] and back. It knows
//! the format's syntax and its minimal structure (document kind, required
//! sections), nothing about machines.

use crate::error::{ParseError, RecipeError, SerializeError, ValidationError};
use envsync_model::Document;
use std::fmt::Debug;

/// Default upper bound on recipe text (1 MiB)
pub const MAX_RECIPE_SIZE: usize = 1024 * 1024;

/// Parse, validate and serialize one recipe format
///
/// `serialize(parse(x))` must parse back to a document equal to
/// `parse(x)`; field order and formatting may differ.
pub trait RecipeCodec: Send + Sync + Debug {
    /// Format name used in error messages
    fn format(&self) -> &'static str;

    /// MIME type of recipe content
    fn content_type(&self) -> &'static str;

    /// Decode recipe text
    fn parse(&self, content: &str) -> Result<Document, ParseError>;

    /// Encode a document
    fn serialize(&self, document: &Document) -> Result<String, SerializeError>;

    /// Minimal structural checks
    fn validate(&self, document: &Document) -> Result<(), ValidationError>;

    /// Decode then validate
    fn load(&self, content: &str) -> Result<Document, RecipeError> {
        let document = self.parse(content)?;
        if let Err(error) = self.validate(&document) {
            tracing::debug!(format = self.format(), %error, "recipe rejected by validation");
            return Err(error.into());
        }
        Ok(document)
    }
}

/// Reject content over `max` bytes
pub(crate) fn check_size(content: &str, max: usize) -> Result<(), ParseError> {
    if content.len() > max {
        tracing::warn!(size = content.len(), max, "recipe exceeds size limit");
        return Err(ParseError::TooLarge {
            size: content.len(),
            max,
        });
    }
    Ok(())
}
