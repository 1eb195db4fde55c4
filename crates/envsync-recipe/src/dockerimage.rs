//! Docker image recipes
//!
//! The recipe content is a bare image reference; the document is
//! `{image: <reference>}`.

use crate::codec::{check_size, RecipeCodec, MAX_RECIPE_SIZE};
use crate::document::{get_str, key};
use crate::error::{ParseError, SerializeError, ValidationError};
use envsync_model::Document;
use serde_yaml::{Mapping, Value};

const IMAGE: &str = "image";

/// Codec for image references
#[derive(Debug, Clone, Copy)]
pub struct DockerimageCodec {
    max_size: usize,
}

impl DockerimageCodec {
    /// Create codec with the default size bound
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_size: MAX_RECIPE_SIZE,
        }
    }

    /// Set maximum accepted recipe size in bytes
    #[inline]
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

impl Default for DockerimageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeCodec for DockerimageCodec {
    fn format(&self) -> &'static str {
        "dockerimage"
    }

    fn content_type(&self) -> &'static str {
        "text/plain"
    }

    fn parse(&self, content: &str) -> Result<Document, ParseError> {
        check_size(content, self.max_size)?;
        let reference = content.trim();
        if reference.is_empty() {
            return Err(ParseError::Empty(self.format()));
        }
        if reference.contains(char::is_whitespace) {
            return Err(ParseError::syntax(
                self.format(),
                format!("'{reference}' is not a single image reference"),
            ));
        }
        Ok(image_document(reference))
    }

    fn serialize(&self, document: &Document) -> Result<String, SerializeError> {
        image(document)
            .map(str::to_string)
            .ok_or_else(|| SerializeError::Shape {
                format: self.format(),
                message: "document has no image reference".to_string(),
            })
    }

    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        match image(document) {
            Some(reference) if !reference.is_empty() => Ok(()),
            _ => Err(ValidationError::MissingSection(IMAGE.to_string())),
        }
    }
}

/// Document holding one image reference
#[must_use]
pub fn image_document(reference: &str) -> Document {
    let mut map = Mapping::new();
    map.insert(key(IMAGE), Value::from(reference));
    Value::Mapping(map)
}

/// Image reference of a document
#[inline]
#[must_use]
pub fn image(document: &Document) -> Option<&str> {
    get_str(document, IMAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reference() {
        let codec = DockerimageCodec::new();
        let doc = codec.load("  eclipse/ubuntu_jdk8:latest\n").unwrap();
        assert_eq!(image(&doc), Some("eclipse/ubuntu_jdk8:latest"));
        assert_eq!(codec.serialize(&doc).unwrap(), "eclipse/ubuntu_jdk8:latest");
    }

    #[test]
    fn parse_rejects_empty_and_multiple() {
        let codec = DockerimageCodec::new();
        assert_eq!(codec.parse("  "), Err(ParseError::Empty("dockerimage")));
        assert!(matches!(
            codec.parse("ubuntu debian"),
            Err(ParseError::Syntax { .. })
        ));
    }

    #[test]
    fn validate_requires_image() {
        let codec = DockerimageCodec::new();
        assert!(codec.validate(&image_document("")).is_err());
        assert!(codec.validate(&Value::Null).is_err());
    }
}
