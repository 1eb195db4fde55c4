//! Error types for recipe codecs
//!
//! Split the same way a recipe moves through a codec:
//! - Parse operations (text → document)
//! - Validate operations (structural checks on a document)
//! - Serialize operations (document → text)

/// Errors while decoding recipe text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Text is not well-formed for the format
    #[error("syntax error in {format} recipe: {message}")]
    Syntax {
        /// Format being decoded
        format: &'static str,
        /// Decoder message
        message: String,
    },

    /// Text decodes to nothing
    #[error("empty {0} recipe")]
    Empty(&'static str),

    /// More than one YAML document in the text
    #[error("recipe contains {0} documents, expected exactly one")]
    MultipleDocuments(usize),

    /// Text exceeds the configured size bound
    #[error("recipe is {size} bytes, larger than the {max} byte limit")]
    TooLarge {
        /// Actual size
        size: usize,
        /// Configured maximum
        max: usize,
    },
}

impl ParseError {
    /// Create syntax error for format
    pub fn syntax(format: &'static str, message: impl Into<String>) -> Self {
        Self::Syntax {
            format,
            message: message.into(),
        }
    }
}

/// Errors while encoding a document back to text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    /// Encoder failed
    #[error("failed to serialize {format} recipe: {message}")]
    Failed {
        /// Format being encoded
        format: &'static str,
        /// Encoder message
        message: String,
    },

    /// Document shape cannot be expressed in the format
    #[error("cannot serialize {format} recipe: {message}")]
    Shape {
        /// Format being encoded
        format: &'static str,
        /// What was wrong with the document
        message: String,
    },
}

impl SerializeError {
    /// Create encoder failure for format
    pub fn failed(format: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            format,
            message: message.into(),
        }
    }
}

/// Structural mismatches found in a parsed document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Document is not a mapping
    #[error("recipe must be a mapping")]
    NotAMapping,

    /// `kind` is missing or not a string
    #[error("recipe has no intelligible 'kind'")]
    MissingKind,

    /// `kind` is present but not the one required
    #[error("unexpected recipe kind: expected {expected}, got {actual}")]
    UnexpectedKind {
        /// Required kind
        expected: String,
        /// Kind found in the document
        actual: String,
    },

    /// A required section is missing or has the wrong shape
    #[error("recipe should contain a '{0}' section")]
    MissingSection(String),

    /// Any other structural problem
    #[error("{0}")]
    Invalid(String),
}

impl ValidationError {
    /// Create unexpected-kind error
    pub fn unexpected_kind(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedKind {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Combined codec error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeError {
    /// Decoding failed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Structural check failed
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Encoding failed
    #[error("serialize error: {0}")]
    Serialize(#[from] SerializeError),
}

/// Result type alias for codec operations
pub type RecipeResult<T> = Result<T, RecipeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::TooLarge { size: 10, max: 5 };
        assert_eq!(err.to_string(), "recipe is 10 bytes, larger than the 5 byte limit");
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::unexpected_kind("List", "Pod");
        assert_eq!(err.to_string(), "unexpected recipe kind: expected List, got Pod");
    }

    #[test]
    fn error_conversions() {
        let err: RecipeError = ValidationError::MissingKind.into();
        assert!(matches!(err, RecipeError::Validation(_)));
        let err: RecipeError = ParseError::Empty("yaml").into();
        assert!(matches!(err, RecipeError::Parse(_)));
    }
}
