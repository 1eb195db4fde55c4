//! YAML recipe text
//!
//! Shared by the YAML-based formats. A recipe is exactly one non-empty
//! document; multi-document streams are rejected rather than silently
//! truncated.

use crate::codec::check_size;
use crate::error::{ParseError, SerializeError};
use envsync_model::Document;
use serde::Deserialize;
use serde_yaml::Value;

/// Decode one YAML document of at most `max_size` bytes
pub fn parse_document(
    format: &'static str,
    content: &str,
    max_size: usize,
) -> Result<Document, ParseError> {
    check_size(content, max_size)?;

    let de = serde_yaml::Deserializer::from_str(content);
    let mut documents = Vec::new();
    for doc in de {
        let value = Value::deserialize(doc)
            .map_err(|e| ParseError::syntax(format, format!("YAML parse error: {e}")))?;
        documents.push(value);
    }

    match documents.len() {
        0 => Err(ParseError::Empty(format)),
        1 => match documents.pop() {
            Some(Value::Null) | None => Err(ParseError::Empty(format)),
            Some(document) => Ok(document),
        },
        n => {
            tracing::debug!(format, documents = n, "multi-document recipe rejected");
            Err(ParseError::MultipleDocuments(n))
        }
    }
}

/// Encode a document as YAML
pub fn to_yaml(format: &'static str, document: &Document) -> Result<String, SerializeError> {
    serde_yaml::to_string(document).map_err(|e| SerializeError::failed(format, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MAX_RECIPE_SIZE;

    #[test]
    fn parse_single_document() {
        let doc = parse_document("yaml", "kind: Pod\nmetadata:\n  name: p\n", MAX_RECIPE_SIZE).unwrap();
        assert_eq!(doc["kind"], Value::from("Pod"));
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(
            parse_document("yaml", "", MAX_RECIPE_SIZE),
            Err(ParseError::Empty("yaml"))
        );
        assert_eq!(
            parse_document("yaml", "# only a comment\n", MAX_RECIPE_SIZE),
            Err(ParseError::Empty("yaml"))
        );
        assert_eq!(
            parse_document("yaml", "null\n", MAX_RECIPE_SIZE),
            Err(ParseError::Empty("yaml"))
        );
    }

    #[test]
    fn parse_rejects_multi_document() {
        let result = parse_document("yaml", "a: 1\n---\nb: 2\n", MAX_RECIPE_SIZE);
        assert_eq!(result, Err(ParseError::MultipleDocuments(2)));
    }

    #[test]
    fn parse_rejects_bad_syntax() {
        let result = parse_document("yaml", "kind: [unclosed\n", MAX_RECIPE_SIZE);
        assert!(matches!(result, Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn parse_rejects_oversized() {
        let result = parse_document("yaml", "kind: Pod\n", 4);
        assert!(matches!(result, Err(ParseError::TooLarge { size: 10, max: 4 })));
    }

    #[test]
    fn serialize_parses_back() {
        let doc = parse_document("yaml", "items:\n- a\n- b\nkind: List\n", MAX_RECIPE_SIZE).unwrap();
        let text = to_yaml("yaml", &doc).unwrap();
        assert_eq!(parse_document("yaml", &text, MAX_RECIPE_SIZE).unwrap(), doc);
    }
}
