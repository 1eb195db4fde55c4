//! Dockerfile recipes
//!
//! The document is a sequence of entries, one per logical line:
//! `{instruction, argument}` for instructions and `{comment}` for comment
//! lines. Lines continued with a trailing `\` are joined before parsing.

use crate::codec::{check_size, RecipeCodec, MAX_RECIPE_SIZE};
use crate::document::{get_str, key};
use crate::error::{ParseError, SerializeError, ValidationError};
use envsync_model::Document;
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::fmt::Write as _;

const INSTRUCTION: &str = "instruction";
const ARGUMENT: &str = "argument";
const COMMENT: &str = "comment";

/// Text codec for Dockerfiles
#[derive(Debug, Clone, Copy)]
pub struct DockerfileCodec {
    max_size: usize,
}

impl DockerfileCodec {
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

impl Default for DockerfileCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeCodec for DockerfileCodec {
    fn format(&self) -> &'static str {
        "dockerfile"
    }

    fn content_type(&self) -> &'static str {
        "text/x-dockerfile"
    }

    fn parse(&self, content: &str) -> Result<Document, ParseError> {
        check_size(content, self.max_size)?;

        let mut entries = Vec::new();
        let mut pending = String::new();
        for line in content.lines() {
            let trimmed = line.trim();
            if pending.is_empty() {
                if trimmed.is_empty() {
                    continue;
                }
                if let Some(comment) = trimmed.strip_prefix('#') {
                    entries.push(comment_entry(comment.trim()));
                    continue;
                }
            } else if trimmed.starts_with('#') {
                // comment lines inside a continuation are dropped
                continue;
            }

            match trimmed.strip_suffix('\\') {
                Some(head) => {
                    pending.push_str(head.trim_end());
                    pending.push(' ');
                }
                None => {
                    pending.push_str(trimmed);
                    entries.push(instruction_entry(&pending, self.format())?);
                    pending.clear();
                }
            }
        }
        if !pending.trim().is_empty() {
            entries.push(instruction_entry(&pending, self.format())?);
        }

        if entries.is_empty() {
            return Err(ParseError::Empty(self.format()));
        }
        Ok(Value::Sequence(entries))
    }

    fn serialize(&self, document: &Document) -> Result<String, SerializeError> {
        let entries = document.as_sequence().ok_or_else(|| SerializeError::Shape {
            format: self.format(),
            message: "document must be a sequence of entries".to_string(),
        })?;

        let mut text = String::new();
        for entry in entries {
            if let Some(comment) = get_str(entry, COMMENT) {
                let _ = writeln!(text, "# {comment}");
            } else if let Some(instruction) = get_str(entry, INSTRUCTION) {
                let argument = get_str(entry, ARGUMENT).unwrap_or_default();
                let _ = writeln!(text, "{instruction} {argument}");
            } else {
                return Err(SerializeError::Shape {
                    format: self.format(),
                    message: "entry has neither an instruction nor a comment".to_string(),
                });
            }
        }
        Ok(text)
    }

    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        let entries = document.as_sequence().ok_or_else(|| {
            ValidationError::Invalid("Dockerfile must be a sequence of instructions".to_string())
        })?;
        let first = entries
            .iter()
            .filter_map(|entry| get_str(entry, INSTRUCTION))
            .find(|instruction| *instruction != "ARG");
        match first {
            Some("FROM") => Ok(()),
            Some(other) => Err(ValidationError::Invalid(format!(
                "Dockerfile must start with a FROM instruction, found {other}"
            ))),
            None => Err(ValidationError::MissingSection("FROM".to_string())),
        }
    }
}

fn comment_entry(comment: &str) -> Value {
    let mut entry = Mapping::new();
    entry.insert(key(COMMENT), Value::from(comment));
    Value::Mapping(entry)
}

fn instruction_entry(line: &str, format: &'static str) -> Result<Value, ParseError> {
    let line = line.trim();
    let (instruction, argument) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(instruction, argument)| {
            (instruction, argument.trim())
        });
    if !instruction.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ParseError::syntax(
            format,
            format!("unknown instruction '{instruction}'"),
        ));
    }

    let mut entry = Mapping::new();
    entry.insert(key(INSTRUCTION), Value::from(instruction.to_ascii_uppercase()));
    entry.insert(key(ARGUMENT), Value::from(argument));
    Ok(Value::Mapping(entry))
}

fn instructions(document: &Document) -> impl Iterator<Item = (&str, &str)> {
    document
        .as_sequence()
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            Some((
                get_str(entry, INSTRUCTION)?,
                get_str(entry, ARGUMENT).unwrap_or_default(),
            ))
        })
}

/// Image named by the first `FROM` instruction, without any `AS` stage name
#[must_use]
pub fn from_image(document: &Document) -> Option<&str> {
    instructions(document)
        .find(|(instruction, _)| *instruction == "FROM")
        .and_then(|(_, argument)| argument.split_whitespace().next())
}

/// Point the first `FROM` instruction at `image`, keeping any stage name
///
/// Returns `false` when there is no `FROM` instruction.
pub fn set_from_image(document: &mut Document, image: &str) -> bool {
    let Some(entries) = document.as_sequence_mut() else {
        return false;
    };
    let Some(entry) = entries
        .iter_mut()
        .find(|entry| get_str(entry, INSTRUCTION) == Some("FROM"))
    else {
        return false;
    };

    let stage = get_str(entry, ARGUMENT)
        .and_then(|argument| argument.split_once(char::is_whitespace))
        .map(|(_, stage)| stage.trim().to_string());
    let argument = match stage {
        Some(stage) if !stage.is_empty() => format!("{image} {stage}"),
        _ => image.to_string(),
    };
    if let Some(map) = entry.as_mapping_mut() {
        map.insert(key(ARGUMENT), Value::from(argument));
    }
    true
}

/// Variables set by `ENV` instructions, later ones overriding earlier
///
/// Both `ENV k=v k2="v 2"` and the legacy `ENV k v` form are read.
#[must_use]
pub fn env_variables(document: &Document) -> IndexMap<String, String> {
    let mut variables = IndexMap::new();
    for (_, argument) in instructions(document).filter(|(instruction, _)| *instruction == "ENV") {
        let tokens = split_words(argument);
        if tokens.first().is_some_and(|token| token.contains('=')) {
            for token in tokens {
                if let Some((name, value)) = token.split_once('=') {
                    variables.insert(name.to_string(), value.to_string());
                }
            }
        } else if let Some((name, value)) = argument.split_once(char::is_whitespace) {
            variables.insert(name.to_string(), unquote(value.trim()));
        } else if !argument.is_empty() {
            variables.insert(argument.to_string(), String::new());
        }
    }
    variables
}

/// Replace all `ENV` instructions with one `ENV k=v` per variable
///
/// The new instructions go right after the first `FROM`. Returns `false`
/// when the document is not an entry sequence.
pub fn set_env_variables(document: &mut Document, variables: &IndexMap<String, String>) -> bool {
    let Some(entries) = document.as_sequence_mut() else {
        return false;
    };
    entries.retain(|entry| get_str(entry, INSTRUCTION) != Some("ENV"));

    let position = entries
        .iter()
        .position(|entry| get_str(entry, INSTRUCTION) == Some("FROM"))
        .map_or(0, |index| index + 1);
    let env_entries = variables.iter().map(|(name, value)| {
        let mut entry = Mapping::new();
        entry.insert(key(INSTRUCTION), Value::from("ENV"));
        entry.insert(key(ARGUMENT), Value::from(format!("{name}={}", quote(value))));
        Value::Mapping(entry)
    });
    entries.splice(position..position, env_entries);
    true
}

/// Split on whitespace, keeping double-quoted runs together (quotes removed)
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;
    for c in text.chars() {
        match c {
            _ if escaped => {
                current.push(c);
                escaped = false;
            }
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

fn quote(value: &str) -> String {
    if !value.is_empty() && !value.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
