//! Dot-path access into recipe documents

use envsync_model::Document;
use serde_yaml::{Mapping, Value};

/// Mapping key for a field name
#[inline]
#[must_use]
pub fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

/// Value at a dot-separated path (`metadata.name`)
#[must_use]
pub fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Document> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

/// Mutable value at a dot-separated path
#[must_use]
pub fn get_path_mut<'a>(document: &'a mut Document, path: &str) -> Option<&'a mut Document> {
    path.split('.')
        .try_fold(document, |current, segment| current.get_mut(segment))
}

/// String at a dot-separated path
#[inline]
#[must_use]
pub fn get_str<'a>(document: &'a Document, path: &str) -> Option<&'a str> {
    get_path(document, path)?.as_str()
}

/// Set value at a dot-separated path
///
/// Intermediate mappings are created as needed; a non-mapping value on the
/// way is replaced by a mapping.
pub fn set_path(document: &mut Document, path: &str, value: Document) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = document;
    for segment in segments {
        if !current.is_mapping() {
            *current = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(map) = current else {
            return;
        };
        current = map
            .entry(key(segment))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    if !current.is_mapping() {
        *current = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = current {
        map.insert(key(last), value);
    }
}

/// Remove the value at a dot-separated path, returning it
pub fn remove_path(document: &mut Document, path: &str) -> Option<Document> {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (get_path_mut(document, parent)?, last),
        None => (document, path),
    };
    parent.as_mapping_mut()?.shift_remove(last)
}
