//! Compose recipes
//!
//! A recipe is a mapping with a `services` section; each service is one
//! machine, named by its key.

use crate::codec::{RecipeCodec, MAX_RECIPE_SIZE};
use crate::document::{get_str, key, remove_path, set_path};
use crate::error::{ParseError, SerializeError, ValidationError};
use crate::yaml::{parse_document, to_yaml};
use envsync_model::{limit_string_to_bytes, Document};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

const SERVICES: &str = "services";
const MEM_LIMIT: &str = "mem_limit";
const ENVIRONMENT: &str = "environment";
const DEPENDS_ON: &str = "depends_on";
const LINKS: &str = "links";

/// YAML codec for compose recipes
#[derive(Debug, Clone, Copy)]
pub struct ComposeCodec {
    max_size: usize,
}

impl ComposeCodec {
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

impl Default for ComposeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeCodec for ComposeCodec {
    fn format(&self) -> &'static str {
        "compose"
    }

    fn content_type(&self) -> &'static str {
        "application/x-yaml"
    }

    fn parse(&self, content: &str) -> Result<Document, ParseError> {
        parse_document(self.format(), content, self.max_size)
    }

    fn serialize(&self, document: &Document) -> Result<String, SerializeError> {
        to_yaml(self.format(), document)
    }

    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        if !document.is_mapping() {
            return Err(ValidationError::NotAMapping);
        }
        services(document).ok_or_else(|| ValidationError::MissingSection(SERVICES.to_string()))?;
        Ok(())
    }
}

/// `services` mapping
#[inline]
#[must_use]
pub fn services(document: &Document) -> Option<&Mapping> {
    document.get(SERVICES)?.as_mapping()
}

/// Mutable `services` mapping
#[inline]
#[must_use]
pub fn services_mut(document: &mut Document) -> Option<&mut Mapping> {
    document.get_mut(SERVICES)?.as_mapping_mut()
}

/// Service names in recipe order
#[must_use]
pub fn service_names(document: &Document) -> Vec<String> {
    services(document)
        .map(|services| {
            services
                .keys()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Service `mem_limit` in bytes (integer or limit string)
#[must_use]
pub fn service_memory_limit(service: &Document) -> Option<u64> {
    match service_memory_limit_value(service)? {
        Value::Number(bytes) => bytes.as_u64(),
        Value::String(limit) => {
            let limit = limit.trim();
            limit.parse().ok().or_else(|| limit_string_to_bytes(limit))
        }
        _ => None,
    }
}

/// Raw `mem_limit` value, readable or not
#[inline]
#[must_use]
pub fn service_memory_limit_value(service: &Document) -> Option<&Value> {
    service.get(MEM_LIMIT)
}

/// Write `mem_limit` as a byte count
pub fn set_service_memory_limit(service: &mut Document, bytes: u64) {
    set_path(service, MEM_LIMIT, Value::from(bytes));
}

/// Service `image`
#[inline]
#[must_use]
pub fn service_image(service: &Document) -> Option<&str> {
    get_str(service, "image")
}

/// Build context and Dockerfile of a service
///
/// `build` may be a plain context path or a mapping with `context` and
/// `dockerfile`.
#[must_use]
pub fn service_build(service: &Document) -> Option<(String, Option<String>)> {
    match service.get("build")? {
        Value::String(context) => Some((context.clone(), None)),
        build @ Value::Mapping(_) => Some((
            get_str(build, "context").unwrap_or(".").to_string(),
            get_str(build, "dockerfile").map(str::to_string),
        )),
        _ => None,
    }
}

/// Environment variables of a service
///
/// `environment` may be a mapping or a list of `KEY=VALUE` strings; a bare
/// `KEY` reads as an empty value. `None` when the section is absent.
#[must_use]
pub fn service_env(service: &Document) -> Option<IndexMap<String, String>> {
    match service.get(ENVIRONMENT)? {
        Value::Mapping(map) => Some(
            map.iter()
                .filter_map(|(name, value)| {
                    let value = match value {
                        Value::Null => String::new(),
                        Value::String(text) => text.clone(),
                        Value::Bool(flag) => flag.to_string(),
                        Value::Number(number) => number.to_string(),
                        _ => return None,
                    };
                    Some((name.as_str()?.to_string(), value))
                })
                .collect(),
        ),
        Value::Sequence(entries) => Some(
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(|entry| match entry.split_once('=') {
                    Some((name, value)) => (name.to_string(), value.to_string()),
                    None => (entry.to_string(), String::new()),
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Replace service environment variables, written as a mapping
///
/// An empty map removes the section.
pub fn set_service_env(service: &mut Document, variables: &IndexMap<String, String>) {
    if variables.is_empty() {
        remove_path(service, ENVIRONMENT);
        return;
    }
    let map: Mapping = variables
        .iter()
        .map(|(name, value)| (key(name), Value::from(value.as_str())))
        .collect();
    set_path(service, ENVIRONMENT, Value::Mapping(map));
}

/// Service names this service depends on, via `depends_on` and `links`
///
/// Link entries of the form `name:alias` contribute `name`.
#[must_use]
pub fn service_dependencies(service: &Document) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for section in [DEPENDS_ON, LINKS] {
        for entry in reference_entries(service, section) {
            let name = link_target(entry).to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Rewrite references to service `old` as `new` in every other service
pub fn rename_service_references(document: &mut Document, old: &str, new: &str) {
    let Some(services) = services_mut(document) else {
        return;
    };
    for (_, service) in services.iter_mut() {
        for section in [DEPENDS_ON, LINKS] {
            rewrite_references(service, section, |entry| {
                let target = link_target(entry);
                if target != old {
                    return Some(entry.to_string());
                }
                Some(match entry.split_once(':') {
                    Some((_, alias)) => format!("{new}:{alias}"),
                    None => new.to_string(),
                })
            });
        }
    }
}

/// Drop references to service `name` from every other service
///
/// Sections left empty are removed.
pub fn remove_service_references(document: &mut Document, name: &str) {
    let Some(services) = services_mut(document) else {
        return;
    };
    for (_, service) in services.iter_mut() {
        for section in [DEPENDS_ON, LINKS] {
            rewrite_references(service, section, |entry| {
                (link_target(entry) != name).then(|| entry.to_string())
            });
        }
    }
}

/// Move `services.<old>` to `services.<new>` in place
///
/// Returns `false` when `old` is missing or `new` is taken.
pub fn rename_service(document: &mut Document, old: &str, new: &str) -> bool {
    let Some(services) = services_mut(document) else {
        return false;
    };
    if !services.contains_key(old) || services.contains_key(new) {
        return false;
    }
    let renamed: Mapping = std::mem::take(services)
        .into_iter()
        .map(|(name, service)| {
            if name.as_str() == Some(old) {
                (key(new), service)
            } else {
                (name, service)
            }
        })
        .collect();
    *services = renamed;
    true
}

fn link_target(entry: &str) -> &str {
    entry.split_once(':').map_or(entry, |(name, _)| name)
}

fn reference_entries<'a>(service: &'a Document, section: &str) -> Vec<&'a str> {
    match service.get(section) {
        Some(Value::Sequence(entries)) => entries.iter().filter_map(Value::as_str).collect(),
        Some(Value::Mapping(entries)) => entries.keys().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Apply `rewrite` to each entry of a `depends_on`/`links` section
///
/// Entries mapped to `None` are dropped; an emptied section is removed.
fn rewrite_references<F>(service: &mut Document, section: &str, rewrite: F)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(entries) = service.get_mut(section) else {
        return;
    };
    let emptied = match entries {
        Value::Sequence(list) => {
            let rewritten: Vec<Value> = list
                .iter()
                .filter_map(|entry| match entry.as_str() {
                    Some(text) => rewrite(text).map(Value::String),
                    None => Some(entry.clone()),
                })
                .collect();
            *list = rewritten;
            list.is_empty()
        }
        Value::Mapping(map) => {
            let rewritten: Mapping = std::mem::take(map)
                .into_iter()
                .filter_map(|(name, condition)| match name.as_str() {
                    Some(text) => rewrite(text).map(|renamed| (key(&renamed), condition)),
                    None => Some((name, condition)),
                })
                .collect();
            *map = rewritten;
            map.is_empty()
        }
        _ => false,
    };
    if emptied {
        remove_path(service, section);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COMPOSE: &str = r"
services:
  db:
    image: postgres
    mem_limit: 536870912
    environment:
      POSTGRES_USER: che
  web:
    build:
      context: ./web
      dockerfile: Dockerfile.dev
    mem_limit: 1Gi
    depends_on:
    - db
    links:
    - db:database
    environment:
    - MODE=dev
    - DEBUG
";

    fn compose() -> Document {
        ComposeCodec::new().load(COMPOSE).unwrap()
    }

    fn service<'a>(doc: &'a Document, name: &str) -> &'a Document {
        &services(doc).unwrap()[name]
    }

    #[test]
    fn codec_requires_services() {
        let codec = ComposeCodec::new();
        assert!(matches!(
            codec.load("version: '3'\n"),
            Err(crate::RecipeError::Validation(ValidationError::MissingSection(_)))
        ));
        assert!(codec.load("services: {}\n").is_ok());
    }

    #[test]
    fn names_in_order() {
        assert_eq!(service_names(&compose()), vec!["db", "web"]);
    }

    #[test]
    fn memory_limits() {
        let doc = compose();
        assert_eq!(service_memory_limit(service(&doc, "db")), Some(536_870_912));
        assert_eq!(service_memory_limit(service(&doc, "web")), Some(1024 * 1024 * 1024));

        let mut svc = service(&doc, "db").clone();
        set_service_memory_limit(&mut svc, 2048);
        assert_eq!(svc[MEM_LIMIT], Value::from(2048));
    }

    #[test]
    fn environment_forms() {
        let doc = compose();
        let db = service_env(service(&doc, "db")).unwrap();
        assert_eq!(db["POSTGRES_USER"], "che");
        let web = service_env(service(&doc, "web")).unwrap();
        assert_eq!(web["MODE"], "dev");
        assert_eq!(web["DEBUG"], "");
    }

    #[test]
    fn set_environment_as_mapping() {
        let doc = compose();
        let mut web = service(&doc, "web").clone();
        let mut vars = IndexMap::new();
        vars.insert("MODE".to_string(), "prod".to_string());
        set_service_env(&mut web, &vars);
        assert!(web[ENVIRONMENT].is_mapping());
        assert_eq!(service_env(&web).unwrap(), vars);

        set_service_env(&mut web, &IndexMap::new());
        assert!(web.get(ENVIRONMENT).is_none());
    }

    #[test]
    fn build_and_image() {
        let doc = compose();
        assert_eq!(service_image(service(&doc, "db")), Some("postgres"));
        assert_eq!(
            service_build(service(&doc, "web")),
            Some(("./web".to_string(), Some("Dockerfile.dev".to_string())))
        );
    }

    #[test]
    fn dependencies_dedupe_links() {
        let doc = compose();
        assert_eq!(service_dependencies(service(&doc, "web")), vec!["db"]);
        assert!(service_dependencies(service(&doc, "db")).is_empty());
    }

    #[test]
    fn rename_moves_key_and_references() {
        let mut doc = compose();
        assert!(rename_service(&mut doc, "db", "postgres"));
        rename_service_references(&mut doc, "db", "postgres");

        assert_eq!(service_names(&doc), vec!["postgres", "web"]);
        let web = service(&doc, "web");
        assert_eq!(web[DEPENDS_ON][0], Value::from("postgres"));
        assert_eq!(web[LINKS][0], Value::from("postgres:database"));
    }

    #[test]
    fn rename_rejects_conflict() {
        let mut doc = compose();
        assert!(!rename_service(&mut doc, "db", "web"));
        assert!(!rename_service(&mut doc, "cache", "redis"));
    }

    #[test]
    fn remove_references_drops_empty_sections() {
        let mut doc = compose();
        remove_service_references(&mut doc, "db");
        let web = service(&doc, "web");
        assert!(web.get(DEPENDS_ON).is_none());
        assert!(web.get(LINKS).is_none());
    }
}
