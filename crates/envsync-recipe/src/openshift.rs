//! OpenShift Pod/List recipes
//!
//! A recipe is either a single `Pod` or a `List` whose `items` are pods.
//! Each pod holds its containers under `spec.containers`; the pod is named
//! by `metadata.name`, falling back to `metadata.generateName`.

use crate::codec::{RecipeCodec, MAX_RECIPE_SIZE};
use crate::document::{get_path, get_path_mut, get_str, key, remove_path, set_path};
use crate::error::{ParseError, SerializeError, ValidationError};
use crate::yaml::{parse_document, to_yaml};
use envsync_model::{bytes_to_limit_string, limit_string_to_bytes, Document, MemoryUnit};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

/// `kind` of a single-pod recipe
pub const KIND_POD: &str = "Pod";

/// `kind` of a multi-pod recipe
pub const KIND_LIST: &str = "List";

const CONTAINERS_PATH: &str = "spec.containers";
const MEMORY_LIMIT_PATH: &str = "resources.limits.memory";

/// YAML codec for OpenShift recipes
#[derive(Debug, Clone, Copy)]
pub struct OpenshiftCodec {
    max_size: usize,
}

impl OpenshiftCodec {
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

impl Default for OpenshiftCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeCodec for OpenshiftCodec {
    fn format(&self) -> &'static str {
        "openshift"
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
        kind(document).ok_or(ValidationError::MissingKind)?;
        Ok(())
    }
}

/// Document `kind`
#[inline]
#[must_use]
pub fn kind(document: &Document) -> Option<&str> {
    get_str(document, "kind")
}

/// Whether the document `kind` is `expected`, ignoring ASCII case
#[inline]
#[must_use]
pub fn is_kind(document: &Document, expected: &str) -> bool {
    kind(document).is_some_and(|actual| actual.eq_ignore_ascii_case(expected))
}

/// Pods of a `List` recipe; `None` when not a list with an `items` sequence
#[must_use]
pub fn list_items(document: &Document) -> Option<&Vec<Value>> {
    if !is_kind(document, KIND_LIST) {
        return None;
    }
    document.get("items")?.as_sequence()
}

/// Mutable pods of a `List` recipe
#[must_use]
pub fn list_items_mut(document: &mut Document) -> Option<&mut Vec<Value>> {
    if !is_kind(document, KIND_LIST) {
        return None;
    }
    document.get_mut("items")?.as_sequence_mut()
}

/// Pod name: `metadata.name`, else `metadata.generateName`
#[must_use]
pub fn pod_name(pod: &Document) -> Option<&str> {
    get_str(pod, "metadata.name")
        .filter(|name| !name.is_empty())
        .or_else(|| get_str(pod, "metadata.generateName").filter(|name| !name.is_empty()))
}

/// Set `metadata.name`
pub fn set_pod_name(pod: &mut Document, name: &str) {
    set_path(pod, "metadata.name", Value::from(name));
}

/// Containers of a pod; empty when the pod has none
#[must_use]
pub fn containers(pod: &Document) -> &[Value] {
    get_path(pod, CONTAINERS_PATH)
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Mutable containers of a pod
#[must_use]
pub fn containers_mut(pod: &mut Document) -> Option<&mut Vec<Value>> {
    get_path_mut(pod, CONTAINERS_PATH)?.as_sequence_mut()
}

/// Container `name`
#[inline]
#[must_use]
pub fn container_name(container: &Document) -> Option<&str> {
    get_str(container, "name")
}

/// Find a container by name
#[must_use]
pub fn find_container<'a>(pod: &'a Document, name: &str) -> Option<&'a Document> {
    containers(pod)
        .iter()
        .find(|container| container_name(container) == Some(name))
}

/// Find a container by name, mutably
#[must_use]
pub fn find_container_mut<'a>(pod: &'a mut Document, name: &str) -> Option<&'a mut Document> {
    containers_mut(pod)?
        .iter_mut()
        .find(|container| container_name(container) == Some(name))
}

/// The only container of a pod fragment
#[must_use]
pub fn single_container(pod: &Document) -> Option<&Document> {
    match containers(pod) {
        [container] => Some(container),
        _ => None,
    }
}

/// The only container of a pod fragment, mutably
#[must_use]
pub fn single_container_mut(pod: &mut Document) -> Option<&mut Document> {
    match containers_mut(pod)?.as_mut_slice() {
        [container] => Some(container),
        _ => None,
    }
}

/// Copy of `pod` reduced to the container at `index`
#[must_use]
pub fn single_container_pod(pod: &Document, index: usize) -> Option<Document> {
    let container = containers(pod).get(index)?.clone();
    let mut fragment = pod.clone();
    set_path(&mut fragment, CONTAINERS_PATH, Value::Sequence(vec![container]));
    Some(fragment)
}

/// Container memory limit in bytes
///
/// Reads `resources.limits.memory` as a limit string, or as a plain byte
/// count when the recipe holds a number. Unparseable limits read as `None`.
#[must_use]
pub fn container_memory_limit(container: &Document) -> Option<u64> {
    match container_memory_limit_value(container)? {
        Value::String(limit) => limit_string_to_bytes(limit.trim()),
        Value::Number(bytes) => bytes.as_u64(),
        _ => None,
    }
}

/// Raw `resources.limits.memory` value, readable or not
#[inline]
#[must_use]
pub fn container_memory_limit_value(container: &Document) -> Option<&Value> {
    get_path(container, MEMORY_LIMIT_PATH)
}

/// Write `resources.limits.memory` as a limit string in `unit`
pub fn set_container_memory_limit(container: &mut Document, bytes: u64, unit: MemoryUnit) {
    set_path(
        container,
        MEMORY_LIMIT_PATH,
        Value::String(bytes_to_limit_string(bytes, unit)),
    );
}

/// Container `image`
#[inline]
#[must_use]
pub fn container_image(container: &Document) -> Option<&str> {
    get_str(container, "image")
}

/// Set container `image`
pub fn set_container_image(container: &mut Document, image: &str) {
    set_path(container, "image", Value::from(image));
}

/// Environment variables of a container
///
/// `None` when the container has no `env` sequence. Entries that take their
/// value from a reference (`valueFrom`) have no literal value and are not
/// listed.
#[must_use]
pub fn container_env(container: &Document) -> Option<IndexMap<String, String>> {
    let entries = container.get("env")?.as_sequence()?;
    Some(
        entries
            .iter()
            .filter(|entry| entry.get("valueFrom").is_none())
            .filter_map(|entry| {
                let name = entry.get("name")?.as_str()?;
                let value = match entry.get("value") {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(text)) => text.clone(),
                    Some(Value::Bool(flag)) => flag.to_string(),
                    Some(Value::Number(number)) => number.to_string(),
                    Some(_) => return None,
                };
                Some((name.to_string(), value))
            })
            .collect(),
    )
}

/// Replace the literal environment variables of a container
///
/// Reference entries (`valueFrom`) not overridden by `variables` are kept in
/// front; an empty result removes the `env` section.
pub fn set_container_env(container: &mut Document, variables: &IndexMap<String, String>) {
    let mut entries: Vec<Value> = container
        .get("env")
        .and_then(Value::as_sequence)
        .map(|existing| {
            existing
                .iter()
                .filter(|entry| entry.get("valueFrom").is_some())
                .filter(|entry| {
                    entry
                        .get("name")
                        .and_then(Value::as_str)
                        .map_or(true, |name| !variables.contains_key(name))
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    entries.extend(variables.iter().map(|(name, value)| {
        let mut entry = Mapping::new();
        entry.insert(key("name"), Value::from(name.as_str()));
        entry.insert(key("value"), Value::from(value.as_str()));
        Value::Mapping(entry)
    }));

    if entries.is_empty() {
        remove_path(container, "env");
    } else {
        set_path(container, "env", Value::Sequence(entries));
    }
}

/// Container with image, name and one TCP port
#[must_use]
pub fn new_container(name: &str, image: &str, port: u16) -> Document {
    let mut port_entry = Mapping::new();
    port_entry.insert(key("containerPort"), Value::from(port));
    port_entry.insert(key("protocol"), Value::from("TCP"));

    let mut container = Mapping::new();
    container.insert(key("image"), Value::from(image));
    container.insert(key("name"), Value::from(name));
    container.insert(
        key("ports"),
        Value::Sequence(vec![Value::Mapping(port_entry)]),
    );
    Value::Mapping(container)
}

/// `Pod` document named `name` holding `containers`
#[must_use]
pub fn new_pod(name: &str, containers: Vec<Document>) -> Document {
    let mut metadata = Mapping::new();
    metadata.insert(key("name"), Value::from(name));

    let mut spec = Mapping::new();
    spec.insert(key("containers"), Value::Sequence(containers));

    let mut pod = Mapping::new();
    pod.insert(key("apiVersion"), Value::from("v1"));
    pod.insert(key("kind"), Value::from(KIND_POD));
    pod.insert(key("metadata"), Value::Mapping(metadata));
    pod.insert(key("spec"), Value::Mapping(spec));
    Value::Mapping(pod)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LIST: &str = r"
kind: List
items:
- apiVersion: v1
  kind: Pod
  metadata:
    name: app
  spec:
    containers:
    - name: web
      image: nginx
      resources:
        limits:
          memory: 512Mi
    - name: sidecar
      image: busybox
- apiVersion: v1
  kind: Pod
  metadata:
    generateName: db-
  spec:
    containers:
    - name: postgres
      image: postgres:9.6
      env:
      - name: POSTGRES_USER
        value: che
      - name: PASSWORD
        valueFrom:
          secretKeyRef:
            name: db
            key: password
";

    fn list() -> Document {
        OpenshiftCodec::new().load(LIST).unwrap()
    }

    #[test]
    fn codec_requires_kind() {
        let codec = OpenshiftCodec::new();
        assert!(codec.load("metadata:\n  name: x\n").is_err());
        assert!(codec.load("- a\n- b\n").is_err());
        assert!(codec.load("kind: Pod\n").is_ok());
    }

    #[test]
    fn items_and_pod_names() {
        let doc = list();
        let items = list_items(&doc).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(pod_name(&items[0]), Some("app"));
        assert_eq!(pod_name(&items[1]), Some("db-"));
    }

    #[test]
    fn pod_is_not_a_list() {
        let pod: Document = serde_yaml::from_str("kind: Pod\nitems: []\n").unwrap();
        assert!(list_items(&pod).is_none());
    }

    #[test]
    fn kind_ignores_case() {
        let doc: Document = serde_yaml::from_str("kind: list\nitems:\n- kind: pod\n").unwrap();
        assert!(is_kind(&doc, KIND_LIST));
        assert!(!is_kind(&doc, KIND_POD));
        assert_eq!(list_items(&doc).map(Vec::len), Some(1));
        assert!(is_kind(&list_items(&doc).unwrap()[0], KIND_POD));
    }

    #[test]
    fn reduce_to_single_container() {
        let doc = list();
        let pod = &list_items(&doc).unwrap()[0];
        let fragment = single_container_pod(pod, 1).unwrap();
        assert_eq!(containers(&fragment).len(), 1);
        assert_eq!(
            single_container(&fragment).and_then(container_name),
            Some("sidecar")
        );
        assert_eq!(pod_name(&fragment), Some("app"));
        assert!(single_container_pod(pod, 2).is_none());
    }

    #[test]
    fn memory_limits() {
        let doc = list();
        let pod = &list_items(&doc).unwrap()[0];
        let web = find_container(pod, "web").unwrap();
        assert_eq!(container_memory_limit(web), Some(512 * 1024 * 1024));
        assert_eq!(container_memory_limit(find_container(pod, "sidecar").unwrap()), None);

        let mut container: Document =
            serde_yaml::from_str("resources:\n  limits:\n    memory: abc\n").unwrap();
        assert_eq!(container_memory_limit(&container), None);
        set_container_memory_limit(&mut container, 1024 * 1024 * 1024, MemoryUnit::Mi);
        assert_eq!(get_str(&container, MEMORY_LIMIT_PATH), Some("1024Mi"));

        let numeric: Document =
            serde_yaml::from_str("resources:\n  limits:\n    memory: 4096\n").unwrap();
        assert_eq!(container_memory_limit(&numeric), Some(4096));
    }

    #[test]
    fn env_skips_references() {
        let doc = list();
        let pod = &list_items(&doc).unwrap()[1];
        let env = container_env(find_container(pod, "postgres").unwrap()).unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env["POSTGRES_USER"], "che");

        assert!(container_env(find_container(&list_items(&doc).unwrap()[0], "web").unwrap()).is_none());
    }

    #[test]
    fn set_env_keeps_references() {
        let mut doc = list();
        let pod = &mut list_items_mut(&mut doc).unwrap()[1];
        let container = find_container_mut(pod, "postgres").unwrap();

        let mut vars = IndexMap::new();
        vars.insert("POSTGRES_DB".to_string(), "che".to_string());
        set_container_env(container, &vars);

        let entries = container["env"].as_sequence().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], Value::from("PASSWORD"));
        assert_eq!(entries[1]["name"], Value::from("POSTGRES_DB"));
        assert_eq!(container_env(container).unwrap(), vars);
    }

    #[test]
    fn clearing_env_removes_section() {
        let mut container = new_container("main", "img", 8080);
        let mut vars = IndexMap::new();
        vars.insert("A".to_string(), "1".to_string());
        set_container_env(&mut container, &vars);
        assert!(container.get("env").is_some());
        set_container_env(&mut container, &IndexMap::new());
        assert!(container.get("env").is_none());
    }

    #[test]
    fn new_pod_shape() {
        let pod = new_pod("pod1", vec![new_container("main", "rhche/centos_jdk8:latest", 8080)]);
        let codec = OpenshiftCodec::new();
        let text = codec.serialize(&pod).unwrap();
        assert!(text.starts_with("apiVersion: v1\nkind: Pod\nmetadata:\n"));

        let back = codec.load(&text).unwrap();
        assert_eq!(back, pod);
        assert_eq!(pod_name(&back), Some("pod1"));
        let container = single_container(&back).unwrap();
        assert_eq!(container_image(container), Some("rhche/centos_jdk8:latest"));
        assert_eq!(get_path(container, "ports").and_then(|p| p[0].get("containerPort")), Some(&Value::from(8080)));
    }
}
