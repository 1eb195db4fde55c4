//! Testing utilities for the envsync workspace
//!
//! Recipe fixtures and environment builders shared by the test suites.

#![allow(missing_docs)]

use envsync_model::{Environment, MachineConfig, Recipe, ServerConfig};

/// `List` with two named pods, one container each
pub const OPENSHIFT_LIST: &str = r#"apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: Pod
    metadata:
      name: pod1
    spec:
      containers:
        - name: main
          image: eclipse/ubuntu_jdk8
          resources:
            limits:
              memory: 512Mi
  - apiVersion: v1
    kind: Pod
    metadata:
      name: pod2
    spec:
      containers:
        - name: main
          image: postgres:13
          env:
            - name: POSTGRES_DB
              value: app
"#;

/// `List` whose single pod has no name and two containers
pub const OPENSHIFT_UNNAMED_POD: &str = r#"kind: List
items:
  - kind: Pod
    spec:
      containers:
        - name: app
          image: nginx
        - name: sidecar
          image: busybox
"#;

/// Bare `Pod` document
pub const OPENSHIFT_POD: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: solo
spec:
  containers:
    - name: main
      image: nginx
"#;

/// Compose file with two services
pub const COMPOSE: &str = r#"services:
  db:
    image: postgres:13
    mem_limit: 536870912
    environment:
      POSTGRES_DB: app
  web:
    build:
      context: ./web
      dockerfile: Dockerfile.dev
    depends_on:
      - db
    links:
      - db:database
"#;

pub const DOCKERFILE: &str = "FROM eclipse/ubuntu_jdk8 AS base\nENV JAVA_OPTS=-Xmx1g\nRUN make install\n";

pub const DOCKER_IMAGE: &str = "eclipse/ubuntu_jdk8:latest";

pub fn recipe(recipe_type: &str, content: &str) -> Recipe {
    Recipe::new(recipe_type, content)
}

pub fn environment(recipe_type: &str, content: &str) -> Environment {
    Environment::new(recipe(recipe_type, content))
}

pub fn openshift_environment() -> Environment {
    environment("openshift", OPENSHIFT_LIST)
}

/// [`openshift_environment`] with both pods configured
pub fn configured_openshift_environment() -> Environment {
    openshift_environment()
        .with_machine(
            "pod1/main",
            MachineConfig::new()
                .with_agent("org.eclipse.che.terminal")
                .with_server("tomcat", ServerConfig::new("8080/tcp").with_protocol("http")),
        )
        .with_machine("pod2/main", MachineConfig::new().with_memory_limit(1_073_741_824))
}

pub fn compose_environment() -> Environment {
    environment("compose", COMPOSE)
}

pub fn dockerfile_environment() -> Environment {
    environment("dockerfile", DOCKERFILE)
}

pub fn dockerimage_environment() -> Environment {
    environment("dockerimage", DOCKER_IMAGE)
}

/// Environment whose recipe has no content
pub fn empty_environment(recipe_type: &str) -> Environment {
    Environment::new(Recipe {
        content: None,
        ..recipe(recipe_type, "")
    })
}
