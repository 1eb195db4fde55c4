//! OpenShift manager behaviour over whole environments

use envsync_manager::{EnvironmentManager, ManagerError, MachineSource, OpenshiftEnvironmentManager};
use envsync_model::{Environment, Machine, MachineConfig};
use envsync_recipe::openshift::{container_memory_limit, container_name, containers, list_items};
use envsync_recipe::{OpenshiftCodec, RecipeCodec, ValidationError};
use envsync_test_utils::{
    configured_openshift_environment, empty_environment, environment, openshift_environment,
    OPENSHIFT_POD, OPENSHIFT_UNNAMED_POD,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

const MIB: u64 = 1024 * 1024;

fn manager() -> OpenshiftEnvironmentManager {
    OpenshiftEnvironmentManager::default()
}

fn names(machines: &[Machine]) -> Vec<&str> {
    machines.iter().map(|machine| machine.name.as_str()).collect()
}

/// Container names per pod of the environment's recipe
fn recipe_containers(environment: &Environment) -> Vec<Vec<String>> {
    let document = OpenshiftCodec::new()
        .load(environment.recipe_content().unwrap())
        .unwrap();
    list_items(&document)
        .unwrap()
        .iter()
        .map(|pod| {
            containers(pod)
                .iter()
                .filter_map(container_name)
                .map(str::to_string)
                .collect()
        })
        .collect()
}

#[test]
fn two_pods_give_two_composite_names() {
    let manager = manager();
    let machines = manager.get_machines(&openshift_environment());

    assert_eq!(names(&machines), vec!["pod1/main", "pod2/main"]);
    assert!(machines.iter().all(|machine| machine.recipe.is_some()));
    assert_eq!(manager.get_machine_name(&machines[0]), "main");
}

#[test]
fn recipe_limit_seeds_the_attribute() {
    let manager = manager();
    let machines = manager.get_machines(&openshift_environment());

    assert_eq!(machines[0].memory_limit_attribute(), Some(512 * MIB));
    assert_eq!(
        machines[1].memory_limit_attribute(),
        Some(manager.config().default_memory_limit_bytes)
    );
}

#[test]
fn configuration_is_merged() {
    let manager = manager();
    let machines = manager.get_machines(&configured_openshift_environment());

    assert_eq!(names(&machines), vec!["pod1/main", "pod2/main"]);
    assert_eq!(machines[0].agents, vec!["org.eclipse.che.terminal".to_string()]);
    assert!(machines[0].servers.contains_key("tomcat"));
    assert_eq!(manager.get_memory_limit(&machines[1]), Some(1024 * MIB));
}

#[test]
fn empty_recipe_yields_configured_machines_only() {
    let env = empty_environment("openshift")
        .with_machine("pod1/main", MachineConfig::new().with_memory_limit(MIB));
    let machines = manager().get_machines(&env);

    assert_eq!(names(&machines), vec!["pod1/main"]);
    assert!(machines[0].recipe.is_none());
}

#[test]
fn single_pod_recipe_degrades_to_configuration() {
    let env = environment("openshift", OPENSHIFT_POD).with_machine("solo/main", MachineConfig::new());
    let machines = manager().get_machines(&env);

    assert_eq!(names(&machines), vec!["solo/main"]);
    assert!(machines[0].recipe.is_none());
}

#[test]
fn malformed_recipe_never_fails() {
    let env = environment("openshift", "kind: [unterminated")
        .with_machine("pod1/main", MachineConfig::new());
    let manager = manager();

    let machines = manager.get_machines(&env);
    assert_eq!(names(&machines), vec!["pod1/main"]);

    let updated = manager.get_environment(&env, &machines);
    assert_eq!(updated.recipe, env.recipe);
}

#[test]
fn unnamed_pod_is_addressed_by_synthesized_name() {
    let machines = manager().get_machines(&environment("openshift", OPENSHIFT_UNNAMED_POD));

    assert_eq!(names(&machines), vec!["pod1/app", "pod1/sidecar"]);
    let fragment = machines[0].recipe.as_ref().unwrap();
    assert_eq!(fragment["metadata"]["name"].as_str(), Some("pod1"));
    assert_eq!(containers(fragment).len(), 1);
}

#[test]
fn lowercase_kinds_are_recognized() {
    let recipe = "kind: list\nitems:\n- kind: pod\n  metadata:\n    name: web\n  spec:\n    containers:\n    - name: main\n      image: nginx\n";
    let manager = manager();
    let env = environment("openshift", recipe);

    assert_eq!(names(&manager.get_machines(&env)), vec!["web/main"]);
    let validation = manager.validate_environment(&env);
    assert!(validation.is_valid, "{:?}", validation.errors);
}

#[test]
fn repeated_pod_and_container_names_are_reported() {
    let recipe = "kind: List\nitems:\n- metadata:\n    generateName: db-\n  spec:\n    containers:\n    - name: c\n      image: first\n- metadata:\n    generateName: db-\n  spec:\n    containers:\n    - name: c\n      image: second\n";
    let manager = manager();
    let env = environment("openshift", recipe);

    let machines = manager.get_machines(&env);
    assert_eq!(names(&machines), vec!["db-/c"]);
    assert_eq!(
        manager.get_source(&machines[0]),
        Some(MachineSource::Image {
            image: "first".to_string()
        })
    );
    assert_eq!(
        manager.validate_recipe(&env),
        vec!["machine 'db-/c' is defined more than once in the recipe".to_string()]
    );
    assert!(!manager.validate_environment(&env).is_valid);
}

#[test]
fn unreadable_recipe_limit_gives_way_to_default() {
    let recipe = "kind: List\nitems:\n- metadata:\n    name: pod1\n  spec:\n    containers:\n    - name: main\n      image: nginx\n      resources:\n        limits:\n          memory: 512M\n";
    let manager = manager();
    let env = environment("openshift", recipe);
    let default = manager.config().default_memory_limit_bytes;

    let machines = manager.get_machines(&env);
    assert_eq!(machines[0].memory_limit_attribute(), Some(default));

    let updated = manager.get_environment(&env, &machines);
    let document = OpenshiftCodec::new().load(updated.recipe_content().unwrap()).unwrap();
    let pod = &list_items(&document).unwrap()[0];
    assert_eq!(container_memory_limit(&containers(pod)[0]), Some(default));
}

#[test]
fn memory_change_reaches_recipe() {
    let manager = manager();
    let env = openshift_environment();
    let mut machines = manager.get_machines(&env);

    manager.set_memory_limit(&mut machines[0], 1024 * MIB);
    let updated = manager.get_environment(&env, &machines);

    assert_eq!(updated.machines["pod1/main"].memory_limit(), Some(1024 * MIB));
    let document = OpenshiftCodec::new().load(updated.recipe_content().unwrap()).unwrap();
    let pod = &list_items(&document).unwrap()[0];
    assert_eq!(container_memory_limit(&containers(pod)[0]), Some(1024 * MIB));

    let reread = manager.get_machines(&updated);
    assert_eq!(manager.get_memory_limit(&reread[0]), Some(1024 * MIB));
}

#[test]
fn rename_rewrites_container_and_configuration() {
    let manager = manager();
    let env = configured_openshift_environment();

    let updated = manager.rename_machine(&env, "pod1/main", "ide").unwrap();

    assert_eq!(recipe_containers(&updated), vec![vec!["ide"], vec!["main"]]);
    let keys: Vec<_> = updated.machine_names().collect();
    assert_eq!(keys, vec!["pod1/ide", "pod2/main"]);
    assert_eq!(updated.machines["pod1/ide"], env.machines["pod1/main"]);
}

#[test]
fn rename_accepts_composite_name_in_same_pod() {
    let updated = manager()
        .rename_machine(&openshift_environment(), "pod2/main", "pod2/db")
        .unwrap();
    assert_eq!(recipe_containers(&updated), vec![vec!["main"], vec!["db"]]);
}

#[test]
fn rename_failures_leave_environment_alone() {
    let manager = manager();
    let env = environment("openshift", OPENSHIFT_UNNAMED_POD);

    assert_eq!(
        manager.rename_machine(&env, "pod1/app", "sidecar"),
        Err(ManagerError::NameConflict("pod1/sidecar".to_string()))
    );
    assert!(matches!(
        manager.rename_machine(&env, "pod1/app", "pod2/app"),
        Err(ManagerError::PodMismatch { .. })
    ));
    assert_eq!(
        manager.rename_machine(&env, "pod1/ghost", "spirit"),
        Err(ManagerError::MachineNotFound("pod1/ghost".to_string()))
    );
    assert_eq!(manager.rename_machine(&env, "", "x"), Err(ManagerError::MissingName));
    assert_eq!(env, environment("openshift", OPENSHIFT_UNNAMED_POD));
}

#[test]
fn default_machine_takes_next_free_pod() {
    let machine = manager()
        .create_new_default_machine(&openshift_environment())
        .unwrap();

    assert_eq!(machine.name, "pod3/main");
    let fragment = machine.recipe.as_ref().unwrap();
    assert_eq!(fragment["kind"].as_str(), Some("Pod"));
    assert_eq!(fragment["metadata"]["name"].as_str(), Some("pod3"));
}

#[test]
fn add_default_machine() {
    let manager = manager();
    let env = openshift_environment();
    let machine = manager.create_new_default_machine(&env).unwrap();

    let updated = manager.add_machine(&env, &machine).unwrap();

    assert_eq!(
        names(&manager.get_machines(&updated)),
        vec!["pod3/main", "pod1/main", "pod2/main"]
    );
    assert_eq!(
        updated.machines["pod3/main"].memory_limit(),
        Some(manager.config().default_memory_limit_bytes)
    );
}

#[test]
fn add_to_non_list_fails_closed() {
    let manager = manager();
    let env = environment("openshift", OPENSHIFT_POD);
    let machine = manager.create_new_default_machine(&env).unwrap();

    let result = manager.add_machine(&env, &machine);

    assert!(matches!(
        result,
        Err(ManagerError::Structure(ValidationError::UnexpectedKind { .. }))
    ));
    assert_eq!(env, environment("openshift", OPENSHIFT_POD));
}

#[test]
fn add_rejects_taken_pod() {
    let manager = manager();
    let env = openshift_environment();
    let existing = manager.get_machines(&env).remove(0);
    assert_eq!(
        manager.add_machine(&env, &existing),
        Err(ManagerError::NameConflict("pod1".to_string()))
    );
}

#[test]
fn delete_is_unsupported() {
    let manager = manager();
    assert!(!manager.can_delete_machines());
    assert!(matches!(
        manager.delete_machine(&openshift_environment(), "pod1/main"),
        Err(ManagerError::Unsupported { .. })
    ));
}

#[test]
fn source_and_env_variables() {
    let manager = manager();
    let env = openshift_environment();
    let mut machines = manager.get_machines(&env);

    assert_eq!(
        manager.get_source(&machines[1]),
        Some(MachineSource::Image {
            image: "postgres:13".to_string()
        })
    );
    let variables = manager.get_env_variables(&machines[1]).unwrap();
    assert_eq!(variables.get("POSTGRES_DB").map(String::as_str), Some("app"));

    let mut replaced = IndexMap::new();
    replaced.insert("POSTGRES_USER".to_string(), "admin".to_string());
    manager.set_env_variables(&mut machines[1], &replaced).unwrap();
    manager.set_source(&mut machines[1], "postgres:15").unwrap();
    let reread = manager.get_machines(&manager.get_environment(&env, &machines));

    assert_eq!(manager.get_env_variables(&reread[1]), Some(replaced));
    assert_eq!(
        manager.get_source(&reread[1]),
        Some(MachineSource::Image {
            image: "postgres:15".to_string()
        })
    );
}

#[test]
fn validation() {
    let manager = manager();
    let valid = manager.validate_environment(&configured_openshift_environment());
    assert!(valid.is_valid, "{:?}", valid.errors);

    let env = openshift_environment().with_machine("pod9/ghost", MachineConfig::new());
    let invalid = manager.validate_environment(&env);
    assert!(!invalid.is_valid);
    assert_eq!(
        invalid.errors,
        vec!["machine 'pod9/ghost' is not defined in the recipe".to_string()]
    );
}
