#![no_main]

//! Fuzz target for registration and resolution
//!
//! Services only depend on names that sort before them in `NAMES`, so the
//! dependency graph is acyclic.

use arbitrary::Arbitrary;
use futures::executor::block_on;
use libfuzzer_sys::fuzz_target;
use named_injector::{
    BoxError, Container, Dependencies, DiError, Service, ServiceDefinition, ServiceGroup, Value,
};
use serde_json::json;

const NAMES: [&str; 8] = [
    "config",
    "db.primary",
    "db.replica",
    "cache",
    "services.users",
    "services.orders",
    "services.admin.audit",
    "app",
];

const PATTERNS: [&str; 5] = ["db.*", "services.*", "*", "*.audit", "missing.*"];

#[derive(Debug, Arbitrary)]
enum ContainerOp {
    Register {
        name: u8,
        dependencies: Vec<u8>,
        fail: bool,
        decorated: bool,
    },
    RegisterBehaviour {
        uses_config: bool,
    },
    Get(u8),
    GetAll(u8),
    GetMatching(Vec<u8>),
    Contains(u8),
    MatchingNames(u8),
}

fn name(index: u8) -> &'static str {
    NAMES[index as usize % NAMES.len()]
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let container = Container::new();

    for op in ops {
        match op {
            ContainerOp::Register {
                name: index,
                dependencies,
                fail,
                decorated,
            } => {
                let own = index as usize % NAMES.len();
                let dependencies: Vec<&str> = dependencies
                    .iter()
                    .map(|d| *d as usize % NAMES.len())
                    .filter(|d| *d < own)
                    .map(|d| NAMES[d])
                    .collect();
                let mut definition = ServiceDefinition::from_fn(NAMES[own], move |deps| {
                    if fail {
                        return Err::<usize, BoxError>("fuzzed failure".into());
                    }
                    Ok(deps.len())
                })
                .with_dependencies(dependencies);
                if decorated {
                    definition = definition.with_behaviour("counted", json!({ "step": 1 }));
                }

                let existed = container.contains(NAMES[own]);
                let result = container.register(definition);
                assert_eq!(result.is_err(), existed);
            }
            ContainerOp::RegisterBehaviour { uses_config } => {
                let existed = container.contains_behaviour("counted");
                let result = container.register_behaviour(
                    "counted",
                    ["config"],
                    move |service: Service, config: &Value, _: &Dependencies| {
                        if uses_config && config["step"].as_u64().is_none() {
                            return Err::<_, BoxError>("missing step".into());
                        }
                        Ok(service)
                    },
                );
                assert_eq!(
                    matches!(result, Err(DiError::BehaviourAlreadyRegistered { .. })),
                    existed
                );
            }
            ContainerOp::Get(index) => {
                let first = block_on(container.get(name(index)));
                let second = block_on(container.get(name(index)));
                match (first, second) {
                    (Ok(a), Ok(b)) => assert!(std::sync::Arc::ptr_eq(&a, &b)),
                    (Err(a), Err(b)) => assert_eq!(a, b),
                    _ => panic!("memoized outcome changed"),
                }
            }
            ContainerOp::GetAll(index) => {
                let pattern = PATTERNS[index as usize % PATTERNS.len()];
                let expected = container.matching_names(pattern).map(|n| n.len());
                if let (Ok(services), Ok(expected)) =
                    (block_on(container.get_all(pattern)), expected)
                {
                    assert_eq!(services.len(), expected);
                }
                if let Ok(group) = block_on(container.get(pattern)) {
                    assert!(group.downcast::<ServiceGroup>().is_ok());
                }
            }
            ContainerOp::GetMatching(indices) => {
                let names: Vec<&str> = indices.iter().map(|i| name(*i)).collect();
                if let Ok(services) = block_on(container.get_matching(&names)) {
                    assert_eq!(services.len(), names.len());
                }
            }
            ContainerOp::Contains(index) => {
                let _ = container.contains(name(index));
                let _ = container.is_resolved(name(index));
            }
            ContainerOp::MatchingNames(index) => {
                let pattern = PATTERNS[index as usize % PATTERNS.len()];
                if let Ok(names) = container.matching_names(pattern) {
                    assert!(names.len() <= container.len());
                }
            }
        }
    }

    assert_eq!(container.service_names().len(), container.len());
});
