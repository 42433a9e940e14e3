//! # Named Injector - Async Dependency Injection by Name
//!
//! A small dependency injection container where services are registered
//! under string names, constructed lazily and asynchronously, and shared.
//!
//! ## Features
//!
//! - **Lazy** - Services are constructed on first request, dependencies first
//! - **Exactly once** - Concurrent requests for a name share one construction
//! - **Wildcards** - `"handlers.*"` resolves every matching service
//! - **Behaviours** - Named decorators applied to a service before it is shared
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use named_injector::{BoxError, Container, Dependencies};
//!
//! # futures::executor::block_on(async {
//! let container = Container::new();
//!
//! container.singleton("database.url", String::from("postgres://localhost")).unwrap();
//! container
//!     .register_service("users", ["database.url"], |deps: Dependencies| async move {
//!         let url = deps.get::<String>(0)?;
//!         Ok::<_, BoxError>(format!("UserRepository({url})"))
//!     })
//!     .unwrap();
//!
//! let users = container.get_as::<String>("users").await.unwrap();
//! assert_eq!(*users, "UserRepository(postgres://localhost)");
//! # });
//! ```
//!
//! ## Behaviours
//!
//! ```rust
//! use named_injector::{BoxError, Container, Dependencies, Service, ServiceDefinition};
//! use serde_json::{Value, json};
//! use std::sync::Arc;
//!
//! # futures::executor::block_on(async {
//! let container = Container::new();
//!
//! container
//!     .register_behaviour("scaled", Vec::<String>::new(), |service: Service, config: &Value, _: &Dependencies| {
//!         let value = service.downcast::<i64>().map_err(|_| "not a number")?;
//!         let by = config["by"].as_i64().ok_or("missing `by`")?;
//!         Ok::<_, BoxError>(Arc::new(*value * by) as Service)
//!     })
//!     .unwrap();
//!
//! container
//!     .register(ServiceDefinition::from_value("four", 4_i64).with_behaviour("scaled", json!({ "by": 2 })))
//!     .unwrap();
//!
//! assert_eq!(*container.get_as::<i64>("four").await.unwrap(), 8);
//! # });
//! ```
//!
//! ## Resolution
//!
//! - Dependencies of a service are resolved concurrently and handed to the
//!   factory in declared order.
//! - A failure anywhere in a dependency graph fails the whole request; the
//!   failure is remembered, so the factory is never retried.
//! - Dependency cycles are not detected; a cyclic request never completes.

mod container;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod pattern;
mod provider;
mod storage;

pub use container::*;
pub use error::*;
pub use factory::{Decorator, DecoratorResult, FactoryResult, ServiceFactory};
pub use pattern::{ServicePattern, WILDCARD};
pub use provider::*;
pub use storage::{BehaviourDefinition, ServiceDefinition};

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use serde_json::Value;
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BehaviourDefinition, BoxError, Container, Dependencies, DiError, Injectable, Result,
        Service, ServiceDefinition, ServiceGroup,
    };
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    type Multiplier = Box<dyn Fn(i64, i64) -> i64 + Send + Sync>;

    fn no_deps() -> Vec<String> {
        Vec::new()
    }

    fn letter(container: &Container, name: &str, value: &'static str, delay_ms: u64) {
        container
            .register_service(name, no_deps(), move |_| async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok::<_, BoxError>(value)
            })
            .unwrap();
    }

    fn letters(services: Vec<Service>) -> Vec<&'static str> {
        services
            .into_iter()
            .map(|s| *s.downcast::<&'static str>().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_async_service() {
        let container = Container::new();
        container
            .register_service("test", no_deps(), |_| async { Ok::<_, BoxError>(5_i32) })
            .unwrap();

        assert_eq!(*container.get_as::<i32>("test").await.unwrap(), 5);
    }

    #[test]
    fn test_cannot_replace_service() {
        let container = Container::new();
        container.singleton("test", 5_i32).unwrap();

        let err = container.singleton("test", 6_i32).unwrap_err();
        assert!(matches!(err, DiError::AlreadyRegistered { .. }));
        assert!(err.to_string().contains("existing"));
    }

    #[tokio::test]
    async fn test_undefined_service() {
        let container = Container::new();

        let err = container.get("made up").await.unwrap_err();
        assert!(err.to_string().contains("undefined service"));
        assert_eq!(err, DiError::not_found("made up", None));
    }

    #[tokio::test]
    async fn test_undefined_dependency_names_dependent() {
        let container = Container::new();
        container
            .register_service("test", ["libc"], |_| async { Ok::<_, BoxError>(5_i32) })
            .unwrap();

        let err = container.get("test").await.unwrap_err();
        assert!(err.to_string().contains("for test"));
    }

    #[tokio::test]
    async fn test_get_for_names_requester() {
        let container = Container::new();

        let err = container.get_for("libc", "test").await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot get undefined service libc for test");
    }

    #[tokio::test]
    async fn test_never_loaded_more_than_once() {
        let ran = Arc::new(AtomicBool::new(false));
        let container = Container::new();

        let flag = Arc::clone(&ran);
        container
            .register_service("test", no_deps(), move |_| {
                let already_ran = flag.swap(true, Ordering::SeqCst);
                async move {
                    if already_ran {
                        return Err(BoxError::from("too expensive to repeat"));
                    }
                    Ok(5_i32)
                }
            })
            .unwrap();

        container.get("test").await.unwrap();
        assert_eq!(*container.get_as::<i32>("test").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_get_matching_preserves_order() {
        let container = Container::new();
        letter(&container, "a", "a", 30);
        letter(&container, "b", "b", 0);
        letter(&container, "c", "c", 10);

        let services = container.get_matching(["a", "b", "c"]).await.unwrap();
        assert_eq!(letters(services), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_decorate_services() {
        let container = Container::new();
        container
            .singleton::<Multiplier>("multiplier", Box::new(|a, b| a * b))
            .unwrap();
        container
            .register_behaviour(
                "multipliable",
                ["multiplier"],
                |service: Service, options: &Value, deps: &Dependencies| {
                    let value = *service.downcast::<i64>().map_err(|_| "not a number")?;
                    let by = options["by"].as_i64().ok_or("missing `by`")?;
                    let multiplier = deps.get::<Multiplier>(0)?;
                    Ok::<_, BoxError>(Arc::new(multiplier(value, by)) as Service)
                },
            )
            .unwrap();
        container
            .register(
                ServiceDefinition::from_value("four", 4_i64)
                    .with_behaviour("multipliable", json!({ "by": 2 })),
            )
            .unwrap();

        assert_eq!(*container.get_as::<i64>("four").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_decorate_services_async() {
        let container = Container::new();
        container
            .singleton::<Multiplier>("multiplier", Box::new(|a, b| a * b))
            .unwrap();
        container
            .register_async_behaviour(
                "multipliable",
                ["multiplier"],
                |service: Service, options: Value, deps: Dependencies| async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    let value = *service.downcast::<i64>().map_err(|_| "not a number")?;
                    let by = options["by"].as_i64().ok_or("missing `by`")?;
                    let multiplier = deps.get::<Multiplier>(0)?;
                    Ok::<_, BoxError>(Arc::new(multiplier(value, by)) as Service)
                },
            )
            .unwrap();
        container
            .register(
                ServiceDefinition::from_value("four", 4_i64)
                    .with_behaviour("multipliable", json!({ "by": 2 })),
            )
            .unwrap();

        let (a, b) = tokio::join!(container.get_as::<i64>("four"), container.get_as::<i64>("four"));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(*a, 8);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_cannot_redefine_behaviour() {
        let container = Container::new();
        let passthrough =
            |service: Service, _: &Value, _: &Dependencies| Ok::<_, BoxError>(service);
        container
            .register_behaviour("multipliable", no_deps(), passthrough)
            .unwrap();

        let err = container
            .register_behaviour("multipliable", no_deps(), passthrough)
            .unwrap_err();
        assert!(matches!(err, DiError::BehaviourAlreadyRegistered { .. }));
        assert!(err.to_string().contains("existing"));
    }

    #[tokio::test]
    async fn test_wildcard_groups() {
        let container = Container::new();
        letter(&container, "group.a", "a", 20);
        letter(&container, "group.b", "b", 10);
        letter(&container, "group.c", "c", 0);
        letter(&container, "other.d", "d", 0);

        let group = container.get_as::<ServiceGroup>("group.*").await.unwrap();
        assert_eq!(letters(group.iter().cloned().collect()), vec!["a", "b", "c"]);
        assert_eq!(group.pattern(), "group.*");
    }

    #[tokio::test]
    async fn test_wildcard_without_matches_is_empty() {
        let container = Container::new();
        letter(&container, "group.a", "a", 0);

        assert!(container.get_all("missing.*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wildcard_is_not_memoized() {
        let container = Container::new();
        letter(&container, "group.a", "a", 0);

        let first = container.get_all("group.*").await.unwrap();
        letter(&container, "group.b", "b", 0);
        let second = container.get_all("group.*").await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(letters(second.clone()), vec!["a", "b"]);
        // Matched names are still memoized individually
        assert!(Arc::ptr_eq(&first[0], &second[0]));
    }

    #[tokio::test]
    async fn test_wildcard_dependency() {
        let container = Container::new();
        letter(&container, "plugins.a", "a", 0);
        letter(&container, "plugins.b", "b", 0);
        container
            .register(
                ServiceDefinition::from_fn("count", |deps: Dependencies| {
                    Ok::<_, BoxError>(deps.group(0)?.len())
                })
                .with_dependencies(["plugins.*"]),
            )
            .unwrap();

        assert_eq!(*container.get_as::<usize>("count").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failures_bubble() {
        let container = Container::new();
        container
            .register_service("busted", no_deps(), |_| async {
                Err::<i32, _>(BoxError::from("wat"))
            })
            .unwrap();

        let err = container.get("busted").await.unwrap_err();
        assert!(err.to_string().contains("Trouble getting"));
        assert_eq!(err.to_string(), "Trouble getting busted: wat");
    }

    #[tokio::test]
    async fn test_failures_bubble_through_dependents() {
        let container = Container::new();
        container
            .register_service("busted", no_deps(), |_| async {
                Err::<i32, _>(BoxError::from("wat"))
            })
            .unwrap();
        container
            .register_service("middle", ["busted"], |_| async { Ok::<_, BoxError>(1_i32) })
            .unwrap();
        container
            .register_service("top", ["middle"], |_| async { Ok::<_, BoxError>(2_i32) })
            .unwrap();

        let err = container.get("top").await.unwrap_err();
        assert!(err.to_string().contains("Trouble getting busted"));
    }

    #[tokio::test]
    async fn test_failure_is_cached() {
        let calls = Arc::new(AtomicU32::new(0));
        let container = Container::new();

        let counter = Arc::clone(&calls);
        container
            .lazy("flaky", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>("connection refused")
            })
            .unwrap();

        let first = container.get("flaky").await.unwrap_err();
        let second = container.get("flaky").await.unwrap_err();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!container.is_resolved("flaky"));
    }

    #[tokio::test]
    async fn test_behaviours_compose_in_declaration_order() {
        let container = Container::new();
        let append = |suffix: &'static str| {
            move |service: Service, _: &Value, _: &Dependencies| {
                let base = service.downcast::<String>().map_err(|_| "not a string")?;
                Ok::<_, BoxError>(Arc::new(format!("{base}{suffix}")) as Service)
            }
        };
        container.register_behaviour("x", no_deps(), append("-x")).unwrap();
        container.register_behaviour("y", no_deps(), append("-y")).unwrap();
        container
            .register(
                ServiceDefinition::from_value("xy", String::from("v"))
                    .with_behaviour("x", Value::Null)
                    .with_behaviour("y", Value::Null),
            )
            .unwrap();
        container
            .register(
                ServiceDefinition::from_value("yx", String::from("v"))
                    .with_behaviour("y", Value::Null)
                    .with_behaviour("x", Value::Null),
            )
            .unwrap();

        assert_eq!(*container.get_as::<String>("xy").await.unwrap(), "v-x-y");
        assert_eq!(*container.get_as::<String>("yx").await.unwrap(), "v-y-x");
    }

    #[tokio::test]
    async fn test_unknown_behaviour_surfaces() {
        let container = Container::new();
        container
            .register(ServiceDefinition::from_value("four", 4_i64).with_behaviour("missing", Value::Null))
            .unwrap();

        let err = container.get("four").await.unwrap_err();
        assert_eq!(
            err,
            DiError::UnknownBehaviour {
                service: "four".into(),
                behaviour: "missing".into()
            }
        );
    }

    #[tokio::test]
    async fn test_decorator_failure_surfaces() {
        let container = Container::new();
        container
            .register_behaviour("strict", no_deps(), |_: Service, _: &Value, _: &Dependencies| {
                Err::<Service, _>("rejected")
            })
            .unwrap();
        container
            .register(ServiceDefinition::from_value("four", 4_i64).with_behaviour("strict", Value::Null))
            .unwrap();

        let err = container.get("four").await.unwrap_err();
        assert_eq!(err.to_string(), "Trouble decorating four with strict: rejected");
    }

    #[tokio::test]
    async fn test_behaviour_dependency_missing_names_behaviour() {
        let container = Container::new();
        container
            .register_behaviour("audited", ["audit.log"], |s: Service, _: &Value, _: &Dependencies| {
                Ok::<_, BoxError>(s)
            })
            .unwrap();
        container
            .register(ServiceDefinition::from_value("four", 4_i64).with_behaviour("audited", Value::Null))
            .unwrap();

        let err = container.get("four").await.unwrap_err();
        assert_eq!(err, DiError::not_found("audit.log", Some("audited")));
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let container = Container::new();
        container.singleton("port", 8080_u16).unwrap();

        let err = container.get_as::<String>("port").await.unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch { ref name, .. } if name == "port"));
    }

    #[test]
    fn test_introspection() {
        let container = Container::with_capacity(4);
        assert!(container.is_empty());

        container.singleton("b", 1_u8).unwrap();
        container.singleton("a", 2_u8).unwrap();

        assert_eq!(container.len(), 2);
        assert!(container.contains("a"));
        assert!(!container.contains("c"));
        assert!(!container.contains_behaviour("a"));
        assert_eq!(container.service_names(), vec!["b", "a"]);
        assert_eq!(container.matching_names("a").unwrap(), vec!["a"]);
        assert!(container.matching_names("c").unwrap().is_empty());
    }
}
