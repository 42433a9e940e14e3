//! Service and behaviour definitions, and the registry that owns them
//!
//! Uses DashMap for lock-free concurrent access. Each map is write-once per
//! key: the duplicate check and the insert are a single entry operation.

use crate::error::BoxError;
use crate::factory::{
    AsyncFnDecorator, AsyncFnFactory, Decorator, FnDecorator, FnFactory, ServiceFactory, ValueFactory,
};
use crate::{Dependencies, DiError, Injectable, Result, Service};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Definitions
// =============================================================================

/// The recipe for a named service.
///
/// Built with [`ServiceDefinition::new`] (async factory),
/// [`ServiceDefinition::from_fn`] (sync factory) or
/// [`ServiceDefinition::from_value`] (ready value), then registered with
/// [`Container::register`](crate::Container::register).
///
/// # Examples
///
/// ```rust
/// use named_injector::{BoxError, Dependencies, ServiceDefinition};
/// use serde_json::json;
///
/// let definition = ServiceDefinition::new("users", |deps: Dependencies| async move {
///     let url = deps.get::<String>(0)?;
///     Ok::<_, BoxError>(format!("users@{url}"))
/// })
/// .with_dependencies(["database.url"])
/// .with_behaviour("cached", json!({ "ttl": 30 }));
///
/// assert_eq!(definition.name(), "users");
/// assert_eq!(definition.dependencies(), ["database.url"]);
/// ```
#[derive(Clone)]
pub struct ServiceDefinition {
    name: String,
    factory: Arc<dyn ServiceFactory>,
    dependencies: Vec<String>,
    behaviours: Vec<(String, Value)>,
}

impl ServiceDefinition {
    /// Define a service built by an async closure
    pub fn new<F, Fut, T, E>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<BoxError>,
    {
        Self::from_factory(name, AsyncFnFactory(factory))
    }

    /// Define a service built by a synchronous closure
    pub fn from_fn<F, T, E>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Dependencies) -> std::result::Result<T, E> + Send + Sync + 'static,
        T: Injectable,
        E: Into<BoxError>,
    {
        Self::from_factory(name, FnFactory(factory))
    }

    /// Define a service whose value already exists
    pub fn from_value<T: Injectable>(name: impl Into<String>, value: T) -> Self {
        Self::from_factory(name, ValueFactory::new(value))
    }

    /// Define a service built by a custom [`ServiceFactory`]
    pub fn from_factory(name: impl Into<String>, factory: impl ServiceFactory) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            dependencies: Vec::new(),
            behaviours: Vec::new(),
        }
    }

    /// Declare the services passed to the factory, in order.
    ///
    /// Names may contain wildcards; such a dependency resolves to a
    /// [`ServiceGroup`](crate::ServiceGroup).
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a behaviour to apply, with its per-use configuration.
    ///
    /// Behaviours apply in declaration order. Declaring the same behaviour
    /// again replaces its configuration but keeps its position.
    pub fn with_behaviour(mut self, behaviour: impl Into<String>, config: Value) -> Self {
        let behaviour = behaviour.into();
        match self.behaviours.iter_mut().find(|(name, _)| *name == behaviour) {
            Some((_, existing)) => *existing = config,
            None => self.behaviours.push((behaviour, config)),
        }
        self
    }

    /// Service name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dependency names
    #[inline]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Declared behaviours and their configuration, in application order
    #[inline]
    pub fn behaviours(&self) -> &[(String, Value)] {
        &self.behaviours
    }

    #[inline]
    pub(crate) fn factory(&self) -> &dyn ServiceFactory {
        self.factory.as_ref()
    }
}

impl std::fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("behaviours", &self.behaviours)
            .finish()
    }
}

/// The recipe for a named behaviour
#[derive(Clone)]
pub struct BehaviourDefinition {
    name: String,
    decorator: Arc<dyn Decorator>,
    dependencies: Vec<String>,
}

impl BehaviourDefinition {
    /// Define a behaviour backed by a synchronous closure
    pub fn new<F, E>(name: impl Into<String>, decorator: F) -> Self
    where
        F: Fn(Service, &Value, &Dependencies) -> std::result::Result<Service, E>
            + Send
            + Sync
            + 'static,
        E: Into<BoxError>,
    {
        Self::from_decorator(name, FnDecorator(decorator))
    }

    /// Define a behaviour backed by an async closure.
    ///
    /// The closure owns its inputs, so the returned future can outlive the call.
    pub fn from_async<F, Fut, E>(name: impl Into<String>, decorator: F) -> Self
    where
        F: Fn(Service, Value, Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Service, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::from_decorator(name, AsyncFnDecorator(decorator))
    }

    /// Define a behaviour backed by a custom [`Decorator`]
    pub fn from_decorator(name: impl Into<String>, decorator: impl Decorator) -> Self {
        Self {
            name: name.into(),
            decorator: Arc::new(decorator),
            dependencies: Vec::new(),
        }
    }

    /// Declare the services passed to the decorator, in order
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Behaviour name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dependency names
    #[inline]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    #[inline]
    pub(crate) fn decorator(&self) -> &dyn Decorator {
        self.decorator.as_ref()
    }
}

impl std::fmt::Debug for BehaviourDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviourDefinition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

// =============================================================================
// Construction state
// =============================================================================

/// A construction every requester of a name awaits together
pub(crate) type Construction = Shared<BoxFuture<'static, Result<Service>>>;

/// Per-name progress; absent from the map means not started
enum ServiceState {
    Constructing(Construction),
    Ready(Service),
    Failed(DiError),
}

/// What a requester should do with a name
pub(crate) enum StateLookup {
    Ready(Service),
    Failed(DiError),
    /// Await the construction; `started` is true for the requester that began it
    Pending {
        construction: Construction,
        started: bool,
    },
}

/// A registered service with its registration position
struct Registered {
    definition: Arc<ServiceDefinition>,
    order: u64,
}

// =============================================================================
// Registry
// =============================================================================

/// Thread-safe registry of definitions and construction state
///
/// Uses `DashMap` with `ahash` for maximum concurrent performance.
pub(crate) struct ServiceStorage {
    services: DashMap<String, Registered, RandomState>,
    behaviours: DashMap<String, Arc<BehaviourDefinition>, RandomState>,
    states: DashMap<String, ServiceState, RandomState>,
    next_order: AtomicU64,
}

impl ServiceStorage {
    /// Create new empty storage with optimized shard count.
    ///
    /// Default DashMap uses num_cpus * 4 shards which is overkill for
    /// typical DI containers with <50 services.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity and optimized shards.
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            services: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
            behaviours: DashMap::with_hasher_and_shard_amount(RandomState::new(), 8),
            states: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
            next_order: AtomicU64::new(0),
        }
    }

    /// Insert a service definition, rejecting duplicate names
    pub fn insert_service(&self, definition: ServiceDefinition) -> Result<()> {
        match self.services.entry(definition.name.clone()) {
            Entry::Occupied(_) => Err(DiError::AlreadyRegistered {
                name: definition.name,
            }),
            Entry::Vacant(entry) => {
                let order = self.next_order.fetch_add(1, Ordering::Relaxed);
                entry.insert(Registered {
                    definition: Arc::new(definition),
                    order,
                });
                Ok(())
            }
        }
    }

    /// Insert a behaviour definition, rejecting duplicate names
    pub fn insert_behaviour(&self, definition: BehaviourDefinition) -> Result<()> {
        match self.behaviours.entry(definition.name.clone()) {
            Entry::Occupied(_) => Err(DiError::BehaviourAlreadyRegistered {
                name: definition.name,
            }),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(definition));
                Ok(())
            }
        }
    }

    /// Look up a service definition
    #[inline]
    pub fn service(&self, name: &str) -> Option<Arc<ServiceDefinition>> {
        self.services.get(name).map(|r| Arc::clone(&r.definition))
    }

    /// Look up a behaviour definition
    #[inline]
    pub fn behaviour(&self, name: &str) -> Option<Arc<BehaviourDefinition>> {
        self.behaviours.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Check if a service name is registered
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Check if a behaviour name is registered
    #[inline]
    pub fn contains_behaviour(&self, name: &str) -> bool {
        self.behaviours.contains_key(name)
    }

    /// Get number of registered services
    #[inline]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// All registered service names, in registration order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<(u64, String)> = self
            .services
            .iter()
            .map(|r| (r.order, r.key().clone()))
            .collect();
        names.sort_unstable_by_key(|(order, _)| *order);
        names.into_iter().map(|(_, name)| name).collect()
    }

    /// Find the state of `name`, starting its construction if needed.
    ///
    /// The check and the insert of a new construction are one entry
    /// operation, so `start` runs at most once per name.
    pub fn lookup_or_start<F>(&self, name: &str, start: F) -> StateLookup
    where
        F: FnOnce() -> Construction,
    {
        if let Some(state) = self.states.get(name) {
            return Self::lookup(&state);
        }

        match self.states.entry(name.to_owned()) {
            Entry::Occupied(entry) => Self::lookup(entry.get()),
            Entry::Vacant(entry) => {
                let construction = start();
                entry.insert(ServiceState::Constructing(construction.clone()));
                StateLookup::Pending {
                    construction,
                    started: true,
                }
            }
        }
    }

    fn lookup(state: &ServiceState) -> StateLookup {
        match state {
            ServiceState::Ready(service) => StateLookup::Ready(Arc::clone(service)),
            ServiceState::Failed(err) => StateLookup::Failed(err.clone()),
            ServiceState::Constructing(construction) => StateLookup::Pending {
                construction: construction.clone(),
                started: false,
            },
        }
    }

    /// Record the outcome of a construction
    pub fn settle(&self, name: &str, outcome: &Result<Service>) {
        let state = match outcome {
            Ok(service) => ServiceState::Ready(Arc::clone(service)),
            Err(err) => ServiceState::Failed(err.clone()),
        };
        self.states.insert(name.to_owned(), state);
    }

    /// Check if a service has finished constructing successfully
    #[inline]
    pub fn is_resolved(&self, name: &str) -> bool {
        self.states
            .get(name)
            .is_some_and(|state| matches!(*state, ServiceState::Ready(_)))
    }
}

impl Default for ServiceStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStorage")
            .field("services", &self.len())
            .field("behaviours", &self.behaviours.len())
            .field("resolved", &self.states.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn value(name: &str, value: i32) -> ServiceDefinition {
        ServiceDefinition::from_value(name, value)
    }

    #[test]
    fn test_storage_insert_and_get() {
        let storage = ServiceStorage::new();
        storage.insert_service(value("answer", 42)).unwrap();

        let definition = storage.service("answer").unwrap();
        assert_eq!(definition.name(), "answer");
        assert!(storage.contains("answer"));
        assert!(!storage.contains("question"));
    }

    #[test]
    fn test_storage_rejects_duplicates() {
        let storage = ServiceStorage::new();
        storage.insert_service(value("answer", 42)).unwrap();

        let err = storage.insert_service(value("answer", 43)).unwrap_err();
        assert_eq!(err, DiError::AlreadyRegistered { name: "answer".into() });
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_behaviour_namespace_is_separate() {
        let storage = ServiceStorage::new();
        storage.insert_service(value("logged", 1)).unwrap();

        let behaviour = BehaviourDefinition::new("logged", |service, _: &Value, _: &Dependencies| {
            Ok::<_, BoxError>(service)
        });
        storage.insert_behaviour(behaviour.clone()).unwrap();
        assert!(storage.contains_behaviour("logged"));

        let err = storage.insert_behaviour(behaviour).unwrap_err();
        assert!(matches!(err, DiError::BehaviourAlreadyRegistered { .. }));
    }

    #[test]
    fn test_names_in_registration_order() {
        let storage = ServiceStorage::with_capacity(100);
        for name in ["zeta", "alpha", "mid", "beta"] {
            storage.insert_service(value(name, 0)).unwrap();
        }

        assert_eq!(storage.names(), vec!["zeta", "alpha", "mid", "beta"]);
    }

    #[test]
    fn test_lookup_or_start_runs_start_once() {
        let storage = ServiceStorage::new();
        let mut starts = 0;

        for _ in 0..3 {
            let lookup = storage.lookup_or_start("answer", || {
                starts += 1;
                futures::future::ready(Ok(Arc::new(42_i32) as Service))
                    .boxed()
                    .shared()
            });
            assert!(matches!(lookup, StateLookup::Pending { .. }));
        }
        assert_eq!(starts, 1);
        assert!(!storage.is_resolved("answer"));

        storage.settle("answer", &Ok(Arc::new(42_i32) as Service));
        assert!(storage.is_resolved("answer"));
        assert!(matches!(
            storage.lookup_or_start("answer", || unreachable!()),
            StateLookup::Ready(_)
        ));
    }

    #[test]
    fn test_failed_state_is_kept() {
        let storage = ServiceStorage::new();
        let err = DiError::not_found("libc", Some("test"));
        storage.settle("test", &Err(err.clone()));

        match storage.lookup_or_start("test", || unreachable!()) {
            StateLookup::Failed(cached) => assert_eq!(cached, err),
            _ => panic!("expected cached failure"),
        }
        assert!(!storage.is_resolved("test"));
    }

    #[test]
    fn test_definition_behaviour_order() {
        let definition = value("four", 4)
            .with_behaviour("a", Value::Null)
            .with_behaviour("b", Value::Null)
            .with_behaviour("a", serde_json::json!({ "by": 2 }));

        let names: Vec<&str> = definition.behaviours().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(definition.behaviours()[0].1["by"], 2);
    }
}
