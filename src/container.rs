//! Async dependency injection container
//!
//! The `Container` registers named services and behaviours, and resolves
//! services on demand: dependencies first, then the factory, then every
//! declared behaviour. Each name is constructed at most once; every
//! requester of a name shares the same value, or the same failure.

use crate::error::BoxError;
use crate::pattern::ServicePattern;
use crate::provider::downcast;
use crate::storage::{ServiceStorage, StateLookup};
use crate::{
    BehaviourDefinition, Dependencies, DiError, Injectable, Result, Service, ServiceDefinition,
    ServiceGroup,
};
use futures::future::{self, BoxFuture, FutureExt, try_join_all};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Async dependency injection container with named services.
///
/// Cloning a container is cheap; clones share the same registry and the
/// same resolved services.
///
/// # Examples
///
/// ```rust
/// use named_injector::{BoxError, Container, Dependencies};
///
/// # futures::executor::block_on(async {
/// let container = Container::new();
///
/// container.singleton("greeting", String::from("hello")).unwrap();
/// container
///     .register_service("shout", ["greeting"], |deps: Dependencies| async move {
///         let greeting = deps.get::<String>(0)?;
///         Ok::<_, BoxError>(greeting.to_uppercase())
///     })
///     .unwrap();
///
/// let shout = container.get_as::<String>("shout").await.unwrap();
/// assert_eq!(*shout, "HELLO");
/// # });
/// ```
#[derive(Clone, Default)]
pub struct Container {
    /// Definitions and construction state (lock-free)
    storage: Arc<ServiceStorage>,
}

impl Container {
    /// Create a new, empty container.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "named_injector", "Creating new DI container");

        Self {
            storage: Arc::new(ServiceStorage::new()),
        }
    }

    /// Create a container with pre-allocated capacity.
    ///
    /// Use this when you know approximately how many services will be registered.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Arc::new(ServiceStorage::with_capacity(capacity)),
        }
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a service definition.
    ///
    /// Fails with [`DiError::AlreadyRegistered`] if the name is taken; the
    /// existing definition is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use named_injector::{Container, ServiceDefinition};
    ///
    /// let container = Container::new();
    /// container.register(ServiceDefinition::from_value("port", 8080_u16)).unwrap();
    ///
    /// let err = container
    ///     .register(ServiceDefinition::from_value("port", 9090_u16))
    ///     .unwrap_err();
    /// assert!(err.to_string().contains("existing"));
    /// ```
    pub fn register(&self, definition: ServiceDefinition) -> Result<()> {
        #[cfg(feature = "logging")]
        let name = definition.name().to_owned();
        #[cfg(feature = "logging")]
        let dependencies = definition.dependencies().len();
        #[cfg(feature = "logging")]
        let behaviours = definition.behaviours().len();

        let result = self.storage.insert_service(definition);

        #[cfg(feature = "logging")]
        match &result {
            Ok(()) => debug!(
                target: "named_injector",
                service = %name,
                dependencies,
                behaviours,
                service_count = self.storage.len(),
                "Registering service"
            ),
            Err(_) => debug!(
                target: "named_injector",
                service = %name,
                "Rejecting duplicate service registration"
            ),
        }

        result
    }

    /// Register a service built by an async factory from its dependencies.
    ///
    /// Shorthand for [`ServiceDefinition::new`] +
    /// [`with_dependencies`](ServiceDefinition::with_dependencies) +
    /// [`register`](Self::register).
    pub fn register_service<I, S, F, Fut, T, E>(
        &self,
        name: impl Into<String>,
        dependencies: I,
        factory: F,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<BoxError>,
    {
        self.register(ServiceDefinition::new(name, factory).with_dependencies(dependencies))
    }

    /// Register a service whose value already exists.
    ///
    /// The value is still decorated on first access if behaviours are
    /// declared through [`register`](Self::register).
    #[inline]
    pub fn singleton<T: Injectable>(&self, name: impl Into<String>, value: T) -> Result<()> {
        self.register(ServiceDefinition::from_value(name, value))
    }

    /// Register a service built by a synchronous factory, on first access.
    pub fn lazy<F, T, E>(&self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(Dependencies) -> std::result::Result<T, E> + Send + Sync + 'static,
        T: Injectable,
        E: Into<BoxError>,
    {
        self.register(ServiceDefinition::from_fn(name, factory))
    }

    /// Register a behaviour that services can declare by name.
    ///
    /// The decorator receives the current value, the per-use configuration
    /// given by the declaring service, and its own resolved `dependencies`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use named_injector::{BoxError, Container, Dependencies, Service, ServiceDefinition};
    /// use serde_json::{Value, json};
    /// use std::sync::Arc;
    ///
    /// # futures::executor::block_on(async {
    /// let container = Container::new();
    /// container
    ///     .register_behaviour("suffixed", ["suffix"], |service: Service, _: &Value, deps: &Dependencies| {
    ///         let base = service.downcast::<String>().map_err(|_| "not a string")?;
    ///         let suffix = deps.get::<String>(0)?;
    ///         Ok::<_, BoxError>(Arc::new(format!("{base}{suffix}")) as Service)
    ///     })
    ///     .unwrap();
    /// container.singleton("suffix", String::from("!")).unwrap();
    /// container
    ///     .register(
    ///         ServiceDefinition::from_value("name", String::from("injector"))
    ///             .with_behaviour("suffixed", json!({})),
    ///     )
    ///     .unwrap();
    ///
    /// assert_eq!(*container.get_as::<String>("name").await.unwrap(), "injector!");
    /// # });
    /// ```
    pub fn register_behaviour<I, S, F, E>(
        &self,
        name: impl Into<String>,
        dependencies: I,
        decorator: F,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Service, &Value, &Dependencies) -> std::result::Result<Service, E>
            + Send
            + Sync
            + 'static,
        E: Into<BoxError>,
    {
        self.register_behaviour_definition(
            BehaviourDefinition::new(name, decorator).with_dependencies(dependencies),
        )
    }

    /// Register a behaviour whose decorator waits on async work.
    ///
    /// The decorator receives owned copies of the per-use configuration and
    /// its resolved `dependencies`. The service is shared only once the
    /// returned future completes.
    pub fn register_async_behaviour<I, S, F, Fut, E>(
        &self,
        name: impl Into<String>,
        dependencies: I,
        decorator: F,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Service, Value, Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Service, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.register_behaviour_definition(
            BehaviourDefinition::from_async(name, decorator).with_dependencies(dependencies),
        )
    }

    /// Register a behaviour definition.
    ///
    /// Fails with [`DiError::BehaviourAlreadyRegistered`] if the name is taken.
    pub fn register_behaviour_definition(&self, definition: BehaviourDefinition) -> Result<()> {
        #[cfg(feature = "logging")]
        debug!(
            target: "named_injector",
            behaviour = definition.name(),
            dependencies = definition.dependencies().len(),
            "Registering behaviour"
        );

        self.storage.insert_behaviour(definition)
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve a service by name.
    ///
    /// A name containing `*` resolves every matching service and returns
    /// them as a [`ServiceGroup`]. Otherwise the named service is
    /// constructed on first request, with its dependencies and behaviours,
    /// and the same value is returned to every later request.
    #[inline]
    pub async fn get(&self, name: &str) -> Result<Service> {
        self.resolve(name, None).await
    }

    /// Resolve a service on behalf of `requested_by`.
    ///
    /// Identical to [`get`](Self::get), except that a missing service is
    /// reported as needed by `requested_by`.
    #[inline]
    pub async fn get_for(&self, name: &str, requested_by: &str) -> Result<Service> {
        self.resolve(name, Some(requested_by)).await
    }

    /// Resolve a service and downcast it to `T`.
    pub async fn get_as<T: Injectable>(&self, name: &str) -> Result<Arc<T>> {
        let service = self.get(name).await?;
        downcast::<T>(name, service)
    }

    /// Resolve several services concurrently, preserving input order.
    ///
    /// Fails with the first error encountered; no partial results.
    pub async fn get_matching<I, S>(&self, names: I) -> Result<Vec<Service>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        try_join_all(names.into_iter().map(|name| self.resolve(name.as_ref(), None))).await
    }

    /// Resolve every service matching a wildcard pattern, in registration order.
    ///
    /// No match is not an error. A name without `*` selects just that
    /// service, if registered.
    pub async fn get_all(&self, pattern: &str) -> Result<Vec<Service>> {
        let names = self.matching_names(pattern)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "named_injector",
            pattern,
            matches = names.len(),
            "Expanding wildcard service name"
        );

        try_join_all(names.iter().map(|name| self.resolve(name, None))).await
    }

    /// Names of the registered services matching `pattern`, in registration order.
    pub fn matching_names(&self, pattern: &str) -> Result<Vec<String>> {
        if !ServicePattern::is_pattern(pattern) {
            return Ok(self
                .contains(pattern)
                .then(|| pattern.to_owned())
                .into_iter()
                .collect());
        }

        let pattern = ServicePattern::new(pattern)?;
        Ok(self
            .storage
            .names()
            .into_iter()
            .filter(|name| pattern.matches(name))
            .collect())
    }

    /// Entry point shared by every resolution path.
    ///
    /// Returns a `'static` future so dependency graphs can recurse through it.
    fn resolve(&self, name: &str, requested_by: Option<&str>) -> BoxFuture<'static, Result<Service>> {
        if ServicePattern::is_pattern(name) {
            let this = self.clone();
            let pattern = name.to_owned();
            return async move {
                let services = this.get_all(&pattern).await?;
                Ok(Arc::new(ServiceGroup::new(pattern, services)) as Service)
            }
            .boxed();
        }

        let Some(definition) = self.storage.service(name) else {
            return future::ready(Err(DiError::not_found(name, requested_by))).boxed();
        };

        let lookup = self.storage.lookup_or_start(name, || {
            let this = self.clone();
            let construction: BoxFuture<'static, Result<Service>> =
                async move { this.construct(definition).await }.boxed();
            construction.shared()
        });

        match lookup {
            StateLookup::Ready(service) => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "named_injector",
                    service = name,
                    "Service resolved from memo"
                );
                future::ready(Ok(service)).boxed()
            }
            StateLookup::Failed(err) => future::ready(Err(err)).boxed(),
            #[cfg(feature = "logging")]
            StateLookup::Pending {
                construction,
                started,
            } => {
                if !started {
                    trace!(
                        target: "named_injector",
                        service = name,
                        "Joining in-flight construction"
                    );
                }
                construction.boxed()
            }
            #[cfg(not(feature = "logging"))]
            StateLookup::Pending { construction, .. } => construction.boxed(),
        }
    }

    /// Run the one construction attempt for a definition and record its outcome
    async fn construct(self, definition: Arc<ServiceDefinition>) -> Result<Service> {
        let name = definition.name();

        #[cfg(feature = "logging")]
        debug!(
            target: "named_injector",
            service = name,
            dependencies = ?definition.dependencies(),
            "Constructing service"
        );

        let outcome = self.build(&definition).await;

        #[cfg(feature = "logging")]
        match &outcome {
            Ok(_) => debug!(target: "named_injector", service = name, "Service constructed"),
            Err(err) => debug!(
                target: "named_injector",
                service = name,
                error = %err,
                "Service construction failed"
            ),
        }

        self.storage.settle(name, &outcome);
        outcome
    }

    async fn build(&self, definition: &ServiceDefinition) -> Result<Service> {
        let dependencies = self
            .resolve_dependencies(definition.name(), definition.dependencies())
            .await?;

        let service = definition
            .factory()
            .construct(dependencies)
            .await
            .map_err(|cause| DiError::creation_failed(definition.name(), &cause))?;

        self.decorate(definition, service).await
    }

    /// Resolve `names` concurrently on behalf of `owner`, keeping declared order
    async fn resolve_dependencies(&self, owner: &str, names: &[String]) -> Result<Dependencies> {
        let services = try_join_all(names.iter().map(|name| self.resolve(name, Some(owner)))).await?;
        Ok(Dependencies::new(owner, names.to_vec(), services))
    }

    /// Apply the definition's behaviours in declaration order, one at a time
    async fn decorate(&self, definition: &ServiceDefinition, service: Service) -> Result<Service> {
        if definition.behaviours().is_empty() {
            return Ok(service);
        }

        let behaviours = definition
            .behaviours()
            .iter()
            .map(|(behaviour, config)| {
                self.storage
                    .behaviour(behaviour)
                    .map(|found| (found, config))
                    .ok_or_else(|| DiError::UnknownBehaviour {
                        service: definition.name().to_owned(),
                        behaviour: behaviour.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let dependencies = try_join_all(
            behaviours
                .iter()
                .map(|(behaviour, _)| self.resolve_dependencies(behaviour.name(), behaviour.dependencies())),
        )
        .await?;

        let mut current = service;
        for ((behaviour, config), dependencies) in behaviours.iter().zip(dependencies) {
            #[cfg(feature = "logging")]
            trace!(
                target: "named_injector",
                service = definition.name(),
                behaviour = behaviour.name(),
                "Applying behaviour"
            );

            current = behaviour
                .decorator()
                .decorate(current, (*config).clone(), dependencies)
                .await
                .map_err(|cause| DiError::decoration_failed(definition.name(), behaviour.name(), &cause))?;
        }

        Ok(current)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Check if a service name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.storage.contains(name)
    }

    /// Check if a behaviour name is registered.
    #[inline]
    pub fn contains_behaviour(&self, name: &str) -> bool {
        self.storage.contains_behaviour(name)
    }

    /// Check if a service has been constructed successfully.
    #[inline]
    pub fn is_resolved(&self, name: &str) -> bool {
        self.storage.is_resolved(name)
    }

    /// Get the number of registered services.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if no services are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Get all registered service names, in registration order.
    #[inline]
    pub fn service_names(&self) -> Vec<String> {
        self.storage.names()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("storage", &self.storage)
            .finish()
    }
}
