//! Factory and decorator types
//!
//! A service factory turns resolved [`Dependencies`] into a service value,
//! immediately or asynchronously. A decorator replaces an already
//! constructed value before it is memoized, and may also wait on async work.
//!
//! Closures are adapted into these traits by the registration methods on
//! [`ServiceDefinition`](crate::ServiceDefinition) and
//! [`Container`](crate::Container); implement the traits directly when the
//! factory or decorator carries its own state.

use crate::error::BoxError;
use crate::{Dependencies, Injectable, Service};
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Outcome of a factory invocation, before it is wrapped with the service name
pub type FactoryResult = std::result::Result<Service, BoxError>;

/// Creates a service value from its resolved dependencies.
///
/// The container calls `construct` at most once per registered name.
pub trait ServiceFactory: Send + Sync + 'static {
    /// Build the service
    fn construct(&self, dependencies: Dependencies) -> BoxFuture<'static, FactoryResult>;
}

/// Outcome of a decorator invocation, before it is wrapped with the service
/// and behaviour names
pub type DecoratorResult = std::result::Result<Service, BoxError>;

/// Replaces a constructed service with a decorated one.
///
/// Decoration may wait on async work; the service is not shared until every
/// declared behaviour has finished.
pub trait Decorator: Send + Sync + 'static {
    /// Decorate `service` using the per-use `config` and the behaviour's own
    /// resolved `dependencies`
    fn decorate(
        &self,
        service: Service,
        config: Value,
        dependencies: Dependencies,
    ) -> BoxFuture<'static, DecoratorResult>;
}

// =============================================================================
// Service factories
// =============================================================================

/// Factory backed by an async closure
pub(crate) struct AsyncFnFactory<F>(pub(crate) F);

impl<F, Fut, T, E> ServiceFactory for AsyncFnFactory<F>
where
    F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    T: Injectable,
    E: Into<BoxError>,
{
    fn construct(&self, dependencies: Dependencies) -> BoxFuture<'static, FactoryResult> {
        (self.0)(dependencies)
            .map(|result| match result {
                Ok(value) => Ok(Arc::new(value) as Service),
                Err(err) => Err(err.into()),
            })
            .boxed()
    }
}

/// Factory backed by a synchronous closure
pub(crate) struct FnFactory<F>(pub(crate) F);

impl<F, T, E> ServiceFactory for FnFactory<F>
where
    F: Fn(Dependencies) -> std::result::Result<T, E> + Send + Sync + 'static,
    T: Injectable,
    E: Into<BoxError>,
{
    fn construct(&self, dependencies: Dependencies) -> BoxFuture<'static, FactoryResult> {
        let result = (self.0)(dependencies)
            .map(|value| Arc::new(value) as Service)
            .map_err(Into::into);
        future::ready(result).boxed()
    }
}

/// Factory for a value that already exists at registration time
pub(crate) struct ValueFactory {
    value: Service,
}

impl ValueFactory {
    #[inline]
    pub(crate) fn new<T: Injectable>(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }
}

impl ServiceFactory for ValueFactory {
    fn construct(&self, _dependencies: Dependencies) -> BoxFuture<'static, FactoryResult> {
        future::ready(Ok(Arc::clone(&self.value))).boxed()
    }
}

// =============================================================================
// Decorators
// =============================================================================

/// Decorator backed by a synchronous closure
pub(crate) struct FnDecorator<F>(pub(crate) F);

impl<F, E> Decorator for FnDecorator<F>
where
    F: Fn(Service, &Value, &Dependencies) -> std::result::Result<Service, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn decorate(
        &self,
        service: Service,
        config: Value,
        dependencies: Dependencies,
    ) -> BoxFuture<'static, DecoratorResult> {
        let result = (self.0)(service, &config, &dependencies).map_err(Into::into);
        future::ready(result).boxed()
    }
}

/// Decorator backed by an async closure
pub(crate) struct AsyncFnDecorator<F>(pub(crate) F);

impl<F, Fut, E> Decorator for AsyncFnDecorator<F>
where
    F: Fn(Service, Value, Dependencies) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Service, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn decorate(
        &self,
        service: Service,
        config: Value,
        dependencies: Dependencies,
    ) -> BoxFuture<'static, DecoratorResult> {
        (self.0)(service, config, dependencies)
            .map(|result| result.map_err(Into::into))
            .boxed()
    }
}
