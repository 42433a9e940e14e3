//! Service values handed out by the container
//!
//! Services are type-erased behind [`Service`]; these types give typed access
//! to them without panicking on a wrong guess.

use crate::{DiError, Result};
use std::any::Any;
use std::sync::Arc;

/// Marker trait for types that can be stored as a service.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// A resolved, type-erased service value.
///
/// Every requester of a name receives a clone of the same `Arc`.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Downcast a service, reporting `name` on failure.
#[inline]
pub(crate) fn downcast<T: Injectable>(name: &str, service: Service) -> Result<Arc<T>> {
    service
        .downcast::<T>()
        .map_err(|_| DiError::type_mismatch::<T>(name))
}

/// The services matched by a wildcard name, in registration order.
///
/// When a wildcard name such as `"handlers.*"` is requested through
/// [`Container::get`](crate::Container::get) or declared as a dependency,
/// the resolved value is a `ServiceGroup`.
///
/// # Examples
///
/// ```rust
/// use named_injector::{Container, ServiceGroup};
///
/// # futures::executor::block_on(async {
/// let container = Container::new();
/// container.singleton("group.a", 1_u32).unwrap();
/// container.singleton("group.b", 2_u32).unwrap();
///
/// let group = container.get_as::<ServiceGroup>("group.*").await.unwrap();
/// let values: Vec<u32> = group.iter_as::<u32>().map(|v| *v.unwrap()).collect();
/// assert_eq!(values, vec![1, 2]);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct ServiceGroup {
    pattern: String,
    services: Vec<Service>,
}

impl ServiceGroup {
    pub(crate) fn new(pattern: impl Into<String>, services: Vec<Service>) -> Self {
        Self {
            pattern: pattern.into(),
            services,
        }
    }

    /// The wildcard pattern this group was expanded from
    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of matched services
    #[inline]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check if nothing matched
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Get the raw service at `index`
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Service> {
        self.services.get(index)
    }

    /// Iterate the raw services
    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    /// Iterate the services downcast to `T`
    pub fn iter_as<T: Injectable>(&self) -> impl Iterator<Item = Result<Arc<T>>> + '_ {
        self.services
            .iter()
            .map(|service| downcast::<T>(&self.pattern, Arc::clone(service)))
    }

    /// Consume the group into its services
    #[inline]
    pub fn into_vec(self) -> Vec<Service> {
        self.services
    }
}

impl std::fmt::Debug for ServiceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceGroup")
            .field("pattern", &self.pattern)
            .field("count", &self.len())
            .finish()
    }
}

/// Resolved dependencies passed to a factory or decorator.
///
/// Values are positionally aligned with the declared dependency names,
/// regardless of the order in which they finished resolving.
#[derive(Clone, Default)]
pub struct Dependencies {
    owner: String,
    names: Vec<String>,
    services: Vec<Service>,
}

impl Dependencies {
    pub(crate) fn new(owner: impl Into<String>, names: Vec<String>, services: Vec<Service>) -> Self {
        debug_assert_eq!(names.len(), services.len());
        Self {
            owner: owner.into(),
            names,
            services,
        }
    }

    /// Name of the service or behaviour these dependencies were resolved for
    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Declared dependency names, in order
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of dependencies
    #[inline]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check if there are no dependencies
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Get the dependency at `index` downcast to `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use named_injector::{Container, Dependencies, ServiceDefinition};
    ///
    /// # futures::executor::block_on(async {
    /// let container = Container::new();
    /// container.singleton("port", 8080_u16).unwrap();
    /// container
    ///     .register(
    ///         ServiceDefinition::from_fn("address", |deps: Dependencies| {
    ///             let port = deps.get::<u16>(0)?;
    ///             Ok::<_, named_injector::DiError>(format!("127.0.0.1:{port}"))
    ///         })
    ///         .with_dependencies(["port"]),
    ///     )
    ///     .unwrap();
    ///
    /// let address = container.get_as::<String>("address").await.unwrap();
    /// assert_eq!(*address, "127.0.0.1:8080");
    /// # });
    /// ```
    pub fn get<T: Injectable>(&self, index: usize) -> Result<Arc<T>> {
        let service = self.raw(index)?;
        downcast::<T>(&self.names[index], Arc::clone(service))
    }

    /// Get the wildcard group at `index`
    #[inline]
    pub fn group(&self, index: usize) -> Result<Arc<ServiceGroup>> {
        self.get::<ServiceGroup>(index)
    }

    /// Get the type-erased dependency at `index`
    #[inline]
    pub fn raw(&self, index: usize) -> Result<&Service> {
        self.services
            .get(index)
            .ok_or_else(|| DiError::MissingDependency {
                service: self.owner.clone(),
                index,
            })
    }

    /// Consume into the raw services
    #[inline]
    pub fn into_vec(self) -> Vec<Service> {
        self.services
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies")
            .field("owner", &self.owner)
            .field("names", &self.names)
            .finish()
    }
}
