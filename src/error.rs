//! Error types for dependency injection

use thiserror::Error;

/// Boxed error accepted from factories and decorators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during dependency injection operations
///
/// `DiError` is `Clone` because a failed construction is shared by every
/// requester that was waiting on it, and by every later request for the
/// same name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// A service with this name was already registered
    #[error("Cannot replace existing service {name}")]
    AlreadyRegistered { name: String },

    /// A behaviour with this name was already registered
    #[error("Cannot replace existing behaviour {name}")]
    BehaviourAlreadyRegistered { name: String },

    /// Service was not found in the container
    #[error("Cannot get undefined service {name}{}", dependent_suffix(.requested_by))]
    NotFound {
        name: String,
        /// The service whose dependency list named the missing service
        requested_by: Option<String>,
    },

    /// Factory failed to create service
    #[error("Trouble getting {name}: {reason}")]
    CreationFailed { name: String, reason: String },

    /// A service declared a behaviour that was never registered
    #[error("Cannot decorate {service} with undefined behaviour {behaviour}")]
    UnknownBehaviour { service: String, behaviour: String },

    /// A behaviour's decorator failed
    #[error("Trouble decorating {service} with {behaviour}: {reason}")]
    DecorationFailed {
        service: String,
        behaviour: String,
        reason: String,
    },

    /// A resolved service could not be downcast to the requested type
    #[error("Service {name} is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    /// A wildcard name could not be compiled
    #[error("Invalid service pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A factory or decorator asked for a dependency it did not declare
    #[error("{service} has no dependency at position {index}")]
    MissingDependency { service: String, index: usize },
}

fn dependent_suffix(requested_by: &Option<String>) -> String {
    match requested_by {
        Some(dependent) => format!(" for {dependent}"),
        None => String::new(),
    }
}

impl DiError {
    /// Create a NotFound error, optionally naming the dependent that needed it
    #[inline]
    pub fn not_found(name: impl Into<String>, requested_by: Option<&str>) -> Self {
        Self::NotFound {
            name: name.into(),
            requested_by: requested_by.map(str::to_owned),
        }
    }

    /// Create a CreationFailed error from a factory failure
    #[inline]
    pub fn creation_failed(name: impl Into<String>, cause: &BoxError) -> Self {
        Self::CreationFailed {
            name: name.into(),
            reason: cause.to_string(),
        }
    }

    /// Create a DecorationFailed error from a decorator failure
    #[inline]
    pub fn decoration_failed(
        service: impl Into<String>,
        behaviour: impl Into<String>,
        cause: &BoxError,
    ) -> Self {
        Self::DecorationFailed {
            service: service.into(),
            behaviour: behaviour.into(),
            reason: cause.to_string(),
        }
    }

    /// Create a TypeMismatch error for a type
    #[inline]
    pub fn type_mismatch<T: 'static>(name: impl Into<String>) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Whether this error was raised while registering rather than resolving
    #[inline]
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegistered { .. } | Self::BehaviourAlreadyRegistered { .. }
        )
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
