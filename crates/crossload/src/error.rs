//! Facade error type

use crossload_clone::CloneError;
use crossload_core::{ReflectError, ValidationError};

use crate::config::ConfigError;
use crate::invoke::InvocationError;

/// Errors returned by the public operations of this crate
#[derive(Debug, thiserror::Error)]
pub enum CrossloadError {
    /// A required parameter is absent or malformed. Never wrapped.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Cloning a value into another context failed
    #[error("Unable to clone '{value}' into context '{context}': {source}")]
    Cloning {
        /// Rendering of the value
        value: String,
        /// Target context name
        context: String,
        /// Cause
        #[source]
        source: CloneError,
    },

    /// A described invocation failed
    #[error("Unable to invoke '{signature}' on '{target}': {source}")]
    Invocation {
        /// `name[type, type]`
        signature: String,
        /// Rendering of the target
        target: String,
        /// Cause
        #[source]
        source: InvocationError,
    },

    /// A type name did not resolve
    #[error("Unable to resolve type '{name}': {source}")]
    TypeResolution {
        /// Type name
        name: String,
        /// Cause
        #[source]
        source: ReflectError,
    },

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CrossloadError {
    /// Wrap a resolution failure, surfacing validation errors unwrapped
    pub(crate) fn type_resolution(name: &str, err: ReflectError) -> Self {
        match err {
            ReflectError::Validation(err) => CrossloadError::Validation(err),
            ReflectError::TypeResolution { ref name, .. } => CrossloadError::TypeResolution {
                name: name.clone(),
                source: err,
            },
            other => CrossloadError::TypeResolution {
                name: name.to_string(),
                source: other,
            },
        }
    }

    /// The validation error, if this is one
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            CrossloadError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for facade operations
pub type CrossloadResult<T> = Result<T, CrossloadError>;
