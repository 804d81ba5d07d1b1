//! Error types for the object model and reflection primitives

use thiserror::Error;

/// A required parameter of a public operation is absent or malformed.
///
/// Raised before any side effect; callers surface it unwrapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid parameter {position} ({parameter}): {message}")]
pub struct ValidationError {
    /// Zero-based parameter position
    pub position: usize,
    /// Parameter name
    pub parameter: &'static str,
    /// What is wrong with it
    pub message: String,
}

impl ValidationError {
    /// Create a validation error
    pub fn new(position: usize, parameter: &'static str, message: impl Into<String>) -> Self {
        Self {
            position,
            parameter,
            message: message.into(),
        }
    }
}

/// Exception raised by a native method or initializer body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct MethodError {
    /// Exception message
    pub message: String,
}

impl MethodError {
    /// Create a method error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ReflectError> for MethodError {
    fn from(err: ReflectError) -> Self {
        MethodError::new(err.to_string())
    }
}

/// Errors raised by type resolution, field introspection and instantiation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflectError {
    /// Parameter validation failed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A named type is not resolvable in a context
    #[error("Unable to resolve type '{name}' in context '{context}': {reason}")]
    TypeResolution {
        /// Type name
        name: String,
        /// Context name
        context: String,
        /// Why resolution failed
        reason: String,
    },

    /// The field does not exist on the resolved declaring type
    #[error("No field '{field}' declared by '{declaring_type}'")]
    MissingField {
        /// Declaring type name
        declaring_type: String,
        /// Field name
        field: String,
    },

    /// The field exists but cannot be read or written
    #[error("Cannot access field '{declaring_type}.{field}': {reason}")]
    FieldAccess {
        /// Declaring type name
        declaring_type: String,
        /// Field name
        field: String,
        /// Why access failed
        reason: String,
    },

    /// Array element access out of bounds or with an incompatible value
    #[error("Cannot access element {index} of '{array_type}': {reason}")]
    ElementAccess {
        /// Array type name
        array_type: String,
        /// Element index
        index: usize,
        /// Why access failed
        reason: String,
    },

    /// Bypassed construction refused for a type
    #[error("Cannot instantiate '{type_name}': {reason}")]
    Instantiation {
        /// Type name
        type_name: String,
        /// Why instantiation was refused
        reason: String,
    },

    /// The initializer of an ordinary construction failed
    #[error("Construction of '{type_name}' failed: {source}")]
    Construction {
        /// Type name
        type_name: String,
        /// Exception raised by the initializer
        #[source]
        source: MethodError,
    },
}

impl ReflectError {
    /// Whether the cloning engine may recover from this error by falling
    /// back to its alternate strategy
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReflectError::TypeResolution { .. }
                | ReflectError::MissingField { .. }
                | ReflectError::FieldAccess { .. }
                | ReflectError::ElementAccess { .. }
                | ReflectError::Instantiation { .. }
        )
    }
}

/// Result type for reflection operations
pub type ReflectResult<T> = Result<T, ReflectError>;
