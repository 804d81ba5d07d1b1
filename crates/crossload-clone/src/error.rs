//! Error types for the cloning engine

use crossload_core::ReflectError;
use thiserror::Error;

/// Errors raised by the marshalling transport
#[derive(Debug, Error)]
pub enum MarshalError {
    /// An object's type does not opt into the transport
    #[error("Type '{type_name}' is not serializable")]
    NotSerializable {
        /// Type name
        type_name: String,
    },

    /// The graph holds more nodes than the configured limit
    #[error("Graph exceeds the limit of {0} nodes")]
    TooManyNodes(usize),

    /// A node index with no node behind it
    #[error("Dangling node reference {0}")]
    DanglingReference(usize),

    /// A boxed node holds something other than a primitive
    #[error("Malformed node {index}: {reason}")]
    Malformed {
        /// Node index
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// Encoding or decoding the transport form failed
    #[error("Encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Rebuilding the graph in the target context failed
    #[error(transparent)]
    Reflect(#[from] ReflectError),
}

/// Errors surfaced by a cloning strategy
#[derive(Debug, Error)]
pub enum CloneError {
    /// The reflective path failed and no fallback applied
    #[error("Reflective cloning failed: {0}")]
    Reflect(#[from] ReflectError),

    /// The marshalling transport failed
    #[error("Marshalling failed: {0}")]
    Marshal(#[from] MarshalError),

    /// The fallback strategy itself failed for a node
    #[error("Unable to clone '{value}': {source}")]
    Fallback {
        /// Rendering of the original value
        value: String,
        /// Why the fallback failed
        #[source]
        source: Box<CloneError>,
    },
}

impl CloneError {
    /// The reflection error behind this failure, if there is one
    pub fn reflect_error(&self) -> Option<&ReflectError> {
        match self {
            CloneError::Reflect(err) | CloneError::Marshal(MarshalError::Reflect(err)) => Some(err),
            CloneError::Fallback { source, .. } => source.reflect_error(),
            _ => None,
        }
    }
}

/// Result type for cloning operations
pub type CloneResult<T> = Result<T, CloneError>;
