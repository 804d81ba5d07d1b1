//! Cross-context object graph cloning
//!
//! Reconstructs an object graph so that every type inside it resolves in a
//! caller-chosen target [`Context`](crossload_core::Context), preserving
//! cycles and shared references.
//!
//! | Piece                   | Role                                                |
//! |-------------------------|-----------------------------------------------------|
//! | [`CloningStrategy`]     | The strategy abstraction                            |
//! | [`ReflectionCloner`]    | Primary, field-by-field strategy                    |
//! | [`MarshalCloner`]       | Fallback, value transport through a serde encoding  |
//! | [`CloneDecisionPolicy`] | Clone-vs-reuse decisions per node                   |
//! | [`TraversalSession`]    | Identity memo for one clone operation               |

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod decision;
pub mod error;
pub mod marshal;
pub mod reflection;
pub mod strategy;
pub mod traverser;

pub use decision::{CloneDecisionPolicy, DecisionKind, ExhaustiveDecision, SelectiveDecision};
pub use error::{CloneError, CloneResult, MarshalError};
pub use marshal::{MarshalCloner, MarshalledGraph, MarshalledNode, MarshalledValue};
pub use reflection::{FallbackScope, ReflectionCloner};
pub use strategy::CloningStrategy;
pub use traverser::{Checkpoint, CycleSafeTraverser, TraversalSession};
