//! The cloning strategy abstraction

use std::fmt;

use crossload_core::{Context, Value};

use crate::error::CloneResult;

/// Produces, for a value, an equivalent value whose types resolve in a
/// target context
pub trait CloningStrategy: fmt::Debug + Send + Sync {
    /// Clone one value into `target`. `Null` and primitives come back
    /// unchanged.
    fn clone_value(&self, original: &Value, target: &Context) -> CloneResult<Value>;

    /// Clone several values into `target`. Strategies that track identity
    /// share it across the whole list, so a node referenced from two
    /// values is cloned once.
    fn clone_all(&self, originals: &[Value], target: &Context) -> CloneResult<Vec<Value>> {
        originals
            .iter()
            .map(|original| self.clone_value(original, target))
            .collect()
    }
}
