//! Instantiation without initializers

use std::fmt;

use tracing::trace;

use crate::error::ReflectResult;
use crate::object::ObjectRef;
use crate::types::TypeRef;

/// Creates instances of resolved types without running their initializers
pub trait InstantiationPolicy: fmt::Debug + Send + Sync {
    /// A new instance of `ty` whose slots hold default values
    fn new_instance(&self, ty: &TypeRef) -> ReflectResult<ObjectRef>;
}

/// Allocates the instance layout directly. Refuses interfaces, abstract,
/// primitive and array types, and the built-in value types whose payload
/// cannot be defaulted.
#[derive(Debug, Default, Clone, Copy)]
pub struct BypassInstantiator;

impl InstantiationPolicy for BypassInstantiator {
    fn new_instance(&self, ty: &TypeRef) -> ReflectResult<ObjectRef> {
        let obj = ObjectRef::allocate(ty)?;
        trace!(type_name = %ty.name(), context = %ty.context_name(), "allocated instance");
        Ok(obj)
    }
}
