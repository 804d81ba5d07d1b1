//! Handles over wrapped values and types

use std::sync::Arc;

use crossload_clone::CloningStrategy;
use crossload_core::{is_assignable_to, Context, ObjectRef, TypeRef, ValidationError, Value};
use tracing::trace;

use crate::adapter::{ForwardingAdapter, InterfaceShape};
use crate::error::{CrossloadError, CrossloadResult};
use crate::invoke::{InvocationDescriptor, InvocationEngine};

fn require_type_name(type_name: &str) -> Result<(), ValidationError> {
    if type_name.trim().is_empty() {
        return Err(ValidationError::new(0, "type_name", "must not be empty"));
    }
    Ok(())
}

/// A value (possibly absent) with cloning and invocation attached
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    value: Value,
    cloner: Arc<dyn CloningStrategy>,
    engine: InvocationEngine,
}

impl ObjectHandle {
    pub(crate) fn new(value: Value, cloner: Arc<dyn CloningStrategy>) -> Self {
        let engine = InvocationEngine::new(cloner.clone());
        Self {
            value,
            cloner,
            engine,
        }
    }

    /// Check if the wrapped value is `Null`
    pub fn is_absent(&self) -> bool {
        self.value.is_null()
    }

    /// The wrapped value
    pub fn unwrap(&self) -> &Value {
        &self.value
    }

    /// Consume the handle, returning the wrapped value
    pub fn into_inner(self) -> Value {
        self.value
    }

    /// Whether the wrapped value's type, a superclass, or an implemented
    /// interface is named `type_name`. An absent value is an instance of
    /// nothing; a primitive is an instance of its own kind only.
    pub fn is_instance_of(&self, type_name: &str) -> CrossloadResult<bool> {
        require_type_name(type_name)?;
        Ok(match &self.value {
            Value::Null => false,
            Value::Ref(obj) => is_assignable_to(obj.type_ref(), type_name),
            primitive => primitive
                .primitive_kind()
                .map_or(false, |kind| kind.name() == type_name),
        })
    }

    /// Clone the wrapped value into `target`
    pub fn clone_into(&self, target: &Context) -> CrossloadResult<Value> {
        trace!(value = %self.value, target = %target.name(), "clone_into");
        self.cloner
            .clone_value(&self.value, target)
            .map_err(|source| CrossloadError::Cloning {
                value: self.value.to_string(),
                context: target.name().to_string(),
                source,
            })
    }

    /// Invoke a described method on the wrapped object
    pub fn invoke(&self, descriptor: &InvocationDescriptor) -> CrossloadResult<Value> {
        let target = self.target()?;
        self.engine
            .invoke(target, descriptor)
            .map_err(|source| CrossloadError::Invocation {
                signature: descriptor.signature(),
                target: target.to_string(),
                source,
            })
    }

    /// Adapt the wrapped object to `shape`. The object is not checked
    /// against the shape; unsupported methods fail when called.
    pub fn adapt_to(&self, shape: InterfaceShape) -> CrossloadResult<ForwardingAdapter> {
        self.target()?;
        Ok(ForwardingAdapter::new(self.clone(), shape))
    }

    fn target(&self) -> Result<&ObjectRef, ValidationError> {
        match &self.value {
            Value::Ref(obj) => Ok(obj),
            Value::Null => Err(ValidationError::new(0, "target", "must not be null")),
            _ => Err(ValidationError::new(0, "target", "must be an object, not a primitive")),
        }
    }
}

/// A type (possibly absent)
#[derive(Debug, Clone)]
pub struct TypeHandle {
    ty: Option<TypeRef>,
}

impl TypeHandle {
    pub(crate) fn new(ty: Option<TypeRef>) -> Self {
        Self { ty }
    }

    /// Check if no type is wrapped
    pub fn is_absent(&self) -> bool {
        self.ty.is_none()
    }

    /// The wrapped type
    pub fn unwrap(&self) -> Option<&TypeRef> {
        self.ty.as_ref()
    }

    /// Whether the type, a superclass, or an implemented interface is named
    /// `type_name`. An absent type is assignable to nothing.
    pub fn is_assignable_to(&self, type_name: &str) -> CrossloadResult<bool> {
        require_type_name(type_name)?;
        Ok(self
            .ty
            .as_ref()
            .map_or(false, |ty| is_assignable_to(ty, type_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossload_clone::ReflectionCloner;
    use crossload_core::{bootstrap, fixtures};

    fn handle(value: Value) -> ObjectHandle {
        ObjectHandle::new(value, Arc::new(ReflectionCloner::exhaustive()))
    }

    #[test]
    fn test_absent_value() {
        let h = handle(Value::Null);
        assert!(h.is_absent());
        assert!(!h.is_instance_of(bootstrap::OBJECT).unwrap());
        assert_eq!(h.clone_into(&fixtures::context("b")).unwrap(), Value::Null);

        let err = h.invoke(&InvocationDescriptor::no_args("m").unwrap()).unwrap_err();
        assert_eq!(err.validation_error().map(|e| e.parameter), Some("target"));
        assert!(h.adapt_to(InterfaceShape::new("S")).is_err());
    }

    #[test]
    fn test_primitive_instance_of() {
        let h = handle(Value::Int(3));
        assert!(h.is_instance_of("int").unwrap());
        assert!(!h.is_instance_of("long").unwrap());
        assert!(!h.is_instance_of(bootstrap::OBJECT).unwrap());
    }

    #[test]
    fn test_instance_of_walks_interfaces() {
        let ctx = fixtures::context("a");
        let h = handle(Value::Ref(fixtures::greeter(&ctx, "ann")));
        assert!(h.is_instance_of(fixtures::GREETER).unwrap());
        assert!(h.is_instance_of(fixtures::NAMED).unwrap());
        assert!(h.is_instance_of(bootstrap::OBJECT).unwrap());
        assert!(!h.is_instance_of(fixtures::COUNTER).unwrap());
    }

    #[test]
    fn test_empty_type_name_is_rejected() {
        let h = handle(Value::Int(3));
        let err = h.is_instance_of("").unwrap_err();
        assert_eq!(err.validation_error().map(|e| e.position), Some(0));

        let t = TypeHandle::new(None);
        assert!(t.is_assignable_to(" ").is_err());
    }

    #[test]
    fn test_type_handle() {
        let ctx = fixtures::context("a");
        let ty = ctx.resolve(fixtures::HIERARCHY_BOTTOM).unwrap();
        let t = TypeHandle::new(Some(ty.clone()));
        assert!(!t.is_absent());
        assert_eq!(t.unwrap(), Some(&ty));
        assert!(t.is_assignable_to(fixtures::HIERARCHY_TOP).unwrap());
        assert!(!t.is_assignable_to(fixtures::GREETER).unwrap());

        let absent = TypeHandle::new(None);
        assert!(absent.is_absent());
        assert!(!absent.is_assignable_to(bootstrap::OBJECT).unwrap());
    }
}
