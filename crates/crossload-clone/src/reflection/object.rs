//! Ordinary object nodes

use crossload_core::{Context, FieldIntrospector, InstantiationPolicy, ObjectRef, ReflectResult};

use super::{InnerCloner, ReflectionCloner};
use crate::error::CloneResult;
use crate::traverser::TraversalSession;

/// Clones ordinary objects: a bypass-instantiated peer of the type resolved
/// in the target context, with every instance field copied or cloned
#[derive(Debug)]
pub(crate) struct ObjectCloner<'a> {
    pub(crate) instantiation: &'a dyn InstantiationPolicy,
}

impl InnerCloner for ObjectCloner<'_> {
    fn instantiate_clone(&self, original: &ObjectRef, target: &Context) -> ReflectResult<ObjectRef> {
        let resolved = target.resolve(original.type_ref().name())?;
        self.instantiation.new_instance(&resolved)
    }

    fn clone_content(
        &self,
        original: &ObjectRef,
        clone: &ObjectRef,
        target: &Context,
        session: &mut TraversalSession,
        engine: &ReflectionCloner,
    ) -> CloneResult<()> {
        let source = FieldIntrospector::new(original)?;
        let destination = FieldIntrospector::new(clone)?;
        for descriptor in source.all_instance_fields() {
            let value = source.get_value(&descriptor)?;
            let cloned = if descriptor.is_primitive() {
                value
            } else {
                engine.clone_in_session(&value, target, session)?
            };
            destination.set_value(&descriptor, cloned)?;
        }
        Ok(())
    }
}
