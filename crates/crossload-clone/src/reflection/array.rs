//! Array nodes

use crossload_core::{Context, ObjectRef, ReflectError, ReflectResult};

use super::{InnerCloner, ReflectionCloner};
use crate::error::CloneResult;
use crate::traverser::TraversalSession;

/// Clones arrays: a new array over the component type resolved in the
/// target context, elements cloned by position
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ArrayCloner;

impl InnerCloner for ArrayCloner {
    fn instantiate_clone(&self, original: &ObjectRef, target: &Context) -> ReflectResult<ObjectRef> {
        let component = original
            .type_ref()
            .component_type()
            .ok_or_else(|| ReflectError::Instantiation {
                type_name: original.type_ref().name().to_string(),
                reason: "not an array type".to_string(),
            })?;
        let resolved = target.resolve(component.name())?;
        ObjectRef::new_array(&resolved, original.length().unwrap_or(0))
    }

    fn clone_content(
        &self,
        original: &ObjectRef,
        clone: &ObjectRef,
        target: &Context,
        session: &mut TraversalSession,
        engine: &ReflectionCloner,
    ) -> CloneResult<()> {
        let elements = original.elements().unwrap_or_default();
        for (index, element) in elements.iter().enumerate() {
            let cloned = if element.is_primitive() {
                element.clone()
            } else {
                engine.clone_in_session(element, target, session)?
            };
            clone.set_element(index, cloned)?;
        }
        Ok(())
    }
}
