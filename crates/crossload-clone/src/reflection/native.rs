//! Built-in value nodes

use crossload_core::{Context, ObjectRef, ReflectError, ReflectResult};

use super::{InnerCloner, ReflectionCloner};
use crate::error::CloneResult;
use crate::traverser::TraversalSession;

/// Clones text, primitive boxes and big numbers: a new object carrying the
/// same payload. Built-in types are shared by every context and their
/// payload is immutable, so there is no content to clone.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NativeCloner;

impl InnerCloner for NativeCloner {
    fn instantiate_clone(&self, original: &ObjectRef, _target: &Context) -> ReflectResult<ObjectRef> {
        let payload = original
            .native_value()
            .ok_or_else(|| ReflectError::Instantiation {
                type_name: original.type_ref().name().to_string(),
                reason: "no native payload".to_string(),
            })?;
        ObjectRef::from_native(payload)
    }

    fn clone_content(
        &self,
        _original: &ObjectRef,
        _clone: &ObjectRef,
        _target: &Context,
        _session: &mut TraversalSession,
        _engine: &ReflectionCloner,
    ) -> CloneResult<()> {
        Ok(())
    }
}
