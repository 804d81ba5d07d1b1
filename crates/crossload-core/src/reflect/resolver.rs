//! Type resolution by name

use crate::context::Context;
use crate::error::{ReflectResult, ValidationError};
use crate::types::TypeRef;

/// Resolve a fully-qualified type name in `context`
pub fn resolve_type(name: &str, context: &Context) -> ReflectResult<TypeRef> {
    if name.trim().is_empty() {
        return Err(ValidationError::new(0, "type_name", "must not be empty").into());
    }
    context.resolve(name)
}

/// Resolve several names in order, failing on the first one that does not
/// resolve. All names are validated before anything is resolved.
pub fn resolve_types<S: AsRef<str>>(names: &[S], context: &Context) -> ReflectResult<Vec<TypeRef>> {
    if let Some(index) = names.iter().position(|name| name.as_ref().trim().is_empty()) {
        return Err(ValidationError::new(
            0,
            "type_names",
            format!("entry {} must not be empty", index),
        )
        .into());
    }
    names
        .iter()
        .map(|name| context.resolve(name.as_ref()))
        .collect()
}
