//! Field introspection
//!
//! [`FieldDescriptor`]s name a field by its declaring type name and field
//! name, so a descriptor read off an object in one context can be applied to
//! a structural peer in another. [`FieldIntrospector`] resolves the
//! declaring type in its context, then reads or writes the slot, bypassing
//! `private` (except on sealed types).

use std::fmt;

use crate::context::Context;
use crate::error::{ReflectError, ReflectResult};
use crate::object::ObjectRef;
use crate::types::{FieldDef, TypeRef};
use crate::value::Value;

/// Identifies one instance field independent of the context that loaded
/// its declaring type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    declaring_type_name: String,
    field_name: String,
    is_primitive: bool,
}

impl FieldDescriptor {
    /// Create a descriptor
    pub fn new(
        declaring_type_name: impl Into<String>,
        field_name: impl Into<String>,
        is_primitive: bool,
    ) -> Self {
        Self {
            declaring_type_name: declaring_type_name.into(),
            field_name: field_name.into(),
            is_primitive,
        }
    }

    fn of(declaring: &TypeRef, field: &FieldDef) -> Self {
        Self::new(declaring.name(), field.name.as_str(), field.is_primitive())
    }

    /// Name of the type declaring the field
    pub fn declaring_type_name(&self) -> &str {
        &self.declaring_type_name
    }

    /// Field name
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Whether the declared type of the field is primitive
    pub fn is_primitive(&self) -> bool {
        self.is_primitive
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type_name, self.field_name)
    }
}

/// Reflective access to the fields of one object
#[derive(Debug, Clone)]
pub struct FieldIntrospector {
    instance: ObjectRef,
    context: Context,
}

impl FieldIntrospector {
    /// Introspect `instance`, resolving declaring types in the context that
    /// defined its type
    pub fn new(instance: &ObjectRef) -> ReflectResult<Self> {
        let context = instance.type_ref().require_context()?;
        Ok(Self::with_context(instance, &context))
    }

    /// Introspect `instance`, resolving declaring types in `context`
    pub fn with_context(instance: &ObjectRef, context: &Context) -> Self {
        Self {
            instance: instance.clone(),
            context: context.clone(),
        }
    }

    /// The introspected object
    pub fn instance(&self) -> &ObjectRef {
        &self.instance
    }

    /// Every non-static field of the concrete type and each ancestor, most
    /// derived first. Shadowed fields appear once per declaring type.
    pub fn all_instance_fields(&self) -> Vec<FieldDescriptor> {
        self.instance
            .type_ref()
            .hierarchy()
            .flat_map(|ty| {
                ty.declared_fields()
                    .iter()
                    .filter(|field| !field.modifiers.is_static)
                    .map(|field| FieldDescriptor::of(&ty, field))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Read the described field
    pub fn get_value(&self, descriptor: &FieldDescriptor) -> ReflectResult<Value> {
        let (_, _, index) = self.locate(descriptor)?;
        self.instance
            .slot(index)
            .ok_or_else(|| access_error(descriptor, "instance has no field slots"))
    }

    /// Write the described field
    pub fn set_value(&self, descriptor: &FieldDescriptor, value: Value) -> ReflectResult<()> {
        let (declaring, field, index) = self.locate(descriptor)?;
        check_assignable(&declaring, &field, descriptor, &value)?;
        if self.instance.set_slot(index, value) {
            Ok(())
        } else {
            Err(access_error(descriptor, "instance has no field slots"))
        }
    }

    fn locate(&self, descriptor: &FieldDescriptor) -> ReflectResult<(TypeRef, FieldDef, usize)> {
        let declaring = self.context.resolve(descriptor.declaring_type_name())?;
        let field = declaring
            .declared_field(descriptor.field_name())
            .cloned()
            .ok_or_else(|| ReflectError::MissingField {
                declaring_type: descriptor.declaring_type_name().to_string(),
                field: descriptor.field_name().to_string(),
            })?;

        if field.modifiers.is_static {
            return Err(access_error(descriptor, "field is static"));
        }
        if field.modifiers.is_private && declaring.flags().is_sealed {
            return Err(access_error(
                descriptor,
                "declaring type is sealed against reflective access",
            ));
        }

        let index = self
            .instance
            .type_ref()
            .slot_index(declaring.id(), descriptor.field_name())
            .ok_or_else(|| {
                access_error(
                    descriptor,
                    &format!(
                        "'{}' from context '{}' is not in the hierarchy of '{:?}'",
                        declaring.name(),
                        declaring.context_name(),
                        self.instance.type_ref()
                    ),
                )
            })?;
        Ok((declaring, field, index))
    }
}

fn check_assignable(
    declaring: &TypeRef,
    field: &FieldDef,
    descriptor: &FieldDescriptor,
    value: &Value,
) -> ReflectResult<()> {
    let assignable = match (field.primitive_kind(), value) {
        (Some(kind), value) => value.primitive_kind() == Some(kind),
        (None, Value::Null) => true,
        (None, Value::Ref(obj)) => {
            let declared = declaring.require_context()?.resolve(&field.type_name)?;
            obj.type_ref().is_subtype_of(&declared)
        }
        (None, _) => false,
    };
    if assignable {
        Ok(())
    } else {
        Err(access_error(
            descriptor,
            &format!(
                "value of type '{}' is not assignable to '{}'",
                value.type_name(),
                field.type_name
            ),
        ))
    }
}

fn access_error(descriptor: &FieldDescriptor, reason: &str) -> ReflectError {
    ReflectError::FieldAccess {
        declaring_type: descriptor.declaring_type_name().to_string(),
        field: descriptor.field_name().to_string(),
        reason: reason.to_string(),
    }
}
