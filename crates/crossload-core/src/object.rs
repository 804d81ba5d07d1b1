//! Object model
//!
//! Heap objects carry a unique [`ObjectId`], the loaded type they are an
//! instance of, and one of three states:
//! - field slots for ordinary objects (layout taken from the type)
//! - elements for arrays
//! - a native payload for the built-in value types
//!
//! [`ObjectRef`] equality is object identity. State lives behind a
//! `parking_lot::RwLock`; values are always cloned out before use so no lock
//! is held while a graph is being walked.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bootstrap;
use crate::error::{ReflectError, ReflectResult};
use crate::types::{NativeKind, TypeRef};
use crate::value::Value;

/// Global counter for generating unique object IDs
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a heap object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Payload of a built-in value object
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// `lang.String`
    Text(Arc<str>),
    /// Primitive box
    Boxed(Value),
    /// `math.BigInteger`, canonical decimal digits
    BigInteger(String),
    /// `math.BigDecimal`, canonical decimal text
    BigDecimal(String),
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Text(text) => write!(f, "{}", text),
            NativeValue::Boxed(value) => write!(f, "{}", value),
            NativeValue::BigInteger(digits) | NativeValue::BigDecimal(digits) => {
                write!(f, "{}", digits)
            }
        }
    }
}

#[derive(Debug)]
enum ObjectState {
    Fields(Vec<Value>),
    Elements(Vec<Value>),
    Native(NativeValue),
}

/// Heap object instance
pub struct Object {
    id: ObjectId,
    ty: TypeRef,
    state: RwLock<ObjectState>,
}

/// Shared handle to a heap object; equality is identity
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    fn with_state(ty: TypeRef, state: ObjectState) -> Self {
        ObjectRef(Arc::new(Object {
            id: ObjectId::next(),
            ty,
            state: RwLock::new(state),
        }))
    }

    /// Allocate an instance with default slot values, running nothing
    pub(crate) fn allocate(ty: &TypeRef) -> ReflectResult<Self> {
        if let Some(reason) = ty.instantiation_refusal() {
            return Err(ReflectError::Instantiation {
                type_name: ty.name().to_string(),
                reason: reason.to_string(),
            });
        }
        let slots = ty
            .layout()
            .iter()
            .map(|slot| Value::default_for(slot.primitive))
            .collect();
        Ok(Self::with_state(ty.clone(), ObjectState::Fields(slots)))
    }

    /// Allocate an array of `length` default elements over `component`
    pub fn new_array(component: &TypeRef, length: usize) -> ReflectResult<Self> {
        let array_type = component.array_type()?;
        let elements = vec![Value::default_for(component.primitive_kind()); length];
        Ok(Self::with_state(array_type, ObjectState::Elements(elements)))
    }

    /// Allocate an array holding `elements` (each checked against `component`)
    pub fn array_of(component: &TypeRef, elements: Vec<Value>) -> ReflectResult<Self> {
        let array = Self::new_array(component, elements.len())?;
        for (index, element) in elements.into_iter().enumerate() {
            array.set_element(index, element)?;
        }
        Ok(array)
    }

    /// Allocate a `lang.String`
    pub fn text(text: &str) -> Self {
        Self::native(NativeKind::Text, NativeValue::Text(Arc::from(text)))
    }

    /// Box a primitive value
    pub fn boxed(value: Value) -> ReflectResult<Self> {
        let kind = value.primitive_kind().ok_or_else(|| ReflectError::Instantiation {
            type_name: value.type_name(),
            reason: "only primitive values can be boxed".to_string(),
        })?;
        Ok(Self::native(NativeKind::Boxed(kind), NativeValue::Boxed(value)))
    }

    /// Allocate a `math.BigInteger` from decimal digits with an optional sign
    pub fn big_integer(digits: &str) -> ReflectResult<Self> {
        let canonical = canonical_integer(digits).ok_or_else(|| ReflectError::Instantiation {
            type_name: bootstrap::BIG_INTEGER.to_string(),
            reason: format!("'{}' is not an integer", digits),
        })?;
        Ok(Self::native(
            NativeKind::BigInteger,
            NativeValue::BigInteger(canonical),
        ))
    }

    /// Allocate a `math.BigDecimal` from decimal text with an optional sign
    pub fn big_decimal(text: &str) -> ReflectResult<Self> {
        let canonical = canonical_decimal(text).ok_or_else(|| ReflectError::Instantiation {
            type_name: bootstrap::BIG_DECIMAL.to_string(),
            reason: format!("'{}' is not a decimal number", text),
        })?;
        Ok(Self::native(
            NativeKind::BigDecimal,
            NativeValue::BigDecimal(canonical),
        ))
    }

    /// Allocate a built-in value object from its payload
    pub fn from_native(payload: NativeValue) -> ReflectResult<Self> {
        match payload {
            NativeValue::Text(text) => Ok(Self::native(NativeKind::Text, NativeValue::Text(text))),
            NativeValue::Boxed(value) => Self::boxed(value),
            NativeValue::BigInteger(digits) => Self::big_integer(&digits),
            NativeValue::BigDecimal(text) => Self::big_decimal(&text),
        }
    }

    fn native(kind: NativeKind, payload: NativeValue) -> Self {
        Self::with_state(bootstrap::native_type(kind), ObjectState::Native(payload))
    }

    /// Object identity
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// The loaded type this object is an instance of
    pub fn type_ref(&self) -> &TypeRef {
        &self.0.ty
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Check if this object is an array
    pub fn is_array(&self) -> bool {
        matches!(*self.0.state.read(), ObjectState::Elements(_))
    }

    /// Array length, `None` for non-arrays
    pub fn length(&self) -> Option<usize> {
        match &*self.0.state.read() {
            ObjectState::Elements(elements) => Some(elements.len()),
            _ => None,
        }
    }

    /// Snapshot of the array elements
    pub fn elements(&self) -> Option<Vec<Value>> {
        match &*self.0.state.read() {
            ObjectState::Elements(elements) => Some(elements.clone()),
            _ => None,
        }
    }

    /// Read an array element
    pub fn element(&self, index: usize) -> ReflectResult<Value> {
        match &*self.0.state.read() {
            ObjectState::Elements(elements) => {
                elements.get(index).cloned().ok_or_else(|| {
                    self.element_error(index, format!("length is {}", elements.len()))
                })
            }
            _ => Err(self.element_error(index, "not an array".to_string())),
        }
    }

    /// Write an array element, checking it against the component type
    pub fn set_element(&self, index: usize, value: Value) -> ReflectResult<()> {
        let component = self
            .type_ref()
            .component_type()
            .cloned()
            .ok_or_else(|| self.element_error(index, "not an array".to_string()))?;
        let compatible = match (component.primitive_kind(), &value) {
            (Some(kind), value) => value.primitive_kind() == Some(kind),
            (None, Value::Null) => true,
            (None, Value::Ref(obj)) => obj.type_ref().is_subtype_of(&component),
            (None, _) => false,
        };
        if !compatible {
            return Err(self.element_error(
                index,
                format!("'{}' is not assignable to '{}'", value.type_name(), component.name()),
            ));
        }

        let mut state = self.0.state.write();
        match &mut *state {
            ObjectState::Elements(elements) => {
                let length = elements.len();
                let slot = elements
                    .get_mut(index)
                    .ok_or_else(|| self.element_error(index, format!("length is {}", length)))?;
                *slot = value;
                Ok(())
            }
            _ => Err(self.element_error(index, "not an array".to_string())),
        }
    }

    fn element_error(&self, index: usize, reason: String) -> ReflectError {
        ReflectError::ElementAccess {
            array_type: self.type_ref().name().to_string(),
            index,
            reason,
        }
    }

    /// Native payload of a built-in value object
    pub fn native_value(&self) -> Option<NativeValue> {
        match &*self.0.state.read() {
            ObjectState::Native(payload) => Some(payload.clone()),
            _ => None,
        }
    }

    /// Text of a `lang.String`
    pub fn text_value(&self) -> Option<String> {
        match &*self.0.state.read() {
            ObjectState::Native(NativeValue::Text(text)) => Some(text.to_string()),
            _ => None,
        }
    }

    /// Primitive held by a box
    pub fn boxed_value(&self) -> Option<Value> {
        match &*self.0.state.read() {
            ObjectState::Native(NativeValue::Boxed(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Read the most-derived field named `name` (language-level access)
    pub fn get_field(&self, name: &str) -> ReflectResult<Value> {
        let index = self.field_index(name)?;
        self.slot(index).ok_or_else(|| self.missing_field(name))
    }

    /// Write the most-derived field named `name` (language-level access)
    pub fn set_field(&self, name: &str, value: Value) -> ReflectResult<()> {
        let index = self.field_index(name)?;
        let expected = self.type_ref().layout()[index].primitive;
        if let (Some(kind), Some(actual)) = (expected, value.primitive_kind()) {
            if kind != actual {
                return Err(ReflectError::FieldAccess {
                    declaring_type: self.type_ref().name().to_string(),
                    field: name.to_string(),
                    reason: format!("cannot store {} in a {} field", actual.name(), kind.name()),
                });
            }
        }
        self.set_slot(index, value);
        Ok(())
    }

    fn field_index(&self, name: &str) -> ReflectResult<usize> {
        self.type_ref()
            .layout()
            .iter()
            .rposition(|slot| slot.name == name)
            .ok_or_else(|| self.missing_field(name))
    }

    fn missing_field(&self, name: &str) -> ReflectError {
        ReflectError::MissingField {
            declaring_type: self.type_ref().name().to_string(),
            field: name.to_string(),
        }
    }

    /// Read a slot by layout index, ignoring field modifiers
    pub fn slot(&self, index: usize) -> Option<Value> {
        match &*self.0.state.read() {
            ObjectState::Fields(slots) => slots.get(index).cloned(),
            _ => None,
        }
    }

    /// Write a slot by layout index, ignoring field modifiers. Returns
    /// `false` if the object has no such slot.
    ///
    /// This is the transport-level access used to rebuild objects; it does
    /// not check the value against the declared field type.
    pub fn set_slot(&self, index: usize, value: Value) -> bool {
        match &mut *self.0.state.write() {
            ObjectState::Fields(slots) => match slots.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

fn canonical_integer(text: &str) -> Option<String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    Some(match (negative, trimmed.is_empty()) {
        (_, true) => "0".to_string(),
        (true, false) => format!("-{}", trimmed),
        (false, false) => trimmed.to_string(),
    })
}

fn canonical_decimal(text: &str) -> Option<String> {
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text, None),
    };
    let integer = match integer {
        "" | "-" | "+" if fraction.is_some() => format!("{}0", integer.trim_start_matches('+')),
        other => other.to_string(),
    };
    let integer = canonical_integer(&integer)?;
    match fraction {
        None => Some(integer),
        Some(fraction) if !fraction.is_empty() && fraction.bytes().all(|b| b.is_ascii_digit()) => {
            let negative_zero = text.starts_with('-') && integer == "0";
            let sign = if negative_zero { "-" } else { "" };
            Some(format!("{}{}.{}", sign, integer, fraction))
        }
        Some(_) => None,
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ObjectRef({}#{}@{})",
            self.0.ty.name(),
            self.0.id.as_u64(),
            self.0.ty.context_name()
        )
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.state.read() {
            ObjectState::Native(payload) => write!(f, "{}", payload),
            ObjectState::Elements(elements) => {
                let component = self
                    .0
                    .ty
                    .component_type()
                    .map(|c| c.name().to_string())
                    .unwrap_or_default();
                write!(f, "{}[{}]@{:x}", component, elements.len(), self.0.id.as_u64())
            }
            ObjectState::Fields(_) => write!(f, "{}@{:x}", self.0.ty.name(), self.0.id.as_u64()),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("type", &self.ty)
            .finish_non_exhaustive()
    }
}
