//! Runtime values
//!
//! A [`Value`] is either absent (`Null`), one of the eight primitive kinds, or
//! a reference to a heap [`Object`](crate::object::Object). Primitive values
//! are copied by value; references compare by identity.

use std::fmt;

use crate::object::ObjectRef;
use crate::types::PrimitiveKind;

/// A runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent reference
    #[default]
    Null,
    /// `boolean`
    Bool(bool),
    /// `char`
    Char(char),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// Reference to a heap object
    Ref(ObjectRef),
}

impl Value {
    /// Wrap an object reference
    pub fn object(obj: ObjectRef) -> Self {
        Value::Ref(obj)
    }

    /// Allocate a `lang.String` holding the given text
    pub fn text(text: impl AsRef<str>) -> Self {
        Value::Ref(ObjectRef::text(text.as_ref()))
    }

    /// Check if this value is absent
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a primitive (neither `Null` nor a reference)
    pub fn is_primitive(&self) -> bool {
        self.primitive_kind().is_some()
    }

    /// Get the primitive kind of this value, if it is one
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::Bool(_) => Some(PrimitiveKind::Boolean),
            Value::Char(_) => Some(PrimitiveKind::Char),
            Value::Byte(_) => Some(PrimitiveKind::Byte),
            Value::Short(_) => Some(PrimitiveKind::Short),
            Value::Int(_) => Some(PrimitiveKind::Int),
            Value::Long(_) => Some(PrimitiveKind::Long),
            Value::Float(_) => Some(PrimitiveKind::Float),
            Value::Double(_) => Some(PrimitiveKind::Double),
            Value::Null | Value::Ref(_) => None,
        }
    }

    /// Get the referenced object, if any
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Ref(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i32
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Get as f64
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Get the text of a `lang.String` reference
    pub fn as_text(&self) -> Option<String> {
        self.as_object().and_then(|obj| obj.text_value())
    }

    /// Identity comparison: references must point at the very same object,
    /// primitives must be bitwise equal.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    /// Default slot value for a field of the given kind (`None` = reference)
    pub fn default_for(kind: Option<PrimitiveKind>) -> Value {
        match kind {
            None => Value::Null,
            Some(PrimitiveKind::Boolean) => Value::Bool(false),
            Some(PrimitiveKind::Char) => Value::Char('\0'),
            Some(PrimitiveKind::Byte) => Value::Byte(0),
            Some(PrimitiveKind::Short) => Value::Short(0),
            Some(PrimitiveKind::Int) => Value::Int(0),
            Some(PrimitiveKind::Long) => Value::Long(0),
            Some(PrimitiveKind::Float) => Value::Float(0.0),
            Some(PrimitiveKind::Double) => Value::Double(0.0),
        }
    }

    /// Name of the value's runtime type
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Ref(obj) => obj.type_ref().name().to_string(),
            other => other
                .primitive_kind()
                .map(|kind| kind.name().to_string())
                .unwrap_or_default(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Byte(b) => write!(f, "{}", b),
            Value::Short(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Double(d) => write!(f, "{}", d),
            Value::Ref(obj) => write!(f, "{}", obj),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Ref(obj)
    }
}

impl From<Option<ObjectRef>> for Value {
    fn from(obj: Option<ObjectRef>) -> Self {
        obj.map(Value::Ref).unwrap_or(Value::Null)
    }
}
