//! Type definitions and loaded types
//!
//! A [`TypeDef`] is the blueprint of a type as it sits in a
//! [`TypeLibrary`](crate::context::TypeLibrary). Loading a definition through a
//! [`Context`] produces a [`Type`]: the superclass and interfaces are resolved
//! in that context, the instance slot layout is computed over the whole
//! hierarchy, and the type gets an identity of its own. Loading the same
//! definition through two contexts yields two distinct types with the same
//! name.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::context::{Context, ContextId, ContextInner};
use crate::error::{MethodError, ReflectError};
use crate::object::ObjectRef;
use crate::value::Value;

/// The eight primitive value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean`
    Boolean,
    /// `char`
    Char,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl PrimitiveKind {
    /// Every primitive kind
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Char,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Type name of the primitive
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Parse a primitive type name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(PrimitiveKind::Boolean),
            "char" => Some(PrimitiveKind::Char),
            "byte" => Some(PrimitiveKind::Byte),
            "short" => Some(PrimitiveKind::Short),
            "int" => Some(PrimitiveKind::Int),
            "long" => Some(PrimitiveKind::Long),
            "float" => Some(PrimitiveKind::Float),
            "double" => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// Name of the built-in box type for this primitive
    pub fn box_type_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => crate::bootstrap::BOOLEAN,
            PrimitiveKind::Char => crate::bootstrap::CHARACTER,
            PrimitiveKind::Byte => crate::bootstrap::BYTE,
            PrimitiveKind::Short => crate::bootstrap::SHORT,
            PrimitiveKind::Int => crate::bootstrap::INTEGER,
            PrimitiveKind::Long => crate::bootstrap::LONG,
            PrimitiveKind::Float => crate::bootstrap::FLOAT,
            PrimitiveKind::Double => crate::bootstrap::DOUBLE,
        }
    }
}

/// Modifier flags for fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Class-level field, not part of any instance
    pub is_static: bool,
    /// Only reachable through reflection with access checks bypassed
    pub is_private: bool,
    /// Assigned once by the initializer
    pub is_final: bool,
    /// Skipped by the marshalling transport
    pub is_transient: bool,
}

/// A field as declared by a type definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Declared type name (primitive name, type name, or `Name[]`)
    pub type_name: String,
    /// Modifiers
    pub modifiers: Modifiers,
}

impl FieldDef {
    /// Declare a field with default modifiers
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            modifiers: Modifiers::default(),
        }
    }

    /// Mark the field private
    pub fn private(mut self) -> Self {
        self.modifiers.is_private = true;
        self
    }

    /// Mark the field static
    pub fn as_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    /// Mark the field final
    pub fn as_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    /// Mark the field transient
    pub fn transient(mut self) -> Self {
        self.modifiers.is_transient = true;
        self
    }

    /// Primitive kind of the declared type, `None` for references
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        PrimitiveKind::from_name(&self.type_name)
    }

    /// Whether the declared type is primitive
    pub fn is_primitive(&self) -> bool {
        self.primitive_kind().is_some()
    }
}

/// Native method body: receives the receiver and the arguments
pub type NativeMethod =
    Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<Value, MethodError> + Send + Sync>;

/// Initializer body, run by ordinary construction only
pub type Initializer = Arc<dyn Fn(&ObjectRef, &[Value]) -> Result<(), MethodError> + Send + Sync>;

/// A method as declared by a type definition
#[derive(Clone)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Declared parameter type names
    pub parameter_types: Vec<String>,
    /// Declared return type name (`void` for none)
    pub return_type: String,
    /// Native body
    pub body: NativeMethod,
}

impl MethodDef {
    /// Declare a method
    pub fn new<F>(name: impl Into<String>, parameter_types: &[&str], return_type: &str, body: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parameter_types: parameter_types.iter().map(|t| t.to_string()).collect(),
            return_type: return_type.to_string(),
            body: Arc::new(body),
        }
    }

    /// `name(type, type)` rendering used in diagnostics
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameter_types.join(", "))
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("parameter_types", &self.parameter_types)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// Kind of a type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    /// Instantiable (unless abstract) class with a superclass
    Class,
    /// Interface-like type: no instances, no superclass
    Interface,
}

/// Type-level flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeFlags {
    /// Cannot be instantiated
    pub is_abstract: bool,
    /// Private fields refuse reflective access even with checks bypassed
    pub is_sealed: bool,
}

/// Payload kinds of the built-in value types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    /// `lang.String`
    Text,
    /// Primitive box (`lang.Integer` etc.)
    Boxed(PrimitiveKind),
    /// `math.BigInteger`
    BigInteger,
    /// `math.BigDecimal`
    BigDecimal,
}

/// Blueprint of a type, as stored in a type library
#[derive(Clone)]
pub struct TypeDef {
    /// Fully-qualified name
    pub name: String,
    /// Class or interface
    pub kind: DefKind,
    /// Superclass name; classes default to `lang.Object`
    pub superclass: Option<String>,
    /// Directly implemented (or, for interfaces, extended) interface names
    pub interfaces: Vec<String>,
    /// Declared fields
    pub fields: Vec<FieldDef>,
    /// Declared methods
    pub methods: Vec<MethodDef>,
    /// Initializer run by ordinary construction
    pub initializer: Option<Initializer>,
    /// Flags
    pub flags: TypeFlags,
    pub(crate) native: Option<NativeKind>,
}

impl TypeDef {
    fn with_kind(name: impl Into<String>, kind: DefKind) -> Self {
        Self {
            name: name.into(),
            kind,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            initializer: None,
            flags: TypeFlags::default(),
            native: None,
        }
    }

    /// Start a class definition
    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name, DefKind::Class)
    }

    /// Start an interface definition
    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(name, DefKind::Interface)
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Set the initializer
    pub fn initializer<F>(mut self, init: F) -> Self
    where
        F: Fn(&ObjectRef, &[Value]) -> Result<(), MethodError> + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(init));
        self
    }

    /// Mark the type abstract
    pub fn abstract_type(mut self) -> Self {
        self.flags.is_abstract = true;
        self
    }

    /// Seal private fields against reflective access
    pub fn sealed(mut self) -> Self {
        self.flags.is_sealed = true;
        self
    }

    pub(crate) fn native(mut self, kind: NativeKind) -> Self {
        self.native = Some(kind);
        self
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("fields", &self.fields)
            .field("methods", &self.methods)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Unique identifier of a loaded type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u64);

impl TypeId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        TypeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Kind of a loaded type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Class type
    Class,
    /// Interface type
    Interface,
    /// Primitive type
    Primitive(PrimitiveKind),
    /// Array type with its component type
    Array(TypeRef),
}

/// One instance field slot in an object's layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSlot {
    /// Identity of the declaring type
    pub declaring_type: TypeId,
    /// Name of the declaring type
    pub declaring_type_name: String,
    /// Field name
    pub name: String,
    /// Declared type name
    pub type_name: String,
    /// Primitive kind, `None` for references
    pub primitive: Option<PrimitiveKind>,
    /// Skipped by the marshalling transport
    pub transient: bool,
}

/// A type loaded by one context
pub struct Type {
    id: TypeId,
    name: String,
    kind: TypeKind,
    context: Weak<ContextInner>,
    context_id: ContextId,
    context_name: String,
    superclass: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    initializer: Option<Initializer>,
    flags: TypeFlags,
    native: Option<NativeKind>,
    layout: Vec<FieldSlot>,
    statics: RwLock<Vec<Value>>,
}

impl Type {
    pub(crate) fn define(
        def: &TypeDef,
        owner: &Context,
        superclass: Option<TypeRef>,
        interfaces: Vec<TypeRef>,
    ) -> TypeRef {
        let id = TypeId::next();
        let mut layout = superclass
            .as_ref()
            .map(|sup| sup.layout.clone())
            .unwrap_or_default();
        layout.extend(
            def.fields
                .iter()
                .filter(|field| !field.modifiers.is_static)
                .map(|field| FieldSlot {
                    declaring_type: id,
                    declaring_type_name: def.name.clone(),
                    name: field.name.clone(),
                    type_name: field.type_name.clone(),
                    primitive: field.primitive_kind(),
                    transient: field.modifiers.is_transient,
                }),
        );
        let statics = def
            .fields
            .iter()
            .filter(|field| field.modifiers.is_static)
            .map(|field| Value::default_for(field.primitive_kind()))
            .collect();

        TypeRef(Arc::new(Type {
            id,
            name: def.name.clone(),
            kind: match def.kind {
                DefKind::Class => TypeKind::Class,
                DefKind::Interface => TypeKind::Interface,
            },
            context: owner.downgrade(),
            context_id: owner.id(),
            context_name: owner.name().to_string(),
            superclass,
            interfaces,
            fields: def.fields.clone(),
            methods: def.methods.clone(),
            initializer: def.initializer.clone(),
            flags: def.flags,
            native: def.native,
            layout,
            statics: RwLock::new(statics),
        }))
    }

    pub(crate) fn primitive(kind: PrimitiveKind, owner: &Context) -> TypeRef {
        TypeRef(Arc::new(Type {
            id: TypeId::next(),
            name: kind.name().to_string(),
            kind: TypeKind::Primitive(kind),
            context: owner.downgrade(),
            context_id: owner.id(),
            context_name: owner.name().to_string(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            initializer: None,
            flags: TypeFlags::default(),
            native: None,
            layout: Vec::new(),
            statics: RwLock::new(Vec::new()),
        }))
    }

    pub(crate) fn array(
        component: &TypeRef,
        owner: &Context,
        superclass: TypeRef,
        interfaces: Vec<TypeRef>,
    ) -> TypeRef {
        TypeRef(Arc::new(Type {
            id: TypeId::next(),
            name: format!("{}[]", component.name()),
            kind: TypeKind::Array(component.clone()),
            context: owner.downgrade(),
            context_id: owner.id(),
            context_name: owner.name().to_string(),
            superclass: Some(superclass),
            interfaces,
            fields: Vec::new(),
            methods: Vec::new(),
            initializer: None,
            flags: TypeFlags::default(),
            native: None,
            layout: Vec::new(),
            statics: RwLock::new(Vec::new()),
        }))
    }

    /// Unique identity
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the type
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Check if this is an array type
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    /// Check if this is an interface
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    /// Primitive kind, if this is a primitive type
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Component type of an array type
    pub fn component_type(&self) -> Option<&TypeRef> {
        match &self.kind {
            TypeKind::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Direct superclass
    pub fn superclass(&self) -> Option<&TypeRef> {
        self.superclass.as_ref()
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }

    /// Fields declared by this type (not inherited ones)
    pub fn declared_fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field declared by this type
    pub fn declared_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Methods declared by this type
    pub fn declared_methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// Initializer run by ordinary construction
    pub fn initializer(&self) -> Option<&Initializer> {
        self.initializer.as_ref()
    }

    /// Type flags
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    /// Payload kind of built-in value types
    pub fn native_kind(&self) -> Option<NativeKind> {
        self.native
    }

    /// Instance slots across the whole hierarchy, ancestors first
    pub fn layout(&self) -> &[FieldSlot] {
        &self.layout
    }

    /// Slot index of the field `name` declared by `declaring`
    pub fn slot_index(&self, declaring: TypeId, name: &str) -> Option<usize> {
        self.layout
            .iter()
            .position(|slot| slot.declaring_type == declaring && slot.name == name)
    }

    /// The context that defined this type, if it is still alive
    pub fn context(&self) -> Option<Context> {
        self.context.upgrade().map(Context::from_inner)
    }

    /// Identity of the defining context
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// Name of the defining context
    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    /// The defining context, or a resolution error naming this type
    pub fn require_context(&self) -> Result<Context, ReflectError> {
        self.context().ok_or_else(|| ReflectError::TypeResolution {
            name: self.name.clone(),
            context: self.context_name.clone(),
            reason: "defining context has been dropped".to_string(),
        })
    }

    /// Why bypassed construction is refused for this type, if it is
    pub fn instantiation_refusal(&self) -> Option<&'static str> {
        match self.kind {
            TypeKind::Interface => Some("type is an interface"),
            TypeKind::Primitive(_) => Some("type is primitive"),
            TypeKind::Array(_) => Some("array types are created with a length, not instantiated"),
            TypeKind::Class if self.flags.is_abstract => Some("type is abstract"),
            TypeKind::Class if self.native.is_some() => {
                Some("built-in value types cannot be constructed without their payload")
            }
            TypeKind::Class => None,
        }
    }

    /// Identity-based subtype check (the type itself, superclasses,
    /// interfaces, and array covariance over reference components)
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        if self.id == other.id {
            return true;
        }
        if let (TypeKind::Array(mine), TypeKind::Array(theirs)) = (&self.kind, &other.kind) {
            if mine.primitive_kind().is_none() && theirs.primitive_kind().is_none() {
                return mine.is_subtype_of(theirs);
            }
        }
        if self
            .interfaces
            .iter()
            .any(|interface| interface.is_subtype_of(other))
        {
            return true;
        }
        self.superclass
            .as_ref()
            .map_or(false, |sup| sup.is_subtype_of(other))
    }

    /// Read a static field
    pub fn static_value(&self, name: &str) -> Option<Value> {
        let index = self.static_index(name)?;
        self.statics.read().get(index).cloned()
    }

    /// Write a static field
    pub fn set_static_value(&self, name: &str, value: Value) -> Result<(), ReflectError> {
        let index = self.static_index(name).ok_or_else(|| ReflectError::MissingField {
            declaring_type: self.name.clone(),
            field: name.to_string(),
        })?;
        if let Some(slot) = self.statics.write().get_mut(index) {
            *slot = value;
        }
        Ok(())
    }

    fn static_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .filter(|field| field.modifiers.is_static)
            .position(|field| field.name == name)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("context", &self.context_name)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a loaded type; equality is type identity
#[derive(Clone)]
pub struct TypeRef(Arc<Type>);

impl TypeRef {
    /// This type followed by its superclass chain
    pub fn hierarchy(&self) -> impl Iterator<Item = TypeRef> {
        std::iter::successors(Some(self.clone()), |ty| ty.superclass().cloned())
    }

    /// The array type whose component is this type
    pub fn array_type(&self) -> Result<TypeRef, ReflectError> {
        let owner = self.require_context()?;
        Ok(owner.array_type_of(self))
    }

    /// Ordinary construction: allocate, then run the initializer
    pub fn construct(&self, args: &[Value]) -> Result<ObjectRef, ReflectError> {
        let obj = ObjectRef::allocate(self)?;
        match self.initializer() {
            Some(init) => init(&obj, args).map_err(|source| ReflectError::Construction {
                type_name: self.name().to_string(),
                source,
            })?,
            None if !args.is_empty() => {
                return Err(ReflectError::Construction {
                    type_name: self.name().to_string(),
                    source: MethodError::new(format!(
                        "no initializer accepts {} argument(s)",
                        args.len()
                    )),
                })
            }
            None => {}
        }
        Ok(obj)
    }
}

impl Deref for TypeRef {
    type Target = Type;

    fn deref(&self) -> &Type {
        &self.0
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({}@{})", self.0.name, self.0.context_name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}
