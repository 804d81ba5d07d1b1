//! Crossload core
//!
//! A managed object model with per-context type identity, and the reflection
//! primitives the cloning engine is built on.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  parent-first  ┌───────────────┐
//! │ Context "a"   │ ─────────────▶ │   bootstrap   │  lang.Object, lang.String,
//! │ TypeLibrary   │                │   context     │  boxes, big numerics, list
//! └───────┬───────┘                └───────────────┘
//!         │ resolve("app.Point")
//!         ▼
//! ┌───────────────┐   instance of  ┌───────────────┐
//! │ Type          │ ◀───────────── │ Object        │  fields / elements /
//! │ (id, layout)  │                │ (id, state)   │  native payload
//! └───────────────┘                └───────────────┘
//! ```
//!
//! Loading the same [`TypeDef`] through two contexts yields two distinct
//! [`Type`]s; built-in types are defined once by the bootstrap context and
//! shared by every context that delegates to it.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bootstrap;
pub mod context;
pub mod error;
pub mod object;
pub mod reflect;
pub mod types;
pub mod value;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use context::{Context, ContextId, TypeLibrary};
pub use error::{MethodError, ReflectError, ReflectResult, ValidationError};
pub use object::{NativeValue, Object, ObjectId, ObjectRef};
pub use reflect::{
    all_interfaces, all_superclasses, all_type_names, is_assignable_to, resolve_type,
    resolve_types, BypassInstantiator, FieldDescriptor, FieldIntrospector, InstantiationPolicy,
};
pub use types::{
    DefKind, FieldDef, FieldSlot, Initializer, MethodDef, Modifiers, NativeKind, NativeMethod,
    PrimitiveKind, Type, TypeDef, TypeFlags, TypeId, TypeKind, TypeRef,
};
pub use value::Value;
