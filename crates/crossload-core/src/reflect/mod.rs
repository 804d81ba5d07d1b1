//! Reflection primitives
//!
//! The capability surface the cloning engine and the invocation engine are
//! built on:
//!
//! | Module          | Capability                                          |
//! |-----------------|-----------------------------------------------------|
//! | `resolver`      | Resolve type names against a context                |
//! | `fields`        | Enumerate, read and write instance fields by name   |
//! | `instantiate`   | Create instances without running initializers       |
//! | `membership`    | Name-based assignability over the type closure      |
//!
//! Every operation here addresses types *by name*, so a descriptor taken from
//! an object loaded by one context can be applied to its structural peer
//! loaded by another.

pub mod fields;
pub mod instantiate;
pub mod membership;
pub mod resolver;

pub use fields::{FieldDescriptor, FieldIntrospector};
pub use instantiate::{BypassInstantiator, InstantiationPolicy};
pub use membership::{all_interfaces, all_superclasses, all_type_names, is_assignable_to};
pub use resolver::{resolve_type, resolve_types};
