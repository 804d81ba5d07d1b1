//! Name-based type membership
//!
//! Assignability is decided by *name* over the closure of a type: the type
//! itself, every superclass, and every directly or transitively implemented
//! interface. The candidate name may not resolve at all in the caller's
//! context, only in the value's.

use rustc_hash::FxHashSet;

use crate::types::{TypeId, TypeRef};

/// Superclass chain, nearest first (the type itself excluded)
pub fn all_superclasses(ty: &TypeRef) -> Vec<TypeRef> {
    ty.hierarchy().skip(1).collect()
}

/// Every interface implemented by the type, its superclasses, and their
/// super-interfaces, each listed once
pub fn all_interfaces(ty: &TypeRef) -> Vec<TypeRef> {
    let mut seen: FxHashSet<TypeId> = FxHashSet::default();
    let mut interfaces = Vec::new();
    let mut pending: Vec<TypeRef> = ty
        .hierarchy()
        .flat_map(|t| t.interfaces().to_vec())
        .collect();
    pending.reverse();

    while let Some(interface) = pending.pop() {
        if !seen.insert(interface.id()) {
            continue;
        }
        pending.extend(interface.interfaces().iter().rev().cloned());
        interfaces.push(interface);
    }
    interfaces
}

/// Names of the type, its superclasses and all its interfaces
pub fn all_type_names(ty: &TypeRef) -> FxHashSet<String> {
    ty.hierarchy()
        .chain(all_interfaces(ty))
        .map(|t| t.name().to_string())
        .collect()
}

/// Whether `ty` is assignable to the type named `type_name`
pub fn is_assignable_to(ty: &TypeRef, type_name: &str) -> bool {
    ty.hierarchy().any(|t| t.name() == type_name)
        || all_interfaces(ty).iter().any(|t| t.name() == type_name)
}
