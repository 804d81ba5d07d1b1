//! Type-resolution contexts
//!
//! A [`Context`] is a namespace from which type names resolve to loaded
//! [`Type`](crate::types::Type)s. Each context has:
//! - A unique id and a display name
//! - An optional parent it delegates to first (the bootstrap context when
//!   no parent is given)
//! - An optional [`TypeLibrary`] it defines types from when delegation
//!   finds nothing
//! - A cache of the types it has defined, so a name keeps resolving to the
//!   same type for the lifetime of the context
//!
//! Two sibling contexts loading from the same library resolve the same name
//! to two distinct, non-interchangeable types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::bootstrap;
use crate::error::{ReflectError, ReflectResult, ValidationError};
use crate::object::ObjectRef;
use crate::types::{DefKind, Type, TypeDef, TypeRef};
use crate::value::Value;

/// Unique identifier for a Context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Create a new unique context ID
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

/// A set of type definitions that contexts load from
#[derive(Debug, Clone, Default)]
pub struct TypeLibrary {
    name: String,
    definitions: FxHashMap<String, TypeDef>,
}

impl TypeLibrary {
    /// Create an empty library
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definitions: FxHashMap::default(),
        }
    }

    /// Add (or replace) a definition
    pub fn define(&mut self, def: TypeDef) {
        self.definitions.insert(def.name.clone(), def);
    }

    /// Builder form of [`TypeLibrary::define`]
    pub fn with(mut self, def: TypeDef) -> Self {
        self.define(def);
        self
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.definitions.get(name)
    }

    /// Library name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of all definitions
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if the library is empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

pub(crate) struct ContextInner {
    id: ContextId,
    name: String,
    parent: Option<Context>,
    library: Option<Arc<TypeLibrary>>,
    is_root: bool,
    types: RwLock<FxHashMap<String, TypeRef>>,
}

/// Handle to a type-resolution context
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Create a context delegating to `parent` (or to the bootstrap context)
    /// and defining missing types from `library`
    pub fn new(
        name: impl Into<String>,
        parent: Option<&Context>,
        library: Option<Arc<TypeLibrary>>,
    ) -> Self {
        let ctx = Self::build(name.into(), parent.cloned(), library, false);
        debug!(context = %ctx.name(), id = ctx.id().as_u64(), "created context");
        ctx
    }

    /// Create a bootstrap-delegating context over a library
    pub fn with_library(name: impl Into<String>, library: Arc<TypeLibrary>) -> Self {
        Self::new(name, None, Some(library))
    }

    /// The root context defining the built-in types
    pub fn bootstrap() -> Context {
        bootstrap::context()
    }

    pub(crate) fn root(name: &str) -> Self {
        Self::build(name.to_string(), None, None, true)
    }

    fn build(
        name: String,
        parent: Option<Context>,
        library: Option<Arc<TypeLibrary>>,
        is_root: bool,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: ContextId::new(),
                name,
                parent,
                library,
                is_root,
                types: RwLock::new(FxHashMap::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ContextInner> {
        Arc::downgrade(&self.inner)
    }

    /// Unique context id
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Explicit parent, if any
    pub fn parent(&self) -> Option<&Context> {
        self.inner.parent.as_ref()
    }

    /// Library this context defines types from
    pub fn library(&self) -> Option<&Arc<TypeLibrary>> {
        self.inner.library.as_ref()
    }

    /// Check if this is the bootstrap context
    pub fn is_bootstrap(&self) -> bool {
        self.inner.is_root
    }

    /// Resolve a fully-qualified type name (`Name`, primitive, or `Name[]`)
    pub fn resolve(&self, name: &str) -> ReflectResult<TypeRef> {
        if name.trim().is_empty() {
            return Err(ValidationError::new(0, "type_name", "must not be empty").into());
        }
        let mut in_progress = Vec::new();
        self.find(name, &mut in_progress)?
            .ok_or_else(|| self.not_found(name))
    }

    /// Resolve a type and construct an instance with its initializer
    pub fn construct(&self, name: &str, args: &[Value]) -> ReflectResult<ObjectRef> {
        self.resolve(name)?.construct(args)
    }

    /// Types defined by this context so far (including array types)
    pub fn loaded_types(&self) -> Vec<TypeRef> {
        let mut types: Vec<_> = self.inner.types.read().values().cloned().collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        types
    }

    /// Record a defined type; if a concurrent definition won, return that one
    pub(crate) fn insert(&self, ty: TypeRef) -> TypeRef {
        let mut types = self.inner.types.write();
        types.entry(ty.name().to_string()).or_insert(ty).clone()
    }

    /// The array type over `component`, defined in this context
    pub(crate) fn array_type_of(&self, component: &TypeRef) -> TypeRef {
        let name = format!("{}[]", component.name());
        if let Some(existing) = self.inner.types.read().get(&name) {
            return existing.clone();
        }
        let ty = Type::array(
            component,
            self,
            bootstrap::object_type(),
            vec![bootstrap::cloneable_type(), bootstrap::serializable_type()],
        );
        self.insert(ty)
    }

    fn delegate(&self) -> Option<Context> {
        match &self.inner.parent {
            Some(parent) => Some(parent.clone()),
            None if self.inner.is_root => None,
            None => Some(bootstrap::context()),
        }
    }

    fn find(&self, name: &str, in_progress: &mut Vec<String>) -> ReflectResult<Option<TypeRef>> {
        if let Some(component_name) = name.strip_suffix("[]") {
            let Some(component) = self.find(component_name, in_progress)? else {
                return Ok(None);
            };
            let owner = component.require_context()?;
            return Ok(Some(owner.array_type_of(&component)));
        }

        if let Some(ty) = self.inner.types.read().get(name) {
            return Ok(Some(ty.clone()));
        }
        if let Some(delegate) = self.delegate() {
            if let Some(ty) = delegate.find(name, in_progress)? {
                return Ok(Some(ty));
            }
        }
        match self.inner.library.as_ref().and_then(|lib| lib.get(name)) {
            Some(def) => self.define(def, in_progress).map(Some),
            None => Ok(None),
        }
    }

    fn define(&self, def: &TypeDef, in_progress: &mut Vec<String>) -> ReflectResult<TypeRef> {
        if in_progress.iter().any(|name| name == &def.name) {
            return Err(ReflectError::TypeResolution {
                name: def.name.clone(),
                context: self.name().to_string(),
                reason: format!(
                    "circular type hierarchy: {} -> {}",
                    in_progress.join(" -> "),
                    def.name
                ),
            });
        }
        in_progress.push(def.name.clone());
        let supertypes = self.resolve_supertypes(def, in_progress);
        in_progress.pop();
        let (superclass, interfaces) = supertypes?;

        let ty = self.insert(Type::define(def, self, superclass, interfaces));
        debug!(
            type_name = %ty.name(),
            context = %self.name(),
            type_id = ty.id().as_u64(),
            "defined type"
        );
        Ok(ty)
    }

    fn resolve_supertypes(
        &self,
        def: &TypeDef,
        in_progress: &mut Vec<String>,
    ) -> ReflectResult<(Option<TypeRef>, Vec<TypeRef>)> {
        let superclass = match def.kind {
            DefKind::Interface => None,
            DefKind::Class => {
                let name = def.superclass.as_deref().unwrap_or(bootstrap::OBJECT);
                let sup = self
                    .find(name, in_progress)?
                    .ok_or_else(|| self.not_found(name))?;
                if !matches!(sup.kind(), crate::types::TypeKind::Class) {
                    return Err(self.bad_supertype(def, name, "is not a class"));
                }
                Some(sup)
            }
        };

        let mut interfaces = Vec::with_capacity(def.interfaces.len());
        for name in &def.interfaces {
            let interface = self
                .find(name, in_progress)?
                .ok_or_else(|| self.not_found(name))?;
            if !interface.is_interface() {
                return Err(self.bad_supertype(def, name, "is not an interface"));
            }
            interfaces.push(interface);
        }
        Ok((superclass, interfaces))
    }

    fn not_found(&self, name: &str) -> ReflectError {
        ReflectError::TypeResolution {
            name: name.to_string(),
            context: self.name().to_string(),
            reason: "no such type".to_string(),
        }
    }

    fn bad_supertype(&self, def: &TypeDef, supertype: &str, problem: &str) -> ReflectError {
        ReflectError::TypeResolution {
            name: def.name.clone(),
            context: self.name().to_string(),
            reason: format!("supertype '{}' {}", supertype, problem),
        }
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context({}#{})", self.inner.name, self.inner.id.as_u64())
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.name)
    }
}
