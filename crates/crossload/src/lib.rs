//! Crossload
//!
//! Rebuilds object graphs so that every type they reference resolves in a
//! different type-resolution context, and invokes methods across contexts
//! by name.
//!
//! ```ignore
//! let crossload = Crossload::new(CrossloadConfig::from_file("crossload.toml")?)?;
//! let clone = crossload.wrap_object(original).clone_into(&target_context)?;
//!
//! let descriptor = InvocationDescriptor::from_parameters("describe", vec![clone])?;
//! let reply = crossload.wrap_object(service).invoke(&descriptor)?;
//! ```
//!
//! A [`Crossload`] holds the configured cloning strategy and hands out
//! [`ObjectHandle`]s and [`TypeHandle`]s. Building several with different
//! configurations is fine; nothing is global.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod config;
pub mod error;
pub mod handle;
pub mod invoke;

use std::sync::Arc;

use crossload_clone::CloningStrategy;
use crossload_core::{Context, TypeRef, Value};
use tracing::debug;

pub use adapter::{ForwardingAdapter, InterfaceShape, MethodShape};
pub use config::{CloningConfig, ConfigError, CrossloadConfig, FallbackConfig};
pub use error::{CrossloadError, CrossloadResult};
pub use handle::{ObjectHandle, TypeHandle};
pub use invoke::{InvocationDescriptor, InvocationEngine, InvocationError};

pub use crossload_clone::{
    CloneError, DecisionKind, FallbackScope, MarshalCloner, ReflectionCloner,
};
pub use crossload_core::{ObjectRef, ValidationError};

/// Entry point: a configured cloning strategy and the handles built on it
#[derive(Debug, Clone)]
pub struct Crossload {
    config: CrossloadConfig,
    cloner: Arc<dyn CloningStrategy>,
}

impl Crossload {
    /// Build from a configuration
    pub fn new(config: CrossloadConfig) -> CrossloadResult<Self> {
        config.validate()?;
        let cloner = Arc::new(config.build_cloner());
        debug!(
            policy = ?config.cloning.policy,
            fallback = config.cloning.fallback.enabled,
            "crossload configured"
        );
        Ok(Self { config, cloner })
    }

    /// Replace the cloning strategy used by handles created afterwards
    pub fn with_cloner(mut self, cloner: Arc<dyn CloningStrategy>) -> Self {
        self.cloner = cloner;
        self
    }

    /// The configuration this instance was built from
    pub fn config(&self) -> &CrossloadConfig {
        &self.config
    }

    /// The cloning strategy
    pub fn cloner(&self) -> &Arc<dyn CloningStrategy> {
        &self.cloner
    }

    /// Wrap a value (possibly `Null`)
    pub fn wrap_object(&self, value: impl Into<Value>) -> ObjectHandle {
        ObjectHandle::new(value.into(), self.cloner.clone())
    }

    /// Wrap a type (possibly absent)
    pub fn wrap_type(&self, ty: Option<TypeRef>) -> TypeHandle {
        TypeHandle::new(ty)
    }
}

impl Default for Crossload {
    fn default() -> Self {
        let config = CrossloadConfig::default();
        let cloner = Arc::new(config.build_cloner());
        Self { config, cloner }
    }
}

/// Resolve a fully-qualified type name in `context`
pub fn resolve_type(name: &str, context: &Context) -> CrossloadResult<TypeRef> {
    crossload_core::resolve_type(name, context)
        .map_err(|err| CrossloadError::type_resolution(name, err))
}

/// Resolve several type names in order, failing on the first miss
pub fn resolve_types<S: AsRef<str>>(names: &[S], context: &Context) -> CrossloadResult<Vec<TypeRef>> {
    crossload_core::resolve_types(names, context)
        .map_err(|err| CrossloadError::type_resolution("", err))
}
