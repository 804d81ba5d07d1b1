//! Forwarding adapters
//!
//! An [`InterfaceShape`] lists method signatures by name and parameter type
//! names. A [`ForwardingAdapter`] turns calls against the shape into
//! described invocations on a wrapped object, whatever its actual type.
//! Typed access is a hand-written trait impl over the adapter:
//!
//! ```ignore
//! trait Greeting {
//!     fn greet(&self, who: &str) -> CrossloadResult<String>;
//! }
//!
//! impl Greeting for ForwardingAdapter {
//!     fn greet(&self, who: &str) -> CrossloadResult<String> {
//!         let reply = self.call("greet", vec![Value::text(who)])?;
//!         Ok(reply.as_text().unwrap_or_default())
//!     }
//! }
//! ```

use crossload_core::Value;

use crate::error::{CrossloadError, CrossloadResult};
use crate::handle::ObjectHandle;
use crate::invoke::{InvocationDescriptor, InvocationError};

/// One method of a shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodShape {
    /// Method name
    pub name: String,
    /// Declared parameter type names
    pub parameter_types: Vec<String>,
}

/// A named set of method signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceShape {
    name: String,
    methods: Vec<MethodShape>,
}

impl InterfaceShape {
    /// An empty shape
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Add a method signature
    pub fn method(mut self, name: impl Into<String>, parameter_types: &[&str]) -> Self {
        self.methods.push(MethodShape {
            name: name.into(),
            parameter_types: parameter_types.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    /// Shape name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared methods
    pub fn methods(&self) -> &[MethodShape] {
        &self.methods
    }

    fn find(&self, name: &str, arity: usize) -> Option<&MethodShape> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.parameter_types.len() == arity)
    }
}

/// Forwards calls declared by a shape to a wrapped object
#[derive(Debug, Clone)]
pub struct ForwardingAdapter {
    target: ObjectHandle,
    shape: InterfaceShape,
}

impl ForwardingAdapter {
    pub(crate) fn new(target: ObjectHandle, shape: InterfaceShape) -> Self {
        Self { target, shape }
    }

    /// Call `method` with `args`, typed by the shape's declaration
    pub fn call(&self, method: &str, args: Vec<Value>) -> CrossloadResult<Value> {
        let Some(declared) = self.shape.find(method, args.len()) else {
            return Err(CrossloadError::Invocation {
                signature: format!("{}[{} argument(s)]", method, args.len()),
                target: self.target.unwrap().to_string(),
                source: InvocationError::NotInShape {
                    shape: self.shape.name.clone(),
                    method: method.to_string(),
                },
            });
        };
        let descriptor =
            InvocationDescriptor::new(method, declared.parameter_types.clone(), args)?;
        self.target.invoke(&descriptor)
    }

    /// The adapted shape
    pub fn shape(&self) -> &InterfaceShape {
        &self.shape
    }

    /// The wrapped object
    pub fn target(&self) -> &ObjectHandle {
        &self.target
    }
}
