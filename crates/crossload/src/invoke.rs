//! Described method invocation across contexts
//!
//! An [`InvocationDescriptor`] names a method by its name and parameter type
//! names, and carries the argument values. The [`InvocationEngine`] resolves
//! the parameter types in the target's defining context, clones the
//! arguments into that context, finds the method on the target's type or
//! one of its superclasses, and calls it.

use std::fmt;
use std::sync::Arc;

use crossload_clone::{CloneError, CloningStrategy};
use crossload_core::{
    resolve_types, MethodDef, MethodError, ObjectRef, ReflectError, TypeRef, ValidationError,
    Value,
};
use thiserror::Error;
use tracing::debug;

/// Why a described invocation failed
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The target's context or a parameter type could not be resolved
    #[error("Resolution failed: {0}")]
    Resolution(#[source] ReflectError),

    /// The arguments could not be cloned into the target's context
    #[error("Argument cloning failed: {0}")]
    Cloning(#[from] CloneError),

    /// No method with that name and those parameter types
    #[error("No such method on '{type_name}' or its superclasses")]
    NoSuchMethod {
        /// Target type name
        type_name: String,
    },

    /// An argument does not fit the declared parameter type
    #[error("Argument {position} of type '{actual}' is not assignable to '{expected}'")]
    IncompatibleArgument {
        /// Zero-based argument position
        position: usize,
        /// Declared parameter type
        expected: String,
        /// Runtime type of the argument
        actual: String,
    },

    /// The method body raised an exception
    #[error("Method raised: {0}")]
    Threw(#[source] MethodError),

    /// The adapted shape does not declare the method
    #[error("'{shape}' declares no method '{method}' with that arity")]
    NotInShape {
        /// Shape name
        shape: String,
        /// Requested method name
        method: String,
    },
}

/// A method call described by names and values
#[derive(Debug, Clone)]
pub struct InvocationDescriptor {
    method_name: String,
    parameter_type_names: Vec<String>,
    parameters: Vec<Value>,
}

impl InvocationDescriptor {
    /// Describe a call. Fails if the method name or a type name is empty, or
    /// if the type names and parameters differ in number.
    pub fn new(
        method_name: impl Into<String>,
        parameter_type_names: Vec<String>,
        parameters: Vec<Value>,
    ) -> Result<Self, ValidationError> {
        let method_name = method_name.into();
        if method_name.trim().is_empty() {
            return Err(ValidationError::new(0, "method_name", "must not be empty"));
        }
        if let Some(index) = parameter_type_names.iter().position(|n| n.trim().is_empty()) {
            return Err(ValidationError::new(
                1,
                "parameter_type_names",
                format!("entry {} must not be empty", index),
            ));
        }
        if parameter_type_names.len() != parameters.len() {
            return Err(ValidationError::new(
                2,
                "parameters",
                format!(
                    "{} parameter(s) for {} type name(s)",
                    parameters.len(),
                    parameter_type_names.len()
                ),
            ));
        }
        Ok(Self {
            method_name,
            parameter_type_names,
            parameters,
        })
    }

    /// Describe a call without arguments
    pub fn no_args(method_name: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(method_name, Vec::new(), Vec::new())
    }

    /// Describe a call whose parameter types are the runtime types of its
    /// arguments. `Null` arguments carry no type and are rejected.
    pub fn from_parameters(
        method_name: impl Into<String>,
        parameters: Vec<Value>,
    ) -> Result<Self, ValidationError> {
        if let Some(index) = parameters.iter().position(Value::is_null) {
            return Err(ValidationError::new(
                1,
                "parameters",
                format!("entry {} is null, its type cannot be inferred", index),
            ));
        }
        let names = parameters.iter().map(Value::type_name).collect();
        Self::new(method_name, names, parameters)
    }

    /// Method name
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Parameter type names
    pub fn parameter_type_names(&self) -> &[String] {
        &self.parameter_type_names
    }

    /// Argument values
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// `name[type, type]`
    pub fn signature(&self) -> String {
        format!("{}[{}]", self.method_name, self.parameter_type_names.join(", "))
    }
}

impl fmt::Display for InvocationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// Resolves and calls described methods
#[derive(Debug, Clone)]
pub struct InvocationEngine {
    cloner: Arc<dyn CloningStrategy>,
}

impl InvocationEngine {
    /// Create an engine that clones arguments with `cloner`
    pub fn new(cloner: Arc<dyn CloningStrategy>) -> Self {
        Self { cloner }
    }

    /// Invoke the described method on `target`
    pub fn invoke(
        &self,
        target: &ObjectRef,
        descriptor: &InvocationDescriptor,
    ) -> Result<Value, InvocationError> {
        let ty = target.type_ref();
        let context = ty.require_context().map_err(InvocationError::Resolution)?;
        let parameter_types = resolve_types(descriptor.parameter_type_names(), &context)
            .map_err(InvocationError::Resolution)?;
        let args = self.cloner.clone_all(descriptor.parameters(), &context)?;

        let method = find_method(ty, descriptor.method_name(), &parameter_types)?;
        check_arguments(&parameter_types, &args)?;

        debug!(
            target = ?target,
            method = %descriptor.signature(),
            context = %context.name(),
            "invoking"
        );
        (method.body)(target, &args).map_err(InvocationError::Threw)
    }
}

/// The first method named `name` whose declared parameter types resolve, in
/// the declaring type's context, to exactly `parameter_types`
fn find_method(
    ty: &TypeRef,
    name: &str,
    parameter_types: &[TypeRef],
) -> Result<MethodDef, InvocationError> {
    for declaring in ty.hierarchy() {
        let candidates = declaring
            .declared_methods()
            .iter()
            .filter(|m| m.name == name && m.parameter_types.len() == parameter_types.len());
        for method in candidates {
            let context = declaring
                .require_context()
                .map_err(InvocationError::Resolution)?;
            // A declared type that does not resolve cannot match
            let Ok(declared) = resolve_types(method.parameter_types.as_slice(), &context) else {
                continue;
            };
            if declared == parameter_types {
                return Ok(method.clone());
            }
        }
    }
    Err(InvocationError::NoSuchMethod {
        type_name: ty.name().to_string(),
    })
}

fn check_arguments(parameter_types: &[TypeRef], args: &[Value]) -> Result<(), InvocationError> {
    for (position, (expected, arg)) in parameter_types.iter().zip(args).enumerate() {
        let fits = match (expected.primitive_kind(), arg) {
            (Some(kind), arg) => arg.primitive_kind() == Some(kind),
            (None, Value::Null) => true,
            (None, Value::Ref(obj)) => obj.type_ref().is_subtype_of(expected),
            (None, _) => false,
        };
        if !fits {
            return Err(InvocationError::IncompatibleArgument {
                position,
                expected: expected.name().to_string(),
                actual: arg.type_name(),
            });
        }
    }
    Ok(())
}
