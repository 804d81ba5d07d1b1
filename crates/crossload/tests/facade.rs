//! Integration tests for the facade: cloning, invocation, adapters, config

use std::error::Error as _;
use std::io::Write;
use std::sync::Arc;

use crossload::{
    resolve_types, CloneError, Crossload, CrossloadConfig, CrossloadError, DecisionKind,
    ForwardingAdapter, InterfaceShape, InvocationDescriptor, InvocationError,
};
use crossload_clone::{CloneResult, CloningStrategy};
use crossload_core::fixtures::{self, structurally_equal};
use crossload_core::{bootstrap, Context, ReflectError, Value};

/// Hands values over unchanged
#[derive(Debug)]
struct Identity;

impl CloningStrategy for Identity {
    fn clone_value(&self, original: &Value, _target: &Context) -> CloneResult<Value> {
        Ok(original.clone())
    }
}

trait Greeting {
    fn name(&self) -> Result<String, CrossloadError>;
    fn greet(&self, who: &str) -> Result<String, CrossloadError>;
}

impl Greeting for ForwardingAdapter {
    fn name(&self) -> Result<String, CrossloadError> {
        Ok(self.call("name", vec![])?.as_text().unwrap_or_default())
    }

    fn greet(&self, who: &str) -> Result<String, CrossloadError> {
        Ok(self
            .call("greet", vec![Value::text(who)])?
            .as_text()
            .unwrap_or_default())
    }
}

#[test]
fn test_clone_into_another_context() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let original = Value::Ref(fixtures::hierarchy_bottom(&a, 3, "top", "middle"));

    let clone = Crossload::default().wrap_object(original.clone()).clone_into(&b).unwrap();
    assert!(structurally_equal(&original, &clone));
    assert_eq!(
        clone.as_object().unwrap().type_ref(),
        &b.resolve(fixtures::HIERARCHY_BOTTOM).unwrap()
    );
}

#[test]
fn test_clone_failure_names_value_and_context() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let node = fixtures::sealed_not_serializable(&a, "s");
    let err = Crossload::default()
        .wrap_object(node.clone())
        .clone_into(&b)
        .unwrap_err();
    match &err {
        CrossloadError::Cloning { value, context, .. } => {
            assert_eq!(value, &node.to_string());
            assert_eq!(context, "b");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        err.source().and_then(|s| s.downcast_ref::<CloneError>()),
        Some(CloneError::Fallback { .. })
    ));
}

#[test]
fn test_invoke_with_argument_from_another_context() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let service = fixtures::with_methods(&b, "hi");
    let counter = fixtures::counter(&a, 7, Some("hello"));

    let descriptor =
        InvocationDescriptor::from_parameters("describe", vec![Value::Ref(counter)]).unwrap();
    let reply = Crossload::default()
        .wrap_object(service)
        .invoke(&descriptor)
        .unwrap();
    assert_eq!(reply.as_text().as_deref(), Some("hello:7"));
}

#[test]
fn test_uncloned_argument_is_incompatible() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let service = fixtures::with_methods(&b, "hi");
    let counter = fixtures::counter(&a, 7, Some("hello"));

    let descriptor =
        InvocationDescriptor::from_parameters("describe", vec![Value::Ref(counter)]).unwrap();
    let err = Crossload::default()
        .with_cloner(Arc::new(Identity))
        .wrap_object(service)
        .invoke(&descriptor)
        .unwrap_err();
    assert!(matches!(
        err,
        CrossloadError::Invocation {
            source: InvocationError::IncompatibleArgument { position: 0, .. },
            ..
        }
    ));
}

#[test]
fn test_invoke_text_and_primitive_methods() {
    let ctx = fixtures::context("a");
    let service = Crossload::default().wrap_object(fixtures::with_methods(&ctx, "hi"));

    let concatenated = service
        .invoke(
            &InvocationDescriptor::from_parameters(
                "concatenate",
                vec![Value::text("cross"), Value::text("load")],
            )
            .unwrap(),
        )
        .unwrap();
    assert_eq!(concatenated.as_text().as_deref(), Some("crossload"));

    let greeting = service
        .invoke(&InvocationDescriptor::no_args("greeting").unwrap())
        .unwrap();
    assert_eq!(greeting.as_text().as_deref(), Some("hi"));

    let inherited = service
        .invoke(&InvocationDescriptor::no_args("inherited").unwrap())
        .unwrap();
    assert_eq!(inherited.as_text().as_deref(), Some("from base"));
}

#[test]
fn test_invocation_errors_name_signature_and_target() {
    let ctx = fixtures::context("a");
    let target = fixtures::with_methods(&ctx, "hi");
    let service = Crossload::default().wrap_object(target.clone());

    let missing = InvocationDescriptor::new(
        "missing",
        vec![bootstrap::STRING.to_string()],
        vec![Value::text("x")],
    )
    .unwrap();
    match service.invoke(&missing).unwrap_err() {
        CrossloadError::Invocation {
            signature,
            target: rendered,
            source,
        } => {
            assert_eq!(signature, "missing[lang.String]");
            assert_eq!(rendered, target.to_string());
            assert!(matches!(source, InvocationError::NoSuchMethod { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = service
        .invoke(&InvocationDescriptor::no_args("fail").unwrap())
        .unwrap_err();
    assert!(err.to_string().contains("deliberate failure"));
}

#[test]
fn test_validation_precedes_resolution() {
    let ctx = fixtures::context("a");
    let err = resolve_types(&["no.Such", ""], &ctx).unwrap_err();
    let validation = err.validation_error().unwrap();
    assert_eq!((validation.position, validation.parameter), (0, "type_names"));

    let err = Crossload::default()
        .wrap_object(Value::Int(1))
        .invoke(&InvocationDescriptor::no_args("add").unwrap())
        .unwrap_err();
    assert_eq!(err.validation_error().map(|e| e.parameter), Some("target"));
}

#[test]
fn test_type_handles_and_instance_checks() {
    let ctx = fixtures::context("a");
    let crossload = Crossload::default();
    let greeter = crossload.wrap_object(fixtures::greeter(&ctx, "ann"));
    assert!(greeter.is_instance_of(fixtures::POLITE).unwrap());
    assert!(greeter.is_instance_of(fixtures::NAMED).unwrap());

    let ty = crossload.wrap_type(Some(ctx.resolve(fixtures::GREETER).unwrap()));
    assert!(ty.is_assignable_to(fixtures::NAMED).unwrap());
    assert!(!ty.is_assignable_to(fixtures::COUNTER).unwrap());
    assert!(!crossload.wrap_type(None).is_assignable_to(fixtures::NAMED).unwrap());
}

#[test]
fn test_adapter_duck_typing() {
    let ctx = fixtures::context("a");
    let shape = InterfaceShape::new("Greeting")
        .method("name", &[])
        .method("greet", &[bootstrap::STRING]);
    let crossload = Crossload::default();

    let greeter = crossload
        .wrap_object(fixtures::greeter(&ctx, "ann"))
        .adapt_to(shape.clone())
        .unwrap();
    assert_eq!(greeter.name().unwrap(), "ann");
    assert_eq!(greeter.greet("bob").unwrap(), "Hello bob, from ann");

    // Adapting succeeds; calls fail because the counter has no such methods
    let counter = crossload
        .wrap_object(fixtures::counter(&ctx, 1, None))
        .adapt_to(shape)
        .unwrap();
    assert!(matches!(
        counter.greet("bob"),
        Err(CrossloadError::Invocation { .. })
    ));
}

#[test]
fn test_config_file_selects_policy() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[cloning]\npolicy = \"selective\"").unwrap();
    let config = CrossloadConfig::from_file(file.path()).unwrap();
    assert_eq!(config.cloning.policy, DecisionKind::Selective);

    let a = fixtures::context("a");
    let original = Value::Ref(fixtures::with_array_fields(&a));
    let crossload = Crossload::new(config).unwrap();
    assert_eq!(crossload.wrap_object(original.clone()).clone_into(&a).unwrap(), original);
}

#[test]
fn test_disabled_fallback_surfaces_primary_error() {
    let config = CrossloadConfig::from_toml_str("[cloning.fallback]\nenabled = false").unwrap();
    let crossload = Crossload::new(config).unwrap();
    let a = fixtures::context("a");
    let b = fixtures::context("b");

    let original = fixtures::counter(&a, 1, Some("text"));
    let label = original.get_field("label").unwrap();
    let clone = crossload.wrap_object(original).clone_into(&b).unwrap();
    let cloned_label = clone.as_object().unwrap().get_field("label").unwrap();
    assert_ne!(cloned_label, label);
    assert_eq!(cloned_label.as_text().as_deref(), Some("text"));

    let err = crossload
        .wrap_object(fixtures::sealed(&a, "classified", 1))
        .clone_into(&b)
        .unwrap_err();
    match err {
        CrossloadError::Cloning { source, .. } => assert!(matches!(
            source.reflect_error(),
            Some(ReflectError::FieldAccess { .. })
        )),
        other => panic!("unexpected error: {other}"),
    }
}
