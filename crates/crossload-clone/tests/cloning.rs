//! Integration tests for cross-context cloning

use std::sync::Arc;

use crossload_clone::{CloneError, CloningStrategy, MarshalCloner, ReflectionCloner};
use crossload_core::fixtures::{self, describe, reachable, structurally_equal};
use crossload_core::{
    bootstrap, Context, FieldDef, FieldDescriptor, FieldIntrospector, ObjectRef, TypeDef,
    TypeLibrary, Value,
};

fn all_types_resolve_in(value: &Value, ctx: &Context) -> bool {
    reachable(value).iter().all(|obj| {
        ctx.resolve(obj.type_ref().name())
            .map(|resolved| &resolved == obj.type_ref())
            .unwrap_or(false)
    })
}

#[test]
fn test_counter_scenario() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let original = fixtures::counter(&a, 7, Some("hello"));

    let clone = ReflectionCloner::exhaustive()
        .clone_value(&Value::Ref(original.clone()), &b)
        .unwrap();
    let clone = clone.as_object().unwrap();

    assert_ne!(clone, &original);
    assert_eq!(clone.type_ref(), &b.resolve(fixtures::COUNTER).unwrap());
    assert_eq!(clone.get_field("count").unwrap(), Value::Int(7));
    assert_eq!(clone.get_field("label").unwrap().as_text().as_deref(), Some("hello"));
    assert_eq!(clone.get_field("peer").unwrap(), Value::Null);
}

#[test]
fn test_acyclic_graph_types_resolve_in_target() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    for original in [
        fixtures::with_primitive_fields(&a),
        fixtures::hierarchy_bottom(&a, 2, "top", "middle"),
        fixtures::with_array_fields(&a),
        fixtures::with_list_field(&a, vec![Value::text("x"), Value::Long(3)]),
    ] {
        let original = Value::Ref(original);
        for cloner in [ReflectionCloner::exhaustive(), ReflectionCloner::selective()] {
            let clone = cloner.clone_value(&original, &b).unwrap();
            assert!(all_types_resolve_in(&clone, &b), "{}", describe(&clone));
            assert!(structurally_equal(&original, &clone));
        }
    }
}

#[test]
fn test_self_reference_points_to_clone() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let child = fixtures::child_parent_cycle(&a);

    for cloner in [ReflectionCloner::exhaustive(), ReflectionCloner::selective()] {
        let clone = cloner.clone_value(&Value::Ref(child.clone()), &b).unwrap();
        let clone_child = clone.as_object().unwrap();
        assert_ne!(clone_child, &child);
        assert_eq!(clone_child.get_field("me").unwrap(), clone);

        let clone_parent = clone_child.get_field("parent").unwrap();
        let parent = clone_parent.as_object().unwrap();
        assert_eq!(parent.get_field("me").unwrap(), clone_parent);
        assert_eq!(parent.get_field("child").unwrap(), clone);
        assert_eq!(parent.type_ref(), &b.resolve(fixtures::PARENT).unwrap());
    }
}

#[test]
fn test_exhaustive_shares_no_identity() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let original = Value::Ref(fixtures::with_array_fields(&a));
    let clone = ReflectionCloner::exhaustive().clone_value(&original, &b).unwrap();

    let originals = reachable(&original);
    for node in reachable(&clone) {
        assert!(
            originals.iter().all(|o| o != &node),
            "{node:?} is shared with the original"
        );
    }
}

#[test]
fn test_selective_reuses_text_and_clones_foreign_types() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let original = fixtures::hierarchy_bottom(&a, 1, "top", "middle");
    let clone = ReflectionCloner::selective()
        .clone_value(&Value::Ref(original.clone()), &b)
        .unwrap();
    let clone = clone.as_object().unwrap();
    assert_ne!(clone, &original);

    let source = FieldIntrospector::new(&original).unwrap();
    let target = FieldIntrospector::new(clone).unwrap();
    let name = FieldDescriptor::new(fixtures::HIERARCHY_MIDDLE, "name", false);
    let peer = FieldDescriptor::new(fixtures::HIERARCHY_MIDDLE, "peer", false);

    assert_eq!(source.get_value(&name).unwrap(), target.get_value(&name).unwrap());
    assert_ne!(source.get_value(&peer).unwrap(), target.get_value(&peer).unwrap());
}

#[test]
fn test_selective_into_same_context_reuses_everything() {
    let a = fixtures::context("a");
    let original = Value::Ref(fixtures::with_array_fields(&a));
    let clone = ReflectionCloner::selective().clone_value(&original, &a).unwrap();
    assert_eq!(clone, original);
}

#[test]
fn test_round_trip() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let a_again = fixtures::context("a-again");
    let cloner = ReflectionCloner::exhaustive();

    for original in [
        fixtures::child_parent_cycle(&a),
        fixtures::hierarchy_bottom(&a, 5, "t", "m"),
        fixtures::with_array_fields(&a),
    ] {
        let original = Value::Ref(original);
        let there = cloner.clone_value(&original, &b).unwrap();
        let back = cloner.clone_value(&there, &a_again).unwrap();
        assert!(structurally_equal(&original, &back));
        assert!(all_types_resolve_in(&back, &a_again));
    }
}

#[test]
fn test_dag_sharing_is_preserved() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let original = fixtures::with_array_fields(&a);
    let clone = ReflectionCloner::exhaustive()
        .clone_value(&Value::Ref(original), &b)
        .unwrap();
    let clone = clone.as_object().unwrap();

    let mixed = clone.get_field("mixed").unwrap();
    let mixed = mixed.as_object().unwrap();
    let counters = clone.get_field("counters").unwrap();
    let counters = counters.as_object().unwrap();
    assert_eq!(mixed.element(2).unwrap(), mixed.element(3).unwrap());
    assert_eq!(mixed.element(2).unwrap(), counters.element(1).unwrap());
}

#[test]
fn test_builtin_values_are_copied_by_payload() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let original = fixtures::counter(&a, 1, Some("text"));
    let label = original.get_field("label").unwrap();
    let cloner = ReflectionCloner::exhaustive().with_fallback(None);

    let clone = cloner.clone_value(&Value::Ref(original), &b).unwrap();
    let cloned_label = clone.as_object().unwrap().get_field("label").unwrap();
    assert_ne!(cloned_label, label);
    assert_eq!(cloned_label.as_text(), label.as_text());

    let big = Value::Ref(crossload_core::ObjectRef::big_decimal("-12.50").unwrap());
    let cloned_big = cloner.clone_value(&big, &b).unwrap();
    assert_ne!(cloned_big, big);
    assert_eq!(cloned_big.to_string(), "-12.50");
    assert_eq!(
        cloned_big.as_object().unwrap().type_ref(),
        &bootstrap::builtin(bootstrap::BIG_DECIMAL).unwrap()
    );

    let boxed = Value::Ref(crossload_core::ObjectRef::boxed(Value::Char('x')).unwrap());
    let cloned_boxed = cloner.clone_value(&boxed, &b).unwrap();
    assert_ne!(cloned_boxed, boxed);
    assert_eq!(cloned_boxed.as_object().unwrap().boxed_value(), Some(Value::Char('x')));
}

const HOLDER: &str = "partial.Holder";
const FAILING: &str = "partial.Failing";
const CHILD: &str = "partial.Child";

// `Failing.child` is declared before the private field that cannot be read,
// so its subtree is cloned before the reflective attempt fails
fn partial_failure_context(name: &str) -> Context {
    let library = TypeLibrary::new("partial")
        .with(
            TypeDef::class(HOLDER)
                .implements(bootstrap::SERIALIZABLE)
                .field(FieldDef::new("node", FAILING))
                .field(FieldDef::new("child", CHILD)),
        )
        .with(
            TypeDef::class(FAILING)
                .sealed()
                .implements(bootstrap::SERIALIZABLE)
                .field(FieldDef::new("child", CHILD))
                .field(FieldDef::new("items", "lang.Object[]"))
                .field(FieldDef::new("secret", bootstrap::STRING).private()),
        )
        .with(
            TypeDef::class(CHILD)
                .implements(bootstrap::SERIALIZABLE)
                .field(FieldDef::new("owner", FAILING)),
        );
    Context::with_library(name, Arc::new(library))
}

fn field(obj: &ObjectRef, name: &str) -> Value {
    obj.get_field(name).unwrap()
}

fn object_field(obj: &ObjectRef, name: &str) -> ObjectRef {
    field(obj, name).as_object().cloned().unwrap()
}

#[test]
fn test_fallback_discards_clones_made_by_the_failed_attempt() {
    let a = partial_failure_context("a");
    let b = partial_failure_context("b");
    let holder = a.construct(HOLDER, &[]).unwrap();
    let failing = a.construct(FAILING, &[]).unwrap();
    let child = a.construct(CHILD, &[]).unwrap();
    failing.set_field("child", Value::Ref(child.clone())).unwrap();
    failing.set_field("secret", Value::text("hidden")).unwrap();
    child.set_field("owner", Value::Ref(failing.clone())).unwrap();
    holder.set_field("node", Value::Ref(failing)).unwrap();
    holder.set_field("child", Value::Ref(child)).unwrap();

    let clone = ReflectionCloner::exhaustive()
        .clone_value(&Value::Ref(holder), &b)
        .unwrap();
    let cloned_holder = clone.as_object().unwrap();
    let cloned_node = field(cloned_holder, "node");
    let cloned_child = object_field(cloned_holder, "child");

    assert_eq!(cloned_node, field(&cloned_child, "owner"));
    assert_eq!(
        field(cloned_node.as_object().unwrap(), "secret").as_text().as_deref(),
        Some("hidden")
    );
    // No half-filled clone from the failed attempt is reachable
    for obj in reachable(&clone) {
        if obj.type_ref().name() == FAILING {
            assert_eq!(
                field(&obj, "secret").as_text().as_deref(),
                Some("hidden"),
                "{}",
                describe(&clone)
            );
        }
    }
    assert!(all_types_resolve_in(&clone, &b));
}

#[test]
fn test_fallback_restores_content_rewritten_in_place() {
    let a = partial_failure_context("a");
    let b = partial_failure_context("b");
    let failing = a.construct(FAILING, &[]).unwrap();
    let child = a.construct(CHILD, &[]).unwrap();
    let items = ObjectRef::array_of(&bootstrap::object_type(), vec![Value::Ref(child.clone())])
        .unwrap();
    failing.set_field("items", Value::Ref(items.clone())).unwrap();
    failing.set_field("secret", Value::text("hidden")).unwrap();

    let clone = ReflectionCloner::selective()
        .clone_value(&Value::Ref(failing), &b)
        .unwrap();

    assert_eq!(items.element(0).unwrap(), Value::Ref(child));
    let cloned = clone.as_object().unwrap();
    assert_eq!(cloned.type_ref(), &b.resolve(FAILING).unwrap());
    assert_eq!(field(cloned, "secret").as_text().as_deref(), Some("hidden"));
    let cloned_items = object_field(cloned, "items");
    let cloned_child = cloned_items.element(0).unwrap();
    assert_eq!(cloned_child.as_object().unwrap().type_ref(), &b.resolve(CHILD).unwrap());
}

#[test]
fn test_sealed_node_falls_back_and_drops_transient_fields() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let holder = fixtures::counter(&a, 1, None);
    let sealed = fixtures::sealed(&a, "classified", 3);
    let array = crossload_core::ObjectRef::array_of(
        &a.resolve(bootstrap::OBJECT).unwrap(),
        vec![Value::Ref(holder), Value::Ref(sealed)],
    )
    .unwrap();

    let clone = ReflectionCloner::exhaustive()
        .clone_value(&Value::Ref(array), &b)
        .unwrap();
    let cloned_sealed = clone.as_object().unwrap().element(1).unwrap();
    let cloned_sealed = cloned_sealed.as_object().unwrap();

    assert_eq!(cloned_sealed.type_ref(), &b.resolve(fixtures::SEALED).unwrap());
    assert_eq!(cloned_sealed.get_field("secret").unwrap().as_text().as_deref(), Some("classified"));
    assert_eq!(cloned_sealed.get_field("visible").unwrap(), Value::Int(3));
    assert_eq!(cloned_sealed.get_field("cache").unwrap(), Value::Null);
}

#[test]
fn test_fallback_failure_is_fatal() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let holder = fixtures::with_list_field(
        &a,
        vec![Value::Ref(fixtures::sealed_not_serializable(&a, "x"))],
    );
    let err = ReflectionCloner::exhaustive()
        .clone_value(&Value::Ref(holder), &b)
        .unwrap_err();
    assert!(matches!(err, CloneError::Fallback { .. }));
    assert!(err.to_string().contains(fixtures::SEALED_NOT_SERIALIZABLE));
}

#[test]
fn test_marshal_cloner_alone_preserves_cycles() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let child = Value::Ref(fixtures::child_parent_cycle(&a));
    let clone = MarshalCloner::default().clone_value(&child, &b).unwrap();

    assert!(structurally_equal(&child, &clone));
    assert!(all_types_resolve_in(&clone, &b));
    let me = clone.as_object().unwrap().get_field("me").unwrap();
    assert_eq!(me, clone);
}

#[test]
fn test_unresolvable_type_without_serializable_fails() {
    let a = fixtures::context("a");
    let empty = Context::new("empty", None, None);
    let original = Value::Ref(fixtures::hierarchy_bottom(&a, 1, "t", "m"));
    let err = ReflectionCloner::exhaustive()
        .clone_value(&original, &empty)
        .unwrap_err();
    assert!(matches!(err, CloneError::Fallback { .. }));
}

#[test]
fn test_concurrent_clones_are_independent() {
    let a = fixtures::context("a");
    let b = fixtures::context("b");
    let original = Value::Ref(fixtures::child_parent_cycle(&a));
    let cloner = ReflectionCloner::exhaustive();

    let clones: Vec<Value> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| cloner.clone_value(&original, &b).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, clone) in clones.iter().enumerate() {
        assert!(structurally_equal(&original, clone));
        for other in &clones[i + 1..] {
            assert_ne!(clone, other);
            let mine = reachable(clone);
            assert!(reachable(other).iter().all(|node| !mine.contains(node)));
        }
    }
}
