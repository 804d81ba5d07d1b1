//! Shared test fixtures
//!
//! A type library with the shapes the cloning tests need (primitive fields,
//! shadowed hierarchies, cycles, arrays, sealed and non-serializable types,
//! methods for invocation) plus builders and structural comparison helpers.
//! Every context built with [`context`] loads its own copy of each type.

use std::fmt::Write;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bootstrap::{self, OBJECT, SERIALIZABLE, STRING};
use crate::context::{Context, TypeLibrary};
use crate::error::MethodError;
use crate::object::{ObjectId, ObjectRef};
use crate::types::{FieldDef, MethodDef, TypeDef};
use crate::value::Value;

/// One field of every primitive kind
pub const WITH_PRIMITIVE_FIELDS: &str = "fixture.WithPrimitiveFields";
/// A single text field
pub const WITH_STRING_FIELD: &str = "fixture.WithStringField";
/// `{count: int, label: String, peer: Counter}`
pub const COUNTER: &str = "fixture.Counter";
/// Root of the shadowing hierarchy
pub const HIERARCHY_TOP: &str = "fixture.HierarchyTop";
/// Middle of the shadowing hierarchy
pub const HIERARCHY_MIDDLE: &str = "fixture.HierarchyMiddle";
/// Leaf of the shadowing hierarchy
pub const HIERARCHY_BOTTOM: &str = "fixture.HierarchyBottom";
/// Child referencing itself and its parent
pub const CHILD: &str = "fixture.SelfAndParentReferencingChild";
/// Parent referencing itself and its child
pub const PARENT: &str = "fixture.SelfAndChildReferencingParent";
/// Primitive, text, object and user-type arrays
pub const WITH_ARRAY_FIELDS: &str = "fixture.WithArrayFields";
/// A field typed with the built-in list interface
pub const WITH_LIST_FIELD: &str = "fixture.WithListField";
/// Sealed type with private and transient fields
pub const SEALED: &str = "fixture.Sealed";
/// Sealed type that is not serializable
pub const SEALED_NOT_SERIALIZABLE: &str = "fixture.SealedNotSerializable";
/// Initializer demands an `int` argument
pub const NEEDS_ARGUMENTS: &str = "fixture.NeedsArguments";
/// Superclass contributing an inherited method
pub const METHOD_BASE: &str = "fixture.MethodBase";
/// Methods for invocation tests
pub const WITH_METHODS: &str = "fixture.WithMethods";
/// Base interface
pub const NAMED: &str = "fixture.Named";
/// Interface extending [`NAMED`]
pub const POLITE: &str = "fixture.Polite";
/// Implements [`POLITE`]
pub const GREETER: &str = "fixture.Greeter";
/// Abstract class
pub const SHAPE: &str = "fixture.Shape";

static LIBRARY: Lazy<Arc<TypeLibrary>> = Lazy::new(|| Arc::new(build_library()));

/// The fixture library
pub fn library() -> Arc<TypeLibrary> {
    LIBRARY.clone()
}

/// A fresh bootstrap-delegating context over the fixture library
pub fn context(name: &str) -> Context {
    Context::with_library(name, library())
}

fn build_library() -> TypeLibrary {
    TypeLibrary::new("fixtures")
        .with(
            TypeDef::class(WITH_PRIMITIVE_FIELDS)
                .implements(SERIALIZABLE)
                .field(FieldDef::new("flag", "boolean"))
                .field(FieldDef::new("letter", "char"))
                .field(FieldDef::new("tiny", "byte"))
                .field(FieldDef::new("small", "short"))
                .field(FieldDef::new("count", "int"))
                .field(FieldDef::new("big", "long"))
                .field(FieldDef::new("ratio", "float"))
                .field(FieldDef::new("precise", "double")),
        )
        .with(
            TypeDef::class(WITH_STRING_FIELD)
                .implements(SERIALIZABLE)
                .field(FieldDef::new("label", STRING)),
        )
        .with(
            TypeDef::class(COUNTER)
                .implements(SERIALIZABLE)
                .field(FieldDef::new("count", "int"))
                .field(FieldDef::new("label", STRING))
                .field(FieldDef::new("peer", COUNTER)),
        )
        .with(
            TypeDef::class(HIERARCHY_TOP)
                .field(FieldDef::new("depth", "int"))
                .field(FieldDef::new("name", STRING)),
        )
        .with(
            TypeDef::class(HIERARCHY_MIDDLE)
                .extends(HIERARCHY_TOP)
                .implements(SERIALIZABLE)
                .field(FieldDef::new("name", STRING))
                .field(FieldDef::new("peer", WITH_STRING_FIELD)),
        )
        .with(
            TypeDef::class(HIERARCHY_BOTTOM)
                .extends(HIERARCHY_MIDDLE)
                .field(FieldDef::new("depth", "long").private())
                .field(FieldDef::new("created", "int").as_static()),
        )
        .with(
            TypeDef::class(CHILD)
                .implements(SERIALIZABLE)
                .field(FieldDef::new("me", CHILD))
                .field(FieldDef::new("parent", PARENT))
                .field(FieldDef::new("name", STRING)),
        )
        .with(
            TypeDef::class(PARENT)
                .implements(SERIALIZABLE)
                .field(FieldDef::new("me", PARENT))
                .field(FieldDef::new("child", CHILD))
                .field(FieldDef::new("name", STRING)),
        )
        .with(
            TypeDef::class(WITH_ARRAY_FIELDS)
                .implements(SERIALIZABLE)
                .field(FieldDef::new("numbers", "int[]"))
                .field(FieldDef::new("words", "lang.String[]"))
                .field(FieldDef::new("mixed", "lang.Object[]"))
                .field(FieldDef::new("counters", "fixture.Counter[]")),
        )
        .with(TypeDef::class(WITH_LIST_FIELD).field(FieldDef::new("items", bootstrap::LIST)))
        .with(
            TypeDef::class(SEALED)
                .sealed()
                .implements(SERIALIZABLE)
                .field(FieldDef::new("secret", STRING).private())
                .field(FieldDef::new("visible", "int"))
                .field(FieldDef::new("cache", STRING).private().transient()),
        )
        .with(
            TypeDef::class(SEALED_NOT_SERIALIZABLE)
                .sealed()
                .field(FieldDef::new("secret", STRING).private()),
        )
        .with(
            TypeDef::class(NEEDS_ARGUMENTS)
                .field(FieldDef::new("value", "int").as_final())
                .field(FieldDef::new("label", STRING))
                .initializer(|this, args| match args {
                    [Value::Int(value)] => {
                        this.set_field("value", Value::Int(*value))?;
                        this.set_field("label", Value::text(format!("#{}", value)))?;
                        Ok(())
                    }
                    _ => Err(MethodError::new("expected a single int argument")),
                }),
        )
        .with(TypeDef::class(METHOD_BASE).method(MethodDef::new(
            "inherited",
            &[],
            STRING,
            |_, _| Ok(Value::text("from base")),
        )))
        .with(with_methods_def())
        .with(TypeDef::interface(NAMED))
        .with(TypeDef::interface(POLITE).implements(NAMED))
        .with(
            TypeDef::class(GREETER)
                .implements(POLITE)
                .field(FieldDef::new("name", STRING))
                .method(MethodDef::new("name", &[], STRING, |this, _| {
                    Ok(this.get_field("name")?)
                }))
                .method(MethodDef::new("greet", &[STRING], STRING, |this, args| {
                    let own = this.get_field("name")?.as_text().unwrap_or_default();
                    let other = text_arg(args, 0)?;
                    Ok(Value::text(format!("Hello {}, from {}", other, own)))
                })),
        )
        .with(
            TypeDef::class(SHAPE)
                .abstract_type()
                .field(FieldDef::new("sides", "int")),
        )
}

fn with_methods_def() -> TypeDef {
    TypeDef::class(WITH_METHODS)
        .extends(METHOD_BASE)
        .field(FieldDef::new("greeting", STRING))
        .method(MethodDef::new(
            "concatenate",
            &[STRING, STRING],
            STRING,
            |_, args| Ok(Value::text(format!("{}{}", text_arg(args, 0)?, text_arg(args, 1)?))),
        ))
        .method(MethodDef::new("add", &["int", "int"], "int", |_, args| {
            match args {
                [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a.wrapping_add(*b))),
                _ => Err(MethodError::new("expected two ints")),
            }
        }))
        .method(MethodDef::new("describe", &[COUNTER], STRING, |_, args| {
            let counter = args
                .first()
                .and_then(Value::as_object)
                .ok_or_else(|| MethodError::new("counter is null"))?;
            let count = counter.get_field("count")?;
            let label = counter.get_field("label")?;
            Ok(Value::text(format!("{}:{}", label, count)))
        }))
        .method(MethodDef::new("greeting", &[], STRING, |this, _| {
            Ok(this.get_field("greeting")?)
        }))
        .method(MethodDef::new("fail", &[], "void", |_, _| {
            Err(MethodError::new("deliberate failure"))
        }))
}

fn text_arg(args: &[Value], index: usize) -> Result<String, MethodError> {
    args.get(index)
        .and_then(Value::as_text)
        .ok_or_else(|| MethodError::new(format!("argument {} is not text", index)))
}

fn construct(ctx: &Context, name: &str) -> ObjectRef {
    ctx.construct(name, &[])
        .unwrap_or_else(|err| panic!("fixture {name} failed to construct: {err}"))
}

fn set(obj: &ObjectRef, field: &str, value: Value) {
    obj.set_field(field, value)
        .unwrap_or_else(|err| panic!("fixture field {field} rejected value: {err}"));
}

fn opt_text(text: Option<&str>) -> Value {
    text.map(Value::text).unwrap_or_default()
}

/// A [`COUNTER`] with no peer
pub fn counter(ctx: &Context, count: i32, label: Option<&str>) -> ObjectRef {
    let obj = construct(ctx, COUNTER);
    set(&obj, "count", Value::Int(count));
    set(&obj, "label", opt_text(label));
    obj
}

/// A [`WITH_STRING_FIELD`]
pub fn with_string_field(ctx: &Context, label: &str) -> ObjectRef {
    let obj = construct(ctx, WITH_STRING_FIELD);
    set(&obj, "label", Value::text(label));
    obj
}

/// A [`WITH_PRIMITIVE_FIELDS`] with a non-default value in every field
pub fn with_primitive_fields(ctx: &Context) -> ObjectRef {
    let obj = construct(ctx, WITH_PRIMITIVE_FIELDS);
    set(&obj, "flag", Value::Bool(true));
    set(&obj, "letter", Value::Char('q'));
    set(&obj, "tiny", Value::Byte(-3));
    set(&obj, "small", Value::Short(1234));
    set(&obj, "count", Value::Int(7));
    set(&obj, "big", Value::Long(1 << 40));
    set(&obj, "ratio", Value::Float(0.25));
    set(&obj, "precise", Value::Double(std::f64::consts::PI));
    obj
}

/// A [`HIERARCHY_BOTTOM`] with both shadowed `name`s and the top `depth`
/// set, and a peer
pub fn hierarchy_bottom(ctx: &Context, depth: i32, top_name: &str, middle_name: &str) -> ObjectRef {
    let obj = construct(ctx, HIERARCHY_BOTTOM);
    let ty = obj.type_ref().clone();
    let slot = |declaring: &str, field: &str| {
        let declaring = ctx
            .resolve(declaring)
            .unwrap_or_else(|err| panic!("fixture type {declaring} missing: {err}"));
        ty.slot_index(declaring.id(), field)
            .unwrap_or_else(|| panic!("fixture slot {field} missing"))
    };
    obj.set_slot(slot(HIERARCHY_TOP, "depth"), Value::Int(depth));
    obj.set_slot(slot(HIERARCHY_TOP, "name"), Value::text(top_name));
    obj.set_slot(slot(HIERARCHY_MIDDLE, "name"), Value::text(middle_name));
    obj.set_slot(slot(HIERARCHY_BOTTOM, "depth"), Value::Long(depth as i64 * 10));
    set(&obj, "peer", Value::Ref(with_string_field(ctx, "peer")));
    obj
}

/// A [`CHILD`] and [`PARENT`] referencing themselves and each other;
/// returns the child
pub fn child_parent_cycle(ctx: &Context) -> ObjectRef {
    let child = construct(ctx, CHILD);
    let parent = construct(ctx, PARENT);
    set(&child, "me", Value::Ref(child.clone()));
    set(&child, "parent", Value::Ref(parent.clone()));
    set(&child, "name", Value::text("child"));
    set(&parent, "me", Value::Ref(parent.clone()));
    set(&parent, "child", Value::Ref(child.clone()));
    set(&parent, "name", Value::text("parent"));
    child
}

/// A [`WITH_ARRAY_FIELDS`]; `mixed` holds a text, a box, a counter and the
/// counter again
pub fn with_array_fields(ctx: &Context) -> ObjectRef {
    let obj = construct(ctx, WITH_ARRAY_FIELDS);
    let resolve = |name: &str| {
        ctx.resolve(name)
            .unwrap_or_else(|err| panic!("fixture type {name} missing: {err}"))
    };
    let array = |component: &str, values: Vec<Value>| {
        ObjectRef::array_of(&resolve(component), values)
            .unwrap_or_else(|err| panic!("fixture array of {component} rejected: {err}"))
    };
    let shared = counter(ctx, 2, Some("shared"));
    let boxed = ObjectRef::boxed(Value::Int(42))
        .unwrap_or_else(|err| panic!("fixture box failed: {err}"));

    set(
        &obj,
        "numbers",
        Value::Ref(array("int", vec![Value::Int(1), Value::Int(2), Value::Int(3)])),
    );
    set(
        &obj,
        "words",
        Value::Ref(array(STRING, vec![Value::text("alpha"), Value::Null, Value::text("omega")])),
    );
    set(
        &obj,
        "mixed",
        Value::Ref(array(
            OBJECT,
            vec![
                Value::text("text"),
                Value::Ref(boxed),
                Value::Ref(shared.clone()),
                Value::Ref(shared.clone()),
            ],
        )),
    );
    set(
        &obj,
        "counters",
        Value::Ref(array(
            COUNTER,
            vec![Value::Ref(counter(ctx, 1, Some("one"))), Value::Ref(shared)],
        )),
    );
    obj
}

/// A [`WITH_LIST_FIELD`] whose list holds the given values
pub fn with_list_field(ctx: &Context, values: Vec<Value>) -> ObjectRef {
    let obj = construct(ctx, WITH_LIST_FIELD);
    let list = construct(ctx, bootstrap::ARRAY_LIST);
    let add = list
        .type_ref()
        .declared_methods()
        .iter()
        .find(|m| m.name == "add")
        .map(|m| m.body.clone())
        .unwrap_or_else(|| panic!("list has no add method"));
    for value in values {
        add(&list, &[value]).unwrap_or_else(|err| panic!("list rejected value: {err}"));
    }
    set(&obj, "items", Value::Ref(list));
    obj
}

/// A [`SEALED`] with its private, visible and transient fields set
pub fn sealed(ctx: &Context, secret: &str, visible: i32) -> ObjectRef {
    let obj = construct(ctx, SEALED);
    set(&obj, "secret", Value::text(secret));
    set(&obj, "visible", Value::Int(visible));
    set(&obj, "cache", Value::text("cached"));
    obj
}

/// A [`SEALED_NOT_SERIALIZABLE`]
pub fn sealed_not_serializable(ctx: &Context, secret: &str) -> ObjectRef {
    let obj = construct(ctx, SEALED_NOT_SERIALIZABLE);
    set(&obj, "secret", Value::text(secret));
    obj
}

/// A [`GREETER`] with the given name
pub fn greeter(ctx: &Context, name: &str) -> ObjectRef {
    let obj = construct(ctx, GREETER);
    set(&obj, "name", Value::text(name));
    obj
}

/// A [`WITH_METHODS`] with the given greeting
pub fn with_methods(ctx: &Context, greeting: &str) -> ObjectRef {
    let obj = construct(ctx, WITH_METHODS);
    set(&obj, "greeting", Value::text(greeting));
    obj
}

/// Context-independent rendering of a graph: type names, every slot and
/// element in order, and `#n` back-references for revisited nodes
pub fn describe(value: &Value) -> String {
    let mut out = String::new();
    let mut seen = FxHashMap::default();
    describe_into(value, &mut seen, &mut out);
    out
}

fn describe_into(value: &Value, seen: &mut FxHashMap<ObjectId, usize>, out: &mut String) {
    let obj = match value {
        Value::Ref(obj) => obj,
        Value::Null => {
            out.push_str("null");
            return;
        }
        primitive => {
            let _ = write!(out, "{}:{}", primitive.type_name(), primitive);
            return;
        }
    };
    if let Some(index) = seen.get(&obj.id()) {
        let _ = write!(out, "#{}", index);
        return;
    }
    let index = seen.len();
    seen.insert(obj.id(), index);
    let ty = obj.type_ref();

    if let Some(payload) = obj.native_value() {
        let _ = write!(out, "{}({:?})", ty.name(), payload.to_string());
    } else if let Some(elements) = obj.elements() {
        let _ = write!(out, "{}#{}[", ty.name(), index);
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            describe_into(element, seen, out);
        }
        out.push(']');
    } else {
        let _ = write!(out, "{}#{}{{", ty.name(), index);
        for (i, slot) in ty.layout().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}.{}=", slot.declaring_type_name, slot.name);
            describe_into(&obj.slot(i).unwrap_or_default(), seen, out);
        }
        out.push('}');
    }
}

/// Whether two graphs have the same shape and equal field values
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    describe(a) == describe(b)
}

/// Every object reachable from `value`, each listed once
pub fn reachable(value: &Value) -> Vec<ObjectRef> {
    let mut seen = FxHashSet::default();
    let mut found = Vec::new();
    let mut pending: Vec<Value> = vec![value.clone()];
    while let Some(next) = pending.pop() {
        let Value::Ref(obj) = next else { continue };
        if !seen.insert(obj.id()) {
            continue;
        }
        if let Some(elements) = obj.elements() {
            pending.extend(elements);
        } else {
            pending.extend((0..obj.type_ref().layout().len()).filter_map(|i| obj.slot(i)));
        }
        found.push(obj);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_is_context_independent() {
        let a = Value::Ref(counter(&context("a"), 7, Some("hello")));
        let b = Value::Ref(counter(&context("b"), 7, Some("hello")));
        assert!(structurally_equal(&a, &b));
        assert_eq!(
            describe(&a),
            "fixture.Counter#0{fixture.Counter.count=int:7, \
             fixture.Counter.label=lang.String(\"hello\"), fixture.Counter.peer=null}"
        );
    }

    #[test]
    fn test_describe_cycles() {
        let child = Value::Ref(child_parent_cycle(&context("a")));
        let text = describe(&child);
        assert!(text.contains("me=#0"));
        assert!(text.contains("child=#0"));
    }

    #[test]
    fn test_reachable_counts_shared_nodes_once() {
        let ctx = context("a");
        let arrays = Value::Ref(with_array_fields(&ctx));
        let counters: Vec<_> = reachable(&arrays)
            .into_iter()
            .filter(|obj| obj.type_ref().name() == COUNTER)
            .collect();
        assert_eq!(counters.len(), 2);
    }

    #[test]
    fn test_list_fixture() {
        let ctx = context("a");
        let holder = with_list_field(&ctx, vec![Value::text("a"), Value::Int(1)]);
        let list = holder.get_field("items").unwrap();
        assert_eq!(list.as_object().unwrap().get_field("size").unwrap(), Value::Int(2));
    }
}
