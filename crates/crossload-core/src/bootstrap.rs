//! Bootstrap context and built-in types
//!
//! The bootstrap context is the root of every delegation chain. It defines
//! the primitive types, `lang.Object`, the built-in immutable value types
//! (text, primitive boxes, arbitrary-precision numerics) and a growable
//! list. Because every context reaches these types through delegation, they
//! are shared across contexts: a `lang.String` is the same type everywhere.

use once_cell::sync::Lazy;

use crate::context::Context;
use crate::error::MethodError;
use crate::object::ObjectRef;
use crate::types::{FieldDef, MethodDef, NativeKind, PrimitiveKind, Type, TypeDef, TypeRef};
use crate::value::Value;

/// Root class of every class hierarchy
pub const OBJECT: &str = "lang.Object";
/// Marker interface for the marshalling transport
pub const SERIALIZABLE: &str = "io.Serializable";
/// Marker interface implemented by arrays
pub const CLONEABLE: &str = "lang.Cloneable";
/// Ordering interface of the value types
pub const COMPARABLE: &str = "lang.Comparable";
/// Character sequence interface
pub const CHAR_SEQUENCE: &str = "lang.CharSequence";
/// Text
pub const STRING: &str = "lang.String";
/// Abstract numeric base class
pub const NUMBER: &str = "lang.Number";
/// `boolean` box
pub const BOOLEAN: &str = "lang.Boolean";
/// `char` box
pub const CHARACTER: &str = "lang.Character";
/// `byte` box
pub const BYTE: &str = "lang.Byte";
/// `short` box
pub const SHORT: &str = "lang.Short";
/// `int` box
pub const INTEGER: &str = "lang.Integer";
/// `long` box
pub const LONG: &str = "lang.Long";
/// `float` box
pub const FLOAT: &str = "lang.Float";
/// `double` box
pub const DOUBLE: &str = "lang.Double";
/// Arbitrary-precision integer
pub const BIG_INTEGER: &str = "math.BigInteger";
/// Arbitrary-precision decimal
pub const BIG_DECIMAL: &str = "math.BigDecimal";
/// Collection interface
pub const COLLECTION: &str = "util.Collection";
/// List interface
pub const LIST: &str = "util.List";
/// Growable array-backed list
pub const ARRAY_LIST: &str = "util.ArrayList";

/// Names of the immutable value types that are identical in every context
pub const SHARED_IMMUTABLES: [&str; 11] = [
    STRING,
    BIG_INTEGER,
    BIG_DECIMAL,
    BOOLEAN,
    CHARACTER,
    BYTE,
    SHORT,
    INTEGER,
    LONG,
    FLOAT,
    DOUBLE,
];

struct Bootstrap {
    context: Context,
    object: TypeRef,
    serializable: TypeRef,
    cloneable: TypeRef,
    text: TypeRef,
    // Indexed by `PrimitiveKind` discriminant, in `PrimitiveKind::ALL` order
    boxes: [TypeRef; 8],
    big_integer: TypeRef,
    big_decimal: TypeRef,
}

static BOOTSTRAP: Lazy<Bootstrap> = Lazy::new(Bootstrap::create);

impl Bootstrap {
    fn create() -> Self {
        let context = Context::root("bootstrap");
        let define = |def: TypeDef, superclass: Option<&TypeRef>, interfaces: &[&TypeRef]| {
            let interfaces = interfaces.iter().map(|ty| (*ty).clone()).collect();
            context.insert(Type::define(&def, &context, superclass.cloned(), interfaces))
        };

        for kind in PrimitiveKind::ALL {
            context.insert(Type::primitive(kind, &context));
        }

        let object = define(TypeDef::class(OBJECT), None, &[]);
        let serializable = define(TypeDef::interface(SERIALIZABLE), None, &[]);
        let cloneable = define(TypeDef::interface(CLONEABLE), None, &[]);
        let comparable = define(TypeDef::interface(COMPARABLE), None, &[]);
        let char_sequence = define(TypeDef::interface(CHAR_SEQUENCE), None, &[]);

        let text = define(
            TypeDef::class(STRING)
                .native(NativeKind::Text)
                .method(MethodDef::new("length", &[], "int", string_length)),
            Some(&object),
            &[&serializable, &comparable, &char_sequence],
        );

        let number = define(
            TypeDef::class(NUMBER).abstract_type(),
            Some(&object),
            &[&serializable],
        );
        let boxes = PrimitiveKind::ALL.map(|kind| {
            let superclass = match kind {
                PrimitiveKind::Boolean | PrimitiveKind::Char => &object,
                _ => &number,
            };
            define(
                TypeDef::class(kind.box_type_name())
                    .native(NativeKind::Boxed(kind))
                    .method(MethodDef::new(
                        format!("{}Value", kind.name()),
                        &[],
                        kind.name(),
                        unbox,
                    )),
                Some(superclass),
                &[&serializable, &comparable],
            )
        });
        let big_integer = define(
            TypeDef::class(BIG_INTEGER).native(NativeKind::BigInteger),
            Some(&number),
            &[&serializable, &comparable],
        );
        let big_decimal = define(
            TypeDef::class(BIG_DECIMAL).native(NativeKind::BigDecimal),
            Some(&number),
            &[&serializable, &comparable],
        );

        let collection = define(TypeDef::interface(COLLECTION), None, &[]);
        let list = define(TypeDef::interface(LIST), None, &[&collection]);
        define(
            array_list_def(),
            Some(&object),
            &[&list, &serializable, &cloneable],
        );

        Bootstrap {
            context,
            object,
            serializable,
            cloneable,
            text,
            boxes,
            big_integer,
            big_decimal,
        }
    }
}

fn string_length(this: &ObjectRef, _args: &[Value]) -> Result<Value, MethodError> {
    let text = this
        .text_value()
        .ok_or_else(|| MethodError::new("receiver is not a string"))?;
    Ok(Value::Int(text.chars().count() as i32))
}

fn unbox(this: &ObjectRef, _args: &[Value]) -> Result<Value, MethodError> {
    this.boxed_value()
        .ok_or_else(|| MethodError::new("receiver is not a primitive box"))
}

fn array_list_def() -> TypeDef {
    TypeDef::class(ARRAY_LIST)
        .field(FieldDef::new("elementData", "lang.Object[]").private())
        .field(FieldDef::new("size", "int").private())
        .initializer(|this, _args| {
            let storage = ObjectRef::new_array(&object_type(), 4)?;
            this.set_field("elementData", Value::Ref(storage))?;
            Ok(())
        })
        .method(MethodDef::new("add", &[OBJECT], "boolean", |this, args| {
            let value = args.first().cloned().unwrap_or_default();
            list_add(this, value)?;
            Ok(Value::Bool(true))
        }))
        .method(MethodDef::new("get", &["int"], OBJECT, |this, args| {
            let index = args
                .first()
                .and_then(Value::as_int)
                .ok_or_else(|| MethodError::new("index must be an int"))?;
            let (storage, size) = list_parts(this)?;
            if index < 0 || index as usize >= size {
                return Err(MethodError::new(format!(
                    "index {} out of bounds for size {}",
                    index, size
                )));
            }
            Ok(storage.element(index as usize)?)
        }))
        .method(MethodDef::new("size", &[], "int", |this, _args| {
            let (_, size) = list_parts(this)?;
            Ok(Value::Int(size as i32))
        }))
}

fn list_parts(this: &ObjectRef) -> Result<(ObjectRef, usize), MethodError> {
    let storage = this
        .get_field("elementData")?
        .as_object()
        .cloned()
        .ok_or_else(|| MethodError::new("list storage is not initialized"))?;
    let size = this.get_field("size")?.as_int().unwrap_or(0).max(0) as usize;
    Ok((storage, size))
}

fn list_add(this: &ObjectRef, value: Value) -> Result<(), MethodError> {
    let value = if value.is_primitive() {
        Value::Ref(ObjectRef::boxed(value)?)
    } else {
        value
    };
    let (mut storage, size) = list_parts(this)?;
    let capacity = storage.length().unwrap_or(0);
    if size == capacity {
        let grown = ObjectRef::new_array(&object_type(), capacity * 2 + 1)?;
        for index in 0..size {
            grown.set_element(index, storage.element(index)?)?;
        }
        this.set_field("elementData", Value::Ref(grown.clone()))?;
        storage = grown;
    }
    storage.set_element(size, value)?;
    this.set_field("size", Value::Int(size as i32 + 1))?;
    Ok(())
}

/// The bootstrap context
pub fn context() -> Context {
    BOOTSTRAP.context.clone()
}

/// `lang.Object`
pub fn object_type() -> TypeRef {
    BOOTSTRAP.object.clone()
}

/// `io.Serializable`
pub fn serializable_type() -> TypeRef {
    BOOTSTRAP.serializable.clone()
}

/// `lang.Cloneable`
pub fn cloneable_type() -> TypeRef {
    BOOTSTRAP.cloneable.clone()
}

/// The built-in type carrying a native payload of `kind`
pub fn native_type(kind: NativeKind) -> TypeRef {
    match kind {
        NativeKind::Text => BOOTSTRAP.text.clone(),
        NativeKind::Boxed(primitive) => BOOTSTRAP.boxes[primitive as usize].clone(),
        NativeKind::BigInteger => BOOTSTRAP.big_integer.clone(),
        NativeKind::BigDecimal => BOOTSTRAP.big_decimal.clone(),
    }
}

/// Look up a built-in type by name
pub fn builtin(name: &str) -> Option<TypeRef> {
    BOOTSTRAP.context.resolve(name).ok()
}

/// Whether a type is one of the immutable value types shared by all contexts
pub fn is_shared_immutable(ty: &TypeRef) -> bool {
    ty.native_kind().is_some() && ty.context().map_or(false, |ctx| ctx.is_bootstrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;

    #[test]
    fn test_builtins_exist() {
        for name in SHARED_IMMUTABLES {
            let ty = builtin(name).unwrap();
            assert!(is_shared_immutable(&ty), "{name} should be a shared immutable");
        }
        assert!(builtin(ARRAY_LIST).is_some());
        assert!(builtin("does.not.Exist").is_none());
    }

    #[test]
    fn test_native_types_match_their_names() {
        assert_eq!(native_type(NativeKind::Text), builtin(STRING).unwrap());
        assert_eq!(native_type(NativeKind::BigInteger), builtin(BIG_INTEGER).unwrap());
        assert_eq!(native_type(NativeKind::BigDecimal), builtin(BIG_DECIMAL).unwrap());
        for kind in PrimitiveKind::ALL {
            let ty = native_type(NativeKind::Boxed(kind));
            assert_eq!(ty.name(), kind.box_type_name());
            assert_eq!(ty.native_kind(), Some(NativeKind::Boxed(kind)));
        }
    }

    #[test]
    fn test_boxes_extend_number() {
        let integer = builtin(INTEGER).unwrap();
        assert_eq!(integer.superclass().unwrap().name(), NUMBER);
        let boolean = builtin(BOOLEAN).unwrap();
        assert_eq!(boolean.superclass().unwrap().name(), OBJECT);
    }

    #[test]
    fn test_primitives_are_defined() {
        for kind in PrimitiveKind::ALL {
            let ty = builtin(kind.name()).unwrap();
            assert_eq!(ty.kind(), &TypeKind::Primitive(kind));
        }
    }

    #[test]
    fn test_array_list_grows() {
        let list = builtin(ARRAY_LIST).unwrap().construct(&[]).unwrap();
        for i in 0..10 {
            list_add(&list, Value::Int(i)).unwrap();
        }
        let (storage, size) = list_parts(&list).unwrap();
        assert_eq!(size, 10);
        let last = storage.element(9).unwrap();
        assert_eq!(last.as_object().unwrap().boxed_value(), Some(Value::Int(9)));
    }

    #[test]
    fn test_object_is_not_shared_immutable() {
        assert!(!is_shared_immutable(&object_type()));
        assert!(!is_shared_immutable(&builtin(ARRAY_LIST).unwrap()));
    }
}
