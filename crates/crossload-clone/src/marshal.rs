//! Marshalling transport for cross-context value passing
//!
//! The fallback cloning strategy. A graph is marshalled into a flat,
//! context-independent [`MarshalledGraph`] (every object becomes a node in a
//! table, references become node indices), encoded to JSON bytes, decoded,
//! and rebuilt in the target context by resolving each type name there.
//!
//! Only object types assignable to `io.Serializable` are accepted; arrays and
//! the built-in value types always are. Transient fields are not transported
//! and keep their default values in the clone.

use std::fmt;

use crossload_core::{
    bootstrap, BypassInstantiator, Context, InstantiationPolicy, NativeValue, ObjectId, ObjectRef,
    ReflectError, TypeRef, Value,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{CloneResult, MarshalError};
use crate::strategy::CloningStrategy;

/// Default upper bound on the number of nodes in one marshalled graph
pub const DEFAULT_MAX_NODES: usize = 1 << 20;

/// A value in transport form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarshalledValue {
    /// Absent reference
    Null,
    /// `boolean`
    Bool(bool),
    /// `char`
    Char(char),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`, as IEEE-754 bits so NaN and infinities survive JSON
    Float(u32),
    /// `double`, as IEEE-754 bits
    Double(u64),
    /// Reference to a node of the graph
    Node(usize),
}

impl MarshalledValue {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, MarshalledValue::Null)
    }

    fn primitive(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => MarshalledValue::Null,
            Value::Bool(b) => MarshalledValue::Bool(*b),
            Value::Char(c) => MarshalledValue::Char(*c),
            Value::Byte(b) => MarshalledValue::Byte(*b),
            Value::Short(s) => MarshalledValue::Short(*s),
            Value::Int(i) => MarshalledValue::Int(*i),
            Value::Long(l) => MarshalledValue::Long(*l),
            Value::Float(f) => MarshalledValue::Float(f.to_bits()),
            Value::Double(d) => MarshalledValue::Double(d.to_bits()),
            Value::Ref(_) => return None,
        })
    }
}

impl fmt::Display for MarshalledValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalledValue::Null => write!(f, "null"),
            MarshalledValue::Bool(b) => write!(f, "{}", b),
            MarshalledValue::Char(c) => write!(f, "'{}'", c),
            MarshalledValue::Byte(b) => write!(f, "{}", b),
            MarshalledValue::Short(s) => write!(f, "{}", s),
            MarshalledValue::Int(i) => write!(f, "{}", i),
            MarshalledValue::Long(l) => write!(f, "{}", l),
            MarshalledValue::Float(bits) => write!(f, "{}", f32::from_bits(*bits)),
            MarshalledValue::Double(bits) => write!(f, "{}", f64::from_bits(*bits)),
            MarshalledValue::Node(index) => write!(f, "@{}", index),
        }
    }
}

/// One field of a marshalled object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarshalledField {
    /// Name of the declaring type
    pub declaring_type: String,
    /// Field name
    pub name: String,
    /// Field value
    pub value: MarshalledValue,
}

/// One heap object in transport form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarshalledNode {
    /// `lang.String`
    Text(String),
    /// Primitive box
    Boxed(MarshalledValue),
    /// `math.BigInteger`
    BigInteger(String),
    /// `math.BigDecimal`
    BigDecimal(String),
    /// Array over a named component type
    Array {
        /// Component type name
        component: String,
        /// Elements in order
        elements: Vec<MarshalledValue>,
    },
    /// Ordinary object
    Object {
        /// Concrete type name
        type_name: String,
        /// Transported fields, ancestors first
        fields: Vec<MarshalledField>,
    },
}

/// A marshalled graph: the root value and the node table it refers into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarshalledGraph {
    /// Root value
    pub root: MarshalledValue,
    /// Every object reachable from the root, each once
    pub nodes: Vec<MarshalledNode>,
}

impl MarshalledGraph {
    /// Encode to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, MarshalError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MarshalError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Marshal a value into transport form
pub fn marshal(value: &Value, max_nodes: usize) -> Result<MarshalledGraph, MarshalError> {
    let mut marshaller = Marshaller {
        max_nodes,
        indices: FxHashMap::default(),
        pending: Vec::new(),
    };
    let root = marshaller.value(value)?;

    let mut nodes = Vec::new();
    let mut next = 0;
    while next < marshaller.pending.len() {
        let obj = marshaller.pending[next].clone();
        nodes.push(marshaller.node(&obj)?);
        next += 1;
    }
    Ok(MarshalledGraph { root, nodes })
}

struct Marshaller {
    max_nodes: usize,
    indices: FxHashMap<ObjectId, usize>,
    pending: Vec<ObjectRef>,
}

impl Marshaller {
    fn value(&mut self, value: &Value) -> Result<MarshalledValue, MarshalError> {
        if let Some(primitive) = MarshalledValue::primitive(value) {
            return Ok(primitive);
        }
        let Value::Ref(obj) = value else {
            return Ok(MarshalledValue::Null);
        };
        if let Some(index) = self.indices.get(&obj.id()) {
            return Ok(MarshalledValue::Node(*index));
        }
        let index = self.pending.len();
        if index >= self.max_nodes {
            return Err(MarshalError::TooManyNodes(self.max_nodes));
        }
        self.indices.insert(obj.id(), index);
        self.pending.push(obj.clone());
        Ok(MarshalledValue::Node(index))
    }

    fn node(&mut self, obj: &ObjectRef) -> Result<MarshalledNode, MarshalError> {
        if let Some(payload) = obj.native_value() {
            return Ok(match payload {
                NativeValue::Text(text) => MarshalledNode::Text(text.to_string()),
                NativeValue::Boxed(value) => MarshalledNode::Boxed(self.value(&value)?),
                NativeValue::BigInteger(digits) => MarshalledNode::BigInteger(digits),
                NativeValue::BigDecimal(text) => MarshalledNode::BigDecimal(text),
            });
        }

        let ty = obj.type_ref();
        if let Some(elements) = obj.elements() {
            let component = ty.component_type().map(|c| c.name().to_string()).unwrap_or_default();
            let elements = elements
                .iter()
                .map(|element| self.value(element))
                .collect::<Result<_, _>>()?;
            return Ok(MarshalledNode::Array {
                component,
                elements,
            });
        }

        if !ty.is_subtype_of(&bootstrap::serializable_type()) {
            return Err(MarshalError::NotSerializable {
                type_name: ty.name().to_string(),
            });
        }
        let mut fields = Vec::new();
        for (index, slot) in ty.layout().iter().enumerate() {
            if slot.transient {
                continue;
            }
            let value = obj.slot(index).unwrap_or_default();
            fields.push(MarshalledField {
                declaring_type: slot.declaring_type_name.clone(),
                name: slot.name.clone(),
                value: self.value(&value)?,
            });
        }
        Ok(MarshalledNode::Object {
            type_name: ty.name().to_string(),
            fields,
        })
    }
}

/// Rebuild a marshalled graph in `target`
pub fn unmarshal(graph: &MarshalledGraph, target: &Context) -> Result<Value, MarshalError> {
    // Allocate every node first so references in any direction resolve
    let objects = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| allocate(index, node, target))
        .collect::<Result<Vec<_>, _>>()?;

    for (node, obj) in graph.nodes.iter().zip(&objects) {
        match node {
            MarshalledNode::Array { elements, .. } => {
                for (index, element) in elements.iter().enumerate() {
                    obj.set_element(index, resolve_value(element, &objects)?)?;
                }
            }
            MarshalledNode::Object { fields, .. } => {
                let ty = obj.type_ref();
                for field in fields {
                    let declaring = target.resolve(&field.declaring_type)?;
                    let index = ty.slot_index(declaring.id(), &field.name).ok_or_else(|| {
                        ReflectError::MissingField {
                            declaring_type: field.declaring_type.clone(),
                            field: field.name.clone(),
                        }
                    })?;
                    obj.set_slot(index, resolve_value(&field.value, &objects)?);
                }
            }
            _ => {}
        }
    }
    resolve_value(&graph.root, &objects)
}

fn allocate(index: usize, node: &MarshalledNode, target: &Context) -> Result<ObjectRef, MarshalError> {
    Ok(match node {
        MarshalledNode::Text(text) => ObjectRef::text(text),
        MarshalledNode::Boxed(value) => {
            let value = primitive_value(value).ok_or_else(|| MarshalError::Malformed {
                index,
                reason: format!("box holds non-primitive {}", value),
            })?;
            ObjectRef::boxed(value)?
        }
        MarshalledNode::BigInteger(digits) => ObjectRef::big_integer(digits)?,
        MarshalledNode::BigDecimal(text) => ObjectRef::big_decimal(text)?,
        MarshalledNode::Array {
            component,
            elements,
        } => {
            let component: TypeRef = target.resolve(component)?;
            ObjectRef::new_array(&component, elements.len())?
        }
        MarshalledNode::Object { type_name, .. } => {
            BypassInstantiator.new_instance(&target.resolve(type_name)?)?
        }
    })
}

fn primitive_value(value: &MarshalledValue) -> Option<Value> {
    Some(match value {
        MarshalledValue::Bool(b) => Value::Bool(*b),
        MarshalledValue::Char(c) => Value::Char(*c),
        MarshalledValue::Byte(b) => Value::Byte(*b),
        MarshalledValue::Short(s) => Value::Short(*s),
        MarshalledValue::Int(i) => Value::Int(*i),
        MarshalledValue::Long(l) => Value::Long(*l),
        MarshalledValue::Float(bits) => Value::Float(f32::from_bits(*bits)),
        MarshalledValue::Double(bits) => Value::Double(f64::from_bits(*bits)),
        MarshalledValue::Null | MarshalledValue::Node(_) => return None,
    })
}

fn resolve_value(value: &MarshalledValue, objects: &[ObjectRef]) -> Result<Value, MarshalError> {
    match value {
        MarshalledValue::Null => Ok(Value::Null),
        MarshalledValue::Node(index) => objects
            .get(*index)
            .cloned()
            .map(Value::Ref)
            .ok_or(MarshalError::DanglingReference(*index)),
        primitive => Ok(primitive_value(primitive).unwrap_or_default()),
    }
}

/// Clones by marshalling into transport form and rebuilding in the target
/// context. Preserves sharing and cycles within the cloned value.
#[derive(Debug, Clone, Copy)]
pub struct MarshalCloner {
    max_nodes: usize,
}

impl MarshalCloner {
    /// Create a cloner accepting graphs of up to `max_nodes` objects
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes }
    }

    /// Node limit
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }
}

impl Default for MarshalCloner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NODES)
    }
}

impl CloningStrategy for MarshalCloner {
    fn clone_value(&self, original: &Value, target: &Context) -> CloneResult<Value> {
        if original.is_null() || original.is_primitive() {
            return Ok(original.clone());
        }
        let graph = marshal(original, self.max_nodes)?;
        let bytes = graph.to_bytes()?;
        trace!(
            nodes = graph.nodes.len(),
            bytes = bytes.len(),
            target = %target.name(),
            "marshalled value"
        );
        let decoded = MarshalledGraph::from_bytes(&bytes)?;
        Ok(unmarshal(&decoded, target)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossload_core::fixtures;

    #[test]
    fn test_marshal_counter() {
        let ctx = fixtures::context("a");
        let counter = Value::Ref(fixtures::counter(&ctx, 7, Some("hello")));
        let graph = marshal(&counter, DEFAULT_MAX_NODES).unwrap();
        assert_eq!(graph.root, MarshalledValue::Node(0));
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1], MarshalledNode::Text("hello".to_string()));
        match &graph.nodes[0] {
            MarshalledNode::Object { type_name, fields } => {
                assert_eq!(type_name, fixtures::COUNTER);
                assert_eq!(fields[0].value, MarshalledValue::Int(7));
                assert_eq!(fields[2].value, MarshalledValue::Null);
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_cycles_become_node_references() {
        let ctx = fixtures::context("a");
        let child = Value::Ref(fixtures::child_parent_cycle(&ctx));
        let graph = marshal(&child, DEFAULT_MAX_NODES).unwrap();
        let MarshalledNode::Object { fields, .. } = &graph.nodes[0] else {
            panic!("root is not an object");
        };
        assert_eq!(fields[0].value, MarshalledValue::Node(0));
    }

    #[test]
    fn test_not_serializable() {
        let ctx = fixtures::context("a");
        let value = Value::Ref(fixtures::sealed_not_serializable(&ctx, "s"));
        assert!(matches!(
            marshal(&value, DEFAULT_MAX_NODES),
            Err(MarshalError::NotSerializable { .. })
        ));
    }

    #[test]
    fn test_node_limit() {
        let ctx = fixtures::context("a");
        let value = Value::Ref(fixtures::with_array_fields(&ctx));
        assert!(matches!(marshal(&value, 3), Err(MarshalError::TooManyNodes(3))));
    }

    #[test]
    fn test_special_floats_survive_encoding() {
        let ctx = fixtures::context("a");
        let obj = fixtures::with_primitive_fields(&ctx);
        obj.set_field("precise", Value::Double(f64::NAN)).unwrap();
        obj.set_field("ratio", Value::Float(f32::NEG_INFINITY)).unwrap();

        let clone = MarshalCloner::default()
            .clone_value(&Value::Ref(obj), &fixtures::context("b"))
            .unwrap();
        let clone = clone.as_object().unwrap();
        assert!(clone.get_field("precise").unwrap().same(&Value::Double(f64::NAN)));
        assert_eq!(clone.get_field("ratio").unwrap(), Value::Float(f32::NEG_INFINITY));
    }

    #[test]
    fn test_dangling_reference() {
        let graph = MarshalledGraph {
            root: MarshalledValue::Node(4),
            nodes: vec![],
        };
        assert!(matches!(
            unmarshal(&graph, &fixtures::context("a")),
            Err(MarshalError::DanglingReference(4))
        ));
    }

    #[test]
    fn test_malformed_box() {
        let graph = MarshalledGraph {
            root: MarshalledValue::Node(0),
            nodes: vec![MarshalledNode::Boxed(MarshalledValue::Node(0))],
        };
        assert!(matches!(
            unmarshal(&graph, &fixtures::context("a")),
            Err(MarshalError::Malformed { index: 0, .. })
        ));
    }

    #[test]
    fn test_primitives_pass_through() {
        let ctx = fixtures::context("a");
        let cloner = MarshalCloner::default();
        assert_eq!(cloner.clone_value(&Value::Int(3), &ctx).unwrap(), Value::Int(3));
        assert_eq!(cloner.clone_value(&Value::Null, &ctx).unwrap(), Value::Null);
    }
}
