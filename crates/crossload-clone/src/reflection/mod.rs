//! Reflective cloning engine
//!
//! [`ReflectionCloner`] walks an object graph through a
//! [`TraversalSession`]. For each node:
//!
//! 1. The decision policy says whether to instantiate a peer in the target
//!    context or reuse the node.
//! 2. The result is registered in the session before any content is cloned,
//!    so cycles back to the node resolve to it.
//! 3. If content is cloned, array elements are cloned by position and object
//!    fields by descriptor; primitives are copied. Built-in values (text,
//!    boxes, big numbers) are copied by payload.
//!
//! When the reflective path fails with a recoverable error, the session is
//! rolled back to where it stood before the node, dropping every clone made
//! by the failed attempt. The node is then handed, untouched, to the
//! fallback strategy and its result becomes the node's clone. A failing
//! fallback ends the whole call.

mod array;
mod native;
mod object;

use std::sync::Arc;

use crossload_core::{
    BypassInstantiator, Context, InstantiationPolicy, ObjectRef, ReflectResult, Value,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use self::array::ArrayCloner;
use self::native::NativeCloner;
use self::object::ObjectCloner;
use crate::decision::{CloneDecisionPolicy, ExhaustiveDecision, SelectiveDecision};
use crate::error::{CloneError, CloneResult};
use crate::marshal::MarshalCloner;
use crate::strategy::CloningStrategy;
use crate::traverser::{CycleSafeTraverser, TraversalSession};

/// Which primary-path failures hand a node to the fallback strategy
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackScope {
    /// Type resolution, missing field, field access, element access and
    /// instantiation errors
    #[default]
    Recoverable,
    /// Every reflection error
    Any,
}

/// Node-kind specific half of the primary path
pub(crate) trait InnerCloner {
    /// A fresh node in the target context
    fn instantiate_clone(&self, original: &ObjectRef, target: &Context) -> ReflectResult<ObjectRef>;

    /// Fill `clone` from `original`
    fn clone_content(
        &self,
        original: &ObjectRef,
        clone: &ObjectRef,
        target: &Context,
        session: &mut TraversalSession,
        engine: &ReflectionCloner,
    ) -> CloneResult<()>;
}

/// Reflective cloning strategy with per-node fallback
#[derive(Debug, Clone)]
pub struct ReflectionCloner {
    decision: Arc<dyn CloneDecisionPolicy>,
    instantiation: Arc<dyn InstantiationPolicy>,
    fallback: Option<Arc<dyn CloningStrategy>>,
    fallback_scope: FallbackScope,
}

impl ReflectionCloner {
    /// Create a cloner from its policies and fallback strategy
    pub fn new(
        decision: Arc<dyn CloneDecisionPolicy>,
        instantiation: Arc<dyn InstantiationPolicy>,
        fallback: Option<Arc<dyn CloningStrategy>>,
    ) -> Self {
        Self {
            decision,
            instantiation,
            fallback,
            fallback_scope: FallbackScope::default(),
        }
    }

    /// Exhaustive decisions, bypass instantiation, marshalling fallback
    pub fn exhaustive() -> Self {
        Self::new(
            Arc::new(ExhaustiveDecision),
            Arc::new(BypassInstantiator),
            Some(Arc::new(MarshalCloner::default())),
        )
    }

    /// Selective decisions, bypass instantiation, marshalling fallback
    pub fn selective() -> Self {
        Self::new(
            Arc::new(SelectiveDecision),
            Arc::new(BypassInstantiator),
            Some(Arc::new(MarshalCloner::default())),
        )
    }

    /// Replace the fallback strategy (`None` disables fallback)
    pub fn with_fallback(mut self, fallback: Option<Arc<dyn CloningStrategy>>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set which failures trigger the fallback
    pub fn with_fallback_scope(mut self, scope: FallbackScope) -> Self {
        self.fallback_scope = scope;
        self
    }

    /// The decision policy
    pub fn decision(&self) -> &Arc<dyn CloneDecisionPolicy> {
        &self.decision
    }

    /// Clone `original` into `target` within an existing session
    pub fn clone_in_session(
        &self,
        original: &Value,
        target: &Context,
        session: &mut TraversalSession,
    ) -> CloneResult<Value> {
        let Value::Ref(node) = original else {
            return Ok(original.clone());
        };
        CycleSafeTraverser.perform_without_following_circles(session, node, |session| {
            let checkpoint = session.checkpoint();
            match self.clone_node(node, target, session) {
                Err(err) if self.falls_back_on(&err) => {
                    session.rollback(checkpoint);
                    session.reset(node);
                    self.fall_back(node, target, err)
                }
                result => result,
            }
        })
    }

    fn clone_node(
        &self,
        original: &ObjectRef,
        target: &Context,
        session: &mut TraversalSession,
    ) -> CloneResult<Value> {
        trace!(node = ?original, target = %target.name(), "cloning node");
        let object_cloner;
        let inner: &dyn InnerCloner = if original.is_array() {
            &ArrayCloner
        } else if original.type_ref().native_kind().is_some() {
            &NativeCloner
        } else {
            object_cloner = ObjectCloner {
                instantiation: self.instantiation.as_ref(),
            };
            &object_cloner
        };

        let clone = if self.decision.should_clone_node_itself(original, target)? {
            inner.instantiate_clone(original, target)?
        } else {
            original.clone()
        };
        session.register(original, Value::Ref(clone.clone()));

        if self.decision.should_clone_node_content(original, target)? {
            if clone.ptr_eq(original) {
                session.save_content(original);
            }
            inner.clone_content(original, &clone, target, session, self)?;
        }
        Ok(Value::Ref(clone))
    }

    fn falls_back_on(&self, err: &CloneError) -> bool {
        if self.fallback.is_none() {
            return false;
        }
        match (err, self.fallback_scope) {
            (CloneError::Reflect(err), FallbackScope::Recoverable) => err.is_recoverable(),
            (CloneError::Reflect(_), FallbackScope::Any) => true,
            _ => false,
        }
    }

    fn fall_back(&self, node: &ObjectRef, target: &Context, cause: CloneError) -> CloneResult<Value> {
        let Some(fallback) = self.fallback.as_ref() else {
            return Err(cause);
        };
        debug!(node = ?node, target = %target.name(), cause = %cause, "falling back");
        fallback
            .clone_value(&Value::Ref(node.clone()), target)
            .map_err(|source| {
                warn!(node = ?node, error = %source, "fallback cloning failed");
                CloneError::Fallback {
                    value: node.to_string(),
                    source: Box::new(source),
                }
            })
    }
}

impl Default for ReflectionCloner {
    fn default() -> Self {
        Self::exhaustive()
    }
}

impl CloningStrategy for ReflectionCloner {
    fn clone_value(&self, original: &Value, target: &Context) -> CloneResult<Value> {
        let mut session = TraversalSession::new();
        self.clone_in_session(original, target, &mut session)
    }

    fn clone_all(&self, originals: &[Value], target: &Context) -> CloneResult<Vec<Value>> {
        let mut session = TraversalSession::new();
        originals
            .iter()
            .map(|original| self.clone_in_session(original, target, &mut session))
            .collect()
    }
}
