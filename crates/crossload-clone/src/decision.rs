//! Clone decision policies
//!
//! Per node, a policy decides whether the node itself is replaced by a fresh
//! instance in the target context, and whether its content (fields or
//! elements) is cloned in turn.

use std::fmt;
use std::sync::Arc;

use crossload_core::{bootstrap, Context, ObjectRef, ReflectResult};
use serde::{Deserialize, Serialize};

/// Per-node clone decisions
pub trait CloneDecisionPolicy: fmt::Debug + Send + Sync {
    /// Whether `node` is replaced by a new instance in `target`
    fn should_clone_node_itself(&self, node: &ObjectRef, target: &Context) -> ReflectResult<bool>;

    /// Whether the fields or elements of `node` are cloned
    fn should_clone_node_content(&self, node: &ObjectRef, target: &Context)
        -> ReflectResult<bool>;
}

/// Clone every node and all content. No node of the result is shared with
/// the original graph.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExhaustiveDecision;

impl CloneDecisionPolicy for ExhaustiveDecision {
    fn should_clone_node_itself(&self, _node: &ObjectRef, _target: &Context) -> ReflectResult<bool> {
        Ok(true)
    }

    fn should_clone_node_content(
        &self,
        _node: &ObjectRef,
        _target: &Context,
    ) -> ReflectResult<bool> {
        Ok(true)
    }
}

/// Clone a node only if its type resolves to a different type in the target
/// context, and skip the content of the shared immutable value types.
///
/// Reused nodes whose content is cloned are updated in place, so the
/// original graph sees those writes too.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectiveDecision;

impl CloneDecisionPolicy for SelectiveDecision {
    fn should_clone_node_itself(&self, node: &ObjectRef, target: &Context) -> ReflectResult<bool> {
        let resolved = target.resolve(node.type_ref().name())?;
        Ok(&resolved != node.type_ref())
    }

    fn should_clone_node_content(
        &self,
        node: &ObjectRef,
        _target: &Context,
    ) -> ReflectResult<bool> {
        Ok(!bootstrap::is_shared_immutable(node.type_ref()))
    }
}

/// Policy selector used by configuration
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    /// [`ExhaustiveDecision`]
    #[default]
    Exhaustive,
    /// [`SelectiveDecision`]
    Selective,
}

impl DecisionKind {
    /// The policy this kind selects
    pub fn policy(&self) -> Arc<dyn CloneDecisionPolicy> {
        match self {
            DecisionKind::Exhaustive => Arc::new(ExhaustiveDecision),
            DecisionKind::Selective => Arc::new(SelectiveDecision),
        }
    }
}
