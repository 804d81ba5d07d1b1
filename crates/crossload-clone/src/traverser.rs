//! Cycle-safe graph traversal
//!
//! A [`TraversalSession`] maps original node identities to their clones for
//! the duration of one top-level clone call. It is an explicit value passed
//! down the recursion, so concurrent calls never share one and a nested call
//! made during the same logical operation sees every node registered so far.
//!
//! A session can be rolled back to a [`Checkpoint`]: entries added since are
//! removed and nodes whose content was rewritten in place get their old
//! content back. This undoes a failed attempt at a subtree.

use crossload_core::{ObjectId, ObjectRef, Value};
use rustc_hash::FxHashMap;

/// Position in a session's history, see [`TraversalSession::rollback`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    added: usize,
    rewritten: usize,
}

#[derive(Debug)]
struct Rewrite {
    node: ObjectRef,
    content: Vec<Value>,
}

/// Identity-keyed record of the nodes visited by one clone operation
#[derive(Debug, Default)]
pub struct TraversalSession {
    // `None` marks a node whose clone is still being produced
    entries: FxHashMap<ObjectId, Option<Value>>,
    // Ids in first-insertion order
    added: Vec<ObjectId>,
    rewritten: Vec<Rewrite>,
}

impl TraversalSession {
    /// Start an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded result for a node. A node that is registered but not
    /// finished reads as `Null`.
    pub fn recorded(&self, node: &ObjectRef) -> Option<Value> {
        self.entries
            .get(&node.id())
            .map(|entry| entry.clone().unwrap_or_default())
    }

    /// Record the (possibly still incomplete) clone of a node so that
    /// references back to it resolve to the same clone
    pub fn register(&mut self, node: &ObjectRef, clone: Value) {
        self.insert(node, Some(clone));
    }

    /// Reset a node to the in-progress placeholder, discarding any clone
    /// registered for it
    pub fn reset(&mut self, node: &ObjectRef) {
        self.insert(node, None);
    }

    fn insert(&mut self, node: &ObjectRef, entry: Option<Value>) {
        if self.entries.insert(node.id(), entry).is_none() {
            self.added.push(node.id());
        }
    }

    fn forget(&mut self, node: &ObjectRef) {
        self.entries.remove(&node.id());
    }

    /// Save the current content of a node that is about to be rewritten in
    /// place, so a rollback can restore it
    pub fn save_content(&mut self, node: &ObjectRef) {
        let content = node.elements().unwrap_or_else(|| {
            (0..node.type_ref().layout().len())
                .map_while(|index| node.slot(index))
                .collect()
        });
        self.rewritten.push(Rewrite {
            node: node.clone(),
            content,
        });
    }

    /// The current position, to roll back to later
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            added: self.added.len(),
            rewritten: self.rewritten.len(),
        }
    }

    /// Undo everything done since `checkpoint`: entries added since are
    /// removed and saved content is written back, latest first. Entries that
    /// existed at the checkpoint keep their current value.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        for id in self.added.drain(checkpoint.added.min(self.added.len())..) {
            self.entries.remove(&id);
        }
        let start = checkpoint.rewritten.min(self.rewritten.len());
        for rewrite in self.rewritten.drain(start..).rev() {
            rewrite.restore();
        }
    }

    /// Number of nodes recorded
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no node has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Rewrite {
    fn restore(self) {
        if self.node.is_array() {
            // Old elements were held by the same array, so they still fit its
            // component type
            for (index, value) in self.content.into_iter().enumerate() {
                let _ = self.node.set_element(index, value);
            }
        } else {
            for (index, value) in self.content.into_iter().enumerate() {
                self.node.set_slot(index, value);
            }
        }
    }
}

/// Memoized walk keyed by node identity. Holds no state of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleSafeTraverser;

impl CycleSafeTraverser {
    /// Visit `node` unless the session already knows it.
    ///
    /// A known node returns its recorded value at once, which for a node
    /// still under construction is either its early-registered clone or
    /// `Null`. Otherwise the node is registered as in progress, `visit` runs,
    /// and its result is recorded. A failed visit removes the entry so no
    /// partial result is reused.
    pub fn perform_without_following_circles<E, F>(
        &self,
        session: &mut TraversalSession,
        node: &ObjectRef,
        visit: F,
    ) -> Result<Value, E>
    where
        F: FnOnce(&mut TraversalSession) -> Result<Value, E>,
    {
        if let Some(recorded) = session.recorded(node) {
            return Ok(recorded);
        }
        session.reset(node);
        match visit(session) {
            Ok(result) => {
                session.register(node, result.clone());
                Ok(result)
            }
            Err(err) => {
                session.forget(node);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossload_core::fixtures;

    #[test]
    fn test_visits_once() {
        let ctx = fixtures::context("a");
        let node = fixtures::counter(&ctx, 1, None);
        let mut session = TraversalSession::new();
        let mut visits = 0;

        for _ in 0..3 {
            let result: Result<Value, ()> = CycleSafeTraverser.perform_without_following_circles(
                &mut session,
                &node,
                |_| {
                    visits += 1;
                    Ok(Value::Int(visits))
                },
            );
            assert_eq!(result, Ok(Value::Int(1)));
        }
        assert_eq!(visits, 1);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_reentrant_visit_sees_placeholder() {
        let ctx = fixtures::context("a");
        let node = fixtures::counter(&ctx, 1, None);
        let mut session = TraversalSession::new();

        let result: Result<Value, ()> =
            CycleSafeTraverser.perform_without_following_circles(&mut session, &node, |session| {
                let inner = CycleSafeTraverser.perform_without_following_circles(
                    session,
                    &node,
                    |_| Ok(Value::Int(99)),
                )?;
                assert_eq!(inner, Value::Null);
                Ok(Value::Int(1))
            });
        assert_eq!(result, Ok(Value::Int(1)));
    }

    #[test]
    fn test_early_registration_is_returned() {
        let ctx = fixtures::context("a");
        let node = fixtures::counter(&ctx, 1, None);
        let clone = Value::Ref(fixtures::counter(&ctx, 1, None));
        let mut session = TraversalSession::new();

        let result: Result<Value, ()> =
            CycleSafeTraverser.perform_without_following_circles(&mut session, &node, |session| {
                session.register(&node, clone.clone());
                let inner = CycleSafeTraverser.perform_without_following_circles(
                    session,
                    &node,
                    |_| Ok(Value::Null),
                )?;
                assert_eq!(inner, clone);
                Ok(clone.clone())
            });
        assert_eq!(result, Ok(clone));
    }

    #[test]
    fn test_failure_removes_entry() {
        let ctx = fixtures::context("a");
        let node = fixtures::counter(&ctx, 1, None);
        let mut session = TraversalSession::new();

        let failed: Result<Value, &str> =
            CycleSafeTraverser.perform_without_following_circles(&mut session, &node, |_| Err("boom"));
        assert_eq!(failed, Err("boom"));
        assert!(session.is_empty());

        let retried: Result<Value, &str> =
            CycleSafeTraverser.perform_without_following_circles(&mut session, &node, |_| {
                Ok(Value::Int(2))
            });
        assert_eq!(retried, Ok(Value::Int(2)));
    }

    #[test]
    fn test_identity_not_equality() {
        let ctx = fixtures::context("a");
        let first = fixtures::counter(&ctx, 1, Some("same"));
        let second = fixtures::counter(&ctx, 1, Some("same"));
        let mut session = TraversalSession::new();

        for (node, marker) in [(&first, 1), (&second, 2)] {
            let result: Result<Value, ()> = CycleSafeTraverser
                .perform_without_following_circles(&mut session, node, |_| Ok(Value::Int(marker)));
            assert_eq!(result, Ok(Value::Int(marker)));
        }
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_rollback_removes_entries_added_since_checkpoint() {
        let ctx = fixtures::context("a");
        let kept = fixtures::counter(&ctx, 1, None);
        let parent = fixtures::counter(&ctx, 2, None);
        let child = fixtures::counter(&ctx, 3, None);
        let mut session = TraversalSession::new();
        session.register(&kept, Value::Int(1));
        session.reset(&parent);

        let checkpoint = session.checkpoint();
        session.register(&parent, Value::Int(2));
        session.register(&child, Value::Int(3));
        session.rollback(checkpoint);

        assert_eq!(session.recorded(&kept), Some(Value::Int(1)));
        assert_eq!(session.recorded(&parent), Some(Value::Int(2)));
        assert_eq!(session.recorded(&child), None);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_rollback_restores_rewritten_content() {
        let ctx = fixtures::context("a");
        let node = fixtures::counter(&ctx, 1, Some("before"));
        let int = ctx.resolve("int").unwrap();
        let array = ObjectRef::array_of(&int, vec![Value::Int(1), Value::Int(2)]).unwrap();
        let mut session = TraversalSession::new();

        let checkpoint = session.checkpoint();
        session.save_content(&node);
        session.save_content(&array);
        node.set_field("label", Value::text("after")).unwrap();
        array.set_element(0, Value::Int(9)).unwrap();
        session.rollback(checkpoint);

        assert_eq!(
            node.get_field("label").unwrap().as_object().unwrap().text_value().as_deref(),
            Some("before")
        );
        assert_eq!(array.element(0).unwrap(), Value::Int(1));
    }
}
