use std::num::NonZeroU32;

use crate::id::NodeId;
use crate::node::{ExprNode, FxIndexSet, ObserverNode, ValueNode};

/// One arena slot: either free (part of the reuse free-list) or occupied by
/// one of the three node kinds.
enum SlotState {
    Free { next_free: Option<u32> },
    Value(ValueNode),
    Expr(ExprNode),
    Observer(ObserverNode),
}

struct SlotEntry {
    generation: NonZeroU32,
    state: SlotState,
}

/// Outcome of [`Arena::mark_invalid`], telling the caller (`Runtime`) what
/// propagation step, if any, to take next.
pub(crate) enum Invalidated {
    /// The node was already invalid/pending; nothing to propagate.
    NoOp,
    /// The node became invalid; these dependents must also be invalidated.
    Expr(Vec<NodeId>),
    /// The node became pending and must be appended to the flush queue.
    Observer(NodeId),
}

/// Free-list arena storing all three node kinds behind one tagged
/// discriminator (spec §9), grounded on `interned.rs`'s
/// `InternTables<K>` (`values: Vec<InternValue<K>>`, `first_free`).
#[derive(Default)]
pub(crate) struct Arena {
    slots: Vec<SlotEntry>,
    first_free: Option<u32>,
}

// SAFETY: 1 is non-zero.
const FIRST_GENERATION: NonZeroU32 = unsafe { NonZeroU32::new_unchecked(1) };

impl Arena {
    pub(crate) fn new() -> Self {
        Arena {
            slots: Vec::new(),
            first_free: None,
        }
    }

    fn alloc(&mut self, state: SlotState) -> NodeId {
        match self.first_free {
            Some(index) => {
                let entry = &mut self.slots[index as usize];
                let next_free = match &entry.state {
                    SlotState::Free { next_free } => *next_free,
                    _ => unreachable!("free list points at an occupied slot"),
                };
                self.first_free = next_free;
                entry.generation = NonZeroU32::new(entry.generation.get().wrapping_add(1))
                    .unwrap_or(FIRST_GENERATION);
                entry.state = state;
                NodeId::new(index, entry.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(SlotEntry {
                    generation: FIRST_GENERATION,
                    state,
                });
                NodeId::new(index, FIRST_GENERATION)
            }
        }
    }

    pub(crate) fn alloc_value(&mut self, node: ValueNode) -> NodeId {
        self.alloc(SlotState::Value(node))
    }

    pub(crate) fn alloc_expr(&mut self, node: ExprNode) -> NodeId {
        self.alloc(SlotState::Expr(node))
    }

    pub(crate) fn alloc_observer(&mut self, node: ObserverNode) -> NodeId {
        self.alloc(SlotState::Observer(node))
    }

    fn entry(&self, id: NodeId) -> Option<&SlotEntry> {
        let entry = self.slots.get(id.index())?;
        if entry.generation == id.generation() {
            Some(entry)
        } else {
            None
        }
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut SlotEntry> {
        let entry = self.slots.get_mut(id.index())?;
        if entry.generation == id.generation() {
            Some(entry)
        } else {
            None
        }
    }

    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    pub(crate) fn release(&mut self, id: NodeId) {
        if let Some(entry) = self.entry_mut(id) {
            entry.state = SlotState::Free {
                next_free: self.first_free,
            };
            self.first_free = Some(id.index() as u32);
        }
    }

    pub(crate) fn value(&self, id: NodeId) -> &ValueNode {
        match self.entry(id).map(|e| &e.state) {
            Some(SlotState::Value(node)) => node,
            _ => panic!("stale or wrong-kind ValueHandle"),
        }
    }

    pub(crate) fn value_mut(&mut self, id: NodeId) -> &mut ValueNode {
        match self.entry_mut(id).map(|e| &mut e.state) {
            Some(SlotState::Value(node)) => node,
            _ => panic!("stale or wrong-kind ValueHandle"),
        }
    }

    pub(crate) fn expr(&self, id: NodeId) -> &ExprNode {
        match self.entry(id).map(|e| &e.state) {
            Some(SlotState::Expr(node)) => node,
            _ => panic!("stale or wrong-kind ExprHandle"),
        }
    }

    pub(crate) fn expr_mut(&mut self, id: NodeId) -> &mut ExprNode {
        match self.entry_mut(id).map(|e| &mut e.state) {
            Some(SlotState::Expr(node)) => node,
            _ => panic!("stale or wrong-kind ExprHandle"),
        }
    }

    pub(crate) fn observer(&self, id: NodeId) -> &ObserverNode {
        match self.entry(id).map(|e| &e.state) {
            Some(SlotState::Observer(node)) => node,
            _ => panic!("stale or wrong-kind ObserverHandle"),
        }
    }

    pub(crate) fn observer_mut(&mut self, id: NodeId) -> &mut ObserverNode {
        match self.entry_mut(id).map(|e| &mut e.state) {
            Some(SlotState::Observer(node)) => node,
            _ => panic!("stale or wrong-kind ObserverHandle"),
        }
    }

    /// Adds `dependent` to `source`'s dependent set. `source` must be a
    /// value or expression node (the only kinds that may be read).
    pub(crate) fn add_dependent(&mut self, source: NodeId, dependent: NodeId) {
        match self.entry_mut(source).map(|e| &mut e.state) {
            Some(SlotState::Value(node)) => {
                node.dependents.insert(dependent);
            }
            Some(SlotState::Expr(node)) => {
                node.dependents.insert(dependent);
            }
            _ => panic!("add_dependent on a non-source node"),
        }
    }

    pub(crate) fn remove_dependent(&mut self, source: NodeId, dependent: NodeId) {
        match self.entry_mut(source).map(|e| &mut e.state) {
            Some(SlotState::Value(node)) => {
                node.dependents.shift_remove(&dependent);
            }
            Some(SlotState::Expr(node)) => {
                node.dependents.shift_remove(&dependent);
            }
            // The source may have been released since the edge was recorded;
            // releasing a node does not eagerly scrub edges pointing at it.
            None => {}
            _ => panic!("remove_dependent on a non-source node"),
        }
    }

    /// Returns `source`'s dependents as a plain vector, for callers that need
    /// to iterate while also mutating the arena (borrow-splitting).
    pub(crate) fn dependents_snapshot(&self, source: NodeId) -> Vec<NodeId> {
        match self.entry(source).map(|e| &e.state) {
            Some(SlotState::Value(node)) => node.dependents.iter().copied().collect(),
            Some(SlotState::Expr(node)) => node.dependents.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Replaces `node`'s forward source set (used after harvesting a fresh
    /// read-set from a completed evaluation) and clears the reverse edges it
    /// previously held, returning the old set so the caller can remove the
    /// corresponding reverse edges on each former source.
    pub(crate) fn take_sources(&mut self, node: NodeId) -> FxIndexSet<NodeId> {
        match self.entry_mut(node).map(|e| &mut e.state) {
            Some(SlotState::Expr(expr)) => std::mem::take(&mut expr.sources),
            Some(SlotState::Observer(obs)) => std::mem::take(&mut obs.sources),
            _ => FxIndexSet::default(),
        }
    }

    pub(crate) fn set_sources(&mut self, node: NodeId, sources: FxIndexSet<NodeId>) {
        match self.entry_mut(node).map(|e| &mut e.state) {
            Some(SlotState::Expr(expr)) => expr.sources = sources,
            Some(SlotState::Observer(obs)) => obs.sources = sources,
            _ => panic!("set_sources on a node with no source set"),
        }
    }

    pub(crate) fn is_pending_observer(&self, id: NodeId) -> bool {
        match self.entry(id).map(|e| &e.state) {
            Some(SlotState::Observer(obs)) => obs.pending,
            _ => false,
        }
    }

    pub(crate) fn clear_pending(&mut self, id: NodeId) {
        if let Some(SlotState::Observer(obs)) = self.entry_mut(id).map(|e| &mut e.state) {
            obs.pending = false;
        }
    }

    /// Marks a node invalid (expression) or pending (observer), following
    /// the idempotency rule of spec §4.3/§4.4: a no-op if the node is
    /// already invalid/pending. Returns what the caller must do next.
    ///
    /// `currently_evaluating` tells an already-invalid expression whether
    /// this invalidation arrived *while its own tracking frame is still on
    /// the stack* (a source it already read got written mid-run). That
    /// signal can't just be dropped: it's recorded as `dirty_since_start` so
    /// `Runtime::evaluate_expr`/`ensure_valid` can act on it once the run
    /// completes instead of silently losing the write.
    pub(crate) fn mark_invalid(&mut self, id: NodeId, currently_evaluating: bool) -> Invalidated {
        match self.entry_mut(id).map(|e| &mut e.state) {
            Some(SlotState::Expr(expr)) => {
                if expr.valid {
                    expr.valid = false;
                    Invalidated::Expr(expr.dependents.iter().copied().collect())
                } else if currently_evaluating {
                    expr.dirty_since_start = true;
                    Invalidated::NoOp
                } else {
                    Invalidated::NoOp
                }
            }
            Some(SlotState::Observer(obs)) => {
                if obs.pending {
                    Invalidated::NoOp
                } else {
                    obs.pending = true;
                    Invalidated::Observer(id)
                }
            }
            _ => Invalidated::NoOp,
        }
    }

    pub(crate) fn exec_count(&self, id: NodeId) -> u64 {
        match self.entry(id).map(|e| &e.state) {
            Some(SlotState::Expr(expr)) => expr.exec_count,
            Some(SlotState::Observer(obs)) => obs.exec_count,
            _ => 0,
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|e| !matches!(e.state, SlotState::Free { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_slot_is_reused_with_a_new_generation() {
        let mut arena = Arena::new();
        let a = arena.alloc_value(ValueNode::new(Box::new(1i64)));
        arena.release(a);
        let b = arena.alloc_value(ValueNode::new(Box::new(2i64)));
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(!arena.is_live(a));
        assert!(arena.is_live(b));
    }

    #[test]
    fn mark_invalid_is_idempotent() {
        let mut arena = Arena::new();
        let id = arena.alloc_expr(ExprNode::new(std::rc::Rc::new(|| {
            Box::new(1i64) as Box<dyn crate::value::DynValue>
        })));
        arena.expr_mut(id).valid = true;
        assert!(matches!(arena.mark_invalid(id, false), Invalidated::Expr(_)));
        assert!(matches!(arena.mark_invalid(id, false), Invalidated::NoOp));
    }
}
