use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic;
use std::rc::Rc;

use crate::arena::Arena;
use crate::context::ContextStack;
use crate::error::RuntimeError;
use crate::handle::{ExprHandle, ObserverHandle, ValueHandle};
use crate::id::NodeId;
use crate::node::{ExprNode, ObserverNode, ValueNode};
use crate::value::{DynValue, Payload};

/// Configuration accepted by [`Runtime::with_config`].
///
/// The only knob the core spec calls out as optional (§9, §5): a ceiling on
/// `flush()`'s fixed-point loop, for hosts that would rather fail fast on a
/// non-terminating graph than hang. Left unset (the default), `flush()`
/// behaves exactly as §4.4 describes: it loops until the queue is empty, with
/// no imposed bound.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub max_flush_iterations: Option<u32>,
}

struct Inner {
    arena: RefCell<Arena>,
    context: RefCell<ContextStack>,
    queue: RefCell<VecDeque<NodeId>>,
    config: RuntimeConfig,
}

/// The reactive engine: owns the node arena, the context stack, and the
/// pending-observer queue, and exposes the nine operations of the public
/// surface (spec §6).
///
/// `Runtime` is a cheap `Rc`-backed handle; clone it freely to capture inside
/// `create_expression`/`create_observer` closures so they can read and write
/// through the same engine they are part of. It is intentionally `!Send` and
/// `!Sync` (spec §5: single-threaded, cooperative scheduling is a hard
/// requirement, not just documentation).
#[derive(Clone)]
pub struct Runtime(Rc<Inner>);

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        log::debug!("runtime created (max_flush_iterations = {:?})", config.max_flush_iterations);
        Runtime(Rc::new(Inner {
            arena: RefCell::new(Arena::new()),
            context: RefCell::new(ContextStack::new()),
            queue: RefCell::new(VecDeque::new()),
            config,
        }))
    }

    // ---- creation -------------------------------------------------------

    pub fn create_value<T: Payload>(&self, initial: T) -> ValueHandle<T> {
        let id = self.0.arena.borrow_mut().alloc_value(ValueNode::new(Box::new(initial)));
        log::trace!("create_value -> {:?}", id);
        ValueHandle::new(id)
    }

    pub fn create_expression<T, F>(&self, f: F) -> ExprHandle<T>
    where
        T: Payload,
        F: Fn() -> T + 'static,
    {
        let compute: Rc<dyn Fn() -> Box<dyn DynValue>> = Rc::new(move || Box::new(f()) as Box<dyn DynValue>);
        let id = self.0.arena.borrow_mut().alloc_expr(ExprNode::new(compute));
        log::trace!("create_expression -> {:?}", id);
        ExprHandle::new(id)
    }

    pub fn create_observer<G>(&self, g: G) -> ObserverHandle
    where
        G: FnMut() + 'static,
    {
        let id = self.0.arena.borrow_mut().alloc_observer(ObserverNode::new(Box::new(g)));
        log::trace!("create_observer -> {:?} (enqueued)", id);
        self.0.queue.borrow_mut().push_back(id);
        ObserverHandle::new(id)
    }

    // ---- value node -------------------------------------------------------

    pub fn read_value<T: Payload>(&self, handle: ValueHandle<T>) -> Result<T, RuntimeError> {
        self.check_live(handle.id)?;
        let value = {
            let arena = self.0.arena.borrow();
            arena
                .value(handle.id)
                .value
                .downcast_ref::<T>()
                .expect("ValueHandle<T> type mismatch")
                .clone()
        };
        self.register_read(handle.id);
        Ok(value)
    }

    pub fn write_value<T: Payload>(&self, handle: ValueHandle<T>, new: T) -> Result<(), RuntimeError> {
        self.check_live(handle.id)?;
        let changed = {
            let mut arena = self.0.arena.borrow_mut();
            let node = arena.value_mut(handle.id);
            let changed = !node.value.dyn_eq(&new as &dyn DynValue);
            if changed {
                node.value = Box::new(new);
            }
            changed
        };
        if changed {
            log::trace!("write_value {:?} changed; invalidating dependents", handle.id);
            let dependents = self.0.arena.borrow().dependents_snapshot(handle.id);
            for dependent in dependents {
                self.invalidate(dependent);
            }
        }
        Ok(())
    }

    // ---- expression node ---------------------------------------------------

    pub fn read_expression<T: Payload>(&self, handle: ExprHandle<T>) -> Result<T, RuntimeError> {
        self.check_live(handle.id)?;
        // Wire the pulling context as a dependent *before* (re-)computing,
        // not after: an expression that writes a value it also reads during
        // its own first evaluation must be able to reach the context
        // pulling it (spec §4.2/§4.4), and that context is only a dependent
        // once this edge exists.
        self.register_read(handle.id);
        self.ensure_valid(handle.id)?;
        let arena = self.0.arena.borrow();
        let cached = arena
            .expr(handle.id)
            .cached
            .as_ref()
            .expect("expression marked valid with no cached value");
        Ok(cached
            .downcast_ref::<T>()
            .expect("ExprHandle<T> type mismatch")
            .clone())
    }

    fn ensure_valid(&self, id: NodeId) -> Result<(), RuntimeError> {
        let valid = self.0.arena.borrow().expr(id).valid;
        if valid {
            return Ok(());
        }
        if self.0.context.borrow().contains_tracking(id) {
            // Cyclic eager cycle (spec §7): this node's own tracking frame
            // is already on the stack. If a source it already read has been
            // written since this run started, re-running it makes forward
            // progress (a self-writing or terminating recursive definition)
            // rather than looping, so let it recurse. Otherwise it really is
            // a non-progressing cycle: fall back to the previous cached
            // result if one exists, or fail.
            let dirty = self.0.arena.borrow().expr(id).dirty_since_start;
            if dirty {
                self.evaluate_expr(id);
                return Ok(());
            }
            let has_cache = self.0.arena.borrow().expr(id).cached.is_some();
            return if has_cache {
                Ok(())
            } else {
                Err(RuntimeError::CyclicReadNotYetComputed)
            };
        }
        self.evaluate_expr(id);
        Ok(())
    }

    fn evaluate_expr(&self, id: NodeId) {
        self.clear_sources(id);
        self.0.arena.borrow_mut().expr_mut(id).dirty_since_start = false;
        self.0.context.borrow_mut().push_tracking(id);
        let compute = self.0.arena.borrow().expr(id).compute.clone();
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| compute()));
        let harvested = self.0.context.borrow_mut().pop_tracking(id);

        match result {
            Ok(new_value) => {
                let dependents = {
                    let mut arena = self.0.arena.borrow_mut();
                    arena.set_sources(id, harvested.into_iter().collect());
                    let expr = arena.expr_mut(id);
                    expr.exec_count += 1;
                    // A source this node read was written during this very
                    // run (possibly by a nested recursive re-evaluation of
                    // this same node): leave it invalid so the next read
                    // re-runs it, and force propagation below regardless of
                    // cache equality (spec §4.2/§4.4).
                    let dirty = expr.dirty_since_start;
                    expr.dirty_since_start = false;
                    let changed = match &expr.cached {
                        Some(old) => !old.dyn_eq(new_value.as_ref()),
                        None => true,
                    };
                    expr.cached = Some(new_value);
                    expr.valid = !dirty;
                    if changed || dirty {
                        expr.dependents.iter().copied().collect::<Vec<_>>()
                    } else {
                        Vec::new()
                    }
                };
                log::trace!("expression {:?} evaluated (exec_count bumped)", id);
                for dependent in dependents {
                    self.invalidate(dependent);
                }
            }
            Err(payload) => {
                let mut arena = self.0.arena.borrow_mut();
                for source in &harvested {
                    arena.remove_dependent(*source, id);
                }
                arena.expr_mut(id).dirty_since_start = false;
                drop(arena);
                log::debug!("expression {:?} panicked; left invalid", id);
                panic::resume_unwind(payload);
            }
        }
    }

    // ---- observer node ------------------------------------------------------

    fn evaluate_observer(&self, id: NodeId) {
        self.clear_sources(id);
        self.0.context.borrow_mut().push_tracking(id);
        let mut effect = self
            .0
            .arena
            .borrow_mut()
            .observer_mut(id)
            .effect
            .take()
            .expect("observer re-entered synchronously");
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| effect()));
        self.0.arena.borrow_mut().observer_mut(id).effect = Some(effect);
        let harvested = self.0.context.borrow_mut().pop_tracking(id);

        match result {
            Ok(()) => {
                let mut arena = self.0.arena.borrow_mut();
                arena.set_sources(id, harvested.into_iter().collect());
                arena.observer_mut(id).exec_count += 1;
                log::trace!("observer {:?} evaluated", id);
            }
            Err(payload) => {
                let mut arena = self.0.arena.borrow_mut();
                for source in &harvested {
                    arena.remove_dependent(*source, id);
                }
                drop(arena);
                log::debug!("observer {:?} panicked", id);
                panic::resume_unwind(payload);
            }
        }
    }

    /// Drains the pending-observer queue to a fixed point (spec §4.4).
    pub fn flush(&self) -> Result<(), RuntimeError> {
        let mut iterations: u32 = 0;
        loop {
            let next = self.0.queue.borrow_mut().pop_front();
            let id = match next {
                Some(id) => id,
                None => break,
            };
            if !self.0.arena.borrow().is_pending_observer(id) {
                continue;
            }
            // Mark clean before evaluating: a self-triggered invalidation
            // during this very evaluation must be able to re-enqueue the
            // node for a later pass (see SPEC_FULL.md §4.4).
            self.0.arena.borrow_mut().clear_pending(id);
            iterations += 1;
            if let Some(max) = self.0.config.max_flush_iterations {
                if iterations > max {
                    return Err(RuntimeError::FlushDidNotConverge { iterations });
                }
            }
            self.evaluate_observer(id);
        }
        log::trace!("flush() reached a fixed point after {} observer evaluations", iterations);
        Ok(())
    }

    // ---- context stack ------------------------------------------------------

    /// Runs `thunk` with dependency registration suppressed (spec §4.1, §6).
    pub fn isolate<R>(&self, thunk: impl FnOnce() -> R) -> R {
        self.0.context.borrow_mut().push_isolate();
        let result = panic::catch_unwind(panic::AssertUnwindSafe(thunk));
        self.0.context.borrow_mut().pop_isolate();
        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn register_read(&self, source: NodeId) {
        let tracker = self.0.context.borrow().current_tracker();
        // A node reading itself (the cyclic-eager-cycle case, §7) never
        // gets a dependent edge onto itself: self-invalidation is handled
        // directly by `evaluate_expr`'s `dirty_since_start` tracking, not by
        // the generic dependent-propagation path.
        if let Some(tracker) = tracker {
            if tracker != source {
                self.0.context.borrow_mut().record_read(source);
                self.0.arena.borrow_mut().add_dependent(source, tracker);
            }
        }
    }

    fn clear_sources(&self, node: NodeId) {
        let old = self.0.arena.borrow_mut().take_sources(node);
        for source in old {
            self.0.arena.borrow_mut().remove_dependent(source, node);
        }
    }

    fn invalidate(&self, id: NodeId) {
        let currently_evaluating = self.0.context.borrow().contains_tracking(id);
        match self.0.arena.borrow_mut().mark_invalid(id, currently_evaluating) {
            crate::arena::Invalidated::NoOp => {}
            crate::arena::Invalidated::Expr(dependents) => {
                for dependent in dependents {
                    self.invalidate(dependent);
                }
            }
            crate::arena::Invalidated::Observer(id) => {
                self.0.queue.borrow_mut().push_back(id);
            }
        }
    }

    // ---- diagnostics & lifecycle ---------------------------------------------

    /// Diagnostic-only execution counter (spec §6).
    pub fn exec_count<H: ExecCounted>(&self, handle: H) -> u64 {
        self.0.arena.borrow().exec_count(handle.node_id())
    }

    pub fn release_value<T>(&self, handle: ValueHandle<T>) {
        self.0.arena.borrow_mut().release(handle.id);
    }

    pub fn release_expression<T>(&self, handle: ExprHandle<T>) {
        self.0.arena.borrow_mut().release(handle.id);
    }

    pub fn release_observer(&self, handle: ObserverHandle) {
        self.0.arena.borrow_mut().release(handle.id);
    }

    pub fn node_count(&self) -> usize {
        self.0.arena.borrow().node_count()
    }

    pub fn pending_count(&self) -> usize {
        self.0.queue.borrow().len()
    }

    fn check_live(&self, id: NodeId) -> Result<(), RuntimeError> {
        if self.0.arena.borrow().is_live(id) {
            Ok(())
        } else {
            Err(RuntimeError::StaleHandle)
        }
    }
}

/// Sealed trait letting [`Runtime::exec_count`] accept either an
/// [`ExprHandle`] or an [`ObserverHandle`]; value nodes have no function
/// body and so no execution count.
pub trait ExecCounted: Copy {
    #[doc(hidden)]
    fn node_id(self) -> NodeId;
}

impl<T> ExecCounted for ExprHandle<T> {
    fn node_id(self) -> NodeId {
        self.id
    }
}

impl ExecCounted for ObserverHandle {
    fn node_id(self) -> NodeId {
        self.id
    }
}
