use std::hash::BuildHasherDefault;
use std::rc::Rc;

use indexmap::IndexSet;
use rustc_hash::FxHasher;

use crate::id::NodeId;
use crate::value::DynValue;

/// Ordered hash set keyed by `NodeId`, matching the `FxIndexSet` shape used
/// throughout the teacher's `runtime.rs` for read-set bookkeeping.
pub(crate) type FxIndexSet<K> = IndexSet<K, BuildHasherDefault<FxHasher>>;

/// A mutable storage cell (spec §3.1). No sources of its own.
pub(crate) struct ValueNode {
    pub(crate) value: Box<dyn DynValue>,
    pub(crate) dependents: FxIndexSet<NodeId>,
}

impl ValueNode {
    pub(crate) fn new(value: Box<dyn DynValue>) -> Self {
        ValueNode {
            value,
            dependents: FxIndexSet::default(),
        }
    }
}

/// A memoized computation (spec §3.2, §4.3).
pub(crate) struct ExprNode {
    pub(crate) compute: Rc<dyn Fn() -> Box<dyn DynValue>>,
    pub(crate) cached: Option<Box<dyn DynValue>>,
    pub(crate) valid: bool,
    /// Set when a source this node reads is written while this node's own
    /// evaluation is still on the tracking stack (a self-write or a
    /// terminating recursive self-read). Reset at the start of every
    /// evaluation; consulted at completion and by the cyclic-eager-cycle
    /// check in `Runtime::ensure_valid`.
    pub(crate) dirty_since_start: bool,
    pub(crate) sources: FxIndexSet<NodeId>,
    pub(crate) dependents: FxIndexSet<NodeId>,
    pub(crate) exec_count: u64,
}

impl ExprNode {
    pub(crate) fn new(compute: Rc<dyn Fn() -> Box<dyn DynValue>>) -> Self {
        ExprNode {
            compute,
            cached: None,
            valid: false,
            dirty_since_start: false,
            sources: FxIndexSet::default(),
            dependents: FxIndexSet::default(),
            exec_count: 0,
        }
    }
}

/// A side-effecting dependent scheduled by the flush engine (spec §3.3,
/// §4.4). Has no cached output and no outgoing edges: nothing may treat an
/// observer as a source.
pub(crate) struct ObserverNode {
    pub(crate) effect: Option<Box<dyn FnMut()>>,
    pub(crate) sources: FxIndexSet<NodeId>,
    pub(crate) pending: bool,
    pub(crate) exec_count: u64,
}

impl ObserverNode {
    pub(crate) fn new(effect: Box<dyn FnMut()>) -> Self {
        ObserverNode {
            effect: Some(effect),
            sources: FxIndexSet::default(),
            pending: true, // creation initially invalidates (spec §4.4)
            exec_count: 0,
        }
    }
}
