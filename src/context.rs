use smallvec::SmallVec;

use crate::id::NodeId;

/// A single frame of the context stack (spec §4.1).
enum Frame {
    /// The node currently being (re-)evaluated, accumulating the source ids
    /// it reads along the way. Harvested on pop and stored as the node's new
    /// source set.
    Tracking {
        node: NodeId,
        sources: SmallVec<[NodeId; 4]>,
    },
    /// Suppresses dependency registration for reads performed while this
    /// frame is topmost.
    Isolate,
}

/// Process-wide (in our case: per-`Runtime`), single-threaded stack of
/// evaluation frames.
#[derive(Default)]
pub(crate) struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    pub(crate) fn new() -> Self {
        ContextStack { frames: Vec::new() }
    }

    pub(crate) fn push_tracking(&mut self, node: NodeId) {
        self.frames.push(Frame::Tracking {
            node,
            sources: SmallVec::new(),
        });
    }

    /// Pops the topmost frame, which must be the tracking frame for `node`,
    /// and returns the source ids accumulated during its run.
    pub(crate) fn pop_tracking(&mut self, node: NodeId) -> SmallVec<[NodeId; 4]> {
        match self.frames.pop() {
            Some(Frame::Tracking { node: popped, sources }) => {
                debug_assert_eq!(popped, node, "context stack popped out of order");
                sources
            }
            _ => panic!("context stack corrupted: expected tracking frame for {:?}", node),
        }
    }

    pub(crate) fn push_isolate(&mut self) {
        self.frames.push(Frame::Isolate);
    }

    pub(crate) fn pop_isolate(&mut self) {
        match self.frames.pop() {
            Some(Frame::Isolate) => {}
            _ => panic!("context stack corrupted: expected isolate frame"),
        }
    }

    /// Returns the topmost tracking frame's node, unless the stack is empty
    /// or topped by an isolate frame.
    pub(crate) fn current_tracker(&self) -> Option<NodeId> {
        match self.frames.last() {
            Some(Frame::Tracking { node, .. }) => Some(*node),
            _ => None,
        }
    }

    /// Records a read of `source` against the topmost tracking frame, if any.
    /// Does nothing when masked by an isolate frame or when the stack is
    /// empty (an untracked top-level read).
    pub(crate) fn record_read(&mut self, source: NodeId) {
        if let Some(Frame::Tracking { sources, .. }) = self.frames.last_mut() {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
    }

    /// True if `node` has a tracking frame anywhere on the stack (used for
    /// cyclic-eager-cycle detection, spec §7).
    pub(crate) fn contains_tracking(&self, node: NodeId) -> bool {
        self.frames.iter().any(|frame| match frame {
            Frame::Tracking { node: n, .. } => *n == node,
            Frame::Isolate => false,
        })
    }
}
