use std::num::NonZeroU32;

/// Identity of a node inside a [`crate::Runtime`]'s arena.
///
/// Slots are recycled when a node is released, so a `NodeId` also carries the
/// generation of the slot it was minted against; a handle whose generation no
/// longer matches the slot's current occupant refers to a node that no longer
/// exists (see [`crate::error::RuntimeError::StaleHandle`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId {
    index: u32,
    generation: NonZeroU32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: NonZeroU32) -> Self {
        NodeId { index, generation }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(self) -> NonZeroU32 {
        self.generation
    }
}
