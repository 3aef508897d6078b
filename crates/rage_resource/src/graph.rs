//! Arena owning every block of a resource.
//!
//! Blocks refer to each other through [`BlockId`]s instead of owning
//! pointers, which lets a graph share nodes and contain cycles. While a
//! stream is being read a slot may be reserved before its block exists, so
//! that a back reference to a block still being populated resolves to the
//! same identity.

use std::any::type_name;

use tracing::trace;

use crate::address::VirtualAddress;
use crate::block::{BlockId, BlockKind, Handle, ResourceBlock};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Node {
    block: Option<Box<dyn ResourceBlock>>,
    position: Option<VirtualAddress>,
}

/// Storage for the blocks of one resource
#[derive(Debug, Default)]
pub struct ResourceGraph {
    nodes: Vec<Node>,
}

impl ResourceGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots in the graph, including ones still being read
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no blocks
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the identity of every slot
    pub fn ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.nodes.len()).map(BlockId)
    }

    /// Move a block into the graph
    pub fn insert<T: ResourceBlock>(&mut self, block: T) -> Handle<T> {
        let id = self.reserve();
        self.populate(id, Box::new(block));
        Handle::new(id)
    }

    /// Reserve a slot whose block will be provided later
    pub(crate) fn reserve(&mut self) -> BlockId {
        self.nodes.push(Node::default());
        BlockId(self.nodes.len() - 1)
    }

    pub(crate) fn populate(&mut self, id: BlockId, block: Box<dyn ResourceBlock>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.block = Some(block);
        }
    }

    /// Whether the slot holds a fully read block
    pub fn is_populated(&self, id: BlockId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.block.is_some())
    }

    /// Borrow a block without knowing its type
    pub fn block(&self, id: BlockId) -> Result<&dyn ResourceBlock> {
        self.nodes
            .get(id.0)
            .and_then(|n| n.block.as_deref())
            .ok_or(Error::IncompleteBlock(id))
    }

    /// Borrow a block through its typed handle
    pub fn get<T: ResourceBlock>(&self, handle: Handle<T>) -> Result<&T> {
        let block = self.block(handle.id())?;
        block
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| type_mismatch::<T>(handle.id()))
    }

    /// Mutably borrow a block through its typed handle
    pub fn get_mut<T: ResourceBlock>(&mut self, handle: Handle<T>) -> Result<&mut T> {
        let id = handle.id();
        let block = self
            .nodes
            .get_mut(id.0)
            .and_then(|n| n.block.as_deref_mut())
            .ok_or(Error::IncompleteBlock(id))?;
        block
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| type_mismatch::<T>(id))
    }

    /// The assigned position of a block, if any
    pub fn position(&self, id: BlockId) -> Option<VirtualAddress> {
        self.nodes.get(id.0).and_then(|n| n.position)
    }

    /// The assigned position of a block, failing if it has none
    pub fn address_of(&self, id: BlockId) -> Result<VirtualAddress> {
        self.position(id).ok_or(Error::UnassignedPosition(id))
    }

    /// Move a block, carrying its parts (and their parts) along with it.
    ///
    /// References keep their own positions. Fails if a part would land
    /// outside the segment of its parent.
    pub fn set_position(&mut self, id: BlockId, position: Option<VirtualAddress>) -> Result<()> {
        let mut stack = vec![(id, position)];
        while let Some((id, position)) = stack.pop() {
            let parts = self.parts(id);
            match self.nodes.get_mut(id.0) {
                Some(node) => node.position = position,
                None => continue,
            }

            trace!(block = %id, ?position, "position assigned");
            for (offset, part) in parts {
                stack.push((part, position.map(|p| p.offset(offset)).transpose()?));
            }
        }
        Ok(())
    }

    /// Byte length of a block; blocks still being read count as empty
    pub fn length(&self, id: BlockId) -> u64 {
        self.block(id).map_or(0, |b| b.length(self))
    }

    /// Segment kind of a block
    pub fn kind(&self, id: BlockId) -> BlockKind {
        self.block(id).map_or(BlockKind::System, |b| b.kind())
    }

    /// Embedded children of a block with their local offsets
    pub fn parts(&self, id: BlockId) -> Vec<(u64, BlockId)> {
        self.block(id).map_or_else(|_| Vec::new(), |b| b.parts(self))
    }

    /// Pointed-to children of a block, `None` marking null pointers
    pub fn references(&self, id: BlockId) -> Vec<Option<BlockId>> {
        self.block(id).map_or_else(|_| Vec::new(), |b| b.references())
    }
}

fn type_mismatch<T>(id: BlockId) -> Error {
    Error::CustomError(format!("block {id} is not a {}", type_name::<T>()))
}
