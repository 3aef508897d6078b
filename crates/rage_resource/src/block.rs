//! The contract shared by every serializable participant of a resource graph.
//!
//! A block lives inside a [`ResourceGraph`] and is addressed by a [`BlockId`].
//! It may own *parts*, children physically embedded in its own byte range,
//! and *references*, children it only points to. Parts follow their parent
//! whenever its position changes, references are placed independently.

use std::any::Any;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek};
use std::marker::PhantomData;

use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::read::ResourceReader;
use crate::write::ResourceWriter;

/// Identity of a block inside a [`ResourceGraph`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// The slot index of the block inside its graph
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A [`BlockId`] that remembers the concrete type of the block it points at
pub struct Handle<T> {
    id: BlockId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) const fn new(id: BlockId) -> Self {
        Handle {
            id,
            _marker: PhantomData,
        }
    }

    /// The untyped identity of the block
    pub const fn id(self) -> BlockId {
        self.id
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.id)
    }
}

impl<T> From<Handle<T>> for BlockId {
    fn from(value: Handle<T>) -> Self {
        value.id
    }
}

/// Which address space a block is placed in
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BlockKind {
    /// Lives in the system segment and takes part in graph traversal
    #[default]
    System,

    /// Opaque leaf living in the graphics segment
    Graphics,
}

/// Access to the concrete type behind a `dyn ResourceBlock`
pub trait AsAny: Any {
    /// Borrow as [`Any`]
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as [`Any`]
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node of the resource graph that can be written back to a segment.
///
/// `write` must emit exactly `length` bytes.
pub trait ResourceBlock: AsAny + Debug {
    /// The segment this block is placed in
    fn kind(&self) -> BlockKind {
        BlockKind::System
    }

    /// The number of bytes this block occupies
    fn length(&self, graph: &ResourceGraph) -> u64;

    /// Emit the canonical byte representation at the writer's cursor
    fn write(&self, writer: &mut ResourceWriter<'_>, graph: &ResourceGraph) -> Result<()>;

    /// Children embedded in this block, with their offset from its start
    fn parts(&self, _graph: &ResourceGraph) -> Vec<(u64, BlockId)> {
        Vec::new()
    }

    /// Children this block points at; `None` marks a null pointer
    fn references(&self) -> Vec<Option<BlockId>> {
        Vec::new()
    }
}

/// A block that can be materialized from a segmented stream.
///
/// `Args` carries whatever the block can't find in its own bytes, such as an
/// element count stored in a parent header.
///
/// Polymorphic records are modelled as an enum whose [`ReadBlock::resolve_kind`]
/// peeks at a discriminator and returns the matching (empty) variant. The
/// variant's `read` then consumes the discriminator itself, so its bytes are
/// part of the variant's `length`.
pub trait ReadBlock: ResourceBlock + Default {
    /// Extra information required to read the block
    type Args;

    /// Select the concrete shape of the block before it is read
    fn resolve_kind<R: Read + Seek>(
        _reader: &mut ResourceReader<R>,
        _args: &Self::Args,
    ) -> Result<Self> {
        Ok(Self::default())
    }

    /// Consume the block's bytes starting at the reader's cursor
    fn read<R: Read + Seek>(&mut self, reader: &mut ResourceReader<R>, args: Self::Args)
        -> Result<()>;
}
