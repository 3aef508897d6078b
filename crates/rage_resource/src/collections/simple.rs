//! Containers whose elements are stored inline, back to back.

use std::io::{Read, Seek};
use std::marker::PhantomData;

use derive_more::derive::{Deref, DerefMut};

use crate::block::{BlockId, Handle, ReadBlock, ResourceBlock};
use crate::collections::{list_count, BlockVec, ListHeader, PointerWidth, Ptr32, Ptr64};
use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::read::ResourceReader;
use crate::write::ResourceWriter;

/// Blocks of type `T` serialized one after the other.
///
/// Every element is a part of the array: its position is the array's
/// position plus the lengths of the elements before it.
#[derive(Debug, Deref, DerefMut)]
pub struct SimpleArray<T> {
    items: BlockVec<Handle<T>>,
}

impl<T> Default for SimpleArray<T> {
    fn default() -> Self {
        SimpleArray {
            items: BlockVec::new(),
        }
    }
}

impl<T> SimpleArray<T> {
    /// An empty array
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> FromIterator<Handle<T>> for SimpleArray<T> {
    fn from_iter<I: IntoIterator<Item = Handle<T>>>(iter: I) -> Self {
        SimpleArray {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T: ResourceBlock> ResourceBlock for SimpleArray<T> {
    fn length(&self, graph: &ResourceGraph) -> u64 {
        self.items.iter().map(|h| graph.length(h.id())).sum()
    }

    fn write(&self, writer: &mut ResourceWriter<'_>, graph: &ResourceGraph) -> Result<()> {
        for item in &self.items {
            graph.block(item.id())?.write(writer, graph)?;
        }
        Ok(())
    }

    fn parts(&self, graph: &ResourceGraph) -> Vec<(u64, BlockId)> {
        let mut offset = 0;
        self.items
            .iter()
            .map(|h| {
                let part = (offset, h.id());
                offset += graph.length(h.id());
                part
            })
            .collect()
    }
}

impl<T: ReadBlock<Args = ()>> ReadBlock for SimpleArray<T> {
    /// Number of elements in the array
    type Args = usize;

    fn read<R: Read + Seek>(&mut self, reader: &mut ResourceReader<R>, count: usize) -> Result<()> {
        self.items = BlockVec::new();
        for _ in 0..count {
            let item = reader.read_block::<T>(())?;
            self.items.push(item);
        }
        Ok(())
    }
}

/// A `{pointer, count, capacity}` header referencing a [`SimpleArray`]
#[derive(Debug)]
pub struct SimpleList<T, P = Ptr64> {
    entries: Option<Handle<SimpleArray<T>>>,
    _width: PhantomData<P>,
}

/// A simple list with a 32-bit header
pub type SimpleList32<T> = SimpleList<T, Ptr32>;
/// A simple list with a 64-bit header
pub type SimpleList64<T> = SimpleList<T, Ptr64>;

impl<T, P> Default for SimpleList<T, P> {
    fn default() -> Self {
        SimpleList {
            entries: None,
            _width: PhantomData,
        }
    }
}

impl<T: ResourceBlock, P: PointerWidth> SimpleList<T, P> {
    /// A list with no array; one is created on the first [`SimpleList::items_mut`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list over an array already in the graph
    pub fn with_entries(entries: Handle<SimpleArray<T>>) -> Self {
        SimpleList {
            entries: Some(entries),
            _width: PhantomData,
        }
    }

    /// The array holding the elements, absent for a list never written to
    pub fn entries(&self) -> Option<Handle<SimpleArray<T>>> {
        self.entries
    }

    /// The elements of the list, empty when the array is absent
    pub fn items<'g>(&self, graph: &'g ResourceGraph) -> Result<&'g [Handle<T>]> {
        match self.entries {
            Some(entries) => Ok(graph.get(entries)?.as_slice()),
            None => Ok(&[]),
        }
    }

    /// Mutable access to the elements of `list`, creating the array on first use
    pub fn items_mut(graph: &mut ResourceGraph, list: Handle<Self>) -> Result<&mut SimpleArray<T>> {
        let entries = match graph.get(list)?.entries {
            Some(entries) => entries,
            None => {
                let entries = graph.insert(SimpleArray::new());
                graph.get_mut(list)?.entries = Some(entries);
                entries
            }
        };
        graph.get_mut(entries)
    }
}

impl<T: ResourceBlock, P: PointerWidth> ResourceBlock for SimpleList<T, P> {
    fn length(&self, _graph: &ResourceGraph) -> u64 {
        P::header_length()
    }

    fn write(&self, writer: &mut ResourceWriter<'_>, graph: &ResourceGraph) -> Result<()> {
        let header = match self.entries {
            Some(entries) => ListHeader {
                pointer: graph.address_of(entries.id())?.raw(),
                count: list_count(graph.get(entries)?.len())?,
            },
            None => ListHeader {
                pointer: 0,
                count: 0,
            },
        };
        header.write::<P>(writer)
    }

    fn references(&self) -> Vec<Option<BlockId>> {
        vec![self.entries.map(Handle::id)]
    }
}

impl<T: ReadBlock<Args = ()>, P: PointerWidth> ReadBlock for SimpleList<T, P> {
    type Args = ();

    fn read<R: Read + Seek>(&mut self, reader: &mut ResourceReader<R>, _args: ()) -> Result<()> {
        let header = ListHeader::read::<P, R>(reader)?;
        self.entries = reader.read_block_at::<SimpleArray<T>>(header.pointer, header.count as usize)?;
        Ok(())
    }
}
