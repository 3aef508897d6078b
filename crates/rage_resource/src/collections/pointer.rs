//! Containers whose elements live out of line behind pointers.

use std::io::{Read, Seek};
use std::marker::PhantomData;

use derive_more::derive::{Deref, DerefMut};

use crate::block::{BlockId, Handle, ReadBlock, ResourceBlock};
use crate::collections::{list_count, BlockVec, ListHeader, PointerWidth, Ptr32, Ptr64};
use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::read::ResourceReader;
use crate::write::ResourceWriter;

/// A table of pointers to blocks of type `T`; null entries are `None`
#[derive(Debug, Deref, DerefMut)]
pub struct PointerArray<T, P = Ptr64> {
    #[deref]
    #[deref_mut]
    items: BlockVec<Option<Handle<T>>>,
    _width: PhantomData<P>,
}

/// A pointer table of 32-bit addresses
pub type PointerArray32<T> = PointerArray<T, Ptr32>;
/// A pointer table of 64-bit addresses
pub type PointerArray64<T> = PointerArray<T, Ptr64>;

impl<T, P> Default for PointerArray<T, P> {
    fn default() -> Self {
        PointerArray {
            items: BlockVec::new(),
            _width: PhantomData,
        }
    }
}

impl<T, P> PointerArray<T, P> {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries that are not null
    pub fn non_empty_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_some()).count()
    }
}

impl<T, P> FromIterator<Option<Handle<T>>> for PointerArray<T, P> {
    fn from_iter<I: IntoIterator<Item = Option<Handle<T>>>>(iter: I) -> Self {
        PointerArray {
            items: iter.into_iter().collect(),
            _width: PhantomData,
        }
    }
}

impl<T: ResourceBlock, P: PointerWidth> ResourceBlock for PointerArray<T, P> {
    fn length(&self, _graph: &ResourceGraph) -> u64 {
        self.items.len() as u64 * P::SIZE
    }

    fn write(&self, writer: &mut ResourceWriter<'_>, graph: &ResourceGraph) -> Result<()> {
        for item in &self.items {
            let pointer = match item {
                Some(handle) => graph.address_of(handle.id())?.raw(),
                None => 0,
            };
            P::write_pointer(writer, pointer)?;
        }
        Ok(())
    }

    fn references(&self) -> Vec<Option<BlockId>> {
        self.items.iter().map(|i| i.map(Handle::id)).collect()
    }
}

impl<T: ReadBlock<Args = ()>, P: PointerWidth> ReadBlock for PointerArray<T, P> {
    /// Number of pointers in the table
    type Args = usize;

    fn read<R: Read + Seek>(&mut self, reader: &mut ResourceReader<R>, count: usize) -> Result<()> {
        self.items = BlockVec::new();
        for _ in 0..count {
            let pointer = P::read_pointer(reader)?;
            let item = reader.read_block_at::<T>(pointer, ())?;
            self.items.push(item);
        }
        Ok(())
    }
}

/// A `{pointer, count, capacity}` header referencing a [`PointerArray`]
#[derive(Debug)]
pub struct PointerList<T, P = Ptr64> {
    entries: Option<Handle<PointerArray<T, P>>>,
}

/// A pointer list with a 32-bit header
pub type PointerList32<T> = PointerList<T, Ptr32>;
/// A pointer list with a 64-bit header
pub type PointerList64<T> = PointerList<T, Ptr64>;

impl<T, P> Default for PointerList<T, P> {
    fn default() -> Self {
        PointerList { entries: None }
    }
}

impl<T: ResourceBlock, P: PointerWidth> PointerList<T, P> {
    /// A list with no table; one is created on the first [`PointerList::items_mut`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list over an array already in the graph
    pub fn with_entries(entries: Handle<PointerArray<T, P>>) -> Self {
        PointerList {
            entries: Some(entries),
        }
    }

    /// The table holding the entries, absent for a list never written to
    pub fn entries(&self) -> Option<Handle<PointerArray<T, P>>> {
        self.entries
    }

    /// The entries of the list, empty when the table is absent
    pub fn items<'g>(&self, graph: &'g ResourceGraph) -> Result<&'g [Option<Handle<T>>]> {
        match self.entries {
            Some(entries) => Ok(graph.get(entries)?.as_slice()),
            None => Ok(&[]),
        }
    }

    /// Mutable access to the entries of `list`, creating the table on first use
    pub fn items_mut(
        graph: &mut ResourceGraph,
        list: Handle<Self>,
    ) -> Result<&mut PointerArray<T, P>> {
        let entries = match graph.get(list)?.entries {
            Some(entries) => entries,
            None => {
                let entries = graph.insert(PointerArray::new());
                graph.get_mut(list)?.entries = Some(entries);
                entries
            }
        };
        graph.get_mut(entries)
    }
}

impl<T: ResourceBlock, P: PointerWidth> ResourceBlock for PointerList<T, P> {
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

impl<T: ReadBlock<Args = ()>, P: PointerWidth> ReadBlock for PointerList<T, P> {
    type Args = ();

    fn read<R: Read + Seek>(&mut self, reader: &mut ResourceReader<R>, _args: ()) -> Result<()> {
        let header = ListHeader::read::<P, R>(reader)?;
        self.entries =
            reader.read_block_at::<PointerArray<T, P>>(header.pointer, header.count as usize)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::Endian;
    use pretty_assertions::assert_eq;

    use crate::address::{Segment, VirtualAddress};
    use crate::block::Handle;
    use crate::collections::{PointerArray32, PointerArray64, PointerList32, PointerList64};
    use crate::error::{Error, Result};
    use crate::graph::ResourceGraph;
    use crate::read::ResourceReader;
    use crate::scalar::U32Block;
    use crate::write::ResourceWriter;

    #[test]
    fn read_pointer_array_with_nulls() -> Result<()> {
        #[rustfmt::skip]
        let system = vec![
            0x00, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x50,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0xEF, 0xBE, 0xAD, 0xDE,
        ];
        let mut reader = ResourceReader::new(Cursor::new(system), Cursor::new(Vec::new()), Endian::Little);

        let array = reader.read_block::<PointerArray32<U32Block>>(3)?;
        assert_eq!(reader.position().raw(), 0x5000_000C);

        let graph = reader.into_graph();
        let array = graph.get(array)?;
        assert_eq!(array.len(), 3);
        assert_eq!(array.non_empty_count(), 1);
        assert!(array.get(0).is_some_and(|i| i.is_none()));
        assert!(array.get(2).is_some_and(|i| i.is_none()));

        let middle = array.get(1).copied().flatten().expect("middle entry is present");
        assert_eq!(graph.get(middle)?.0, 0xDEADBEEF);
        assert_eq!(graph.position(middle.id()), Some(VirtualAddress::from_raw(0x5000_0010)));

        Ok(())
    }

    #[test]
    fn read_pointer_list_64() -> Result<()> {
        #[rustfmt::skip]
        let system = vec![
            // header
            0x10, 0x00, 0x00, 0x50, 0x00, 0x00, 0x00, 0x00,
            0x02, 0x00,
            0x04, 0x00,
            0x00, 0x00, 0x00, 0x00,
            // table
            0x20, 0x00, 0x00, 0x50, 0x00, 0x00, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x50, 0x00, 0x00, 0x00, 0x00,
            // element
            0x07, 0x00, 0x00, 0x00,
        ];
        let mut reader = ResourceReader::new(Cursor::new(system), Cursor::new(Vec::new()), Endian::Little);

        let list = reader.read_block::<PointerList64<U32Block>>(())?;
        assert_eq!(reader.position().raw(), 0x5000_0010);

        let graph = reader.into_graph();
        let items = graph.get(list)?.items(&graph)?;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], items[1]);
        assert_eq!(graph.length(list.id()), 16);

        Ok(())
    }

    #[test]
    fn empty_list_has_no_table() -> Result<()> {
        let system = vec![0x00; 8];
        let mut reader = ResourceReader::new(Cursor::new(system), Cursor::new(Vec::new()), Endian::Little);

        let list = reader.read_block::<PointerList32<U32Block>>(())?;
        let graph = reader.into_graph();

        assert_eq!(graph.get(list)?.entries(), None);
        assert!(graph.get(list)?.items(&graph)?.is_empty());
        assert_eq!(graph.references(list.id()), vec![None]);

        Ok(())
    }

    #[test]
    fn write_pointer_list_mirrors_count() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let element = graph.insert(U32Block(1));
        let list = graph.insert(PointerList32::<U32Block>::new());

        let items = PointerList32::items_mut(&mut graph, list)?;
        items.push(Some(element));
        items.push(None);
        items.push(Some(element));
        let entries = graph.get(list)?.entries().expect("table was created");

        graph.set_position(list.id(), Some(VirtualAddress::new(Segment::System, 0)?))?;
        graph.set_position(entries.id(), Some(VirtualAddress::new(Segment::System, 0x40)?))?;
        graph.set_position(element.id(), Some(VirtualAddress::new(Segment::System, 0x80)?))?;

        let mut system = Cursor::new(Vec::new());
        let mut graphics = Cursor::new(Vec::new());
        let mut writer = ResourceWriter::new(&mut system, &mut graphics, Endian::Little);
        writer.write_block(&graph, list.id())?;
        writer.write_block(&graph, entries.id())?;

        #[rustfmt::skip]
        let header = vec![
            0x40, 0x00, 0x00, 0x50,
            0x03, 0x00,
            0x03, 0x00,
        ];
        #[rustfmt::skip]
        let table = vec![
            0x80, 0x00, 0x00, 0x50,
            0x00, 0x00, 0x00, 0x00,
            0x80, 0x00, 0x00, 0x50,
        ];

        let system = system.into_inner();
        assert_eq!(system[0x00..0x08].to_vec(), header);
        assert_eq!(system[0x40..0x4C].to_vec(), table);

        Ok(())
    }

    #[test]
    fn write_unplaced_reference_fails() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let element = graph.insert(U32Block(1));
        let array: PointerArray64<U32Block> = [Some(element)].into_iter().collect();
        let array = graph.insert(array);
        graph.set_position(array.id(), Some(VirtualAddress::new(Segment::System, 0)?))?;

        let mut system = Cursor::new(Vec::new());
        let mut graphics = Cursor::new(Vec::new());
        let mut writer = ResourceWriter::new(&mut system, &mut graphics, Endian::Little);

        assert!(matches!(
            writer.write_block(&graph, array.id()),
            Err(Error::UnassignedPosition(id)) if id == element.id()
        ));

        Ok(())
    }

    #[test]
    fn references_follow_item_order() {
        let mut graph = ResourceGraph::new();
        let first = graph.insert(U32Block(1));
        let second = graph.insert(U32Block(2));

        let array: PointerArray64<U32Block> = [Some(second), None, Some(first)].into_iter().collect();
        let array: Handle<PointerArray64<U32Block>> = graph.insert(array);

        assert_eq!(
            graph.references(array.id()),
            vec![Some(second.id()), None, Some(first.id())]
        );
        assert_eq!(graph.length(array.id()), 24);
    }
}
