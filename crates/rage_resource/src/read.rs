//! Types for reading resource graphs out of segmented streams
//!

use std::any::TypeId;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use binrw::Endian;
use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use crate::address::{Segment, VirtualAddress};
use crate::block::{BlockId, Handle, ReadBlock};
use crate::error::Result;
use crate::graph::ResourceGraph;

/// Reader over the virtual address space of a resource.
///
/// The reader owns a single cursor addressing both segment stores. Every
/// block it materializes is registered in its [`ResourceGraph`] under the
/// address it was read from, so two pointers to the same address yield the
/// same block and reference cycles terminate.
///
/// ```
/// use std::io::Cursor;
/// use binrw::Endian;
/// use rage_resource::{read::ResourceReader, scalar::StringBlock};
///
/// # fn doit() -> rage_resource::error::Result<()> {
/// let system = Cursor::new(b"hello\0".to_vec());
/// let graphics = Cursor::new(Vec::new());
///
/// let mut reader = ResourceReader::new(system, graphics, Endian::Little);
/// let name = reader.read_block::<StringBlock>(())?;
/// assert_eq!(reader.graph().get(name)?.as_str(), "hello");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct ResourceReader<R> {
    system: R,
    graphics: R,
    endian: Endian,
    position: VirtualAddress,
    cache: HashMap<(VirtualAddress, TypeId), BlockId>,
    graph: ResourceGraph,
}

impl<R: Read + Seek> ResourceReader<R> {
    /// Create a reader positioned at the start of the system segment
    pub fn new(system: R, graphics: R, endian: Endian) -> Self {
        ResourceReader {
            system,
            graphics,
            endian,
            position: Segment::System.base(),
            cache: HashMap::new(),
            graph: ResourceGraph::new(),
        }
    }

    /// The byte order used for multi-byte scalars
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// The current virtual cursor
    pub fn position(&self) -> VirtualAddress {
        self.position
    }

    /// Move the virtual cursor
    pub fn seek(&mut self, position: VirtualAddress) {
        self.position = position;
    }

    /// Advance the virtual cursor without reading
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.position = self.position.offset(count)?;
        Ok(())
    }

    /// The graph built so far
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Finish reading and take the graph
    pub fn into_graph(self) -> ResourceGraph {
        self.graph
    }

    /// Run `f` and put the cursor back where it was afterwards
    pub fn peek<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let backup = self.position;
        let result = f(self);
        self.position = backup;
        result
    }

    /// Read `width` bytes from the segment owning the cursor.
    ///
    /// Unless `ignore_endianness` is set, big endian data is reversed so the
    /// result is always in little endian order.
    pub fn read_primitive(&mut self, width: usize, ignore_endianness: bool) -> Result<Vec<u8>> {
        let (segment, physical) = self.position.decode()?;
        let store = match segment {
            Segment::System => &mut self.system,
            Segment::Graphics => &mut self.graphics,
        };

        store.seek(SeekFrom::Start(physical))?;
        let mut buffer = vec![0u8; width];
        store.read_exact(&mut buffer)?;

        if !ignore_endianness && self.endian == Endian::Big {
            buffer.reverse();
        }

        self.position = VirtualAddress::new(segment, physical + width as u64)?;
        Ok(buffer)
    }

    /// Read raw bytes, never reordered
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        self.read_primitive(count, true)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_primitive(1, true)?[0])
    }

    /// Read a `u16` in the reader's byte order
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(&self.read_primitive(2, false)?))
    }

    /// Read a `u32` in the reader's byte order
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(&self.read_primitive(4, false)?))
    }

    /// Read a `u64` in the reader's byte order
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(&self.read_primitive(8, false)?))
    }

    /// Read an IEEE 754 `f32` in the reader's byte order
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(&self.read_primitive(4, false)?))
    }

    /// Read a null terminated UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let mut raw = Vec::new();
        loop {
            let char = self.read_u8()?;
            if char == b'\0' {
                break;
            }
            raw.push(char);
        }
        Ok(String::from_utf8(raw)?)
    }

    /// Read a block of type `T` at the cursor.
    ///
    /// A `T` already read from this address is returned as is and the cursor
    /// skips over it. Otherwise the slot is registered before the block is
    /// read, so references back to this address resolve to the same block
    /// even while it is still being populated.
    ///
    /// A block still being populated has no length yet and the cursor stays
    /// on its address. Such hits come from pointers back into an unfinished
    /// block, followed through [`ResourceReader::read_block_at`], which puts
    /// the cursor back afterwards.
    pub fn read_block<T: ReadBlock>(&mut self, args: T::Args) -> Result<Handle<T>> {
        let address = self.position;
        let key = (address, TypeId::of::<T>());

        if let Some(&id) = self.cache.get(&key) {
            trace!(%address, block = %id, populated = self.graph.is_populated(id), "block cache hit");
            self.position = address.offset(self.graph.length(id))?;
            return Ok(Handle::new(id));
        }

        let id = self.graph.reserve();
        self.cache.insert(key, id);
        trace!(%address, block = %id, kind = std::any::type_name::<T>(), "reading block");

        let mut block = T::resolve_kind(self, &args)?;
        block.read(self, args)?;

        self.graph.populate(id, Box::new(block));
        self.graph.set_position(id, Some(address))?;

        Ok(Handle::new(id))
    }

    /// Follow a pointer and read the block it points at.
    ///
    /// A null pointer yields `None`. The cursor is left where it was.
    pub fn read_block_at<T: ReadBlock>(
        &mut self,
        address: u64,
        args: T::Args,
    ) -> Result<Option<Handle<T>>> {
        if address == 0 {
            return Ok(None);
        }

        let backup = self.position;
        self.position = VirtualAddress::from_raw(address);
        let result = self.read_block::<T>(args);
        self.position = backup;

        result.map(Some)
    }
}
