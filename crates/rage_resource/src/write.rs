//! Types for writing resource graphs into segmented streams
//!

use std::io::{Seek, SeekFrom, Write};

use binrw::Endian;
use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

use crate::address::{Segment, VirtualAddress};
use crate::block::BlockId;
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;

/// A seekable byte sink usable as a segment store
pub trait WriteSeek: Write + Seek {}

impl<T: Write + Seek> WriteSeek for T {}

/// Writer over the virtual address space of a resource.
///
/// Mirrors [`crate::read::ResourceReader`] without an instance cache: every
/// call serializes unconditionally. Block positions must have been assigned
/// (see [`crate::layout::PageAllocator`]) before blocks are written.
pub struct ResourceWriter<'a> {
    system: &'a mut dyn WriteSeek,
    graphics: &'a mut dyn WriteSeek,
    endian: Endian,
    position: VirtualAddress,
}

impl<'a> ResourceWriter<'a> {
    /// Create a writer positioned at the start of the system segment
    pub fn new(
        system: &'a mut dyn WriteSeek,
        graphics: &'a mut dyn WriteSeek,
        endian: Endian,
    ) -> Self {
        ResourceWriter {
            system,
            graphics,
            endian,
            position: Segment::System.base(),
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

    /// Write `value` to the segment owning the cursor.
    ///
    /// `value` is expected in little endian order and is reversed for big
    /// endian output unless `ignore_endianness` is set.
    pub fn write_primitive(&mut self, value: &[u8], ignore_endianness: bool) -> Result<()> {
        let (segment, physical) = self.position.decode()?;
        let store = match segment {
            Segment::System => &mut *self.system,
            Segment::Graphics => &mut *self.graphics,
        };

        store.seek(SeekFrom::Start(physical))?;
        if !ignore_endianness && self.endian == Endian::Big {
            let mut reversed = value.to_vec();
            reversed.reverse();
            store.write_all(&reversed)?;
        } else {
            store.write_all(value)?;
        }

        self.position = VirtualAddress::new(segment, physical + value.len() as u64)?;
        Ok(())
    }

    /// Write raw bytes, never reordered
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_primitive(value, true)
    }

    /// Write `count` zero bytes
    pub fn write_padding(&mut self, count: usize) -> Result<()> {
        self.write_primitive(&vec![0u8; count], true)
    }

    /// Write one byte
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_primitive(&[value], true)
    }

    /// Write a `u16` in the writer's byte order
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        let mut buffer = [0u8; 2];
        LittleEndian::write_u16(&mut buffer, value);
        self.write_primitive(&buffer, false)
    }

    /// Write a `u32` in the writer's byte order
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        let mut buffer = [0u8; 4];
        LittleEndian::write_u32(&mut buffer, value);
        self.write_primitive(&buffer, false)
    }

    /// Write a `u64` in the writer's byte order
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let mut buffer = [0u8; 8];
        LittleEndian::write_u64(&mut buffer, value);
        self.write_primitive(&buffer, false)
    }

    /// Write an IEEE 754 `f32` in the writer's byte order
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        let mut buffer = [0u8; 4];
        LittleEndian::write_f32(&mut buffer, value);
        self.write_primitive(&buffer, false)
    }

    /// Write a UTF-8 string followed by a null terminator
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())?;
        self.write_u8(0)
    }

    /// Serialize a block at its assigned position.
    ///
    /// Fails if the block has no position or writes a different number of
    /// bytes than its length.
    pub fn write_block(&mut self, graph: &ResourceGraph, id: BlockId) -> Result<()> {
        let address = graph.address_of(id)?;
        let block = graph.block(id)?;

        trace!(%address, block = %id, "writing block");
        self.position = address;
        block.write(self, graph)?;

        let expected = block.length(graph);
        let written = self.position.raw().wrapping_sub(address.raw());
        if written != expected {
            return Err(Error::LengthMismatch {
                block: id,
                expected,
                written,
            });
        }

        Ok(())
    }
}
