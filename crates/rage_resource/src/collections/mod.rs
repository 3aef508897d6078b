//! Container blocks holding ordered sequences of other blocks.
//!
//! | Container       | Layout                                  | Length                  |
//! |-----------------|-----------------------------------------|-------------------------|
//! | [`PointerArray`] | one pointer per element                 | count × pointer width   |
//! | [`PointerList`]  | `{pointer, count, capacity}` header     | 8 (32-bit), 16 (64-bit) |
//! | [`SimpleArray`]  | elements back to back                   | sum of element lengths  |
//! | [`SimpleList`]   | `{pointer, count, capacity}` header     | 8 (32-bit), 16 (64-bit) |
//!
//! Element counts are never stored by arrays themselves; they come from the
//! list header (or whatever other block) pointing at them. Lists write the
//! same value for count and capacity.

use std::fmt::Debug;
use std::io::{Read, Seek};
use std::slice;

use crate::error::{Error, Result};
use crate::read::ResourceReader;
use crate::write::ResourceWriter;

mod pointer;
mod simple;

pub use pointer::{
    PointerArray, PointerArray32, PointerArray64, PointerList, PointerList32, PointerList64,
};
pub use simple::{SimpleArray, SimpleList, SimpleList32, SimpleList64};

/// Width of the pointers stored in a container
pub trait PointerWidth: Debug + Default + Copy + 'static {
    /// Size of a single pointer in bytes
    const SIZE: u64;

    /// Bytes of zero padding closing a list header
    const HEADER_PADDING: usize;

    /// Read one pointer at the cursor
    fn read_pointer<R: Read + Seek>(reader: &mut ResourceReader<R>) -> Result<u64>;

    /// Write one pointer at the cursor
    fn write_pointer(writer: &mut ResourceWriter<'_>, value: u64) -> Result<()>;

    /// Size of a `{pointer, count, capacity}` list header
    fn header_length() -> u64 {
        Self::SIZE + 4 + Self::HEADER_PADDING as u64
    }
}

/// 32-bit pointers
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Ptr32;

impl PointerWidth for Ptr32 {
    const SIZE: u64 = 4;
    const HEADER_PADDING: usize = 0;

    fn read_pointer<R: Read + Seek>(reader: &mut ResourceReader<R>) -> Result<u64> {
        Ok(reader.read_u32()? as u64)
    }

    fn write_pointer(writer: &mut ResourceWriter<'_>, value: u64) -> Result<()> {
        let value = u32::try_from(value)
            .map_err(|_| Error::CustomError(format!("pointer {value:#x} does not fit 32 bits")))?;
        writer.write_u32(value)
    }
}

/// 64-bit pointers
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Ptr64;

impl PointerWidth for Ptr64 {
    const SIZE: u64 = 8;
    const HEADER_PADDING: usize = 4;

    fn read_pointer<R: Read + Seek>(reader: &mut ResourceReader<R>) -> Result<u64> {
        reader.read_u64()
    }

    fn write_pointer(writer: &mut ResourceWriter<'_>, value: u64) -> Result<()> {
        writer.write_u64(value)
    }
}

/// List header shared by pointer and simple lists
pub(crate) struct ListHeader {
    pub pointer: u64,
    pub count: u16,
}

impl ListHeader {
    pub fn read<P: PointerWidth, R: Read + Seek>(reader: &mut ResourceReader<R>) -> Result<Self> {
        let pointer = P::read_pointer(reader)?;
        let count = reader.read_u16()?;
        let _capacity = reader.read_u16()?;
        reader.skip(P::HEADER_PADDING as u64)?;
        Ok(ListHeader { pointer, count })
    }

    pub fn write<P: PointerWidth>(&self, writer: &mut ResourceWriter<'_>) -> Result<()> {
        P::write_pointer(writer, self.pointer)?;
        writer.write_u16(self.count)?;
        writer.write_u16(self.count)?;
        writer.write_padding(P::HEADER_PADDING)
    }
}

pub(crate) fn list_count(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::CustomError(format!("{len} entries exceed a list's capacity")))
}

/// An ordered sequence of block slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockVec<I>(Vec<I>);

impl<I> Default for BlockVec<I> {
    fn default() -> Self {
        BlockVec(Vec::new())
    }
}

impl<I> BlockVec<I> {
    /// An empty sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The element at `index`, if in bounds
    pub fn get(&self, index: usize) -> Option<&I> {
        self.0.get(index)
    }

    /// Replace the element at `index`, returning the previous one
    pub fn set(&mut self, index: usize, item: I) -> Result<I> {
        let len = self.len();
        let slot = self.0.get_mut(index).ok_or_else(|| out_of_bounds(index, len))?;
        Ok(std::mem::replace(slot, item))
    }

    /// Append an element
    pub fn push(&mut self, item: I) {
        self.0.push(item);
    }

    /// Insert an element, shifting everything after it
    pub fn insert(&mut self, index: usize, item: I) -> Result<()> {
        if index > self.len() {
            return Err(out_of_bounds(index, self.len()));
        }
        self.0.insert(index, item);
        Ok(())
    }

    /// Remove the element at `index`
    pub fn remove(&mut self, index: usize) -> Result<I> {
        if index >= self.len() {
            return Err(out_of_bounds(index, self.len()));
        }
        Ok(self.0.remove(index))
    }

    /// Iterate over the elements in order
    pub fn iter(&self) -> slice::Iter<'_, I> {
        self.0.iter()
    }

    /// Borrow the elements as a slice
    pub fn as_slice(&self) -> &[I] {
        &self.0
    }
}

impl<I: PartialEq> BlockVec<I> {
    /// Remove the first element equal to `item`, returning whether one was found
    pub fn remove_item(&mut self, item: &I) -> bool {
        match self.0.iter().position(|i| i == item) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether an element equal to `item` is present
    pub fn contains(&self, item: &I) -> bool {
        self.0.contains(item)
    }
}

impl<I> FromIterator<I> for BlockVec<I> {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        BlockVec(iter.into_iter().collect())
    }
}

impl<'a, I> IntoIterator for &'a BlockVec<I> {
    type Item = &'a I;
    type IntoIter = slice::Iter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn out_of_bounds(index: usize, len: usize) -> Error {
    Error::CustomError(format!("index {index} is out of bounds for {len} elements"))
}
