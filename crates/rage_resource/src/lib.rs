//! This library handles reading and rebuilding the paged **resource** files used by *RAGE* based games.
//!
//! # Resource Format Documentation
//!
//! A resource is a graph of records (*blocks*) serialized into two independent byte regions, the
//! *system* segment holding structured data and the *graphics* segment holding opaque buffers. Blocks
//! refer to each other through pointers into a virtual address space spanning both segments.
//!
//! ## Virtual Addresses
//!
//! | Bits          | Segment  | Physical offset              |
//! |---------------|----------|------------------------------|
//! | `0x50000000`  | System   | address with the tag cleared |
//! | `0x60000000`  | Graphics | address with the tag cleared |
//!
//! The system tag is tested first. An address of `0` is a null pointer; any other address carrying
//! neither tag is invalid.
//!
//! ## Blocks
//!
//! Every block knows its length, how to write itself, its *parts* (children embedded in its own bytes,
//! placed at a fixed offset from it) and its *references* (children it points at, placed
//! independently). Blocks live in a [`graph::ResourceGraph`] and point at each other through handles,
//! so shared and cyclic references read back as the same block.
//!
//! ## Containers
//!
//! | Container          | Bytes                                               | Length                   |
//! |--------------------|-----------------------------------------------------|--------------------------|
//! | Pointer array      | one 32 or 64-bit pointer per element                | count × pointer width    |
//! | Pointer list (32)  | `u32 pointer, u16 count, u16 capacity`              | 8                        |
//! | Pointer list (64)  | `u64 pointer, u16 count, u16 capacity, u32 padding` | 16                       |
//! | Simple array       | elements back to back                               | sum of element lengths   |
//! | Simple list        | same header as the pointer list                     | 8 or 16                  |
//!
//! ## Layout
//!
//! Writing a resource first splits the blocks reachable from the root into top-level system blocks,
//! embedded blocks and graphics blocks. Top-level blocks of each segment are then packed into pages of
//! a single power of two size, doubling the size until fewer than 128 pages are needed. Each block is
//! followed by a 64 byte margin and starts on a 64 byte boundary.
//!
//! ## File Structure
//!
//! | Offset (bytes) | Field              | Description                                       |
//! |----------------|--------------------|---------------------------------------------------|
//! | 0x0000         | Magic number       | 4 bytes: "RSC7"                                   |
//! | 0x0004         | Version            | 4 bytes: version of the root block's format       |
//! | 0x0008         | Compression        | 4 bytes: `0` none, `1` raw deflate                |
//! | 0x000C         | System page size   | 4 bytes                                           |
//! | 0x0010         | System page count  | 4 bytes                                           |
//! | 0x0014         | Graphics page size | 4 bytes                                           |
//! | 0x0018         | Graphics page count| 4 bytes                                           |
//! | 0x001C         | Payload            | system segment followed by the graphics segment   |
//!
//! - **Endianness**: the header is little-endian; blocks use the endianness chosen when reading or
//!   writing
//! - **Segment size**: page size × page count
//! - **Encryption**: the payload may additionally go through a [`file::Cipher`]
//!

pub mod address;
pub mod block;
pub mod classify;
pub mod collections;
pub mod compression;
pub mod error;
pub mod file;
pub mod graph;
pub mod layout;
pub mod read;
pub mod scalar;
pub mod types;
pub mod write;

pub use address::{Segment, VirtualAddress};
pub use block::{BlockId, Handle, ReadBlock, ResourceBlock};
pub use compression::CompressionMethod;
pub use file::ResourceFile;
pub use graph::ResourceGraph;
pub use read::ResourceReader;
pub use write::ResourceWriter;
