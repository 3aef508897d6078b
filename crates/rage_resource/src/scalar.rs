//! Terminal blocks wrapping a single value.

use std::io::{Read, Seek};

use derive_more::derive::{Deref, DerefMut, Display, From};

use crate::block::{BlockKind, ReadBlock, ResourceBlock};
use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::read::ResourceReader;
use crate::write::ResourceWriter;

macro_rules! scalar_block {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $size:literal, $read:ident, $write:ident) => {
        $(#[$meta])*
        #[derive(Debug, Default, Copy, Clone, PartialEq, Deref, DerefMut, Display, From)]
        pub struct $name(pub $inner);

        impl ResourceBlock for $name {
            fn length(&self, _graph: &ResourceGraph) -> u64 {
                $size
            }

            fn write(&self, writer: &mut ResourceWriter<'_>, _graph: &ResourceGraph) -> Result<()> {
                writer.$write(self.0)
            }
        }

        impl ReadBlock for $name {
            type Args = ();

            fn read<R: Read + Seek>(&mut self, reader: &mut ResourceReader<R>, _args: ()) -> Result<()> {
                self.0 = reader.$read()?;
                Ok(())
            }
        }
    };
}

scalar_block!(
    /// A single byte
    U8Block, u8, 1, read_u8, write_u8
);
scalar_block!(
    /// An unsigned 16-bit integer
    U16Block, u16, 2, read_u16, write_u16
);
scalar_block!(
    /// An unsigned 32-bit integer
    U32Block, u32, 4, read_u32, write_u32
);
scalar_block!(
    /// An unsigned 64-bit integer
    U64Block, u64, 8, read_u64, write_u64
);
scalar_block!(
    /// A 32-bit float
    F32Block, f32, 4, read_f32, write_f32
);

/// A null terminated UTF-8 string
#[derive(Debug, Default, Clone, PartialEq, Eq, Deref, DerefMut, Display, From)]
pub struct StringBlock(pub String);

impl StringBlock {
    /// Borrow the text without its terminator
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StringBlock {
    fn from(value: &str) -> Self {
        StringBlock(value.to_owned())
    }
}

impl ResourceBlock for StringBlock {
    fn length(&self, _graph: &ResourceGraph) -> u64 {
        self.0.len() as u64 + 1
    }

    fn write(&self, writer: &mut ResourceWriter<'_>, _graph: &ResourceGraph) -> Result<()> {
        writer.write_string(&self.0)
    }
}

impl ReadBlock for StringBlock {
    type Args = ();

    fn read<R: Read + Seek>(&mut self, reader: &mut ResourceReader<R>, _args: ()) -> Result<()> {
        self.0 = reader.read_string()?;
        Ok(())
    }
}

/// Raw bytes stored in the graphics segment.
///
/// Vertex, index and pixel data are kept opaque; the length to read comes
/// from whichever header points at the buffer.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deref, DerefMut, From)]
pub struct GraphicsBuffer(pub Vec<u8>);

impl ResourceBlock for GraphicsBuffer {
    fn kind(&self) -> BlockKind {
        BlockKind::Graphics
    }

    fn length(&self, _graph: &ResourceGraph) -> u64 {
        self.0.len() as u64
    }

    fn write(&self, writer: &mut ResourceWriter<'_>, _graph: &ResourceGraph) -> Result<()> {
        writer.write_bytes(&self.0)
    }
}

impl ReadBlock for GraphicsBuffer {
    type Args = usize;

    fn read<R: Read + Seek>(&mut self, reader: &mut ResourceReader<R>, length: usize) -> Result<()> {
        self.0 = reader.read_bytes(length)?;
        Ok(())
    }
}
