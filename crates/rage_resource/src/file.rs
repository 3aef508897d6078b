//! Loading and saving whole resource files.

use std::io::{Cursor, Read, Seek, Write};

use binrw::{BinRead, BinWrite, Endian};
use bon::Builder;
use tracing::{debug, instrument};

use crate::address::Segment;
use crate::block::{BlockId, Handle, ReadBlock};
use crate::classify::classify;
use crate::compression::CompressionMethod;
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::layout::{LayoutOptions, PageAllocator, PageLayout};
use crate::read::ResourceReader;
use crate::types::ResourceHeader;
use crate::write::ResourceWriter;

/// Opaque transform applied to the payload on top of compression.
///
/// Decryption runs before decompression when loading, encryption after
/// compression when saving.
pub trait Cipher {
    /// Recover the compressed payload from its stored form
    fn decrypt(&self, data: Vec<u8>) -> Result<Vec<u8>>;

    /// Turn the compressed payload into its stored form
    fn encrypt(&self, data: Vec<u8>) -> Result<Vec<u8>>;
}

/// Options for how a resource file is read and written
#[derive(Debug, Clone, Copy, Builder)]
pub struct ResourceFileOptions {
    /// Byte order of the blocks inside the segments
    #[builder(default = Endian::Little)]
    pub endian: Endian,

    /// The compression method used for the payload when saving
    #[builder(default)]
    pub compression: CompressionMethod,

    /// Page table parameters used when saving
    #[builder(default)]
    pub layout: LayoutOptions,
}

impl Default for ResourceFileOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The two segment images of a laid out resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    /// Image of the system segment, `system_layout.size()` bytes
    pub system: Vec<u8>,

    /// Page table of the system segment
    pub system_layout: PageLayout,

    /// Image of the graphics segment, `graphics_layout.size()` bytes
    pub graphics: Vec<u8>,

    /// Page table of the graphics segment
    pub graphics_layout: PageLayout,
}

/// A resource whose root block is a `T`
///
/// ```
/// # fn doit() -> rage_resource::error::Result<()> {
/// use std::io::Cursor;
/// use rage_resource::file::{ResourceFile, ResourceFileOptions};
/// use rage_resource::graph::ResourceGraph;
/// use rage_resource::scalar::StringBlock;
///
/// let mut graph = ResourceGraph::new();
/// let root = graph.insert(StringBlock::from("drawable"));
/// let mut file = ResourceFile::new(1, graph, root);
///
/// let mut buffer = Cursor::new(Vec::new());
/// file.save(&mut buffer, &ResourceFileOptions::default())?;
///
/// buffer.set_position(0);
/// let loaded = ResourceFile::<StringBlock>::load(&mut buffer, &ResourceFileOptions::default())?;
/// assert_eq!(loaded.root()?.as_str(), "drawable");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug)]
pub struct ResourceFile<T> {
    /// Version of the root block's format
    pub version: u32,

    /// Every block of the resource
    pub graph: ResourceGraph,

    /// The block everything else hangs off
    pub root: Handle<T>,
}

impl<T: ReadBlock<Args = ()>> ResourceFile<T> {
    /// Wrap a graph whose root block is `root`
    pub fn new(version: u32, graph: ResourceGraph, root: Handle<T>) -> Self {
        ResourceFile {
            version,
            graph,
            root,
        }
    }

    /// Borrow the root block
    pub fn root(&self) -> Result<&T> {
        self.graph.get(self.root)
    }

    /// Rebuild the graph from raw segment images, the root being the first
    /// block of the system segment
    #[instrument(skip(system, graphics), fields(system_len = system.len(), graphics_len = graphics.len()), err)]
    pub fn from_segments(
        version: u32,
        system: Vec<u8>,
        graphics: Vec<u8>,
        endian: Endian,
    ) -> Result<Self> {
        let mut reader = ResourceReader::new(Cursor::new(system), Cursor::new(graphics), endian);
        let root = reader.read_block::<T>(())?;
        let graph = reader.into_graph();

        debug!(blocks = graph.len(), "resource read");
        Ok(ResourceFile {
            version,
            graph,
            root,
        })
    }

    /// Lay out every block reachable from the root and write both segments
    #[instrument(skip(self), err)]
    pub fn to_segments(&mut self, endian: Endian, layout: LayoutOptions) -> Result<Segments> {
        let sets = classify(&self.graph, self.root.id());
        let allocator = PageAllocator::new(layout);

        let system_blocks = sets.system.iter().copied().collect::<Vec<BlockId>>();
        let graphics_blocks = sets.graphics.iter().copied().collect::<Vec<BlockId>>();

        let system_layout =
            allocator.allocate(&mut self.graph, &system_blocks, Segment::System.base())?;
        let graphics_layout =
            allocator.allocate(&mut self.graph, &graphics_blocks, Segment::Graphics.base())?;

        let mut system = Cursor::new(vec![0u8; segment_size(system_layout)?]);
        let mut graphics = Cursor::new(vec![0u8; segment_size(graphics_layout)?]);

        let mut writer = ResourceWriter::new(&mut system, &mut graphics, endian);
        for id in system_blocks.iter().chain(&graphics_blocks) {
            writer.write_block(&self.graph, *id)?;
        }

        Ok(Segments {
            system: system.into_inner(),
            system_layout,
            graphics: graphics.into_inner(),
            graphics_layout,
        })
    }

    /// Read a resource file
    pub fn load<R: Read + Seek>(reader: &mut R, options: &ResourceFileOptions) -> Result<Self> {
        Self::load_with(reader, options, None)
    }

    /// Read a resource file whose payload went through `cipher`
    #[instrument(skip(reader, cipher), err)]
    pub fn load_with<R: Read + Seek>(
        reader: &mut R,
        options: &ResourceFileOptions,
        cipher: Option<&dyn Cipher>,
    ) -> Result<Self> {
        let header = ResourceHeader::read(reader)?;
        debug!(?header, "resource header");

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        if let Some(cipher) = cipher {
            payload = cipher.decrypt(payload)?;
        }
        let mut payload = header.compression.decompress(&payload)?;

        let system_size = usize::try_from(header.system.segment_size())
            .map_err(|_| Error::InvalidResource)?;
        let graphics_size = usize::try_from(header.graphics.segment_size())
            .map_err(|_| Error::InvalidResource)?;
        let total_size = system_size
            .checked_add(graphics_size)
            .ok_or(Error::InvalidResource)?;

        let graphics = payload
            .get(system_size..total_size)
            .ok_or(Error::InvalidResource)?
            .to_vec();
        payload.truncate(system_size);

        Self::from_segments(header.version, payload, graphics, options.endian)
    }

    /// Write the resource as a file
    pub fn save<W: Write + Seek>(
        &mut self,
        writer: &mut W,
        options: &ResourceFileOptions,
    ) -> Result<()> {
        self.save_with(writer, options, None)
    }

    /// Write the resource as a file, passing the payload through `cipher`
    #[instrument(skip(self, writer, cipher), err)]
    pub fn save_with<W: Write + Seek>(
        &mut self,
        writer: &mut W,
        options: &ResourceFileOptions,
        cipher: Option<&dyn Cipher>,
    ) -> Result<()> {
        let segments = self.to_segments(options.endian, options.layout)?;

        let header = ResourceHeader {
            version: self.version,
            compression: options.compression,
            system: segments.system_layout.try_into()?,
            graphics: segments.graphics_layout.try_into()?,
        };

        let mut payload = segments.system;
        payload.extend_from_slice(&segments.graphics);
        let mut payload = options.compression.compress(&payload)?;
        if let Some(cipher) = cipher {
            payload = cipher.encrypt(payload)?;
        }

        header.write(writer)?;
        writer.write_all(&payload)?;

        Ok(())
    }
}

fn segment_size(layout: PageLayout) -> Result<usize> {
    usize::try_from(layout.size())
        .map_err(|_| Error::CustomError(format!("segment of {:#x} bytes is too large", layout.size())))
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::Endian;
    use pretty_assertions::assert_eq;

    use crate::compression::CompressionMethod;
    use crate::error::{Error, Result};
    use crate::file::{ResourceFile, ResourceFileOptions};
    use crate::graph::ResourceGraph;
    use crate::layout::{LayoutOptions, PageLayout};
    use crate::scalar::U32Block;

    #[test]
    fn segments_are_page_sized() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let root = graph.insert(U32Block(0x11223344));
        let mut file = ResourceFile::new(0, graph, root);

        let segments = file.to_segments(Endian::Big, LayoutOptions::default())?;

        assert_eq!(segments.system_layout, PageLayout { page_size: 0x2000, page_count: 1 });
        assert_eq!(segments.system.len(), 0x2000);
        assert_eq!(segments.system[..4].to_vec(), vec![0x11, 0x22, 0x33, 0x44]);
        assert!(segments.graphics.is_empty());

        Ok(())
    }

    #[test]
    fn stored_payload_layout() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let root = graph.insert(U32Block(7));
        let mut file = ResourceFile::new(9, graph, root);
        let options = ResourceFileOptions::builder()
            .compression(CompressionMethod::None)
            .build();

        let mut buffer = Cursor::new(Vec::new());
        file.save(&mut buffer, &options)?;
        let bytes = buffer.into_inner();

        assert_eq!(bytes.len(), 28 + 0x2000);
        assert_eq!(bytes[..4].to_vec(), b"RSC7".to_vec());
        assert_eq!(bytes[28..32].to_vec(), vec![0x07, 0x00, 0x00, 0x00]);

        Ok(())
    }

    #[test]
    fn truncated_payload_is_invalid() -> Result<()> {
        let mut graph = ResourceGraph::new();
        let root = graph.insert(U32Block(7));
        let mut file = ResourceFile::new(9, graph, root);
        let options = ResourceFileOptions::builder()
            .compression(CompressionMethod::None)
            .build();

        let mut buffer = Cursor::new(Vec::new());
        file.save(&mut buffer, &options)?;
        let mut bytes = buffer.into_inner();
        bytes.truncate(100);

        let result = ResourceFile::<U32Block>::load(&mut Cursor::new(bytes), &options);
        assert!(matches!(result, Err(Error::InvalidResource)));

        Ok(())
    }

    #[test]
    fn oversized_header_is_invalid() {
        #[rustfmt::skip]
        let bytes = vec![
            b'R', b'S', b'C', b'7',
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFF, 0xFF, 0xFF,
        ];

        let result = ResourceFile::<U32Block>::load(&mut Cursor::new(bytes), &ResourceFileOptions::default());
        assert!(matches!(result, Err(Error::InvalidResource)));
    }
}
