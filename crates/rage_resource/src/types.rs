//! Base types for the structure of a resource file.

use binrw::{BinRead, BinWrite};

use crate::compression::CompressionMethod;
use crate::layout::PageLayout;

/// Page table entry of one segment
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct PageFlags {
    /// Size of every page in bytes
    pub page_size: u32,

    /// Number of pages used
    pub page_count: u32,
}

impl PageFlags {
    /// Bytes the segment occupies in the payload
    pub fn segment_size(&self) -> u64 {
        self.page_size as u64 * self.page_count as u64
    }
}

impl TryFrom<PageLayout> for PageFlags {
    type Error = crate::error::Error;

    fn try_from(value: PageLayout) -> crate::error::Result<Self> {
        let narrow = |v: u64| {
            u32::try_from(v).map_err(|_| {
                crate::error::Error::CustomError(format!("page table value {v:#x} does not fit 32 bits"))
            })
        };
        Ok(PageFlags {
            page_size: narrow(value.page_size)?,
            page_count: narrow(value.page_count)?,
        })
    }
}

/// Resource file header
///
/// Always starts with "RSC7". All data is stored in little endian format and
/// the payload, `system || graphics`, follows the header until the end of the
/// file.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"RSC7", little)]
pub struct ResourceHeader {
    /// Version of the root block's format
    pub version: u32,

    /// The compression type used for the payload
    pub compression: CompressionMethod,

    /// Page table of the system segment
    pub system: PageFlags,

    /// Page table of the graphics segment
    pub graphics: PageFlags,
}

impl ResourceHeader {
    /// Size of the header in bytes
    pub const SIZE: u64 = 28;
}
