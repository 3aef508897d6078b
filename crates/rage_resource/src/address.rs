//! Virtual addresses spanning the system and graphics segments.

use std::fmt;

use crate::error::{Error, Result};

/// Identifies one of the two physical byte regions of a resource
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Structured data, walked as a block graph
    System,

    /// Opaque data such as vertex or pixel buffers
    Graphics,
}

impl Segment {
    /// Tag bits marking an address as part of the system segment
    pub const SYSTEM_TAG: u64 = 0x5000_0000;

    /// Tag bits marking an address as part of the graphics segment
    pub const GRAPHICS_TAG: u64 = 0x6000_0000;

    /// Offsets inside a segment stay below the lowest tag bit
    pub const MAX_OFFSET: u64 = 0x1000_0000;

    /// The tag bits of this segment
    pub const fn tag(self) -> u64 {
        match self {
            Segment::System => Self::SYSTEM_TAG,
            Segment::Graphics => Self::GRAPHICS_TAG,
        }
    }

    /// The first address of this segment
    pub const fn base(self) -> VirtualAddress {
        VirtualAddress(self.tag())
    }
}

/// An address inside the virtual address space of a resource.
///
/// The high bits select the [`Segment`], the remaining bits are the offset
/// inside that segment's store. The system tag is checked first, so an
/// address carrying both tags belongs to the system segment.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    /// The null pointer
    pub const NULL: VirtualAddress = VirtualAddress(0);

    /// Build an address from a segment and an offset inside it.
    ///
    /// Fails when the offset would reach into the tag bits, where it could
    /// be mistaken for the other segment.
    pub fn new(segment: Segment, offset: u64) -> Result<Self> {
        if offset >= Segment::MAX_OFFSET {
            return Err(Error::InvalidAddress(segment.tag().saturating_add(offset)));
        }
        Ok(VirtualAddress(segment.tag() | offset))
    }

    /// Wrap a raw pointer value as read from a stream
    pub const fn from_raw(raw: u64) -> Self {
        VirtualAddress(raw)
    }

    /// The raw pointer value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the null pointer
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The segment owning this address
    pub fn segment(self) -> Result<Segment> {
        if self.0 & Segment::SYSTEM_TAG == Segment::SYSTEM_TAG {
            return Ok(Segment::System);
        }

        if self.0 & Segment::GRAPHICS_TAG == Segment::GRAPHICS_TAG {
            return Ok(Segment::Graphics);
        }

        Err(Error::InvalidAddress(self.0))
    }

    /// Split into the owning segment and the physical offset inside its store
    pub fn decode(self) -> Result<(Segment, u64)> {
        let segment = self.segment()?;
        Ok((segment, self.0 & !segment.tag()))
    }

    /// Advance by `count` bytes, staying inside the same segment
    pub fn offset(self, count: u64) -> Result<Self> {
        let (segment, physical) = self.decode()?;
        let physical = physical
            .checked_add(count)
            .ok_or(Error::InvalidAddress(self.0))?;
        VirtualAddress::new(segment, physical)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualAddress({:#010x})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<VirtualAddress> for u64 {
    fn from(value: VirtualAddress) -> Self {
        value.0
    }
}
