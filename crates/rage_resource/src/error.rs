//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::block::BlockId;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent warpper for [`std::string::FromUtf8Error`]
    #[error(transparent)]
    UTF8Error(#[from] std::string::FromUtf8Error),

    /// The address does not belong to the system or the graphics segment
    #[error("virtual address {0:#010x} does not belong to any segment")]
    InvalidAddress(u64),

    /// Page size escalation gave up before the page count fell under the limit
    #[error("unable to fit blocks into less than {max_pages} pages after {escalations} page size escalations")]
    UnresolvableLayout {
        /// The page count ceiling that could not be met
        max_pages: u64,
        /// How many times the page size was doubled
        escalations: u32,
    },

    /// A block was written or pointed to before it received a position
    #[error("block {0} has no assigned position")]
    UnassignedPosition(BlockId),

    /// A block is still being read and cannot be inspected yet
    #[error("block {0} is still being read")]
    IncompleteBlock(BlockId),

    /// A block emitted a different number of bytes than it claims to occupy
    #[error("block {block} wrote {written} bytes but has a length of {expected}")]
    LengthMismatch {
        /// The offending block
        block: BlockId,
        /// The length reported by the block
        expected: u64,
        /// The number of bytes actually written
        written: u64,
    },

    /// A typed block found a discriminator it can not map to a variant
    #[error("unknown block discriminator {0:#x}")]
    UnknownKind(u64),

    /// File is an invalid resource file
    #[error("file is an invalid resource file")]
    InvalidResource,

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
