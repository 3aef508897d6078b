//! Payload compression and decompression handling.

use std::io::{Read, Write};

use binrw::{BinRead, BinWrite};
use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use tracing::instrument;

use crate::error::{Error, Result};

/// Identifies the storage format used to compress the segment payload
///
/// When creating resource files, you may choose the method via [`crate::file::ResourceFileOptions`].
#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[brw(repr=u32)]
pub enum CompressionMethod {
    /// Stores the data as it is
    None = 0,

    /// Compress the data as a raw deflate stream, without zlib framing
    #[default]
    Deflate = 1,
}

impl TryFrom<u32> for CompressionMethod {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(CompressionMethod::None),
            1 => Ok(CompressionMethod::Deflate),
            _ => Err(Error::CustomError(format!("unknown compression method {value}"))),
        }
    }
}

impl CompressionMethod {
    /// Encode a payload for storage
    #[instrument(skip(data), fields(len = data.len()), err)]
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionMethod::None => Ok(data.to_vec()),
            CompressionMethod::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
        }
    }

    /// Decode a stored payload
    #[instrument(skip(data), fields(len = data.len()), err)]
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionMethod::None => Ok(data.to_vec()),
            CompressionMethod::Deflate => {
                let mut buffer = Vec::new();
                DeflateDecoder::new(data).read_to_end(&mut buffer)?;
                Ok(buffer)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::compression::CompressionMethod;
    use crate::error::Result;

    #[test]
    fn stored_payload_is_untouched() -> Result<()> {
        let data = b"system and graphics".to_vec();
        assert_eq!(CompressionMethod::None.compress(&data)?, data);
        assert_eq!(CompressionMethod::None.decompress(&data)?, data);
        Ok(())
    }

    #[test]
    fn deflate_has_no_zlib_header() -> Result<()> {
        let data = vec![0u8; 0x2000];
        let compressed = CompressionMethod::Deflate.compress(&data)?;

        assert!(compressed.len() < data.len());
        assert_ne!(compressed[0], 0x78);
        assert_eq!(CompressionMethod::Deflate.decompress(&compressed)?, data);

        Ok(())
    }

    #[test]
    fn decode_stored_deflate_block() -> Result<()> {
        // final stored block holding "abc"
        #[rustfmt::skip]
        let compressed = vec![
            0x01,
            0x03, 0x00,
            0xFC, 0xFF,
            0x61, 0x62, 0x63,
        ];

        assert_eq!(CompressionMethod::Deflate.decompress(&compressed)?, b"abc".to_vec());

        Ok(())
    }

    #[test]
    fn method_from_raw() {
        assert!(matches!(CompressionMethod::try_from(1), Ok(CompressionMethod::Deflate)));
        assert!(CompressionMethod::try_from(2).is_err());
    }
}
