//! Container file header (C7 prerequisite): a fixed 16-byte record pointing
//! at the first free block and declaring the block size new documents use.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::Result;

/// Sentinel used throughout the container format (block chain terminator,
/// table-of-contents separator, "no free block yet" marker).
pub const END_MARKER: i32 = i32::MAX;

#[derive(Debug, Clone, Copy)]
pub struct Header {
    /// Offset of the first block on the free list, if any have been released.
    pub first_empty_block_offset: Option<u32>,
    /// Fixed block size new documents are written with.
    pub default_block_size: u32,
}

/// Read the 16-byte header from the start of a container file.
pub fn read_header<R: Read>(reader: &mut R) -> Result<Header> {
    let first_empty_block_offset = reader.read_i32::<LittleEndian>()?;
    let default_block_size = reader.read_i32::<LittleEndian>()? as u32;
    let _reserved_a = reader.read_i32::<LittleEndian>()?;
    let _reserved_b = reader.read_i32::<LittleEndian>()?;

    Ok(Header {
        first_empty_block_offset: if first_empty_block_offset == END_MARKER {
            None
        } else {
            Some(first_empty_block_offset as u32)
        },
        default_block_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_header_with_no_free_blocks() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&END_MARKER.to_le_bytes());
        buf.extend_from_slice(&512i32.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        let header = read_header(&mut Cursor::new(buf)).unwrap();
        assert_eq!(header.first_empty_block_offset, None);
        assert_eq!(header.default_block_size, 512);
    }

    #[test]
    fn parses_header_with_free_block() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1024i32.to_le_bytes());
        buf.extend_from_slice(&512i32.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        let header = read_header(&mut Cursor::new(buf)).unwrap();
        assert_eq!(header.first_empty_block_offset, Some(1024));
    }
}
