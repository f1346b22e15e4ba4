//! Block-level container primitives (C7): the fixed 31-byte ASCII-hex block
//! header, and the document (block chain) it anchors.

use std::cell::RefCell;
use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use crate::container::header::END_MARKER;
use crate::error::{BizdbError, Result};

const BLOCK_HEADER_SIZE: usize = 31;

/// One physical block: its header fields plus however much of its data this
/// read wanted (`max_data_length` truncates it, letting a document's later
/// hops request only the bytes still outstanding).
#[derive(Debug, Clone)]
pub struct Block {
    pub doc_size: u32,
    pub current_block_size: u32,
    pub next_block_offset: Option<u32>,
    pub data: Vec<u8>,
}

fn parse_hex_field(bytes: &[u8], what: &str) -> Result<u32> {
    let s = std::str::from_utf8(bytes).map_err(|_| BizdbError::Corrupt(format!("{what} is not ASCII")))?;
    u32::from_str_radix(s, 16).map_err(|_| BizdbError::Corrupt(format!("{what} {s:?} is not valid hex")))
}

/// Read one block's 31-byte header (`\r\n########\ ########\ ########\ \r\n`,
/// each `#` run an 8-digit hex field) and up to `max_data_length` bytes of
/// data, defaulting to `min(current_block_size, doc_size)` for a document's
/// first block.
pub fn read_block<R: Read + Seek>(reader: &mut R, offset: u64, max_data_length: Option<u32>) -> Result<Block> {
    reader.seek(SeekFrom::Start(offset))?;

    let mut header = [0u8; BLOCK_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let doc_size = parse_hex_field(&header[2..10], "block doc_size")?;
    let current_block_size = parse_hex_field(&header[11..19], "block current_block_size")?;
    let next_block_offset = parse_hex_field(&header[20..28], "block next_block_offset")? as i32;

    let max_data_length = max_data_length.unwrap_or_else(|| current_block_size.min(doc_size));
    let to_read = current_block_size.min(max_data_length) as usize;
    let mut data = vec![0u8; to_read];
    reader.read_exact(&mut data)?;

    Ok(Block {
        doc_size,
        current_block_size,
        next_block_offset: if next_block_offset == END_MARKER {
            None
        } else {
            Some(next_block_offset as u32)
        },
        data,
    })
}

/// Read a whole document (its declared size plus every byte across its
/// block chain) starting at its first block's offset.
pub fn read_full_document<R: Read + Seek>(source: &Rc<RefCell<R>>, offset: u64) -> Result<(u32, Vec<u8>)> {
    let mut guard = source.borrow_mut();
    let header_block = read_block(&mut *guard, offset, None)?;

    let doc_size = header_block.doc_size;
    let mut data = header_block.data;
    let mut left = doc_size.saturating_sub(data.len() as u32);
    let mut next = header_block.next_block_offset;

    while left > 0 {
        let next_offset = next.ok_or_else(|| {
            BizdbError::Corrupt(format!(
                "document at {offset} ended after {} of {doc_size} declared bytes",
                data.len()
            ))
        })?;
        let block = read_block(&mut *guard, next_offset as u64, Some(left))?;
        left = left.saturating_sub(block.data.len() as u32);
        next = block.next_block_offset;
        data.extend_from_slice(&block.data);
    }

    Ok((doc_size, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_block(buf: &mut Vec<u8>, doc_size: u32, block_size: u32, next: Option<u32>, data: &[u8]) {
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(format!("{doc_size:08x}").as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(format!("{block_size:08x}").as_bytes());
        buf.push(b' ');
        let next_value = next.unwrap_or(END_MARKER as u32);
        buf.extend_from_slice(format!("{next_value:08x}").as_bytes());
        buf.extend_from_slice(b" \r\n");
        let mut padded = data.to_vec();
        padded.resize(block_size as usize, 0);
        buf.extend_from_slice(&padded);
    }

    #[test]
    fn reads_single_block_document() {
        let mut buf = Vec::new();
        write_block(&mut buf, 5, 16, None, b"hello");
        let source = Rc::new(RefCell::new(Cursor::new(buf)));
        let (size, data) = read_full_document(&source, 0).unwrap();
        assert_eq!(size, 5);
        assert_eq!(data, b"hello");
    }

    #[test]
    fn reads_multi_block_document() {
        let mut buf = Vec::new();
        write_block(&mut buf, 10, 6, Some(37), b"hello!");
        let second_offset = buf.len() as u32;
        assert_eq!(second_offset, 37);
        write_block(&mut buf, 0, 6, None, b"world!");
        let source = Rc::new(RefCell::new(Cursor::new(buf)));
        let (size, data) = read_full_document(&source, 0).unwrap();
        assert_eq!(size, 10);
        assert_eq!(data, b"hello!worl");
    }

    #[test]
    fn truncated_chain_is_corrupt() {
        let mut buf = Vec::new();
        write_block(&mut buf, 100, 6, None, b"hello!");
        let source = Rc::new(RefCell::new(Cursor::new(buf)));
        let err = read_full_document(&source, 0).unwrap_err();
        assert!(matches!(err, BizdbError::Corrupt(_)));
    }
}
