//! Table-of-contents walker (C8): resolves the container's root document
//! into an ordered list of entries, each with its own attribute document
//! (name + timestamps) and data document (the file's raw bytes).

use std::cell::RefCell;
use std::io::{Read, Seek};
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};
use chrono::NaiveDateTime;

use crate::codec::{decode_container_epoch, decode_utf16le_name};
use crate::container::block::read_full_document;
use crate::container::header::{Header, END_MARKER};
use crate::error::{BizdbError, Result};

/// Byte offset of the container's very first document: right after the
/// fixed 16-byte header.
pub const FIRST_DOCUMENT_OFFSET: u64 = 16;

const ATTRIBUTE_HEADER_SIZE: usize = 8 + 8 + 4; // created: u64, modified: u64, reserved: i32
const TOC_RECORD_SIZE: usize = 4 + 4 + 4; // attr_offset: i32, data_offset: i32, sentinel: i32

/// One container entry: its metadata plus where its data document lives.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub size: u32,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
    data_offset: u64,
}

impl Entry {
    /// Fully materialize this entry's raw (still possibly DEFLATE-compressed)
    /// file bytes.
    pub fn read_data<R: Read + Seek>(&self, source: &Rc<RefCell<R>>) -> Result<Vec<u8>> {
        let (size, data) = read_full_document(source, self.data_offset)?;
        if size != self.size {
            return Err(BizdbError::Corrupt(format!(
                "entry {:?} declares size {} but its data document reports {size}",
                self.name, self.size
            )));
        }
        Ok(data)
    }
}

fn parse_toc_records(bytes: &[u8]) -> Result<Vec<(u32, u32)>> {
    if bytes.len() % TOC_RECORD_SIZE != 0 {
        return Err(BizdbError::Corrupt(format!(
            "table of contents document length {} is not a multiple of {TOC_RECORD_SIZE}",
            bytes.len()
        )));
    }
    let mut records = Vec::with_capacity(bytes.len() / TOC_RECORD_SIZE);
    for record in bytes.chunks_exact(TOC_RECORD_SIZE) {
        let attr_offset = LittleEndian::read_i32(&record[0..4]) as u32;
        let data_offset = LittleEndian::read_i32(&record[4..8]) as u32;
        let sentinel = LittleEndian::read_i32(&record[8..12]);
        if sentinel != END_MARKER {
            return Err(BizdbError::Corrupt(format!(
                "table of contents record has sentinel {sentinel}, expected {END_MARKER}"
            )));
        }
        records.push((attr_offset, data_offset));
    }
    Ok(records)
}

fn read_entry<R: Read + Seek>(source: &Rc<RefCell<R>>, attr_offset: u32, data_offset: u32) -> Result<Entry> {
    let (attr_size, attr_bytes) = read_full_document(source, attr_offset as u64)?;
    if (attr_size as usize) < ATTRIBUTE_HEADER_SIZE {
        return Err(BizdbError::Corrupt(format!(
            "entry attribute document at {attr_offset} is shorter than its own fixed header"
        )));
    }
    let created_ticks = LittleEndian::read_u64(&attr_bytes[0..8]);
    let modified_ticks = LittleEndian::read_u64(&attr_bytes[8..16]);
    let name = decode_utf16le_name(&attr_bytes[ATTRIBUTE_HEADER_SIZE..]);

    let (data_size, _preview) = {
        // Only the document's declared size is needed up front; the full
        // bytes are re-read lazily via `Entry::read_data` on extraction.
        let mut guard = source.borrow_mut();
        let block = crate::container::block::read_block(&mut *guard, data_offset as u64, Some(0))?;
        (block.doc_size, block.data)
    };

    Ok(Entry {
        name,
        size: data_size,
        created: decode_container_epoch(created_ticks)?,
        modified: decode_container_epoch(modified_ticks)?,
        data_offset: data_offset as u64,
    })
}

/// Read every entry out of the container's table-of-contents document chain.
pub fn read_entries<R: Read + Seek>(source: &Rc<RefCell<R>>, _header: &Header) -> Result<Vec<Entry>> {
    let (_size, toc_bytes) = read_full_document(source, FIRST_DOCUMENT_OFFSET)?;
    let records = parse_toc_records(&toc_bytes)?;

    let mut entries = Vec::with_capacity(records.len());
    for (attr_offset, data_offset) in records {
        entries.push(read_entry(source, attr_offset, data_offset)?);
    }
    Ok(entries)
}
