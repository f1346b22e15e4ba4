//! BLOB reader (C3): walks the linked list of 256-byte records backing an
//! `NT`/`I` field's unlimited-length value.

use std::io::{Read, Seek};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::codec::decode_utf16le;
use crate::error::{BizdbError, Result};
use crate::pagedb::object::PagedObject;

const BLOB_CHUNK_SIZE: u64 = 256;
const BLOB_PAYLOAD_SIZE: usize = 250;

/// Which row field type a BLOB value was read for — controls how
/// [`BlobReader::materialize`] decodes the concatenated bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// `I`: opaque binary, returned as-is.
    Binary,
    /// `NT`: large text, decoded as UTF-16LE.
    Text,
}

/// Reads one BLOB value out of a table's shared BLOB object, starting at
/// `first_chunk`.
///
/// Each `next` seeks the underlying [`PagedObject`] to an absolute chunk
/// position before reading, so chains that revisit lower-numbered chunks
/// (non-monotonic `next_chunk`) are handled the same as any other chain —
/// there is no notion of "current position" to get out of sync.
pub struct BlobReader<R> {
    object: PagedObject<R>,
    next_chunk: Option<u64>,
    total_size: u64,
    kind: BlobKind,
    exhausted_empty: bool,
}

impl<R: Read + Seek> BlobReader<R> {
    /// `blob_object` is the table's shared BLOB paged object (re-opened
    /// independently per read since [`PagedObject`] carries its own cursor).
    pub fn new(blob_object: PagedObject<R>, first_chunk: u64, total_size: u64, kind: BlobKind) -> Self {
        BlobReader {
            object: blob_object,
            next_chunk: Some(first_chunk),
            total_size,
            kind,
            exhausted_empty: total_size == 0,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn kind(&self) -> BlobKind {
        self.kind
    }

    /// Read the next chunk's payload, or `None` once the chain is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.total_size == 0 {
            if self.exhausted_empty {
                return Ok(None);
            }
            self.exhausted_empty = true;
            return Ok(Some(Vec::new()));
        }

        let chunk_index = match self.next_chunk {
            Some(c) => c,
            None => return Ok(None),
        };

        self.object.seek(chunk_index * BLOB_CHUNK_SIZE)?;
        let mut record = [0u8; BLOB_CHUNK_SIZE as usize];
        self.object.read(&mut record)?;

        let mut cursor = std::io::Cursor::new(&record[..]);
        let next_block = cursor.read_u32::<LittleEndian>()?;
        let size = cursor.read_i16::<LittleEndian>()?;
        if !(0..=BLOB_PAYLOAD_SIZE as i16).contains(&size) {
            return Err(BizdbError::Corrupt(format!(
                "BLOB chunk at {chunk_index} declares payload size {size}, expected 0..={BLOB_PAYLOAD_SIZE}"
            )));
        }
        let payload = record[6..6 + size as usize].to_vec();

        self.next_chunk = if next_block == 0 { None } else { Some(next_block as u64) };
        Ok(Some(payload))
    }

    /// Concatenate every remaining chunk and decode it per [`BlobKind`].
    pub fn materialize(mut self) -> Result<BlobValue> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.next_chunk()? {
            bytes.extend_from_slice(&chunk);
        }
        match self.kind {
            BlobKind::Binary => Ok(BlobValue::Binary(bytes)),
            BlobKind::Text => Ok(BlobValue::Text(decode_utf16le(&bytes)?)),
        }
    }
}

/// The decoded, fully-materialized value of a BLOB field.
#[derive(Debug, Clone, PartialEq)]
pub enum BlobValue {
    Binary(Vec<u8>),
    Text(String),
}
