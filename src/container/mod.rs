//! The container archive format (C7-C9): header, block chains, table of
//! contents, and the reader/writer facades that tie them together.
//!
//! Used for configuration bundles, external data-processor files, and
//! external-report files. Entry payloads may be transparently raw-DEFLATE
//! compressed (`wbits = -15`, i.e. no zlib header) and an entry's payload
//! may itself be a nested container (detected by a `FF FF FF 7F` marker).

pub mod block;
pub mod build;
pub mod extract;
pub mod header;
pub mod toc;
pub mod writer;

use std::cell::RefCell;
use std::io::{Read, Seek};
use std::rc::Rc;

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;

pub use build::build;
pub use extract::extract;
pub use header::Header;
pub use toc::Entry;
pub use writer::ContainerWriter;

use crate::error::{BizdbError, Result};

/// Decompress a raw-DEFLATE (`wbits = -15`, no zlib header) byte stream.
pub fn inflate_raw(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| BizdbError::Corrupt(format!("raw-DEFLATE decompression failed: {e}")))?;
    Ok(out)
}

/// Compress a byte stream with raw DEFLATE (`wbits = -15`, no zlib header).
pub fn deflate_raw(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish().map_err(BizdbError::from)
}

/// The leading four bytes of an entry payload that is itself a nested
/// container.
pub const NESTED_CONTAINER_MARKER: [u8; 4] = [0xFF, 0xFF, 0xFF, 0x7F];

/// An open container file: its header and the full entry table, read eagerly
/// at open time (entry *payloads* stay unread until requested).
pub struct Container<R> {
    source: Rc<RefCell<R>>,
    pub header: Header,
    entries: Vec<Entry>,
}

impl<R: Read + Seek> Container<R> {
    /// Open a container from a seekable source, failing with
    /// [`BizdbError::Empty`] if its declared block size is zero.
    pub fn open(source: R) -> Result<Self> {
        let source = Rc::new(RefCell::new(source));
        let header = {
            let mut guard = source.borrow_mut();
            header::read_header(&mut *guard)?
        };
        if header.default_block_size == 0 {
            return Err(BizdbError::Empty("container has a zero default block size".into()));
        }
        let entries = toc::read_entries(&source, &header)?;
        Ok(Container { source, header, entries })
    }

    /// Every entry, in table-of-contents order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Result<&Entry> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| BizdbError::Key(format!("unknown container entry {name:?}")))
    }

    /// Fully materialize one entry's raw (still possibly compressed) bytes.
    pub fn read_data(&self, name: &str) -> Result<Vec<u8>> {
        self.entry(name)?.read_data(&self.source)
    }

    pub(crate) fn source(&self) -> &Rc<RefCell<R>> {
        &self.source
    }
}
