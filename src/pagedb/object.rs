//! Paged object reader (C2): resolves an object-id (header page index) to a
//! logical byte stream, following the version-specific index/data page chain.

use std::cell::RefCell;
use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{BizdbError, Result};
use crate::pagedb::header::DbVersion;

const LEGACY_SIGNATURE: &[u8; 8] = b"1CDBOBV8";
const MODERN_SIGNATURE_NORMAL: [u8; 2] = [0x1C, 0xFD];
const MODERN_SIGNATURE_FREELIST: [u8; 2] = [0x1C, 0xFF];
const LEGACY_INDEX_SLOTS: u64 = 1018;
const LEGACY_DATA_SLOTS_PER_INDEX_PAGE: u64 = 1023;

struct ObjectMeta {
    length: u64,
    data_pages: Vec<u64>,
}

/// Parses an object header page (and, transitively, its index pages) into
/// `(length, data_page_offsets)`. Chosen once per object, at open time, by
/// [`read_object_meta`] — the byte-level strategy never reappears inside
/// [`PagedObject`]'s read/seek loop, which is written once against the
/// resolved offset list.
trait ObjectFormat {
    fn read_meta<R: Read + Seek>(reader: &mut R, page_size: u32, header_page: u64) -> Result<ObjectMeta>;
}

struct LegacyFormat;
struct ModernFormat;

impl ObjectFormat for LegacyFormat {
    fn read_meta<R: Read + Seek>(reader: &mut R, page_size: u32, header_page: u64) -> Result<ObjectMeta> {
        reader.seek(SeekFrom::Start(page_size as u64 * header_page))?;

        let mut signature = [0u8; 8];
        reader.read_exact(&mut signature)?;
        if &signature != LEGACY_SIGNATURE {
            return Err(BizdbError::Corrupt(format!(
                "legacy object header at page {header_page} has bad signature {signature:?}"
            )));
        }

        let length = reader.read_i32::<LittleEndian>()? as u64;
        let _reserved_b = reader.read_i32::<LittleEndian>()?;
        let _reserved_c = reader.read_i32::<LittleEndian>()?;
        let _on_disk_index_count = reader.read_u32::<LittleEndian>()?;

        let index_pages_count = if length == 0 {
            0
        } else {
            (length - 1) / (LEGACY_DATA_SLOTS_PER_INDEX_PAGE * page_size as u64) + 1
        };
        if index_pages_count > LEGACY_INDEX_SLOTS {
            return Err(BizdbError::Corrupt(format!(
                "legacy object at page {header_page} needs {index_pages_count} index pages, more than the {LEGACY_INDEX_SLOTS} available"
            )));
        }

        let mut index_page_offsets = Vec::with_capacity(index_pages_count as usize);
        for _ in 0..index_pages_count {
            index_page_offsets.push(reader.read_u32::<LittleEndian>()? as u64);
        }

        let mut data_pages = Vec::new();
        for index_offset in index_page_offsets {
            reader.seek(SeekFrom::Start(page_size as u64 * index_offset))?;
            let count = reader.read_i32::<LittleEndian>()? as u64;
            if count > LEGACY_DATA_SLOTS_PER_INDEX_PAGE {
                return Err(BizdbError::Corrupt(format!(
                    "index page at page {index_offset} declares {count} data pages, more than the {LEGACY_DATA_SLOTS_PER_INDEX_PAGE} available"
                )));
            }
            let mut slots = Vec::with_capacity(count as usize);
            for _ in 0..count {
                slots.push(reader.read_u32::<LittleEndian>()? as u64);
            }
            data_pages.extend(slots);
        }

        Ok(ObjectMeta { length, data_pages })
    }
}

impl ObjectFormat for ModernFormat {
    fn read_meta<R: Read + Seek>(reader: &mut R, page_size: u32, header_page: u64) -> Result<ObjectMeta> {
        reader.seek(SeekFrom::Start(page_size as u64 * header_page))?;

        let mut signature = [0u8; 2];
        reader.read_exact(&mut signature)?;

        if signature == MODERN_SIGNATURE_FREELIST {
            return Err(BizdbError::UnsupportedVariant(format!(
                "free-list object at page {header_page} is not readable"
            )));
        }
        if signature != MODERN_SIGNATURE_NORMAL {
            return Err(BizdbError::Corrupt(format!(
                "object header at page {header_page} has unknown signature {signature:?}"
            )));
        }

        let fat_level = reader.read_u16::<LittleEndian>()?;
        let _reserved_a = reader.read_u32::<LittleEndian>()?;
        let _reserved_b = reader.read_u32::<LittleEndian>()?;
        let _reserved_c = reader.read_u32::<LittleEndian>()?;
        let length = reader.read_u64::<LittleEndian>()?;

        let header_fixed_size = 2 + 2 + 4 + 4 + 4 + 8; // 2s H 3I Q
        let trailer_slots = (page_size as u64 - header_fixed_size) / 4;

        let data_pages = match fat_level {
            0 => {
                let data_pages_count = length.div_ceil(page_size as u64);
                if data_pages_count > trailer_slots {
                    return Err(BizdbError::Corrupt(format!(
                        "object at page {header_page} needs {data_pages_count} inline data pages, more than {trailer_slots} available"
                    )));
                }
                let mut pages = Vec::with_capacity(data_pages_count as usize);
                for _ in 0..data_pages_count {
                    pages.push(reader.read_u32::<LittleEndian>()? as u64);
                }
                pages
            }
            1 => {
                let mut index_page_offsets = Vec::new();
                for _ in 0..trailer_slots {
                    let offset = reader.read_u32::<LittleEndian>()?;
                    if offset == 0 {
                        break;
                    }
                    index_page_offsets.push(offset as u64);
                }

                let mut pages = Vec::new();
                for index_offset in index_page_offsets {
                    reader.seek(SeekFrom::Start(page_size as u64 * index_offset))?;
                    let slots = page_size as u64 / 4;
                    for _ in 0..slots {
                        let offset = reader.read_u32::<LittleEndian>()?;
                        if offset == 0 {
                            break;
                        }
                        pages.push(offset as u64);
                    }
                }
                pages
            }
            other => {
                return Err(BizdbError::UnsupportedVariant(format!(
                    "fat_level {other} is not supported (only 0 and 1 are known)"
                )));
            }
        };

        Ok(ObjectMeta { length, data_pages })
    }
}

/// A logical byte stream assembled from `page_size`-sized pages.
///
/// Shares the underlying seekable source with sibling objects (other tables'
/// data objects, a table's BLOB object, ...) via `Rc<RefCell<_>>`, matching
/// the single-threaded cooperative model: only one object may be mid-read at
/// a time, but many objects may exist over the lifetime of a database handle.
pub struct PagedObject<R> {
    source: Rc<RefCell<R>>,
    page_size: u32,
    length: u64,
    data_pages: Vec<u64>,
    current_data_page: usize,
    pos_on_page: u64,
}

impl<R: Read + Seek> PagedObject<R> {
    /// Open the object whose header page is at `header_page` (a page index,
    /// not a byte offset), dispatching once on `version` to the right
    /// on-disk parsing strategy.
    pub fn open(source: Rc<RefCell<R>>, version: DbVersion, page_size: u32, header_page: u64) -> Result<Self> {
        let meta = {
            let mut guard = source.borrow_mut();
            match version {
                DbVersion::Legacy => LegacyFormat::read_meta(&mut *guard, page_size, header_page)?,
                DbVersion::Modern => ModernFormat::read_meta(&mut *guard, page_size, header_page)?,
            }
        };
        Ok(PagedObject {
            source,
            page_size,
            length: meta.length,
            data_pages: meta.data_pages,
            current_data_page: 0,
            pos_on_page: 0,
        })
    }

    /// Declared length of the object, in bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Seek to an absolute byte offset within the object's logical data.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.length {
            return Err(BizdbError::OutOfRange(format!(
                "seek to {pos} is past object length {}",
                self.length
            )));
        }
        self.current_data_page = (pos / self.page_size as u64) as usize;
        self.pos_on_page = pos % self.page_size as u64;
        Ok(())
    }

    /// Read up to `buf.len()` bytes, splicing across data-page boundaries as
    /// needed, and return the number of bytes actually read (0 at end of
    /// object). Never reads past the object's declared length.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let total_bytes_left = self
            .length
            .saturating_sub(self.current_data_page as u64 * self.page_size as u64 + self.pos_on_page);
        let mut bytes_left = buf.len() as u64;
        if bytes_left > total_bytes_left {
            bytes_left = total_bytes_left;
        }

        let mut written = 0usize;
        let mut source = self.source.borrow_mut();
        while bytes_left > 0 {
            let page_offset = *self.data_pages.get(self.current_data_page).ok_or_else(|| {
                BizdbError::Corrupt(format!(
                    "object data-page index {} out of range ({} pages known)",
                    self.current_data_page,
                    self.data_pages.len()
                ))
            })?;
            source.seek(SeekFrom::Start(
                self.page_size as u64 * page_offset + self.pos_on_page,
            ))?;

            let max_read = std::cmp::min(self.page_size as u64 - self.pos_on_page, bytes_left);
            source.read_exact(&mut buf[written..written + max_read as usize])?;
            written += max_read as usize;
            bytes_left -= max_read;

            if self.pos_on_page + max_read == self.page_size as u64 {
                self.current_data_page += 1;
                self.pos_on_page = 0;
            } else {
                self.pos_on_page += max_read;
            }
        }
        Ok(written)
    }

    /// Read the remainder of the object (from the current cursor) in full.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let total_bytes_left = self
            .length
            .saturating_sub(self.current_data_page as u64 * self.page_size as u64 + self.pos_on_page);
        let mut buf = vec![0u8; total_bytes_left as usize];
        self.read(&mut buf)?;
        Ok(buf)
    }

    /// Read the whole object from the start, leaving the cursor at the end.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        self.seek(0)?;
        self.read_to_end()
    }
}
