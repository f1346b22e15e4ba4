//! Database facade (C6): opens a paged database file and exposes its tables.
//!
//! Mirrors the three-layer structure of the original reader: a header (C2
//! prerequisite), a root object listing every table's textual description,
//! and then per-table paged data objects. The root object's own encoding is
//! version-dependent — legacy stores it as a plain paged object decoded as
//! UTF-16LE; modern stores it as a BLOB-chunked object (chunk offset `1` for
//! the header, one chunk offset per table) decoded as UTF-8 — so `open`
//! dispatches once on [`DbVersion`] the same way [`PagedObject::open`] does.

use std::cell::RefCell;
use std::io::{Read, Seek};
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{BizdbError, Result};
use crate::pagedb::blob::{BlobKind, BlobReader, BlobValue};
use crate::pagedb::header::{read_header, DbVersion};
use crate::pagedb::object::PagedObject;
use crate::pagedb::row::{open_blob, read_blob, BlobRef, Row};
use crate::pagedb::schema::{parse_table_schema, TableSchema};

const ROOT_OBJECT_PAGE: u64 = 2;
const ROOT_HEADER_SIZE: usize = 32 + 4;

fn decode_locale(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn read_root_object<R: Read + Seek>(
    source: &Rc<RefCell<R>>,
    version: DbVersion,
    page_size: u32,
) -> Result<(String, Vec<String>)> {
    match version {
        DbVersion::Legacy => {
            let mut object = PagedObject::open(Rc::clone(source), version, page_size, ROOT_OBJECT_PAGE)?;
            let buffer = object.read_all()?;
            if buffer.len() < ROOT_HEADER_SIZE {
                return Err(BizdbError::Corrupt("root object shorter than its own header".into()));
            }
            let locale = decode_locale(&buffer[0..32]);
            let tables_count = LittleEndian::read_i32(&buffer[32..36]) as usize;

            let offsets_needed = ROOT_HEADER_SIZE + tables_count * 4;
            if buffer.len() < offsets_needed {
                return Err(BizdbError::Corrupt("root object too short for its table offset list".into()));
            }
            let mut descriptions = Vec::with_capacity(tables_count);
            for i in 0..tables_count {
                let start = ROOT_HEADER_SIZE + i * 4;
                let offset = LittleEndian::read_u32(&buffer[start..start + 4]) as u64;
                let mut table_object = PagedObject::open(Rc::clone(source), version, page_size, offset)?;
                let raw = table_object.read_all()?;
                let text = crate::codec::decode_utf16le(&raw)?;
                descriptions.push(text);
            }
            Ok((locale, descriptions))
        }
        DbVersion::Modern => {
            let root_object = PagedObject::open(Rc::clone(source), version, page_size, ROOT_OBJECT_PAGE)?;
            let total_size = root_object.len();

            let header_ref = BlobRef {
                first_chunk: 1,
                total_size,
                kind: BlobKind::Binary,
            };
            let buffer = match read_blob(Rc::clone(source), version, page_size, ROOT_OBJECT_PAGE, header_ref)? {
                BlobValue::Binary(bytes) => bytes,
                BlobValue::Text(_) => unreachable!("requested Binary kind"),
            };
            if buffer.len() < ROOT_HEADER_SIZE {
                return Err(BizdbError::Corrupt("root object shorter than its own header".into()));
            }
            let locale = decode_locale(&buffer[0..32]);
            let tables_count = LittleEndian::read_i32(&buffer[32..36]) as usize;

            let offsets_needed = ROOT_HEADER_SIZE + tables_count * 4;
            if buffer.len() < offsets_needed {
                return Err(BizdbError::Corrupt("root object too short for its table offset list".into()));
            }
            let mut descriptions = Vec::with_capacity(tables_count);
            for i in 0..tables_count {
                let start = ROOT_HEADER_SIZE + i * 4;
                let chunk_offset = LittleEndian::read_u32(&buffer[start..start + 4]) as u64;
                let table_ref = BlobRef {
                    first_chunk: chunk_offset,
                    total_size,
                    kind: BlobKind::Binary,
                };
                let raw = match read_blob(Rc::clone(source), version, page_size, ROOT_OBJECT_PAGE, table_ref)? {
                    BlobValue::Binary(bytes) => bytes,
                    BlobValue::Text(_) => unreachable!("requested Binary kind"),
                };
                descriptions.push(String::from_utf8(raw).map_err(|e| BizdbError::Encoding(e.to_string()))?);
            }
            Ok((locale, descriptions))
        }
    }
}

/// An open paged database file, with every table's schema already parsed.
pub struct Database<R> {
    source: Rc<RefCell<R>>,
    pub version_str: String,
    pub version: DbVersion,
    pub total_pages: u32,
    pub page_size: u32,
    pub locale: String,
    tables: Vec<Table<R>>,
}

impl<R: Read + Seek> Database<R> {
    /// Open a database from a seekable source, reading the header and every
    /// table's schema eagerly (row data itself stays unread until accessed).
    pub fn open(source: R) -> Result<Self> {
        let source = Rc::new(RefCell::new(source));

        let header = {
            let mut guard = source.borrow_mut();
            read_header(&mut *guard)?
        };

        let (locale, descriptions) = read_root_object(&source, header.version, header.page_size)?;

        let mut tables = Vec::with_capacity(descriptions.len());
        for description in descriptions {
            let schema = parse_table_schema(&description)?;
            let data_object = PagedObject::open(
                Rc::clone(&source),
                header.version,
                header.page_size,
                schema.data_offset as u64,
            )?;
            tables.push(Table {
                source: Rc::clone(&source),
                version: header.version,
                page_size: header.page_size,
                schema,
                data_object: RefCell::new(data_object),
            });
        }

        Ok(Database {
            source,
            version_str: header.version_str,
            version: header.version,
            total_pages: header.total_pages,
            page_size: header.page_size,
            locale,
            tables,
        })
    }

    /// Every table, in the order the root object lists them.
    pub fn tables(&self) -> &[Table<R>] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Result<&Table<R>> {
        self.tables
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| BizdbError::Key(format!("unknown table {name:?}")))
    }
}

/// One table's parsed schema plus lazy row access over its shared data object.
pub struct Table<R> {
    source: Rc<RefCell<R>>,
    version: DbVersion,
    page_size: u32,
    schema: TableSchema,
    data_object: RefCell<PagedObject<R>>,
}

impl<R: Read + Seek> Table<R> {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Number of rows, including empty (deleted) ones.
    pub fn len(&self) -> Result<u64> {
        let data_length = self.data_object.borrow().len();
        if data_length % self.schema.row_length != 0 {
            return Err(BizdbError::Corrupt(format!(
                "table {:?} data object length {data_length} is not a multiple of its row length {}",
                self.schema.name, self.schema.row_length
            )));
        }
        Ok(data_length / self.schema.row_length)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Random-access read of one row by index.
    pub fn at(&self, index: u64) -> Result<Row> {
        let count = self.len()?;
        if index >= count {
            return Err(BizdbError::OutOfRange(format!(
                "row index {index} is outside table {:?} (length {count})",
                self.schema.name
            )));
        }
        let mut object = self.data_object.borrow_mut();
        object.seek(self.schema.row_length * index)?;
        let mut buf = vec![0u8; self.schema.row_length as usize];
        object.read(&mut buf)?;
        Ok(Row::new(buf))
    }

    /// A fresh sequential iterator over every row, from the start.
    pub fn rows(&self) -> Result<RowIter<'_, R>> {
        self.data_object.borrow_mut().seek(0)?;
        Ok(RowIter { table: self })
    }

    /// Open a streaming reader for a BLOB field value previously read from a
    /// row of this table.
    pub fn open_blob(&self, blob_ref: BlobRef) -> Result<BlobReader<R>> {
        open_blob(
            Rc::clone(&self.source),
            self.version,
            self.page_size,
            self.schema.blob_offset as u64,
            blob_ref,
        )
    }

    /// Fully materialize a BLOB field value previously read from a row of
    /// this table.
    pub fn read_blob(&self, blob_ref: BlobRef) -> Result<BlobValue> {
        read_blob(
            Rc::clone(&self.source),
            self.version,
            self.page_size,
            self.schema.blob_offset as u64,
            blob_ref,
        )
    }
}

/// Sequential row iterator over a [`Table`]'s shared data object.
pub struct RowIter<'a, R> {
    table: &'a Table<R>,
}

impl<'a, R: Read + Seek> Iterator for RowIter<'a, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut object = self.table.data_object.borrow_mut();
        let mut buf = vec![0u8; self.table.schema.row_length as usize];
        match object.read(&mut buf) {
            Ok(0) => None,
            Ok(n) if n < buf.len() => Some(Err(BizdbError::Corrupt(format!(
                "short row read in table {:?}: got {n} of {} bytes",
                self.table.schema.name,
                buf.len()
            )))),
            Ok(_) => Some(Ok(Row::new(buf))),
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LEGACY_SIGNATURE: &[u8; 8] = b"1CDBOBV8";
    const LEGACY_PAGE_SIZE: u32 = 4096;

    /// Builds a minimal single-table legacy database: header page, root
    /// object (page 2) listing one table description, that table
    /// description's own object, and an empty data object for the table.
    fn build_legacy_database(page_size: u32, table_description_utf16: &[u8]) -> Vec<u8> {
        // Page layout:
        // 0: file header (reused as a one-page blob, no index pages needed since it fits)
        // 1: unused
        // 2: root object header (ROOT_OBJECT_PAGE)
        // 3: root object index page
        // 4: root object data page
        // 5: table description object header
        // 6: table description object index page
        // 7: table description object data page
        // 8: table data object header (empty table: length 0, no index pages)
        let mut file = vec![0u8; page_size as usize * 9];

        // File header at page 0.
        let mut header = Vec::new();
        header.extend_from_slice(b"1CDBXXXX");
        header.extend_from_slice(&[8, 2, 14, 0]);
        header.extend_from_slice(&9u32.to_le_bytes());
        header.extend_from_slice(&0i32.to_le_bytes());
        header.resize(page_size as usize, 0);
        file[0..page_size as usize].copy_from_slice(&header);

        // Root object content: 32-byte locale + i32 table count + 1 offset (page 5).
        let mut root_content = vec![0u8; 32];
        root_content[0] = b'e';
        root_content[1] = b'n';
        root_content.extend_from_slice(&1i32.to_le_bytes());
        root_content.extend_from_slice(&5u32.to_le_bytes());
        write_legacy_object(&mut file, page_size, 2, 3, 4, &root_content);

        // Table description object at page 5 (UTF-16LE text).
        write_legacy_object(&mut file, page_size, 5, 6, 7, table_description_utf16);

        // Table data object at page 8: empty (no index pages, length 0).
        let mut data_header = Vec::new();
        data_header.extend_from_slice(LEGACY_SIGNATURE);
        data_header.extend_from_slice(&0i32.to_le_bytes());
        data_header.extend_from_slice(&0i32.to_le_bytes());
        data_header.extend_from_slice(&0i32.to_le_bytes());
        data_header.extend_from_slice(&0u32.to_le_bytes());
        data_header.resize(page_size as usize, 0);
        file[page_size as usize * 8..page_size as usize * 9].copy_from_slice(&data_header);

        file
    }

    /// Writes a legacy paged object (header + one index page + data pages)
    /// whose content fits in a single data page.
    fn write_legacy_object(file: &mut [u8], page_size: u32, header_page: u64, index_page: u64, data_page: u64, content: &[u8]) {
        assert!(content.len() <= page_size as usize);

        let mut header = Vec::new();
        header.extend_from_slice(LEGACY_SIGNATURE);
        header.extend_from_slice(&(content.len() as i32).to_le_bytes());
        header.extend_from_slice(&0i32.to_le_bytes());
        header.extend_from_slice(&0i32.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&(index_page as u32).to_le_bytes());
        header.resize(page_size as usize, 0);
        let start = page_size as usize * header_page as usize;
        file[start..start + page_size as usize].copy_from_slice(&header);

        let mut index = Vec::new();
        index.extend_from_slice(&1i32.to_le_bytes());
        index.extend_from_slice(&(data_page as u32).to_le_bytes());
        index.resize(page_size as usize, 0);
        let start = page_size as usize * index_page as usize;
        file[start..start + page_size as usize].copy_from_slice(&index);

        let mut data = content.to_vec();
        data.resize(page_size as usize, 0);
        let start = page_size as usize * data_page as usize;
        file[start..start + page_size as usize].copy_from_slice(&data);
    }

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn opens_single_empty_table() {
        // Legacy format's page size is hardcoded (spec.md §3); the fixture
        // must be laid out at that same 4096-byte pitch for `Database::open`
        // (which derives `page_size` from the header, not from the caller)
        // to resolve the same offsets this test wrote.
        let page_size = LEGACY_PAGE_SIZE;
        let description = "{\"Catalog\",\n{\"Fields\",\n{\"Code\",\"NC\",0,3,0,\"CS\"}\n},\n{\"Indexes\",\n},\n{\"Recordlock\",\"0\"},\n{\"Files\",8,9,10}\n}";
        let bytes = build_legacy_database(page_size, &utf16le(description));

        let db = Database::open(Cursor::new(bytes)).unwrap();
        assert_eq!(db.version, DbVersion::Legacy);
        assert_eq!(db.locale, "en");
        assert_eq!(db.tables().len(), 1);

        let table = db.table("Catalog").unwrap();
        assert_eq!(table.len().unwrap(), 0);
        assert!(table.is_empty().unwrap());
        assert!(table.rows().unwrap().next().is_none());
    }

    #[test]
    fn unknown_table_name_is_key_error() {
        let page_size = LEGACY_PAGE_SIZE;
        let description = "{\"Catalog\",\n{\"Fields\",\n{\"Code\",\"NC\",0,3,0,\"CS\"}\n},\n{\"Indexes\",\n},\n{\"Recordlock\",\"0\"},\n{\"Files\",8,9,10}\n}";
        let bytes = build_legacy_database(page_size, &utf16le(description));
        let db = Database::open(Cursor::new(bytes)).unwrap();
        let err = db.table("Nope").unwrap_err();
        assert!(matches!(err, BizdbError::Key(_)));
    }
}
