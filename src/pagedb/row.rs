//! Row decoder (C5): given a row byte slab and a table's schema, decodes
//! typed field values lazily, one field at a time.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::rc::Rc;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::codec::{decode_dt, decode_numeric, decode_nvc, decode_rv, decode_utf16le, Numeric};
use crate::error::{BizdbError, Result};
use crate::pagedb::blob::{BlobKind, BlobReader, BlobValue};
use crate::pagedb::header::DbVersion;
use crate::pagedb::object::PagedObject;
use crate::pagedb::schema::{FieldType, TableSchema};

/// A reference to a BLOB-backed (`NT`/`I`) field value: enough to open an
/// independent [`BlobReader`] without pinning the row's own lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobRef {
    pub first_chunk: u64,
    pub total_size: u64,
    pub kind: BlobKind,
}

/// A decoded row field value.
///
/// Serializes untagged (matching the common pattern of a JSON-facing value
/// enum), so a CLI `--json` dump renders `Value::Integer` as a bare number
/// and `Value::Blob` as its byte length + decoded text, not an internal tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bytes(Vec<u8>),
    Bool(bool),
    Integer(i128),
    Rational(String),
    String(String),
    DateTime(Option<NaiveDateTime>),
    RowVersion(String),
    #[serde(skip)]
    BlobRef(BlobRef),
}

/// One decoded row. Field values are decoded on first access and cached.
pub struct Row {
    bytes: Vec<u8>,
    is_empty: bool,
    cache: RefCell<HashMap<String, Option<Value>>>,
}

impl Row {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        let is_empty = bytes.first() == Some(&0x01);
        Row {
            bytes,
            is_empty,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// `true` when the row's status byte marks it free/empty; every field
    /// access on such a row returns `None` regardless of the bytes in its slot.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Decode and return the named field's value, or `None` for NULL / an
    /// empty row. Fails with [`BizdbError::Key`] for an undeclared field name.
    pub fn field(&self, schema: &TableSchema, name: &str) -> Result<Option<Value>> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(cached.clone());
        }

        let field = schema.field(name)?;
        if self.is_empty {
            self.cache.borrow_mut().insert(name.to_string(), None);
            return Ok(None);
        }

        let start = field.data_offset as usize;
        let end = start + field.data_length as usize;
        if end > self.bytes.len() {
            return Err(BizdbError::Corrupt(format!(
                "field {name:?} data slot [{start}..{end}) exceeds row length {}",
                self.bytes.len()
            )));
        }
        let mut slot = &self.bytes[start..end];

        if field.null_exists {
            if slot[0] == 0x00 {
                self.cache.borrow_mut().insert(name.to_string(), None);
                return Ok(None);
            }
            slot = &slot[1..];
        }

        let value = decode_field(field.field_type, slot, field.length, field.precision)?;
        self.cache.borrow_mut().insert(name.to_string(), Some(value.clone()));
        Ok(Some(value))
    }
}

fn decode_field(field_type: FieldType, slot: &[u8], length: u32, precision: u32) -> Result<Value> {
    match field_type {
        FieldType::Binary => Ok(Value::Bytes(slot.to_vec())),
        FieldType::Bool => Ok(Value::Bool(slot[0] != 0)),
        FieldType::Numeric => {
            let n: Numeric = decode_numeric(slot, length as usize, precision as usize)?;
            if n.fractional_digits.is_empty() {
                match n.to_i128() {
                    Some(i) => Ok(Value::Integer(i)),
                    None => Ok(Value::Rational(n.to_string())),
                }
            } else {
                Ok(Value::Rational(n.to_string()))
            }
        }
        FieldType::FixedString => Ok(Value::String(decode_utf16le(slot)?)),
        FieldType::VarString => Ok(Value::String(decode_nvc(slot)?)),
        FieldType::RowVersion => Ok(Value::RowVersion(decode_rv(slot)?)),
        FieldType::LargeText | FieldType::LargeBinary => {
            let first_chunk = u32::from_le_bytes(slot[0..4].try_into().unwrap()) as u64;
            let total_size = u32::from_le_bytes(slot[4..8].try_into().unwrap()) as u64;
            let kind = if field_type == FieldType::LargeText {
                BlobKind::Text
            } else {
                BlobKind::Binary
            };
            Ok(Value::BlobRef(BlobRef {
                first_chunk,
                total_size,
                kind,
            }))
        }
        FieldType::DateTime => Ok(Value::DateTime(decode_dt(slot)?)),
    }
}

/// Open a reader for a [`BlobRef`] previously returned from [`Row::field`],
/// bound to the table's shared BLOB object.
pub fn open_blob<R: Read + Seek>(
    blob_object_source: Rc<RefCell<R>>,
    version: DbVersion,
    page_size: u32,
    blob_header_page: u64,
    blob_ref: BlobRef,
) -> Result<BlobReader<R>> {
    let object = PagedObject::open(blob_object_source, version, page_size, blob_header_page)?;
    Ok(BlobReader::new(object, blob_ref.first_chunk, blob_ref.total_size, blob_ref.kind))
}

/// Convenience: fully materialize a [`BlobRef`] in one call.
pub fn read_blob<R: Read + Seek>(
    blob_object_source: Rc<RefCell<R>>,
    version: DbVersion,
    page_size: u32,
    blob_header_page: u64,
    blob_ref: BlobRef,
) -> Result<BlobValue> {
    open_blob(blob_object_source, version, page_size, blob_header_page, blob_ref)?.materialize()
}
