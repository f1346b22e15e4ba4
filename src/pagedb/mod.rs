//! The paged single-file database format (C2-C6): header, paged-object
//! reader, BLOB chains, table schema parsing, row decoding, and the
//! [`Database`]/[`Table`] facade that ties them together.

pub mod blob;
pub mod database;
pub mod header;
pub mod object;
pub mod row;
pub mod schema;

pub use blob::{BlobKind, BlobReader, BlobValue};
pub use database::{Database, RowIter, Table};
pub use header::{DbHeader, DbVersion};
pub use object::PagedObject;
pub use row::{open_blob, read_blob, BlobRef, Row, Value};
pub use schema::{FieldDescription, FieldType, TableSchema};
