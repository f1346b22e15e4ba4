//! Decoders for three proprietary binary formats used by a business-
//! application platform: a paged single-file database, a container archive,
//! and an EFD supply package.
//!
//! # Library layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`codec`] | Primitive byte-level decoders shared by every format (little-endian ints, UTF-16LE, packed-BCD numerics/dates, the two private epoch conventions) |
//! | [`pagedb`] | The paged database: header, paged-object reader, BLOB chains, table schema parsing, row decoding, and the [`pagedb::Database`]/[`pagedb::Table`] facade |
//! | [`container`] | The container archive: header, block chains, table-of-contents walker, and the [`container::ContainerWriter`]/[`container::build`]/[`container::extract`] write path |
//! | [`efd`] | The EFD supply package: a whole-file raw-DEFLATE catalog of embedded installable files |
//!
//! # Quick examples
//!
//! Opening a paged database and reading a table:
//!
//! ```no_run
//! use bizdb::pagedb::Database;
//! use std::fs::File;
//!
//! let db = Database::open(File::open("1Cv8.1CD").unwrap()).unwrap();
//! let table = db.table("Catalog").unwrap();
//! for row in table.rows().unwrap() {
//!     let row = row.unwrap();
//!     if !row.is_empty() {
//!         let _ = row.field(table.schema(), "Code").unwrap();
//!     }
//! }
//! ```
//!
//! Listing and extracting a container:
//!
//! ```no_run
//! use bizdb::container::{extract, Container};
//! use std::fs::File;
//! use std::path::Path;
//!
//! let container = Container::open(File::open("1Cv8.cf").unwrap()).unwrap();
//! for entry in container.entries() {
//!     println!("{} ({} bytes)", entry.name, entry.size);
//! }
//! extract(&container, Path::new("out"), true, true).unwrap();
//! ```
//!
//! # CLI
//!
//! The `bizdb` binary (`cli` feature, on by default) is a thin front end over
//! this library: `bizdb db`, `bizdb container list|extract`, and
//! `bizdb supply unpack`. It holds no parsing logic of its own — see the
//! [`cli`] module.
//!
//! # Scope
//!
//! Writing the database format, in-place editing, index use, and concurrent
//! writers to the same container are out of scope; see spec.md for the full
//! non-goals list carried into this crate's design.

pub mod codec;
#[cfg(feature = "cli")]
pub mod cli;
pub mod container;
pub mod efd;
pub mod error;
pub mod pagedb;

pub use error::{BizdbError, Result};
