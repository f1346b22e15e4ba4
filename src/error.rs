//! Crate-wide error type.
//!
//! A single flat enum rather than a per-module hierarchy, following the
//! taxonomy of kinds (not names) that the formats actually fail with: I/O,
//! version/variant gates, structural corruption, schema mismatch, encoding
//! failure, unknown keys, and out-of-range access.

use thiserror::Error;

/// Errors returned by `bizdb` operations.
#[derive(Error, Debug)]
pub enum BizdbError {
    /// An I/O error occurred (open, read, seek, or write failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// The file's declared format version is not one of the supported ones.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(String),

    /// A recognized but unimplemented on-disk variant (free-list object,
    /// `fat_level >= 2`, ...).
    #[error("Unsupported variant: {0}")]
    UnsupportedVariant(String),

    /// A container has a zero default block size.
    #[error("Container is empty: {0}")]
    Empty(String),

    /// Malformed binary data: bad signature, non-terminating chain, row
    /// length mismatch, malformed table of contents.
    #[error("Corrupt data: {0}")]
    Corrupt(String),

    /// A textual table/field description did not match the expected grammar.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid UTF-16 (or other encoded) data.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// An unknown field/column name was requested.
    #[error("Unknown key: {0}")]
    Key(String),

    /// A row index or seek position was past the end of the addressable data.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// An invalid argument was supplied by the caller.
    #[error("Invalid argument: {0}")]
    Argument(String),
}

impl From<std::io::Error> for BizdbError {
    fn from(e: std::io::Error) -> Self {
        BizdbError::Io(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BizdbError>;
