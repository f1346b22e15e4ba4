//! Database file header (C2 prerequisite).

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{BizdbError, Result};

/// Which on-disk paged-object encoding a database uses.
///
/// Chosen once from the header's version string and carried alongside the
/// database for the lifetime of the handle; the read/seek loop over a paged
/// object never re-examines it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbVersion {
    /// `8.2.14.0`: fixed 4096-byte pages, `1CDBOBV8` object signature.
    Legacy,
    /// `8.3.8.0`: self-describing page size, `1C FD`/`1C FF` object signature.
    Modern,
}

impl DbVersion {
    fn from_str(version: &str) -> Result<Self> {
        match version {
            "8.2.14.0" => Ok(DbVersion::Legacy),
            "8.3.8.0" => Ok(DbVersion::Modern),
            other => Err(BizdbError::UnsupportedVersion(format!(
                "database format version {other} is not supported (expected 8.2.14.0 or 8.3.8.0)"
            ))),
        }
    }
}

/// The parsed database file header.
#[derive(Debug, Clone)]
pub struct DbHeader {
    pub version_str: String,
    pub version: DbVersion,
    pub total_pages: u32,
    pub page_size: u32,
}

const LEGACY_PAGE_SIZE: u32 = 4096;

/// Read and validate the database header from the start of `reader`.
///
/// Stops as soon as the version is known to be unsupported — no bytes past
/// the header are read in that case, matching the version-gate contract.
pub fn read_header<R: Read>(reader: &mut R) -> Result<DbHeader> {
    let mut signature = [0u8; 8];
    reader.read_exact(&mut signature)?;

    let mut version_bytes = [0u8; 4];
    reader.read_exact(&mut version_bytes)?;
    let version_str = version_bytes
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(".");
    let version = DbVersion::from_str(&version_str)?;

    let total_pages = reader.read_u32::<LittleEndian>()?;
    // Reserved i32 whose meaning is unknown; present in every observed file.
    let _reserved = reader.read_i32::<LittleEndian>()?;

    let page_size = match version {
        DbVersion::Legacy => LEGACY_PAGE_SIZE,
        DbVersion::Modern => reader.read_u32::<LittleEndian>()?,
    };

    Ok(DbHeader {
        version_str,
        version,
        total_pages,
        page_size,
    })
}
