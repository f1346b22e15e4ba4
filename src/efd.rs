//! EFD supply package reader (C10): a whole-file raw-DEFLATE stream wrapping
//! a small metadata catalog followed by the concatenated bytes of every
//! embedded installable file.
//!
//! Out of scope for the core per spec.md §1 ("the EFD unpacker... is a
//! straightforward streaming decompressor + metadata walker"); this module
//! is the thin external collaborator spec.md §6 describes, built entirely on
//! top of [`crate::codec`]'s primitives (nothing here touches paged-object or
//! container internals).

use std::io::Read;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::NaiveDateTime;

use crate::codec::decode_filetime;
use crate::error::{BizdbError, Result};

const SUPPORTED_FORMAT_MARKER: u32 = 1;

/// One `(locale, supply name, provider name, description file path)` tuple
/// from the package's header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyDescription {
    pub locale: String,
    pub supply_name: String,
    pub provider_name: String,
    pub description_path: String,
}

/// One embedded file's catalog record. `path` uses the on-disk Windows-style
/// `\`-separated form; `unpack` is responsible for splitting it into path
/// components for the target filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedFile {
    pub path: String,
    pub filetime: NaiveDateTime,
    pub size: u32,
}

/// The parsed catalog of an EFD supply package, with every included file's
/// bytes still un-extracted (the caller pulls them sequentially via
/// [`SupplyReader::unpack`], which is the only way the source bytes are
/// positioned for it).
pub struct SupplyPackage {
    pub descriptions: Vec<SupplyDescription>,
    pub included_files: Vec<IncludedFile>,
    decompressed: Vec<u8>,
    data_start: usize,
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let char_count = reader.read_u32::<LittleEndian>()? as usize;
    let mut bytes = vec![0u8; char_count * 2];
    reader.read_exact(&mut bytes)?;
    crate::codec::decode_utf16le(&bytes)
}

fn read_supply_description<R: Read>(reader: &mut R) -> Result<SupplyDescription> {
    // Unknown purpose; present in every observed file, skipped verbatim.
    let mut unknown = [0u8; 4];
    reader.read_exact(&mut unknown)?;

    let locale = read_string(reader)?;
    let supply_name = read_string(reader)?;
    let provider_name = read_string(reader)?;
    let description_path = read_string(reader)?;
    Ok(SupplyDescription {
        locale,
        supply_name,
        provider_name,
        description_path,
    })
}

fn read_included_file<R: Read>(reader: &mut R) -> Result<IncludedFile> {
    let mut unknown_a = [0u8; 4];
    reader.read_exact(&mut unknown_a)?;

    let path = read_string(reader)?;
    let ticks = reader.read_u64::<LittleEndian>()?;
    let filetime = decode_filetime(ticks)?;

    let mut unknown_b = [0u8; 4];
    reader.read_exact(&mut unknown_b)?;

    let size = reader.read_u32::<LittleEndian>()?;
    Ok(IncludedFile { path, filetime, size })
}

impl SupplyPackage {
    /// Decompress the whole package (raw DEFLATE, `wbits = -15`, covering the
    /// entire input) and parse its catalog. The concatenated file bytes that
    /// follow the catalog stay in the decompressed buffer, unread, until
    /// [`SupplyPackage::unpack`] walks them.
    pub fn open<R: Read>(mut source: R) -> Result<Self> {
        let mut compressed = Vec::new();
        source.read_to_end(&mut compressed)?;
        let decompressed = crate::container::inflate_raw(&compressed)?;

        let mut cursor = std::io::Cursor::new(&decompressed[..]);
        let format = cursor.read_u32::<LittleEndian>()?;
        if format != SUPPORTED_FORMAT_MARKER {
            return Err(BizdbError::UnsupportedVersion(format!(
                "EFD supply package format marker {format} is not supported (expected {SUPPORTED_FORMAT_MARKER})"
            )));
        }

        let description_count = cursor.read_u32::<LittleEndian>()?;
        let mut descriptions = Vec::with_capacity(description_count as usize);
        for _ in 0..description_count {
            descriptions.push(read_supply_description(&mut cursor)?);
        }

        let included_count = cursor.read_u32::<LittleEndian>()?;
        let mut included_files = Vec::with_capacity(included_count as usize);
        for _ in 0..included_count {
            included_files.push(read_included_file(&mut cursor)?);
        }

        let data_start = cursor.position() as usize;
        Ok(SupplyPackage {
            descriptions,
            included_files,
            decompressed,
            data_start,
        })
    }

    /// Write every included file under `output_dir`, splitting each record's
    /// `\`-separated path into nested directories and setting each file's
    /// modified time from its FILETIME record.
    pub fn unpack(&self, output_dir: &Path) -> Result<()> {
        let mut offset = self.data_start;
        for file in &self.included_files {
            let end = offset + file.size as usize;
            if end > self.decompressed.len() {
                return Err(BizdbError::Corrupt(format!(
                    "included file {:?} declares size {} past the decompressed stream",
                    file.path, file.size
                )));
            }
            let bytes = &self.decompressed[offset..end];

            let relative: PathBuf = file.path.split('\\').collect();
            let target = output_dir.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, bytes)?;

            if let Ok(handle) = std::fs::File::options().write(true).open(&target) {
                let _ = handle.set_modified(std::time::SystemTime::from(
                    file.filetime.and_utc(),
                ));
            }

            offset = end;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_package(descriptions: &[SupplyDescription], files: &[(&str, NaiveDateTime, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&SUPPORTED_FORMAT_MARKER.to_le_bytes());
        buf.extend_from_slice(&(descriptions.len() as u32).to_le_bytes());
        for d in descriptions {
            buf.extend_from_slice(&0u32.to_le_bytes());
            for s in [&d.locale, &d.supply_name, &d.provider_name, &d.description_path] {
                let units: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
                buf.extend_from_slice(&(s.encode_utf16().count() as u32).to_le_bytes());
                buf.extend_from_slice(&units);
            }
        }
        buf.extend_from_slice(&(files.len() as u32).to_le_bytes());
        for (path, filetime, data) in files {
            buf.extend_from_slice(&0u32.to_le_bytes());
            let units: Vec<u8> = path.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
            buf.extend_from_slice(&(path.encode_utf16().count() as u32).to_le_bytes());
            buf.extend_from_slice(&units);
            let base = chrono::NaiveDate::from_ymd_opt(1601, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
            let delta = *filetime - base;
            let filetime_ticks = (delta.num_microseconds().unwrap_or(0) * 10) as u64;
            buf.extend_from_slice(&filetime_ticks.to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
            buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        }
        for (_, _, data) in files {
            buf.extend_from_slice(data);
        }

        let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&buf).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn parses_catalog_and_unpacks_files() {
        let description = SupplyDescription {
            locale: "ru".to_string(),
            supply_name: "Demo".to_string(),
            provider_name: "1C".to_string(),
            description_path: "ReadMe.txt".to_string(),
        };
        let filetime = chrono::NaiveDate::from_ymd_opt(2017, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let bytes = build_package(&[description.clone()], &[("Folder\\a.txt", filetime, b"hello")]);

        let package = SupplyPackage::open(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(package.descriptions, vec![description]);
        assert_eq!(package.included_files.len(), 1);
        assert_eq!(package.included_files[0].path, "Folder\\a.txt");
        assert_eq!(package.included_files[0].size, 5);

        let dir = tempfile::TempDir::new().unwrap();
        package.unpack(dir.path()).unwrap();
        assert_eq!(std::fs::read(dir.path().join("Folder").join("a.txt")).unwrap(), b"hello");
    }

    #[test]
    fn rejects_unsupported_format_marker() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&buf).unwrap();
        let compressed = encoder.finish().unwrap();

        let err = SupplyPackage::open(std::io::Cursor::new(compressed)).unwrap_err();
        assert!(matches!(err, BizdbError::UnsupportedVersion(_)));
    }
}
