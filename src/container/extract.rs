//! The `extract` driver (C8's `Extract` operation): materializes every
//! container entry to disk, optionally inflating payloads and recursing
//! into nested containers.
//!
//! Sequential by design — see the design notes on the source's malformed
//! threaded extractor; parallelizing across entries is a caller-level
//! concern over independent, re-opened file handles.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use crate::container::{inflate_raw, Container, Entry, NESTED_CONTAINER_MARKER};
use crate::error::{BizdbError, Result};

/// Extract every entry of `container` into `dest`.
///
/// If `dest` already exists it must be an empty directory (matching the
/// source's `rmdir`-then-`makedirs` precondition — a non-empty destination
/// fails rather than silently merging). When `deflate` is set, each entry's
/// payload is raw-DEFLATE decompressed before being written. When
/// `recursive` is set, any written file whose first four bytes are
/// `FF FF FF 7F` is treated as a nested container: it is renamed aside,
/// reopened, and extracted into a directory of the original name.
pub fn extract<R: Read + Seek>(container: &Container<R>, dest: &Path, deflate: bool, recursive: bool) -> Result<()> {
    prepare_destination(dest)?;
    for entry in container.entries() {
        extract_entry(container, entry, dest, deflate, recursive)?;
    }
    Ok(())
}

fn prepare_destination(dest: &Path) -> Result<()> {
    if dest.is_dir() {
        std::fs::remove_dir(dest).map_err(|e| {
            BizdbError::Io(format!(
                "destination {} already exists and is not empty: {e}",
                dest.display()
            ))
        })?;
    }
    std::fs::create_dir_all(dest)?;
    Ok(())
}

fn extract_entry<R: Read + Seek>(
    container: &Container<R>,
    entry: &Entry,
    dest: &Path,
    deflate: bool,
    recursive: bool,
) -> Result<()> {
    let raw = entry.read_data(container.source())?;
    let bytes = if deflate { inflate_raw(&raw)? } else { raw };

    let file_path = dest.join(&entry.name);
    std::fs::write(&file_path, &bytes)?;

    if recursive && bytes.starts_with(&NESTED_CONTAINER_MARKER) {
        extract_nested(&file_path)?;
    }

    Ok(())
}

fn extract_nested(file_path: &Path) -> Result<()> {
    let temp_path = file_path.with_extension(match file_path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    });
    std::fs::rename(file_path, &temp_path)?;

    let result = (|| -> Result<()> {
        let file = File::open(&temp_path)?;
        let nested = Container::open(file)?;
        // A nested container's own entries were never independently
        // compressed by the writer (see `build`'s policy); only the
        // recursive unpacking is inherited.
        extract(&nested, file_path, false, true)
    })();

    std::fs::remove_file(&temp_path)?;
    result
}
