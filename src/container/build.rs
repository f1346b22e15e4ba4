//! The `build` driver: recursively packages a directory tree into a
//! container, mirroring the on-disk compression policy observed in the
//! source — top-level entries (files and nested-directory containers) are
//! compressed, anything deeper in the tree is stored as-is.

use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::container::writer::ContainerWriter;
use crate::error::Result;

fn system_time_to_naive(t: SystemTime) -> NaiveDateTime {
    DateTime::<Utc>::from(t).naive_utc()
}

fn file_times(metadata: &std::fs::Metadata) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let modified = metadata.modified()?;
    // `created()` isn't available on every platform/filesystem; fall back to
    // `modified` rather than failing the whole build over it.
    let created = metadata.created().unwrap_or(modified);
    Ok((system_time_to_naive(created), system_time_to_naive(modified)))
}

fn add_entries<W: Write + Seek>(writer: &mut ContainerWriter<W>, dir: &Path, nested: bool) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = entry.metadata()?;
        let (created, modified) = file_times(&metadata)?;
        let compress = !nested;

        if path.is_dir() {
            let mut nested_writer = ContainerWriter::create(Cursor::new(Vec::new()))?;
            add_entries(&mut nested_writer, &path, true)?;
            let buf = nested_writer.finish()?;
            writer.add_file(&name, buf.get_ref(), created, modified, compress)?;
        } else {
            let bytes = std::fs::read(&path)?;
            writer.add_file(&name, &bytes, created, modified, compress)?;
        }
    }
    Ok(())
}

/// Package `dir` (including nested subdirectories, each as its own nested
/// container entry) into a new container file at `out`.
pub fn build(dir: &Path, out: &Path) -> Result<()> {
    let file = File::create(out)?;
    let mut writer = ContainerWriter::create(file)?;
    add_entries(&mut writer, dir, false)?;
    writer.finish()?;
    Ok(())
}
