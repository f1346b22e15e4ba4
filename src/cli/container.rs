use std::fs::File;
use std::io::Write;
use std::path::Path;

use colored::Colorize;
use tracing::debug;

use crate::cli::wprintln;
use crate::container::{extract as extract_container, Container};
use crate::BizdbError;

/// Options for `bizdb container list`.
pub struct ListOptions {
    pub file: String,
    pub json: bool,
}

/// Options for `bizdb container extract`.
pub struct ExtractOptions {
    pub file: String,
    pub dir: String,
    pub deflate: bool,
    pub recursive: bool,
}

/// List every entry of a container archive.
pub fn list(opts: &ListOptions, writer: &mut dyn Write) -> Result<(), BizdbError> {
    let file = File::open(&opts.file).map_err(|e| BizdbError::Io(format!("cannot open {}: {e}", opts.file)))?;
    let container = Container::open(file)?;
    debug!(entries = container.entries().len(), "opened container");

    if opts.json {
        let rows: Vec<_> = container
            .entries()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "size": e.size,
                    "created": e.created.to_string(),
                    "modified": e.modified.to_string(),
                })
            })
            .collect();
        return wprintln!(writer, "{}", serde_json::to_string_pretty(&rows).unwrap());
    }

    for entry in container.entries() {
        wprintln!(
            writer,
            "{:<40} {:>10}  {}",
            entry.name.bold(),
            entry.size,
            entry.modified
        )?;
    }
    Ok(())
}

/// Extract every entry of a container archive to a directory.
pub fn extract(opts: &ExtractOptions, writer: &mut dyn Write) -> Result<(), BizdbError> {
    let file = File::open(&opts.file).map_err(|e| BizdbError::Io(format!("cannot open {}: {e}", opts.file)))?;
    let container = Container::open(file)?;
    let dest = Path::new(&opts.dir);
    extract_container(&container, dest, opts.deflate, opts.recursive)?;
    wprintln!(
        writer,
        "extracted {} entries to {}",
        container.entries().len(),
        opts.dir.bold()
    )
}
