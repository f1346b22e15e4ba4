use std::fs::File;
use std::io::Write;
use std::path::Path;

use colored::Colorize;
use tracing::debug;

use crate::cli::wprintln;
use crate::efd::SupplyPackage;
use crate::BizdbError;

/// Options for `bizdb supply unpack`.
pub struct UnpackOptions {
    pub file: String,
    pub dir: String,
}

/// Unpack an EFD supply package's embedded files to a directory.
pub fn unpack(opts: &UnpackOptions, writer: &mut dyn Write) -> Result<(), BizdbError> {
    let file = File::open(&opts.file).map_err(|e| BizdbError::Io(format!("cannot open {}: {e}", opts.file)))?;
    let package = SupplyPackage::open(file)?;
    debug!(
        descriptions = package.descriptions.len(),
        files = package.included_files.len(),
        "opened EFD supply package"
    );

    package.unpack(Path::new(&opts.dir))?;

    for description in &package.descriptions {
        wprintln!(
            writer,
            "{} ({}, {})",
            description.supply_name.bold(),
            description.locale,
            description.provider_name
        )?;
    }
    wprintln!(
        writer,
        "unpacked {} files to {}",
        package.included_files.len(),
        opts.dir.bold()
    )
}
