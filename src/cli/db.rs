use std::fs::File;
use std::io::Write;

use colored::Colorize;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::cli::wprintln;
use crate::pagedb::{Database, Table};
use crate::BizdbError;

/// Options for the `bizdb db` subcommand.
pub struct DbOptions {
    pub file: String,
    pub table: Option<String>,
    pub json: bool,
}

/// Inspect a paged database: with no `--table`, print every table's row
/// count; with `--table NAME`, dump that table's rows.
pub fn execute(opts: &DbOptions, writer: &mut dyn Write) -> Result<(), BizdbError> {
    let file = File::open(&opts.file).map_err(|e| BizdbError::Io(format!("cannot open {}: {e}", opts.file)))?;
    let db = Database::open(file)?;
    debug!(version = %db.version_str, page_size = db.page_size, tables = db.tables().len(), "opened database");

    match &opts.table {
        Some(name) => dump_table(db.table(name)?, opts.json, writer),
        None => summarize_tables(&db, opts.json, writer),
    }
}

fn summarize_tables<R: std::io::Read + std::io::Seek>(
    db: &Database<R>,
    json: bool,
    writer: &mut dyn Write,
) -> Result<(), BizdbError> {
    if json {
        let mut rows = Vec::new();
        for table in db.tables() {
            rows.push(serde_json::json!({
                "name": table.name(),
                "rows": table.len()?,
                "fields": table.schema().fields.len(),
            }));
        }
        let doc = serde_json::json!({
            "version": db.version_str,
            "page_size": db.page_size,
            "locale": db.locale,
            "tables": rows,
        });
        return wprintln!(writer, "{}", serde_json::to_string_pretty(&doc).unwrap());
    }

    wprintln!(
        writer,
        "{} ({} pages, page size {}, locale {:?})",
        db.version_str.bold(),
        db.total_pages,
        db.page_size,
        db.locale
    )?;
    for table in db.tables() {
        wprintln!(writer, "  {:<32} {:>10} rows", table.name(), table.len()?)?;
    }
    Ok(())
}

fn dump_table<R: std::io::Read + std::io::Seek>(
    table: &Table<R>,
    json: bool,
    writer: &mut dyn Write,
) -> Result<(), BizdbError> {
    let schema = table.schema();
    let field_names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();

    if json {
        let mut out = Vec::new();
        for row in table.rows()? {
            let row = row?;
            if row.is_empty() {
                continue;
            }
            let mut map = Map::new();
            for name in &field_names {
                let value = row.field(schema, name)?;
                map.insert((*name).to_string(), value.map_or(JsonValue::Null, |v| serde_json::to_value(v).unwrap()));
            }
            out.push(JsonValue::Object(map));
        }
        return wprintln!(writer, "{}", serde_json::to_string_pretty(&out).unwrap());
    }

    wprintln!(writer, "{}", field_names.join("\t").bold())?;
    for row in table.rows()? {
        let row = row?;
        if row.is_empty() {
            continue;
        }
        let mut cells = Vec::with_capacity(field_names.len());
        for name in &field_names {
            let value = row.field(schema, name)?;
            cells.push(match value {
                Some(v) => format!("{v:?}"),
                None => "NULL".to_string(),
            });
        }
        wprintln!(writer, "{}", cells.join("\t"))?;
    }
    Ok(())
}
