//! Table-schema parser (C4): turns a table's textual description into an
//! ordered field list with computed on-row offsets.
//!
//! The on-disk grammar is a hand-written bracket notation, not JSON — there
//! is no serde/json crate in play here and no regex dependency pulled in for
//! it either, so this is a small hand-rolled scanner rather than a pattern
//! match.

use crate::error::{BizdbError, Result};

/// A table column's declared type, from the single-letter on-disk code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `B`: opaque binary.
    Binary,
    /// `L`: boolean.
    Bool,
    /// `N`: packed-BCD decimal.
    Numeric,
    /// `NC`: fixed-length UTF-16LE string.
    FixedString,
    /// `NVC`: length-prefixed UTF-16LE string.
    VarString,
    /// `RV`: row-version pseudo-field.
    RowVersion,
    /// `NT`: large text (BLOB reference).
    LargeText,
    /// `I`: large binary (BLOB reference).
    LargeBinary,
    /// `DT`: packed-BCD date-time.
    DateTime,
}

impl FieldType {
    fn parse(code: &str) -> Result<Self> {
        match code {
            "B" => Ok(FieldType::Binary),
            "L" => Ok(FieldType::Bool),
            "N" => Ok(FieldType::Numeric),
            "NC" => Ok(FieldType::FixedString),
            "NVC" => Ok(FieldType::VarString),
            "RV" => Ok(FieldType::RowVersion),
            "NT" => Ok(FieldType::LargeText),
            "I" => Ok(FieldType::LargeBinary),
            "DT" => Ok(FieldType::DateTime),
            other => Err(BizdbError::Schema(format!("unknown field type code {other:?}"))),
        }
    }

    /// On-disk size of the field's value, excluding the optional null-flag byte.
    pub fn fixed_size(self, length: u32) -> u64 {
        match self {
            FieldType::Binary => length as u64,
            FieldType::Bool => 1,
            FieldType::Numeric => length as u64 / 2 + 1,
            FieldType::FixedString => length as u64 * 2,
            FieldType::VarString => length as u64 * 2 + 2,
            FieldType::RowVersion => 16,
            FieldType::LargeText | FieldType::LargeBinary => 8,
            FieldType::DateTime => 7,
        }
    }
}

/// One parsed field description, with its computed row offset and slot size.
#[derive(Debug, Clone)]
pub struct FieldDescription {
    pub name: String,
    pub field_type: FieldType,
    pub null_exists: bool,
    pub length: u32,
    pub precision: u32,
    pub case_sensitive: bool,
    pub data_offset: u64,
    pub data_length: u64,
}

/// The parsed textual description of one table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub fields: Vec<FieldDescription>,
    pub record_lock: bool,
    pub data_offset: i64,
    pub blob_offset: i64,
    pub index_offset: i64,
    pub row_length: u64,
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Result<&FieldDescription> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| BizdbError::Key(format!("unknown field {name:?}")))
    }
}

/// Find the first top-level (brace-depth-1) `{...}` groups inside `s`,
/// ignoring whatever separates them (`,`, `,\n`, or bare whitespace).
fn extract_brace_groups(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut groups = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let start = i;
            let mut depth = 1i32;
            i += 1;
            while i < bytes.len() && depth > 0 {
                match bytes[i] {
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    _ => {}
                }
                i += 1;
            }
            groups.push(&s[start..i]);
        } else {
            i += 1;
        }
    }
    groups
}

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_start_matches('"').trim_end_matches('"')
}

fn parse_field_tuple(group: &str) -> Result<FieldDescription> {
    let inner = group
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| BizdbError::Schema(format!("malformed field tuple {group:?}")))?;

    let parts: Vec<&str> = inner.split(',').collect();
    if parts.len() != 6 {
        return Err(BizdbError::Schema(format!(
            "field tuple {group:?} has {} comma-separated parts, expected 6",
            parts.len()
        )));
    }

    let name = strip_quotes(parts[0]).to_string();
    let field_type = FieldType::parse(strip_quotes(parts[1]))?;
    let null_exists = strip_quotes(parts[2]) == "1";
    let length: u32 = strip_quotes(parts[3])
        .parse()
        .map_err(|_| BizdbError::Schema(format!("bad length in field tuple {group:?}")))?;
    let precision: u32 = strip_quotes(parts[4])
        .parse()
        .map_err(|_| BizdbError::Schema(format!("bad precision in field tuple {group:?}")))?;
    let case_sensitive = strip_quotes(parts[5]) == "CS";

    Ok(FieldDescription {
        name,
        field_type,
        null_exists,
        length,
        precision,
        case_sensitive,
        data_offset: 0,
        data_length: 0,
    })
}

/// Parse a table's raw textual description into a [`TableSchema`], computing
/// each field's on-row `(data_offset, data_length)` and the table's
/// `row_length` per the construction algorithm in the data model.
pub fn parse_table_schema(raw: &str) -> Result<TableSchema> {
    let raw = raw.trim();
    if !raw.starts_with("{\"") {
        return Err(BizdbError::Schema(
            "table description does not start with a quoted name".into(),
        ));
    }

    let name_start = 2;
    let name_end = raw[name_start..]
        .find('"')
        .ok_or_else(|| BizdbError::Schema("table description name is not terminated".into()))?
        + name_start;
    let name = raw[name_start..name_end].to_string();

    const FIELDS_MARKER: &str = "{\"Fields\",";
    let fields_start = raw
        .find(FIELDS_MARKER)
        .ok_or_else(|| BizdbError::Schema("table description has no Fields section".into()))?
        + FIELDS_MARKER.len();

    const INDEXES_MARKER: &str = "{\"Indexes\"";
    let indexes_pos = raw[fields_start..]
        .find(INDEXES_MARKER)
        .ok_or_else(|| BizdbError::Schema("table description has no Indexes section".into()))?
        + fields_start;

    let mut fields_block = raw[fields_start..indexes_pos].trim();
    fields_block = fields_block
        .strip_suffix("},")
        .map(|s| s.trim_end())
        .unwrap_or(fields_block);

    let mut fields = Vec::new();
    let mut has_row_version = false;
    for group in extract_brace_groups(fields_block) {
        let field = parse_field_tuple(group)?;
        if field.field_type == FieldType::RowVersion {
            has_row_version = true;
        }
        fields.push(field);
    }

    const RECORDLOCK_MARKER: &str = "{\"Recordlock\",\"";
    let recordlock_start = raw[indexes_pos..]
        .find(RECORDLOCK_MARKER)
        .ok_or_else(|| BizdbError::Schema("table description has no Recordlock section".into()))?
        + indexes_pos
        + RECORDLOCK_MARKER.len();
    let record_lock = raw[recordlock_start..].starts_with('1');

    const FILES_MARKER: &str = "{\"Files\",";
    let files_start = raw[recordlock_start..]
        .find(FILES_MARKER)
        .ok_or_else(|| BizdbError::Schema("table description has no Files section".into()))?
        + recordlock_start
        + FILES_MARKER.len();
    let files_end = raw[files_start..]
        .find('}')
        .ok_or_else(|| BizdbError::Schema("Files section is not terminated".into()))?
        + files_start;
    let offsets: Vec<i64> = raw[files_start..files_end]
        .split(',')
        .map(|s| {
            s.trim()
                .parse()
                .map_err(|_| BizdbError::Schema(format!("bad Files offset {s:?}")))
        })
        .collect::<Result<Vec<_>>>()?;
    if offsets.len() != 3 {
        return Err(BizdbError::Schema(format!(
            "Files section has {} offsets, expected 3",
            offsets.len()
        )));
    }

    let mut offset: u64 = if has_row_version { 17 } else { 1 };
    for field in &mut fields {
        let slot = field.field_type.fixed_size(field.length) + if field.null_exists { 1 } else { 0 };
        field.data_length = slot;
        if field.field_type == FieldType::RowVersion {
            field.data_offset = 1;
        } else {
            field.data_offset = offset;
            offset += slot;
        }
    }
    let row_length = offset.max(5);

    Ok(TableSchema {
        name,
        fields,
        record_lock,
        data_offset: offsets[0],
        blob_offset: offsets[1],
        index_offset: offsets[2],
        row_length,
    })
}
