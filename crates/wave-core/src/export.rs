//! Writing merged tables out as delimited text or JSON

use crate::error::{Error, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    /// Array of objects keyed by column name
    Json,
}

impl ExportFormat {
    /// Guess the format from a file extension, defaulting to CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

/// Write `table` to `path` in the given format
pub fn export_table<P: AsRef<Path>>(table: &Table, path: P, format: ExportFormat) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Csv => write_csv(table, &mut writer)?,
        ExportFormat::Json => write_json(table, &mut writer)?,
    }
    writer.flush()?;

    tracing::info!(
        path = %path.display(),
        rows = table.row_count(),
        ?format,
        "exported table"
    );
    Ok(())
}

/// Write a header row and one record per row; missing cells are empty fields
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.columns.iter().map(|c| c.name.as_str()))?;
    for row in &table.rows {
        csv_writer.write_record(row.cells.iter().map(|c| c.to_string_value()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write rows as a JSON array of `{column: value}` objects, missing as null.
///
/// Keys follow table column order.
pub fn write_json<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut records = Vec::with_capacity(table.row_count());
    for row in &table.rows {
        let mut record = serde_json::Map::new();
        for col in &table.columns {
            let value = match row.get(col.index) {
                Some(cell) => serde_json::to_value(cell)?,
                None => serde_json::Value::Null,
            };
            record.insert(col.name.clone(), value);
        }
        records.push(serde_json::Value::Object(record));
    }

    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

/// Render the CSV export in memory, as a download would
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
