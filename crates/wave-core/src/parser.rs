//! Delimited-text reader for wave files
//!
//! Headers are kept verbatim; trimming and de-duplicating column names is
//! the normalizer's job.

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::table::{CellValue, Table};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Parse a CSV (or, by extension, TSV) file into a Table
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    read_table(BufReader::new(file), path, delimiter_for(path))
}

/// Parse CSV from a string (useful for testing)
pub fn parse_csv_str(content: &str, source_name: &str) -> Result<Table> {
    read_table(content.as_bytes(), Path::new(source_name), b',')
}

/// Read a file into a raw dataset tagged with `wave`
pub fn load_dataset<P: AsRef<Path>>(path: P, wave: u32) -> Result<Dataset> {
    let path = path.as_ref();
    let table = parse_csv(path)?;
    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    tracing::debug!(
        wave,
        source = %source_name,
        rows = table.row_count(),
        columns = table.column_count(),
        "loaded dataset"
    );
    Dataset::new(table, wave, source_name)
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

fn read_table<R: Read>(reader: R, path: &Path, delimiter: u8) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true) // Allow varying number of fields
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| csv_error(path, e))?;
    let names: Vec<String> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if names.is_empty() || names.iter().all(|n| n.trim().is_empty()) {
        return Err(Error::CsvParse {
            path: path.to_path_buf(),
            message: "no columns found in CSV".to_string(),
        });
    }

    let mut table = Table::new(names);
    let width = table.column_count();

    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| csv_error(path, e))?;

        if record.len() > width {
            tracing::warn!(
                row = row_idx + 1,
                path = %path.display(),
                "row has more cells than columns, truncating"
            );
        }

        // Short rows are padded with empty cells by push_row
        let cells: Vec<CellValue> = record.iter().take(width).map(CellValue::parse).collect();
        table.push_row(cells);
    }

    Ok(table)
}

fn csv_error(path: &Path, source: csv::Error) -> Error {
    Error::Csv {
        path: PathBuf::from(path),
        source,
    }
}
