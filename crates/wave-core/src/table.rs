//! Core table types for representing wave data

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An in-memory table: ordered columns and ordered rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given column names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column::new(name.into(), i))
            .collect();
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and row cells
    pub fn from_rows<I, S>(names: I, rows: Vec<Vec<CellValue>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(names);
        for cells in rows {
            table.push_row(cells);
        }
        table
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.find_column(name).map(|c| c.index)
    }

    /// Column names in table order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Append a row, padding or truncating it to the column count
    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        cells.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(Row::new(cells));
    }

    /// Get a cell by row position and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Iterate over the values of one column
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows
            .iter()
            .map(move |r| r.get(index).unwrap_or(&CellValue::Empty))
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, index: usize) -> Self {
        Self { name, index }
    }
}

/// A row of data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    pub(crate) fn key(&self) -> Vec<CellKey<'_>> {
        self.cells.iter().map(CellValue::key).collect()
    }
}

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Calendar date
    Date(NaiveDate),
    /// String value
    String(String),
    /// Missing value
    Empty,
}

/// The kind of a cell, ignoring its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Integer,
    Float,
    Date,
    String,
    Empty,
}

impl CellKind {
    /// True for both integer and floating-point kinds
    pub fn is_numeric(self) -> bool {
        matches!(self, CellKind::Integer | CellKind::Float)
    }
}

/// Hashable view of a cell used for key matching and row identity.
///
/// Equality is exact and type-sensitive: `Integer(1)` never equals `Float(1.0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CellKey<'a> {
    Integer(i64),
    Float(u64),
    Date(NaiveDate),
    String(&'a str),
    Empty,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        // Try parsing as integer first
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            // "NaN" and "inf" are more likely labels than measurements
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }

        if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return CellValue::Date(d);
        }

        CellValue::String(trimmed.to_string())
    }

    /// Check if the cell is missing
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The kind of this cell
    pub fn kind(&self) -> CellKind {
        match self {
            CellValue::Integer(_) => CellKind::Integer,
            CellValue::Float(_) => CellKind::Float,
            CellValue::Date(_) => CellKind::Date,
            CellValue::String(_) => CellKind::String,
            CellValue::Empty => CellKind::Empty,
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }

    pub(crate) fn key(&self) -> CellKey<'_> {
        match self {
            CellValue::Integer(i) => CellKey::Integer(*i),
            CellValue::Float(f) => CellKey::Float(f.to_bits()),
            CellValue::Date(d) => CellKey::Date(*d),
            CellValue::String(s) => CellKey::String(s),
            CellValue::Empty => CellKey::Empty,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}
