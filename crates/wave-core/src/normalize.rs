//! Column-name cleanup and per-dataset row filtering

use crate::dataset::Dataset;
use crate::table::{Column, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keep only rows whose `column` holds `equals`.
///
/// Comparison is on the cell's text form, so `"1"` matches an integer 1 and
/// `"True"` matches the string `True`. A filter on a column the dataset does
/// not have is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    /// Column to test
    pub column: String,
    /// Required value
    pub equals: String,
}

impl RowFilter {
    /// Create a new filter
    pub fn new(column: impl Into<String>, equals: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            equals: equals.into(),
        }
    }

    /// Parse `COLUMN=VALUE`
    pub fn parse(text: &str) -> Option<Self> {
        let (column, value) = text.split_once('=')?;
        let column = column.trim();
        if column.is_empty() {
            return None;
        }
        Some(Self::new(column, value.trim()))
    }
}

/// Produce a cleaned copy of `raw`: trimmed, unique column names and only the
/// rows that pass every applicable filter.
pub fn normalize(raw: &Dataset, filters: &[RowFilter]) -> Dataset {
    let columns = normalize_columns(&raw.table.columns);
    let mut table = Table {
        columns,
        rows: raw.table.rows.clone(),
    };

    for filter in filters {
        let Some(index) = table.column_index(&filter.column) else {
            tracing::debug!(
                wave = raw.wave,
                column = %filter.column,
                "filter column not present, skipping"
            );
            continue;
        };

        let before = table.rows.len();
        table.rows.retain(|row| {
            row.get(index)
                .is_some_and(|cell| cell.to_string_value() == filter.equals)
        });
        tracing::debug!(
            wave = raw.wave,
            column = %filter.column,
            dropped = before - table.rows.len(),
            "applied row filter"
        );
    }

    Dataset {
        table,
        wave: raw.wave,
        source_name: raw.source_name.clone(),
    }
}

/// Trim every column name; names that collide after trimming get `.1`, `.2`...
fn normalize_columns(columns: &[Column]) -> Vec<Column> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(columns.len());

    for (index, column) in columns.iter().enumerate() {
        let base = column.name.trim().to_string();
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        if name != base {
            tracing::warn!(column = %base, renamed = %name, "duplicate column name");
        }
        seen.insert(name.clone());
        out.push(Column::new(name, index));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    fn dataset(csv: &str, wave: u32) -> Dataset {
        let table = parse_csv_str(csv, "test.csv").unwrap();
        Dataset::new(table, wave, "test.csv").unwrap()
    }

    #[test]
    fn test_trims_column_names() {
        let raw = dataset(" PID ,  age\n1,30\n", 1);
        let ds = normalize(&raw, &[]);

        assert_eq!(ds.table.column_names(), vec!["PID", "age"]);
        // Input is untouched
        assert_eq!(raw.table.columns[0].name, " PID ");
    }

    #[test]
    fn test_duplicate_names_after_trim_are_disambiguated() {
        let raw = dataset("PID,score, score\n1,2,3\n", 1);
        let ds = normalize(&raw, &[]);

        assert_eq!(ds.table.column_names(), vec!["PID", "score", "score.1"]);
    }

    #[test]
    fn test_filters_rows() {
        let raw = dataset(
            "PID,Status,Finished\n1,IP Address,1\n2,Survey Preview,1\n3,IP Address,0\n",
            1,
        );
        let filters = vec![
            RowFilter::new("Status", "IP Address"),
            RowFilter::new("Finished", "1"),
        ];
        let ds = normalize(&raw, &filters);

        assert_eq!(ds.row_count(), 1);
        assert_eq!(ds.table.get(0, "PID").unwrap().to_string_value(), "1");
    }

    #[test]
    fn test_missing_filter_column_is_noop() {
        let raw = dataset("PID,age\n1,30\n2,40\n", 2);
        let ds = normalize(&raw, &[RowFilter::new("Finished", "True")]);

        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.wave, 2);
    }

    #[test]
    fn test_filter_applies_to_trimmed_name() {
        let raw = dataset("PID, Finished \n1,True\n2,False\n", 1);
        let ds = normalize(&raw, &[RowFilter::new("Finished", "True")]);

        assert_eq!(ds.row_count(), 1);
    }

    #[test]
    fn test_parse_filter_text() {
        assert_eq!(
            RowFilter::parse("Status = complete"),
            Some(RowFilter::new("Status", "complete"))
        );
        assert_eq!(RowFilter::parse("novalue"), None);
        assert_eq!(RowFilter::parse("=x"), None);
    }
}
