//! Per-column missing-value summary and row-by-column missingness matrix

use crate::table::Table;
use serde::{Deserialize, Serialize};

/// Missing values in one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissing {
    /// Column name
    pub column: String,
    /// Number of missing cells
    pub count: usize,
    /// Share of rows missing, 0.0 to 100.0
    pub percentage: f64,
}

/// Missing-value statistics for every column, in table order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissingSummary {
    pub columns: Vec<ColumnMissing>,
}

impl MissingSummary {
    /// Look up a column's entry
    pub fn get(&self, column: &str) -> Option<&ColumnMissing> {
        self.columns.iter().find(|c| c.column == column)
    }

    /// Total missing cells across all columns
    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.count).sum()
    }

    /// Columns with at least one missing cell
    pub fn incomplete_columns(&self) -> impl Iterator<Item = &ColumnMissing> + '_ {
        self.columns.iter().filter(|c| c.count > 0)
    }
}

/// Summary plus the boolean matrix a heatmap can be drawn from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingReport {
    pub summary: MissingSummary,
    /// `matrix[row][column]` is true when the cell is missing
    pub matrix: Vec<Vec<bool>>,
}

/// Analyze missing values in `table`
pub fn analyze_missing(table: &Table) -> MissingReport {
    let matrix: Vec<Vec<bool>> = table
        .rows
        .iter()
        .map(|row| {
            (0..table.column_count())
                .map(|i| row.get(i).map_or(true, |c| c.is_empty()))
                .collect()
        })
        .collect();

    MissingReport {
        summary: summarize(table.column_names(), &matrix, table.row_count()),
        matrix,
    }
}

/// Only the per-column summary of [`analyze_missing`]
pub fn missing_summary(table: &Table) -> MissingSummary {
    analyze_missing(table).summary
}

fn summarize(names: Vec<&str>, matrix: &[Vec<bool>], rows: usize) -> MissingSummary {
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let count = matrix.iter().filter(|row| row[i]).count();
            let percentage = if rows == 0 {
                0.0
            } else {
                count as f64 * 100.0 / rows as f64
            };
            ColumnMissing {
                column: name.to_string(),
                count,
                percentage,
            }
        })
        .collect();
    MissingSummary { columns }
}
