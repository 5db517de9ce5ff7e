//! Post-merge cleanup: duplicate rows and missing-value fill

use crate::table::{CellKind, CellValue, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A non-fatal condition reported alongside a merge result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeWarning {
    /// The fill value's type does not fit the column, so the column was left as-is
    IncompatibleFillValue {
        column: String,
        column_kind: CellKind,
        fill_kind: CellKind,
    },
}

impl std::fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeWarning::IncompatibleFillValue {
                column,
                column_kind,
                fill_kind,
            } => write!(
                f,
                "fill value of kind {:?} not applied to {:?} column '{}'",
                fill_kind, column_kind, column
            ),
        }
    }
}

/// Remove rows identical to an earlier row in every column.
///
/// The first occurrence is kept and row order is otherwise unchanged.
pub fn drop_duplicates(table: &Table) -> Table {
    let mut seen = HashSet::with_capacity(table.row_count());
    let rows = table
        .rows
        .iter()
        .filter(|row| seen.insert(row.key()))
        .cloned()
        .collect();

    Table {
        columns: table.columns.clone(),
        rows,
    }
}

/// Replace `Empty` cells with `value` in every column that can hold it.
///
/// Columns whose values all share a kind the fill value does not match are
/// skipped and reported.
pub fn fill_missing(table: &Table, value: &CellValue) -> (Table, Vec<MergeWarning>) {
    let mut out = table.clone();
    let mut warnings = Vec::new();
    if value.is_empty() {
        return (out, warnings);
    }

    let fill_kind = value.kind();
    for column in &table.columns {
        let column_kind = column_kind(table, column.index);
        if !accepts(column_kind, fill_kind) {
            tracing::warn!(
                column = %column.name,
                ?column_kind,
                ?fill_kind,
                "fill value does not fit column, leaving missing values"
            );
            warnings.push(MergeWarning::IncompatibleFillValue {
                column: column.name.clone(),
                column_kind,
                fill_kind,
            });
            continue;
        }

        for row in &mut out.rows {
            if let Some(cell) = row.cells.get_mut(column.index) {
                if cell.is_empty() {
                    *cell = value.clone();
                }
            }
        }
    }

    (out, warnings)
}

/// The single kind shared by a column's non-missing values.
///
/// Integer and float mix to `Float`; any other mix, or no values at all,
/// yields `Empty`.
fn column_kind(table: &Table, index: usize) -> CellKind {
    let mut kind: Option<CellKind> = None;
    for cell in table.column_values(index).filter(|c| !c.is_empty()) {
        let k = cell.kind();
        kind = match kind {
            None => Some(k),
            Some(prev) if prev == k => Some(prev),
            Some(prev) if prev.is_numeric() && k.is_numeric() => Some(CellKind::Float),
            Some(_) => return CellKind::Empty,
        };
    }
    kind.unwrap_or(CellKind::Empty)
}

fn accepts(column: CellKind, fill: CellKind) -> bool {
    match column {
        CellKind::Empty | CellKind::String => true,
        CellKind::Integer | CellKind::Float => fill.is_numeric(),
        CellKind::Date => fill == CellKind::Date,
    }
}
