//! Long merge: stack waves vertically over the union of their columns

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::table::{CellKey, CellValue, Row, Table};
use std::collections::{HashMap, HashSet};

/// Name of the column holding each row's wave number
pub const WAVE_COLUMN: &str = "Wave";

/// Stack every row of every dataset, in ascending wave order.
///
/// Columns are the union of all dataset columns in first-seen order, followed
/// by `Wave`. Cells for columns a wave lacks are `Empty`.
pub fn long_merge(datasets: &[Dataset]) -> Result<Table> {
    stack(datasets, |_, _| true)
}

/// Like [`long_merge`], but keep only cases whose `key` value appears in
/// every wave.
pub fn long_merge_balanced(datasets: &[Dataset], key: &str) -> Result<Table> {
    let common = common_keys(datasets, key)?;
    tracing::debug!(cases = common.len(), "cases present in every wave");

    let key_columns: HashMap<u32, usize> = datasets
        .iter()
        .filter_map(|ds| ds.table.column_index(key).map(|idx| (ds.wave, idx)))
        .collect();

    stack(datasets, |ds, row| {
        key_columns
            .get(&ds.wave)
            .and_then(|&idx| row.get(idx))
            .is_some_and(|cell| common.contains(&cell.key()))
    })
}

fn stack<F>(datasets: &[Dataset], keep: F) -> Result<Table>
where
    F: Fn(&Dataset, &Row) -> bool,
{
    let mut ordered: Vec<&Dataset> = datasets.iter().collect();
    ordered.sort_by_key(|ds| ds.wave);

    let mut names: Vec<String> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for &ds in &ordered {
        if ds.has_column(WAVE_COLUMN) {
            return Err(Error::ColumnConflict {
                wave: ds.wave,
                column: WAVE_COLUMN.to_string(),
            });
        }
        for col in &ds.table.columns {
            if !positions.contains_key(col.name.as_str()) {
                positions.insert(col.name.as_str(), names.len());
                names.push(col.name.clone());
            }
        }
    }

    let width = names.len();
    let mut table = Table::new(names.iter().map(String::as_str).chain([WAVE_COLUMN]));

    for ds in ordered {
        // Where each of this wave's columns lands in the union
        let mapping: Vec<usize> = ds
            .table
            .columns
            .iter()
            .map(|c| positions[c.name.as_str()])
            .collect();

        let before = table.row_count();
        for row in ds.table.rows.iter().filter(|row| keep(ds, *row)) {
            let mut cells = vec![CellValue::Empty; width + 1];
            for (src, &dst) in mapping.iter().enumerate() {
                if let Some(cell) = row.get(src) {
                    cells[dst] = cell.clone();
                }
            }
            cells[width] = CellValue::Integer(i64::from(ds.wave));
            table.push_row(cells);
        }
        tracing::debug!(
            wave = ds.wave,
            rows = table.row_count() - before,
            "stacked wave"
        );
    }

    Ok(table)
}

/// Key values present in every dataset
fn common_keys<'a>(datasets: &'a [Dataset], key: &str) -> Result<HashSet<CellKey<'a>>> {
    let mut common: Option<HashSet<CellKey<'a>>> = None;
    for ds in datasets {
        let idx = ds
            .table
            .column_index(key)
            .ok_or_else(|| Error::MissingPrimaryKey {
                key: key.to_string(),
                waves: vec![ds.wave],
            })?;
        let keys: HashSet<CellKey<'a>> = ds
            .table
            .rows
            .iter()
            .map(|row| row.get(idx).map_or(CellKey::Empty, CellValue::key))
            .collect();
        common = Some(match common {
            Some(acc) => acc.intersection(&keys).copied().collect(),
            None => keys,
        });
    }
    Ok(common.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    fn wave(csv: &str, wave: u32) -> Dataset {
        let name = format!("w{}.csv", wave);
        Dataset::new(parse_csv_str(csv, &name).unwrap(), wave, name).unwrap()
    }

    #[test]
    fn test_row_count_is_sum_and_wave_tagged() {
        let sets = vec![
            wave("PID,age\n1,30\n2,40\n", 1),
            wave("PID,age\n2,41\n3,50\n4,60\n", 2),
        ];
        let table = long_merge(&sets).unwrap();

        assert_eq!(table.row_count(), 5);
        let waves: Vec<CellValue> = table
            .column_values(table.column_index(WAVE_COLUMN).unwrap())
            .cloned()
            .collect();
        let expected: Vec<CellValue> = [1, 1, 2, 2, 2].into_iter().map(CellValue::Integer).collect();
        assert_eq!(waves, expected);
    }

    #[test]
    fn test_column_union_fills_missing() {
        let sets = vec![
            wave("PID,age\n1,30\n", 1),
            wave("PID,income\n1,1000\n", 2),
        ];
        let table = long_merge(&sets).unwrap();

        assert_eq!(table.column_names(), vec!["PID", "age", "income", "Wave"]);
        assert_eq!(table.column_count(), 3 + 1);
        assert_eq!(table.get(0, "income"), Some(&CellValue::Empty));
        assert_eq!(table.get(1, "age"), Some(&CellValue::Empty));
        assert_eq!(table.get(1, "income"), Some(&CellValue::Integer(1000)));
    }

    #[test]
    fn test_waves_stacked_in_ascending_order() {
        let sets = vec![wave("PID\n9\n8\n", 3), wave("PID\n1\n", 1)];
        let table = long_merge(&sets).unwrap();

        let pids: Vec<String> = table
            .column_values(0)
            .map(CellValue::to_string_value)
            .collect();
        assert_eq!(pids, vec!["1", "9", "8"]);
    }

    #[test]
    fn test_existing_wave_column_conflicts() {
        let sets = vec![wave("PID,Wave\n1,1\n", 1)];
        let err = long_merge(&sets).unwrap_err();
        assert!(matches!(err, Error::ColumnConflict { wave: 1, .. }));
    }

    #[test]
    fn test_balanced_keeps_cases_in_every_wave() {
        let sets = vec![
            wave("PID,x\n1,a\n2,b\n3,c\n", 1),
            wave("PID,x\n2,d\n3,e\n", 2),
            wave("PID,x\n3,f\n2,g\n5,h\n", 3),
        ];
        let table = long_merge_balanced(&sets, "PID").unwrap();

        let pids: Vec<String> = table
            .column_values(0)
            .map(CellValue::to_string_value)
            .collect();
        assert_eq!(pids, vec!["2", "3", "2", "3", "3", "2"]);
    }
}
