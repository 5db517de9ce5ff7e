//! Wide merge: one row per case, one suffixed column per wave measurement
//!
//! Waves are folded left to right in ascending wave order. Before folding,
//! every non-key column of a wave is renamed to `<name>_wave<W>` (wave 1
//! included) and the key column is moved to the front.

use crate::config::JoinType;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::table::{CellKey, CellValue, Row, Table};
use std::collections::HashMap;

/// Column name a wave's measurement receives in a wide table
pub fn wave_column_name(name: &str, wave: u32) -> String {
    format!("{}_wave{}", name, wave)
}

/// Merge datasets side by side on `key`.
///
/// The caller is expected to have validated that `key` exists everywhere;
/// a missing key still fails here rather than producing a partial table.
pub fn wide_merge(datasets: &[Dataset], key: &str, join_type: JoinType) -> Result<Table> {
    let mut ordered: Vec<&Dataset> = datasets.iter().collect();
    ordered.sort_by_key(|ds| ds.wave);

    let mut waves = ordered.into_iter();
    let first = waves.next().ok_or(Error::EmptyDatasetSet)?;

    let mut acc = suffix_columns(first, key)?;
    // A single wave never reaches `join`, so check its keys here
    index_keys(&acc, 0)?;

    for next in waves {
        let incoming = suffix_columns(next, key)?;
        let before = acc.row_count();
        acc = join(&acc, &incoming, key, join_type)?;
        tracing::debug!(
            wave = next.wave,
            join = %join_type,
            rows_before = before,
            rows_incoming = incoming.row_count(),
            rows_after = acc.row_count(),
            "folded wave"
        );
    }

    Ok(acc.table)
}

/// Rename every non-key column to `<name>_wave<W>` and move the key first
pub fn suffix_columns(dataset: &Dataset, key: &str) -> Result<Dataset> {
    let key_idx = key_column(dataset, key)?;
    let others: Vec<usize> = (0..dataset.table.column_count())
        .filter(|&i| i != key_idx)
        .collect();

    let mut names = Vec::with_capacity(others.len() + 1);
    names.push(key.to_string());
    for &i in &others {
        let name = wave_column_name(&dataset.table.columns[i].name, dataset.wave);
        if name == key {
            return Err(Error::ColumnConflict {
                wave: dataset.wave,
                column: name,
            });
        }
        names.push(name);
    }

    let mut table = Table::new(names);
    for row in &dataset.table.rows {
        let mut cells = Vec::with_capacity(others.len() + 1);
        cells.push(cell_at(row, key_idx));
        cells.extend(others.iter().map(|&i| cell_at(row, i)));
        table.push_row(cells);
    }

    Ok(Dataset {
        table,
        wave: dataset.wave,
        source_name: dataset.source_name.clone(),
    })
}

/// Join two datasets on `key`.
///
/// Output columns are the left columns followed by the right's non-key
/// columns. Row order follows the left side, except for `Right` joins which
/// follow the right side; `Outer` appends unmatched right rows at the end.
/// Both sides must have unique key values. The result carries the right
/// side's wave.
pub fn join(left: &Dataset, right: &Dataset, key: &str, join_type: JoinType) -> Result<Dataset> {
    let left_key = key_column(left, key)?;
    let right_key = key_column(right, key)?;
    let left_index = index_keys(left, left_key)?;
    let right_index = index_keys(right, right_key)?;

    let right_cols: Vec<usize> = (0..right.table.column_count())
        .filter(|&i| i != right_key)
        .collect();

    let mut names: Vec<String> = left.table.columns.iter().map(|c| c.name.clone()).collect();
    for &i in &right_cols {
        let name = &right.table.columns[i].name;
        if left.has_column(name) {
            return Err(Error::ColumnConflict {
                wave: right.wave,
                column: name.clone(),
            });
        }
        names.push(name.clone());
    }

    let layout = Layout {
        left_width: left.table.column_count(),
        left_key,
        right_key,
        right_cols: &right_cols,
    };
    let mut table = Table::new(names);

    match join_type {
        JoinType::Right => {
            for r in &right.table.rows {
                let l = left_index
                    .get(&key_of(r, right_key))
                    .map(|&i| &left.table.rows[i]);
                table.push_row(layout.combine(l, Some(r)));
            }
        }
        JoinType::Inner | JoinType::Left | JoinType::Outer => {
            for l in &left.table.rows {
                match right_index.get(&key_of(l, left_key)) {
                    Some(&i) => table.push_row(layout.combine(Some(l), Some(&right.table.rows[i]))),
                    None if join_type != JoinType::Inner => {
                        table.push_row(layout.combine(Some(l), None))
                    }
                    None => {}
                }
            }
            if join_type == JoinType::Outer {
                for r in &right.table.rows {
                    if !left_index.contains_key(&key_of(r, right_key)) {
                        table.push_row(layout.combine(None, Some(r)));
                    }
                }
            }
        }
    }

    Ok(Dataset {
        table,
        wave: right.wave,
        source_name: format!("{} + {}", left.source_name, right.source_name),
    })
}

/// Column positions needed to stitch a left and a right row together
struct Layout<'a> {
    left_width: usize,
    left_key: usize,
    right_key: usize,
    right_cols: &'a [usize],
}

impl Layout<'_> {
    fn combine(&self, left: Option<&Row>, right: Option<&Row>) -> Vec<CellValue> {
        let mut cells = match left {
            Some(row) => (0..self.left_width).map(|i| cell_at(row, i)).collect(),
            None => vec![CellValue::Empty; self.left_width],
        };
        if left.is_none() {
            if let Some(row) = right {
                cells[self.left_key] = cell_at(row, self.right_key);
            }
        }
        match right {
            Some(row) => cells.extend(self.right_cols.iter().map(|&i| cell_at(row, i))),
            None => cells.extend(self.right_cols.iter().map(|_| CellValue::Empty)),
        }
        cells
    }
}

fn key_column(dataset: &Dataset, key: &str) -> Result<usize> {
    dataset
        .table
        .column_index(key)
        .ok_or_else(|| Error::MissingPrimaryKey {
            key: key.to_string(),
            waves: vec![dataset.wave],
        })
}

/// Map each key value to its row, failing on the first repeated value
fn index_keys(dataset: &Dataset, key_idx: usize) -> Result<HashMap<CellKey<'_>, usize>> {
    let mut index = HashMap::with_capacity(dataset.row_count());
    for (pos, row) in dataset.table.rows.iter().enumerate() {
        if index.insert(key_of(row, key_idx), pos).is_some() {
            return Err(Error::DuplicateKeyInWideMerge {
                wave: dataset.wave,
                column: dataset.table.columns[key_idx].name.clone(),
                value: cell_at(row, key_idx).to_string_value(),
            });
        }
    }
    Ok(index)
}

fn key_of(row: &Row, key_idx: usize) -> CellKey<'_> {
    row.get(key_idx).map_or(CellKey::Empty, CellValue::key)
}

fn cell_at(row: &Row, index: usize) -> CellValue {
    row.get(index).cloned().unwrap_or(CellValue::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;

    fn wave(csv: &str, wave: u32) -> Dataset {
        let name = format!("w{}.csv", wave);
        Dataset::new(parse_csv_str(csv, &name).unwrap(), wave, name).unwrap()
    }

    fn keys(table: &Table) -> Vec<String> {
        table
            .column_values(0)
            .map(CellValue::to_string_value)
            .collect()
    }

    #[test]
    fn test_disjoint_keys_row_counts() {
        let a = wave("PID,x\n1,a\n2,b\n3,c\n", 1);
        let b = wave("PID,x\n4,d\n5,e\n", 2);
        let sets = vec![a, b];

        assert_eq!(wide_merge(&sets, "PID", JoinType::Outer).unwrap().row_count(), 5);
        assert_eq!(wide_merge(&sets, "PID", JoinType::Inner).unwrap().row_count(), 0);
        assert_eq!(wide_merge(&sets, "PID", JoinType::Left).unwrap().row_count(), 3);
        assert_eq!(wide_merge(&sets, "PID", JoinType::Right).unwrap().row_count(), 2);
    }

    #[test]
    fn test_every_wave_is_suffixed() {
        let sets = vec![
            wave("PID,score\n1,10\n", 1),
            wave("PID,score\n1,11\n", 2),
            wave("PID,score\n1,12\n", 3),
        ];
        let table = wide_merge(&sets, "PID", JoinType::Inner).unwrap();

        assert_eq!(
            table.column_names(),
            vec!["PID", "score_wave1", "score_wave2", "score_wave3"]
        );
        assert_eq!(table.get(0, "score_wave3"), Some(&CellValue::Integer(12)));
    }

    #[test]
    fn test_outer_merge_scenario() {
        let a = wave("PID,age\n1,30\n2,40\n", 1);
        let b = wave("PID,age\n2,41\n3,50\n", 2);
        let table = wide_merge(&[a, b], "PID", JoinType::Outer).unwrap();

        assert_eq!(keys(&table), vec!["1", "2", "3"]);
        assert_eq!(table.get(0, "age_wave1"), Some(&CellValue::Integer(30)));
        assert_eq!(table.get(0, "age_wave2"), Some(&CellValue::Empty));
        assert_eq!(table.get(1, "age_wave1"), Some(&CellValue::Integer(40)));
        assert_eq!(table.get(1, "age_wave2"), Some(&CellValue::Integer(41)));
        assert_eq!(table.get(2, "age_wave1"), Some(&CellValue::Empty));
        assert_eq!(table.get(2, "age_wave2"), Some(&CellValue::Integer(50)));
    }

    #[test]
    fn test_waves_folded_in_ascending_order() {
        let w2 = wave("PID,y\n1,b\n", 2);
        let w1 = wave("PID,x\n1,a\n", 1);
        let table = wide_merge(&[w2, w1], "PID", JoinType::Inner).unwrap();

        assert_eq!(table.column_names(), vec!["PID", "x_wave1", "y_wave2"]);
    }

    #[test]
    fn test_key_moved_first() {
        let sets = vec![wave("age,PID\n30,1\n", 1)];
        let table = wide_merge(&sets, "PID", JoinType::Inner).unwrap();

        assert_eq!(table.column_names(), vec!["PID", "age_wave1"]);
        assert_eq!(table.get(0, "PID"), Some(&CellValue::Integer(1)));
    }

    #[test]
    fn test_right_join_follows_incoming_order() {
        let a = wave("PID,x\n1,a\n2,b\n", 1);
        let b = wave("PID,x\n3,c\n2,d\n", 2);
        let table = wide_merge(&[a, b], "PID", JoinType::Right).unwrap();

        assert_eq!(keys(&table), vec!["3", "2"]);
        assert_eq!(table.get(1, "x_wave1").unwrap().to_string_value(), "b");
    }

    #[test]
    fn test_three_wave_left_fold_keeps_first_wave_keys() {
        let sets = vec![
            wave("PID,x\n1,a\n2,b\n", 1),
            wave("PID,x\n2,c\n", 2),
            wave("PID,x\n1,d\n9,e\n", 3),
        ];
        let table = wide_merge(&sets, "PID", JoinType::Left).unwrap();

        assert_eq!(keys(&table), vec!["1", "2"]);
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.get(0, "x_wave2"), Some(&CellValue::Empty));
        assert_eq!(table.get(0, "x_wave3").unwrap().to_string_value(), "d");
    }

    #[test]
    fn test_column_count_sums_non_key_columns() {
        let sets = vec![
            wave("PID,a,b\n1,1,2\n", 1),
            wave("PID,c\n1,3\n", 2),
            wave("PID\n1\n", 3),
        ];
        let table = wide_merge(&sets, "PID", JoinType::Outer).unwrap();

        assert_eq!(table.column_count(), 1 + 2 + 1);
    }

    #[test]
    fn test_duplicate_key_reported_with_wave() {
        let a = wave("PID,x\n1,a\n", 1);
        let b = wave("PID,x\n2,b\n2,c\n", 2);
        let err = wide_merge(&[a, b], "PID", JoinType::Outer).unwrap_err();

        match err {
            Error::DuplicateKeyInWideMerge {
                wave,
                column,
                value,
            } => {
                assert_eq!(wave, 2);
                assert_eq!(column, "PID");
                assert_eq!(value, "2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_key_in_single_wave() {
        let a = wave("PID,x\n1,a\n1,b\n", 1);
        let err = wide_merge(&[a], "PID", JoinType::Inner).unwrap_err();
        assert!(matches!(err, Error::DuplicateKeyInWideMerge { wave: 1, .. }));
    }

    #[test]
    fn test_blank_keys_reported_as_missing() {
        let a = wave("PID,x\n1,a\n,b\n,c\n", 1);
        let b = wave("PID,x\n1,d\n", 2);
        let err = wide_merge(&[a, b], "PID", JoinType::Outer).unwrap_err();

        assert!(matches!(
            err,
            Error::DuplicateKeyInWideMerge { wave: 1, ref value, .. } if value.is_empty()
        ));
        assert!(err.to_string().contains("missing key value"));
    }

    #[test]
    fn test_key_match_is_exact() {
        let a = wave("PID,x\n1,a\n", 1);
        let b = wave("PID,x\n1.0,b\n", 2);
        let table = wide_merge(&[a, b], "PID", JoinType::Inner).unwrap();

        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_suffix_clash_with_key() {
        let a = wave("x_wave1,x\n1,a\n", 1);
        let err = wide_merge(&[a], "x_wave1", JoinType::Inner).unwrap_err();
        assert!(matches!(err, Error::ColumnConflict { wave: 1, .. }));
    }

    #[test]
    fn test_join_rejects_overlapping_columns() {
        let a = wave("PID,x\n1,a\n", 1);
        let b = wave("PID,x\n1,b\n", 2);
        let err = join(&a, &b, "PID", JoinType::Inner).unwrap_err();
        assert!(matches!(err, Error::ColumnConflict { wave: 2, ref column } if column == "x"));
    }
}
