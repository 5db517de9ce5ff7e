//! Merge entry point: validation, wide/long merge, cleanup and analysis

use crate::clean::{drop_duplicates, fill_missing, MergeWarning};
use crate::config::{JoinType, MergeConfig, MergeMode};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::long::{long_merge, long_merge_balanced};
use crate::missing::{missing_summary, MissingSummary};
use crate::table::Table;
use crate::validate::{check_distinct_waves, validate_primary_key};
use crate::wide::wide_merge;
use serde::{Deserialize, Serialize};

/// The merged table and what is known about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    /// Merged rows
    pub table: Table,
    /// Missing values per column, after cleanup
    pub missing_summary: MissingSummary,
    /// Number of rows in `table`
    pub row_count: usize,
    /// Number of columns in `table`
    pub column_count: usize,
    /// Non-fatal conditions hit along the way
    pub warnings: Vec<MergeWarning>,
}

/// Merge normalized datasets according to `config`.
///
/// Fails before touching any data if no datasets are given, the key is
/// missing from any of them, or two share a wave number. Cleanup (dedup,
/// fill) runs only on the merged table.
pub fn merge(datasets: &[Dataset], config: &MergeConfig) -> Result<MergeResult> {
    let span = tracing::info_span!(
        "merge",
        key = %config.primary_key,
        mode = ?config.mode,
        datasets = datasets.len()
    );
    let _guard = span.enter();

    if datasets.is_empty() {
        return Err(Error::EmptyDatasetSet);
    }
    validate_primary_key(datasets, &config.primary_key).into_result(&config.primary_key)?;
    check_distinct_waves(datasets)?;

    let mut table = match config.mode {
        MergeMode::Wide => {
            let join_type = if config.balanced_panel {
                JoinType::Inner
            } else {
                config.join_type
            };
            wide_merge(datasets, &config.primary_key, join_type)?
        }
        MergeMode::Long if config.balanced_panel => {
            long_merge_balanced(datasets, &config.primary_key)?
        }
        MergeMode::Long => long_merge(datasets)?,
    };

    if config.drop_duplicates {
        let before = table.row_count();
        table = drop_duplicates(&table);
        tracing::debug!(dropped = before - table.row_count(), "dropped duplicate rows");
    }

    let mut warnings = Vec::new();
    if let Some(fill) = &config.fill_value {
        let (filled, fill_warnings) = fill_missing(&table, fill);
        table = filled;
        warnings.extend(fill_warnings);
    }

    let missing_summary = missing_summary(&table);
    tracing::info!(
        rows = table.row_count(),
        columns = table.column_count(),
        missing = missing_summary.total_missing(),
        "merge complete"
    );

    Ok(MergeResult {
        row_count: table.row_count(),
        column_count: table.column_count(),
        missing_summary,
        table,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv_str;
    use crate::table::CellValue;

    fn wave(csv: &str, wave: u32) -> Dataset {
        let name = format!("w{}.csv", wave);
        Dataset::new(parse_csv_str(csv, &name).unwrap(), wave, name).unwrap()
    }

    #[test]
    fn test_empty_set_rejected() {
        let err = merge(&[], &MergeConfig::new("PID")).unwrap_err();
        assert!(matches!(err, Error::EmptyDatasetSet));
    }

    #[test]
    fn test_missing_key_rejected_in_both_modes() {
        let sets = vec![wave("PID,x\n1,a\n", 1), wave("ID,x\n1,b\n", 2)];

        for mode in [MergeMode::Wide, MergeMode::Long] {
            let config = MergeConfig::new("PID").with_mode(mode);
            let err = merge(&sets, &config).unwrap_err();
            assert!(
                matches!(err, Error::MissingPrimaryKey { ref waves, .. } if waves == &vec![2])
            );
        }
    }

    #[test]
    fn test_duplicate_wave_rejected() {
        let sets = vec![wave("PID\n1\n", 1), wave("PID\n2\n", 1)];
        let err = merge(&sets, &MergeConfig::new("PID")).unwrap_err();
        assert!(matches!(err, Error::DuplicateWave { wave: 1 }));
    }

    #[test]
    fn test_counts_match_table() {
        let sets = vec![wave("PID,x\n1,a\n2,b\n", 1), wave("PID,x\n2,c\n", 2)];
        let config = MergeConfig::new("PID").with_join_type(JoinType::Outer);
        let result = merge(&sets, &config).unwrap();

        assert_eq!(result.row_count, 2);
        assert_eq!(result.column_count, 3);
        assert_eq!(result.missing_summary.get("x_wave2").unwrap().count, 1);
        assert_eq!(result.missing_summary.get("x_wave2").unwrap().percentage, 50.0);
    }

    #[test]
    fn test_balanced_wide_behaves_as_inner() {
        let sets = vec![wave("PID,x\n1,a\n2,b\n", 1), wave("PID,x\n2,c\n3,d\n", 2)];
        let config = MergeConfig::new("PID")
            .with_join_type(JoinType::Outer)
            .with_balanced_panel(true);
        let result = merge(&sets, &config).unwrap();

        assert_eq!(result.row_count, 1);
    }

    #[test]
    fn test_long_dedup_then_fill() {
        let sets = vec![
            wave("PID,x\n1,\n1,\n", 1),
            wave("PID,y\n1,5\n", 2),
        ];
        let config = MergeConfig::new("PID")
            .with_mode(MergeMode::Long)
            .with_drop_duplicates(true)
            .with_fill_value(Some(CellValue::Integer(0)));
        let result = merge(&sets, &config).unwrap();

        assert_eq!(result.row_count, 2);
        assert_eq!(result.table.get(0, "x"), Some(&CellValue::Integer(0)));
        assert_eq!(result.table.get(0, "y"), Some(&CellValue::Integer(0)));
        assert_eq!(result.missing_summary.total_missing(), 0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_fill_warning_surfaces_in_result() {
        let sets = vec![wave("PID,age\n1,\n2,30\n", 1)];
        let config = MergeConfig::new("PID")
            .with_fill_value(Some(CellValue::String("n/a".to_string())));
        let result = merge(&sets, &config).unwrap();

        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.missing_summary.get("age_wave1").unwrap().count, 1);
    }

    #[test]
    fn test_inputs_not_mutated() {
        let sets = vec![wave("PID,x\n1,\n", 1)];
        let snapshot = sets.clone();
        let config = MergeConfig::new("PID").with_fill_value(Some(CellValue::Integer(1)));
        merge(&sets, &config).unwrap();

        assert_eq!(sets, snapshot);
    }
}
