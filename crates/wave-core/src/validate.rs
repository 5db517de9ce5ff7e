//! Primary key checks run before any merge step

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Outcome of checking a key column across datasets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValidation {
    /// True if every dataset has the key column
    pub ok: bool,
    /// Waves lacking the key column, ascending
    pub missing_waves: Vec<u32>,
}

impl KeyValidation {
    /// Turn a failed validation into `Error::MissingPrimaryKey`
    pub fn into_result(self, key: &str) -> Result<()> {
        if self.ok {
            Ok(())
        } else {
            Err(Error::MissingPrimaryKey {
                key: key.to_string(),
                waves: self.missing_waves,
            })
        }
    }
}

/// Check that `key` names a column in every dataset.
///
/// Names are compared exactly (case-sensitive), so datasets should be
/// normalized first.
pub fn validate_primary_key<'a, I>(datasets: I, key: &str) -> KeyValidation
where
    I: IntoIterator<Item = &'a Dataset>,
{
    let mut missing_waves: Vec<u32> = datasets
        .into_iter()
        .filter(|ds| !ds.has_column(key))
        .map(|ds| ds.wave)
        .collect();
    missing_waves.sort_unstable();
    missing_waves.dedup();

    KeyValidation {
        ok: missing_waves.is_empty(),
        missing_waves,
    }
}

/// Reject a dataset set where two datasets claim the same wave
pub(crate) fn check_distinct_waves(datasets: &[Dataset]) -> Result<()> {
    let mut waves: Vec<u32> = datasets.iter().map(|ds| ds.wave).collect();
    waves.sort_unstable();
    match waves.windows(2).find(|w| w[0] == w[1]) {
        Some(w) => Err(Error::DuplicateWave { wave: w[0] }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    fn ds(columns: &[&str], wave: u32) -> Dataset {
        Dataset::new(Table::new(columns.iter().copied()), wave, format!("w{wave}.csv")).unwrap()
    }

    #[test]
    fn test_key_present_everywhere() {
        let sets = vec![ds(&["PID", "age"], 1), ds(&["PID", "score"], 2)];
        let result = validate_primary_key(&sets, "PID");

        assert!(result.ok);
        assert!(result.missing_waves.is_empty());
        assert!(result.into_result("PID").is_ok());
    }

    #[test]
    fn test_key_missing_in_wave_two() {
        let sets = vec![
            ds(&["PID", "age"], 1),
            ds(&["ID", "age"], 2),
            ds(&["PID"], 3),
        ];
        let result = validate_primary_key(&sets, "PID");

        assert!(!result.ok);
        assert_eq!(result.missing_waves, vec![2]);

        let err = result.into_result("PID").unwrap_err();
        assert!(matches!(err, Error::MissingPrimaryKey { ref waves, .. } if waves == &vec![2]));
    }

    #[test]
    fn test_key_match_is_case_sensitive() {
        let sets = vec![ds(&["pid"], 1)];
        assert_eq!(validate_primary_key(&sets, "PID").missing_waves, vec![1]);
    }

    #[test]
    fn test_duplicate_waves_rejected() {
        let sets = vec![ds(&["PID"], 2), ds(&["PID"], 1), ds(&["PID"], 2)];
        let err = check_distinct_waves(&sets).unwrap_err();
        assert!(matches!(err, Error::DuplicateWave { wave: 2 }));
    }
}
