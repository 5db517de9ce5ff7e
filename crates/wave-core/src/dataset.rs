//! A table tagged with the wave it was collected in

use crate::error::{Error, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};

/// One observation wave of a longitudinal study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// The wave's data
    pub table: Table,
    /// Wave number, starting at 1
    pub wave: u32,
    /// Where the data came from (usually a file name)
    pub source_name: String,
}

impl Dataset {
    /// Create a dataset, rejecting wave 0
    pub fn new(table: Table, wave: u32, source_name: impl Into<String>) -> Result<Self> {
        let source_name = source_name.into();
        if wave == 0 {
            return Err(Error::InvalidWave { source_name });
        }
        Ok(Self {
            table,
            wave,
            source_name,
        })
    }

    /// True if the table has a column with exactly this name
    pub fn has_column(&self, name: &str) -> bool {
        self.table.find_column(name).is_some()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_zero_rejected() {
        let err = Dataset::new(Table::new(["PID"]), 0, "w0.csv").unwrap_err();
        assert!(matches!(err, Error::InvalidWave { .. }));
    }

    #[test]
    fn test_has_column_is_case_sensitive() {
        let ds = Dataset::new(Table::new(["PID"]), 1, "w1.csv").unwrap();
        assert!(ds.has_column("PID"));
        assert!(!ds.has_column("pid"));
    }
}
