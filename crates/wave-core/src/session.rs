//! Per-user working state: loaded waves, the last result and a run log
//!
//! A `Session` is an ordinary value owned by whoever serves the user. Two
//! sessions never share data, so hosts serving many users keep one each.

use crate::config::MergeConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::merger::{merge, MergeResult};
use crate::normalize::{normalize, RowFilter};
use crate::parser::load_dataset;
use crate::validate::{validate_primary_key, KeyValidation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A record of a merge that was run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    /// When the merge finished
    pub timestamp: DateTime<Utc>,
    /// Settings used
    pub config: MergeConfig,
    /// Waves that went in
    pub waves: Vec<u32>,
    /// Rows produced
    pub row_count: usize,
    /// Columns produced
    pub column_count: usize,
}

/// Datasets and results belonging to one user
#[derive(Debug, Clone, Default)]
pub struct Session {
    datasets: BTreeMap<u32, Dataset>,
    last_result: Option<MergeResult>,
    history: Vec<MergeRecord>,
}

impl Session {
    /// Create a new empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an already normalized dataset, returning the one it replaces
    pub fn add_dataset(&mut self, dataset: Dataset) -> Option<Dataset> {
        let replaced = self.datasets.insert(dataset.wave, dataset);
        if let Some(old) = &replaced {
            tracing::debug!(wave = old.wave, source = %old.source_name, "replaced wave");
        }
        replaced
    }

    /// Read, normalize and add a file as `wave`
    pub fn load_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        wave: u32,
        filters: &[RowFilter],
    ) -> Result<&Dataset> {
        let raw = load_dataset(path, wave)?;
        let dataset = normalize(&raw, filters);
        self.add_dataset(dataset);
        Ok(&self.datasets[&wave])
    }

    /// Remove a wave
    pub fn remove_wave(&mut self, wave: u32) -> Option<Dataset> {
        self.datasets.remove(&wave)
    }

    /// Loaded datasets in wave order
    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> + '_ {
        self.datasets.values()
    }

    /// Loaded wave numbers, ascending
    pub fn waves(&self) -> Vec<u32> {
        self.datasets.keys().copied().collect()
    }

    /// Check `key` against every loaded wave
    pub fn validate_key(&self, key: &str) -> KeyValidation {
        validate_primary_key(self.datasets.values(), key)
    }

    /// Merge every loaded wave and keep the result.
    ///
    /// On failure the previous result stays in place.
    pub fn merge(&mut self, config: &MergeConfig) -> Result<&MergeResult> {
        let datasets: Vec<Dataset> = self.datasets.values().cloned().collect();
        let result = merge(&datasets, config)?;

        self.history.push(MergeRecord {
            timestamp: Utc::now(),
            config: config.clone(),
            waves: self.waves(),
            row_count: result.row_count,
            column_count: result.column_count,
        });
        Ok(self.last_result.insert(result))
    }

    /// The most recent successful merge
    pub fn last_result(&self) -> Option<&MergeResult> {
        self.last_result.as_ref()
    }

    /// Merges run in this session, oldest first
    pub fn history(&self) -> &[MergeRecord] {
        &self.history
    }

    /// Drop all datasets and results
    pub fn clear(&mut self) {
        self.datasets.clear();
        self.last_result = None;
        self.history.clear();
    }
}
