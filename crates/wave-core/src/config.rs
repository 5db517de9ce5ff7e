//! Merge configuration and JSON merge plans

use crate::error::{Error, Result};
use crate::export::ExportFormat;
use crate::normalize::RowFilter;
use crate::table::CellValue;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How waves are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// One row per case, wave-suffixed columns
    #[default]
    Wide,
    /// One row per case and wave, with a `Wave` column
    Long,
}

/// Row-inclusion policy for wide merges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    /// Keys present on both sides
    #[default]
    Inner,
    /// All keys from the accumulated side
    Left,
    /// All keys from the incoming wave
    Right,
    /// Union of keys
    Outer,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Outer => "outer",
        };
        f.write_str(name)
    }
}

/// Settings for one merge invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Case identifier column
    pub primary_key: String,
    /// Wide or long layout
    #[serde(default)]
    pub mode: MergeMode,
    /// Join policy (wide merges only)
    #[serde(default)]
    pub join_type: JoinType,
    /// Value used to replace missing cells after merging
    #[serde(default)]
    pub fill_value: Option<CellValue>,
    /// Drop fully identical rows after merging
    #[serde(default)]
    pub drop_duplicates: bool,
    /// Keep only cases observed in every wave
    #[serde(default)]
    pub balanced_panel: bool,
}

impl MergeConfig {
    /// Wide inner merge on `primary_key` with no cleaning
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            mode: MergeMode::default(),
            join_type: JoinType::default(),
            fill_value: None,
            drop_duplicates: false,
            balanced_panel: false,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    /// An `Empty` fill value is the same as no fill value
    #[must_use]
    pub fn with_fill_value(mut self, fill_value: Option<CellValue>) -> Self {
        self.fill_value = fill_value.filter(|v| !v.is_empty());
        self
    }

    #[must_use]
    pub fn with_drop_duplicates(mut self, enable: bool) -> Self {
        self.drop_duplicates = enable;
        self
    }

    #[must_use]
    pub fn with_balanced_panel(mut self, enable: bool) -> Self {
        self.balanced_panel = enable;
        self
    }
}

/// One input file of a merge plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInput {
    /// Path to the data file
    pub path: PathBuf,
    /// Explicit wave number; detected from the file name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<u32>,
    /// Row filters for this file only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<RowFilter>,
}

/// A complete, repeatable merge run stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePlan {
    /// Input files
    pub inputs: Vec<PlanInput>,
    /// Merge settings
    pub config: MergeConfig,
    /// Where to write the merged table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Output format
    #[serde(default)]
    pub format: ExportFormat,
}

impl MergePlan {
    /// Load a plan file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the plan file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
