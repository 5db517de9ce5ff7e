//! wave-core: Core library for merging longitudinal study waves
//!
//! This library provides functionality to:
//! - Normalize wave tables (column names, per-dataset row filters)
//! - Validate a primary key across every selected wave
//! - Merge waves wide (one row per case) or long (one row per case and wave)
//! - Drop duplicate rows and fill missing values
//! - Summarize missing values per column
//!
//! Reading and writing delimited files, wave-file discovery and a per-user
//! `Session` are provided as thin layers around the engine.

pub mod clean;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod long;
pub mod merger;
pub mod missing;
pub mod normalize;
pub mod parser;
pub mod scanner;
pub mod session;
pub mod table;
pub mod validate;
pub mod wide;

pub use clean::{drop_duplicates, fill_missing, MergeWarning};
pub use config::{JoinType, MergeConfig, MergeMode, MergePlan, PlanInput};
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use export::{export_table, to_csv_string, write_csv, write_json, ExportFormat};
pub use long::{long_merge, long_merge_balanced, WAVE_COLUMN};
pub use merger::{merge, MergeResult};
pub use missing::{analyze_missing, missing_summary, ColumnMissing, MissingReport, MissingSummary};
pub use normalize::{normalize, RowFilter};
pub use parser::{load_dataset, parse_csv, parse_csv_str};
pub use scanner::{
    assign_waves, detect_waves, scan_directory, wave_from_path, ScanResult, Study,
    WaveFile,
};
pub use session::{MergeRecord, Session};
pub use table::{CellKind, CellValue, Column, Row, Table};
pub use validate::{validate_primary_key, KeyValidation};
pub use wide::{join, suffix_columns, wave_column_name, wide_merge};
