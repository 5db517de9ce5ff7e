//! Directory scanner for discovering wave files and grouping them by study

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SEPARATORS: &[char] = &['_', '-', ' ', '.'];

/// All wave files sharing a base name, e.g. `panel_w1.csv` and `panel_w2.csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    /// Base name of the study (e.g., "panel")
    pub name: String,
    /// Member files, tagged waves first in wave order, then untagged by path
    pub members: Vec<WaveFile>,
}

impl Study {
    /// Every member with a wave number, untagged files taking the free ones
    pub fn assigned_waves(&self) -> Vec<(PathBuf, u32)> {
        let entries: Vec<(PathBuf, Option<u32>)> = self
            .members
            .iter()
            .map(|m| (m.path.clone(), m.wave))
            .collect();
        assign_waves(&entries)
    }
}

/// A single data file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Wave detected from the file name, if any
    pub wave: Option<u32>,
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered studies, sorted by name
    pub studies: Vec<Study>,
    /// Total number of files found
    pub total_files: usize,
}

impl ScanResult {
    /// Find a study by name
    pub fn find_study(&self, name: &str) -> Option<&Study> {
        self.studies.iter().find(|s| s.name == name)
    }

    /// Get all study names
    pub fn study_names(&self) -> Vec<&str> {
        self.studies.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Scan one or more directories for CSV/TSV files and group them into studies
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut file_map: BTreeMap<String, Vec<WaveFile>> = BTreeMap::new();
    let mut total_files = 0;

    for root in roots {
        let root = root.as_ref();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            let path = entry.path();

            if !entry.file_type().is_file() || !is_data_file(path) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                let (study, wave) = extract_wave_info(stem);
                file_map.entry(study).or_default().push(WaveFile {
                    path: path.to_path_buf(),
                    wave,
                });
                total_files += 1;
            }
        }
    }

    let studies = file_map
        .into_iter()
        .map(|(name, mut members)| {
            members.sort_by(|a, b| match (a.wave, b.wave) {
                (Some(wa), Some(wb)) => wa.cmp(&wb).then_with(|| a.path.cmp(&b.path)),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.path.cmp(&b.path),
            });
            Study { name, members }
        })
        .collect();

    tracing::debug!(files = total_files, "scanned for wave files");

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        studies,
        total_files,
    })
}

/// Give each path a wave: the one in its file name, or the lowest free one
pub fn detect_waves<P: AsRef<Path>>(paths: &[P]) -> Vec<(PathBuf, u32)> {
    let entries: Vec<(PathBuf, Option<u32>)> = paths
        .iter()
        .map(|p| (p.as_ref().to_path_buf(), wave_from_path(p.as_ref())))
        .collect();
    assign_waves(&entries)
}

/// Wave number carried by a file name, e.g. 2 for `data/panel_w2.csv`
pub fn wave_from_path(path: &Path) -> Option<u32> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| extract_wave_info(s).1)
}

/// Fill in missing waves with the lowest numbers not already taken, in order.
///
/// Explicit waves are kept as given, even when repeated.
pub fn assign_waves(entries: &[(PathBuf, Option<u32>)]) -> Vec<(PathBuf, u32)> {
    let mut taken: BTreeSet<u32> = entries.iter().filter_map(|(_, w)| *w).collect();
    let mut next = 1;

    entries
        .iter()
        .map(|(path, wave)| {
            let wave = wave.unwrap_or_else(|| {
                while taken.contains(&next) {
                    next += 1;
                }
                taken.insert(next);
                next
            });
            (path.clone(), wave)
        })
        .collect()
}

fn is_data_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("tsv"))
}

/// Split a file stem into study name and wave number
///
/// Examples:
/// - "panel_w1" -> ("panel", Some(1))
/// - "panel-wave3" -> ("panel", Some(3))
/// - "panel_wave_4" -> ("panel", Some(4))
/// - "survey T2" -> ("survey", Some(2))
/// - "wave2" -> ("wave", Some(2))
/// - "baseline" -> ("baseline", None)
fn extract_wave_info(stem: &str) -> (String, Option<u32>) {
    let Some(pos) = stem.rfind(SEPARATORS) else {
        return match wave_token(stem) {
            Some(wave) => {
                let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
                (prefix.to_string(), Some(wave))
            }
            None => (stem.to_string(), None),
        };
    };

    let (head, last) = (&stem[..pos], &stem[pos + 1..]);
    if head.is_empty() {
        return (stem.to_string(), None);
    }
    if let Some(wave) = wave_token(last) {
        return (head.to_string(), Some(wave));
    }

    // "wave_4": number separated from its label
    if let Ok(wave) = last.parse::<u32>() {
        if wave > 0 {
            if let Some(p) = head.rfind(SEPARATORS) {
                if head[p + 1..].eq_ignore_ascii_case("wave") && p > 0 {
                    return (head[..p].to_string(), Some(wave));
                }
            }
        }
    }

    (stem.to_string(), None)
}

/// Parse `w3`, `wave3` or `t3` (any case) into 3
fn wave_token(token: &str) -> Option<u32> {
    let lower = token.to_ascii_lowercase();
    ["wave", "w", "t"].iter().find_map(|prefix| {
        let digits = lower.strip_prefix(prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u32>().ok().filter(|&w| w > 0)
    })
}
