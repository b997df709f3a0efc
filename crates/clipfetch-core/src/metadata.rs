//! Metadata table loading.
//!
//! The table is a CSV file with one row per segment to produce. Column
//! names from the dataset's original download table (`piece_id`,
//! `youtube_url`, `audio_filename`, `movement`) are accepted as aliases.

use crate::error::MetadataError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One segment to fetch, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub id: String,
    pub source_locator: String,
    /// Segment start in seconds
    pub start: f64,
    /// Segment end in seconds
    pub end: f64,
    pub output_path: PathBuf,
    pub label: String,
}

impl WorkItem {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn output_exists(&self) -> bool {
        self.output_path.exists()
    }
}

#[derive(Debug, Deserialize)]
struct MetadataRecord {
    #[serde(alias = "piece_id")]
    id: String,
    #[serde(alias = "youtube_url", alias = "url")]
    source_locator: String,
    start_time: f64,
    end_time: f64,
    #[serde(alias = "audio_filename")]
    output_filename: String,
    #[serde(default, alias = "movement")]
    label: String,
}

/// Load every row of the metadata table, resolving output filenames
/// against `output_dir`.
///
/// A missing file or any malformed row fails the whole load.
pub fn load_work_items(path: &Path, output_dir: &Path) -> Result<Vec<WorkItem>, MetadataError> {
    if !path.exists() {
        return Err(MetadataError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| MetadataError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let mut items = Vec::new();

    for (row, result) in reader.deserialize::<MetadataRecord>().enumerate() {
        let fallback_line = row as u64 + 2;
        let record = result.map_err(|e| MetadataError::InvalidRow {
            line: e.position().map_or(fallback_line, |p| p.line()),
            message: e.to_string(),
        })?;

        if record.id.is_empty() {
            return Err(MetadataError::InvalidRow {
                line: fallback_line,
                message: "empty id".to_string(),
            });
        }
        if record.output_filename.is_empty() {
            return Err(MetadataError::InvalidRow {
                line: fallback_line,
                message: format!("empty output filename for {}", record.id),
            });
        }

        items.push(WorkItem {
            output_path: output_dir.join(&record.output_filename),
            id: record.id,
            source_locator: record.source_locator,
            start: record.start_time,
            end: record.end_time,
            label: record.label,
        });
    }

    debug!("Loaded {} entries from {}", items.len(), path.display());
    Ok(items)
}

/// Split a comma-separated id filter, dropping blank entries.
pub fn parse_id_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Keep the items whose id is listed, in table order.
pub fn select_ids(items: Vec<WorkItem>, ids: &[String]) -> Vec<WorkItem> {
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    items
        .into_iter()
        .filter(|item| wanted.contains(item.id.as_str()))
        .collect()
}
