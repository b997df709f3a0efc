//! Batch progress events and the sink they are reported to
//!
//! The library never prints. Everything a user sees goes through a
//! [`Reporter`], which the front end renders as it likes.

use crate::fetcher::{FetchResult, FetchStatus};
use serde::Serialize;

/// Receives every event of a batch run, possibly from several workers at once.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &BatchEvent);
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: &BatchEvent) {}
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    BatchStarted {
        total: usize,
        workers: usize,
        filtered: bool,
    },
    EntryStarted {
        index: usize,
        total: usize,
        id: String,
        label: String,
        retry: bool,
    },
    EntryFinished {
        index: usize,
        total: usize,
        id: String,
        label: String,
        retry: bool,
        result: FetchResult,
    },
    BatchFinished {
        summary: BatchSummary,
    },
    IntegrityStarted {
        missing: Vec<String>,
    },
    IntegrityFinished {
        report: IntegrityReport,
    },
    /// The run was restricted to an id subset, so there is no full table to re-scan
    IntegritySkipped,
}

/// Result record for one processed entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntryResult {
    pub id: String,
    pub label: String,
    pub result: FetchResult,
}

impl EntryResult {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub id: String,
    pub label: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    /// Includes entries whose output was already present
    pub succeeded: usize,
    pub already_present: usize,
    pub failed: Vec<FailedEntry>,
}

impl BatchSummary {
    pub fn from_results(results: &[EntryResult]) -> Self {
        let mut summary = BatchSummary {
            total: results.len(),
            ..Default::default()
        };

        for entry in results {
            match entry.result.status {
                FetchStatus::Failed(_) => summary.failed.push(FailedEntry {
                    id: entry.id.clone(),
                    label: entry.label.clone(),
                    message: entry.result.message.clone(),
                }),
                FetchStatus::AlreadyExists => {
                    summary.succeeded += 1;
                    summary.already_present += 1;
                }
                FetchStatus::Created => summary.succeeded += 1,
            }
        }

        summary
    }
}

/// Outcome of re-scanning the worklist for absent outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Ids whose output was absent after the main pass
    pub missing: Vec<String>,
    pub retried: Vec<EntryResult>,
    /// Ids whose output is still absent after their single retry
    pub still_missing: Vec<String>,
}

impl IntegrityReport {
    pub fn recovered(&self) -> usize {
        self.retried.iter().filter(|r| r.is_success()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.still_missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn entry(id: &str, status: FetchStatus, message: &str) -> EntryResult {
        EntryResult {
            id: id.to_string(),
            label: format!("{id} label"),
            result: FetchResult {
                status,
                message: message.to_string(),
                size_bytes: None,
            },
        }
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            entry("a", FetchStatus::Created, "Success (1.0 MB)"),
            entry("b", FetchStatus::AlreadyExists, "Already exists"),
            entry(
                "c",
                FetchStatus::Failed(FailureKind::DownloadFailed),
                "Download failed: HTTP 403",
            ),
        ];

        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.already_present, 1);
        assert_eq!(
            summary.failed,
            vec![FailedEntry {
                id: "c".to_string(),
                label: "c label".to_string(),
                message: "Download failed: HTTP 403".to_string(),
            }]
        );
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_results(&[]);
        assert_eq!(summary, BatchSummary::default());
    }
}
