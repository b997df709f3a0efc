//! Batch orchestration: worker pool, summary and integrity pass

use crate::error::ClipfetchError;
use crate::fetcher::SegmentFetcher;
use crate::metadata::WorkItem;
use crate::processor::EntryProcessor;
use crate::report::{BatchEvent, BatchSummary, EntryResult, IntegrityReport, Reporter};

use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Number of concurrent workers; 1 means strictly sequential
    pub workers: usize,
    /// The worklist was narrowed to an id subset, which disables the integrity pass
    pub filtered: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            filtered: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub summary: BatchSummary,
    /// Main pass results, in completion order
    pub results: Vec<EntryResult>,
    /// `None` when the integrity pass was skipped
    pub integrity: Option<IntegrityReport>,
}

pub struct Orchestrator {
    processor: EntryProcessor,
    reporter: Arc<dyn Reporter>,
}

impl Orchestrator {
    pub fn new(fetcher: SegmentFetcher, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            processor: EntryProcessor::new(Arc::new(fetcher), reporter.clone()),
            reporter,
        }
    }

    /// Attempt every item, then re-check the outputs of an unfiltered run.
    ///
    /// Per-item failures never abort the batch; they are only reported.
    pub async fn run(&self, items: Vec<WorkItem>, options: BatchOptions) -> BatchReport {
        let workers = options.workers.max(1);
        info!("Processing {} entries with {} worker(s)", items.len(), workers);

        self.reporter.report(&BatchEvent::BatchStarted {
            total: items.len(),
            workers,
            filtered: options.filtered,
        });

        let results = if workers == 1 {
            self.run_sequential(&items).await
        } else {
            self.run_pool(&items, workers).await
        };

        let summary = BatchSummary::from_results(&results);
        info!(
            "Batch complete: {}/{} succeeded",
            summary.succeeded, summary.total
        );
        self.reporter.report(&BatchEvent::BatchFinished {
            summary: summary.clone(),
        });

        let integrity = if options.filtered {
            self.reporter.report(&BatchEvent::IntegritySkipped);
            None
        } else {
            Some(self.integrity_pass(&items).await)
        };

        BatchReport {
            summary,
            results,
            integrity,
        }
    }

    async fn run_sequential(&self, items: &[WorkItem]) -> Vec<EntryResult> {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        for (idx, item) in items.iter().enumerate() {
            results.push(self.processor.process(item, idx + 1, total).await);
        }
        results
    }

    /// Fixed pool of `workers` tasks sharing one job queue.
    async fn run_pool(&self, items: &[WorkItem], workers: usize) -> Vec<EntryResult> {
        let total = items.len();

        let (job_tx, job_rx) = mpsc::unbounded_channel::<(usize, WorkItem)>();
        for (idx, item) in items.iter().enumerate() {
            // Receiver is alive until the pool is dropped
            let _ = job_tx.send((idx + 1, item.clone()));
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<EntryResult>();

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let processor = self.processor.clone();

                tokio::spawn(async move {
                    loop {
                        let next = job_rx.lock().await.recv().await;
                        let Some((index, item)) = next else {
                            break;
                        };
                        debug!("Worker {} took {}", worker, item.id);
                        let result = processor.process(&item, index, total).await;
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        while results.len() < total {
            match result_rx.recv().await {
                Some(result) => results.push(result),
                // Every worker has exited
                None => break,
            }
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                warn!("Worker exited abnormally: {}", e);
            }
        }

        if results.len() < total {
            warn!("Only {} of {} entries reported a result", results.len(), total);
        }
        results
    }

    /// Retry, once and in table order, every item whose output is absent.
    async fn integrity_pass(&self, items: &[WorkItem]) -> IntegrityReport {
        let missing: Vec<&WorkItem> = items.iter().filter(|item| !item.output_exists()).collect();
        let mut report = IntegrityReport {
            missing: missing.iter().map(|item| item.id.clone()).collect(),
            ..Default::default()
        };

        if missing.is_empty() {
            info!("All {} outputs present", items.len());
            self.reporter.report(&BatchEvent::IntegrityFinished { report: report.clone() });
            return report;
        }

        warn!("{} outputs missing, retrying once", missing.len());
        self.reporter.report(&BatchEvent::IntegrityStarted {
            missing: report.missing.clone(),
        });

        let total = missing.len();
        for (idx, item) in missing.iter().enumerate() {
            report.retried.push(self.processor.retry(item, idx + 1, total).await);
        }

        report.still_missing = missing
            .iter()
            .filter(|item| !item.output_exists())
            .map(|item| item.id.clone())
            .collect();

        if !report.is_complete() {
            warn!(
                "{} outputs still missing after retry",
                report.still_missing.len()
            );
        }
        self.reporter.report(&BatchEvent::IntegrityFinished { report: report.clone() });
        report
    }
}

/// Create the output directory and make sure files can be written into it.
pub fn prepare_output_dir(dir: &Path) -> Result<(), ClipfetchError> {
    let to_error = |source| ClipfetchError::OutputDir {
        path: dir.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(to_error)?;
    tempfile::tempfile_in(dir).map_err(to_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_output_dir_creates_nested() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("audio/segments");

        prepare_output_dir(&dir).unwrap();
        assert!(dir.is_dir());
        // The writability probe leaves nothing behind
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_output_dir_rejects_file() {
        let root = TempDir::new().unwrap();
        let file = root.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            prepare_output_dir(&file),
            Err(ClipfetchError::OutputDir { .. })
        ));
    }
}
