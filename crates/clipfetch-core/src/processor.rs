//! Adapts one metadata entry into a segment fetch

use crate::fetcher::SegmentFetcher;
use crate::metadata::WorkItem;
use crate::report::{BatchEvent, EntryResult, Reporter};
use std::sync::Arc;

#[derive(Clone)]
pub struct EntryProcessor {
    fetcher: Arc<SegmentFetcher>,
    reporter: Arc<dyn Reporter>,
}

impl EntryProcessor {
    pub fn new(fetcher: Arc<SegmentFetcher>, reporter: Arc<dyn Reporter>) -> Self {
        Self { fetcher, reporter }
    }

    /// Process entry `index` (1-based) of `total`.
    pub async fn process(&self, item: &WorkItem, index: usize, total: usize) -> EntryResult {
        self.run(item, index, total, false).await
    }

    /// Same as [`process`](Self::process), reported as an integrity retry.
    pub async fn retry(&self, item: &WorkItem, index: usize, total: usize) -> EntryResult {
        self.run(item, index, total, true).await
    }

    async fn run(&self, item: &WorkItem, index: usize, total: usize, retry: bool) -> EntryResult {
        self.reporter.report(&BatchEvent::EntryStarted {
            index,
            total,
            id: item.id.clone(),
            label: item.label.clone(),
            retry,
        });

        let result = self.fetcher.fetch(item).await;

        self.reporter.report(&BatchEvent::EntryFinished {
            index,
            total,
            id: item.id.clone(),
            label: item.label.clone(),
            retry,
            result: result.clone(),
        });

        EntryResult {
            id: item.id.clone(),
            label: item.label.clone(),
            result,
        }
    }
}
