//! clipfetch-core: download, trim and fade audio segments listed in a metadata table

pub mod batch;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod metadata;
mod process;
pub mod processor;
pub mod report;
pub mod transcoder;

pub use batch::{prepare_output_dir, BatchOptions, BatchReport, Orchestrator};
pub use config::{Config, FetchConfig};
pub use error::{ClipfetchError, FailureKind, FetchError, Result};
pub use fetcher::{FetchResult, FetchStatus, SegmentFetcher, ToolPaths};
pub use metadata::{load_work_items, parse_id_list, select_ids, WorkItem};
pub use process::{truncate, MESSAGE_LIMIT};
pub use report::{
    BatchEvent, BatchSummary, EntryResult, FailedEntry, IntegrityReport, NullReporter, Reporter,
};
