//! Per-segment download → trim → fade → verify pipeline

use crate::config::FetchConfig;
use crate::downloader::Downloader;
use crate::error::{FailureKind, FetchError, BYTES_PER_MB};
use crate::metadata::WorkItem;
use crate::process::{truncate, MESSAGE_LIMIT};
use crate::transcoder::Transcoder;

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Binaries the fetcher shells out to
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub downloader: PathBuf,
    pub transcoder: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Created,
    AlreadyExists,
    Failed(FailureKind),
}

/// Outcome of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FetchResult {
    pub status: FetchStatus,
    pub message: String,
    pub size_bytes: Option<u64>,
}

impl FetchResult {
    fn created(size_bytes: u64) -> Self {
        Self {
            status: FetchStatus::Created,
            message: format!("Success ({:.1} MB)", size_bytes as f64 / BYTES_PER_MB),
            size_bytes: Some(size_bytes),
        }
    }

    fn already_exists() -> Self {
        Self {
            status: FetchStatus::AlreadyExists,
            message: "Already exists".to_string(),
            size_bytes: None,
        }
    }

    fn failed(error: &FetchError) -> Self {
        Self {
            status: FetchStatus::Failed(error.kind()),
            message: error.to_string(),
            size_bytes: None,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, FetchStatus::Failed(_))
    }
}

/// Produces one processed audio file per [`WorkItem`].
#[derive(Debug, Clone)]
pub struct SegmentFetcher {
    downloader: Downloader,
    transcoder: Transcoder,
    config: FetchConfig,
    temp_root: PathBuf,
}

impl SegmentFetcher {
    pub fn new(tools: ToolPaths, config: FetchConfig, temp_root: PathBuf) -> Self {
        Self {
            downloader: Downloader::new(tools.downloader, config.download_timeout()),
            transcoder: Transcoder::new(tools.transcoder, config.clone()),
            config,
            temp_root,
        }
    }

    /// Fetch one segment. Never fails or panics: every problem is folded
    /// into the returned result.
    pub async fn fetch(&self, item: &WorkItem) -> FetchResult {
        if item.output_exists() {
            debug!("{} already present at {}", item.id, item.output_path.display());
            return FetchResult::already_exists();
        }

        let started = Instant::now();
        let attempt = AssertUnwindSafe(self.try_fetch(item)).catch_unwind().await;

        match attempt {
            Ok(Ok(size_bytes)) => {
                info!(
                    "{} done: {} ({:.1}s)",
                    item.id,
                    item.output_path.display(),
                    started.elapsed().as_secs_f32()
                );
                FetchResult::created(size_bytes)
            }
            Ok(Err(e)) => {
                warn!("{} failed: {}", item.id, e);
                FetchResult::failed(&e)
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "fetch panicked".to_string());
                let reason = truncate(&reason, MESSAGE_LIMIT);
                warn!("{} panicked: {}", item.id, reason);
                FetchResult::failed(&FetchError::Unexpected(reason))
            }
        }
    }

    async fn try_fetch(&self, item: &WorkItem) -> Result<u64, FetchError> {
        let duration = self.checked_duration(item)?;

        // Removed on drop, whichever way this function exits
        let work_dir = tempfile::Builder::new()
            .prefix("clipfetch-")
            .tempdir_in(&self.temp_root)?;
        debug!("Temp directory: {}", work_dir.path().display());

        // 1. Download
        let source = self
            .downloader
            .download(&item.source_locator, work_dir.path())
            .await?;

        // 2. Trim
        let trimmed = work_dir.path().join("trimmed.wav");
        self.transcoder
            .trim(&source, &trimmed, item.start, duration)
            .await?;

        // 3. Fade into a staged file, then move it into place
        let extension = item
            .output_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("wav");
        let staged = work_dir.path().join(format!("faded.{extension}"));
        self.transcoder.fade(&trimmed, &staged, duration).await?;
        move_into_place(&staged, &item.output_path).await?;

        // 4. Verify
        self.verify_output(&item.output_path).await
    }

    fn checked_duration(&self, item: &WorkItem) -> Result<f64, FetchError> {
        let duration = item.duration();
        let fade = self.config.fade_duration_secs;

        if !item.start.is_finite() || !duration.is_finite() || item.start < 0.0 || duration <= 0.0 {
            return Err(FetchError::InvalidRange(format!(
                "end ({}) must be after start ({})",
                item.end, item.start
            )));
        }
        if duration < 2.0 * fade {
            return Err(FetchError::InvalidRange(format!(
                "{duration:.3}s segment is shorter than its {:.3}s of fades",
                2.0 * fade
            )));
        }
        Ok(duration)
    }

    async fn verify_output(&self, output: &Path) -> Result<u64, FetchError> {
        let size = match tokio::fs::metadata(output).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::OutputMissing)
            }
            Err(e) => return Err(e.into()),
        };

        if size < self.config.min_size_bytes {
            if let Err(e) = tokio::fs::remove_file(output).await {
                warn!("Could not remove undersized {}: {}", output.display(), e);
            }
            return Err(FetchError::OutputTooSmall(size));
        }

        Ok(size)
    }
}

async fn move_into_place(staged: &Path, output: &Path) -> Result<(), FetchError> {
    if !tokio::fs::try_exists(staged).await? {
        return Err(FetchError::OutputMissing);
    }

    if tokio::fs::rename(staged, output).await.is_ok() {
        return Ok(());
    }

    // Temp root on another filesystem
    debug!("Rename failed, copying {} into place", staged.display());
    copy_into_place(staged, output).await
}

/// Copy `staged` next to `output` under a temporary name, then rename it.
///
/// `output` only ever appears complete.
async fn copy_into_place(staged: &Path, output: &Path) -> Result<(), FetchError> {
    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    let partial = tempfile::Builder::new()
        .prefix(".clipfetch-")
        .suffix(".partial")
        .tempfile_in(parent)?;

    // The partial file is removed on drop if anything below fails
    tokio::fs::copy(staged, partial.path()).await?;
    partial.persist(output).map_err(|e| e.error)?;
    Ok(())
}
