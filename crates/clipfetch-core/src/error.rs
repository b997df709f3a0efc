//! Error types for clipfetch-core

use crate::process::{truncate, MESSAGE_LIMIT};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClipfetchError>;

/// Errors that abort a whole run before any entry is attempted.
#[derive(Error, Debug)]
pub enum ClipfetchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Output directory {path} is not writable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("{0} not found in PATH")]
    ToolNotFound(&'static str),
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read metadata file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid metadata row at line {line}: {message}")]
    InvalidRow { line: u64, message: String },
}

/// Why a single entry failed. Every variant is recovered into a
/// [`FetchResult`](crate::fetcher::FetchResult) at the entry boundary.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Download timed out after {}s", .0.as_secs_f64())]
    DownloadTimeout(Duration),

    #[error("No audio file found after download")]
    NoAudioFile,

    #[error("Trim failed: {0}")]
    TrimFailed(String),

    #[error("Trim timed out after {}s", .0.as_secs_f64())]
    TrimTimeout(Duration),

    #[error("Fade failed: {0}")]
    FadeFailed(String),

    #[error("Fade timed out after {}s", .0.as_secs_f64())]
    FadeTimeout(Duration),

    #[error("Output file not created")]
    OutputMissing,

    #[error("Output file too small ({:.2} MB)", *.0 as f64 / BYTES_PER_MB)]
    OutputTooSmall(u64),

    #[error("Error: {0}")]
    Unexpected(String),
}

pub(crate) const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::InvalidRange(_) => FailureKind::InvalidRange,
            FetchError::DownloadFailed(_) => FailureKind::DownloadFailed,
            FetchError::DownloadTimeout(_) => FailureKind::DownloadTimeout,
            FetchError::NoAudioFile => FailureKind::NoAudioFile,
            FetchError::TrimFailed(_) => FailureKind::TrimFailed,
            FetchError::TrimTimeout(_) => FailureKind::TrimTimeout,
            FetchError::FadeFailed(_) => FailureKind::FadeFailed,
            FetchError::FadeTimeout(_) => FailureKind::FadeTimeout,
            FetchError::OutputMissing => FailureKind::OutputMissing,
            FetchError::OutputTooSmall(_) => FailureKind::OutputTooSmall,
            FetchError::Unexpected(_) => FailureKind::Unexpected,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Unexpected(truncate(&e.to_string(), MESSAGE_LIMIT))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidRange,
    DownloadFailed,
    DownloadTimeout,
    NoAudioFile,
    TrimFailed,
    TrimTimeout,
    FadeFailed,
    FadeTimeout,
    OutputMissing,
    OutputTooSmall,
    Unexpected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_messages() {
        assert_eq!(
            FetchError::DownloadFailed("HTTP 403".into()).to_string(),
            "Download failed: HTTP 403"
        );
        assert_eq!(
            FetchError::DownloadTimeout(Duration::from_secs(300)).to_string(),
            "Download timed out after 300s"
        );
        assert_eq!(
            FetchError::OutputTooSmall(52_429).to_string(),
            "Output file too small (0.05 MB)"
        );
    }

    #[test]
    fn test_io_errors_become_unexpected() {
        let err: FetchError = std::io::Error::other("disk full").into();
        assert_eq!(err.kind(), FailureKind::Unexpected);
        assert_eq!(err.to_string(), "Error: disk full");
    }
}
