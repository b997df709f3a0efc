//! Source audio download using yt-dlp

use crate::error::FetchError;
use crate::process::{run_bounded, ToolError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Base name of the downloaded file; yt-dlp picks the extension.
const DOWNLOAD_STEM: &str = "full_audio";

#[derive(Debug, Clone)]
pub struct Downloader {
    yt_dlp_path: PathBuf,
    timeout: Duration,
}

impl Downloader {
    pub fn new(yt_dlp_path: PathBuf, timeout: Duration) -> Self {
        Self {
            yt_dlp_path,
            timeout,
        }
    }

    /// Download the best audio-only stream of `url` into `work_dir`.
    pub async fn download(&self, url: &str, work_dir: &Path) -> Result<PathBuf, FetchError> {
        info!("Downloading audio from: {}", url);

        let output_template = work_dir.join(format!("{DOWNLOAD_STEM}.%(ext)s"));

        let mut command = Command::new(&self.yt_dlp_path);
        command
            .args(["-f", "bestaudio"])
            .arg("--output")
            .arg(&output_template)
            .args(["--no-playlist", "--quiet", "--no-warnings"])
            .arg(url);

        match run_bounded(&mut command, self.timeout).await {
            Ok(_) => {}
            Err(ToolError::Timeout(limit)) => return Err(FetchError::DownloadTimeout(limit)),
            Err(e) => return Err(FetchError::DownloadFailed(e.reason())),
        }

        let audio_path = find_audio_file(work_dir)?;
        debug!("Found audio file: {}", audio_path.display());
        Ok(audio_path)
    }
}

/// Locate the single `full_audio.*` file yt-dlp left behind.
fn find_audio_file(work_dir: &Path) -> Result<PathBuf, FetchError> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(work_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.file_stem().and_then(|s| s.to_str()) == Some(DOWNLOAD_STEM)
                && path.extension().and_then(|e| e.to_str()) != Some("part")
        })
        .collect();

    candidates.sort();
    candidates.into_iter().next().ok_or(FetchError::NoAudioFile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_audio_file_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("trimmed.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("full_audio.webm"), b"x").unwrap();

        let found = find_audio_file(dir.path()).unwrap();
        assert_eq!(found, dir.path().join("full_audio.webm"));
    }

    #[test]
    fn test_find_audio_file_skips_partial_download() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("full_audio.part"), b"x").unwrap();

        assert!(matches!(
            find_audio_file(dir.path()),
            Err(FetchError::NoAudioFile)
        ));
    }
}
