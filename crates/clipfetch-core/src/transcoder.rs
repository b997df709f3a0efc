//! Segment trimming and fading using FFmpeg

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::process::{run_bounded, ToolError};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg_path: PathBuf,
    config: FetchConfig,
}

impl Transcoder {
    pub fn new(ffmpeg_path: PathBuf, config: FetchConfig) -> Self {
        Self {
            ffmpeg_path,
            config,
        }
    }

    /// Cut `[start, start + duration)` out of `input` as resampled PCM.
    pub async fn trim(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        duration: f64,
    ) -> Result<(), FetchError> {
        info!("Trimming {:.3}s from {:.3}s", duration, start);

        let mut command = self.command();
        command
            .arg("-i")
            .arg(input)
            .args(["-ss", &seconds(start), "-t", &seconds(duration)])
            .args(["-ar", &self.config.sample_rate.to_string()])
            .args(["-ac", &self.config.channels.to_string()])
            .arg("-y")
            .arg(output);

        match run_bounded(&mut command, self.config.trim_timeout()).await {
            Ok(_) => {}
            Err(ToolError::Timeout(limit)) => return Err(FetchError::TrimTimeout(limit)),
            Err(e) => return Err(FetchError::TrimFailed(e.reason())),
        }

        debug!("Trimmed to: {}", output.display());
        Ok(())
    }

    /// Apply the linear fade-in and a fade-out ending exactly at `duration`.
    pub async fn fade(&self, input: &Path, output: &Path, duration: f64) -> Result<(), FetchError> {
        let mut command = self.command();
        command
            .arg("-i")
            .arg(input)
            .args(["-af", &fade_filter(duration, self.config.fade_duration_secs)])
            .arg("-y")
            .arg(output);

        match run_bounded(&mut command, self.config.fade_timeout()).await {
            Ok(_) => {}
            Err(ToolError::Timeout(limit)) => return Err(FetchError::FadeTimeout(limit)),
            Err(e) => return Err(FetchError::FadeFailed(e.reason())),
        }

        debug!("Faded to: {}", output.display());
        Ok(())
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(["-hide_banner", "-loglevel", "error"]);
        command
    }
}

/// FFmpeg filter graph for the fade envelope of a clip of `duration` seconds.
pub fn fade_filter(duration: f64, fade: f64) -> String {
    format!(
        "afade=t=in:st=0:d={fade},afade=t=out:st={out}:d={fade}",
        fade = seconds(fade),
        out = seconds(duration - fade),
    )
}

fn seconds(value: f64) -> String {
    format!("{value:.3}")
}
