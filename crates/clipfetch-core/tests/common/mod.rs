//! Fake downloader/transcoder binaries for driving the real pipeline.
//!
//! The fake `yt-dlp` picks its behaviour from the URL it is given:
//! `fail` exits 1, `slow` hangs, `empty` succeeds without writing a file,
//! `flaky` fails on its first call only, `busy` records how many busy
//! downloads are running at once. Anything else writes a small
//! `full_audio.webm`. The fake `ffmpeg` writes a file of configurable size
//! to its last argument. Both append their arguments to a log.

#![allow(dead_code)]

use clipfetch_core::{BatchEvent, FetchConfig, Reporter, SegmentFetcher, ToolPaths, WorkItem};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const OUTPUT_BYTES: usize = 204_800;

pub struct Harness {
    pub dir: TempDir,
    pub output_dir: PathBuf,
    pub temp_root: PathBuf,
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, Copy)]
pub struct FakeFfmpeg {
    pub fade_bytes: usize,
    pub fail_trim: bool,
    pub slow_trim: bool,
    pub fail_fade: bool,
    pub slow_fade: bool,
    /// The fade call exits 0 without creating its output
    pub fade_writes_nothing: bool,
}

impl Default for FakeFfmpeg {
    fn default() -> Self {
        Self {
            fade_bytes: OUTPUT_BYTES,
            fail_trim: false,
            slow_trim: false,
            fail_fade: false,
            slow_fade: false,
            fade_writes_nothing: false,
        }
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_ffmpeg(FakeFfmpeg::default())
    }

    pub fn with_ffmpeg(ffmpeg: FakeFfmpeg) -> Self {
        let dir = TempDir::new().unwrap();
        let output_dir = dir.path().join("audio");
        let temp_root = dir.path().join("tmp");
        let bin = dir.path().join("bin");
        fs::create_dir_all(&output_dir).unwrap();
        fs::create_dir_all(&temp_root).unwrap();
        fs::create_dir_all(&bin).unwrap();

        let logs = dir.path().display().to_string();
        let downloader = write_script(&bin.join("yt-dlp"), &yt_dlp_script(&logs));
        let transcoder = write_script(&bin.join("ffmpeg"), &ffmpeg_script(&logs, ffmpeg));

        Self {
            dir,
            output_dir,
            temp_root,
            tools: ToolPaths {
                downloader,
                transcoder,
            },
        }
    }

    pub fn config() -> FetchConfig {
        FetchConfig {
            download_timeout_secs: 10.0,
            trim_timeout_secs: 10.0,
            fade_timeout_secs: 10.0,
            ..FetchConfig::default()
        }
    }

    pub fn fetcher(&self) -> SegmentFetcher {
        self.fetcher_with(Self::config())
    }

    pub fn fetcher_with(&self, config: FetchConfig) -> SegmentFetcher {
        SegmentFetcher::new(self.tools.clone(), config, self.temp_root.clone())
    }

    /// A 10s → 15s segment written to `<id>.wav`.
    pub fn item(&self, id: &str, locator: &str) -> WorkItem {
        WorkItem {
            id: id.to_string(),
            source_locator: locator.to_string(),
            start: 10.0,
            end: 15.0,
            output_path: self.output_dir.join(format!("{id}.wav")),
            label: format!("Movement {id}"),
        }
    }

    pub fn downloads(&self) -> Vec<String> {
        read_log(&self.dir.path().join("downloads.log"))
    }

    pub fn ffmpeg_calls(&self) -> Vec<String> {
        read_log(&self.dir.path().join("ffmpeg.log"))
    }

    /// Most `busy` downloads seen running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        read_log(&self.dir.path().join("concurrency.log"))
            .iter()
            .filter_map(|n| n.trim().parse().ok())
            .max()
            .unwrap_or(0)
    }

    pub fn leftover_temp_dirs(&self) -> usize {
        fs::read_dir(&self.temp_root).unwrap().count()
    }
}

fn yt_dlp_script(logs: &str) -> String {
    format!(
        r#"#!/bin/sh
out=""
url=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift 2 ;;
    *) url="$1"; shift ;;
  esac
done
echo "$url" >> "{logs}/downloads.log"
case "$url" in
  *fail*) echo "ERROR: [youtube] abc: Video unavailable" >&2; exit 1 ;;
  *slow*) exec sleep 10 ;;
  *empty*) exit 0 ;;
  *busy*)
    mkdir -p "{logs}/running"
    : > "{logs}/running/$$"
    ls "{logs}/running" | wc -l >> "{logs}/concurrency.log"
    sleep 0.3
    rm -f "{logs}/running/$$" ;;
  *flaky*)
    if [ ! -f "{logs}/flaky-seen" ]; then
      : > "{logs}/flaky-seen"
      echo "HTTP Error 503: Service Unavailable" >&2
      exit 1
    fi ;;
esac
path=$(printf '%s' "$out" | sed 's/%(ext)s/webm/')
head -c 4096 /dev/zero > "$path"
"#
    )
}

fn ffmpeg_script(logs: &str, ffmpeg: FakeFfmpeg) -> String {
    let trim = stage(ffmpeg.fail_trim, ffmpeg.slow_trim, false);
    let fade = stage(ffmpeg.fail_fade, ffmpeg.slow_fade, ffmpeg.fade_writes_nothing);
    format!(
        r#"#!/bin/sh
for last; do :; done
echo "$*" >> "{logs}/ffmpeg.log"
case "$*" in
  *afade*) {fade}; bytes={fade_bytes} ;;
  *) {trim}; bytes={trim_bytes} ;;
esac
head -c "$bytes" /dev/zero > "$last"
"#,
        fade_bytes = ffmpeg.fade_bytes,
        trim_bytes = OUTPUT_BYTES,
    )
}

/// Shell snippet run before an ffmpeg stage writes its output.
fn stage(fail: bool, slow: bool, write_nothing: bool) -> &'static str {
    if fail {
        "echo \"Invalid data found when processing input\" >&2; exit 1"
    } else if slow {
        "exec sleep 10"
    } else if write_nothing {
        "exit 0"
    } else {
        ":"
    }
}

fn write_script(path: &Path, body: &str) -> PathBuf {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

fn read_log(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(String::from).collect())
        .unwrap_or_default()
}

/// Keeps every event for later inspection.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<BatchEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<BatchEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &BatchEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
