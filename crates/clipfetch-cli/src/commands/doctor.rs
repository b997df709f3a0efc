use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;

use clipfetch_core::config::Config;
use clipfetch_core::error::ConfigError;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("clipfetch dependency check\n");

    let downloader_ok = check(
        "yt-dlp:",
        config.downloader_path(),
        "--version",
        parse_yt_dlp_version,
        "Install with: pip install yt-dlp",
    );
    let transcoder_ok = check(
        "ffmpeg:",
        config.transcoder_path(),
        "-version",
        parse_ffmpeg_version,
        "Install with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux)",
    );

    println!();
    if downloader_ok && transcoder_ok {
        println!("All dependencies OK!");
    } else {
        println!("Some dependencies are missing. See above for installation instructions.");
    }

    Ok(())
}

fn check(
    name: &str,
    path: Result<PathBuf, ConfigError>,
    version_flag: &str,
    parse: fn(&str) -> Option<String>,
    install_hint: &str,
) -> bool {
    print!("{name:<9}");

    let path = match path {
        Ok(path) => path,
        Err(_) => {
            println!("NOT FOUND");
            println!("         {install_hint}");
            return false;
        }
    };

    match Command::new(&path).arg(version_flag).output() {
        Ok(out) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            let version = parse(&stdout).unwrap_or_else(|| "unknown".to_string());
            println!("OK ({version}) at {}", path.display());
            true
        }
        _ => {
            println!("FOUND at {} but failed to get version", path.display());
            false
        }
    }
}

fn parse_yt_dlp_version(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn parse_ffmpeg_version(stdout: &str) -> Option<String> {
    // First line looks like "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) ..."
    let re = Regex::new(r"ffmpeg version (\S+)").ok()?;
    let caps = re.captures(stdout)?;
    Some(caps.get(1)?.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ffmpeg_version() {
        let out = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023 the FFmpeg developers\nbuilt with gcc 13\n";
        assert_eq!(parse_ffmpeg_version(out).as_deref(), Some("6.1.1-3ubuntu5"));
        assert_eq!(parse_ffmpeg_version("garbage"), None);
    }

    #[test]
    fn test_parse_yt_dlp_version() {
        assert_eq!(parse_yt_dlp_version("2024.08.06\n").as_deref(), Some("2024.08.06"));
        assert_eq!(parse_yt_dlp_version(""), None);
    }
}
