//! Configuration management for clipfetch

use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub fetch: FetchConfig,
    pub batch: BatchConfig,
    pub temp: TempConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to the downloader binary, yt-dlp (auto-detected if not set)
    pub downloader: Option<PathBuf>,
    /// Path to the transcoder binary, ffmpeg (auto-detected if not set)
    pub transcoder: Option<PathBuf>,
}

/// Limits and audio parameters for a single segment fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub download_timeout_secs: f64,
    pub trim_timeout_secs: f64,
    pub fade_timeout_secs: f64,
    /// Length of both the fade-in and the fade-out
    pub fade_duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u8,
    /// Outputs smaller than this are deleted and reported as failures
    pub min_size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker count used when `--workers` is not given
    pub workers: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TempConfig {
    /// Custom temp directory (uses system temp if not set)
    pub directory: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 300.0,
            trim_timeout_secs: 60.0,
            fade_timeout_secs: 60.0,
            fade_duration_secs: 0.1,
            sample_rate: 48_000,
            channels: 2,
            // 0.1 MiB, rounded up
            min_size_bytes: 104_858,
        }
    }
}

impl FetchConfig {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.download_timeout_secs)
    }

    pub fn trim_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.trim_timeout_secs)
    }

    pub fn fade_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.fade_timeout_secs)
    }

    /// Reject values that would make every fetch fail or panic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("download_timeout_secs", self.download_timeout_secs),
            ("trim_timeout_secs", self.trim_timeout_secs),
            ("fade_timeout_secs", self.fade_timeout_secs),
        ];
        for (name, value) in timeouts {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue(format!(
                    "fetch.{name} must be a positive number of seconds, got {value}"
                )));
            }
        }
        if !self.fade_duration_secs.is_finite() || self.fade_duration_secs < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "fetch.fade_duration_secs must not be negative, got {}",
                self.fade_duration_secs
            )));
        }
        if self.sample_rate == 0 || self.channels == 0 {
            return Err(ConfigError::InvalidValue(
                "fetch.sample_rate and fetch.channels must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            fetch: FetchConfig::default(),
            batch: BatchConfig { workers: 1 },
            temp: TempConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::figment(config_file)
            .extract::<Config>()
            .map_err(|e| ConfigError::LoadError(e.to_string()))
            .and_then(|config| {
                config.fetch.validate()?;
                if config.batch.workers == 0 {
                    return Err(ConfigError::InvalidValue(
                        "batch.workers must be at least 1".to_string(),
                    ));
                }
                Ok(config)
            })
    }

    fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Load from default config directory
        if let Some(default_config) = Self::default_path() {
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        // Load from specified config file
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        // Keys contain underscores, so sections are split on a double one:
        // CLIPFETCH_FETCH__DOWNLOAD_TIMEOUT_SECS=120
        figment.merge(Env::prefixed("CLIPFETCH_").split("__"))
    }

    /// Location of the per-user config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("clipfetch/config.toml"))
    }

    /// Get downloader path, auto-detecting if not configured
    pub fn downloader_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.paths.downloader {
            Ok(path.clone())
        } else {
            which::which("yt-dlp").map_err(|_| ConfigError::ToolNotFound("yt-dlp"))
        }
    }

    /// Get transcoder path, auto-detecting if not configured
    pub fn transcoder_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.paths.transcoder {
            Ok(path.clone())
        } else {
            which::which("ffmpeg").map_err(|_| ConfigError::ToolNotFound("ffmpeg"))
        }
    }

    /// Get temp directory
    pub fn temp_dir(&self) -> PathBuf {
        self.temp.directory.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_segment_contract() {
        let config = FetchConfig::default();
        assert_eq!(config.download_timeout(), Duration::from_secs(300));
        assert_eq!(config.trim_timeout(), Duration::from_secs(60));
        assert_eq!(config.fade_timeout(), Duration::from_secs(60));
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.channels, 2);
        assert!(config.min_size_bytes as f64 > 0.1 * 1024.0 * 1024.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[fetch]\ntrim_timeout_secs = 5.5\n\n[batch]\nworkers = 3").unwrap();
        file.flush().unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.fetch.trim_timeout(), Duration::from_millis(5500));
        assert_eq!(config.fetch.download_timeout_secs, 300.0);
        assert_eq!(config.batch.workers, 3);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[batch]\nworkers = 0").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_timeout() {
        let config = FetchConfig {
            fade_timeout_secs: 0.0,
            ..FetchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configured_tool_path_skips_detection() {
        let mut config = Config::default();
        config.paths.downloader = Some(PathBuf::from("/opt/tools/yt-dlp"));
        assert_eq!(
            config.downloader_path().unwrap(),
            PathBuf::from("/opt/tools/yt-dlp")
        );
    }
}
