use anyhow::{Context, Result};
use clipfetch_core::config::Config;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("clipfetch configuration\n");

    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered.trim_end());

    if config.paths.downloader.is_none() || config.paths.transcoder.is_none() {
        println!("\n# unset tool paths are auto-detected from PATH");
    }
    if config.temp.directory.is_none() {
        println!("# temp.directory unset: using {}", config.temp_dir().display());
    }

    // Show config file locations
    println!("\nConfig sources (later entries override earlier ones):");
    if let Some(default_path) = Config::default_path() {
        println!("  1. {}", default_path.display());
    }
    if let Some(p) = config_path {
        println!("  2. {} (specified)", p.display());
    }
    println!("  3. Environment variables (CLIPFETCH_<SECTION>__<KEY>)");

    Ok(())
}
