use clap::{Parser, Subcommand};
use clipfetch_core::parse_id_list;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipfetch")]
#[command(author, version, about = "Batch download, trim and fade audio segments from a metadata table")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download every segment listed in a metadata table
    #[command(after_help = "Re-running with the same table resumes: existing output files are skipped.")]
    Download(DownloadArgs),

    /// Check that the downloader and transcoder are installed
    Doctor,

    /// Show configuration
    Config,
}

#[derive(clap::Args, Clone, Debug)]
pub struct DownloadArgs {
    /// Metadata CSV (id, source_locator, start_time, end_time, output_filename, label)
    #[arg(short, long)]
    pub metadata: PathBuf,

    /// Output directory for audio files (created if missing)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of parallel download workers [default: batch.workers from config]
    #[arg(short, long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Comma-separated list of ids to download; disables the integrity pass
    #[arg(long, alias = "piece-ids", value_name = "IDS", value_parser = parse_ids)]
    pub ids: Option<String>,

    /// Emit one JSON object per event instead of human-readable output
    #[arg(long)]
    pub json: bool,
}

fn parse_workers(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_ids(s: &str) -> Result<String, String> {
    if parse_id_list(s).is_empty() {
        Err("no ids given".to_string())
    } else {
        Ok(s.to_string())
    }
}
