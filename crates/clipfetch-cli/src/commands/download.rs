use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::args::DownloadArgs;
use crate::render::{banner, rule, HumanReporter, JsonReporter};
use clipfetch_core::{
    load_work_items, parse_id_list, prepare_output_dir, select_ids, BatchOptions, Config,
    Orchestrator, Reporter, SegmentFetcher, ToolPaths,
};

pub async fn run(args: &DownloadArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let human = !args.json;

    if human {
        println!("\n{}\n", banner("clipfetch audio segment downloader"));
    }

    // Everything fatal happens before the first entry is attempted
    let tools = ToolPaths {
        downloader: config
            .downloader_path()
            .context("Install the downloader: pip install yt-dlp")?,
        transcoder: config
            .transcoder_path()
            .context("Install the transcoder: apt install ffmpeg (Linux) or brew install ffmpeg (macOS)")?,
    };

    prepare_output_dir(&args.output)?;
    let output_dir = std::fs::canonicalize(&args.output).unwrap_or_else(|_| args.output.clone());

    let items = load_work_items(&args.metadata, &args.output)?;

    let filtered = args.ids.is_some();
    let items = if let Some(ids) = &args.ids {
        let selected = select_ids(items, &parse_id_list(ids));
        if human {
            println!("Filtered to {} entries based on --ids\n", selected.len());
        }
        selected
    } else {
        items
    };

    let workers = args.workers.unwrap_or(config.batch.workers);

    if human {
        println!("Output directory: {}", output_dir.display());
        println!("Total entries to process: {}\n", items.len());
        println!("{}\n", rule());
    }

    let reporter: Arc<dyn Reporter> = if human {
        Arc::new(HumanReporter::new())
    } else {
        Arc::new(JsonReporter::new(io::stdout()))
    };

    let fetcher = SegmentFetcher::new(tools, config.fetch.clone(), config.temp_dir());
    Orchestrator::new(fetcher, reporter)
        .run(items, BatchOptions { workers, filtered })
        .await;

    if human {
        println!(
            "\nDownload complete! Audio files saved to: {}\n",
            output_dir.display()
        );
    }

    // Per-entry failures are reported above, never through the exit status
    Ok(())
}
