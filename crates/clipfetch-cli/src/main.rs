mod args;
mod commands;
mod render;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Status lines go to stdout, so logging stays quiet unless asked for
    let filter = match cli.verbose {
        0 => "clipfetch=warn",
        1 => "clipfetch=info",
        2 => "clipfetch=debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Download(args) => commands::download::run(&args, cli.config.as_deref()).await,
        Commands::Doctor => commands::doctor::run(cli.config.as_deref()).await,
        Commands::Config => commands::config::run(cli.config.as_deref()).await,
    }
}
