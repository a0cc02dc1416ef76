// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use podrotate::{Config, Id3TagWriter, Poller, ProcFsProbe, ReqwestClient};

/// Keep rotating podcast episode files up to date from RSS feeds
#[derive(Parser, Debug)]
#[command(name = "podrotate")]
#[command(about = "Keep rotating podcast episode files up to date from RSS feeds")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(default_value = "config.json")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(args: &Args) {
    // RUST_LOG wins over the flags
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);
    debug!(?args, "CLI arguments parsed");

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    info!(
        feeds = config.rss_feeds.len(),
        download_folder = %config.download_folder.display(),
        interval = config.check_interval,
        "podrotate starting"
    );

    let client = ReqwestClient::with_timeout(config.request_timeout())
        .context("Failed to build HTTP client")?;

    let mut poller = Poller::new(
        config,
        client,
        Arc::new(Id3TagWriter),
        Arc::new(ProcFsProbe),
    );

    tokio::select! {
        () = poller.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
        }
    }

    Ok(())
}
