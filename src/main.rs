// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Command-line front end for the sync engine.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use photosync::cache::list_cached_images;
use photosync::{SearchKey, SyncConfig, Syncer};

#[derive(Parser)]
#[command(name = "photosync", version, about = "Sync clinic comparison photos from the office NAS")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync the photos for one birthday-month/day/name search.
    Sync {
        /// Birthday month, 1-12.
        #[arg(long)]
        month: String,
        /// Birthday day, 1-31.
        #[arg(long)]
        day: String,
        /// Client name as written on the folder.
        #[arg(long)]
        name: String,
        /// Cache root directory (default "cache").
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Number of concurrent download workers.
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// List the images already cached for a search id.
    Cached {
        /// Search id, e.g. "09.05王小明".
        #[arg(long)]
        search_id: String,
        /// Cache root directory (default "cache").
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Sync { month, day, name, cache_dir, concurrency } => {
            let mut config = SyncConfig::from_env();
            if let Some(dir) = cache_dir {
                config = config.with_cache_root(dir);
            }
            if let Some(workers) = concurrency {
                config = config.with_concurrency(workers);
            }

            let key = SearchKey::new(&month, &day, name)?;
            let search_id = key.search_id();
            match Syncer::new(config).sync_search(&key).await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(())
                }
                Err(err) if err.is_not_found() => {
                    bail!("no remote folder matched {search_id}; check the spelling of the name")
                }
                Err(err) => Err(err).context(format!("sync failed for {search_id}")),
            }
        }
        Command::Cached { search_id, cache_dir } => {
            let root = cache_dir.unwrap_or_else(|| SyncConfig::default().cache_root);
            let images = list_cached_images(&root.join(&search_id))
                .with_context(|| format!("listing cache for {search_id}"))?;
            println!("{}", serde_json::to_string_pretty(&images)?);
            Ok(())
        }
    }
}
