// Copyright 2025 the spatial-telemetry authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use spatial_telemetry::{load_config_with_env, DataCacheSystem, HttpUploader, TelemetryConfig};

/// Spatial Telemetry - inspect and replay the offline batch cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache directory (overrides config file)
    #[arg(short = 'd', long)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print entry count and fill level of the cache
    Inspect,
    /// Replay cached batches against the backend, newest first
    Drain,
    /// Drop every cached batch without sending
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config_with_env(path)?,
        None => TelemetryConfig::default(),
    };

    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cache_dir = args
        .cache_dir
        .unwrap_or_else(|| PathBuf::from(&config.cache.directory));

    let system = Arc::new(DataCacheSystem::with_settings(
        config.cache.capacity_bytes,
        config.cache.max_replay_attempts,
    ));
    system.set_cache_path(&cache_dir).await?;

    match args.command {
        Command::Inspect => {
            let batches = system.number_of_batches().await;
            let fill = system.fill_amount().await;
            println!("cache directory : {}", cache_dir.display());
            println!("cached batches  : {}", batches);
            println!("fill            : {:.1}%", fill * 100.0);
        }
        Command::Drain => {
            let uploader = Arc::new(HttpUploader::new(&config.network)?);
            system.set_delegate(uploader).await;

            let before = system.number_of_batches().await;
            info!("Draining {} cached batches from {}", before, cache_dir.display());
            system.upload_cached_content().await;
            let after = system.number_of_batches().await;
            println!("replayed {} of {} batches ({} remaining)", before - after, before, after);
        }
        Command::Clear => {
            let before = system.number_of_batches().await;
            system.clear_cache().await;
            println!("cleared {} batches", before);
        }
    }

    system.close().await;
    Ok(())
}
