//! `tap-algolia` command line entry point.

use analytics_extraction::{
    EngineSettings, ExtractionOverrides, Extractor, FileStateStore, HttpTransport,
    MemoryStateStore, StateStore, TapConfig, Transport,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tap_algolia::{discover_catalog, load_config, SingerWriter, Tap};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tap-algolia")]
#[command(about = "Singer tap for the Algolia Analytics API", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stream catalog
    Discover,

    /// Extract records for the selected streams
    Sync {
        /// JSON config file
        #[arg(long)]
        config: PathBuf,

        /// State file, read on start and rewritten as bookmarks advance
        #[arg(long)]
        state: Option<PathBuf>,

        /// Only sync these streams (repeatable)
        #[arg(long = "stream")]
        streams: Vec<String>,

        /// First day to extract (YYYY-MM-DD), ahead of any bookmark
        #[arg(long)]
        start_date: Option<String>,

        /// Last day to extract (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries Singer messages, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,analytics_extraction=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true),
        )
        .init();

    // Load .env file if present (development)
    dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Discover => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &discover_catalog())?;
            writeln!(out)?;
        }
        Commands::Sync {
            config,
            state,
            streams,
            start_date,
            end_date,
        } => {
            let config = load_config(&config)?;
            let mut overrides = ExtractionOverrides::new();
            overrides.start_date = start_date;
            overrides.end_date = end_date;

            let mut transport = HttpTransport::new(config.credentials()?, config.region)
                .context("Failed to build HTTP client")?;
            if let Some(user_agent) = config.user_agent.clone() {
                transport = transport.with_user_agent(user_agent);
            }

            match state {
                Some(path) => {
                    let store = FileStateStore::open(&path)
                        .await
                        .with_context(|| format!("Failed to load state file {}", path.display()))?;
                    sync(&config, &streams, transport, store, &overrides).await?;
                }
                None => {
                    sync(&config, &streams, transport, MemoryStateStore::new(), &overrides).await?;
                }
            }
        }
    }

    Ok(())
}

async fn sync<T: Transport, S: StateStore>(
    config: &TapConfig,
    streams: &[String],
    transport: T,
    store: S,
    overrides: &ExtractionOverrides,
) -> Result<()> {
    let settings: EngineSettings = config.engine_settings();
    let selected = config.selected_streams(streams)?;
    let indices = config.indices().map(str::to_string).collect();

    tracing::info!(
        streams = selected.len(),
        region = ?config.region,
        "Starting tap-algolia sync"
    );

    let tap = Tap::new(Extractor::new(transport, store, settings), selected, indices);
    let stdout = io::stdout();
    let mut writer = SingerWriter::new(BufWriter::new(stdout.lock()));
    tap.sync(overrides, &mut writer).await?;
    Ok(())
}
