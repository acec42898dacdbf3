//! spotirfid - play music by tapping tags.
//!
//! Runs the bridge against the simulated reader, whose field is driven
//! from the console (`tap`, `load`, `lift`). Exit status is 0 on success
//! or interrupt and non-zero on configuration or startup failure.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use spotirfid_bridge::{Bridge, PersistenceMode};
use spotirfid_hardware::TagReader;
use spotirfid_hardware::mock::MockTagReader;
use spotirfid_network::SpotifyClient;
use spotirfid_storage::TagMapStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod console;
mod indicator;
mod maintenance;

use cli::{Cli, Command};
use indicator::LogIndicator;
use maintenance::Task;

const READER_NAME: &str = "simulated reader";

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            signal.cancel();
        }
    });

    match cli.subcommand() {
        Command::Run => run_bridge(&cli, shutdown).await,
        Command::WriteMaster { wait_secs } => {
            let marker = cli.master_marker().unwrap_or_else(|e| e.exit());
            run_task(&cli, Task::WriteMaster(marker), wait_secs, shutdown).await
        }
        Command::Dump { wait_secs } => run_task(&cli, Task::Dump, wait_secs, shutdown).await,
        Command::Wipe { wait_secs } => run_task(&cli, Task::Wipe, wait_secs, shutdown).await,
    }
}

/// `RUST_LOG` wins; otherwise the `--log-level` value applies.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_bridge(cli: &Cli, shutdown: CancellationToken) -> Result<()> {
    let service_config = cli.spotify_config().unwrap_or_else(|e| e.exit());
    let config = cli.bridge_config().unwrap_or_else(|e| e.exit());
    let accessor = cli.accessor().unwrap_or_else(|e| e.exit());

    let store = match config.persistence {
        PersistenceMode::TagMap => Some(TagMapStore::load(&cli.bridge.tag_map).await),
        PersistenceMode::TagMemory => None,
    };
    let service = SpotifyClient::new(service_config).context("creating playback client")?;

    let (reader, field) = MockTagReader::with_name(READER_NAME.to_string());
    let console = console::spawn(field, shutdown.clone());
    println!("{}", console::HELP);

    let mut bridge = Bridge::new(reader, LogIndicator::default(), service, accessor, store, config)?;

    let result = match bridge.start().await {
        Ok(()) => {
            bridge
                .run(shutdown.clone(), |outcome| println!("{outcome}"))
                .await
        }
        Err(e) => Err(e),
    };

    shutdown.cancel();
    let released = bridge.shutdown().await;
    if let Err(e) = console.await {
        warn!("Console task failed: {e}");
    }

    result.context("bridge stopped")?;
    released.context("releasing devices")?;
    Ok(())
}

async fn run_task(cli: &Cli, task: Task, wait_secs: u64, shutdown: CancellationToken) -> Result<()> {
    let accessor = cli.accessor().unwrap_or_else(|e| e.exit());
    let poll_interval = Duration::from_millis(cli.bridge.poll_interval_ms);

    let (mut reader, field) = MockTagReader::with_name(READER_NAME.to_string());
    let console = console::spawn(field, shutdown.clone());
    println!("{}", console::HELP);
    println!("present a tag within {wait_secs}s");

    let result = match maintenance::wait_for_tag(
        &mut reader,
        &shutdown,
        poll_interval,
        Duration::from_secs(wait_secs),
    )
    .await
    {
        Ok(Some(tag)) => task.execute(&accessor, &mut reader, &tag).await.map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };

    let interrupted = shutdown.is_cancelled();
    shutdown.cancel();
    let released = reader.close().await;
    if let Err(e) = console.await {
        warn!("Console task failed: {e}");
    }

    match result? {
        Some(line) => println!("{line}"),
        None if interrupted => info!("Interrupted before a tag was presented"),
        None => bail!("no tag presented within {wait_secs}s"),
    }
    released.context("releasing reader")?;
    Ok(())
}
