use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use drive_monitor::{
    actors::ingest::IngestHandle,
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{Config, load_config},
    devices::DeviceRegistry,
    ingest::Dispatcher,
    storage::{StorageBackend, sqlite::SqliteBackend},
    transport::mqtt::MqttTransport,
};
use tokio::sync::mpsc;
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Ingests driving alerts and telemetry from MQTT into SQLite")]
struct Args {
    /// Config file (JSON); falls back to $DRIVE_MONITOR_CONFIG, then defaults
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("drive_monitor", level),
        ("drive_monitor_hub", level),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = load_config(args.file.as_deref())?;
    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let storage: Arc<dyn StorageBackend> = Arc::new(SqliteBackend::new(&config.storage.path).await?);
    let registry = DeviceRegistry::new(config.defaults.thresholds);

    let (inbound_tx, inbound_rx) = mpsc::channel(config.mqtt.channel_capacity);
    let dispatcher = Dispatcher::new(
        storage.clone(),
        registry.clone(),
        config.mqtt.topics.clone(),
    );
    let ingest = IngestHandle::spawn(dispatcher, inbound_rx);

    let (transport, transport_task) = MqttTransport::start(&config.mqtt, inbound_tx);
    let transport = Arc::new(transport);

    let state = ApiState::new(
        storage.clone(),
        registry,
        transport.clone(),
        config.mqtt.topics.clone(),
    )
    .with_ingest(ingest.clone());
    let addr = spawn_api_server(ApiConfig::from(config.api.clone()), state).await?;
    info!("hub ready, query interface on http://{addr}/api/v1");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    transport.stop();
    if let Err(e) = transport_task.await {
        error!("transport task failed: {e}");
    }

    match ingest.shutdown().await {
        Some(stats) => info!(
            "ingested {} messages ({} stored, {} dropped)",
            stats.received, stats.stored, stats.dropped
        ),
        None => warn!("ingest actor already stopped"),
    }

    storage.close().await?;
    Ok(())
}
