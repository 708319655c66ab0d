//! USB Inventory
//!
//! Runs the ingest REST API, or processes and inspects single payloads from
//! the command line.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use usb_inventory::{
    open_store, parse_payload, ApiServer, ApiServerConfig, IngestMetrics, InventoryProcessor,
    Settings,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// USB Inventory - per-host USB peripheral ingest
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (YAML)
    #[arg(long, global = true, env = "USB_INVENTORY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST API
    Serve {
        /// REST API bind address
        #[arg(long, env = "API_ADDR")]
        addr: Option<String>,

        /// Directory for stored snapshots; in-memory when omitted
        #[arg(long, env = "DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Process one payload file and print the summary
    Ingest {
        /// Host serial number owning the payload
        #[arg(long)]
        serial: String,

        /// JSON file holding the device array
        #[arg(long)]
        payload: PathBuf,

        /// Directory for stored snapshots
        #[arg(long, env = "DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Print the stored snapshot for a host
    Show {
        /// Host serial number
        #[arg(long)]
        serial: String,

        /// Directory for stored snapshots
        #[arg(long, env = "DATA_DIR")]
        data_dir: Option<PathBuf>,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let settings = Settings::load_optional(cli.config.as_deref())
        .context("failed to load settings")?;

    match cli.command {
        Command::Serve { addr, data_dir } => serve(settings, addr, data_dir).await,
        Command::Ingest {
            serial,
            payload,
            data_dir,
        } => ingest(settings, serial, payload, data_dir).await,
        Command::Show { serial, data_dir } => show(settings, serial, data_dir).await,
    }
}

async fn serve(
    settings: Settings,
    addr: Option<String>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let data_dir = data_dir.or_else(|| settings.data_dir.clone());

    info!("Starting USB inventory service");
    info!("  Version: {}", usb_inventory::VERSION);
    info!("  Include internal devices: {}", settings.usb_internal);

    let api_config = match addr.or_else(|| settings.api_addr.clone()) {
        Some(addr) => ApiServerConfig::with_addr(&addr)?,
        None => ApiServerConfig::default(),
    };

    let store = open_store(data_dir).await.context("failed to open device store")?;
    let processor = Arc::new(InventoryProcessor::new(store, &settings));
    let metrics = Arc::new(IngestMetrics::new()?);

    let server = Arc::new(ApiServer::new(api_config, processor, metrics));
    info!("  REST API: {}", server.config().rest_addr);

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_server.shutdown();
        }
    });

    server.run().await?;

    info!("USB inventory service stopped");
    Ok(())
}

async fn ingest(
    settings: Settings,
    serial: String,
    payload: PathBuf,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let data_dir = require_data_dir(data_dir, &settings)?;

    let body = tokio::fs::read(&payload)
        .await
        .with_context(|| format!("failed to read payload {}", payload.display()))?;
    let devices = parse_payload(&body)
        .with_context(|| format!("invalid payload {}", payload.display()))?;

    let store = open_store(Some(data_dir)).await?;
    let processor = InventoryProcessor::new(store, &settings);
    let summary = processor.process(&serial, devices).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn show(
    settings: Settings,
    serial: String,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let data_dir = require_data_dir(data_dir, &settings)?;

    let store = open_store(Some(data_dir)).await?;
    let records = store.list(&serial).await?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn require_data_dir(data_dir: Option<PathBuf>, settings: &Settings) -> anyhow::Result<PathBuf> {
    match data_dir.or_else(|| settings.data_dir.clone()) {
        Some(dir) => Ok(dir),
        None => bail!("a data directory is required (--data-dir, DATA_DIR or data_dir setting)"),
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("tower=warn".parse()?)
        .add_directive("tower_http=info".parse()?)
        .add_directive("axum=info".parse()?);

    // stdout carries command output, logs go to stderr
    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
