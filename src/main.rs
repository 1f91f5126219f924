use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use geoaudio_server::config::{self, StoreKind};
use geoaudio_server::server::{self, GuardedRecordStore};
use geoaudio_server::{InMemoryRecordStore, PocketBaseStore, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Record store backend.
    #[clap(long, value_enum, default_value = "pocketbase")]
    pub store: StoreKind,

    /// Base URL of the PocketBase instance (e.g. http://127.0.0.1:8090).
    #[clap(long)]
    pub store_url: Option<String>,

    /// Collection holding the audio records.
    #[clap(long, default_value = "audio")]
    pub collection: String,

    /// Timeout in seconds for record store requests.
    #[clap(long)]
    pub store_timeout_sec: Option<u64>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Maximum upload size in megabytes.
    #[clap(long, default_value_t = 25)]
    pub max_upload_mb: usize,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            store: args.store,
            store_url: args.store_url.clone(),
            collection: args.collection.clone(),
            store_timeout_sec: args.store_timeout_sec,
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            max_upload_mb: args.max_upload_mb,
        }
    }
}

fn make_record_store(settings: &config::StoreSettings) -> Result<GuardedRecordStore> {
    let store: GuardedRecordStore = match settings.kind {
        StoreKind::PocketBase => {
            info!(
                "Using PocketBase store at {} (collection '{}')",
                settings.url, settings.collection
            );
            Arc::new(PocketBaseStore::new(
                settings.url.clone(),
                settings.collection.clone(),
                settings.timeout_sec,
            )?)
        }
        StoreKind::Memory => {
            info!("Using in-memory store, records are lost on exit");
            Arc::new(InMemoryRecordStore::new(
                settings.url.clone(),
                settings.collection.clone(),
            ))
        }
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration:");
    info!("  port: {}", app_config.port);
    info!("  metrics_port: {}", app_config.metrics_port);
    info!("  logging_level: {}", app_config.logging_level);
    info!("  max_upload_mb: {}", app_config.max_upload_mb);

    info!("Initializing metrics...");
    server::metrics::init_metrics();

    let record_store = make_record_store(&app_config.store)?;

    server::run_server(app_config.server_config(), record_store).await
}
