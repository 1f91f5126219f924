mod file_config;

pub use file_config::{FileConfig, StoreFileConfig};

use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;

/// Base URL the in-memory store uses for file links when no store URL is set.
pub const DEFAULT_MEMORY_STORE_URL: &str = "http://127.0.0.1:8090";

const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StoreKind {
    #[default]
    #[value(name = "pocketbase")]
    PocketBase,
    Memory,
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub store: StoreKind,
    pub store_url: Option<String>,
    pub collection: String,
    pub store_timeout_sec: Option<u64>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub kind: StoreKind,
    pub url: String,
    pub collection: String,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub max_upload_mb: usize,
    pub store: StoreSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let store_file = file.store.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = match file.logging_level {
            Some(s) => match parse_logging_level(&s) {
                Some(level) => level,
                None => bail!("Invalid logging_level in config file: {}", s),
            },
            None => cli.logging_level.clone(),
        };

        let max_upload_mb = file.max_upload_mb.unwrap_or(cli.max_upload_mb);
        if max_upload_mb == 0 {
            bail!("max_upload_mb must be greater than 0");
        }
        if max_upload_mb.checked_mul(BYTES_PER_MB).is_none() {
            bail!("max_upload_mb is too large: {}", max_upload_mb);
        }

        let kind = match store_file.kind {
            Some(s) => match parse_store_kind(&s) {
                Some(kind) => kind,
                None => bail!("Invalid store kind in config file: {}", s),
            },
            None => cli.store,
        };

        let url = store_file.url.or_else(|| cli.store_url.clone());
        let url = match (kind, url) {
            (_, Some(url)) if !url.starts_with("http://") && !url.starts_with("https://") => {
                bail!("Store URL must start with http:// or https://: {}", url)
            }
            (_, Some(url)) => url,
            (StoreKind::PocketBase, None) => {
                bail!("store_url must be specified via --store-url or in config file when using the pocketbase store")
            }
            (StoreKind::Memory, None) => DEFAULT_MEMORY_STORE_URL.to_string(),
        };

        let collection = store_file
            .collection
            .unwrap_or_else(|| cli.collection.clone());
        if collection.trim().is_empty() {
            bail!("Store collection must not be empty");
        }

        let timeout_sec = store_file.timeout_sec.or(cli.store_timeout_sec);

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            max_upload_mb,
            store: StoreSettings {
                kind,
                url,
                collection,
                timeout_sec,
            },
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        // Bounded in `resolve`
        self.max_upload_mb * BYTES_PER_MB
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            max_upload_bytes: self.max_upload_bytes(),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

fn parse_store_kind(s: &str) -> Option<StoreKind> {
    StoreKind::from_str(s, true).ok()
}
