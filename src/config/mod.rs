use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::table::codec::DataFormat;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_server_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_worker_port")]
    pub port: u16,
    /// When set, the gateway forwards dataset creation to this worker
    /// endpoint instead of parsing uploads in-process.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            host: default_host(),
            port: default_worker_port(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for dataset stream files.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Encoding of the canonical DATA stream.
    #[serde(default)]
    pub format: DataFormat,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            root: default_storage_root(),
            format: DataFormat::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_worker_port() -> u16 {
    8001
}

fn default_storage_root() -> String {
    "./datadock-data".to_string()
}

impl AppConfig {
    /// Load configuration from an optional file plus environment variables
    /// with the DATADOCK_ prefix.
    /// Example: DATADOCK_SERVER_PORT=8080
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DATADOCK")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.root.trim().is_empty() {
            anyhow::bail!("storage.root must not be empty");
        }
        if let Some(endpoint) = &self.worker.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                anyhow::bail!("worker.endpoint must be an http(s) URL");
            }
        }
        Ok(())
    }
}
