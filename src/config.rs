use std::time::Duration;

use serde::Deserialize;

use crate::utils::RetryConfig;

/// Environment variables are read as `STOREFRONT_<FIELD>`, e.g. `STOREFRONT_HTTP_PORT`
pub const ENV_PREFIX: &str = "STOREFRONT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Scylla,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,

    // Comma-separated host:port list
    #[serde(default = "default_scylla_nodes")]
    pub scylla_nodes: String,

    #[serde(default = "default_scylla_keyspace")]
    pub scylla_keyspace: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_read_retry_attempts")]
    pub read_retry_attempts: u32,
}

fn default_http_port() -> u16 {
    8080
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_scylla_nodes() -> String {
    "127.0.0.1:9042".to_string()
}

fn default_scylla_keyspace() -> String {
    "storefront".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_read_retry_attempts() -> u32 {
    3
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> anyhow::Result<Self> {
        let app_config: AppConfig = config.try_deserialize()?;

        if app_config.http_port == app_config.metrics_port {
            anyhow::bail!("http_port and metrics_port must differ (both {})", app_config.http_port);
        }

        Ok(app_config)
    }

    pub fn scylla_nodes(&self) -> Vec<String> {
        self.scylla_nodes
            .split(',')
            .map(str::trim)
            .filter(|node| !node.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn read_retry(&self) -> RetryConfig {
        RetryConfig::with_attempts(self.read_retry_attempts)
    }
}
