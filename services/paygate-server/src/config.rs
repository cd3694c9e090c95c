//! Server configuration
//!
//! One YAML file selected by the `--config` flag; every section has
//! defaults so a minimal file only needs the values that differ.

use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub http_client: HttpClientSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    pub acquirer: AcquirerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Timeouts for the process-wide outbound HTTP pool.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientSettings {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcquirerSettings {
    /// Base URL of the acquirer REST API
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    /// PostgreSQL DSN; empty selects the in-memory stores
    #[serde(default)]
    pub dsn: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_connections() -> u32 {
    20
}

impl ServerConfig {
    /// Load the YAML file at `path`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Yaml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(
                "acquirer:\n  base_url: https://acquirer.test\n",
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap();
        let cfg: ServerConfig = raw.try_deserialize().unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.http_client.connect_timeout_secs, 5);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.database.dsn.is_empty());
        assert_eq!(cfg.acquirer.base_url, "https://acquirer.test");
    }
}
