//! Server configuration.
//!
//! Layers, lowest priority first: built-in defaults, the YAML file given with
//! `--config`, then `OWNERGATE__*` environment variables where `__` separates
//! nested keys (`OWNERGATE__DATABASE__URL` sets `database.url`).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::{Context, bail};
use authn_resolver::AuthNConfig;
use documents::DocumentsConfig;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use ownergate_db::DatabaseConfig;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "OWNERGATE__";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub authn: AuthNConfig,
    pub documents: DocumentsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            logging: LoggingConfig::default(),
            database: DatabaseConfig::default(),
            authn: AuthNConfig::default(),
            documents: DocumentsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl ServerConfig {
    /// # Errors
    /// Fails when the file is missing or any layer does not fit the schema.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            if !path.is_file() {
                bail!("config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }
}
