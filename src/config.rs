//! Application configuration loaded from TOML.
//!
//! The file is optional: missing keys and a missing file both fall back to
//! defaults. The binary layers command-line overrides on top and hands the
//! result to each component's constructor.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreOptions;

/// Number of records seeded on `serve` when nothing else is configured.
pub const DEFAULT_SEED_RECORDS: usize = 1_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// `[database]`
    pub database: DatabaseSection,
    /// `[server]`
    pub server: ServerSection,
    /// `[seed]`
    pub seed: SeedSection,
    /// `[logging]`
    pub logging: LoggingSection,
}

/// SQLite file and connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Database file, created on first open.
    pub path: PathBuf,
    /// Read connections; must be positive.
    pub read_pool_size: usize,
    /// Lock wait before a statement fails.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("pagekit.db"),
            read_pool_size: 4,
            busy_timeout_ms: 5_000,
        }
    }
}

/// HTTP listener address.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSection {
    /// Bind host.
    pub host: IpAddr,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        }
    }
}

/// Start-up seeding.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SeedSection {
    /// Records generated by `serve` and by `seed` without `--count`.
    pub records: usize,
}

impl Default for SeedSection {
    fn default() -> Self {
        Self {
            records: DEFAULT_SEED_RECORDS,
        }
    }
}

/// Log filtering.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive, e.g. `info` or `pagekit=debug`.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl AppConfig {
    /// Loads `explicit`, or the default location when `None`. Absent files yield defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = match explicit.or_else(default_config_path) {
            Some(path) if path.exists() => read_file(&path)?,
            _ => AppConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: None,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no component can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.read_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "database.read_pool_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Connection settings for [`SqliteStore::open`](crate::store::SqliteStore::open).
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            read_pool_size: self.database.read_pool_size,
            busy_timeout: Duration::from_millis(self.database.busy_timeout_ms),
        }
    }

    /// Address the HTTP server binds.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server.host, self.server.port))
    }
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: Some(path.to_path_buf()),
        source,
    })
}

/// `<config dir>/pagekit/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("pagekit").join("config.toml"))
}

/// Errors loading or validating [`AppConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The document is not valid TOML for this schema.
    #[error("failed to parse config{}: {source}", display_path(.path))]
    Parse {
        /// File that failed, `None` for in-memory documents.
        path: Option<PathBuf>,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}
