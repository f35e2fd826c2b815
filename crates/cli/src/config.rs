//! Server configuration for `chamados serve`.
//!
//! Values come from three layers. A command-line flag wins over its
//! `CHAMADOS_*` environment variable (clap resolves those two), which wins
//! over the optional TOML file, which wins over the built-in default.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [archive]
//! retention_days = 15
//! sweep_interval_secs = 3600
//! ```

use std::path::{Path, PathBuf};

use chamados_storage::DEFAULT_RETENTION;
use serde::Deserialize;

pub(crate) const DEFAULT_HOST: &str = "0.0.0.0";
pub(crate) const DEFAULT_PORT: u16 = 8080;
/// Upper bound on the retention period, in days.
pub(crate) const MAX_RETENTION_DAYS: i64 = 36_500;

// ── File format ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    #[serde(default)]
    pub(crate) server: ServerSection,
    #[serde(default)]
    pub(crate) archive: ArchiveSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ServerSection {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) tls_cert: Option<PathBuf>,
    pub(crate) tls_key: Option<PathBuf>,
}

/// `[archive]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ArchiveSection {
    pub(crate) retention_days: Option<i64>,
    /// `0` disables the background sweep.
    pub(crate) sweep_interval_secs: Option<u64>,
}

/// Read and parse a TOML config file.
pub(crate) fn read_config(path: &Path) -> Result<FileConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

// ── Resolved settings ─────────────────────────────────────────────────────────

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub(crate) struct ServeOverrides {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) retention_days: Option<i64>,
    pub(crate) sweep_interval_secs: Option<u64>,
    pub(crate) tls_cert: Option<PathBuf>,
    pub(crate) tls_key: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServeConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) retention: time::Duration,
    /// `None` when the background sweep is off.
    pub(crate) sweep_interval: Option<std::time::Duration>,
    pub(crate) tls: Option<(PathBuf, PathBuf)>,
}

impl ServeConfig {
    pub(crate) fn resolve(cli: ServeOverrides, file: FileConfig) -> Result<Self, String> {
        let host = cli
            .host
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file.server.port).unwrap_or(DEFAULT_PORT);

        let retention = match cli.retention_days.or(file.archive.retention_days) {
            Some(days) if !(1..=MAX_RETENTION_DAYS).contains(&days) => {
                return Err(format!(
                    "retention_days must be between 1 and {MAX_RETENTION_DAYS}, got {days}"
                ));
            }
            Some(days) => time::Duration::days(days),
            None => DEFAULT_RETENTION,
        };

        let sweep_interval = cli
            .sweep_interval_secs
            .or(file.archive.sweep_interval_secs)
            .filter(|&secs| secs > 0)
            .map(std::time::Duration::from_secs);

        let tls = match (
            cli.tls_cert.or(file.server.tls_cert),
            cli.tls_key.or(file.server.tls_key),
        ) {
            (Some(cert), Some(key)) => Some((cert, key)),
            (None, None) => None,
            _ => return Err("--tls-cert and --tls-key must both be provided".to_string()),
        };

        Ok(ServeConfig {
            host,
            port,
            retention,
            sweep_interval,
            tls,
        })
    }

    pub(crate) fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
