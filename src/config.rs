// Runtime configuration
//
// Everything comes from the environment with sensible defaults; `mdrm`
// additionally lets positional arguments override the paths.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_CSV: &str = "MDRM_CSV";
pub const ENV_OUTPUT_DIR: &str = "MDRM_OUTPUT_DIR";
pub const ENV_BIND: &str = "MDRM_BIND";
pub const ENV_LOG: &str = "MDRM_LOG";

pub const DEFAULT_CSV: &str = "MDRM_CSV.csv";
pub const DEFAULT_OUTPUT_DIR: &str = ".";
pub const DEFAULT_BIND: &str = "0.0.0.0:56085";
pub const DEFAULT_LOG: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Path of the MDRM CSV export
    pub catalog_path: PathBuf,
    /// Directory receiving the summary report and chart images
    pub output_dir: PathBuf,
    /// Listen address for the web explorer, parsed by `bind_addr()`
    pub bind: String,
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values fall back to the defaults, same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            catalog_path: PathBuf::from(get(ENV_CSV, DEFAULT_CSV)),
            output_dir: PathBuf::from(get(ENV_OUTPUT_DIR, DEFAULT_OUTPUT_DIR)),
            bind: get(ENV_BIND, DEFAULT_BIND),
        }
    }

    /// Parsed listen address. Only the server needs it, so a bad value does
    /// not affect `mdrm analyze`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidBindAddress {
                value: self.bind.clone(),
                source,
            })
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = path.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// Install the global tracing subscriber.
///
/// The filter is read from `MDRM_LOG` (e.g. `debug`, `mdrm_explorer=trace`).
/// Logs go to stderr; stdout carries the report text and the TUI.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG));

    // try_init so tests and repeated calls don't panic
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
