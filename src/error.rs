// Error types for catalog loading and configuration
//
// Library code returns these typed errors; the binaries wrap them in
// anyhow with extra context before printing a diagnostic.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read catalog file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {} (line {line}): {source}", path.display())]
    Csv {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid bind address '{value}': {source}")]
    InvalidBindAddress {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}
