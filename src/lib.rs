//! yp-harvest: business directory listing harvester
//!
//! This crate crawls business-directory sites (Yellow Pages Canada/US and the
//! Quebec manufacturer directory), extracts normalized listing records,
//! deduplicates them within a run, and writes a CSV plus a JSON run summary.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod input;
pub mod notify;
pub mod output;
pub mod proxy;
pub mod sites;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for yp-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Notification error: {0}")]
    Notify(#[from] notify::NotifyError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid traversal transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TraversalState,
        to: state::TraversalState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors. All of them are fatal before traversal begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required run parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid output file name: {0}")]
    InvalidOutputFile(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

/// URL-related errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors raised while loading search terms or proxy lists
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input file not found: {0}")]
    NotFound(String),

    #[error("Unsupported input file type: {0}")]
    Unsupported(String),

    #[error("No entries loaded from {0}")]
    Empty(String),

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("Spreadsheet error in {path}: {source}")]
    Spreadsheet {
        path: String,
        source: calamine::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for yp-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, RunParams};
pub use crawler::{Coordinator, RequestContext, TraversalDriver};
pub use extract::{ListingFields, ListingRecord};
pub use output::{finalize, RunSummary};
pub use proxy::{ProxyCredential, ProxyRotator};
pub use sites::{ExtractionPolicy, SiteKind};
pub use state::{DedupeKey, RunCounters, RunState, SearchTerms, TraversalState};
