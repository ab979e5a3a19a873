//! Configuration module for yp-harvest
//!
//! Operator settings come from a TOML file; per-run parameters come from the
//! command line. Both are validated before any request is issued, and any
//! problem surfaces as a fatal [`ConfigError`](crate::ConfigError).
//!
//! # Example
//!
//! ```no_run
//! use yp_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Concurrent requests: {}", config.crawler.concurrent_requests);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, NotifyConfig, OutputConfig, RunParams, SiteConfig, StorageConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate_run;
