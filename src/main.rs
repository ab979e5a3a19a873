//! yp-harvest main entry point
//!
//! This is the command-line interface for the directory listing harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use yp_harvest::config::{load_config_with_hash, parse_config, Config, RunParams};
use yp_harvest::crawler::run_harvest;
use yp_harvest::output::print_summary;
use yp_harvest::SiteKind;

/// yp-harvest: business directory listing harvester
///
/// Crawls Yellow Pages Canada/US search results for every what/where pair,
/// or the Quebec manufacturer directory, and writes the deduplicated
/// listings to CSV together with a JSON run summary.
#[derive(Parser, Debug)]
#[command(name = "yp-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Business directory listing harvester", long_about = None)]
struct Cli {
    /// Directory to harvest
    #[arg(value_enum, value_name = "SITE")]
    site: SiteKind,

    /// Path to TOML configuration file; defaults apply when omitted
    #[arg(short, long, env = "YP_HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// CSV, spreadsheet or text file of business types to search for
    #[arg(long, value_name = "FILE")]
    what: Option<PathBuf>,

    /// CSV, spreadsheet or text file of locations to search in
    #[arg(long = "where", value_name = "FILE")]
    where_file: Option<PathBuf>,

    /// Output directory name for this run
    #[arg(long, value_name = "NAME")]
    dir_name: Option<String>,

    /// Output CSV file name
    #[arg(long, default_value = "output.csv")]
    output_file: String,

    /// Summary JSON file name
    #[arg(long, default_value = "summary.json")]
    summary: String,

    /// Source label stamped onto every record
    #[arg(long, default_value = "")]
    source: String,

    /// Drop listings whose categories do not mention the search term
    #[arg(long)]
    category_matching: bool,

    /// Upload the CSV and summary to object storage instead of keeping them locally
    #[arg(long)]
    save_to_storage: bool,

    /// Notification recipients, comma-separated or repeated
    #[arg(long, value_name = "EMAIL")]
    notify_to: Vec<String>,

    /// JSON file with the proxy pool
    #[arg(long, default_value = "proxies.json", env = "YP_HARVEST_PROXIES")]
    proxies: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn run_params(&self) -> RunParams {
        let mut params = RunParams::new(self.site);
        params.what_file = self.what.clone();
        params.where_file = self.where_file.clone();
        params.dir_name = self.dir_name.clone();
        params.output_file = self.output_file.clone();
        params.summary_file = self.summary.clone();
        params.source = self.source.clone();
        params.category_matching = self.category_matching;
        params.save_to_storage = self.save_to_storage;
        params.notify_to = self.notify_to.clone();
        params.proxies_file = self.proxies.clone();
        params
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_deref())?;
    let params = cli.run_params();

    tracing::info!("Harvesting {} ({})", params.site, params.site.scraper_name());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let summary = run_harvest(&config, &params, shutdown)
        .await
        .context("Harvest failed")?;

    if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` wins over the flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "yp_harvest=info,warn",
            1 => "yp_harvest=debug,info",
            2 => "yp_harvest=trace,debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load_configuration(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(parse_config("")?);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}
