use crate::sites::SiteKind;
use serde::Deserialize;
use std::path::PathBuf;

/// Operator configuration loaded from the TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub site: SiteConfig,
    pub storage: Option<StorageConfig>,
    pub notify: Option<NotifyConfig>,
}

/// Fetch scheduling behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    #[serde(rename = "concurrent-requests", default = "default_concurrent_requests")]
    pub concurrent_requests: u32,

    /// Minimum time between two dispatched requests (milliseconds)
    #[serde(rename = "download-delay-ms", default = "default_download_delay_ms")]
    pub download_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts allowed for one logical request before it is abandoned
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: default_concurrent_requests(),
            download_delay_ms: default_download_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_concurrent_requests() -> u32 {
    8
}

fn default_download_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    20
}

/// Local output layout
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory; files land in `<base-dir>/<site dir>/output/<dir-name>/`
    #[serde(rename = "base-dir", default = "default_base_dir")]
    pub base_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

fn default_base_dir() -> String {
    "imp_data".to_string()
}

/// Per-site overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    /// Replaces the policy's built-in base URL (mirrors, test servers)
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,
}

/// S3-compatible object storage target
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,

    /// Path-style endpoint override, e.g. `http://127.0.0.1:9000`
    pub endpoint: Option<String>,

    /// Upload objects with `x-amz-acl: public-read`
    #[serde(rename = "public-read", default)]
    pub public_read: bool,
}

/// Completion notification via the Mailgun HTTP API
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(rename = "api-base", default = "default_mailgun_api_base")]
    pub api_base: String,

    pub domain: String,

    pub sender: Option<String>,

    #[serde(default)]
    pub recipients: Vec<String>,
}

fn default_mailgun_api_base() -> String {
    "https://api.mailgun.net".to_string()
}

/// Parameters supplied for a single run (command line)
#[derive(Debug, Clone)]
pub struct RunParams {
    pub site: SiteKind,
    pub what_file: Option<PathBuf>,
    pub where_file: Option<PathBuf>,
    pub dir_name: Option<String>,
    pub output_file: String,
    pub summary_file: String,
    pub source: String,
    pub category_matching: bool,
    pub save_to_storage: bool,
    pub notify_to: Vec<String>,
    pub proxies_file: PathBuf,
}

impl RunParams {
    /// Creates run parameters with the defaults used by the command line
    pub fn new(site: SiteKind) -> Self {
        Self {
            site,
            what_file: None,
            where_file: None,
            dir_name: None,
            output_file: "output.csv".to_string(),
            summary_file: "summary.json".to_string(),
            source: String::new(),
            category_matching: false,
            save_to_storage: false,
            notify_to: Vec::new(),
            proxies_file: PathBuf::from("proxies.json"),
        }
    }
}
