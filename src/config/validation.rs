use crate::config::types::{Config, CrawlerConfig, NotifyConfig, RunParams, StorageConfig};
use crate::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static OUTPUT_FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\-.]+$").expect("valid output file pattern"));

/// Validates the operator configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;

    if config.output.base_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output base-dir cannot be empty".to_string(),
        ));
    }

    if let Some(base_url) = &config.site.base_url {
        Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site base-url: {}", e)))?;
    }

    if let Some(storage) = &config.storage {
        validate_storage_config(storage)?;
    }

    if let Some(notify) = &config.notify {
        validate_notify_config(notify)?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrent_requests < 1 || config.concurrent_requests > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrent-requests must be between 1 and 64, got {}",
            config.concurrent_requests
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.bucket.trim().is_empty() || config.region.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storage requires both bucket and region".to_string(),
        ));
    }

    if let Some(endpoint) = &config.endpoint {
        Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid storage endpoint: {}", e)))?;
    }

    Ok(())
}

fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    if config.domain.trim().is_empty() {
        return Err(ConfigError::Validation(
            "notify domain cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid notify api-base: {}", e)))?;

    Ok(())
}

/// Validates the parameters of one run against the operator configuration
///
/// `uses_search_terms` comes from the selected site policy.
pub fn validate_run(
    params: &RunParams,
    config: &Config,
    uses_search_terms: bool,
) -> Result<(), ConfigError> {
    if uses_search_terms {
        if params.what_file.is_none() {
            return Err(ConfigError::MissingParameter("what"));
        }
        if params.where_file.is_none() {
            return Err(ConfigError::MissingParameter("where"));
        }
    } else if params.category_matching {
        return Err(ConfigError::Validation(format!(
            "category matching needs search terms, which site '{}' does not use",
            params.site
        )));
    }

    match params.dir_name.as_deref().map(str::trim) {
        None | Some("") => return Err(ConfigError::MissingParameter("dir-name")),
        Some(dir) if dir.contains("..") => {
            return Err(ConfigError::Validation(format!(
                "dir-name cannot contain '..': {}",
                dir
            )))
        }
        Some(_) => {}
    }

    validate_output_file_name(&params.output_file)?;

    if params.summary_file.trim().is_empty() || params.summary_file.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "summary file must be a plain file name, got '{}'",
            params.summary_file
        )));
    }

    if params.save_to_storage && config.storage.is_none() {
        return Err(ConfigError::Validation(
            "--save-to-storage requires a [storage] table with bucket and region".to_string(),
        ));
    }

    Ok(())
}

/// Output file names must end in `.csv` and contain only word characters, `-` and `.`
fn validate_output_file_name(name: &str) -> Result<(), ConfigError> {
    if !name.ends_with(".csv") {
        return Err(ConfigError::InvalidOutputFile(format!(
            "'{}' must have a .csv extension",
            name
        )));
    }

    if !OUTPUT_FILE_NAME.is_match(name) {
        return Err(ConfigError::InvalidOutputFile(format!(
            "'{}' contains invalid characters",
            name
        )));
    }

    Ok(())
}
