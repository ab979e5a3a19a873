use crate::proxy::ProxyRotator;
use crate::InputError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Accepted shapes of the proxy file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProxyFile {
    List(Vec<String>),
    /// Labels are ignored; entries are taken in key order
    Map(BTreeMap<String, String>),
}

impl ProxyFile {
    fn into_entries(self) -> Vec<String> {
        match self {
            Self::List(entries) => entries,
            Self::Map(entries) => entries.into_values().collect(),
        }
    }
}

/// Loads the proxy pool from a JSON array or object of `host:port[:user:pass]`
///
/// A missing file is not an error: the run continues without proxies.
/// Malformed entries are dropped with a warning.
pub fn load_proxies(path: &Path) -> Result<ProxyRotator, InputError> {
    if !path.exists() {
        tracing::warn!(
            "Proxy file not found: {}, continuing without proxies",
            path.display()
        );
        return Ok(ProxyRotator::default());
    }

    let content = fs::read_to_string(path)?;
    let content = content.trim_start_matches('\u{feff}');
    let file: ProxyFile = serde_json::from_str(content).map_err(|source| InputError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let entries = file.into_entries();
    let total = entries.len();
    let rotator = ProxyRotator::from_entries(entries);

    tracing::info!(
        "Loaded {} proxies from {} ({} dropped)",
        rotator.len(),
        path.display(),
        total - rotator.len()
    );
    Ok(rotator)
}
