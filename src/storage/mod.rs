//! Object storage for run outputs
//!
//! When a run saves to storage, the CSV is buffered in memory and uploaded
//! together with the summary at run end. Keys are the local output paths
//! with separators normalized to `/`.

mod s3;
mod traits;

pub use s3::{AwsCredentials, S3Store};
pub use traits::{ObjectStore, StorageError, StorageResult};

use crate::config::StorageConfig;

/// Opens the configured store, reading credentials from the environment
///
/// # Returns
///
/// * `Ok(S3Store)` - Store ready for uploads
/// * `Err(StorageError)` - Missing credentials or an invalid endpoint
pub fn open_store(config: &StorageConfig) -> StorageResult<S3Store> {
    let credentials = AwsCredentials::from_env()?;
    let store = S3Store::new(config, credentials)?;
    tracing::info!(
        "Uploads go to bucket {} in {}",
        config.bucket,
        config.region
    );
    Ok(store)
}
