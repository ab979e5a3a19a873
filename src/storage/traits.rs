//! Storage traits and error types

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Missing storage credential: {0}")]
    MissingCredentials(&'static str),

    #[error("Invalid storage endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upload of {key} rejected with HTTP {status}: {body}")]
    Rejected {
        key: String,
        status: u16,
        body: String,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage the run's files can be uploaded to
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `body` under `key`, replacing any existing object
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Storage URI recorded in the summary, e.g. `s3://bucket/key`
    fn location(&self, key: &str) -> String;

    /// Publicly reachable URL of an uploaded object
    fn public_url(&self, key: &str) -> String;
}
